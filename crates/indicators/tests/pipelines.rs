//! Indicator pipelines end to end on synthetic scenes served from memory
//! and from a directory of GeoTIFF exports.

use approx::assert_relative_eq;
use estuaria_cloud::request::{GLOBAL_SURFACE_WATER, LANDSAT8_L2, SENTINEL2_SR, SRTM_DEM};
use estuaria_cloud::{BandStack, CloudError, DateRange, DirectoryBackend, MemoryBackend};
use estuaria_core::io::write_geotiff;
use estuaria_core::{GeoTransform, Raster, Roi, CRS};
use estuaria_indicators::turbidity::turbidity_request;
use estuaria_indicators::{
    assess_flood, assess_mangrove, assess_turbidity, Config, Dashboard, FloodParams, Indicator,
    IndicatorError, MangroveParams, TurbidityParams,
};

const N: usize = 20;

fn grid(cell: f64, f: impl Fn(usize, usize) -> f64) -> Raster<f64> {
    let data = (0..N * N).map(|i| f(i / N, i % N)).collect();
    let mut r = Raster::from_vec(data, N, N).unwrap();
    r.set_transform(GeoTransform::new(0.0, N as f64 * cell, cell, -cell));
    r.set_crs(Some(CRS::utm48s()));
    r
}

fn roi(cell: f64) -> Roi {
    let side = N as f64 * cell;
    Roi::from_corners(&[(0.0, 0.0), (side, 0.0), (side, side), (0.0, side)], CRS::utm48s()).unwrap()
}

fn stack(bands: Vec<(&str, Raster<f64>)>) -> BandStack {
    bands
        .into_iter()
        .fold(BandStack::new(), |s, (name, r)| s.with(name, r).unwrap())
}

// ---------------------------------------------------------------------------
// Flood
// ---------------------------------------------------------------------------

/// Water along the western edge, flat 3 m terrain, NDVI 0.1 and NDWI 0.5
/// everywhere: every land pixel scores (5, 5, 2, 5, 4) -> 21 -> 5.
fn flood_backend(landsat: BandStack) -> MemoryBackend {
    let cell = 30.0;
    MemoryBackend::new()
        .with(
            GLOBAL_SURFACE_WATER,
            None,
            stack(vec![("occurrence", grid(cell, |_, c| if c == 0 { 100.0 } else { 0.0 }))]),
        )
        .with(SRTM_DEM, None, stack(vec![("elevation", grid(cell, |_, _| 3.0))]))
        .with(LANDSAT8_L2, Some(DateRange::calendar_year(2024).unwrap()), landsat)
}

fn reflectance() -> Vec<(&'static str, Raster<f64>)> {
    vec![
        ("SR_B3", grid(30.0, |_, _| 0.3)),
        ("SR_B4", grid(30.0, |_, _| 0.1 * 0.9 / 1.1)),
        ("SR_B5", grid(30.0, |_, _| 0.1)),
    ]
}

#[test]
fn flood_reference_scene() {
    let backend = flood_backend(stack(reflectance()));
    let out = assess_flood(&backend, &roi(30.0), &FloodParams::default()).unwrap();

    // permanent water column is excluded
    assert!(out.scores.final_score.get(5, 0).unwrap().is_nan());
    assert_relative_eq!(out.distance_m.get(5, 3).unwrap(), 90.0, epsilon = 1e-9);
    assert_relative_eq!(out.scores.tpi.get(10, 10).unwrap(), 2.0);
    assert_relative_eq!(out.scores.raw.get(10, 10).unwrap(), 21.0);
    assert_relative_eq!(out.scores.final_score.get(10, 10).unwrap(), 5.0);

    let land_pixels = N * (N - 1);
    let raw = out.report.raw_hazard.unwrap();
    assert_eq!(raw.count, land_pixels);
    assert_relative_eq!(raw.mean, 21.0);
    assert_relative_eq!(raw.std_dev, 0.0);

    assert_eq!(out.report.class_areas_ha.len(), 1);
    assert_relative_eq!(out.report.class_areas_ha[&5], land_pixels as f64 * 0.09, epsilon = 1e-9);
    assert_relative_eq!(out.report.water_ha, N as f64 * 0.09, epsilon = 1e-9);
    assert_eq!(out.layers.len(), 8);
}

#[test]
fn flood_applies_qa_mask_and_rescale_locally() {
    let to_dn = |r: Raster<f64>| {
        let dn: Vec<f64> = r.data().iter().map(|v| (v + 0.2) / 0.0000275).collect();
        r.derive(dn, None).unwrap()
    };
    let mut bands: Vec<(&str, Raster<f64>)> =
        reflectance().into_iter().map(|(n, r)| (n, to_dn(r))).collect();
    // cloud bit set on the first row
    bands.push(("QA_PIXEL", grid(30.0, |r, _| if r == 0 { 8.0 } else { 21824.0 })));

    let backend = flood_backend(stack(bands));
    let out = assess_flood(&backend, &roi(30.0), &FloodParams::default()).unwrap();

    assert!(out.scores.final_score.get(0, 10).unwrap().is_nan());
    assert_relative_eq!(out.scores.final_score.get(1, 10).unwrap(), 5.0);
    assert_relative_eq!(out.scores.wetness.get(1, 10).unwrap(), 4.0);
    assert_eq!(out.report.final_hazard.unwrap().count, (N - 1) * (N - 1));
}

#[test]
fn flood_missing_input_is_a_fetch_failure() {
    let backend = MemoryBackend::new().with(SRTM_DEM, None, stack(vec![("elevation", grid(30.0, |_, _| 3.0))]));
    let err = assess_flood(&backend, &roi(30.0), &FloodParams::default()).unwrap_err();
    match err {
        IndicatorError::RemoteFetch { indicator, source } => {
            assert_eq!(indicator, Indicator::Flood);
            assert!(matches!(source, CloudError::DatasetUnavailable { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn flood_distance_dropped_where_elevation_missing() {
    let backend = MemoryBackend::new()
        .with(
            GLOBAL_SURFACE_WATER,
            None,
            stack(vec![("occurrence", grid(30.0, |_, c| if c == 0 { 100.0 } else { 0.0 }))]),
        )
        .with(
            SRTM_DEM,
            None,
            stack(vec![("elevation", grid(30.0, |r, _| if r == 10 { f64::NAN } else { 3.0 }))]),
        )
        .with(LANDSAT8_L2, Some(DateRange::calendar_year(2024).unwrap()), stack(reflectance()));
    let out = assess_flood(&backend, &roi(30.0), &FloodParams::default()).unwrap();

    assert!(out.distance_m.get(10, 5).unwrap().is_nan());
    assert!(out.scores.distance.get(10, 5).unwrap().is_nan());
    assert!(out.scores.final_score.get(10, 5).unwrap().is_nan());
    assert_relative_eq!(out.distance_m.get(9, 5).unwrap(), 150.0, epsilon = 1e-9);
    assert!(out.layers[0].raster.get(10, 5).unwrap().is_nan());
}

#[test]
fn flood_rejects_roi_in_another_crs() {
    let backend = flood_backend(stack(reflectance()));
    let err = assess_flood(&backend, &Roi::muara_angke(), &FloodParams::default()).unwrap_err();
    assert!(matches!(
        err,
        IndicatorError::Compute(estuaria_core::Error::InvalidParameter { name: "roi", .. })
    ));
}

// ---------------------------------------------------------------------------
// Mangrove
// ---------------------------------------------------------------------------

fn season(year: i32) -> Option<DateRange> {
    Some(DateRange::seasonal(year, (5, 1), (9, 30)).unwrap())
}

/// MVI 3.0 where `mangrove` holds, 0.5 elsewhere.
fn mangrove_scene(mangrove: impl Fn(usize, usize) -> bool + Copy) -> BandStack {
    let pick = move |yes: f64, no: f64| grid(10.0, move |r, c| if mangrove(r, c) { yes } else { no });
    stack(vec![("B3", pick(0.05, 0.1)), ("B8", pick(0.35, 0.2)), ("B11", pick(0.15, 0.3))])
}

#[test]
fn mangrove_series_and_change() {
    let half = N / 2;
    let backend = MemoryBackend::new()
        .with(SENTINEL2_SR, season(2020), mangrove_scene(move |_, c| c < half))
        .with(SENTINEL2_SR, season(2022), mangrove_scene(|_, _| false))
        .with(SENTINEL2_SR, season(2024), mangrove_scene(move |r, _| r < half));

    let years = [2020, 2021, 2022, 2023, 2024];
    let out = assess_mangrove(&backend, &roi(10.0), &years, &MangroveParams::default()).unwrap();
    let report = &out.report;

    // 200 pixels of 100 m²
    assert_eq!(report.years.len(), 5);
    assert_relative_eq!(report.area(2020).unwrap(), 2.0, epsilon = 1e-9);
    assert_relative_eq!(report.area(2022).unwrap(), 0.0);
    assert_relative_eq!(report.area(2024).unwrap(), 2.0, epsilon = 1e-9);
    assert_eq!(report.area(2021), None);
    assert_eq!(report.area(2023), None);

    let change = report.change.unwrap();
    assert_relative_eq!(change.loss_ha, 1.0, epsilon = 1e-9);
    assert_relative_eq!(change.gain_ha, 1.0, epsilon = 1e-9);
    assert_relative_eq!(change.net_ha(), 0.0, epsilon = 1e-9);

    let names: Vec<&str> = out.layers.iter().map(|l| l.name.as_str()).collect();
    assert!(names.contains(&"Mangrove 2020"));
    assert!(names.contains(&"Mangrove loss"));
    assert!(names.contains(&"Mangrove gain"));
}

#[test]
fn mangrove_without_target_year_still_reports() {
    let backend = MemoryBackend::new().with(SENTINEL2_SR, season(2020), mangrove_scene(|_, _| true));
    let out = assess_mangrove(&backend, &roi(10.0), &[2020], &MangroveParams::default()).unwrap();
    assert_relative_eq!(out.report.area(2020).unwrap(), 4.0, epsilon = 1e-9);
    assert_eq!(out.report.area(2024), None);
    assert!(out.report.change.is_none());
}

// ---------------------------------------------------------------------------
// Turbidity
// ---------------------------------------------------------------------------

/// Western half water (NDWI ≈ 0.71), eastern half land (NDWI = -0.6).
/// Water NDTI is -0.2 in the top half and 0.0 in the bottom half.
fn turbidity_bands() -> Vec<(&'static str, Raster<f64>)> {
    let half = N / 2;
    vec![
        ("B3", grid(10.0, move |_, c| if c < half { 0.3 } else { 0.1 })),
        ("B4", grid(10.0, move |r, _| if r < half { 0.2 } else { 0.3 })),
        ("B8", grid(10.0, move |_, c| if c < half { 0.05 } else { 0.4 })),
    ]
}

fn check_turbidity(out: &estuaria_indicators::TurbidityAssessment) {
    let water_pixels = N * N / 2;
    assert_relative_eq!(out.report.water_ha, water_pixels as f64 * 0.01, epsilon = 1e-9);

    let ndwi = out.report.ndwi.unwrap();
    assert_eq!(ndwi.count, N * N);

    let ndti = out.report.ndti.unwrap();
    assert_eq!(ndti.count, water_pixels);
    assert_relative_eq!(ndti.mean, -0.1, epsilon = 1e-5);
    assert_relative_eq!(ndti.std_dev, 0.1, epsilon = 1e-5);
    assert!(out.ndti.get(0, N - 1).unwrap().is_nan());

    let hist = out.report.ndti_histogram.as_ref().unwrap();
    assert_eq!(hist.counts.len(), 30);
    assert_eq!(hist.total(), water_pixels as u64);
    assert_eq!(hist.counts[0], (water_pixels / 2) as u64);
    assert_eq!(hist.counts[29], (water_pixels / 2) as u64);
    assert_eq!(out.layers.len(), 3);
}

#[test]
fn turbidity_over_water_only() {
    let backend = MemoryBackend::new().with(
        SENTINEL2_SR,
        Some(DateRange::calendar_year(2024).unwrap()),
        stack(turbidity_bands()),
    );
    let out = assess_turbidity(&backend, &roi(10.0), &TurbidityParams::default()).unwrap();
    check_turbidity(&out);
}

#[test]
fn turbidity_from_directory_exports() {
    let dir = tempfile::tempdir().unwrap();
    let backend = DirectoryBackend::new(dir.path());
    let params = TurbidityParams::default();
    let area = roi(10.0);

    let request = turbidity_request(&area, &params).unwrap();
    for (name, raster) in turbidity_bands() {
        let path = backend.band_path(&request, name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        write_geotiff(&raster, &path, None).unwrap();
    }

    let out = assess_turbidity(&backend, &area, &params).unwrap();
    check_turbidity(&out);
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

#[test]
fn dashboard_isolates_failures() {
    let half = N / 2;
    let backend = MemoryBackend::new()
        .with(SENTINEL2_SR, season(2020), mangrove_scene(move |_, c| c < half))
        .with(SENTINEL2_SR, season(2024), mangrove_scene(move |r, _| r < half))
        .with(SENTINEL2_SR, Some(DateRange::calendar_year(2024).unwrap()), stack(turbidity_bands()));

    let config = Config { years: vec![2020, 2024], roi: roi(10.0), ..Config::default() };
    let report = Dashboard::new(&backend, &config).run();

    assert_eq!(report.failures(), 1);
    assert!(matches!(
        report.flood,
        Err(IndicatorError::RemoteFetch { indicator: Indicator::Flood, .. })
    ));
    assert!(report.mangrove.is_ok());
    assert!(report.turbidity.is_ok());

    let summary = report.summary();
    assert!(!summary.flood.is_ok());
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["flood"]["status"], "failed");
    assert_eq!(json["mangrove"]["status"], "ok");
    assert_eq!(json["turbidity"]["report"]["year"], 2024);
}
