//! Tidal-flood hazard pipeline
//!
//! Inputs: JRC Global Surface Water occurrence, SRTM elevation and a
//! year-long median Landsat 8 surface reflectance composite (green, red,
//! NIR) with QA cloud masking. Derived layers: distance to permanent water,
//! TPI, NDVI and NDWI, each scored with the fixed tables and combined into
//! the raw (5..=25) and final (1..=5) hazard.

use std::collections::BTreeMap;

use estuaria_algorithms::imagery::quality::{QA_CLEAR_BITS, SR_OFFSET, SR_SCALE};
use estuaria_algorithms::imagery::{ndvi, ndwi, threshold_mask};
use estuaria_algorithms::scoring::{mask_distance, FloodHazardScorer, FloodRasterInputs, FloodScores};
use estuaria_algorithms::statistics::{area_hectares, class_areas, mean_std_dev, MeanStd, PixelArea};
use estuaria_algorithms::terrain::{distance_to_water, tpi, DistanceParams, TpiParams};
use estuaria_cloud::request::{GLOBAL_SURFACE_WATER, LANDSAT8_L2, SRTM_DEM};
use estuaria_cloud::{Composite, DateRange, GeospatialBackend, Preprocess, QaMask, RasterRequest, Rescale};
use estuaria_core::{Raster, Roi};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Indicator, IndicatorError, Result};
use crate::inputs::{band, clip, ensure_aligned, fetch};
use crate::style::{Layer, LayerStyle};

/// First year with Landsat 8 Collection 2 coverage
pub const LANDSAT8_FIRST_YEAR: i32 = 2013;

const OCCURRENCE: &str = "occurrence";
const ELEVATION: &str = "elevation";
const GREEN: &str = "SR_B3";
const RED: &str = "SR_B4";
const NIR: &str = "SR_B5";
const QA_PIXEL: &str = "QA_PIXEL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodParams {
    /// Landsat composite year
    pub year: i32,
    /// Output pixel size in metres
    pub scale: f64,
    /// TPI window radius in cells
    pub tpi_radius: usize,
    /// GSW occurrence (%) above which a cell is permanent water
    pub water_threshold: f64,
    pub pixel_area: PixelArea,
}

impl Default for FloodParams {
    fn default() -> Self {
        Self {
            year: 2024,
            scale: 30.0,
            tpi_radius: 5,
            water_threshold: 80.0,
            pixel_area: PixelArea::Auto,
        }
    }
}

impl FloodParams {
    pub fn validate(&self) -> Result<()> {
        if self.year < LANDSAT8_FIRST_YEAR {
            return Err(IndicatorError::Config(format!(
                "flood year {} precedes Landsat 8 ({LANDSAT8_FIRST_YEAR})",
                self.year
            )));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(IndicatorError::Config(format!("flood scale must be positive, got {}", self.scale)));
        }
        if self.tpi_radius == 0 {
            return Err(IndicatorError::Config("flood tpi_radius must be at least 1".into()));
        }
        if !(0.0..=100.0).contains(&self.water_threshold) {
            return Err(IndicatorError::Config(format!(
                "water_threshold {} outside 0..=100",
                self.water_threshold
            )));
        }
        Ok(())
    }
}

/// Summary of a flood hazard run.
#[derive(Debug, Clone, Serialize)]
pub struct FloodReport {
    pub year: i32,
    /// Hectares per final hazard class
    pub class_areas_ha: BTreeMap<u8, f64>,
    /// Permanent water inside the ROI
    pub water_ha: f64,
    pub raw_hazard: Option<MeanStd>,
    pub final_hazard: Option<MeanStd>,
}

/// Report plus every intermediate layer.
#[derive(Debug, Clone)]
pub struct FloodAssessment {
    pub report: FloodReport,
    pub distance_m: Raster<f64>,
    pub scores: FloodScores,
    pub layers: Vec<Layer>,
}

/// Requests for the three flood inputs.
pub fn flood_requests(roi: &Roi, params: &FloodParams) -> Result<[RasterRequest; 3]> {
    let dates = DateRange::calendar_year(params.year).map_err(|e| IndicatorError::Config(e.to_string()))?;
    let water = RasterRequest::new(GLOBAL_SURFACE_WATER, roi.clone())
        .bands(&[OCCURRENCE])
        .scale(params.scale);
    let dem = RasterRequest::new(SRTM_DEM, roi.clone())
        .bands(&[ELEVATION])
        .scale(params.scale);
    let landsat = RasterRequest::new(LANDSAT8_L2, roi.clone())
        .dates(dates)
        .bands(&[GREEN, RED, NIR])
        .composite(Composite::Median)
        .scale(params.scale)
        .preprocess(Preprocess {
            qa_mask: Some(QaMask { band: QA_PIXEL.into(), bits: QA_CLEAR_BITS }),
            rescale: Some(Rescale { scale: SR_SCALE, offset: SR_OFFSET }),
        });
    Ok([water, dem, landsat])
}

/// Run the flood hazard pipeline over `roi`.
pub fn assess_flood(backend: &dyn GeospatialBackend, roi: &Roi, params: &FloodParams) -> Result<FloodAssessment> {
    params.validate()?;
    let ind = Indicator::Flood;
    let [water_req, dem_req, landsat_req] = flood_requests(roi, params)?;

    let water = fetch(backend, ind, &water_req)?;
    let dem = fetch(backend, ind, &dem_req)?;
    let landsat = fetch(backend, ind, &landsat_req)?;

    let occurrence = band(&water, ind, OCCURRENCE)?;
    let elevation = band(&dem, ind, ELEVATION)?;
    let green = band(&landsat, ind, GREEN)?;
    let red = band(&landsat, ind, RED)?;
    let nir = band(&landsat, ind, NIR)?;
    ensure_aligned(&[occurrence, elevation, green, red, nir])?;

    // Distance and TPI see the whole fetched grid so water and relief just
    // outside the ROI still count.
    let distance_m = distance_to_water(occurrence, DistanceParams { water_threshold: params.water_threshold })?;
    let tpi_raster = tpi(elevation, TpiParams { radius: params.tpi_radius })?;
    let ndvi_raster = ndvi(nir, red)?;
    let ndwi_raster = ndwi(green, nir)?;
    debug!("flood inputs derived");

    let elevation_m = clip(elevation, roi)?;
    // permanent water and cells without elevation carry no distance
    let distance_m = mask_distance(&clip(&distance_m, roi)?, &elevation_m)?;
    let tpi_raster = clip(&tpi_raster, roi)?;
    let ndvi_raster = clip(&ndvi_raster, roi)?;
    let ndwi_raster = clip(&ndwi_raster, roi)?;

    let scores = FloodHazardScorer::default().score(FloodRasterInputs {
        distance_m: &distance_m,
        elevation_m: &elevation_m,
        tpi: &tpi_raster,
        ndvi: &ndvi_raster,
        ndwi: &ndwi_raster,
    })?;

    let class_areas_ha = class_areas(&scores.final_score, roi, params.pixel_area)?
        .into_iter()
        .filter_map(|(class, ha)| u8::try_from(class).ok().map(|c| (c, ha)))
        .collect();
    let water_ha = area_hectares(&threshold_mask(occurrence, params.water_threshold)?, roi, params.pixel_area)?;

    let report = FloodReport {
        year: params.year,
        class_areas_ha,
        water_ha,
        raw_hazard: mean_std_dev(&scores.raw, roi)?,
        final_hazard: mean_std_dev(&scores.final_score, roi)?,
    };
    info!(
        year = params.year,
        water_ha = report.water_ha,
        mean_final = report.final_hazard.map(|s| s.mean),
        "flood hazard scored"
    );

    let layers = flood_layers(&distance_m, &scores);
    Ok(FloodAssessment { report, distance_m, scores, layers })
}

fn flood_layers(distance_m: &Raster<f64>, scores: &FloodScores) -> Vec<Layer> {
    vec![
        Layer::new("Distance to permanent water (m)", distance_m.clone(), LayerStyle::distance()),
        Layer::new("Distance score", scores.distance.clone(), LayerStyle::score()),
        Layer::new("Elevation score", scores.elevation.clone(), LayerStyle::score()),
        Layer::new("TPI score", scores.tpi.clone(), LayerStyle::score()),
        Layer::new("Vegetation score", scores.vegetation.clone(), LayerStyle::score()),
        Layer::new("Wetness score", scores.wetness.clone(), LayerStyle::score()),
        Layer::new("Raw flood hazard", scores.raw.clone(), LayerStyle::raw_hazard()),
        Layer::new("Flood hazard", scores.final_score.clone(), LayerStyle::score()),
    ]
}
