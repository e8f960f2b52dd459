//! Water turbidity pipeline
//!
//! A calendar-year Sentinel-2 median composite gives NDWI; pixels with
//! NDWI > 0 form the water mask, and NDTI is evaluated on water only.

use estuaria_algorithms::imagery::quality::apply_mask;
use estuaria_algorithms::imagery::{ndti, ndwi_eps, threshold_mask, INDEX_EPSILON};
use estuaria_algorithms::statistics::{area_hectares, histogram, mean_std_dev, Histogram, MeanStd, PixelArea, DEFAULT_BUCKETS};
use estuaria_cloud::request::SENTINEL2_SR;
use estuaria_cloud::{Composite, DateRange, GeospatialBackend, RasterRequest};
use estuaria_core::{Raster, Roi};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Indicator, IndicatorError, Result};
use crate::inputs::{band, clip, clip_mask, ensure_aligned, fetch};
use crate::mangrove::check_sentinel_year;
use crate::style::{Layer, LayerStyle};

/// Upper bound of the user cloud filter, percent
pub const MAX_CLOUD_LIMIT: f64 = 30.0;

const GREEN: &str = "B3";
const RED: &str = "B4";
const NIR: &str = "B8";

const WATER_COLOR: &str = "blue";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurbidityParams {
    pub year: i32,
    /// Maximum scene cloudy-pixel percentage, at most [`MAX_CLOUD_LIMIT`]
    pub cloud_max: f64,
    /// NDTI histogram bucket count
    pub buckets: usize,
    pub scale: f64,
    pub pixel_area: PixelArea,
}

impl Default for TurbidityParams {
    fn default() -> Self {
        Self {
            year: 2024,
            cloud_max: 10.0,
            buckets: DEFAULT_BUCKETS,
            scale: 10.0,
            pixel_area: PixelArea::Auto,
        }
    }
}

impl TurbidityParams {
    pub fn validate(&self) -> Result<()> {
        check_sentinel_year(self.year)?;
        if !(0.0..=MAX_CLOUD_LIMIT).contains(&self.cloud_max) {
            return Err(IndicatorError::Config(format!(
                "turbidity cloud_max {} outside 0..={MAX_CLOUD_LIMIT}",
                self.cloud_max
            )));
        }
        if self.buckets == 0 {
            return Err(IndicatorError::Config("turbidity buckets must be at least 1".into()));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(IndicatorError::Config(format!("turbidity scale must be positive, got {}", self.scale)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TurbidityReport {
    pub year: i32,
    pub cloud_max: f64,
    pub water_ha: f64,
    /// `None` when no valid pixel falls in the ROI
    pub ndwi: Option<MeanStd>,
    /// Over water pixels only
    pub ndti: Option<MeanStd>,
    pub ndti_histogram: Option<Histogram>,
}

#[derive(Debug, Clone)]
pub struct TurbidityAssessment {
    pub report: TurbidityReport,
    pub ndwi: Raster<f64>,
    pub ndti: Raster<f64>,
    pub water: Raster<u8>,
    pub layers: Vec<Layer>,
}

pub fn turbidity_request(roi: &Roi, params: &TurbidityParams) -> Result<RasterRequest> {
    let dates = DateRange::calendar_year(params.year).map_err(|e| IndicatorError::Config(e.to_string()))?;
    Ok(RasterRequest::new(SENTINEL2_SR, roi.clone())
        .dates(dates)
        .max_cloud(params.cloud_max)
        .bands(&[GREEN, RED, NIR])
        .composite(Composite::Median)
        .scale(params.scale))
}

/// Run the turbidity pipeline over `roi`.
pub fn assess_turbidity(
    backend: &dyn GeospatialBackend,
    roi: &Roi,
    params: &TurbidityParams,
) -> Result<TurbidityAssessment> {
    params.validate()?;
    let ind = Indicator::Turbidity;
    let stack = fetch(backend, ind, &turbidity_request(roi, params)?)?;
    let green = band(&stack, ind, GREEN)?;
    let red = band(&stack, ind, RED)?;
    let nir = band(&stack, ind, NIR)?;
    ensure_aligned(&[green, red, nir])?;

    let ndwi = clip(&ndwi_eps(green, nir, INDEX_EPSILON)?, roi)?;
    let water = clip_mask(&threshold_mask(&ndwi, 0.0)?, roi)?;
    let ndti = apply_mask(&ndti(red, green, INDEX_EPSILON)?, &water)?;

    let report = TurbidityReport {
        year: params.year,
        cloud_max: params.cloud_max,
        water_ha: area_hectares(&water, roi, params.pixel_area)?,
        ndwi: mean_std_dev(&ndwi, roi)?,
        ndti: mean_std_dev(&ndti, roi)?,
        ndti_histogram: histogram(&ndti, roi, params.buckets)?,
    };
    info!(
        year = params.year,
        water_ha = report.water_ha,
        mean_ndti = report.ndti.map(|s| s.mean),
        "turbidity summarised"
    );

    let layers = vec![
        Layer::new("NDWI", ndwi.clone(), LayerStyle::ndwi()),
        Layer::from_mask("Water", &water, WATER_COLOR)?,
        Layer::new("NDTI (water)", ndti.clone(), LayerStyle::ndti()),
    ];
    Ok(TurbidityAssessment { report, ndwi, ndti, water, layers })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_limit() {
        assert!(TurbidityParams::default().validate().is_ok());
        assert!(TurbidityParams { cloud_max: 30.0, ..Default::default() }.validate().is_ok());
        assert!(TurbidityParams { cloud_max: 35.0, ..Default::default() }.validate().is_err());
        assert!(TurbidityParams { buckets: 0, ..Default::default() }.validate().is_err());
    }

    #[test]
    fn test_full_year_request() {
        let r = turbidity_request(&Roi::muara_angke(), &TurbidityParams::default()).unwrap();
        assert_eq!(r.dates.unwrap().label(), "2024-01-01_2024-12-31");
        assert_eq!(r.max_cloud, Some(10.0));
        assert_eq!(r.bands, vec!["B3", "B4", "B8"]);
    }
}
