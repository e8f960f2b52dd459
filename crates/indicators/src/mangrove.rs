//! Mangrove extent pipeline
//!
//! Per year: a May–September Sentinel-2 median composite, the Mangrove
//! Vegetation Index, a mask of pixels with `min_mvi <= MVI <= max_mvi` and
//! its area. Loss and gain compare the baseline and target year masks.
//!
//! A year without usable scenes is reported as "no data" rather than
//! failing the whole indicator.

use std::collections::BTreeMap;

use estuaria_algorithms::imagery::{mask_change, mvi, range_mask, INDEX_EPSILON};
use estuaria_algorithms::statistics::{area_hectares, PixelArea};
use estuaria_cloud::request::SENTINEL2_SR;
use estuaria_cloud::{Composite, DateRange, GeospatialBackend, RasterRequest};
use estuaria_core::{Raster, Roi};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Indicator, IndicatorError, Result};
use crate::inputs::{band, clip, clip_mask, ensure_aligned, fetch};
use crate::style::{Layer, LayerStyle, GAIN_COLOR, LOSS_COLOR, MANGROVE_COLOR};

/// First year of Sentinel-2 surface reflectance coverage
pub const SENTINEL2_FIRST_YEAR: i32 = 2017;

const GREEN: &str = "B3";
const NIR: &str = "B8";
const SWIR1: &str = "B11";

/// Dry-season window, month/day
const SEASON_START: (u32, u32) = (5, 1);
const SEASON_END: (u32, u32) = (9, 30);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MangroveParams {
    pub min_mvi: f64,
    pub max_mvi: f64,
    pub baseline_year: i32,
    pub target_year: i32,
    /// Maximum scene cloudy-pixel percentage
    pub max_cloud: f64,
    pub scale: f64,
    pub pixel_area: PixelArea,
}

impl Default for MangroveParams {
    fn default() -> Self {
        Self {
            min_mvi: 2.5,
            max_mvi: 20.0,
            baseline_year: 2020,
            target_year: 2024,
            max_cloud: 20.0,
            scale: 10.0,
            pixel_area: PixelArea::Auto,
        }
    }
}

impl MangroveParams {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_mvi.is_finite() && self.max_mvi.is_finite()) || self.min_mvi > self.max_mvi {
            return Err(IndicatorError::Config(format!(
                "mangrove MVI range [{}, {}] is invalid",
                self.min_mvi, self.max_mvi
            )));
        }
        for year in [self.baseline_year, self.target_year] {
            check_sentinel_year(year)?;
        }
        if !(0.0..=100.0).contains(&self.max_cloud) {
            return Err(IndicatorError::Config(format!("mangrove max_cloud {} outside 0..=100", self.max_cloud)));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(IndicatorError::Config(format!("mangrove scale must be positive, got {}", self.scale)));
        }
        Ok(())
    }
}

pub(crate) fn check_sentinel_year(year: i32) -> Result<()> {
    if year < SENTINEL2_FIRST_YEAR {
        return Err(IndicatorError::Config(format!(
            "year {year} precedes Sentinel-2 surface reflectance ({SENTINEL2_FIRST_YEAR})"
        )));
    }
    Ok(())
}

/// Mangrove area of one year; `None` when no composite was available.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MangroveYear {
    pub year: i32,
    pub area_ha: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MangroveChange {
    pub baseline_year: i32,
    pub target_year: i32,
    pub loss_ha: f64,
    pub gain_ha: f64,
}

impl MangroveChange {
    pub fn net_ha(&self) -> f64 {
        self.gain_ha - self.loss_ha
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MangroveReport {
    /// Ascending by year
    pub years: Vec<MangroveYear>,
    /// `None` if the baseline or target year has no data
    pub change: Option<MangroveChange>,
}

impl MangroveReport {
    pub fn area(&self, year: i32) -> Option<f64> {
        self.years.iter().find(|y| y.year == year).and_then(|y| y.area_ha)
    }
}

#[derive(Debug, Clone)]
pub struct MangroveAssessment {
    pub report: MangroveReport,
    pub layers: Vec<Layer>,
}

struct YearExtent {
    mvi: Raster<f64>,
    mask: Raster<u8>,
}

/// Request for one year's composite.
pub fn mangrove_request(roi: &Roi, params: &MangroveParams, year: i32) -> Result<RasterRequest> {
    let season = DateRange::seasonal(year, SEASON_START, SEASON_END).map_err(|e| IndicatorError::Config(e.to_string()))?;
    Ok(RasterRequest::new(SENTINEL2_SR, roi.clone())
        .dates(season)
        .max_cloud(params.max_cloud)
        .bands(&[GREEN, NIR, SWIR1])
        .composite(Composite::Median)
        .scale(params.scale))
}

fn year_extent(
    backend: &dyn GeospatialBackend,
    roi: &Roi,
    params: &MangroveParams,
    year: i32,
) -> Result<Option<YearExtent>> {
    let request = mangrove_request(roi, params, year)?;
    let stack = match fetch(backend, Indicator::Mangrove, &request) {
        Ok(stack) => stack,
        Err(IndicatorError::RemoteFetch { source, .. }) if source.is_empty_result() => {
            warn!(year, reason = %source, "no mangrove composite");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let green = band(&stack, Indicator::Mangrove, GREEN)?;
    let nir = band(&stack, Indicator::Mangrove, NIR)?;
    let swir1 = band(&stack, Indicator::Mangrove, SWIR1)?;
    ensure_aligned(&[green, nir, swir1])?;

    let mvi_raster = clip(&mvi(nir, green, swir1, INDEX_EPSILON)?, roi)?;
    let mask = clip_mask(&range_mask(&mvi_raster, params.min_mvi, params.max_mvi)?, roi)?;
    Ok(Some(YearExtent { mvi: mvi_raster, mask }))
}

/// Run the mangrove pipeline for every year in `years` plus the baseline
/// and target years.
pub fn assess_mangrove(
    backend: &dyn GeospatialBackend,
    roi: &Roi,
    years: &[i32],
    params: &MangroveParams,
) -> Result<MangroveAssessment> {
    params.validate()?;
    let mut all_years: Vec<i32> = years.to_vec();
    all_years.extend([params.baseline_year, params.target_year]);
    all_years.sort_unstable();
    all_years.dedup();
    for &year in &all_years {
        check_sentinel_year(year)?;
    }

    let mut series = Vec::with_capacity(all_years.len());
    let mut kept: BTreeMap<i32, YearExtent> = BTreeMap::new();
    for year in all_years {
        let extent = year_extent(backend, roi, params, year)?;
        let area_ha = match &extent {
            Some(e) => Some(area_hectares(&e.mask, roi, params.pixel_area)?),
            None => None,
        };
        series.push(MangroveYear { year, area_ha });
        if let Some(e) = extent
            && (year == params.baseline_year || year == params.target_year)
        {
            kept.insert(year, e);
        }
    }

    let mut layers = Vec::new();
    for (year, extent) in &kept {
        layers.push(Layer::new(format!("MVI {year}"), extent.mvi.clone(), LayerStyle::mvi()));
        layers.push(Layer::from_mask(format!("Mangrove {year}"), &extent.mask, MANGROVE_COLOR)?);
    }

    let change = match (kept.get(&params.baseline_year), kept.get(&params.target_year)) {
        (Some(before), Some(after)) => {
            let change = mask_change(&before.mask, &after.mask)?;
            let loss_ha = area_hectares(&change.loss, roi, params.pixel_area)?;
            let gain_ha = area_hectares(&change.gain, roi, params.pixel_area)?;
            layers.push(Layer::from_mask("Mangrove loss", &change.loss, LOSS_COLOR)?);
            layers.push(Layer::from_mask("Mangrove gain", &change.gain, GAIN_COLOR)?);
            Some(MangroveChange {
                baseline_year: params.baseline_year,
                target_year: params.target_year,
                loss_ha,
                gain_ha,
            })
        }
        _ => {
            warn!(
                baseline = params.baseline_year,
                target = params.target_year,
                "mangrove change unavailable"
            );
            None
        }
    };

    let report = MangroveReport { years: series, change };
    info!(
        years = report.years.len(),
        target_ha = report.area(params.target_year),
        "mangrove extent mapped"
    );
    Ok(MangroveAssessment { report, layers })
}
