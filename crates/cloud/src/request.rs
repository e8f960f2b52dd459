//! Raster request builder
//!
//! A [`RasterRequest`] describes one raster acquisition: which dataset,
//! which bands, over which region and period, and how the collection is
//! reduced to a single image.

use chrono::NaiveDate;
use estuaria_core::Roi;
use serde::{Deserialize, Serialize};

use crate::error::{CloudError, Result};

// ---------------------------------------------------------------------------
// Well-known datasets
// ---------------------------------------------------------------------------

/// SRTM 30 m digital elevation model
pub const SRTM_DEM: &str = "USGS/SRTMGL1_003";
/// JRC Global Surface Water (occurrence band)
pub const GLOBAL_SURFACE_WATER: &str = "JRC/GSW1_4/GlobalSurfaceWater";
/// Landsat 8 Collection 2 Tier 1 Level-2 surface reflectance
pub const LANDSAT8_L2: &str = "LANDSAT/LC08/C02/T1_L2";
/// Sentinel-2 harmonized surface reflectance
pub const SENTINEL2_SR: &str = "COPERNICUS/S2_SR_HARMONIZED";

// ---------------------------------------------------------------------------
// Date range
// ---------------------------------------------------------------------------

/// Inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(CloudError::InvalidRequest(format!(
                "date range starts after it ends: {start} > {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Month/day window within one year, e.g. May 1 – Sep 30.
    pub fn seasonal(year: i32, start: (u32, u32), end: (u32, u32)) -> Result<Self> {
        let date = |(m, d): (u32, u32)| {
            NaiveDate::from_ymd_opt(year, m, d).ok_or_else(|| {
                CloudError::InvalidRequest(format!("invalid date {year}-{m:02}-{d:02}"))
            })
        };
        Self::new(date(start)?, date(end)?)
    }

    /// January 1 through December 31.
    pub fn calendar_year(year: i32) -> Result<Self> {
        Self::seasonal(year, (1, 1), (12, 31))
    }

    /// Directory-friendly label, `YYYY-MM-DD_YYYY-MM-DD`.
    pub fn label(&self) -> String {
        format!("{}_{}", self.start.format("%Y-%m-%d"), self.end.format("%Y-%m-%d"))
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// How an image collection is reduced to one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Composite {
    /// Per-pixel median over the collection
    #[default]
    Median,
    /// Single image, no reduction (static datasets)
    None,
}

/// Server-side preprocessing applied per image before compositing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocess {
    /// QA band and bit mask; pixels with any masked bit set are dropped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qa_mask: Option<QaMask>,
    /// `value * scale + offset` applied to the requested bands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rescale: Option<Rescale>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaMask {
    pub band: String,
    pub bits: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rescale {
    pub scale: f64,
    pub offset: f64,
}

/// One raster acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterRequest {
    pub dataset: String,
    pub roi: Roi,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dates: Option<DateRange>,
    /// Maximum scene cloud cover in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cloud: Option<f64>,
    pub bands: Vec<String>,
    pub composite: Composite,
    /// Output pixel size in metres
    pub scale: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preprocess: Option<Preprocess>,
}

impl RasterRequest {
    /// Start a request for `dataset` over `roi` with a 30 m scale.
    pub fn new(dataset: impl Into<String>, roi: Roi) -> Self {
        Self {
            dataset: dataset.into(),
            roi,
            dates: None,
            max_cloud: None,
            bands: Vec::new(),
            composite: Composite::None,
            scale: 30.0,
            preprocess: None,
        }
    }

    pub fn dates(mut self, range: DateRange) -> Self {
        self.dates = Some(range);
        self
    }

    pub fn max_cloud(mut self, percent: f64) -> Self {
        self.max_cloud = Some(percent);
        self
    }

    pub fn bands(mut self, bands: &[&str]) -> Self {
        self.bands = bands.iter().map(|b| b.to_string()).collect();
        self
    }

    pub fn composite(mut self, composite: Composite) -> Self {
        self.composite = composite;
        self
    }

    pub fn scale(mut self, metres: f64) -> Self {
        self.scale = metres;
        self
    }

    pub fn preprocess(mut self, preprocess: Preprocess) -> Self {
        self.preprocess = Some(preprocess);
        self
    }

    /// Check the request before it is sent.
    pub fn validate(&self) -> Result<()> {
        if self.dataset.trim().is_empty() {
            return Err(CloudError::InvalidRequest("dataset id is empty".into()));
        }
        if self.bands.is_empty() {
            return Err(CloudError::InvalidRequest(format!("no bands requested from {}", self.dataset)));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(CloudError::InvalidRequest(format!("invalid scale {}", self.scale)));
        }
        if let Some(c) = self.max_cloud
            && !(0.0..=100.0).contains(&c)
        {
            return Err(CloudError::InvalidRequest(format!("cloud cover {c} outside 0..=100")));
        }
        Ok(())
    }

    /// Directory-safe dataset name, e.g. `COPERNICUS_S2_SR_HARMONIZED`.
    pub fn dataset_slug(&self) -> String {
        self.dataset
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect()
    }

    /// Bands a backend without server-side preprocessing must return:
    /// the requested bands plus the QA band, if one is named.
    pub fn local_bands(&self) -> Vec<String> {
        let mut bands = self.bands.clone();
        if let Some(qa) = self.preprocess.as_ref().and_then(|p| p.qa_mask.as_ref())
            && !bands.contains(&qa.band)
        {
            bands.push(qa.band.clone());
        }
        bands
    }

    /// Copy of this request asking for a single band.
    pub fn for_band(&self, band: &str) -> Self {
        let mut single = self.clone();
        single.bands = vec![band.to_string()];
        single
    }
}
