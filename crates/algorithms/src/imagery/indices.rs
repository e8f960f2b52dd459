//! Spectral vegetation and water indices
//!
//! Normalized-difference style indices over single-band rasters. Results
//! are not clamped. A pixel whose input is nodata, or whose formula is not
//! finite (zero denominator), is NaN in the output.

use crate::pixelwise::{map_cells, valid_at};
use estuaria_core::raster::Raster;
use estuaria_core::Result;

/// Epsilon added to denominators in the Sentinel-2 indices.
pub const INDEX_EPSILON: f64 = 1e-6;

/// Enumeration of supported spectral indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index
    NDVI,
    /// Normalized Difference Water Index (McFeeters)
    NDWI,
    /// Normalized Difference Turbidity Index
    NDTI,
    /// Mangrove Vegetation Index
    MVI,
}

impl SpectralIndex {
    /// Short uppercase name used for layer labels.
    pub fn name(&self) -> &'static str {
        match self {
            SpectralIndex::NDVI => "NDVI",
            SpectralIndex::NDWI => "NDWI",
            SpectralIndex::NDTI => "NDTI",
            SpectralIndex::MVI => "MVI",
        }
    }
}

fn finite_or_nan(v: f64) -> f64 {
    if v.is_finite() { v } else { f64::NAN }
}

fn zip2<F>(a: &Raster<f64>, b: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64, f64) -> f64 + Sync + Send,
{
    a.ensure_same_shape(b)?;
    map_cells(a, Some(f64::NAN), |row, col| {
        match (valid_at(a, row, col), valid_at(b, row, col)) {
            (Some(va), Some(vb)) => finite_or_nan(f(va, vb)),
            _ => f64::NAN,
        }
    })
}

fn zip3<F>(a: &Raster<f64>, b: &Raster<f64>, c: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64, f64, f64) -> f64 + Sync + Send,
{
    a.ensure_same_shape(b)?;
    a.ensure_same_shape(c)?;
    map_cells(a, Some(f64::NAN), |row, col| {
        match (valid_at(a, row, col), valid_at(b, row, col), valid_at(c, row, col)) {
            (Some(va), Some(vb), Some(vc)) => finite_or_nan(f(va, vb, vc)),
            _ => f64::NAN,
        }
    })
}

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// `(band_a - band_b) / (band_a + band_b)`
///
/// No epsilon: a zero denominator yields NaN for that pixel.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    zip2(band_a, band_b, |a, b| (a - b) / (a + b))
}

/// `(band_a - band_b) / (band_a + band_b + eps)`
pub fn normalized_difference_eps(
    band_a: &Raster<f64>,
    band_b: &Raster<f64>,
    eps: f64,
) -> Result<Raster<f64>> {
    zip2(band_a, band_b, move |a, b| (a - b) / (a + b + eps))
}

// ---------------------------------------------------------------------------
// NDVI / NDWI
// ---------------------------------------------------------------------------

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
///
/// Dense vegetation sits around 0.6 to 0.9, bare soil 0.1 to 0.2 and
/// water below zero.
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// Normalized Difference Water Index (McFeeters, 1996)
///
/// `NDWI = (Green - NIR) / (Green + NIR)`
///
/// Positive values indicate open water.
pub fn ndwi(green: &Raster<f64>, nir: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(green, nir)
}

/// NDWI with a denominator epsilon, as used for Sentinel-2 water masks.
pub fn ndwi_eps(green: &Raster<f64>, nir: &Raster<f64>, eps: f64) -> Result<Raster<f64>> {
    normalized_difference_eps(green, nir, eps)
}

// ---------------------------------------------------------------------------
// NDTI
// ---------------------------------------------------------------------------

/// Normalized Difference Turbidity Index (Lacaux et al., 2007)
///
/// `NDTI = (Red - Green) / (Red + Green + eps)`
///
/// Higher values mean more suspended sediment. Only meaningful over water.
pub fn ndti(red: &Raster<f64>, green: &Raster<f64>, eps: f64) -> Result<Raster<f64>> {
    normalized_difference_eps(red, green, eps)
}

// ---------------------------------------------------------------------------
// MVI
// ---------------------------------------------------------------------------

/// Mangrove Vegetation Index (Baloloy et al., 2020)
///
/// `MVI = (NIR - Green) / (SWIR1 - Green + eps)`
pub fn mvi(
    nir: &Raster<f64>,
    green: &Raster<f64>,
    swir1: &Raster<f64>,
    eps: f64,
) -> Result<Raster<f64>> {
    zip3(nir, green, swir1, move |n, g, s| (n - g) / (s - g + eps))
}
