//! Landsat Collection 2 Level-2 preprocessing
//!
//! QA_PIXEL cloud masking and surface reflectance scaling.

use crate::imagery::band_math::band_math;
use crate::pixelwise::map_cells;
use estuaria_core::raster::Raster;
use estuaria_core::{Result, MASK_FALSE, MASK_NODATA, MASK_TRUE};

/// QA_PIXEL bit 1: dilated cloud
pub const QA_DILATED_CLOUD: u16 = 1 << 1;
/// QA_PIXEL bit 2: cirrus
pub const QA_CIRRUS: u16 = 1 << 2;
/// QA_PIXEL bit 3: cloud
pub const QA_CLOUD: u16 = 1 << 3;
/// QA_PIXEL bit 4: cloud shadow
pub const QA_CLOUD_SHADOW: u16 = 1 << 4;

/// Bits that must all be clear for a pixel to count as clear sky.
pub const QA_CLEAR_BITS: u16 = QA_DILATED_CLOUD | QA_CIRRUS | QA_CLOUD | QA_CLOUD_SHADOW;

/// Collection 2 surface reflectance scale factor
pub const SR_SCALE: f64 = 0.0000275;
/// Collection 2 surface reflectance offset
pub const SR_OFFSET: f64 = -0.2;

/// Clear-sky mask from a QA_PIXEL band.
///
/// QA values arrive as floats from the GeoTIFF decoder; NaN, negative or
/// out-of-range values are nodata.
pub fn landsat_clear_mask(qa: &Raster<f64>) -> Result<Raster<u8>> {
    qa_clear_mask(qa, QA_CLEAR_BITS)
}

/// Clear mask for an arbitrary QA bit set: true where none of `bits` is set.
pub fn qa_clear_mask(qa: &Raster<f64>, bits: u16) -> Result<Raster<u8>> {
    let nodata = qa.nodata();
    map_cells(qa, Some(MASK_NODATA), |row, col| {
        let v = unsafe { qa.get_unchecked(row, col) };
        if v.is_nan() || nodata.is_some_and(|nd| v == nd) || v < 0.0 || v > f64::from(u16::MAX) {
            return MASK_NODATA;
        }
        if (v as u16) & bits == 0 { MASK_TRUE } else { MASK_FALSE }
    })
}

/// Linear rescale `value * scale + offset`.
pub fn rescale(raster: &Raster<f64>, scale: f64, offset: f64) -> Result<Raster<f64>> {
    band_math(raster, move |v| v * scale + offset)
}

/// Set every pixel not marked clear in `mask` to NaN.
pub fn apply_mask(raster: &Raster<f64>, mask: &Raster<u8>) -> Result<Raster<f64>> {
    raster.ensure_same_shape(mask)?;
    map_cells(raster, Some(f64::NAN), |row, col| {
        let keep = unsafe { mask.get_unchecked(row, col) } == MASK_TRUE;
        let v = unsafe { raster.get_unchecked(row, col) };
        if keep && !raster.is_nodata(v) { v } else { f64::NAN }
    })
}
