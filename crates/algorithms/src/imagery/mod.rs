//! Imagery analysis algorithms
//!
//! - Spectral indices: NDVI, NDWI, NDTI, MVI and the generic normalized difference
//! - Band math: raster algebra
//! - Threshold classification and binary masks
//! - Landsat QA masking and reflectance scaling
//! - Mask change: loss/gain between two periods

pub mod band_math;
pub mod change_detection;
pub mod indices;
pub mod quality;
pub mod threshold;

pub use band_math::{band_math, band_math_binary, BandMathOp};
pub use change_detection::{mask_change, MaskChange};
pub use indices::{
    mvi, ndti, ndvi, ndwi, ndwi_eps, normalized_difference, normalized_difference_eps,
    SpectralIndex, INDEX_EPSILON,
};
pub use threshold::{classify, range_mask, threshold_mask, ThresholdBand, ThresholdTable, ValueRange};
