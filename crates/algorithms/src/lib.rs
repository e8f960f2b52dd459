//! # Estuaria Algorithms
//!
//! Pure raster computations behind the coastal indicators.
//!
//! ## Categories
//!
//! - **imagery**: spectral indices (NDVI, NDWI, NDTI, MVI), band math,
//!   threshold classification, Landsat QA masking, mask change (loss/gain)
//! - **terrain**: topographic position index, distance to permanent water
//! - **statistics**: zonal area, mean / std-dev, histogram, class areas
//! - **scoring**: fixed threshold tables, composite scoring, flood hazard

pub mod imagery;
mod maybe_rayon;
mod pixelwise;
pub mod scoring;
pub mod statistics;
pub mod terrain;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        classify, mask_change, mvi, ndti, ndvi, ndwi, ndwi_eps, normalized_difference,
        normalized_difference_eps, range_mask, threshold_mask, MaskChange, ThresholdBand,
        ThresholdTable,
    };
    pub use crate::scoring::{composite_score, composite_sum, FloodHazardScorer};
    pub use crate::statistics::{area_hectares, histogram, mean_std_dev, PixelArea};
    pub use crate::terrain::{distance_to_water, tpi, DistanceParams, TpiParams};
    pub use estuaria_core::prelude::*;
}
