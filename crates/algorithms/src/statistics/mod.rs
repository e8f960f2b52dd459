//! Statistical reductions over the region of interest
//!
//! - **zonal**: mask area in hectares, mean / std-dev, histograms,
//!   per-zone statistics and per-class areas

pub mod zonal;

pub use zonal::{
    area_hectares, class_areas, histogram, mean_std_dev, zonal_statistics, Histogram, MeanStd,
    PixelArea, ZonalResult, DEFAULT_BUCKETS, M2_PER_HECTARE,
};
