//! Raster data structures

mod element;
mod geotransform;
mod grid;
mod neighborhood;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics};
pub use neighborhood::Neighborhood;

/// Binary mask value for "true".
pub const MASK_TRUE: u8 = 1;
/// Binary mask value for "false".
pub const MASK_FALSE: u8 = 0;
/// Binary mask value for an invalid (masked-out) pixel.
pub const MASK_NODATA: u8 = u8::MAX;
