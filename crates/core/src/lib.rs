//! # Estuaria Core
//!
//! Shared building blocks for the Estuaria coastal-indicator toolkit.
//!
//! This crate provides:
//! - `Raster<T>`: georeferenced grid with a nodata convention
//! - `GeoTransform` and `CRS`: georeferencing metadata
//! - `Roi`: the polygon every computation is clipped to
//! - Native GeoTIFF reading and writing
//! - The `Algorithm` trait shared by parameterised raster operations

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod roi;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster, RasterElement, MASK_FALSE, MASK_NODATA, MASK_TRUE};
pub use roi::Roi;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement};
    pub use crate::roi::Roi;
    pub use crate::Algorithm;
}

/// A named, parameterised raster operation.
///
/// Implementations are pure: the same input and parameters always produce
/// the same output.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Short identifier, e.g. `"TPI"`
    fn name(&self) -> &'static str;

    /// One-line description
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(
        &self,
        input: Self::Input,
        params: Self::Params,
    ) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
