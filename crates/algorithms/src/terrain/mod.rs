//! Terrain analysis algorithms
//!
//! - TPI: Topographic Position Index over a circular window
//! - Distance: Euclidean distance to permanent water, in metres

pub mod distance;
pub mod tpi;

pub use distance::{distance_to_water, DistanceParams};
pub use tpi::{tpi, Tpi, TpiParams};
