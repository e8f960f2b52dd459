//! Hazard scoring
//!
//! - **tables**: fixed threshold tables for each flood sub-score
//! - **composite**: pixel-wise sum and re-classification
//! - **flood**: the five-factor tidal-flood hazard

pub mod composite;
pub mod flood;
pub mod tables;

pub use composite::{composite_score, composite_sum};
pub use flood::{
    mask_distance, FloodHazardScorer, FloodPixelInputs, FloodPixelScores, FloodRasterInputs, FloodScores,
};
