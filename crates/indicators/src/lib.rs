//! # Estuaria Indicators
//!
//! The three coastal indicators for one region of interest:
//!
//! - [`flood`]: tidal-flood hazard from water occurrence, terrain and
//!   Landsat indices
//! - [`mangrove`]: MVI mangrove extent per year with loss/gain
//! - [`turbidity`]: NDWI water mask and NDTI turbidity statistics
//!
//! Inputs come from any [`GeospatialBackend`](estuaria_cloud::GeospatialBackend);
//! outputs are serializable reports plus styled [`Layer`]s.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod flood;
mod inputs;
pub mod mangrove;
pub mod style;
pub mod turbidity;

pub use config::{AssistantConfig, BackendConfig, BackendKind, Config};
pub use dashboard::{Dashboard, DashboardReport, DashboardSummary, Outcome};
pub use error::{Indicator, IndicatorError, Result};
pub use flood::{assess_flood, FloodAssessment, FloodParams, FloodReport};
pub use mangrove::{assess_mangrove, MangroveAssessment, MangroveChange, MangroveParams, MangroveReport, MangroveYear};
pub use style::{Layer, LayerStyle};
pub use turbidity::{assess_turbidity, TurbidityAssessment, TurbidityParams, TurbidityReport};
