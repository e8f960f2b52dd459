//! Error types for the indicator pipelines.

use std::fmt;

use estuaria_cloud::CloudError;
use serde::Serialize;
use thiserror::Error;

/// The three indicator families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    Flood,
    Mangrove,
    Turbidity,
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Indicator::Flood => "flood",
            Indicator::Mangrove => "mangrove",
            Indicator::Turbidity => "turbidity",
        })
    }
}

#[derive(Error, Debug)]
pub enum IndicatorError {
    /// A required remote input could not be fetched; fatal for that indicator.
    #[error("{indicator}: failed to fetch input: {source}")]
    RemoteFetch {
        indicator: Indicator,
        #[source]
        source: CloudError,
    },

    #[error("computation failed: {0}")]
    Compute(#[from] estuaria_core::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl IndicatorError {
    pub(crate) fn fetch(indicator: Indicator) -> impl FnOnce(CloudError) -> Self {
        move |source| IndicatorError::RemoteFetch { indicator, source }
    }
}

pub type Result<T> = std::result::Result<T, IndicatorError>;
