//! Runs every indicator against one backend and ROI.
//!
//! Indicators are evaluated independently: a failure in one is recorded
//! in its slot of the [`DashboardReport`] and the others still run.

use std::time::Instant;

use estuaria_cloud::GeospatialBackend;
use serde::Serialize;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{Indicator, Result};
use crate::flood::{assess_flood, FloodAssessment, FloodReport};
use crate::mangrove::{assess_mangrove, MangroveAssessment, MangroveReport};
use crate::turbidity::{assess_turbidity, TurbidityAssessment, TurbidityReport};

pub struct Dashboard<'a> {
    backend: &'a dyn GeospatialBackend,
    config: &'a Config,
}

/// One result per indicator.
#[derive(Debug)]
pub struct DashboardReport {
    pub flood: Result<FloodAssessment>,
    pub mangrove: Result<MangroveAssessment>,
    pub turbidity: Result<TurbidityAssessment>,
}

/// Serializable outcome of one indicator.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T> {
    Ok { report: T },
    Failed { error: String },
}

impl<T> Outcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub flood: Outcome<FloodReport>,
    pub mangrove: Outcome<MangroveReport>,
    pub turbidity: Outcome<TurbidityReport>,
}

impl<'a> Dashboard<'a> {
    pub fn new(backend: &'a dyn GeospatialBackend, config: &'a Config) -> Self {
        Self { backend, config }
    }

    pub fn run(&self) -> DashboardReport {
        let c = self.config;
        info!(backend = self.backend.name(), "running dashboard");
        DashboardReport {
            flood: timed(Indicator::Flood, || assess_flood(self.backend, &c.roi, &c.flood)),
            mangrove: timed(Indicator::Mangrove, || {
                assess_mangrove(self.backend, &c.roi, &c.years, &c.mangrove)
            }),
            turbidity: timed(Indicator::Turbidity, || {
                assess_turbidity(self.backend, &c.roi, &c.turbidity)
            }),
        }
    }
}

fn timed<T>(indicator: Indicator, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let start = Instant::now();
    let result = f();
    let elapsed_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => info!(%indicator, elapsed_ms, "indicator done"),
        Err(e) => error!(%indicator, elapsed_ms, error = %e, "indicator failed"),
    }
    result
}

impl DashboardReport {
    pub fn failures(&self) -> usize {
        [self.flood.is_err(), self.mangrove.is_err(), self.turbidity.is_err()]
            .into_iter()
            .filter(|&failed| failed)
            .count()
    }

    pub fn summary(&self) -> DashboardSummary {
        DashboardSummary {
            flood: outcome(&self.flood, |a| a.report.clone()),
            mangrove: outcome(&self.mangrove, |a| a.report.clone()),
            turbidity: outcome(&self.turbidity, |a| a.report.clone()),
        }
    }
}

fn outcome<A, T>(result: &Result<A>, report: impl FnOnce(&A) -> T) -> Outcome<T> {
    match result {
        Ok(a) => Outcome::Ok { report: report(a) },
        Err(e) => Outcome::Failed { error: e.to_string() },
    }
}
