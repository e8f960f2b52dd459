//! Topographic Position Index (TPI)
//!
//! TPI is the difference between a cell's elevation and the mean elevation
//! of the window around it:
//!
//!   TPI = z_center - mean(z_window)
//!
//! - Positive TPI → cell is higher than surroundings (ridge, embankment)
//! - Negative TPI → cell is lower than surroundings (depression, channel)
//!
//! The window is a circle of `radius` cells and includes the centre cell.
//! Nodata neighbours are skipped and edge cells use the part of the window
//! that falls inside the raster.
//! Reference: Weiss (2001) "Topographic Position and Landforms Analysis"

use crate::pixelwise::{map_cells, valid_at};
use estuaria_core::raster::{Neighborhood, Raster};
use estuaria_core::{Algorithm, Error, Result};

/// Parameters for TPI calculation
#[derive(Debug, Clone)]
pub struct TpiParams {
    /// Circular window radius in cells
    pub radius: usize,
}

impl Default for TpiParams {
    fn default() -> Self {
        Self { radius: 5 }
    }
}

/// TPI algorithm
#[derive(Debug, Clone, Default)]
pub struct Tpi;

impl Algorithm for Tpi {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = TpiParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "TPI"
    }

    fn description(&self) -> &'static str {
        "Topographic Position Index: elevation relative to the circular window mean"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        tpi(&input, params)
    }
}

/// Calculate the Topographic Position Index
///
/// # Returns
/// Raster with TPI values in the DEM's elevation units
pub fn tpi(dem: &Raster<f64>, params: TpiParams) -> Result<Raster<f64>> {
    if params.radius == 0 {
        return Err(Error::invalid_parameter("radius", 0, "must be at least 1 cell"));
    }
    let (rows, cols) = dem.shape();
    let offsets = Neighborhood::Circle(params.radius).offsets();

    map_cells(dem, Some(f64::NAN), |row, col| {
        let Some(center) = valid_at(dem, row, col) else {
            return f64::NAN;
        };

        let mut sum = 0.0;
        let mut count = 0u32;
        for &(dr, dc) in &offsets {
            let nr = row as isize + dr;
            let nc = col as isize + dc;
            if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                continue;
            }
            if let Some(v) = valid_at(dem, nr as usize, nc as usize) {
                sum += v;
                count += 1;
            }
        }

        // count >= 1: the centre itself is valid
        center - sum / f64::from(count)
    })
}
