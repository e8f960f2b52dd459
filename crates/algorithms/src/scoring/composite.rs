//! Composite scoring
//!
//! Pixel-wise sum of score rasters and re-classification of the sum.

use crate::imagery::{classify, ThresholdTable};
use crate::pixelwise::{map_cells, valid_at};
use estuaria_core::raster::Raster;
use estuaria_core::{Error, Result};

/// Sum score rasters cell by cell.
///
/// A cell is valid only where every input is valid. The inputs must share
/// one shape and at least one must be given.
pub fn composite_sum(inputs: &[&Raster<f64>]) -> Result<Raster<f64>> {
    let (first, rest) = inputs
        .split_first()
        .ok_or_else(|| Error::invalid_parameter("inputs", "[]", "need at least one score raster"))?;
    for r in rest {
        first.ensure_same_shape(*r)?;
    }

    map_cells(*first, Some(f64::NAN), |row, col| {
        let mut sum = 0.0;
        for r in inputs {
            match valid_at(r, row, col) {
                Some(v) => sum += v,
                None => return f64::NAN,
            }
        }
        sum
    })
}

/// `classify(composite_sum(inputs), table)`
pub fn composite_score(inputs: &[&Raster<f64>], table: &ThresholdTable) -> Result<Raster<f64>> {
    classify(&composite_sum(inputs)?, table)
}
