//! Change detection between two binary masks
//!
//! `loss = A ∧ ¬B` and `gain = B ∧ ¬A`, where A is the earlier period and
//! B the later one. Pixels invalid in either input are invalid in both
//! outputs. No smoothing or minimum patch size is applied.

use crate::maybe_rayon::*;
use crate::pixelwise::mask_at;
use estuaria_core::raster::Raster;
use estuaria_core::{Result, MASK_FALSE, MASK_NODATA, MASK_TRUE};

/// Loss and gain masks between two periods.
#[derive(Debug, Clone)]
pub struct MaskChange {
    /// Present in the earlier mask, absent in the later one
    pub loss: Raster<u8>,
    /// Absent in the earlier mask, present in the later one
    pub gain: Raster<u8>,
}

/// Compute loss/gain between `before` and `after`.
///
/// # Example
/// ```ignore
/// let change = mask_change(&mangrove_2020, &mangrove_2024)?;
/// let lost_ha = area_hectares(&change.loss, &roi, PixelArea::default())?;
/// ```
pub fn mask_change(before: &Raster<u8>, after: &Raster<u8>) -> Result<MaskChange> {
    before.ensure_same_shape(after)?;
    let (rows, cols) = before.shape();

    let (loss_data, gain_data): (Vec<u8>, Vec<u8>) = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut cells = Vec::with_capacity(cols);
            for col in 0..cols {
                cells.push(match (mask_at(before, row, col), mask_at(after, row, col)) {
                    (Some(a), Some(b)) => (flag(a && !b), flag(b && !a)),
                    _ => (MASK_NODATA, MASK_NODATA),
                });
            }
            cells
        })
        .unzip();

    Ok(MaskChange {
        loss: before.derive(loss_data, Some(MASK_NODATA))?,
        gain: before.derive(gain_data, Some(MASK_NODATA))?,
    })
}

fn flag(v: bool) -> u8 {
    if v { MASK_TRUE } else { MASK_FALSE }
}
