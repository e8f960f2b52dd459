//! Row-parallel cell mapping shared by the per-pixel algorithms.

use crate::maybe_rayon::*;
use estuaria_core::raster::{Raster, RasterElement};
use estuaria_core::Result;

/// Whether an f64 cell is invalid under `nodata` (NaN always is).
pub(crate) fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) if !nd.is_nan() => (value - nd).abs() < f64::EPSILON,
        _ => false,
    }
}

/// Valid value of an f64 raster at (row, col), with bounds assumed checked.
#[inline]
pub(crate) fn valid_at(raster: &Raster<f64>, row: usize, col: usize) -> Option<f64> {
    let v = unsafe { raster.get_unchecked(row, col) };
    if is_nodata_f64(v, raster.nodata()) {
        None
    } else {
        Some(v)
    }
}

/// Build a raster on `template`'s grid by evaluating `f(row, col)` for
/// every cell, one row per task.
pub(crate) fn map_cells<T, U, F>(template: &Raster<T>, nodata: Option<U>, f: F) -> Result<Raster<U>>
where
    T: RasterElement,
    U: RasterElement,
    F: Fn(usize, usize) -> U + Sync + Send,
{
    let (rows, cols) = template.shape();
    let data: Vec<U> = (0..rows)
        .into_par_iter()
        .flat_map(|row| (0..cols).map(|col| f(row, col)).collect::<Vec<U>>())
        .collect();
    template.derive(data, nodata)
}

/// Mask cell as a boolean; `None` for nodata (anything but 0 or 1).
#[inline]
pub(crate) fn mask_at(mask: &Raster<u8>, row: usize, col: usize) -> Option<bool> {
    match unsafe { mask.get_unchecked(row, col) } {
        estuaria_core::MASK_TRUE => Some(true),
        estuaria_core::MASK_FALSE => Some(false),
        _ => None,
    }
}
