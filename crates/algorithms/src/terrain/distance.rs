//! Distance to permanent water
//!
//! Exact Euclidean distance transform (Felzenszwalb & Huttenlocher, 2012)
//! from every cell to the nearest cell whose water occurrence exceeds a
//! threshold. Computed as two separable 1-D passes of the lower envelope
//! of parabolas, columns first and rows second, with the cell spacing
//! of each axis folded into the parabola weight so the result is in metres.

use crate::maybe_rayon::*;
use crate::pixelwise::valid_at;
use estuaria_core::raster::Raster;
use estuaria_core::{Error, Result};

/// Parameters for the distance transform
#[derive(Debug, Clone)]
pub struct DistanceParams {
    /// Occurrence (percent of observations) above which a cell is permanent water
    pub water_threshold: f64,
}

impl Default for DistanceParams {
    fn default() -> Self {
        Self { water_threshold: 80.0 }
    }
}

/// Distance in metres from each cell to the nearest permanent-water cell.
///
/// Cells with nodata occurrence are never sources but still receive a
/// distance. Geographic grids are converted to metres at each row's
/// latitude. If no cell qualifies as water every output cell is NaN.
pub fn distance_to_water(occurrence: &Raster<f64>, params: DistanceParams) -> Result<Raster<f64>> {
    if params.water_threshold.is_nan() {
        return Err(Error::invalid_parameter("water_threshold", "NaN", "must be a number"));
    }
    let (rows, cols) = occurrence.shape();
    let threshold = params.water_threshold;
    let geographic = occurrence.is_geographic();
    let transform = *occurrence.transform();

    let spacing = |row: usize| -> (f64, f64) {
        if geographic {
            transform.geodesic_cell_size(row)
        } else {
            (transform.pixel_width.abs(), transform.pixel_height.abs())
        }
    };
    // Meridian spacing does not vary with latitude on the sphere.
    let (_, dy) = spacing(0);

    // Pass 1: squared vertical distance to the nearest source in each column.
    let columns: Vec<Vec<f64>> = (0..cols)
        .into_par_iter()
        .map(|col| {
            let f: Vec<f64> = (0..rows)
                .map(|row| match valid_at(occurrence, row, col) {
                    Some(v) if v > threshold => 0.0,
                    _ => f64::INFINITY,
                })
                .collect();
            lower_envelope(&f, dy)
        })
        .collect();

    // Pass 2: combine along rows with the row's own horizontal spacing.
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let (dx, _) = spacing(row);
            let f: Vec<f64> = (0..cols).map(|col| columns[col][row]).collect();
            lower_envelope(&f, dx)
                .into_iter()
                .map(|d2| if d2.is_finite() { d2.sqrt() } else { f64::NAN })
                .collect::<Vec<f64>>()
        })
        .collect();

    occurrence.derive(data, Some(f64::NAN))
}

/// 1-D squared distance transform `d(p) = min_q (w * (p - q))² + f(q)`.
fn lower_envelope(f: &[f64], w: f64) -> Vec<f64> {
    let n = f.len();
    let mut out = vec![f64::INFINITY; n];
    let w2 = w * w;

    // Only finite samples can be parabola vertices.
    let sites: Vec<usize> = (0..n).filter(|&q| f[q].is_finite()).collect();
    if sites.is_empty() {
        return out;
    }

    let intersect = |q: usize, v: usize| -> f64 {
        let (qf, vf) = (q as f64, v as f64);
        ((f[q] + w2 * qf * qf) - (f[v] + w2 * vf * vf)) / (2.0 * w2 * (qf - vf))
    };

    let mut v: Vec<usize> = Vec::with_capacity(sites.len());
    let mut z: Vec<f64> = Vec::with_capacity(sites.len() + 1);
    v.push(sites[0]);
    z.push(f64::NEG_INFINITY);
    z.push(f64::INFINITY);

    for &q in &sites[1..] {
        let mut s = intersect(q, v[v.len() - 1]);
        while s <= z[v.len() - 1] {
            v.pop();
            z.pop();
            if v.is_empty() {
                break;
            }
            s = intersect(q, v[v.len() - 1]);
        }
        if v.is_empty() {
            v.push(q);
            z.clear();
            z.push(f64::NEG_INFINITY);
        } else {
            v.push(q);
            z.pop();
            z.push(s);
        }
        z.push(f64::INFINITY);
    }

    let mut k = 0;
    for (p, slot) in out.iter_mut().enumerate() {
        let pf = p as f64;
        while z[k + 1] < pf {
            k += 1;
        }
        let d = pf - v[k] as f64;
        *slot = w2 * d * d + f[v[k]];
    }
    out
}
