//! Zonal statistics
//!
//! Reductions over the region of interest: area of a binary mask in
//! hectares, mean / standard deviation, equal-width histograms, and
//! per-zone statistics for an integer zone raster.
//!
//! Empty results are values, not errors: an empty mask has an area of
//! `0.0` and a raster without valid pixels in the ROI has no mean or
//! histogram (`None`).

use std::collections::BTreeMap;

use crate::maybe_rayon::*;
use crate::pixelwise::valid_at;
use estuaria_core::raster::Raster;
use estuaria_core::{Error, RasterElement, Result, Roi, MASK_TRUE};
use serde::{Deserialize, Serialize};

/// Square metres per hectare
pub const M2_PER_HECTARE: f64 = 10_000.0;

/// Default histogram bucket count
pub const DEFAULT_BUCKETS: usize = 30;

/// How the ground area of one pixel is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelArea {
    /// Every pixel is `gsd × gsd` square metres
    Fixed(f64),
    /// |pixel width × pixel height| in map units² (metric grids)
    Planar,
    /// Spherical area of each lon/lat cell
    Geodesic,
    /// Geodesic for geographic grids, planar otherwise
    Auto,
}

impl Default for PixelArea {
    fn default() -> Self {
        PixelArea::Fixed(10.0)
    }
}

impl PixelArea {
    /// Area in m² of a pixel on `row` of `raster`'s grid.
    pub fn cell_m2<T: RasterElement>(&self, raster: &Raster<T>, row: usize) -> f64 {
        match self {
            PixelArea::Fixed(gsd) => gsd * gsd,
            PixelArea::Planar => raster.transform().cell_area(),
            PixelArea::Geodesic => raster.transform().geodesic_cell_area(row),
            PixelArea::Auto if raster.is_geographic() => raster.transform().geodesic_cell_area(row),
            PixelArea::Auto => raster.transform().cell_area(),
        }
    }

    fn validate<T: RasterElement>(&self, raster: &Raster<T>) -> Result<()> {
        match self {
            PixelArea::Fixed(gsd) if !(gsd.is_finite() && *gsd > 0.0) => {
                Err(Error::invalid_parameter("gsd", gsd, "must be a positive number of metres"))
            }
            PixelArea::Geodesic if !raster.is_geographic() => Err(Error::invalid_parameter(
                "pixel_area",
                "geodesic",
                "requires a geographic (lon/lat) grid",
            )),
            _ => Ok(()),
        }
    }
}

/// Mean and population standard deviation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std_dev: f64,
    pub count: usize,
}

/// Equal-width histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Lower bound of each bucket
    pub bucket_lows: Vec<f64>,
    /// Centre of each bucket
    pub bucket_means: Vec<f64>,
    /// Pixel count per bucket
    pub counts: Vec<u64>,
    /// Bucket width (0 for a constant raster)
    pub bucket_width: f64,
    pub min: f64,
    pub max: f64,
}

impl Histogram {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Area in hectares of mask pixels equal to 1 inside the ROI.
///
/// # Example
/// ```ignore
/// let ha = area_hectares(&mangrove_mask, &roi, PixelArea::Fixed(10.0))?;
/// ```
pub fn area_hectares(mask: &Raster<u8>, roi: &Roi, pixel_area: PixelArea) -> Result<f64> {
    pixel_area.validate(mask)?;
    let inside = roi.mask_for(mask)?;
    let (rows, cols) = mask.shape();

    let m2: f64 = (0..rows)
        .into_par_iter()
        .map(|row| {
            let count = (0..cols)
                .filter(|&col| unsafe {
                    mask.get_unchecked(row, col) == MASK_TRUE
                        && inside.get_unchecked(row, col) == MASK_TRUE
                })
                .count();
            if count == 0 { 0.0 } else { count as f64 * pixel_area.cell_m2(mask, row) }
        })
        .sum();

    Ok(m2 / M2_PER_HECTARE)
}

/// Valid pixel values inside the ROI, row-major.
fn roi_values(raster: &Raster<f64>, roi: &Roi) -> Result<Vec<f64>> {
    let inside = roi.mask_for(raster)?;
    let (rows, cols) = raster.shape();
    let values: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .filter(|&col| unsafe { inside.get_unchecked(row, col) } == MASK_TRUE)
                .filter_map(|col| valid_at(raster, row, col))
                .collect::<Vec<f64>>()
        })
        .collect();
    Ok(values)
}

/// Mean and population standard deviation of valid pixels inside the ROI.
///
/// `None` when no valid pixel falls inside the ROI.
pub fn mean_std_dev(raster: &Raster<f64>, roi: &Roi) -> Result<Option<MeanStd>> {
    let values = roi_values(raster, roi)?;
    if values.is_empty() {
        return Ok(None);
    }
    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;
    Ok(Some(MeanStd { mean, std_dev: var.sqrt(), count }))
}

/// Equal-width histogram of valid pixels inside the ROI.
///
/// Buckets span `[min, max]` of the data; the maximum lands in the last
/// bucket. A constant raster yields one bucket holding every pixel.
pub fn histogram(raster: &Raster<f64>, roi: &Roi, buckets: usize) -> Result<Option<Histogram>> {
    if buckets == 0 {
        return Err(Error::invalid_parameter("buckets", 0, "must be at least 1"));
    }
    let values = roi_values(raster, roi)?;
    if values.is_empty() {
        return Ok(None);
    }

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

    if max == min {
        return Ok(Some(Histogram {
            bucket_lows: vec![min],
            bucket_means: vec![min],
            counts: vec![values.len() as u64],
            bucket_width: 0.0,
            min,
            max,
        }));
    }

    let width = (max - min) / buckets as f64;
    let mut counts = vec![0u64; buckets];
    for v in &values {
        let idx = (((v - min) / width) as usize).min(buckets - 1);
        counts[idx] += 1;
    }
    let bucket_lows: Vec<f64> = (0..buckets).map(|i| min + i as f64 * width).collect();
    let bucket_means = bucket_lows.iter().map(|lo| lo + width / 2.0).collect();

    Ok(Some(Histogram { bucket_lows, bucket_means, counts, bucket_width: width, min, max }))
}

/// Statistics for one zone
#[derive(Debug, Clone, Serialize)]
pub struct ZonalResult {
    pub zone_id: i32,
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Per-zone statistics of `values` over an integer zone raster.
///
/// Zone 0 and NaN values are skipped. Results are ordered by zone id.
pub fn zonal_statistics(
    values: &Raster<f64>,
    zones: &Raster<i32>,
) -> Result<BTreeMap<i32, ZonalResult>> {
    values.ensure_same_shape(zones)?;
    let (rows, cols) = values.shape();

    let mut zone_values: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for row in 0..rows {
        for col in 0..cols {
            let zone = unsafe { zones.get_unchecked(row, col) };
            if zone == 0 {
                continue;
            }
            if let Some(val) = valid_at(values, row, col) {
                zone_values.entry(zone).or_default().push(val);
            }
        }
    }

    let results = zone_values
        .into_iter()
        .map(|(zone_id, vals)| {
            let count = vals.len();
            let sum: f64 = vals.iter().sum();
            let mean = sum / count as f64;
            let var = vals.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / count as f64;
            let (min, max) = vals
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            (zone_id, ZonalResult { zone_id, count, sum, mean, std_dev: var.sqrt(), min, max })
        })
        .collect();

    Ok(results)
}

/// Hectares per class of a classified raster (scores stored as f64),
/// restricted to the ROI. Classes without pixels are absent.
pub fn class_areas(
    classes: &Raster<f64>,
    roi: &Roi,
    pixel_area: PixelArea,
) -> Result<BTreeMap<i32, f64>> {
    pixel_area.validate(classes)?;
    let inside = roi.mask_for(classes)?;
    let (rows, cols) = classes.shape();

    let mut zones: Raster<i32> = classes.with_same_meta(rows, cols);
    let mut areas: Raster<f64> = classes.with_same_meta(rows, cols);
    for row in 0..rows {
        let cell = pixel_area.cell_m2(classes, row);
        for col in 0..cols {
            let in_roi = unsafe { inside.get_unchecked(row, col) } == MASK_TRUE;
            let zone = match valid_at(classes, row, col) {
                Some(v) if in_roi => v.round() as i32,
                _ => 0,
            };
            zones.set(row, col, zone)?;
            areas.set(row, col, cell)?;
        }
    }

    Ok(zonal_statistics(&areas, &zones)?
        .into_iter()
        .map(|(zone, r)| (zone, r.sum / M2_PER_HECTARE))
        .collect())
}
