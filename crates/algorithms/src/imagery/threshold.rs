//! Threshold classification
//!
//! Maps continuous values to ordinal scores through an ordered table of
//! half-open bands `lower < value <= upper`, where a missing bound is
//! open-ended.
//!
//! Bands are evaluated top to bottom against the input value and the
//! **first applicable band wins**. A valid value that no band covers is
//! unclassified and comes out as NaN. For a table without overlapping bands
//! the evaluation order does not matter.

use crate::pixelwise::{map_cells, valid_at};
use estuaria_core::raster::Raster;
use estuaria_core::{Error, Result, MASK_FALSE, MASK_NODATA, MASK_TRUE};
use serde::{Deserialize, Serialize};

/// Interval `lower < value <= upper`; `None` bounds are infinite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl ValueRange {
    pub fn contains(&self, value: f64) -> bool {
        self.lower.is_none_or(|l| value > l) && self.upper.is_none_or(|u| value <= u)
    }

    fn lo(&self) -> f64 {
        self.lower.unwrap_or(f64::NEG_INFINITY)
    }

    fn hi(&self) -> f64 {
        self.upper.unwrap_or(f64::INFINITY)
    }
}

fn bound(v: f64) -> Option<f64> {
    if v.is_infinite() { None } else { Some(v) }
}

/// One row of a threshold table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    pub score: u8,
}

impl ThresholdBand {
    /// `lower < value <= upper`
    pub const fn between(lower: f64, upper: f64, score: u8) -> Self {
        Self { lower: Some(lower), upper: Some(upper), score }
    }

    /// `value > lower`
    pub const fn above(lower: f64, score: u8) -> Self {
        Self { lower: Some(lower), upper: None, score }
    }

    /// `value <= upper`
    pub const fn at_most(upper: f64, score: u8) -> Self {
        Self { lower: None, upper: Some(upper), score }
    }

    pub fn range(&self) -> ValueRange {
        ValueRange { lower: self.lower, upper: self.upper }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.range().contains(value)
    }
}

/// Ordered list of threshold bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ThresholdBand>", into = "Vec<ThresholdBand>")]
pub struct ThresholdTable {
    bands: Vec<ThresholdBand>,
}

impl ThresholdTable {
    /// Build a table, rejecting empty tables, NaN bounds and empty bands.
    pub fn new(bands: Vec<ThresholdBand>) -> Result<Self> {
        if bands.is_empty() {
            return Err(Error::invalid_parameter("bands", "[]", "table needs at least one band"));
        }
        for band in &bands {
            let r = band.range();
            if band.lower.is_some_and(f64::is_nan) || band.upper.is_some_and(f64::is_nan) {
                return Err(Error::invalid_parameter("bands", format!("{band:?}"), "NaN bound"));
            }
            if r.lo() >= r.hi() {
                return Err(Error::invalid_parameter(
                    "bands",
                    format!("{band:?}"),
                    "lower bound must be below upper bound",
                ));
            }
        }
        Ok(Self { bands })
    }

    /// Table from compile-time bands known to be well formed.
    pub(crate) fn from_static(bands: &[ThresholdBand]) -> Self {
        Self { bands: bands.to_vec() }
    }

    pub fn bands(&self) -> &[ThresholdBand] {
        &self.bands
    }

    /// Score of the first band containing `value`, or `None` if unclassified.
    pub fn score(&self, value: f64) -> Option<u8> {
        if value.is_nan() {
            return None;
        }
        self.bands.iter().find(|b| b.contains(value)).map(|b| b.score)
    }

    /// Intervals of the real line no band covers, in ascending order.
    pub fn gaps(&self) -> Vec<ValueRange> {
        let mut ranges: Vec<ValueRange> = self.bands.iter().map(ThresholdBand::range).collect();
        ranges.sort_by(|a, b| a.lo().total_cmp(&b.lo()));

        let mut gaps = Vec::new();
        let mut covered_to = f64::NEG_INFINITY;
        let mut first = true;
        for r in ranges {
            if first {
                if r.lo() > f64::NEG_INFINITY {
                    gaps.push(ValueRange { lower: None, upper: Some(r.lo()) });
                }
                first = false;
            } else if r.lo() > covered_to {
                gaps.push(ValueRange { lower: bound(covered_to), upper: Some(r.lo()) });
            }
            covered_to = covered_to.max(r.hi());
        }
        if covered_to < f64::INFINITY {
            gaps.push(ValueRange { lower: Some(covered_to), upper: None });
        }
        gaps
    }

    /// Index pairs `(i, j)`, `i < j`, of bands sharing at least one value.
    pub fn overlaps(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for (i, a) in self.bands.iter().enumerate() {
            for (j, b) in self.bands.iter().enumerate().skip(i + 1) {
                let (ra, rb) = (a.range(), b.range());
                if ra.lo().max(rb.lo()) < ra.hi().min(rb.hi()) {
                    pairs.push((i, j));
                }
            }
        }
        pairs
    }
}

impl TryFrom<Vec<ThresholdBand>> for ThresholdTable {
    type Error = Error;

    fn try_from(bands: Vec<ThresholdBand>) -> Result<Self> {
        Self::new(bands)
    }
}

impl From<ThresholdTable> for Vec<ThresholdBand> {
    fn from(table: ThresholdTable) -> Self {
        table.bands
    }
}

/// Classify a raster into scores.
///
/// Output holds the score as `f64`; masked or unclassified pixels are NaN.
///
/// # Example
/// ```ignore
/// let vegetation = classify(&ndvi, &tables::ndvi())?;
/// ```
pub fn classify(raster: &Raster<f64>, table: &ThresholdTable) -> Result<Raster<f64>> {
    map_cells(raster, Some(f64::NAN), |row, col| {
        valid_at(raster, row, col)
            .and_then(|v| table.score(v))
            .map_or(f64::NAN, f64::from)
    })
}

/// Binary mask of `min <= value <= max` (both inclusive).
///
/// Invalid input pixels are `MASK_NODATA`. `min > max` is rejected.
pub fn range_mask(raster: &Raster<f64>, min: f64, max: f64) -> Result<Raster<u8>> {
    if min.is_nan() || max.is_nan() || min > max {
        return Err(Error::invalid_parameter(
            "min",
            min,
            format!("must be a number not greater than max ({max})"),
        ));
    }
    map_cells(raster, Some(MASK_NODATA), |row, col| match valid_at(raster, row, col) {
        Some(v) if v >= min && v <= max => MASK_TRUE,
        Some(_) => MASK_FALSE,
        None => MASK_NODATA,
    })
}

/// Binary mask of `value > threshold`.
pub fn threshold_mask(raster: &Raster<f64>, threshold: f64) -> Result<Raster<u8>> {
    map_cells(raster, Some(MASK_NODATA), |row, col| match valid_at(raster, row, col) {
        Some(v) if v > threshold => MASK_TRUE,
        Some(_) => MASK_FALSE,
        None => MASK_NODATA,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tpi_like() -> ThresholdTable {
        ThresholdTable::new(vec![
            ThresholdBand::above(0.0, 1),
            ThresholdBand::between(-2.0, 0.0, 2),
            ThresholdBand::between(-4.0, -2.0, 3),
            ThresholdBand::between(-6.0, -4.0, 4),
            ThresholdBand::at_most(-8.0, 5),
        ])
        .unwrap()
    }

    #[test]
    fn test_boundaries_are_upper_inclusive() {
        let t = tpi_like();
        assert_eq!(t.score(0.0), Some(2));
        assert_eq!(t.score(1e-9), Some(1));
        assert_eq!(t.score(-2.0), Some(3));
        assert_eq!(t.score(-8.0), Some(5));
    }

    #[test]
    fn test_gap_is_unclassified() {
        let t = tpi_like();
        assert_eq!(t.score(-7.0), None);
        assert_eq!(t.score(-6.0), None);
        assert_eq!(t.score(-5.999), Some(4));
        assert_eq!(t.gaps(), vec![ValueRange { lower: Some(-8.0), upper: Some(-6.0) }]);
    }

    #[test]
    fn test_open_table_reports_outer_gaps() {
        let t = ThresholdTable::new(vec![ThresholdBand::between(0.0, 1.0, 1)]).unwrap();
        assert_eq!(
            t.gaps(),
            vec![
                ValueRange { lower: None, upper: Some(0.0) },
                ValueRange { lower: Some(1.0), upper: None },
            ]
        );
    }

    #[test]
    fn test_first_band_wins_on_overlap() {
        let t = ThresholdTable::new(vec![
            ThresholdBand::above(0.0, 1),
            ThresholdBand::above(5.0, 2),
            ThresholdBand::at_most(0.0, 3),
        ])
        .unwrap();
        assert_eq!(t.score(10.0), Some(1));
        assert_eq!(t.overlaps(), vec![(0, 1)]);
        assert!(t.gaps().is_empty());
    }

    #[test]
    fn test_rejects_invalid_bands() {
        assert!(ThresholdTable::new(vec![]).is_err());
        assert!(ThresholdTable::new(vec![ThresholdBand::between(1.0, 1.0, 1)]).is_err());
        assert!(ThresholdTable::new(vec![ThresholdBand::above(f64::NAN, 1)]).is_err());
    }

    #[test]
    fn test_classify_raster() {
        let raster = Raster::from_vec(vec![0.5, -1.0, -7.0, f64::NAN], 2, 2).unwrap();
        let out = classify(&raster, &tpi_like()).unwrap();
        assert_relative_eq!(out.get(0, 0).unwrap(), 1.0);
        assert_relative_eq!(out.get(0, 1).unwrap(), 2.0);
        assert!(out.get(1, 0).unwrap().is_nan());
        assert!(out.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_range_mask_inclusive() {
        let raster = Raster::from_vec(vec![2.5, 20.0, 2.49, f64::NAN], 2, 2).unwrap();
        let mask = range_mask(&raster, 2.5, 20.0).unwrap();
        assert_eq!(mask.get(0, 0).unwrap(), MASK_TRUE);
        assert_eq!(mask.get(0, 1).unwrap(), MASK_TRUE);
        assert_eq!(mask.get(1, 0).unwrap(), MASK_FALSE);
        assert_eq!(mask.get(1, 1).unwrap(), MASK_NODATA);
        assert_eq!(mask.nodata(), Some(MASK_NODATA));
    }

    #[test]
    fn test_range_mask_rejects_inverted_bounds() {
        let raster = Raster::<f64>::filled(2, 2, 3.0);
        let err = range_mask(&raster, 5.0, 1.0).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_threshold_mask_strict() {
        let raster = Raster::from_vec(vec![0.0, 0.01, -0.3, f64::NAN], 2, 2).unwrap();
        let mask = threshold_mask(&raster, 0.0).unwrap();
        assert_eq!(mask.get(0, 0).unwrap(), MASK_FALSE);
        assert_eq!(mask.get(0, 1).unwrap(), MASK_TRUE);
        assert_eq!(mask.get(1, 0).unwrap(), MASK_FALSE);
        assert_eq!(mask.get(1, 1).unwrap(), MASK_NODATA);
    }

    #[test]
    fn test_table_deserializes_from_bands() {
        let json = r#"[{"lower":0.0,"upper":null,"score":1},{"lower":null,"upper":0.0,"score":2}]"#;
        let t: ThresholdTable = serde_json::from_str(json).unwrap();
        assert_eq!(t.score(-1.0), Some(2));
    }
}
