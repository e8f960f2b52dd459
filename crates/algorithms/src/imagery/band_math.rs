//! Band math operations
//!
//! Raster algebra: apply a function to one raster, or a binary operation
//! to two rasters, cell by cell.

use crate::pixelwise::{map_cells, valid_at};
use estuaria_core::raster::Raster;
use estuaria_core::Result;

/// Binary operations for band math
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandMathOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Min,
    Max,
    /// `1.0` where `a > b`, else `0.0`
    Greater,
    /// `1.0` where `a < b`, else `0.0`
    Less,
}

impl BandMathOp {
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BandMathOp::Add => a + b,
            BandMathOp::Subtract => a - b,
            BandMathOp::Multiply => a * b,
            BandMathOp::Divide => {
                if b == 0.0 {
                    f64::NAN
                } else {
                    a / b
                }
            }
            BandMathOp::Min => a.min(b),
            BandMathOp::Max => a.max(b),
            BandMathOp::Greater => f64::from(u8::from(a > b)),
            BandMathOp::Less => f64::from(u8::from(a < b)),
        }
    }
}

/// Apply a unary function to every valid cell in a raster.
///
/// Nodata cells stay NaN; non-finite results are stored as NaN.
///
/// # Example
/// ```ignore
/// let reflectance = band_math(&dn, |v| v * 0.0000275 - 0.2)?;
/// ```
pub fn band_math<F>(raster: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64) -> f64 + Sync + Send,
{
    map_cells(raster, Some(f64::NAN), |row, col| {
        valid_at(raster, row, col)
            .map(&f)
            .filter(|v| v.is_finite())
            .unwrap_or(f64::NAN)
    })
}

/// Apply a binary operation between two rasters element-wise.
///
/// Both rasters must have the same dimensions. Nodata in either input
/// produces nodata in the output.
pub fn band_math_binary(a: &Raster<f64>, b: &Raster<f64>, op: BandMathOp) -> Result<Raster<f64>> {
    a.ensure_same_shape(b)?;
    map_cells(a, Some(f64::NAN), |row, col| {
        match (valid_at(a, row, col), valid_at(b, row, col)) {
            (Some(va), Some(vb)) => {
                let v = op.apply(va, vb);
                if v.is_finite() { v } else { f64::NAN }
            }
            _ => f64::NAN,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use estuaria_core::GeoTransform;

    fn make_band(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(5, 5, value);
        r.set_transform(GeoTransform::new(0.0, 5.0, 1.0, -1.0));
        r
    }

    #[test]
    fn test_band_math_rescale() {
        let input = make_band(20000.0);
        let result = band_math(&input, |v| v * 0.0000275 - 0.2).unwrap();
        assert_relative_eq!(result.get(2, 2).unwrap(), 0.35, epsilon = 1e-12);
    }

    #[test]
    fn test_band_math_preserves_nan() {
        let mut input = make_band(100.0);
        input.set(2, 2, f64::NAN).unwrap();

        let result = band_math(&input, |v| v * 2.0).unwrap();
        assert!(result.get(2, 2).unwrap().is_nan());
        assert_relative_eq!(result.get(0, 0).unwrap(), 200.0);
    }

    #[test]
    fn test_band_math_respects_nodata_value() {
        let mut input = make_band(4.0);
        input.set_nodata(Some(-9999.0));
        input.set(1, 1, -9999.0).unwrap();

        let result = band_math(&input, |v| v + 1.0).unwrap();
        assert!(result.get(1, 1).unwrap().is_nan());
        assert_relative_eq!(result.get(0, 1).unwrap(), 5.0);
    }

    #[test]
    fn test_band_math_binary_ops() {
        let a = make_band(10.0);
        let b = make_band(4.0);

        let add = band_math_binary(&a, &b, BandMathOp::Add).unwrap();
        assert_relative_eq!(add.get(2, 2).unwrap(), 14.0);
        let div = band_math_binary(&a, &b, BandMathOp::Divide).unwrap();
        assert_relative_eq!(div.get(2, 2).unwrap(), 2.5);
        let gt = band_math_binary(&a, &b, BandMathOp::Greater).unwrap();
        assert_relative_eq!(gt.get(2, 2).unwrap(), 1.0);
        let lt = band_math_binary(&a, &b, BandMathOp::Less).unwrap();
        assert_relative_eq!(lt.get(2, 2).unwrap(), 0.0);
    }

    #[test]
    fn test_band_math_binary_divide_by_zero() {
        let a = make_band(10.0);
        let b = make_band(0.0);
        let result = band_math_binary(&a, &b, BandMathOp::Divide).unwrap();
        assert!(result.get(2, 2).unwrap().is_nan());
    }

    #[test]
    fn test_band_math_binary_dimension_mismatch() {
        let a = Raster::<f64>::filled(5, 5, 1.0);
        let b = Raster::<f64>::filled(3, 3, 1.0);
        assert!(band_math_binary(&a, &b, BandMathOp::Add).is_err());
    }
}
