//! Tidal-flood hazard scoring
//!
//! Five sub-scores (distance to permanent water, elevation, TPI,
//! vegetation, wetness) are summed to a raw hazard of 5..=25 and then
//! re-classified to a final 1..=5 score. Permanent-water cells themselves
//! (distance exactly 0) are excluded from every layer, as are cells with
//! no valid elevation.

use serde::Serialize;

use crate::imagery::{classify, ThresholdTable};
use crate::pixelwise::{map_cells, valid_at};
use crate::scoring::composite::composite_sum;
use crate::scoring::tables;
use estuaria_core::raster::Raster;
use estuaria_core::Result;

/// Per-pixel inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloodPixelInputs {
    pub distance_m: f64,
    pub elevation_m: f64,
    pub tpi: f64,
    pub ndvi: f64,
    pub ndwi: f64,
}

/// Sub-scores, raw sum and final score of one pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FloodPixelScores {
    pub distance: u8,
    pub elevation: u8,
    pub tpi: u8,
    pub vegetation: u8,
    pub wetness: u8,
    pub raw: u8,
    pub final_score: u8,
}

/// Raster inputs, all on one grid
#[derive(Debug, Clone, Copy)]
pub struct FloodRasterInputs<'a> {
    pub distance_m: &'a Raster<f64>,
    pub elevation_m: &'a Raster<f64>,
    pub tpi: &'a Raster<f64>,
    pub ndvi: &'a Raster<f64>,
    pub ndwi: &'a Raster<f64>,
}

/// Score layers of a flood hazard run
#[derive(Debug, Clone)]
pub struct FloodScores {
    pub distance: Raster<f64>,
    pub elevation: Raster<f64>,
    pub tpi: Raster<f64>,
    pub vegetation: Raster<f64>,
    pub wetness: Raster<f64>,
    /// Sum of the five sub-scores (5..=25)
    pub raw: Raster<f64>,
    /// Final 1..=5 hazard
    pub final_score: Raster<f64>,
}

/// Threshold tables for each sub-score and the final re-classification.
#[derive(Debug, Clone)]
pub struct FloodHazardScorer {
    pub distance: ThresholdTable,
    pub elevation: ThresholdTable,
    pub tpi: ThresholdTable,
    pub ndvi: ThresholdTable,
    pub ndwi: ThresholdTable,
    pub final_hazard: ThresholdTable,
}

impl Default for FloodHazardScorer {
    fn default() -> Self {
        Self {
            distance: tables::distance(),
            elevation: tables::elevation(),
            tpi: tables::tpi(),
            ndvi: tables::ndvi(),
            ndwi: tables::ndwi(),
            final_hazard: tables::final_hazard(),
        }
    }
}

impl FloodHazardScorer {
    /// Score a single pixel.
    ///
    /// `None` if the pixel is permanent water or any input is unclassified.
    pub fn score_pixel(&self, inputs: FloodPixelInputs) -> Option<FloodPixelScores> {
        if inputs.distance_m == 0.0 || inputs.elevation_m.is_nan() {
            return None;
        }
        let distance = self.distance.score(inputs.distance_m)?;
        let elevation = self.elevation.score(inputs.elevation_m)?;
        let tpi = self.tpi.score(inputs.tpi)?;
        let vegetation = self.ndvi.score(inputs.ndvi)?;
        let wetness = self.ndwi.score(inputs.ndwi)?;
        let raw = distance + elevation + tpi + vegetation + wetness;
        let final_score = self.final_hazard.score(f64::from(raw))?;
        Some(FloodPixelScores { distance, elevation, tpi, vegetation, wetness, raw, final_score })
    }

    /// Score whole rasters.
    pub fn score(&self, inputs: FloodRasterInputs<'_>) -> Result<FloodScores> {
        let distance_m = mask_distance(inputs.distance_m, inputs.elevation_m)?;

        let distance = classify(&distance_m, &self.distance)?;
        let elevation = classify(inputs.elevation_m, &self.elevation)?;
        let tpi = classify(inputs.tpi, &self.tpi)?;
        let vegetation = classify(inputs.ndvi, &self.ndvi)?;
        let wetness = classify(inputs.ndwi, &self.ndwi)?;

        let raw = composite_sum(&[&distance, &elevation, &tpi, &vegetation, &wetness])?;
        let final_score = classify(&raw, &self.final_hazard)?;

        Ok(FloodScores { distance, elevation, tpi, vegetation, wetness, raw, final_score })
    }
}

/// Distance with permanent water (0 m) and cells lacking a valid
/// elevation set to NaN.
pub fn mask_distance(distance_m: &Raster<f64>, elevation_m: &Raster<f64>) -> Result<Raster<f64>> {
    distance_m.ensure_same_shape(elevation_m)?;
    map_cells(distance_m, Some(f64::NAN), |row, col| {
        match (valid_at(distance_m, row, col), valid_at(elevation_m, row, col)) {
            (Some(d), Some(_)) if d != 0.0 => d,
            _ => f64::NAN,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference() -> FloodPixelInputs {
        FloodPixelInputs { distance_m: 500.0, elevation_m: 3.0, tpi: -1.0, ndvi: 0.1, ndwi: 0.5 }
    }

    #[test]
    fn test_reference_pixel() {
        let s = FloodHazardScorer::default().score_pixel(reference()).unwrap();
        assert_eq!((s.distance, s.elevation, s.tpi, s.vegetation, s.wetness), (5, 5, 2, 5, 4));
        assert_eq!(s.raw, 21);
        assert_eq!(s.final_score, 5);
    }

    #[test]
    fn test_pixel_in_tpi_gap_is_unscored() {
        let inputs = FloodPixelInputs { tpi: -7.0, ..reference() };
        assert!(FloodHazardScorer::default().score_pixel(inputs).is_none());
    }

    #[test]
    fn test_permanent_water_is_excluded() {
        let inputs = FloodPixelInputs { distance_m: 0.0, ..reference() };
        assert!(FloodHazardScorer::default().score_pixel(inputs).is_none());
    }

    #[test]
    fn test_raster_matches_pixel_scores() {
        let distance = Raster::from_vec(vec![500.0, 0.0, 4500.0, 2500.0], 2, 2).unwrap();
        let elevation = Raster::from_vec(vec![3.0, 3.0, 25.0, 12.0], 2, 2).unwrap();
        let tpi = Raster::from_vec(vec![-1.0, -1.0, 2.0, -7.0], 2, 2).unwrap();
        let ndvi = Raster::from_vec(vec![0.1, 0.1, 0.9, 0.5], 2, 2).unwrap();
        let ndwi = Raster::from_vec(vec![0.5, 0.5, -0.7, 0.0], 2, 2).unwrap();

        let scorer = FloodHazardScorer::default();
        let out = scorer
            .score(FloodRasterInputs {
                distance_m: &distance,
                elevation_m: &elevation,
                tpi: &tpi,
                ndvi: &ndvi,
                ndwi: &ndwi,
            })
            .unwrap();

        assert_relative_eq!(out.raw.get(0, 0).unwrap(), 21.0);
        assert_relative_eq!(out.final_score.get(0, 0).unwrap(), 5.0);
        // permanent water
        assert!(out.distance.get(0, 1).unwrap().is_nan());
        assert!(out.raw.get(0, 1).unwrap().is_nan());
        // 1 + 1 + 1 + 1 + 1
        assert_relative_eq!(out.raw.get(1, 0).unwrap(), 5.0);
        assert_relative_eq!(out.final_score.get(1, 0).unwrap(), 2.0);
        // TPI gap drops the pixel from the composite only
        assert!(out.tpi.get(1, 1).unwrap().is_nan());
        assert_relative_eq!(out.elevation.get(1, 1).unwrap(), 3.0);
        assert!(out.final_score.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_distance_masked_where_elevation_missing() {
        let distance = Raster::from_vec(vec![500.0, 500.0, 0.0, 90.0], 2, 2).unwrap();
        let mut elevation = Raster::from_vec(vec![3.0, f64::NAN, 3.0, -32768.0], 2, 2).unwrap();
        elevation.set_nodata(Some(-32768.0));

        let masked = mask_distance(&distance, &elevation).unwrap();
        assert_relative_eq!(masked.get(0, 0).unwrap(), 500.0);
        assert!(masked.get(0, 1).unwrap().is_nan());
        assert!(masked.get(1, 0).unwrap().is_nan());
        assert!(masked.get(1, 1).unwrap().is_nan());

        let flat = Raster::filled(2, 2, 0.1);
        let out = FloodHazardScorer::default()
            .score(FloodRasterInputs {
                distance_m: &distance,
                elevation_m: &elevation,
                tpi: &flat,
                ndvi: &flat,
                ndwi: &flat,
            })
            .unwrap();
        assert_relative_eq!(out.distance.get(0, 0).unwrap(), 5.0);
        assert!(out.distance.get(0, 1).unwrap().is_nan());
        assert!(out.distance.get(1, 1).unwrap().is_nan());

        let inputs = FloodPixelInputs { elevation_m: f64::NAN, ..reference() };
        assert!(FloodHazardScorer::default().score_pixel(inputs).is_none());
    }
}
