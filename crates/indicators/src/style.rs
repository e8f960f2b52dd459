//! Layer styles for map presentation.
//!
//! A [`Layer`] pairs a raster with the value range and palette a renderer
//! should stretch it over. Nothing here draws anything.

use estuaria_core::{Raster, MASK_TRUE};
use serde::Serialize;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerStyle {
    pub min: f64,
    pub max: f64,
    pub palette: Vec<String>,
}

impl LayerStyle {
    pub fn new(min: f64, max: f64, palette: &[&str]) -> Self {
        Self { min, max, palette: palette.iter().map(|c| c.to_string()).collect() }
    }

    /// Scores 1..=5 on a blue→red ramp.
    pub fn score() -> Self {
        Self::new(1.0, 5.0, &RAINBOW)
    }

    /// Raw hazard 5..=25 on the same ramp.
    pub fn raw_hazard() -> Self {
        Self::new(5.0, 25.0, &RAINBOW)
    }

    pub fn mvi() -> Self {
        Self::new(-1.0, 6.0, &["purple", "blue", "cyan", "green", "yellow", "red"])
    }

    /// Single-colour overlay for a mask.
    pub fn solid(color: &str) -> Self {
        Self::new(1.0, 1.0, &[color])
    }

    pub fn ndwi() -> Self {
        Self::new(-0.5, 0.5, &["red", "white", "blue"])
    }

    pub fn ndti() -> Self {
        Self::new(-0.5, 0.5, &["blue", "green", "yellow", "orange", "red"])
    }

    /// Distance to permanent water, metres.
    pub fn distance() -> Self {
        Self::new(0.0, 5000.0, &RAINBOW)
    }
}

const RAINBOW: [&str; 5] = ["blue", "cyan", "green", "yellow", "red"];

pub const MANGROVE_COLOR: &str = "#00FF00";
pub const LOSS_COLOR: &str = "red";
pub const GAIN_COLOR: &str = "green";

/// A named raster with its display style.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub raster: Raster<f64>,
    pub style: LayerStyle,
}

impl Layer {
    pub fn new(name: impl Into<String>, raster: Raster<f64>, style: LayerStyle) -> Self {
        Self { name: name.into(), raster, style }
    }

    /// Mask layer: `1.0` where the mask is set, NaN elsewhere.
    pub fn from_mask(name: impl Into<String>, mask: &Raster<u8>, color: &str) -> Result<Self> {
        let values: Vec<f64> = mask.data().iter().map(|&m| if m == MASK_TRUE { 1.0 } else { f64::NAN }).collect();
        let raster = mask.derive(values, Some(f64::NAN))?;
        Ok(Self::new(name, raster, LayerStyle::solid(color)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_layer_self_masks() {
        let mask = Raster::from_vec(vec![1u8, 0, 255, 1], 2, 2).unwrap();
        let layer = Layer::from_mask("Mangrove 2024", &mask, MANGROVE_COLOR).unwrap();
        assert_eq!(layer.raster.get(0, 0).unwrap(), 1.0);
        assert!(layer.raster.get(0, 1).unwrap().is_nan());
        assert!(layer.raster.get(1, 0).unwrap().is_nan());
        assert_eq!(layer.style.palette, vec!["#00FF00"]);
    }

    #[test]
    fn test_score_styles() {
        assert_eq!(LayerStyle::score().palette.len(), 5);
        assert_eq!(LayerStyle::raw_hazard().min, 5.0);
        assert_eq!(LayerStyle::ndti().max, 0.5);
    }
}
