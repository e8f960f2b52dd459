//! Fixed threshold tables for tidal-flood hazard scoring.
//!
//! Every sub-score runs from 1 (least hazardous) to 5 (most hazardous).

use crate::imagery::{ThresholdBand, ThresholdTable};

/// Distance to permanent water, metres.
pub const DISTANCE_BANDS: [ThresholdBand; 5] = [
    ThresholdBand::above(4000.0, 1),
    ThresholdBand::between(3000.0, 4000.0, 2),
    ThresholdBand::between(2000.0, 3000.0, 3),
    ThresholdBand::between(1000.0, 2000.0, 4),
    ThresholdBand::at_most(1000.0, 5),
];

/// Elevation, metres.
pub const ELEVATION_BANDS: [ThresholdBand; 5] = [
    ThresholdBand::above(20.0, 1),
    ThresholdBand::between(15.0, 20.0, 2),
    ThresholdBand::between(10.0, 15.0, 3),
    ThresholdBand::between(5.0, 10.0, 4),
    ThresholdBand::at_most(5.0, 5),
];

/// Topographic position index, metres.
///
/// Values in (-8, -6] match no band and stay unclassified.
pub const TPI_BANDS: [ThresholdBand; 5] = [
    ThresholdBand::above(0.0, 1),
    ThresholdBand::between(-2.0, 0.0, 2),
    ThresholdBand::between(-4.0, -2.0, 3),
    ThresholdBand::between(-6.0, -4.0, 4),
    ThresholdBand::at_most(-8.0, 5),
];

/// NDVI: dense vegetation lowers the hazard.
pub const NDVI_BANDS: [ThresholdBand; 5] = [
    ThresholdBand::above(0.8, 1),
    ThresholdBand::between(0.6, 0.8, 2),
    ThresholdBand::between(0.4, 0.6, 3),
    ThresholdBand::between(0.2, 0.4, 4),
    ThresholdBand::at_most(0.2, 5),
];

/// NDWI: wetter surfaces raise the hazard.
pub const NDWI_BANDS: [ThresholdBand; 5] = [
    ThresholdBand::above(0.6, 5),
    ThresholdBand::between(0.2, 0.6, 4),
    ThresholdBand::between(-0.2, 0.2, 3),
    ThresholdBand::between(-0.6, -0.2, 2),
    ThresholdBand::at_most(-0.6, 1),
];

/// Raw hazard (sum of five sub-scores, 5..=25) to the final 1..=5 score.
///
/// The `<= 0` band can never match a five-term sum; it is kept so the
/// table covers the whole real line.
pub const FINAL_BANDS: [ThresholdBand; 5] = [
    ThresholdBand::above(15.0, 5),
    ThresholdBand::between(10.0, 15.0, 4),
    ThresholdBand::between(5.0, 10.0, 3),
    ThresholdBand::between(0.0, 5.0, 2),
    ThresholdBand::at_most(0.0, 1),
];

fn table(bands: &[ThresholdBand]) -> ThresholdTable {
    ThresholdTable::from_static(bands)
}

pub fn distance() -> ThresholdTable {
    table(&DISTANCE_BANDS)
}

pub fn elevation() -> ThresholdTable {
    table(&ELEVATION_BANDS)
}

pub fn tpi() -> ThresholdTable {
    table(&TPI_BANDS)
}

pub fn ndvi() -> ThresholdTable {
    table(&NDVI_BANDS)
}

pub fn ndwi() -> ThresholdTable {
    table(&NDWI_BANDS)
}

pub fn final_hazard() -> ThresholdTable {
    table(&FINAL_BANDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imagery::ValueRange;

    #[test]
    fn test_fixed_tables_are_well_formed() {
        for bands in [DISTANCE_BANDS, ELEVATION_BANDS, TPI_BANDS, NDVI_BANDS, NDWI_BANDS, FINAL_BANDS] {
            assert!(ThresholdTable::new(bands.to_vec()).is_ok());
        }
    }

    #[test]
    fn test_fixed_tables_have_no_overlaps() {
        for t in [distance(), elevation(), tpi(), ndvi(), ndwi(), final_hazard()] {
            assert!(t.overlaps().is_empty());
        }
    }

    #[test]
    fn test_only_tpi_has_a_gap() {
        for t in [distance(), elevation(), ndvi(), ndwi(), final_hazard()] {
            assert!(t.gaps().is_empty());
        }
        assert_eq!(tpi().gaps(), vec![ValueRange { lower: Some(-8.0), upper: Some(-6.0) }]);
    }

    #[test]
    fn test_reference_values() {
        assert_eq!(ndvi().score(0.9), Some(1));
        assert_eq!(ndwi().score(0.7), Some(5));
        assert_eq!(ndwi().score(-0.7), Some(1));
        assert_eq!(distance().score(500.0), Some(5));
        assert_eq!(distance().score(1000.0), Some(5));
        assert_eq!(distance().score(1000.5), Some(4));
        assert_eq!(elevation().score(3.0), Some(5));
        assert_eq!(tpi().score(-1.0), Some(2));
        assert_eq!(tpi().score(-7.0), None);
        assert_eq!(final_hazard().score(21.0), Some(5));
        assert_eq!(final_hazard().score(5.0), Some(2));
        assert_eq!(final_hazard().score(15.0), Some(4));
    }
}
