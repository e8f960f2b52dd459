//! Region of interest
//!
//! Every raster request, index, mask and aggregation of a run is clipped to
//! the same polygon so per-pixel comparisons stay spatially aligned.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{Raster, RasterElement, MASK_FALSE, MASK_TRUE};
use geo::{BoundingRect, Intersects};
use geo_types::{Coord, LineString, Point, Polygon};
use serde::{Deserialize, Serialize};

/// Muara Angke estuary, Jakarta Bay (lon/lat corners, EPSG:4326).
pub const MUARA_ANGKE_CORNERS: [(f64, f64); 4] = [
    (106.7535685, -6.1066100),
    (106.7771719, -6.1066100),
    (106.7771719, -6.0886875),
    (106.7535685, -6.0886875),
];

/// Polygonal region of interest in a given CRS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RoiRepr", into = "RoiRepr")]
pub struct Roi {
    polygon: Polygon<f64>,
    crs: CRS,
}

/// Serialized form: a CRS plus the open ring of corner coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoiRepr {
    #[serde(default)]
    crs: CRS,
    coordinates: Vec<[f64; 2]>,
}

impl Roi {
    /// Build a polygon from its corners (ring closure is implicit).
    pub fn from_corners(corners: &[(f64, f64)], crs: CRS) -> Result<Self> {
        let mut ring: Vec<Coord<f64>> = corners.iter().map(|&(x, y)| Coord { x, y }).collect();
        if ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }
        if ring.len() < 3 {
            return Err(Error::InvalidGeometry(format!(
                "a region needs at least 3 distinct corners, got {}",
                ring.len()
            )));
        }
        if ring.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(Error::InvalidGeometry("non-finite corner coordinate".into()));
        }

        Ok(Self {
            polygon: Polygon::new(LineString::from(ring), vec![]),
            crs,
        })
    }

    /// The Muara Angke quadrilateral used by the dashboard
    pub fn muara_angke() -> Self {
        Self {
            polygon: Polygon::new(
                LineString::from(
                    MUARA_ANGKE_CORNERS
                        .iter()
                        .map(|&(x, y)| Coord { x, y })
                        .collect::<Vec<_>>(),
                ),
                vec![],
            ),
            crs: CRS::wgs84(),
        }
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn crs(&self) -> &CRS {
        &self.crs
    }

    /// Corner coordinates without the closing point
    pub fn corners(&self) -> Vec<(f64, f64)> {
        let coords = &self.polygon.exterior().0;
        let open = coords.len().saturating_sub(1);
        coords[..open].iter().map(|c| (c.x, c.y)).collect()
    }

    /// Bounding box `[west, south, east, north]`
    pub fn bbox(&self) -> [f64; 4] {
        match self.polygon.bounding_rect() {
            Some(rect) => [rect.min().x, rect.min().y, rect.max().x, rect.max().y],
            None => [f64::NAN; 4],
        }
    }

    /// Whether a map point lies inside or on the boundary
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.polygon.intersects(&Point::new(x, y))
    }

    /// Rasterize onto `raster`'s grid: `1` where the pixel centre falls inside.
    ///
    /// Fails when the raster carries a CRS that differs from the region's;
    /// a raster without a CRS is taken to share it.
    pub fn mask_for<T: RasterElement>(&self, raster: &Raster<T>) -> Result<Raster<u8>> {
        if let Some(crs) = raster.crs().filter(|crs| !self.crs.is_equivalent(crs)) {
            return Err(Error::invalid_parameter(
                "roi",
                self.crs.identifier(),
                format!("does not match raster CRS {}", crs.identifier()),
            ));
        }

        let (rows, cols) = raster.shape();
        let [west, south, east, north] = self.bbox();
        let mut mask = raster.with_same_meta::<u8>(rows, cols);

        for row in 0..rows {
            for col in 0..cols {
                let (x, y) = raster.pixel_to_geo(col, row);
                let inside = x >= west
                    && x <= east
                    && y >= south
                    && y <= north
                    && self.contains(x, y);
                mask.data_mut()[(row, col)] = if inside { MASK_TRUE } else { MASK_FALSE };
            }
        }
        Ok(mask)
    }
}

impl Default for Roi {
    fn default() -> Self {
        Self::muara_angke()
    }
}

impl TryFrom<RoiRepr> for Roi {
    type Error = Error;

    fn try_from(repr: RoiRepr) -> Result<Self> {
        let corners: Vec<(f64, f64)> = repr.coordinates.iter().map(|c| (c[0], c[1])).collect();
        Roi::from_corners(&corners, repr.crs)
    }
}

impl From<Roi> for RoiRepr {
    fn from(roi: Roi) -> Self {
        RoiRepr {
            coordinates: roi.corners().into_iter().map(|(x, y)| [x, y]).collect(),
            crs: roi.crs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::GeoTransform;

    #[test]
    fn test_muara_angke_bbox() {
        let roi = Roi::muara_angke();
        let [w, s, e, n] = roi.bbox();
        assert_eq!(w, 106.7535685);
        assert_eq!(s, -6.1066100);
        assert_eq!(e, 106.7771719);
        assert_eq!(n, -6.0886875);
        assert_eq!(roi.corners().len(), 4);
    }

    #[test]
    fn test_contains() {
        let roi = Roi::muara_angke();
        assert!(roi.contains(106.765, -6.098));
        assert!(!roi.contains(106.70, -6.098));
    }

    #[test]
    fn test_too_few_corners() {
        let err = Roi::from_corners(&[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)], CRS::wgs84());
        assert!(err.is_err());
    }

    #[test]
    fn test_mask_for_grid() {
        // 4x4 grid of unit cells; region covers the left half
        let roi = Roi::from_corners(
            &[(0.0, 0.0), (2.0, 0.0), (2.0, 4.0), (0.0, 4.0)],
            CRS::utm48s(),
        )
        .unwrap();
        let mut raster: Raster<f64> = Raster::new(4, 4);
        raster.set_transform(GeoTransform::new(0.0, 4.0, 1.0, -1.0));

        let mask = roi.mask_for(&raster).unwrap();
        let inside: usize = mask.data().iter().map(|&v| v as usize).sum();
        assert_eq!(inside, 8);
        assert_eq!(mask.get(0, 0).unwrap(), MASK_TRUE);
        assert_eq!(mask.get(0, 3).unwrap(), MASK_FALSE);
    }

    #[test]
    fn test_mask_for_rejects_other_crs() {
        let roi = Roi::muara_angke();
        let mut raster: Raster<f64> = Raster::new(4, 4);
        raster.set_transform(GeoTransform::new(694_000.0, 9_326_000.0, 30.0, -30.0));
        raster.set_crs(Some(CRS::utm48s()));

        let err = roi.mask_for(&raster).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "roi", .. }));

        raster.set_crs(Some(CRS::wgs84()));
        raster.set_transform(GeoTransform::new(106.7535685, -6.0886875, 0.0001, -0.0001));
        let mask = roi.mask_for(&raster).unwrap();
        assert_eq!(mask.get(0, 0).unwrap(), MASK_TRUE);
    }

    #[test]
    fn test_serde_roundtrip_shape() {
        let roi = Roi::muara_angke();
        let repr = RoiRepr::from(roi.clone());
        assert_eq!(repr.coordinates.len(), 4);
        let back = Roi::try_from(repr).unwrap();
        assert_eq!(back, roi);
    }
}
