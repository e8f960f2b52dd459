//! Affine georeferencing for rasters

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres (spherical approximation).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Affine transform between pixel (col, row) and map (x, y) coordinates:
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// North-up grids have zero rotation and a negative `pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub row_rotation: f64,
    pub col_rotation: f64,
}

impl GeoTransform {
    /// North-up transform without rotation
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// From GDAL ordering `[origin_x, pixel_width, row_rot, origin_y, col_rot, pixel_height]`
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self {
            origin_x: coeffs[0],
            pixel_width: coeffs[1],
            row_rotation: coeffs[2],
            origin_y: coeffs[3],
            col_rotation: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    /// Map coordinates of the pixel centre
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.fractional_to_geo(col as f64 + 0.5, row as f64 + 0.5)
    }

    /// Map coordinates of the pixel's top-left corner
    pub fn pixel_to_geo_corner(&self, col: usize, row: usize) -> (f64, f64) {
        self.fractional_to_geo(col as f64, row as f64)
    }

    fn fractional_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.origin_x + col * self.pixel_width + row * self.row_rotation;
        let y = self.origin_y + col * self.col_rotation + row * self.pixel_height;
        (x, y)
    }

    /// Fractional pixel coordinates of a map point; NaN for a degenerate transform
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;
        if det.abs() < 1e-15 {
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;
        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;
        (col, row)
    }

    /// Cell size along X (absolute)
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Planar cell area in map units squared
    pub fn cell_area(&self) -> f64 {
        (self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation).abs()
    }

    /// Spherical area in m² of a lon/lat cell on `row` (degree-based grids only)
    pub fn geodesic_cell_area(&self, row: usize) -> f64 {
        let (_, top) = self.pixel_to_geo_corner(0, row);
        let (_, bottom) = self.pixel_to_geo_corner(0, row + 1);
        let dlon = self.pixel_width.abs().to_radians();
        let band = (top.to_radians().sin() - bottom.to_radians().sin()).abs();
        EARTH_RADIUS_M * EARTH_RADIUS_M * dlon * band
    }

    /// Metres per cell along X and Y at the latitude of `row` (degree-based grids only)
    pub fn geodesic_cell_size(&self, row: usize) -> (f64, f64) {
        let (_, lat) = self.pixel_to_geo(0, row);
        let metres_per_degree = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;
        (
            self.pixel_width.abs() * metres_per_degree * lat.to_radians().cos(),
            self.pixel_height.abs() * metres_per_degree,
        )
    }

    /// Bounding box `(min_x, min_y, max_x, max_y)` for a grid of the given size
    pub fn bounds(&self, width: usize, height: usize) -> (f64, f64, f64, f64) {
        let corners = [
            self.pixel_to_geo_corner(0, 0),
            self.pixel_to_geo_corner(width, 0),
            self.pixel_to_geo_corner(0, height),
            self.pixel_to_geo_corner(width, height),
        ];

        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), &(x, y)| {
                (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
            },
        )
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}
