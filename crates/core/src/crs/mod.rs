//! Coordinate reference systems
//!
//! Estuaria only needs to know *which* CRS a raster is in and whether its
//! units are degrees (area and distance then need a geodesic correction).

use serde::{Deserialize, Serialize};
use std::fmt;

/// EPSG codes of the geographic (lon/lat) systems we recognise.
const GEOGRAPHIC_EPSG: [u32; 4] = [4326, 4258, 4269, 4674];

/// Coordinate Reference System, identified by EPSG code and/or WKT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CRS {
    epsg: Option<u32>,
    wkt: Option<String>,
}

impl CRS {
    /// CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            epsg: Some(code),
            wkt: None,
        }
    }

    /// CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            epsg: None,
            wkt: Some(wkt.into()),
        }
    }

    /// WGS84 lon/lat (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::from_epsg(4326)
    }

    /// UTM zone 48 South on WGS84 (EPSG:32748), the metric grid for Jakarta Bay
    pub fn utm48s() -> Self {
        Self::from_epsg(32748)
    }

    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether coordinates are longitude/latitude in degrees.
    pub fn is_geographic(&self) -> bool {
        if let Some(code) = self.epsg {
            return GEOGRAPHIC_EPSG.contains(&code);
        }
        match &self.wkt {
            Some(wkt) => {
                let head = wkt.trim_start().to_ascii_uppercase();
                head.starts_with("GEOGCS") || head.starts_with("GEOGCRS")
            }
            None => false,
        }
    }

    /// Loose equivalence: EPSG codes first, then WKT text.
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }
        false
    }

    /// Short string identifier, e.g. `EPSG:4326`
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            let end = wkt.char_indices().nth(50).map_or(wkt.len(), |(i, _)| i);
            return format!("WKT:{}", &wkt[..end]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl Default for CRS {
    fn default() -> Self {
        Self::wgs84()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geographic_detection() {
        assert!(CRS::wgs84().is_geographic());
        assert!(!CRS::utm48s().is_geographic());
        assert!(CRS::from_wkt("GEOGCS[\"WGS 84\"]").is_geographic());
        assert!(!CRS::from_wkt("PROJCS[\"WGS 84 / UTM zone 48S\"]").is_geographic());
    }

    #[test]
    fn test_identifier() {
        assert_eq!(CRS::wgs84().identifier(), "EPSG:4326");
        assert_eq!(CRS::utm48s().to_string(), "EPSG:32748");
    }

    #[test]
    fn test_crs_equivalence() {
        assert!(CRS::from_epsg(4326).is_equivalent(&CRS::wgs84()));
        assert!(!CRS::wgs84().is_equivalent(&CRS::utm48s()));
    }
}
