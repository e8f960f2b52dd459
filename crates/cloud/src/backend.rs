//! Geospatial backends
//!
//! A [`GeospatialBackend`] turns a [`RasterRequest`] into a [`BandStack`]:
//! one `Raster<f64>` per requested band, all on one grid.
//!
//! - [`HttpBackend`]: a remote raster service (`POST {base}/v1/rasters`,
//!   GeoTIFF response) that applies compositing and preprocessing itself
//! - [`DirectoryBackend`]: pre-exported GeoTIFFs on disk
//! - [`MemoryBackend`]: registered stacks, for tests and offline runs
//!
//! Local backends cannot preprocess; they return the QA band alongside the
//! requested bands so the caller can mask and rescale.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use estuaria_core::io::{read_geotiff, read_geotiff_from_buffer};
use estuaria_core::Raster;
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::blocking::BlockingRuntime;
use crate::error::{CloudError, Result};
use crate::http::{error_body, HttpClient, HttpOptions};
use crate::request::{DateRange, RasterRequest};

// ---------------------------------------------------------------------------
// Band stack
// ---------------------------------------------------------------------------

/// Co-registered bands keyed by band name.
#[derive(Debug, Clone, Default)]
pub struct BandStack {
    bands: BTreeMap<String, Raster<f64>>,
}

impl BandStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a band; it must match the grid of the bands already present.
    pub fn insert(&mut self, name: impl Into<String>, raster: Raster<f64>) -> Result<()> {
        if let Some(first) = self.bands.values().next() {
            first.ensure_same_shape(&raster)?;
        }
        self.bands.insert(name.into(), raster);
        Ok(())
    }

    pub fn with(mut self, name: impl Into<String>, raster: Raster<f64>) -> Result<Self> {
        self.insert(name, raster)?;
        Ok(self)
    }

    pub fn get(&self, band: &str) -> Result<&Raster<f64>> {
        self.bands.get(band).ok_or_else(|| {
            CloudError::InvalidRequest(format!("band {band} missing from backend response"))
        })
    }

    pub fn contains(&self, band: &str) -> bool {
        self.bands.contains_key(band)
    }

    pub fn band_names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Keep only `bands` (missing names are an error).
    fn select(&self, bands: &[String]) -> Result<Self> {
        let mut out = BandStack::new();
        for b in bands {
            out.insert(b.clone(), self.get(b)?.clone())?;
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// Source of composited rasters.
pub trait GeospatialBackend {
    /// Short name for logs, e.g. `"http"`.
    fn name(&self) -> &'static str;

    /// Fetch every band of `request` over its ROI.
    fn fetch(&self, request: &RasterRequest) -> Result<BandStack>;
}

impl<B: GeospatialBackend + ?Sized> GeospatialBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn fetch(&self, request: &RasterRequest) -> Result<BandStack> {
        (**self).fetch(request)
    }
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// Remote raster service.
///
/// Each band is requested with `POST {base_url}/v1/rasters` and the JSON
/// form of a single-band [`RasterRequest`]; the body of a 200 response is a
/// GeoTIFF.
#[derive(Debug)]
pub struct HttpBackend {
    base_url: String,
    rt: BlockingRuntime,
    client: HttpClient,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, options: HttpOptions) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(CloudError::InvalidRequest("backend base URL is empty".into()));
        }
        Ok(Self { base_url, rt: BlockingRuntime::new()?, client: HttpClient::new(options)? })
    }

    pub fn rasters_url(&self) -> String {
        format!("{}/v1/rasters", self.base_url)
    }

    async fn fetch_band(&self, request: &RasterRequest, band: &str) -> Result<Raster<f64>> {
        let url = self.rasters_url();
        let body = request.for_band(band);
        debug!(dataset = %request.dataset, band, "requesting band");
        let resp = self.client.post_json(&url, &body).await?;

        let status = resp.status();
        let dataset = request.dataset.clone();
        match status {
            StatusCode::OK => {
                let bytes = resp.bytes().await?;
                Ok(read_geotiff_from_buffer::<f64>(&bytes)?)
            }
            StatusCode::NO_CONTENT => Err(CloudError::EmptyResult {
                dataset,
                reason: "no images match the request".into(),
            }),
            StatusCode::UNPROCESSABLE_ENTITY => {
                Err(CloudError::EmptyResult { dataset, reason: error_body(resp).await })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(CloudError::Auth(format!("HTTP {status}: {}", error_body(resp).await)))
            }
            StatusCode::NOT_FOUND => Err(CloudError::DatasetUnavailable { dataset }),
            s if s.is_client_error() => {
                Err(CloudError::InvalidRequest(format!("HTTP {s}: {}", error_body(resp).await)))
            }
            s => Err(CloudError::Network(format!("unexpected HTTP {s} from {url}"))),
        }
    }
}

impl GeospatialBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    fn fetch(&self, request: &RasterRequest) -> Result<BandStack> {
        request.validate()?;
        info!(dataset = %request.dataset, bands = request.bands.len(), "fetching from raster service");
        self.rt.block_on(async {
            let mut stack = BandStack::new();
            for band in &request.bands {
                let raster = self.fetch_band(request, band).await?;
                stack.insert(band.clone(), raster)?;
            }
            Ok::<_, CloudError>(stack)
        })
    }
}

// ---------------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------------

/// GeoTIFFs laid out as `<root>/<dataset-slug>/<start>_<end>/<BAND>.tif`,
/// or `<root>/<dataset-slug>/<BAND>.tif` for requests without dates.
#[derive(Debug, Clone)]
pub struct DirectoryBackend {
    root: PathBuf,
}

impl DirectoryBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the bands of `request`.
    pub fn request_dir(&self, request: &RasterRequest) -> PathBuf {
        let dir = self.root.join(request.dataset_slug());
        match &request.dates {
            Some(range) => dir.join(range.label()),
            None => dir,
        }
    }

    /// File of one band of `request`.
    pub fn band_path(&self, request: &RasterRequest, band: &str) -> PathBuf {
        self.request_dir(request).join(format!("{band}.tif"))
    }
}

impl GeospatialBackend for DirectoryBackend {
    fn name(&self) -> &'static str {
        "directory"
    }

    fn fetch(&self, request: &RasterRequest) -> Result<BandStack> {
        request.validate()?;
        let dataset_dir = self.root.join(request.dataset_slug());
        if !dataset_dir.is_dir() {
            return Err(CloudError::DatasetUnavailable { dataset: request.dataset.clone() });
        }
        let dir = self.request_dir(request);
        if !dir.is_dir() {
            return Err(CloudError::EmptyResult {
                dataset: request.dataset.clone(),
                reason: format!("no export at {}", dir.display()),
            });
        }

        let qa_band = request
            .preprocess
            .as_ref()
            .and_then(|p| p.qa_mask.as_ref())
            .map(|q| q.band.as_str());

        let mut stack = BandStack::new();
        for band in request.local_bands() {
            let path = self.band_path(request, &band);
            if Some(band.as_str()) == qa_band && !path.exists() {
                debug!(path = %path.display(), "no QA band exported; assuming pre-masked");
                continue;
            }
            if !path.exists() {
                return Err(CloudError::InvalidRequest(format!(
                    "band {band} not exported at {}",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "reading band");
            stack.insert(band, read_geotiff::<f64, _>(&path)?)?;
        }
        Ok(stack)
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Band stacks registered ahead of time, keyed by dataset and period.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    stacks: HashMap<(String, Option<DateRange>), BandStack>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, dataset: impl Into<String>, dates: Option<DateRange>, stack: BandStack) {
        self.stacks.insert((dataset.into(), dates), stack);
    }

    pub fn with(mut self, dataset: impl Into<String>, dates: Option<DateRange>, stack: BandStack) -> Self {
        self.insert(dataset, dates, stack);
        self
    }
}

impl GeospatialBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn fetch(&self, request: &RasterRequest) -> Result<BandStack> {
        request.validate()?;
        let key = (request.dataset.clone(), request.dates);
        match self.stacks.get(&key) {
            Some(stack) => {
                let mut wanted = request.bands.clone();
                if let Some(qa) = request.preprocess.as_ref().and_then(|p| p.qa_mask.as_ref())
                    && stack.contains(&qa.band)
                    && !wanted.contains(&qa.band)
                {
                    wanted.push(qa.band.clone());
                }
                stack.select(&wanted)
            }
            None if self.stacks.keys().any(|(d, _)| *d == request.dataset) => {
                Err(CloudError::EmptyResult {
                    dataset: request.dataset.clone(),
                    reason: "no stack registered for this period".into(),
                })
            }
            None => Err(CloudError::DatasetUnavailable { dataset: request.dataset.clone() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Composite, SENTINEL2_SR, SRTM_DEM};
    use estuaria_core::Roi;

    fn request(year: i32) -> RasterRequest {
        RasterRequest::new(SENTINEL2_SR, Roi::muara_angke())
            .dates(DateRange::calendar_year(year).unwrap())
            .bands(&["B3", "B8"])
            .composite(Composite::Median)
            .scale(10.0)
    }

    fn stack(v: f64) -> BandStack {
        BandStack::new()
            .with("B3", Raster::filled(2, 2, v))
            .unwrap()
            .with("B8", Raster::filled(2, 2, v + 1.0))
            .unwrap()
            .with("B11", Raster::filled(2, 2, v + 2.0))
            .unwrap()
    }

    #[test]
    fn test_band_stack_rejects_mismatched_grid() {
        let mut s = BandStack::new();
        s.insert("a", Raster::filled(2, 2, 0.0)).unwrap();
        assert!(s.insert("b", Raster::filled(3, 2, 0.0)).is_err());
        assert!(s.get("c").is_err());
    }

    #[test]
    fn test_memory_backend_selects_bands() {
        let backend = MemoryBackend::new().with(
            SENTINEL2_SR,
            Some(DateRange::calendar_year(2020).unwrap()),
            stack(1.0),
        );
        let out = backend.fetch(&request(2020)).unwrap();
        assert_eq!(out.band_names().collect::<Vec<_>>(), vec!["B3", "B8"]);
    }

    #[test]
    fn test_memory_backend_errors() {
        let backend = MemoryBackend::new().with(
            SENTINEL2_SR,
            Some(DateRange::calendar_year(2020).unwrap()),
            stack(1.0),
        );
        assert!(backend.fetch(&request(2021)).unwrap_err().is_empty_result());

        let dem = RasterRequest::new(SRTM_DEM, Roi::muara_angke()).bands(&["elevation"]);
        assert!(matches!(
            backend.fetch(&dem).unwrap_err(),
            CloudError::DatasetUnavailable { .. }
        ));
    }

    #[test]
    fn test_directory_layout() {
        let backend = DirectoryBackend::new("/data");
        let path = backend.band_path(&request(2024), "B8");
        assert_eq!(
            path,
            PathBuf::from("/data/COPERNICUS_S2_SR_HARMONIZED/2024-01-01_2024-12-31/B8.tif")
        );
        let dem = RasterRequest::new(SRTM_DEM, Roi::muara_angke()).bands(&["elevation"]);
        assert_eq!(backend.band_path(&dem, "elevation"), PathBuf::from("/data/USGS_SRTMGL1_003/elevation.tif"));
    }

    #[test]
    fn test_http_backend_rejects_empty_url() {
        assert!(HttpBackend::new("", HttpOptions::default()).is_err());
        let b = HttpBackend::new("http://localhost:8080/", HttpOptions::default()).unwrap();
        assert_eq!(b.rasters_url(), "http://localhost:8080/v1/rasters");
    }
}
