//! Fetching and aligning pipeline inputs.

use std::time::Instant;

use estuaria_algorithms::imagery::quality::{apply_mask, qa_clear_mask, rescale};
use estuaria_cloud::{BandStack, GeospatialBackend, RasterRequest};
use estuaria_core::{Raster, Roi, MASK_NODATA, MASK_TRUE};
use tracing::debug;

use crate::error::{Indicator, IndicatorError, Result};

/// Fetch `request` and, when the backend handed back the raw QA band,
/// apply the request's QA mask and rescale locally.
pub(crate) fn fetch(
    backend: &dyn GeospatialBackend,
    indicator: Indicator,
    request: &RasterRequest,
) -> Result<BandStack> {
    let start = Instant::now();
    let stack = backend.fetch(request).map_err(IndicatorError::fetch(indicator))?;
    debug!(
        %indicator,
        backend = backend.name(),
        dataset = %request.dataset,
        bands = stack.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "fetched"
    );
    preprocess_locally(stack, indicator, request)
}

fn preprocess_locally(stack: BandStack, indicator: Indicator, request: &RasterRequest) -> Result<BandStack> {
    let Some(pre) = &request.preprocess else {
        return Ok(stack);
    };
    let Some(qa) = pre.qa_mask.as_ref().filter(|q| stack.contains(&q.band)) else {
        return Ok(stack);
    };

    debug!(%indicator, qa_band = %qa.band, "applying QA mask locally");
    let clear = qa_clear_mask(band(&stack, indicator, &qa.band)?, qa.bits)?;
    let mut out = BandStack::new();
    for name in &request.bands {
        let mut raster = apply_mask(band(&stack, indicator, name)?, &clear)?;
        if let Some(r) = pre.rescale {
            raster = rescale(&raster, r.scale, r.offset)?;
        }
        out.insert(name.clone(), raster).map_err(IndicatorError::fetch(indicator))?;
    }
    Ok(out)
}

/// Borrow one band, reporting a missing band as a fetch failure.
pub(crate) fn band<'a>(stack: &'a BandStack, indicator: Indicator, name: &str) -> Result<&'a Raster<f64>> {
    stack.get(name).map_err(IndicatorError::fetch(indicator))
}

/// NaN outside the ROI.
pub(crate) fn clip(raster: &Raster<f64>, roi: &Roi) -> Result<Raster<f64>> {
    Ok(apply_mask(raster, &roi.mask_for(raster)?)?)
}

/// Nodata outside the ROI.
pub(crate) fn clip_mask(mask: &Raster<u8>, roi: &Roi) -> Result<Raster<u8>> {
    let inside = roi.mask_for(mask)?;
    let data: Vec<u8> = mask
        .data()
        .iter()
        .zip(inside.data().iter())
        .map(|(&m, &i)| if i == MASK_TRUE { m } else { MASK_NODATA })
        .collect();
    Ok(mask.derive(data, Some(MASK_NODATA))?)
}

/// All rasters must share the first raster's grid.
pub(crate) fn ensure_aligned(rasters: &[&Raster<f64>]) -> Result<()> {
    if let Some((first, rest)) = rasters.split_first() {
        for r in rest {
            first.ensure_same_shape(*r)?;
        }
    }
    Ok(())
}
