//! Blocking bridge for the async HTTP clients.
//!
//! Each blocking client owns a single-threaded Tokio runtime so callers
//! never manage one themselves.

use std::future::Future;

use crate::error::{CloudError, Result};

pub struct BlockingRuntime {
    rt: tokio::runtime::Runtime,
}

impl BlockingRuntime {
    pub fn new() -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CloudError::Network(e.to_string()))?;
        Ok(Self { rt })
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.rt.block_on(future)
    }
}

impl std::fmt::Debug for BlockingRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BlockingRuntime")
    }
}
