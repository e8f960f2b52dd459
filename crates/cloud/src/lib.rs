//! # Estuaria Cloud
//!
//! Remote and local raster acquisition plus the conversational assistant
//! client.
//!
//! - [`RasterRequest`]: dataset, ROI, period, cloud filter, bands, composite
//! - [`GeospatialBackend`]: `fetch(&RasterRequest) -> BandStack`, with HTTP,
//!   directory and in-memory adapters
//! - [`assistant`]: caller-owned [`Conversation`] and a chat-completions client
//!
//! Remote calls are blocking for the caller. Each HTTP client owns a
//! single-threaded Tokio runtime and retries transient failures with
//! exponential backoff.

pub mod assistant;
pub mod backend;
pub mod blocking;
pub mod error;
pub mod http;
pub mod request;

pub use assistant::{AssistantClient, ChatCompletionsClient, ChatMessage, Conversation, Role};
pub use backend::{BandStack, DirectoryBackend, GeospatialBackend, HttpBackend, MemoryBackend};
pub use error::{CloudError, Result};
pub use http::HttpOptions;
pub use request::{Composite, DateRange, Preprocess, QaMask, RasterRequest, Rescale};
