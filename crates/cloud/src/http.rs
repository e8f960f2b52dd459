//! HTTP client wrapper with timeout and retry logic.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use crate::error::{CloudError, Result};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Timeout and retry settings shared by every remote client.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub request_timeout: Duration,
    pub max_retries: u32,
    /// Sent as `Authorization: Bearer <key>` when present
    pub api_key: Option<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            api_key: None,
        }
    }
}

/// Async HTTP client with exponential backoff.
pub struct HttpClient {
    client: Client,
    options: HttpOptions,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("request_timeout", &self.options.request_timeout)
            .field("max_retries", &self.options.max_retries)
            .finish()
    }
}

/// Whether a status is worth another attempt.
fn is_transient(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Only timeouts and failed connections are worth another attempt.
fn is_retryable(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Backoff before retry `attempt` (1-based): 500 ms, 1 s, 2 s, ...
pub fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(500 * (1u64 << attempt.saturating_sub(1).min(16)))
}

impl HttpClient {
    pub fn new(options: HttpOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| CloudError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, options })
    }

    pub fn options(&self) -> &HttpOptions {
        &self.options
    }

    /// `POST url` with a JSON body.
    ///
    /// Returns the first response that is not a transient failure; 4xx
    /// responses are handed back to the caller untouched.
    pub async fn post_json<B: serde::Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Response> {
        let mut req = self.client.post(url).json(body);
        if let Some(key) = &self.options.api_key {
            req = req.bearer_auth(key);
        }
        self.execute_with_retry(req, url).await
    }

    async fn execute_with_retry(&self, request: RequestBuilder, url: &str) -> Result<Response> {
        let mut last_err = None;

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                let delay = backoff(attempt);
                debug!(url, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
                tokio::time::sleep(delay).await;
            }

            let Some(req) = request.try_clone() else {
                return Ok(request.send().await?);
            };

            match req.send().await {
                Ok(resp) if is_transient(resp.status()) => {
                    let status = resp.status();
                    warn!(url, %status, attempt, "transient HTTP status");
                    last_err = Some(CloudError::Network(format!("HTTP {status} from {url}")));
                }
                Ok(resp) => return Ok(resp),
                Err(e) if is_retryable(&e) => {
                    warn!(url, attempt, error = %e, "request failed");
                    last_err = Some(CloudError::Http(e));
                }
                Err(e) => return Err(CloudError::Http(e)),
            }
        }

        Err(last_err.unwrap_or_else(|| CloudError::Network(format!("request to {url} failed"))))
    }
}

/// Read an error body for messages, capped at 500 characters.
pub async fn error_body(resp: Response) -> String {
    resp.text().await.unwrap_or_default().chars().take(500).collect()
}
