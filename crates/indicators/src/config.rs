//! Run configuration
//!
//! Loaded from TOML; every section and field is optional and falls back to
//! the Muara Angke dashboard defaults.
//!
//! ```toml
//! years = [2020, 2021, 2022, 2023, 2024]
//!
//! [backend]
//! kind = "directory"
//! data_dir = "exports"
//!
//! [turbidity]
//! year = 2023
//! cloud_max = 20.0
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use estuaria_cloud::assistant::{DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, DEFAULT_TEMPERATURE, GROQ_BASE_URL};
use estuaria_cloud::http::{DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};
use estuaria_cloud::{ChatCompletionsClient, DirectoryBackend, GeospatialBackend, HttpBackend, HttpOptions};
use estuaria_core::Roi;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{IndicatorError, Result};
use crate::flood::FloodParams;
use crate::mangrove::{check_sentinel_year, MangroveParams};
use crate::turbidity::TurbidityParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Http,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub base_url: String,
    pub data_dir: PathBuf,
    pub timeout_secs: u64,
    pub max_retries: u32,
    /// Environment variable holding the backend API key, if any
    pub api_key_env: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Http,
            base_url: "http://localhost:8080".into(),
            data_dir: PathBuf::from("data"),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_retries: DEFAULT_MAX_RETRIES,
            api_key_env: Some("ESTUARIA_API_KEY".into()),
        }
    }
}

impl BackendConfig {
    fn http_options(&self, api_key: Option<String>) -> HttpOptions {
        HttpOptions {
            request_timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            api_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub api_key_env: String,
    /// Messages kept from earlier turns
    pub max_history: usize,
    pub system_prompt: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: GROQ_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            api_key_env: "GROQ_API_KEY".into(),
            max_history: 20,
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Years of the mangrove time series
    pub years: Vec<i32>,
    pub roi: Roi,
    pub backend: BackendConfig,
    pub flood: FloodParams,
    pub mangrove: MangroveParams,
    pub turbidity: TurbidityParams,
    pub assistant: AssistantConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            years: (2020..=2024).collect(),
            roi: Roi::muara_angke(),
            backend: BackendConfig::default(),
            flood: FloodParams::default(),
            mangrove: MangroveParams::default(),
            turbidity: TurbidityParams::default(),
            assistant: AssistantConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text).map_err(|e| IndicatorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading config");
        let text = std::fs::read_to_string(path)
            .map_err(|e| IndicatorError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| IndicatorError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.years.is_empty() {
            return Err(IndicatorError::Config("years must not be empty".into()));
        }
        for &year in &self.years {
            check_sentinel_year(year)?;
        }
        if self.backend.timeout_secs == 0 {
            return Err(IndicatorError::Config("backend timeout_secs must be positive".into()));
        }
        if !(0.0..=2.0).contains(&self.assistant.temperature) {
            return Err(IndicatorError::Config(format!(
                "assistant temperature {} outside 0..=2",
                self.assistant.temperature
            )));
        }
        self.flood.validate()?;
        self.mangrove.validate()?;
        self.turbidity.validate()
    }

    /// Backend adapter selected by `[backend] kind`.
    pub fn backend(&self) -> Result<Box<dyn GeospatialBackend>> {
        match self.backend.kind {
            BackendKind::Http => {
                let api_key = self.backend.api_key_env.as_deref().and_then(|var| std::env::var(var).ok());
                let backend = HttpBackend::new(&self.backend.base_url, self.backend.http_options(api_key))
                    .map_err(|e| IndicatorError::Config(format!("backend: {e}")))?;
                Ok(Box::new(backend))
            }
            BackendKind::Directory => Ok(Box::new(DirectoryBackend::new(self.backend.data_dir.clone()))),
        }
    }

    /// Assistant client; `api_key` overrides the configured environment variable.
    pub fn assistant_client(&self, api_key: Option<String>) -> Result<ChatCompletionsClient> {
        let a = &self.assistant;
        let api_key = api_key.or_else(|| std::env::var(&a.api_key_env).ok());
        let options = self.backend.http_options(api_key);
        ChatCompletionsClient::new(&a.base_url, &a.model, options)
            .map(|c| c.with_temperature(a.temperature))
            .map_err(|e| IndicatorError::Config(format!("assistant: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use estuaria_algorithms::statistics::PixelArea;

    #[test]
    fn test_empty_file_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.years, vec![2020, 2021, 2022, 2023, 2024]);
        assert_eq!(config.mangrove.pixel_area, PixelArea::Auto);
    }

    #[test]
    fn test_partial_override() {
        let text = r#"
years = [2022, 2023]

[backend]
kind = "directory"
data_dir = "/tmp/exports"

[turbidity]
cloud_max = 25.0

[mangrove]
min_mvi = 3.0
pixel_area = { fixed = 10.0 }
"#;
        let config = Config::from_toml_str(text).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Directory);
        assert_eq!(config.backend.timeout_secs, 60);
        assert_eq!(config.turbidity.cloud_max, 25.0);
        assert_eq!(config.turbidity.buckets, 30);
        assert_eq!(config.mangrove.min_mvi, 3.0);
        assert_eq!(config.mangrove.max_mvi, 20.0);
        assert_eq!(config.mangrove.pixel_area, PixelArea::Fixed(10.0));
        assert_eq!(config.backend().unwrap().name(), "directory");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_toml_str("[turbidity]\ncloud_max = 50.0").is_err());
        assert!(Config::from_toml_str("years = []").is_err());
        assert!(Config::from_toml_str("[backend]\nkind = \"ftp\"").is_err());
        assert!(Config::from_toml_str("[assistant]\ntemperature = 3.0").is_err());
    }

    #[test]
    fn test_custom_roi() {
        let text = r#"
[roi]
coordinates = [[106.76, -6.10], [106.77, -6.10], [106.77, -6.09]]
"#;
        let config = Config::from_toml_str(text).unwrap();
        assert_eq!(config.roi.corners().len(), 3);
    }

    #[test]
    fn test_assistant_requires_key() {
        let mut config = Config::default();
        config.assistant.api_key_env = "ESTUARIA_TEST_UNSET_KEY".into();
        assert!(config.assistant_client(None).is_err());
        let client = config.assistant_client(Some("test-key".into())).unwrap();
        assert_eq!(client.model(), "llama-3.3-70b-versatile");
    }
}
