//! Client configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// Environment variable consulted when no API key is configured explicitly.
pub const API_KEY_ENV: &str = "GIGASHEET_API_KEY";

/// Default base URL of the Gigasheet REST API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.gigasheet.com";

/// Default base URL of the Gigasheet web application.
pub const DEFAULT_UI_BASE_URL: &str = "https://app.gigasheet.com";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a [`Client`](crate::Client).
///
/// Deserializable with every field optional; the timeout is given in whole
/// seconds as `timeout_secs`.
#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// API key sent in the `X-GIGASHEET-TOKEN` header.
    pub api_key: Option<String>,

    /// REST API base URL.
    pub base_url: String,

    /// Web application base URL, used to build and parse sheet links.
    pub ui_base_url: String,

    /// Per-request timeout.
    #[serde(rename = "timeout_secs", deserialize_with = "duration_from_secs")]
    pub timeout: Duration,
}

fn duration_from_secs<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_API_BASE_URL.to_string(),
            ui_base_url: DEFAULT_UI_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("ui_base_url", &self.ui_base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Create a configuration with an explicit API key and default endpoints.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::default().with_api_key(api_key)
    }

    /// Create a default configuration whose key comes from `GIGASHEET_API_KEY`.
    pub fn from_env() -> Self {
        Self::default().or_api_key(std::env::var(API_KEY_ENV).ok())
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Fill in the API key only if none is set yet.
    ///
    /// Blank values on either side count as absent, so chaining
    /// `or_api_key` calls yields the first usable key.
    pub fn or_api_key(mut self, fallback: Option<String>) -> Self {
        self.api_key = resolve_api_key(self.api_key.take(), fallback);
        self
    }

    /// Set the REST API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the web application base URL.
    pub fn with_ui_base_url(mut self, ui_base_url: impl Into<String>) -> Self {
        self.ui_base_url = ui_base_url.into();
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The API key, or a configuration error naming where to supply one.
    pub(crate) fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(Error::Configuration(format!(
                "no API key, provide one explicitly or set env {API_KEY_ENV}"
            ))),
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.require_api_key()?;
        if self.base_url.trim().is_empty() {
            return Err(Error::Configuration("empty API base URL".to_string()));
        }
        Ok(())
    }
}

/// Pick the explicit key when usable, otherwise the fallback.
pub fn resolve_api_key(explicit: Option<String>, fallback: Option<String>) -> Option<String> {
    let usable = |key: &String| !key.trim().is_empty();
    explicit.filter(usable).or_else(|| fallback.filter(usable))
}
