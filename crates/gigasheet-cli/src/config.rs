//! Optional TOML configuration file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use gigasheet::ClientConfig;
use serde::{Deserialize, Serialize};

/// Settings read from `config.toml`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub ui_base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Values that take precedence over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    /// `--api-key`
    pub api_key: Option<String>,
    /// `$GIGASHEET_API_KEY`
    pub env_api_key: Option<String>,
    /// `--base-url`
    pub base_url: Option<String>,
    /// `--timeout`
    pub timeout_secs: Option<u64>,
}

/// Default config file location.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("gigasheet").join("config.toml"))
}

/// Load the config file.
///
/// An explicitly given path must exist; the default location is optional.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<FileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(FileConfig::default()),
        },
    };

    tracing::debug!(path = %path.display(), "loading config file");
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: FileConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(config)
}

impl FileConfig {
    /// Build the client configuration.
    ///
    /// Precedence: flag, then environment, then file, then defaults.
    pub fn into_client_config(self, overrides: Overrides) -> ClientConfig {
        let mut config = ClientConfig::default()
            .or_api_key(overrides.api_key)
            .or_api_key(overrides.env_api_key)
            .or_api_key(self.api_key);

        if let Some(base_url) = overrides.base_url.or(self.base_url) {
            config = config.with_base_url(base_url);
        }
        if let Some(ui_base_url) = self.ui_base_url {
            config = config.with_ui_base_url(ui_base_url);
        }
        if let Some(secs) = overrides.timeout_secs.or(self.timeout_secs) {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        config
    }
}
