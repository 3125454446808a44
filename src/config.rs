use crate::view::DEFAULT_TOP_LINES;
use serde::Deserialize;
use std::time::Duration;
use std::{fs, io, path::Path};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = ".config/invoice_intake.toml";

/// Environment variable that overrides `[service] base_url`.
pub const BASE_URL_ENV: &str = "INVOICE_API_BASE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config: {0}")]
    Read(#[from] io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("base_url must start with http:// or https://, got {0:?}")]
    InvalidBaseUrl(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub view: ViewConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    /// Unset means requests wait indefinitely.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub top_lines: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            top_lines: DEFAULT_TOP_LINES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Like `load`, but a missing file yields the defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(content)?;
        cfg.validate()
    }

    /// Apply `INVOICE_API_BASE` if it is set.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_base_url_override(std::env::var(BASE_URL_ENV).ok())
    }

    pub fn with_base_url_override(
        mut self,
        base_url: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.service.base_url = url.trim().to_string();
        }
        self.validate()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.service.request_timeout_secs.map(Duration::from_secs)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        let url = &self.service.base_url;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(url.clone()));
        }
        Ok(self)
    }
}
