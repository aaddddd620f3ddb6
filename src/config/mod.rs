//! Host configuration: provider credentials, endpoints, HTTP and logging.
//!
//! Loaded from a TOML file by [`load_config`], or from the environment
//! alone by [`Config::from_env`]. Values may reference environment variables
//! as `${VAR}`, and `SII_*` variables override the file.
//!
//! ```toml
//! [credentials]
//! provider = "openfactura"
//! api_key = "${OPENFACTURA_API_KEY}"
//! environment = "certification"
//! issuer_rut = "76.123.456-0"
//!
//! [endpoints]
//! mindicador = "https://mindicador.cl/api"
//!
//! [http]
//! timeout_seconds = 30
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

mod loader;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::emision::{Credentials, ProviderEndpoints};
use crate::indicadores::DEFAULT_BASE_URL;

pub use loader::{load_config, parse_config};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read configuration file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    Parse(String),

    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingEnvVars(Vec<String>),

    #[error("configuration validation failed: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub credentials: Credentials,
    pub endpoints: EndpointsConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub mindicador: String,
    #[serde(flatten)]
    pub providers: ProviderEndpoints,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            mindicador: DEFAULT_BASE_URL.into(),
            providers: ProviderEndpoints::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout; unset means no timeout.
    pub timeout_seconds: Option<u64>,
}

impl HttpConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(key) = self.credentials.api_key() {
            if key.expose_secret().trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "credentials.api_key must not be empty for provider '{}'",
                    self.credentials.provider_name()
                )));
            }
        }

        if self.http.timeout_seconds == Some(0) {
            return Err(ConfigError::Invalid(
                "http.timeout_seconds must be greater than 0".into(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }

        for (name, url) in [
            ("endpoints.mindicador", &self.endpoints.mindicador),
            (
                "endpoints.openfactura_production",
                &self.endpoints.providers.openfactura_production,
            ),
            (
                "endpoints.openfactura_certification",
                &self.endpoints.providers.openfactura_certification,
            ),
            ("endpoints.simpleapi", &self.endpoints.providers.simpleapi),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be an http(s) URL, got '{url}'"
                )));
            }
        }

        Ok(())
    }
}
