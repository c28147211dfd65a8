//! Layered configuration for the checkhook binary.
//!
//! Sources, lowest to highest priority:
//! 1. Built-in defaults
//! 2. The TOML file given by `--config`, or `checkhook.toml` in the working
//!    directory when it exists
//! 3. Environment variables (`CHECKHOOK_*` prefix, `__` as separator)
//!
//! Figment maps `CHECKHOOK_SERVER__BIND_ADDR` -> `server.bind_addr`,
//! `CHECKHOOK_SCANNER__TIMEOUT_SECS` -> `scanner.timeout_secs`, and so on.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use pipeline::TeamName;
use serde::{Deserialize, Serialize};
use store::Catalog;
use thiserror::Error;

/// Configuration file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "checkhook.toml";

/// Prefix of environment variable overrides.
pub const ENV_PREFIX: &str = "CHECKHOOK_";

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Figment extraction or merge error.
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// An explicitly requested configuration file does not exist.
    #[error("configuration file '{}' does not exist", .path.display())]
    MissingFile { path: PathBuf },

    /// A configuration field has an invalid value.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CheckhookConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Pipelines and resources served by this instance.
    #[serde(default)]
    pub catalog: Catalog,
    /// Credential variables referenced by `((name))` placeholders, keyed by
    /// `team/pipeline/name`, `team/name` or `name`.
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Socket address the webhook listener binds to.
    pub bind_addr: String,
    /// Team used by routes without a `/teams/{team}` prefix.
    pub default_team: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            default_team: "main".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    /// Base URL of the scanning service.
    pub base_url: String,
    /// Timeout of one trigger call, in seconds.
    pub timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8081".to_string(),
            timeout_secs: scanner::DEFAULT_REQUEST_TIMEOUT.as_secs(),
        }
    }
}

impl ScannerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human readable output.
    Pretty,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub log_format: LogFormat,
    /// OTLP gRPC endpoint. Span export is disabled when absent.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl CheckhookConfig {
    /// Loads and validates configuration from all sources.
    ///
    /// `path` overrides [`DEFAULT_CONFIG_FILE`] and must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(path)?.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the provider chain without extracting it.
    pub fn figment(path: Option<&Path>) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::MissingFile {
                    path: path.to_path_buf(),
                });
            }
            Some(path) => figment = figment.merge(Toml::file(path)),
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    figment = figment.merge(Toml::file(local));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Checks values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        self.default_team()?;
        if self.scanner.base_url.trim().is_empty() {
            return Err(invalid("scanner.base_url", "must not be empty"));
        }
        if self.scanner.timeout_secs == 0 {
            return Err(invalid("scanner.timeout_secs", "must be greater than zero"));
        }
        if matches!(&self.telemetry.otlp_endpoint, Some(endpoint) if endpoint.trim().is_empty()) {
            return Err(invalid("telemetry.otlp_endpoint", "must not be empty when set"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind_addr
            .parse()
            .map_err(|e| invalid("server.bind_addr", &format!("{e}")))
    }

    pub fn default_team(&self) -> Result<TeamName, ConfigError> {
        TeamName::new(self.server.default_team.trim())
            .ok_or_else(|| invalid("server.default_team", "must not be empty"))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
