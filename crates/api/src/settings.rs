//! Runtime settings
//!
//! Layered with the `config` crate: an optional TOML file, then environment
//! variables such as `DROWSY_MONITOR__MAX_ALARMS=5`.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use alerting::AlertConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use drowsiness::MonitorConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "drowsiness";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "DROWSY";

/// `DROWSY_<SECTION>__<FIELD>` overrides
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Settings error types
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid monitor configuration: {0}")]
    Monitor(#[from] drowsiness::ConfigError),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// HTTP status server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub enabled: bool,
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Monitor loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Clock tick driving the emergency procedure (ms)
    pub tick_interval_ms: u64,
    /// Pending perception samples and commands
    pub input_queue_depth: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            input_queue_depth: 256,
        }
    }
}

impl RuntimeSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingSettings {
    pub fn level(&self) -> Result<Level, SettingsError> {
        self.level.parse().map_err(|_| SettingsError::Invalid {
            field: "logging.level",
            reason: format!("unknown level '{}'", self.level),
        })
    }
}

/// All settings of the monitor process
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub monitor: MonitorConfig,
    pub alerts: AlertConfig,
    pub server: ServerSettings,
    pub runtime: RuntimeSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load from `path` (required) or the default file (optional), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        Self::build(Config::builder().add_source(file).add_source(environment()))
    }

    /// Load from TOML text only; the process environment is not consulted
    pub fn from_toml_str(toml: &str) -> Result<Self, SettingsError> {
        Self::build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, SettingsError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check every section; monitor values are rejected here, before any state machine runs
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.monitor.validate()?;

        if self.runtime.tick_interval_ms == 0 {
            return Err(SettingsError::Invalid {
                field: "runtime.tick_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.runtime.input_queue_depth == 0 {
            return Err(SettingsError::Invalid {
                field: "runtime.input_queue_depth",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.server.enabled {
            self.server
                .bind_addr
                .parse::<SocketAddr>()
                .map_err(|e| SettingsError::Invalid {
                    field: "server.bind_addr",
                    reason: e.to_string(),
                })?;
        }
        self.logging.level()?;
        Ok(())
    }
}
