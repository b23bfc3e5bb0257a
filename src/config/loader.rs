//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables
//! 3. `.userdesk.toml` in the working directory
//! 4. `~/.config/userdesk/config.toml` (global defaults)
//! 5. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use strum::{Display, EnumString};
use thiserror::Error;

use crate::constants::{
    DEFAULT_API_BASE_URL, ENV_API_KEY, ENV_API_URL, ENV_LOG, ENV_MOCK, ENV_STALE_SECS,
};
use crate::env::Env;
use crate::mock::{TimeoutPolicy, UnhandledPolicy};

/// Freshness window of cached queries.
pub const DEFAULT_STALE_SECS: u64 = 300;

/// Idle time after which cached queries are dropped.
pub const DEFAULT_GC_SECS: u64 = 300;

/// Errors during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Merge(toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub mock: MockConfig,
    pub logging: LoggingConfig,
    pub ui: UiConfig,
}

/// Backend connection.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub retry_delay_ms: u64,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: 30,
            retry_delay_ms: 500,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Query cache tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub stale_secs: u64,
    pub gc_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            stale_secs: DEFAULT_STALE_SECS,
            gc_secs: DEFAULT_GC_SECS,
        }
    }
}

/// In-process mock backend and `serve-mock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Answer requests from the mock instead of `api.base_url`.
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub latency_ms: u64,
    pub handler_timeout_ms: u64,
    pub unhandled: UnhandledPolicy,
    pub on_timeout: TimeoutPolicy,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "127.0.0.1".to_string(),
            port: 3001,
            latency_ms: 0,
            handler_timeout_ms: 5000,
            unhandled: UnhandledPolicy::Warn,
            on_timeout: TimeoutPolicy::Fail,
        }
    }
}

/// Log output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `warn` or `userdesk=debug`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Console preferences shown on the settings view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub app_name: String,
    pub theme: Theme,
    pub notifications: NotificationConfig,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            app_name: "Admin UI".to_string(),
            theme: Theme::Light,
            notifications: NotificationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub email: bool,
    pub push: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email: true,
            push: false,
        }
    }
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// Reads from global config, the local config in `dir`, then applies
    /// environment variable overrides.
    pub fn load(dir: Option<&Path>, env: &Env) -> Result<Self, ConfigError> {
        let layers = Self::sources(dir)
            .iter()
            .map(|path| Self::load_layer(path))
            .collect::<Result<Vec<_>, _>>()?;
        let mut config = Self::from_layers(layers)?;
        config.apply_env_vars(env);
        Ok(config)
    }

    /// Overlay TOML layers, lowest priority first, onto the defaults.
    ///
    /// Any key a later layer sets wins, including one set back to its
    /// default value.
    pub fn from_layers(layers: impl IntoIterator<Item = toml::Table>) -> Result<Self, ConfigError> {
        let mut merged = toml::Table::new();
        for layer in layers {
            merge_tables(&mut merged, layer);
        }
        toml::Value::Table(merged)
            .try_into()
            .map_err(ConfigError::Merge)
    }

    /// Config files that exist, lowest priority first.
    pub fn sources(dir: Option<&Path>) -> Vec<PathBuf> {
        let local = dir.map(|d| d.join(crate::constants::CONFIG_FILENAME));
        Self::global_config_path()
            .into_iter()
            .chain(local)
            .filter(|p| p.exists())
            .collect()
    }

    /// Read one config file as a raw table, rejecting anything that is
    /// not a valid config on its own.
    fn load_layer(path: &Path) -> Result<toml::Table, ConfigError> {
        let parse_error = |source: toml::de::Error| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source,
        };
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        let table: toml::Table = toml::from_str(&content).map_err(parse_error)?;
        toml::Value::Table(table.clone())
            .try_into::<Config>()
            .map_err(parse_error)?;
        Ok(table)
    }

    /// Get the global config file path.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::constants::CONFIG_DIR).join("config.toml"))
    }

    /// The same config with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.api.api_key.is_some() {
            copy.api.api_key = Some("[REDACTED]".to_string());
        }
        copy
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply environment variable overrides.
    fn apply_env_vars(&mut self, env: &Env) {
        if let Some(val) = env.var(ENV_API_URL) {
            self.api.base_url = val;
        }
        if let Some(val) = env.var(ENV_API_KEY) {
            self.api.api_key = Some(val);
        }
        match env.parse::<u64>(ENV_STALE_SECS) {
            Some(Ok(secs)) => self.cache.stale_secs = secs,
            Some(Err(val)) => eprintln!("Warning: ignoring invalid {ENV_STALE_SECS} value: {val}"),
            None => {}
        }
        if let Some(val) = env.var(ENV_LOG) {
            self.logging.level = val;
        }
        match env.flag(ENV_MOCK) {
            Some(Ok(enabled)) => self.mock.enabled = enabled,
            Some(Err(val)) => eprintln!("Warning: ignoring invalid {ENV_MOCK} value: {val}"),
            None => {}
        }
    }
}

/// Overlay `layer` onto `base`. Tables merge key by key; any other value
/// replaces what was there.
fn merge_tables(base: &mut toml::Table, layer: toml::Table) {
    for (key, value) in layer {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                } else {
                    base.insert(key, toml::Value::Table(incoming));
                }
            }
            other => {
                base.insert(key, other);
            }
        }
    }
}
