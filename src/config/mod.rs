//! Configuration loading and layering.
//!
//! Handles `.userdesk.toml` loading, environment variable resolution,
//! and CLI flag merging with proper priority ordering.

pub mod loader;

pub use loader::{
    ApiConfig, CacheConfig, Config, ConfigError, DEFAULT_GC_SECS, DEFAULT_STALE_SECS,
    LoggingConfig, MockConfig, NotificationConfig, Theme, UiConfig,
};
