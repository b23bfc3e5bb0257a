//! App-wide constants.
//!
//! Centralises the tool name, config paths, environment variable names,
//! and endpoint defaults so a rename only requires changing this file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "userdesk";

/// Crate version as reported by `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Local config filename (e.g. `.userdesk.toml` in the working directory).
pub const CONFIG_FILENAME: &str = ".userdesk.toml";

/// Directory name under `~/.config/` for global config.
pub const CONFIG_DIR: &str = "userdesk";

/// Backend used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "https://api.example.com";

/// Base for resolving relative locations such as `/users?page=2`.
pub const LOCATION_ORIGIN: &str = "http://localhost";

// ── Environment variable names ──────────────────────────────────────

pub const ENV_API_URL: &str = "USERDESK_API_URL";
pub const ENV_STALE_SECS: &str = "USERDESK_STALE_SECS";
pub const ENV_LOG: &str = "USERDESK_LOG";
pub const ENV_MOCK: &str = "USERDESK_MOCK";
pub const ENV_API_KEY: &str = "USERDESK_API_KEY";
pub const ENV_FORMAT: &str = "USERDESK_FORMAT";

/// User-Agent sent with every backend request.
pub const USER_AGENT: &str = concat!("userdesk/", env!("CARGO_PKG_VERSION"));
