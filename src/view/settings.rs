//! Settings view: the effective configuration and where it came from.

use std::path::PathBuf;

use serde::Serialize;

use crate::config::{Config, ConfigError};

/// What the settings view shows. Secrets are already masked.
#[derive(Debug, Clone, Serialize)]
pub struct SettingsView {
    /// Config files that contributed, lowest priority first.
    pub sources: Vec<PathBuf>,
    /// Whether requests go to the in-process mock.
    pub using_mock: bool,
    pub config: Config,
}

impl SettingsView {
    pub fn new(config: &Config, sources: Vec<PathBuf>) -> Self {
        Self {
            sources,
            using_mock: config.mock.enabled,
            config: config.redacted(),
        }
    }

    /// The effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        self.config.to_toml()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_exposes_the_api_key() {
        let mut config = Config::default();
        config.api.api_key = Some("sk-live-123".into());
        let view = SettingsView::new(&config, vec![]);

        assert!(!view.to_toml().unwrap().contains("sk-live-123"));
        assert!(!serde_json::to_string(&view).unwrap().contains("sk-live-123"));
    }

    #[test]
    fn reports_mock_mode() {
        let mut config = Config::default();
        config.mock.enabled = true;
        assert!(SettingsView::new(&config, vec![]).using_mock);
    }
}
