//! Environment variable abstraction for testability.
//!
//! Production code uses [`Env::real()`] which delegates to [`std::env::var`].
//! Tests use [`Env::mock()`] backed by a `HashMap`, so config layering can
//! be exercised without touching the process environment.

use std::collections::HashMap;
use std::str::FromStr;

/// Environment variable reader.
#[derive(Clone, Debug, Default)]
pub struct Env {
    overrides: Option<HashMap<String, String>>,
}

impl Env {
    /// Create an `Env` that reads from the real process environment.
    pub fn real() -> Self {
        Self { overrides: None }
    }

    /// Create an `Env` backed by explicit key-value pairs.
    pub fn mock(vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        Self {
            overrides: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Look up a variable. Empty values count as unset.
    pub fn var(&self, name: &str) -> Option<String> {
        let value = match &self.overrides {
            Some(map) => map.get(name).cloned(),
            None => std::env::var(name).ok(),
        };
        value.filter(|v| !v.trim().is_empty())
    }

    /// Parse a variable into `T`.
    ///
    /// Returns `None` when unset and `Some(Err(raw))` when the value does
    /// not parse, so callers can warn about the bad value.
    pub fn parse<T: FromStr>(&self, name: &str) -> Option<Result<T, String>> {
        self.var(name)
            .map(|raw| raw.trim().parse::<T>().map_err(|_| raw))
    }

    /// Read a boolean switch (`1/true/yes/on`, `0/false/no/off`).
    pub fn flag(&self, name: &str) -> Option<Result<bool, String>> {
        self.var(name).map(|raw| match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(raw),
        })
    }
}
