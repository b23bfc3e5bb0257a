//! The address bar: a URL whose query string carries the list state.

use reqwest::Url;
use thiserror::Error;

use crate::cache::QueryKey;
use crate::constants::LOCATION_ORIGIN;
use crate::models::SearchParams;

use super::codec;

/// Errors when parsing a location.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("invalid location {input:?}: {reason}")]
    Invalid { input: String, reason: String },
}

/// Current URL plus back-navigation history.
///
/// Every navigation bumps [`Location::revision`], which lets in-flight
/// loads detect that the state they were issued for is gone.
#[derive(Debug, Clone)]
pub struct Location {
    current: Url,
    history: Vec<Url>,
    revision: u64,
}

impl Location {
    /// Parse an absolute URL or a path relative to the local origin
    /// (`/users?page=2`, `?role=admin`).
    pub fn parse(input: &str) -> Result<Self, LocationError> {
        let invalid = |reason: String| LocationError::Invalid {
            input: input.to_string(),
            reason,
        };
        let url = if input.contains("://") {
            Url::parse(input).map_err(|e| invalid(e.to_string()))?
        } else {
            Url::parse(LOCATION_ORIGIN)
                .and_then(|origin| origin.join(input))
                .map_err(|e| invalid(e.to_string()))?
        };
        Ok(Self {
            current: url,
            history: Vec::new(),
            revision: 0,
        })
    }

    /// The list route with default state.
    pub fn users() -> Self {
        Self {
            current: users_url(),
            history: Vec::new(),
            revision: 0,
        }
    }

    /// Full URL as shown in the address bar.
    pub fn href(&self) -> &str {
        self.current.as_str()
    }

    /// Raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.current.query()
    }

    /// Monotonic navigation counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Decode the current search state, clamping invalid values.
    pub fn search(&self) -> SearchParams {
        codec::decode(self.current.query_pairs())
    }

    /// Cache key for the current search state.
    pub fn cache_key(&self) -> QueryKey {
        QueryKey::user_list(&self.search())
    }

    /// Navigate to `params`, pushing the current URL onto the history.
    ///
    /// Returns `false` when the URL would not change.
    pub fn navigate(&mut self, params: &SearchParams) -> bool {
        let next = with_search(&self.current, params);
        if next == self.current {
            return false;
        }
        let previous = std::mem::replace(&mut self.current, next);
        self.history.push(previous);
        self.revision += 1;
        true
    }

    /// Rewrite the query into its canonical form without adding history.
    ///
    /// Used after loading a hand-edited URL so the address bar shows the
    /// clamped values actually in effect.
    pub fn normalize(&mut self) -> bool {
        let next = with_search(&self.current, &self.search());
        if next == self.current {
            return false;
        }
        self.current = next;
        self.revision += 1;
        true
    }

    /// Go back one entry. Returns `false` at the start of history.
    pub fn back(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.current = previous;
                self.revision += 1;
                true
            }
            None => false,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::users()
    }
}

fn users_url() -> Url {
    let mut url = Url::parse(LOCATION_ORIGIN).expect("LOCATION_ORIGIN is a valid URL");
    url.set_path("/users");
    url
}

fn with_search(base: &Url, params: &SearchParams) -> Url {
    let mut next = base.clone();
    let pairs = codec::encode(params);
    if pairs.is_empty() {
        next.set_query(None);
    } else {
        next.query_pairs_mut().clear().extend_pairs(pairs);
    }
    next
}
