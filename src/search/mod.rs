//! Filter/search state synchronization.
//!
//! Keeps the location query string and the list filter state in step:
//! edits are merged into the current state and written back to the
//! [`Location`], and the cache key is always derived from what the
//! location decodes to. Bounds are not checked here; decoding clamps and
//! the schema layer validates before anything reaches the network.

pub mod codec;
pub mod location;

pub use location::{Location, LocationError};

use crate::models::{DEFAULT_PAGE, Role, SearchParams, Status};

/// A partial filter edit.
///
/// Each field is `None` to leave the current value alone, `Some(None)` to
/// clear it, or `Some(Some(v))` to set it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPatch {
    pub search: Option<Option<String>>,
    pub role: Option<Option<Role>>,
    pub status: Option<Option<Status>>,
    pub limit: Option<u32>,
}

impl SearchPatch {
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(Some(text.into()));
        self
    }

    pub fn clear_search(mut self) -> Self {
        self.search = Some(None);
        self
    }

    pub fn role(mut self, role: Option<Role>) -> Self {
        self.role = Some(role);
        self
    }

    pub fn status(mut self, status: Option<Status>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Merge a filter edit into `current`. The page always resets to 1 so a
/// stale page offset is never combined with a changed filter.
pub fn merge(current: &SearchParams, patch: &SearchPatch) -> SearchParams {
    SearchParams {
        page: DEFAULT_PAGE,
        limit: patch.limit.unwrap_or(current.limit),
        search: patch
            .search
            .clone()
            .unwrap_or_else(|| current.search.clone()),
        role: patch.role.unwrap_or(current.role),
        status: patch.status.unwrap_or(current.status),
    }
}

/// `current` with only the page changed.
pub fn with_page(current: &SearchParams, page: u32) -> SearchParams {
    SearchParams {
        page,
        ..current.clone()
    }
}

impl Location {
    /// Apply a filter edit and navigate to the result (page reset to 1).
    pub fn update_search(&mut self, patch: &SearchPatch) -> SearchParams {
        let next = merge(&self.search(), patch);
        self.navigate(&next);
        self.search()
    }

    /// Change only the page number.
    pub fn update_page(&mut self, page: u32) -> SearchParams {
        let next = with_page(&self.search(), page);
        self.navigate(&next);
        self.search()
    }
}
