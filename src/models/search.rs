//! Filter/search state for the user list view.

use serde::{Deserialize, Serialize};

use super::user::{Role, Status};

/// First page number.
pub const DEFAULT_PAGE: u32 = 1;

/// Page size when none is given.
pub const DEFAULT_LIMIT: u32 = 10;

/// Largest page size the backend accepts.
pub const MAX_LIMIT: u32 = 100;

/// Page, page size, and filters driving the user list.
///
/// This is the single source of truth for both the list controls and the
/// outbound query. It is serialized into the location query string by
/// [`crate::search::codec`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchParams {
    pub page: u32,
    pub limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            search: None,
            role: None,
            status: None,
        }
    }
}

impl SearchParams {
    /// The same filters with an empty search text treated as absent.
    pub fn normalized(&self) -> Self {
        Self {
            search: self.search.clone().filter(|s| !s.is_empty()),
            ..self.clone()
        }
    }

    /// Outbound query pairs in a fixed order, omitting absent filters.
    ///
    /// Unlike the location encoding, page and limit are always sent.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let normalized = self.normalized();
        let mut pairs = vec![
            ("page".to_string(), normalized.page.to_string()),
            ("limit".to_string(), normalized.limit.to_string()),
        ];
        if let Some(search) = normalized.search {
            pairs.push(("search".to_string(), search));
        }
        if let Some(role) = normalized.role {
            pairs.push(("role".to_string(), role.to_string()));
        }
        if let Some(status) = normalized.status {
            pairs.push(("status".to_string(), status.to_string()));
        }
        pairs
    }
}
