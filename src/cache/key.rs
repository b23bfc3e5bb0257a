//! Canonical cache keys.
//!
//! Keys are hierarchical (`users` → `list`/`detail` → parameters) so a
//! write can invalidate a whole branch with a [`KeyScope`]. List keys
//! hold the fully-resolved search state: defaults are filled in and an
//! empty search counts as absent, so equal filters always produce equal
//! keys regardless of how they were spelled.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::models::SearchParams;

/// Identity of one cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    UserList(SearchParams),
    UserDetail(String),
}

impl QueryKey {
    /// Key for a list page with the given filters.
    pub fn user_list(params: &SearchParams) -> Self {
        Self::UserList(params.normalized())
    }

    /// Key for a single user.
    pub fn user_detail(id: impl Into<String>) -> Self {
        Self::UserDetail(id.into())
    }

    /// Unambiguous textual form, e.g. `["users","detail","3"]`.
    pub fn canonical(&self) -> String {
        let value = match self {
            Self::UserList(params) => serde_json::json!(["users", "list", params]),
            Self::UserDetail(id) => serde_json::json!(["users", "detail", id]),
        };
        value.to_string()
    }

    /// SHA-256 of the canonical form, hex encoded. The cache store
    /// addresses its slots by this digest.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical().as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

/// A branch of the key hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyScope {
    /// Every users query.
    Users,
    /// Every list page, whatever the filters.
    UserLists,
    /// Every single-user entry.
    UserDetails,
    /// One user's entry.
    UserDetail(String),
}

impl KeyScope {
    /// Returns `true` if `key` lies under this scope.
    pub fn contains(&self, key: &QueryKey) -> bool {
        match (self, key) {
            (Self::Users, _) => true,
            (Self::UserLists, QueryKey::UserList(_)) => true,
            (Self::UserDetails, QueryKey::UserDetail(_)) => true,
            (Self::UserDetail(id), QueryKey::UserDetail(other)) => id == other,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Role, Status};
    use crate::search::codec;

    #[test]
    fn key_is_deterministic() {
        let params = SearchParams {
            role: Some(Role::Admin),
            ..Default::default()
        };
        assert_eq!(QueryKey::user_list(&params), QueryKey::user_list(&params));
        assert_eq!(
            QueryKey::user_list(&params).digest(),
            QueryKey::user_list(&params).digest()
        );
    }

    #[test]
    fn field_order_and_defaults_do_not_matter() {
        let a = codec::decode_query("status=active&page=1&role=admin&limit=10");
        let b = codec::decode_query("role=admin&status=active");
        assert_eq!(QueryKey::user_list(&a), QueryKey::user_list(&b));
        assert_eq!(
            QueryKey::user_list(&a).digest(),
            QueryKey::user_list(&b).digest()
        );
    }

    #[test]
    fn empty_search_equals_absent_search() {
        let with_empty = SearchParams {
            search: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(
            QueryKey::user_list(&with_empty),
            QueryKey::user_list(&SearchParams::default())
        );
    }

    #[test]
    fn distinct_filters_give_distinct_keys() {
        let variants = [
            SearchParams::default(),
            SearchParams {
                page: 2,
                ..Default::default()
            },
            SearchParams {
                limit: 20,
                ..Default::default()
            },
            SearchParams {
                search: Some("a".into()),
                ..Default::default()
            },
            SearchParams {
                search: Some("a&role=admin".into()),
                ..Default::default()
            },
            SearchParams {
                search: Some("a".into()),
                role: Some(Role::Admin),
                ..Default::default()
            },
            SearchParams {
                role: Some(Role::User),
                ..Default::default()
            },
            SearchParams {
                status: Some(Status::Suspended),
                ..Default::default()
            },
        ];
        let digests: std::collections::HashSet<_> = variants
            .iter()
            .map(|p| QueryKey::user_list(p).digest())
            .collect();
        assert_eq!(digests.len(), variants.len());
    }

    #[test]
    fn canonical_never_spells_undefined() {
        let key = QueryKey::user_list(&SearchParams::default());
        assert_eq!(key.canonical(), r#"["users","list",{"limit":10,"page":1}]"#);
        assert!(!key.canonical().contains("undefined"));
        assert!(!key.canonical().contains("null"));
    }

    #[test]
    fn scopes_select_branches() {
        let list = QueryKey::user_list(&SearchParams::default());
        let detail = QueryKey::user_detail("3");
        assert!(KeyScope::Users.contains(&list));
        assert!(KeyScope::UserLists.contains(&list));
        assert!(!KeyScope::UserLists.contains(&detail));
        assert!(KeyScope::UserDetail("3".into()).contains(&detail));
        assert!(!KeyScope::UserDetail("4".into()).contains(&detail));
    }
}
