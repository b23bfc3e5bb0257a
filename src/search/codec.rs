//! Location query string encoding for [`SearchParams`].
//!
//! `encode` writes only the fields that differ from their defaults, in the
//! fixed order page, limit, search, role, status. `decode` never fails:
//! out-of-range or wrong-typed values are clamped to the nearest valid
//! value, and unknown keys are ignored. For every valid state,
//! `decode(encode(s)) == s`.

use crate::models::{DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT, Role, SearchParams, Status};

/// Query pairs for the non-default fields of `params`.
pub fn encode(params: &SearchParams) -> Vec<(&'static str, String)> {
    let params = params.normalized();
    let mut pairs = Vec::new();
    if params.page != DEFAULT_PAGE {
        pairs.push(("page", params.page.to_string()));
    }
    if params.limit != DEFAULT_LIMIT {
        pairs.push(("limit", params.limit.to_string()));
    }
    if let Some(search) = params.search {
        pairs.push(("search", search));
    }
    if let Some(role) = params.role {
        pairs.push(("role", role.to_string()));
    }
    if let Some(status) = params.status {
        pairs.push(("status", status.to_string()));
    }
    pairs
}

/// Build search state from decoded query pairs, clamping bad values.
///
/// The first occurrence of a repeated key wins.
pub fn decode<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> SearchParams
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut page = None;
    let mut limit = None;
    let mut search = None;
    let mut role = None;
    let mut status = None;

    for (key, value) in pairs {
        let value = value.as_ref();
        match key.as_ref() {
            "page" if page.is_none() => page = Some(clamp_page(value)),
            "limit" if limit.is_none() => limit = Some(clamp_limit(value)),
            "search" if search.is_none() => search = Some(value.to_string()),
            "role" if role.is_none() => role = Some(value.parse::<Role>().ok()),
            "status" if status.is_none() => status = Some(value.parse::<Status>().ok()),
            _ => {}
        }
    }

    SearchParams {
        page: page.unwrap_or(DEFAULT_PAGE),
        limit: limit.unwrap_or(DEFAULT_LIMIT),
        search: search.filter(|s| !s.is_empty()),
        role: role.flatten(),
        status: status.flatten(),
    }
}

/// Decode a raw query string (with or without the leading `?`).
pub fn decode_query(query: &str) -> SearchParams {
    let query = query.trim_start_matches('?');
    let Ok(mut url) = reqwest::Url::parse(crate::constants::LOCATION_ORIGIN) else {
        return SearchParams::default();
    };
    url.set_query(Some(query));
    decode(url.query_pairs())
}

fn clamp_page(raw: &str) -> u32 {
    match parse_integer(raw) {
        Some(n) if n < 1 => 1,
        Some(n) => u32::try_from(n).unwrap_or(u32::MAX),
        None => DEFAULT_PAGE,
    }
}

fn clamp_limit(raw: &str) -> u32 {
    match parse_integer(raw) {
        Some(n) if n < 1 => 1,
        Some(n) if n > i64::from(MAX_LIMIT) => MAX_LIMIT,
        Some(n) => n as u32,
        None => DEFAULT_LIMIT,
    }
}

/// Integers, plus finite decimals truncated toward zero (`2.5` → 2).
fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
}
