//! Dashboard summary: backend health plus user counts.

use std::collections::BTreeMap;

use serde::Serialize;
use strum::IntoEnumIterator;

use crate::client::{ApiError, UserClient};
use crate::models::{HealthReport, Role, SearchParams, Status};

/// Everything the dashboard shows.
///
/// Each part fails independently: an unreachable health endpoint does not
/// hide the user counts.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    #[serde(serialize_with = "ser_result")]
    pub health: Result<HealthReport, ApiError>,
    #[serde(serialize_with = "ser_result")]
    pub total_users: Result<u64, ApiError>,
    pub by_status: BTreeMap<Status, u64>,
    pub by_role: BTreeMap<Role, u64>,
}

impl DashboardSummary {
    /// Share of users that are active, in percent.
    pub fn active_share(&self) -> Option<f64> {
        let total = *self.total_users.as_ref().ok()?;
        if total == 0 {
            return None;
        }
        let active = self.by_status.get(&Status::Active).copied().unwrap_or(0);
        Some(active as f64 * 100.0 / total as f64)
    }
}

/// Gather the dashboard figures.
///
/// Counts come from one-row list queries, so they share the list cache.
pub async fn summarize(client: &UserClient) -> DashboardSummary {
    let (health, total_users) =
        tokio::join!(client.health(), count(client, SearchParams::default()));

    let mut by_status = BTreeMap::new();
    for status in Status::iter() {
        let params = SearchParams {
            status: Some(status),
            ..Default::default()
        };
        if let Ok(n) = count(client, params).await {
            by_status.insert(status, n);
        }
    }

    let mut by_role = BTreeMap::new();
    for role in Role::iter() {
        let params = SearchParams {
            role: Some(role),
            ..Default::default()
        };
        if let Ok(n) = count(client, params).await {
            by_role.insert(role, n);
        }
    }

    DashboardSummary {
        health,
        total_users,
        by_status,
        by_role,
    }
}

async fn count(client: &UserClient, params: SearchParams) -> Result<u64, ApiError> {
    let params = SearchParams { limit: 1, ..params };
    Ok(client.list(&params).await?.total)
}

fn ser_result<T: Serialize, S: serde::Serializer>(
    value: &Result<T, ApiError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Ok(v) => v.serialize(serializer),
        Err(e) => serde_json::json!({ "error": e.to_string() }).serialize(serializer),
    }
}
