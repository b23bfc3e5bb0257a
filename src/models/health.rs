//! Backend health report returned by `GET /health`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Overall health plus per-dependency states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub services: ServiceHealth,
}

/// States of the backend's dependencies (free-form, e.g. `healthy`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub database: String,
    pub cache: String,
    pub auth: String,
}

impl HealthReport {
    /// Returns `true` when the backend and every service report healthy.
    pub fn is_healthy(&self) -> bool {
        self.status == "ok"
            && [
                &self.services.database,
                &self.services.cache,
                &self.services.auth,
            ]
            .iter()
            .all(|s| s.as_str() == "healthy")
    }
}
