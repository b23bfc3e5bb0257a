//! JSON output renderer.
//!
//! Lists render as `{"users": [...], "total", "page", "limit", "totalPages"}`;
//! failures as `{"error": {"kind", "message"}}`.

use serde_json::{Value, json};

use crate::client::{ApiError, ErrorKind};
use crate::models::User;
use crate::output::OutputRenderer;
use crate::view::{DashboardSummary, SettingsView, UsersPage};

/// JSON output renderer.
pub struct JsonRenderer;

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}

fn to_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

impl OutputRenderer for JsonRenderer {
    fn users(&self, page: &UsersPage) -> String {
        pretty(&json!({
            "users": page.list.users,
            "total": page.list.total,
            "page": page.list.page,
            "limit": page.list.limit,
            "totalPages": page.info.total_pages,
        }))
    }

    fn user(&self, user: &User) -> String {
        pretty(&to_value(user))
    }

    fn deleted(&self, id: &str) -> String {
        pretty(&json!({ "deleted": id }))
    }

    fn dashboard(&self, summary: &DashboardSummary) -> String {
        pretty(&to_value(summary))
    }

    fn settings(&self, view: &SettingsView) -> String {
        pretty(&to_value(view))
    }

    fn failure(&self, err: &ApiError) -> String {
        let kind = match err.kind() {
            ErrorKind::Failure => "failure",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Rejected => "rejected",
        };
        let mut error = json!({ "kind": kind, "message": err.to_string() });
        if let ApiError::Validation(schema) = err {
            error["issues"] = schema
                .issues
                .iter()
                .map(|i| json!({ "path": i.path, "message": i.message }))
                .collect();
        }
        pretty(&json!({ "error": error }))
    }
}
