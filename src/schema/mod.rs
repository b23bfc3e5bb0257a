//! Wire-shape validation.
//!
//! Every JSON body crossing the transport boundary goes through one of the
//! `parse_*` functions here, and every outbound payload through a
//! `validate_*` function. They never panic and never throw: the result is
//! either the typed value or a [`SchemaError`] listing every offending
//! field, so callers can tell a validation failure apart from a network
//! failure without inspecting error messages.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{
    CreateUser, HealthReport, MAX_LIMIT, Role, SearchParams, ServiceHealth, Status, UpdateUser,
    User, UserList,
};

/// Maximum length of a display name, in characters.
pub const NAME_MAX_CHARS: usize = 100;

/// Minimum length of a password, in characters.
pub const PASSWORD_MIN_CHARS: usize = 8;

/// Maximum length of an identifier.
pub const ID_MAX_CHARS: usize = 64;

static EMAIL_RE: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
    regex::Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .unwrap()
});

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Dotted path to the field, e.g. `users[2].email`. `$` is the root.
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A value did not match its declared shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {subject}: {}", join_issues(.issues))]
pub struct SchemaError {
    /// What was being validated (`user`, `user list`, ...).
    pub subject: &'static str,
    pub issues: Vec<FieldIssue>,
}

impl SchemaError {
    /// A body that is not JSON at all.
    pub fn malformed(subject: &'static str, reason: impl Into<String>) -> Self {
        Self {
            subject,
            issues: vec![FieldIssue {
                path: "$".to_string(),
                message: reason.into(),
            }],
        }
    }

    /// Returns `true` if any issue concerns the given path.
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|i| i.path == path)
    }
}

fn join_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects issues while a value is being walked.
struct Issues {
    subject: &'static str,
    list: Vec<FieldIssue>,
}

impl Issues {
    fn new(subject: &'static str) -> Self {
        Self {
            subject,
            list: Vec::new(),
        }
    }

    fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.list.push(FieldIssue {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Resolve to the built value, or to every collected issue.
    fn finish<T>(self, value: Option<T>) -> Result<T, SchemaError> {
        match value {
            Some(v) if self.list.is_empty() => Ok(v),
            _ => Err(SchemaError {
                subject: self.subject,
                issues: self.list,
            }),
        }
    }
}

fn field_path(prefix: &str, key: &str) -> String {
    format!("{prefix}{key}")
}

fn root_path(prefix: &str) -> String {
    if prefix.is_empty() {
        "$".to_string()
    } else {
        prefix.trim_end_matches('.').to_string()
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn object<'a>(
    value: &'a Value,
    prefix: &str,
    issues: &mut Issues,
) -> Option<&'a Map<String, Value>> {
    match value.as_object() {
        Some(obj) => Some(obj),
        None => {
            issues.add(
                root_path(prefix),
                format!("expected object, found {}", describe(value)),
            );
            None
        }
    }
}

fn required_str<'a>(
    obj: &'a Map<String, Value>,
    prefix: &str,
    key: &str,
    issues: &mut Issues,
) -> Option<&'a str> {
    match obj.get(key) {
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            issues.add(
                field_path(prefix, key),
                format!("expected string, found {}", describe(other)),
            );
            None
        }
        None => {
            issues.add(field_path(prefix, key), "required");
            None
        }
    }
}

/// `Ok(None)` when absent, `Err(())` when present with the wrong type.
fn optional_str<'a>(
    obj: &'a Map<String, Value>,
    prefix: &str,
    key: &str,
    issues: &mut Issues,
) -> Result<Option<&'a str>, ()> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => {
            issues.add(
                field_path(prefix, key),
                format!("expected string, found {}", describe(other)),
            );
            Err(())
        }
    }
}

fn required_count(
    obj: &Map<String, Value>,
    prefix: &str,
    key: &str,
    issues: &mut Issues,
) -> Option<u64> {
    match obj.get(key) {
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) => Some(v),
            None => {
                issues.add(field_path(prefix, key), "expected non-negative integer");
                None
            }
        },
        Some(other) => {
            issues.add(
                field_path(prefix, key),
                format!("expected number, found {}", describe(other)),
            );
            None
        }
        None => {
            issues.add(field_path(prefix, key), "required");
            None
        }
    }
}

fn required_u32(
    obj: &Map<String, Value>,
    prefix: &str,
    key: &str,
    issues: &mut Issues,
) -> Option<u32> {
    let count = required_count(obj, prefix, key, issues)?;
    match u32::try_from(count) {
        Ok(v) => Some(v),
        Err(_) => {
            issues.add(field_path(prefix, key), format!("out of range: {count}"));
            None
        }
    }
}

fn check_id(id: &str, path: &str, issues: &mut Issues) -> bool {
    let ok = !id.is_empty()
        && id.len() <= ID_MAX_CHARS
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !ok {
        issues.add(path, "invalid identifier");
    }
    ok
}

fn check_name(name: &str, path: &str, issues: &mut Issues) -> bool {
    let len = name.chars().count();
    if len == 0 {
        issues.add(path, "name is required");
        false
    } else if len > NAME_MAX_CHARS {
        issues.add(path, format!("must be at most {NAME_MAX_CHARS} characters"));
        false
    } else {
        true
    }
}

fn check_email(email: &str, path: &str, issues: &mut Issues) -> bool {
    let ok = EMAIL_RE.is_match(email);
    if !ok {
        issues.add(path, "invalid email address");
    }
    ok
}

fn check_avatar(url: &str, path: &str, issues: &mut Issues) -> bool {
    let ok = reqwest::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false);
    if !ok {
        issues.add(path, "invalid url");
    }
    ok
}

fn check_password(password: &str, path: &str, issues: &mut Issues) -> bool {
    let ok = password.chars().count() >= PASSWORD_MIN_CHARS;
    if !ok {
        issues.add(
            path,
            format!("password must be at least {PASSWORD_MIN_CHARS} characters"),
        );
    }
    ok
}

fn parse_choice<T: FromStr>(
    raw: &str,
    allowed: &str,
    path: &str,
    issues: &mut Issues,
) -> Option<T> {
    match raw.parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            issues.add(path, format!("expected one of {allowed}, found \"{raw}\""));
            None
        }
    }
}

const ROLES: &str = "admin|moderator|user";
const STATUSES: &str = "active|inactive|suspended";

fn parse_datetime(raw: &str, path: &str, issues: &mut Issues) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(_) => {
            issues.add(path, "expected ISO-8601 datetime");
            None
        }
    }
}

fn user_at(value: &Value, prefix: &str, issues: &mut Issues) -> Option<User> {
    let obj = object(value, prefix, issues)?;

    let id = required_str(obj, prefix, "id", issues)
        .filter(|id| check_id(id, &field_path(prefix, "id"), issues));
    let name = required_str(obj, prefix, "name", issues)
        .filter(|n| check_name(n, &field_path(prefix, "name"), issues));
    let email = required_str(obj, prefix, "email", issues)
        .filter(|e| check_email(e, &field_path(prefix, "email"), issues));
    let role = required_str(obj, prefix, "role", issues)
        .and_then(|r| parse_choice::<Role>(r, ROLES, &field_path(prefix, "role"), issues));
    let status = required_str(obj, prefix, "status", issues)
        .and_then(|s| parse_choice::<Status>(s, STATUSES, &field_path(prefix, "status"), issues));
    let avatar = optional_str(obj, prefix, "avatar", issues).map(|a| {
        a.filter(|url| check_avatar(url, &field_path(prefix, "avatar"), issues))
            .map(str::to_string)
    });
    let created_at = required_str(obj, prefix, "createdAt", issues)
        .and_then(|t| parse_datetime(t, &field_path(prefix, "createdAt"), issues));
    let updated_at = required_str(obj, prefix, "updatedAt", issues)
        .and_then(|t| parse_datetime(t, &field_path(prefix, "updatedAt"), issues));

    if let (Some(created), Some(updated)) = (created_at, updated_at) {
        if updated < created {
            issues.add(field_path(prefix, "updatedAt"), "must not precede createdAt");
            return None;
        }
    }

    Some(User {
        id: id?.to_string(),
        name: name?.to_string(),
        email: email?.to_string(),
        role: role?,
        status: status?,
        avatar: avatar.ok()?,
        created_at: created_at?,
        updated_at: updated_at?,
    })
}

/// Parse a single user body.
pub fn parse_user(value: &Value) -> Result<User, SchemaError> {
    let mut issues = Issues::new("user");
    let user = user_at(value, "", &mut issues);
    issues.finish(user)
}

/// Parse a `GET /users` body.
pub fn parse_user_list(value: &Value) -> Result<UserList, SchemaError> {
    let mut issues = Issues::new("user list");
    let Some(obj) = object(value, "", &mut issues) else {
        return issues.finish(None);
    };

    let users = match obj.get("users") {
        Some(Value::Array(items)) => {
            let parsed: Vec<Option<User>> = items
                .iter()
                .enumerate()
                .map(|(i, item)| user_at(item, &format!("users[{i}]."), &mut issues))
                .collect();
            parsed.into_iter().collect::<Option<Vec<_>>>()
        }
        Some(other) => {
            issues.add("users", format!("expected array, found {}", describe(other)));
            None
        }
        None => {
            issues.add("users", "required");
            None
        }
    };
    let total = required_count(obj, "", "total", &mut issues);
    let page = required_u32(obj, "", "page", &mut issues);
    let limit = required_u32(obj, "", "limit", &mut issues);

    let list = match (users, total, page, limit) {
        (Some(users), Some(total), Some(page), Some(limit)) => Some(UserList {
            users,
            total,
            page,
            limit,
        }),
        _ => None,
    };
    issues.finish(list)
}

/// Parse a `GET /health` body.
pub fn parse_health(value: &Value) -> Result<HealthReport, SchemaError> {
    let mut issues = Issues::new("health report");
    let Some(obj) = object(value, "", &mut issues) else {
        return issues.finish(None);
    };

    let status = required_str(obj, "", "status", &mut issues);
    let timestamp = required_str(obj, "", "timestamp", &mut issues)
        .and_then(|t| parse_datetime(t, "timestamp", &mut issues));
    let services = match obj.get("services") {
        Some(v) => object(v, "services.", &mut issues).and_then(|svc| {
            let database = required_str(svc, "services.", "database", &mut issues);
            let cache = required_str(svc, "services.", "cache", &mut issues);
            let auth = required_str(svc, "services.", "auth", &mut issues);
            Some(ServiceHealth {
                database: database?.to_string(),
                cache: cache?.to_string(),
                auth: auth?.to_string(),
            })
        }),
        None => {
            issues.add("services", "required");
            None
        }
    };

    let report = match (status, timestamp, services) {
        (Some(status), Some(timestamp), Some(services)) => Some(HealthReport {
            status: status.to_string(),
            timestamp,
            services,
        }),
        _ => None,
    };
    issues.finish(report)
}

/// Parse a `POST /users` body (server side of the contract).
pub fn parse_create(value: &Value) -> Result<CreateUser, SchemaError> {
    let mut issues = Issues::new("new user");
    let Some(obj) = object(value, "", &mut issues) else {
        return issues.finish(None);
    };

    let name = required_str(obj, "", "name", &mut issues);
    let email = required_str(obj, "", "email", &mut issues);
    let role = required_str(obj, "", "role", &mut issues)
        .and_then(|r| parse_choice::<Role>(r, ROLES, "role", &mut issues));
    let status = required_str(obj, "", "status", &mut issues)
        .and_then(|s| parse_choice::<Status>(s, STATUSES, "status", &mut issues));
    let avatar = optional_str(obj, "", "avatar", &mut issues);
    let password = required_str(obj, "", "password", &mut issues);

    let payload = match (name, email, role, status, avatar, password) {
        (Some(name), Some(email), Some(role), Some(status), Ok(avatar), Some(password)) => {
            Some(CreateUser {
                name: name.to_string(),
                email: email.to_string(),
                role,
                status,
                avatar: avatar.map(str::to_string),
                password: password.to_string(),
            })
        }
        _ => None,
    };
    let payload = issues.finish(payload)?;
    validate_create(&payload).map(|()| payload)
}

/// Parse a `PATCH /users/:id` body. Unknown fields are ignored.
pub fn parse_update(value: &Value) -> Result<UpdateUser, SchemaError> {
    let mut issues = Issues::new("user update");
    let Some(obj) = object(value, "", &mut issues) else {
        return issues.finish(None);
    };

    let name = optional_str(obj, "", "name", &mut issues);
    let email = optional_str(obj, "", "email", &mut issues);
    let role = optional_str(obj, "", "role", &mut issues).map(|r| {
        r.and_then(|r| parse_choice::<Role>(r, ROLES, "role", &mut issues))
    });
    let status = optional_str(obj, "", "status", &mut issues).map(|s| {
        s.and_then(|s| parse_choice::<Status>(s, STATUSES, "status", &mut issues))
    });
    let avatar = optional_str(obj, "", "avatar", &mut issues);

    let patch = match (name, email, role, status, avatar) {
        (Ok(name), Ok(email), Ok(role), Ok(status), Ok(avatar)) => Some(UpdateUser {
            name: name.map(str::to_string),
            email: email.map(str::to_string),
            role,
            status,
            avatar: avatar.map(str::to_string),
        }),
        _ => None,
    };
    let patch = issues.finish(patch)?;
    validate_update(&patch).map(|()| patch)
}

/// Validate an outbound create payload.
pub fn validate_create(payload: &CreateUser) -> Result<(), SchemaError> {
    let mut issues = Issues::new("new user");
    check_name(&payload.name, "name", &mut issues);
    check_email(&payload.email, "email", &mut issues);
    if let Some(ref avatar) = payload.avatar {
        check_avatar(avatar, "avatar", &mut issues);
    }
    check_password(&payload.password, "password", &mut issues);
    issues.finish(Some(()))
}

/// Validate an outbound update payload.
pub fn validate_update(patch: &UpdateUser) -> Result<(), SchemaError> {
    let mut issues = Issues::new("user update");
    if let Some(ref name) = patch.name {
        check_name(name, "name", &mut issues);
    }
    if let Some(ref email) = patch.email {
        check_email(email, "email", &mut issues);
    }
    if let Some(ref avatar) = patch.avatar {
        check_avatar(avatar, "avatar", &mut issues);
    }
    issues.finish(Some(()))
}

/// Validate list parameters before they reach the network.
pub fn validate_search(params: &SearchParams) -> Result<(), SchemaError> {
    let mut issues = Issues::new("search parameters");
    if params.page < 1 {
        issues.add("page", "must be at least 1");
    }
    if params.limit < 1 || params.limit > MAX_LIMIT {
        issues.add("limit", format!("must be between 1 and {MAX_LIMIT}"));
    }
    issues.finish(Some(()))
}

/// Validate an identifier before it is placed in a request path.
pub fn validate_id(id: &str) -> Result<(), SchemaError> {
    let mut issues = Issues::new("user id");
    check_id(id, "id", &mut issues);
    issues.finish(Some(()))
}
