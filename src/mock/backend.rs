//! In-memory user store answering the REST contract.
//!
//! [`MockBackend`] exposes typed operations (used by the axum server) and
//! [`MockBackend::handle`], which answers an [`ApiRequest`] with exactly
//! the status codes and JSON the real backend would send.

use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use reqwest::Method;
use serde_json::{Value, json};

use crate::models::{CreateUser, HealthReport, SearchParams, ServiceHealth, UpdateUser, User, UserList};
use crate::schema::{self, SchemaError};
use crate::search::codec;
use crate::transport::{ApiRequest, ApiResponse};

use super::fixture;

/// Matched route of a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route<'a> {
    Users,
    User(&'a str),
    Health,
}

fn route(path: &str) -> Option<Route<'_>> {
    let path = path.trim_end_matches('/');
    match path {
        "/users" => Some(Route::Users),
        "/health" => Some(Route::Health),
        _ => {
            let id = path.strip_prefix("/users/")?;
            (!id.is_empty() && !id.contains('/')).then_some(Route::User(id))
        }
    }
}

/// The mock user database.
#[derive(Debug)]
pub struct MockBackend {
    users: Mutex<Vec<User>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::with_users(fixture::seed_users())
    }
}

impl MockBackend {
    /// A backend seeded with the standard five users.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users),
        }
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Filter, then slice out the requested page.
    ///
    /// `search` matches name or email case-insensitively; `role` and
    /// `status` must match exactly. `total` counts every filtered user.
    pub fn list(&self, params: &SearchParams) -> UserList {
        let params = params.normalized();
        let needle = params.search.as_deref().map(str::to_lowercase);
        let users = self.lock();
        let filtered: Vec<&User> = users
            .iter()
            .filter(|u| match needle {
                Some(ref n) => u.name.to_lowercase().contains(n) || u.email.to_lowercase().contains(n),
                None => true,
            })
            .filter(|u| params.role.is_none_or(|r| u.role == r))
            .filter(|u| params.status.is_none_or(|s| u.status == s))
            .collect();

        let page = params.page.max(1) as usize;
        let limit = params.limit as usize;
        let start = (page - 1).saturating_mul(limit);
        UserList {
            users: filtered.iter().skip(start).take(limit).map(|u| (*u).clone()).collect(),
            total: filtered.len() as u64,
            page: params.page,
            limit: params.limit,
        }
    }

    pub fn get(&self, id: &str) -> Option<User> {
        self.lock().iter().find(|u| u.id == id).cloned()
    }

    /// Store a new user under a fresh id. The password is dropped.
    pub fn create(&self, payload: CreateUser) -> User {
        let now = Utc::now();
        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name: payload.name,
            email: payload.email,
            role: payload.role,
            status: payload.status,
            avatar: payload.avatar,
            created_at: now,
            updated_at: now,
        };
        self.lock().push(user.clone());
        tracing::debug!(id = %user.id, "mock created user");
        user
    }

    /// Merge `patch` into the user and bump `updated_at`.
    pub fn update(&self, id: &str, patch: &UpdateUser) -> Option<User> {
        let mut users = self.lock();
        let user = users.iter_mut().find(|u| u.id == id)?;
        patch.apply_to(user);
        user.updated_at = Utc::now().max(user.created_at);
        Some(user.clone())
    }

    /// Returns `false` when no such user exists.
    pub fn delete(&self, id: &str) -> bool {
        let mut users = self.lock();
        let before = users.len();
        users.retain(|u| u.id != id);
        users.len() != before
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            services: ServiceHealth {
                database: "healthy".to_string(),
                cache: "healthy".to_string(),
                auth: "healthy".to_string(),
            },
        }
    }

    /// Validate a `POST /users` body and store it.
    pub fn create_from_json(&self, body: &Value) -> Result<User, SchemaError> {
        let payload = schema::parse_create(body)?;
        Ok(self.create(payload))
    }

    /// Validate a `PATCH /users/:id` body and apply it.
    pub fn update_from_json(&self, id: &str, body: &Value) -> Result<Option<User>, SchemaError> {
        let patch = schema::parse_update(body)?;
        Ok(self.update(id, &patch))
    }

    /// Answer a request, or `None` if no route matches.
    pub fn handle(&self, request: &ApiRequest) -> Option<ApiResponse> {
        let response = match (&request.method, route(&request.path)?) {
            (&Method::GET, Route::Users) => {
                let params = codec::decode(request.query.iter().map(|(k, v)| (k, v)));
                ApiResponse::json(200, &to_json(&self.list(&params)))
            }
            (&Method::POST, Route::Users) => match request.body {
                Some(ref body) => match self.create_from_json(body) {
                    Ok(user) => ApiResponse::json(201, &to_json(&user)),
                    Err(err) => rejection(&err),
                },
                None => missing_body(),
            },
            (&Method::GET, Route::User(id)) => match self.get(id) {
                Some(user) => ApiResponse::json(200, &to_json(&user)),
                None => not_found(),
            },
            (&Method::PATCH, Route::User(id)) => match request.body {
                Some(ref body) => match self.update_from_json(id, body) {
                    Ok(Some(user)) => ApiResponse::json(200, &to_json(&user)),
                    Ok(None) => not_found(),
                    Err(err) => rejection(&err),
                },
                None => missing_body(),
            },
            (&Method::DELETE, Route::User(id)) => {
                if self.delete(id) {
                    ApiResponse::new(204, "")
                } else {
                    not_found()
                }
            }
            (&Method::GET, Route::Health) => ApiResponse::json(200, &to_json(&self.health())),
            _ => return None,
        };
        Some(response)
    }

    fn lock(&self) -> MutexGuard<'_, Vec<User>> {
        self.users
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// Body sent with a 404.
pub fn not_found_body() -> Value {
    json!({ "message": "User not found" })
}

/// Body sent with a 422, listing every rejected field.
pub fn rejection_body(err: &SchemaError) -> Value {
    let issues: Vec<Value> = err
        .issues
        .iter()
        .map(|i| json!({ "path": i.path, "message": i.message }))
        .collect();
    json!({ "message": err.to_string(), "issues": issues })
}

fn not_found() -> ApiResponse {
    ApiResponse::json(404, &not_found_body())
}

fn rejection(err: &SchemaError) -> ApiResponse {
    ApiResponse::json(422, &rejection_body(err))
}

fn missing_body() -> ApiResponse {
    ApiResponse::json(400, &json!({ "message": "request body required" }))
}
