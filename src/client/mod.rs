//! Data-access layer for the users API.
//!
//! [`UserClient`] validates every payload before it is sent and every body
//! after it arrives, serves reads from the [`QueryCache`] while they are
//! fresh, shares identical concurrent reads, and keeps the cache coherent
//! after writes.

pub mod error;
pub mod inflight;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::cache::{Cacheable, KeyScope, Lookup, QueryCache, QueryKey};
use crate::models::{CreateUser, HealthReport, SearchParams, UpdateUser, User, UserList};
use crate::schema::{self, SchemaError};
use crate::transport::{ApiRequest, ApiResponse, Transport};

pub use error::{ApiError, ErrorKind};
pub use inflight::InFlight;

/// Retries allowed for a failed read.
pub const MAX_READ_RETRIES: u32 = 1;

/// Pause before retrying a failed read.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// How failed reads are retried. Writes are never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_READ_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Typed client for the users API.
pub struct UserClient {
    transport: Arc<dyn Transport>,
    cache: Arc<QueryCache>,
    lists: InFlight<UserList>,
    details: InFlight<User>,
    retry: RetryPolicy,
}

impl UserClient {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<QueryCache>) -> Self {
        Self {
            transport,
            cache,
            lists: InFlight::new(),
            details: InFlight::new(),
            retry: RetryPolicy::default(),
        }
    }

    /// Override the read retry policy. `max_retries` is capped at one.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = RetryPolicy {
            max_retries: retry.max_retries.min(MAX_READ_RETRIES),
            delay: retry.delay,
        };
        self
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    /// One page of users matching `params`.
    pub async fn list(&self, params: &SearchParams) -> Result<Arc<UserList>, ApiError> {
        schema::validate_search(params).map_err(|e| self.report("list", e.into()))?;
        let key = QueryKey::user_list(params);
        self.load(key, &self.lists, async {
            let request = ApiRequest::get("/users").with_query(params.to_query_pairs());
            let body = self.read(request, None).await?;
            Ok::<_, ApiError>(schema::parse_user_list(&body)?)
        })
        .await
        .map_err(|e| self.report("list", e))
    }

    /// A single user. A missing user is [`ApiError::NotFound`].
    pub async fn get(&self, id: &str) -> Result<Arc<User>, ApiError> {
        schema::validate_id(id).map_err(|e| self.report("get", e.into()))?;
        let key = QueryKey::user_detail(id);
        self.load(key, &self.details, async {
            let body = self.read(ApiRequest::get(user_path(id)), Some(id)).await?;
            Ok::<_, ApiError>(schema::parse_user(&body)?)
        })
        .await
        .map_err(|e| self.report("get", e))
    }

    /// Create a user. Every cached list is invalidated on success.
    pub async fn create(&self, data: &CreateUser) -> Result<Arc<User>, ApiError> {
        let result = async {
            schema::validate_create(data)?;
            let body = to_body(data, "new user")?;
            let response = self.write(ApiRequest::post("/users", body), None).await?;
            let user = Arc::new(schema::parse_user(&parse_body(&response, "user")?)?);
            self.cache
                .set(QueryKey::user_detail(user.id.clone()), Arc::clone(&user));
            self.cache.invalidate(&KeyScope::UserLists);
            Ok::<_, ApiError>(user)
        }
        .await;
        result.map_err(|e| self.report("create", e))
    }

    /// Apply `patch` to a user. The returned user replaces the cached
    /// detail entry and every cached list is invalidated.
    pub async fn update(&self, id: &str, patch: &UpdateUser) -> Result<Arc<User>, ApiError> {
        let result = async {
            schema::validate_id(id)?;
            schema::validate_update(patch)?;
            let body = to_body(patch, "user update")?;
            let response = self
                .write(ApiRequest::patch(user_path(id), body), Some(id))
                .await?;
            let user = Arc::new(schema::parse_user(&parse_body(&response, "user")?)?);
            self.cache.set(QueryKey::user_detail(id), Arc::clone(&user));
            self.cache.invalidate(&KeyScope::UserLists);
            Ok::<_, ApiError>(user)
        }
        .await;
        result.map_err(|e| self.report("update", e))
    }

    /// Delete a user, dropping its detail entry and invalidating every list.
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let result = async {
            schema::validate_id(id)?;
            self.write(ApiRequest::delete(user_path(id)), Some(id)).await?;
            self.cache.remove(&KeyScope::UserDetail(id.to_string()));
            self.cache.invalidate(&KeyScope::UserLists);
            Ok::<_, ApiError>(())
        }
        .await;
        result.map_err(|e| self.report("delete", e))
    }

    /// Backend health. Never cached.
    pub async fn health(&self) -> Result<HealthReport, ApiError> {
        let result = async {
            let body = self.read(ApiRequest::get("/health"), None).await?;
            Ok::<_, ApiError>(schema::parse_health(&body)?)
        }
        .await;
        result.map_err(|e| self.report("health", e))
    }

    /// Serve `key` from cache while fresh, otherwise fetch it once for all
    /// concurrent callers and store the result unless it became obsolete.
    async fn load<T, F>(
        &self,
        key: QueryKey,
        inflight: &InFlight<T>,
        fetch: F,
    ) -> Result<Arc<T>, ApiError>
    where
        T: Cacheable,
        F: Future<Output = Result<T, ApiError>>,
    {
        if let Lookup::Fresh(value) = self.cache.lookup::<T>(&key) {
            tracing::trace!(key = %key, "cache hit");
            return Ok(value);
        }

        let generation = self.cache.generation(&key);
        inflight
            .run(&key, generation, async {
                let value = Arc::new(fetch.await?);
                self.cache
                    .store_if_current(&key, generation, Arc::clone(&value));
                Ok::<_, ApiError>(value)
            })
            .await
    }

    /// Send a read and parse its body.
    async fn read(&self, request: ApiRequest, id: Option<&str>) -> Result<Value, ApiError> {
        let response = self.send(request, id).await?;
        parse_body(&response, "response")
    }

    async fn write(&self, request: ApiRequest, id: Option<&str>) -> Result<ApiResponse, ApiError> {
        self.send(request, id).await
    }

    /// Send a request. Reads are retried on network failure, writes go out
    /// exactly once.
    async fn send(&self, request: ApiRequest, id: Option<&str>) -> Result<ApiResponse, ApiError> {
        let retries = if request.is_read() {
            self.retry.max_retries
        } else {
            0
        };
        let mut last_err = None;
        for attempt in 0..=retries {
            match self.exchange(request.clone(), id).await {
                Err(ref e) if e.is_retryable() && attempt < retries => {
                    tracing::warn!(
                        method = %request.method,
                        path = %request.path,
                        attempt = attempt + 1,
                        error = %e,
                        "read failed, retrying"
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    last_err = Some(e.clone());
                }
                result => return result,
            }
        }
        Err(last_err.unwrap_or_else(|| ApiError::Network("retries exhausted".to_string())))
    }

    async fn exchange(
        &self,
        request: ApiRequest,
        id: Option<&str>,
    ) -> Result<ApiResponse, ApiError> {
        let response = self.transport.send(request).await?;
        classify(response, id)
    }

    fn report(&self, operation: &str, err: ApiError) -> ApiError {
        match err {
            ApiError::Network(ref reason) => {
                tracing::warn!(operation, %reason, "network failure");
            }
            ApiError::Validation(ref schema) => {
                let issues: Vec<String> = schema.issues.iter().map(ToString::to_string).collect();
                tracing::error!(operation, subject = schema.subject, ?issues, "validation failure");
            }
            ApiError::NotFound { ref id } => {
                tracing::debug!(operation, %id, "user not found");
            }
            ApiError::Client { status, ref message } => {
                tracing::warn!(operation, status, %message, "request rejected");
            }
        }
        err
    }
}

fn user_path(id: &str) -> String {
    format!("/users/{id}")
}

/// Map a status code onto success or an [`ApiError`].
fn classify(response: ApiResponse, id: Option<&str>) -> Result<ApiResponse, ApiError> {
    if response.is_success() {
        return Ok(response);
    }
    match response.status {
        404 => match id {
            Some(id) => Err(ApiError::NotFound { id: id.to_string() }),
            None => Err(rejected(&response)),
        },
        400..=499 => Err(rejected(&response)),
        status => Err(ApiError::Network(format!("backend returned status {status}"))),
    }
}

fn rejected(response: &ApiResponse) -> ApiError {
    let message = response
        .json_body()
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("status {}", response.status));
    ApiError::Client {
        status: response.status,
        message,
    }
}

fn parse_body(response: &ApiResponse, subject: &'static str) -> Result<Value, ApiError> {
    response
        .json_body()
        .map_err(|e| SchemaError::malformed(subject, format!("body is not JSON: {e}")).into())
}

fn to_body<T: serde::Serialize>(payload: &T, subject: &'static str) -> Result<Value, ApiError> {
    serde_json::to_value(payload).map_err(|e| SchemaError::malformed(subject, e.to_string()).into())
}
