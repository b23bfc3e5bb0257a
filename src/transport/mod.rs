//! Transport abstraction between the client and a backend.
//!
//! The client speaks [`ApiRequest`]/[`ApiResponse`] pairs; whether they go
//! over HTTP or are answered in-process by the mock backend is decided by
//! the [`Transport`] implementation handed to it.

pub mod http;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use thiserror::Error;

/// Failures below the HTTP status level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("no handler for {method} {path}")]
    Unhandled { method: String, path: String },
}

/// A request relative to the API base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path starting with `/`, e.g. `/users/3`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::get(path)
        }
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::PATCH,
            body: Some(body),
            ..Self::get(path)
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            ..Self::get(path)
        }
    }

    /// Attach query parameters.
    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    /// Reads may be retried; writes never are.
    pub fn is_read(&self) -> bool {
        self.method == Method::GET
    }
}

/// Raw response: status plus body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A response with a JSON body.
    pub fn json(status: u16, value: &Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON. An empty body parses as `null`.
    pub fn json_body(&self) -> Result<Value, serde_json::Error> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body)
    }
}

/// Sends requests to a backend.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_get_is_a_read() {
        assert!(ApiRequest::get("/users").is_read());
        assert!(!ApiRequest::post("/users", json!({})).is_read());
        assert!(!ApiRequest::patch("/users/1", json!({})).is_read());
        assert!(!ApiRequest::delete("/users/1").is_read());
    }

    #[test]
    fn empty_body_parses_as_null() {
        let response = ApiResponse::new(204, "");
        assert_eq!(response.json_body().unwrap(), Value::Null);
        assert!(response.is_success());
    }

    #[test]
    fn non_json_body_is_an_error() {
        assert!(ApiResponse::new(200, "<html>").json_body().is_err());
    }
}
