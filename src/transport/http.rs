//! HTTP transport built on reqwest.

use std::time::Duration;

use async_trait::async_trait;

use crate::constants::USER_AGENT;

use super::{ApiRequest, ApiResponse, Transport, TransportError};

/// Sends requests to a real backend at `base_url`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TransportError::Unreachable(format!("failed to build client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header("Accept", "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout.as_millis() as u64)
            } else {
                TransportError::Unreachable(format!("{} {url}: {e}", request.method))
            }
        })?;

        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| TransportError::Unreachable(format!("failed to read response: {e}")))?;
        tracing::debug!(method = %request.method, %url, status, "backend responded");
        Ok(ApiResponse::new(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_and_path_with_single_slash() {
        let transport =
            HttpTransport::new("http://localhost:8080/api/", Duration::from_secs(1)).unwrap();
        assert_eq!(transport.base_url(), "http://localhost:8080/api");
        assert_eq!(transport.url_for("/users/3"), "http://localhost:8080/api/users/3");
    }

    #[tokio::test]
    async fn unreachable_host_maps_to_transport_error() {
        // Port 9 (discard) is closed on test machines.
        let transport = HttpTransport::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = transport.send(ApiRequest::get("/health")).await.unwrap_err();
        assert!(matches!(
            err,
            TransportError::Unreachable(_) | TransportError::Timeout(_)
        ));
    }
}
