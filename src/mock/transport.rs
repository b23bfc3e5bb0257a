//! In-process transport answering from a [`MockBackend`].

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::{Display, EnumString};

use crate::transport::{ApiRequest, ApiResponse, Transport, TransportError};

use super::MockBackend;

/// What to do with a request no mock route matches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UnhandledPolicy {
    /// Log a warning, then forward to the passthrough transport if any.
    #[default]
    Warn,
    /// Forward silently to the passthrough transport if any.
    Bypass,
    /// Log an error and fail the request.
    Error,
}

/// What to do when a handler misses its deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TimeoutPolicy {
    /// Fail with [`TransportError::Timeout`].
    #[default]
    Fail,
    /// Forward to the passthrough transport.
    Passthrough,
}

/// A scripted failure for the next request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    Unreachable,
    Status(u16),
    Malformed,
}

/// Transport backed by an in-memory [`MockBackend`].
///
/// Counts every request it sees, which lets tests assert how many round
/// trips the client actually made.
pub struct MockTransport {
    backend: Arc<MockBackend>,
    latency: Duration,
    handler_timeout: Option<Duration>,
    unhandled: UnhandledPolicy,
    on_timeout: TimeoutPolicy,
    passthrough: Option<Arc<dyn Transport>>,
    requests: AtomicUsize,
    log: Mutex<Vec<String>>,
    faults: Mutex<VecDeque<Fault>>,
}

impl MockTransport {
    pub fn new(backend: Arc<MockBackend>) -> Self {
        Self {
            backend,
            latency: Duration::ZERO,
            handler_timeout: None,
            unhandled: UnhandledPolicy::default(),
            on_timeout: TimeoutPolicy::default(),
            passthrough: None,
            requests: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
            faults: Mutex::new(VecDeque::new()),
        }
    }

    /// Delay every answer by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Give up on a handler after `timeout`.
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    pub fn with_unhandled(mut self, policy: UnhandledPolicy) -> Self {
        self.unhandled = policy;
        self
    }

    pub fn with_timeout_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.on_timeout = policy;
        self
    }

    /// Transport used for bypassed and timed-out requests.
    pub fn with_passthrough(mut self, transport: Arc<dyn Transport>) -> Self {
        self.passthrough = Some(transport);
        self
    }

    pub fn backend(&self) -> &Arc<MockBackend> {
        &self.backend
    }

    /// Requests received so far, including failed ones.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// `METHOD path` of every request received, in order.
    pub fn requests(&self) -> Vec<String> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Make the next `n` requests fail as if the backend were down.
    pub fn fail_next(&self, n: usize) {
        self.push_faults(Fault::Unreachable, n);
    }

    /// Answer the next `n` requests with `status` and an error body.
    pub fn respond_next_with(&self, status: u16, n: usize) {
        self.push_faults(Fault::Status(status), n);
    }

    /// Answer the next `n` requests with a 200 whose body fails validation.
    pub fn corrupt_next(&self, n: usize) {
        self.push_faults(Fault::Malformed, n);
    }

    fn push_faults(&self, fault: Fault, n: usize) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.extend(std::iter::repeat_n(fault, n));
        }
    }

    fn take_fault(&self) -> Option<Fault> {
        self.faults.lock().ok()?.pop_front()
    }

    async fn answer(&self, request: &ApiRequest) -> Option<ApiResponse> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.backend.handle(request)
    }

    /// `Err(ms)` when the handler missed its deadline.
    async fn answer_within_deadline(&self, request: &ApiRequest) -> Result<Option<ApiResponse>, u64> {
        match self.handler_timeout {
            Some(limit) => tokio::time::timeout(limit, self.answer(request))
                .await
                .map_err(|_| limit.as_millis() as u64),
            None => Ok(self.answer(request).await),
        }
    }

    async fn forward(
        &self,
        request: ApiRequest,
        fallback: TransportError,
    ) -> Result<ApiResponse, TransportError> {
        match self.passthrough {
            Some(ref transport) => transport.send(request).await,
            None => Err(fallback),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let line = format!("{} {}", request.method, request.path);
        tracing::debug!(request = %line, "mock transport");
        if let Ok(mut log) = self.log.lock() {
            log.push(line);
        }

        match self.take_fault() {
            Some(Fault::Unreachable) => {
                return Err(TransportError::Unreachable("injected failure".to_string()));
            }
            Some(Fault::Status(status)) => {
                return Ok(ApiResponse::json(status, &json!({ "message": "injected failure" })));
            }
            Some(Fault::Malformed) => {
                return Ok(ApiResponse::json(200, &json!({ "unexpected": true })));
            }
            None => {}
        }

        let answered = match self.answer_within_deadline(&request).await {
            Ok(answered) => answered,
            Err(ms) => {
                return match self.on_timeout {
                    TimeoutPolicy::Fail => Err(TransportError::Timeout(ms)),
                    TimeoutPolicy::Passthrough => {
                        tracing::warn!(
                            method = %request.method,
                            path = %request.path,
                            timeout_ms = ms,
                            "mock handler timed out, forwarding to passthrough"
                        );
                        self.forward(request, TransportError::Timeout(ms)).await
                    }
                };
            }
        };

        if let Some(response) = answered {
            return Ok(response);
        }

        let unhandled = TransportError::Unhandled {
            method: request.method.to_string(),
            path: request.path.clone(),
        };
        match self.unhandled {
            UnhandledPolicy::Warn => {
                tracing::warn!(method = %request.method, path = %request.path, "unhandled request");
                self.forward(request, unhandled).await
            }
            UnhandledPolicy::Bypass => self.forward(request, unhandled).await,
            UnhandledPolicy::Error => {
                tracing::error!(method = %request.method, path = %request.path, "unhandled request");
                Err(unhandled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> MockTransport {
        MockTransport::new(Arc::new(MockBackend::new()))
    }

    #[tokio::test]
    async fn counts_and_logs_requests() {
        let mock = transport();
        mock.send(ApiRequest::get("/users")).await.unwrap();
        mock.send(ApiRequest::get("/users/1")).await.unwrap();
        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.requests(), ["GET /users", "GET /users/1"]);
    }

    #[tokio::test]
    async fn scripted_faults_apply_in_order_then_clear() {
        let mock = transport();
        mock.fail_next(1);
        mock.respond_next_with(503, 1);

        assert!(matches!(
            mock.send(ApiRequest::get("/users")).await,
            Err(TransportError::Unreachable(_))
        ));
        assert_eq!(mock.send(ApiRequest::get("/users")).await.unwrap().status, 503);
        assert_eq!(mock.send(ApiRequest::get("/users")).await.unwrap().status, 200);
    }

    #[tokio::test]
    async fn unhandled_without_passthrough_fails() {
        let err = transport()
            .send(ApiRequest::get("/settings"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransportError::Unhandled {
                method: "GET".into(),
                path: "/settings".into()
            }
        );
    }

    #[tokio::test]
    async fn bypass_forwards_to_passthrough() {
        let fallback = Arc::new(MockTransport::new(Arc::new(MockBackend::with_users(vec![]))));
        let mock = transport()
            .with_unhandled(UnhandledPolicy::Bypass)
            .with_passthrough(fallback.clone());

        // The fallback has no /settings route either, but it did see the request.
        let _ = mock.send(ApiRequest::get("/settings")).await;
        assert_eq!(fallback.request_count(), 1);
    }

    #[tokio::test]
    async fn error_policy_never_forwards() {
        let fallback = Arc::new(transport());
        let mock = transport()
            .with_unhandled(UnhandledPolicy::Error)
            .with_passthrough(fallback.clone());
        assert!(mock.send(ApiRequest::get("/settings")).await.is_err());
        assert_eq!(fallback.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_times_out_by_default() {
        let fallback = Arc::new(transport());
        let mock = transport()
            .with_latency(Duration::from_secs(5))
            .with_handler_timeout(Duration::from_secs(1))
            .with_passthrough(fallback.clone());

        let err = mock.send(ApiRequest::get("/users")).await.unwrap_err();
        assert_eq!(err, TransportError::Timeout(1000));
        assert_eq!(fallback.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn passthrough_on_timeout_only_when_asked() {
        let fallback = Arc::new(transport());
        let mock = transport()
            .with_latency(Duration::from_secs(5))
            .with_handler_timeout(Duration::from_secs(1))
            .with_timeout_policy(TimeoutPolicy::Passthrough)
            .with_passthrough(fallback.clone());

        let resp = mock.send(ApiRequest::get("/users")).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(fallback.request_count(), 1);
    }

    #[test]
    fn policies_parse_lowercase() {
        assert_eq!("bypass".parse::<UnhandledPolicy>().unwrap(), UnhandledPolicy::Bypass);
        assert_eq!("passthrough".parse::<TimeoutPolicy>().unwrap(), TimeoutPolicy::Passthrough);
    }
}
