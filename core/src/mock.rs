//! Scripted in-memory `Transport` for tests.
//!
//! Queue responses with [`MockTransport::respond`] or
//! [`MockTransport::respond_json`], run lifecycle operations against a store
//! built on the mock, then inspect what was sent with
//! [`MockTransport::requests`].
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.respond_json(200, json!({"data": {"type": "people", "id": "1"}}));
//! let store = Store::new(HttpAdapter::new(AdapterConfig::default(), transport.clone()));
//! let person: Person = store.fetch("1", &RouteArgs::new(), None).await?;
//! assert_eq!(transport.requests()[0].path, "/people/1");
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::transport::Transport;

#[derive(Debug, Default)]
struct MockState {
    responses: VecDeque<Result<HttpResponse, String>>,
    requests: Vec<HttpRequest>,
}

/// A `Transport` that replays queued responses in FIFO order.
///
/// Clones share the same queue and request log. Sending with an empty queue
/// yields `ApiError::Network`.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a response with a raw body.
    pub fn respond(&self, status: u16, body: impl Into<String>) -> &Self {
        self.push(HttpResponse::new(status, body))
    }

    /// Queue a response whose body is `body` encoded as JSON.
    pub fn respond_json(&self, status: u16, body: Value) -> &Self {
        self.push(
            HttpResponse::new(status, body.to_string())
                .with_header("content-type", "application/vnd.api+json"),
        )
    }

    pub fn push(&self, response: HttpResponse) -> &Self {
        self.state().responses.push_back(Ok(response));
        self
    }

    /// Queue a connection-level failure.
    pub fn fail(&self, message: impl Into<String>) -> &Self {
        self.state().responses.push_back(Err(message.into()));
        self
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.state().requests.len()
    }

    /// Number of queued responses not yet consumed.
    pub fn pending(&self) -> usize {
        self.state().responses.len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut state = self.state();
        state.requests.push(request);
        match state.responses.pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(ApiError::Network(message)),
            None => Err(ApiError::Network("no response queued".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;

    fn get(path: &str) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            path: path.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    #[tokio::test]
    async fn replays_responses_in_order_and_logs_requests() {
        let transport = MockTransport::new();
        transport.respond(200, "first").respond(404, "second");

        let first = transport.send(get("/a")).await.unwrap();
        let second = transport.send(get("/b")).await.unwrap();

        assert_eq!(first.body, "first");
        assert_eq!(second.status, 404);
        let paths: Vec<_> = transport.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/a", "/b"]);
        assert_eq!(transport.pending(), 0);
    }

    #[tokio::test]
    async fn empty_queue_is_a_network_failure() {
        let transport = MockTransport::new();
        let err = transport.send(get("/a")).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn queued_failure_is_returned() {
        let transport = MockTransport::new();
        transport.fail("connection refused");
        let err = transport.send(get("/a")).await.unwrap_err();
        assert_eq!(err.to_string(), "transport failure: connection refused");
    }
}
