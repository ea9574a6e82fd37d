//! The I/O seam between the model layer and the network.
//!
//! # Design
//! `Transport` executes exactly one `HttpRequest` per call and hands back the
//! raw `HttpResponse` whatever its status; interpreting the status is the
//! adapter's job. The default implementation drives a blocking `ureq` agent
//! on tokio's blocking pool so callers stay asynchronous.

use async_trait::async_trait;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes HTTP requests on behalf of an `HttpAdapter`.
///
/// Implementations must return non-2xx responses as `Ok`; only failures that
/// produce no HTTP status at all map to `ApiError::Network`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        (**self).send(request).await
    }
}

#[cfg(feature = "ureq")]
pub use self::ureq_transport::UreqTransport;

#[cfg(feature = "ureq")]
mod ureq_transport {
    use async_trait::async_trait;

    use crate::error::ApiError;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};

    use super::Transport;

    /// `Transport` backed by a `ureq` agent.
    ///
    /// Status-as-error is disabled so 4xx/5xx responses come back as data.
    #[derive(Debug, Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        pub fn new() -> Self {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .new_agent();
            Self { agent }
        }

        pub fn with_agent(agent: ureq::Agent) -> Self {
            Self { agent }
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Transport for UreqTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            let agent = self.agent.clone();
            tokio::task::spawn_blocking(move || execute(&agent, request))
                .await
                .map_err(|e| ApiError::Network(e.to_string()))?
        }
    }

    fn execute(agent: &ureq::Agent, req: HttpRequest) -> Result<HttpResponse, ApiError> {
        let body = req.body.unwrap_or_default();
        let result = match req.method {
            HttpMethod::Get => {
                let mut builder = agent.get(&req.path);
                for (key, value) in &req.headers {
                    builder = builder.header(key.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Delete => {
                let mut builder = agent.delete(&req.path);
                for (key, value) in &req.headers {
                    builder = builder.header(key.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch => {
                let mut builder = match req.method {
                    HttpMethod::Post => agent.post(&req.path),
                    HttpMethod::Put => agent.put(&req.path),
                    _ => agent.patch(&req.path),
                };
                for (key, value) in &req.headers {
                    builder = builder.header(key.as_str(), value.as_str());
                }
                builder.send(body.as_bytes())
            }
        };

        let mut response = result.map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
        })
    }
}
