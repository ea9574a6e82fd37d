//! Connection configuration and response normalization.
//!
//! # Design
//! `HttpAdapter` pairs an `AdapterConfig` (host, namespace, default headers)
//! with a `Transport`. Every verb helper funnels into [`HttpAdapter::request`],
//! which turns whatever the transport returned into a `ResponsePayload`:
//! 2xx resolves, anything else rejects with the same payload wrapped in
//! `ApiError::Transport`. A body that is empty or not JSON yields `data: None`
//! instead of an error, so `204 No Content` needs no special casing.
//!
//! The adapter is constructed once and handed to a `Store`; it holds no
//! mutable state, so it can be shared freely across concurrent operations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::transport::Transport;

pub const CONTENT_TYPE: &str = "content-type";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Where and how requests are sent.
///
/// Header names are stored lower-cased. `content-type: application/json` is
/// always present unless explicitly overridden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    #[serde(alias = "baseURL", alias = "base_url")]
    pub host: String,
    pub namespace: String,
    #[serde(deserialize_with = "deserialize_headers")]
    pub headers: BTreeMap<String, String>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(CONTENT_TYPE.to_string(), JSON_CONTENT_TYPE.to_string());
        Self {
            host: String::new(),
            namespace: String::new(),
            headers,
        }
    }
}

impl AdapterConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Add or replace a default header.
    pub fn header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Read `JSONAPI_HOST` and `JSONAPI_NAMESPACE`, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("JSONAPI_HOST") {
            config.host = host;
        }
        if let Ok(namespace) = std::env::var("JSONAPI_NAMESPACE") {
            config.namespace = namespace;
        }
        config
    }

    /// Absolute endpoint for a resource URL.
    pub fn endpoint(&self, url: &str) -> String {
        format!("{}{}{}", self.host, self.namespace, url)
    }
}

/// User-supplied headers extend the defaults rather than replacing them.
fn deserialize_headers<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let supplied = BTreeMap::<String, String>::deserialize(deserializer)?;
    let mut headers = AdapterConfig::default().headers;
    for (key, value) in supplied {
        headers.insert(key.to_ascii_lowercase(), value);
    }
    Ok(headers)
}

/// A normalized HTTP response.
///
/// Identical in shape for resolved and rejected requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponsePayload {
    pub status: u16,
    pub status_text: String,
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ResponsePayload {
    /// Normalize a raw response. Header names are lower-cased; a body that is
    /// not valid JSON becomes `data: None`.
    pub fn from_http(response: HttpResponse) -> Self {
        let headers = response
            .headers
            .into_iter()
            .map(|(key, value)| (key.to_ascii_lowercase(), value))
            .collect();
        let data = serde_json::from_str::<Value>(&response.body).ok();
        Self {
            status: response.status,
            status_text: response.status_text,
            headers,
            data,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Configuration plus the transport that executes requests.
#[derive(Debug, Clone)]
pub struct HttpAdapter<T> {
    config: AdapterConfig,
    transport: T,
}

impl<T: Transport> HttpAdapter<T> {
    pub fn new(config: AdapterConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Build the plain-data request for `method` on `url`.
    pub fn build_request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&Value>,
    ) -> HttpRequest {
        HttpRequest {
            method,
            path: self.config.endpoint(url),
            headers: self
                .config
                .headers
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            body: body.filter(|_| method.has_body()).map(Value::to_string),
        }
    }

    /// Send one request and normalize the reply.
    pub async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&Value>,
    ) -> Result<ResponsePayload, ApiError> {
        let request = self.build_request(method, url, body);
        tracing::debug!(%method, path = %request.path, "sending request");

        let response = self.transport.send(request).await.map_err(|err| {
            tracing::warn!(%method, url, error = %err, "transport failure");
            err
        })?;
        let payload = ResponsePayload::from_http(response);

        if payload.is_success() {
            tracing::debug!(%method, url, status = payload.status, "request succeeded");
            Ok(payload)
        } else {
            tracing::warn!(%method, url, status = payload.status, "request rejected");
            Err(ApiError::Transport(payload))
        }
    }

    pub async fn get(&self, url: &str) -> Result<ResponsePayload, ApiError> {
        self.request(HttpMethod::Get, url, None).await
    }

    pub async fn post(&self, url: &str, data: &Value) -> Result<ResponsePayload, ApiError> {
        self.request(HttpMethod::Post, url, Some(data)).await
    }

    pub async fn put(&self, url: &str, data: &Value) -> Result<ResponsePayload, ApiError> {
        self.request(HttpMethod::Put, url, Some(data)).await
    }

    pub async fn patch(&self, url: &str, data: &Value) -> Result<ResponsePayload, ApiError> {
        self.request(HttpMethod::Patch, url, Some(data)).await
    }

    pub async fn delete(&self, url: &str) -> Result<ResponsePayload, ApiError> {
        self.request(HttpMethod::Delete, url, None).await
    }
}
