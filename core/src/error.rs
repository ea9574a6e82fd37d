//! Error types for the JSON:API model layer.
//!
//! # Design
//! Server and network failures keep the normalized `ResponsePayload` intact
//! so callers can inspect status, headers and the error document exactly as
//! the backend sent them. Local failures (validation, missing configuration,
//! unroutable URLs) never reach the network and carry only a message, which
//! lets callers tell the two apart by variant.

use thiserror::Error;

use crate::adapter::ResponsePayload;

/// Errors returned by adapter, codec and lifecycle operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status. The payload is unchanged.
    #[error("HTTP {} {}", .0.status, .0.status_text)]
    Transport(ResponsePayload),

    /// The request never produced an HTTP status (connection refused, DNS...).
    #[error("transport failure: {0}")]
    Network(String),

    /// Local validation failed before any request was sent.
    #[error("Unprocessable Entity")]
    Validation,

    /// Required static configuration is missing, e.g. the resource type.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A URL template placeholder had no matching route argument.
    #[error("missing url params: {}", .0.join(", "))]
    Routing(Vec<String>),

    /// A model could not be turned into a wire document.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A wire document did not have the expected JSON:API shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// The normalized server response, if this error came from one.
    pub fn response(&self) -> Option<&ResponsePayload> {
        match self {
            ApiError::Transport(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.response().map(|payload| payload.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True for a server-side validation rejection (HTTP 422).
    pub fn is_unprocessable(&self) -> bool {
        self.status() == Some(422)
    }
}
