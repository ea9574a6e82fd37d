//! Typed models over a JSON:API backend.
//!
//! # Overview
//! Model types declare which fields are attributes and which are
//! relationships. From that declaration the crate derives the JSON:API
//! document for a write, decodes response documents back into typed
//! instances (keeping collection `links`/`meta`), collects per-field
//! validation errors, and drives the create/fetch/update/destroy lifecycle
//! over a pluggable `Transport`.
//!
//! # Design
//! - `http` describes requests/responses as plain data; `transport` is the
//!   only place that performs I/O.
//! - `HttpAdapter` holds connection configuration and normalizes every reply
//!   into a `ResponsePayload`, rejecting non-2xx statuses with the same shape.
//! - `schema` replaces runtime field inspection with an explicit per-type
//!   declaration; `codec` turns that declaration into wire documents.
//! - `Store` is passed explicitly instead of living in global state.

pub mod adapter;
pub mod codec;
pub mod error;
pub mod error_set;
pub mod http;
pub mod inflect;
pub mod mock;
pub mod model;
pub mod routing;
pub mod schema;
pub mod store;
pub mod transport;

#[cfg(test)]
mod testing;

pub use adapter::{AdapterConfig, HttpAdapter, ResponsePayload};
pub use codec::{deserialize, deserialize_many, deserialize_one, serialize, Collection, Deserialized};
pub use error::ApiError;
pub use error_set::{AboutLink, ErrorLinks, ErrorObject, ErrorSet, ErrorSource};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use inflect::KeyCase;
pub use mock::MockTransport;
pub use model::{fields_match_schema, Model, ModelBase};
pub use routing::{construct_url, to_query_string, RouteArgs};
pub use schema::{Cardinality, FieldKind, Relationship, Schema, SchemaBuilder, SerializerOptions};
pub use store::Store;
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
