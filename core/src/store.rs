//! Persistence lifecycle for `Model` types.
//!
//! # Design
//! `Store` owns the `HttpAdapter` a group of model types talks to and is
//! passed explicitly to whoever needs to fetch or save models. Each
//! operation runs strictly in sequence (validate, build URL, serialize,
//! send, decode) and suspends only while the transport call is in flight.
//!
//! State per instance:
//!
//! ```text
//! new ──save──▶ creating ──ok──▶ persisted (returned copy)
//!                        └─err─▶ new        (errors set on 422)
//! persisted ──save──▶ updating ──ok──▶ persisted (returned copy)
//!                              └─err─▶ persisted (errors set on 422)
//! persisted ──destroy──▶ destroyed
//! ```
//!
//! A successful save never mutates the instance passed in; the server's copy
//! is returned instead. Stale responses to superseded calls are not
//! detected; callers racing operations decide which result to keep.

use serde_json::{Map, Value};

use crate::adapter::{HttpAdapter, ResponsePayload};
use crate::codec::{self, Collection};
use crate::error::ApiError;
use crate::error_set::ErrorSet;
use crate::model::Model;
use crate::routing::{construct_url, to_query_string, RouteArgs};
use crate::transport::Transport;

/// Entry point for fetching, saving and destroying models.
#[derive(Debug, Clone)]
pub struct Store<T> {
    adapter: HttpAdapter<T>,
}

/// URL of the collection of `M`, with placeholders filled from `args`.
pub fn collection_url<M: Model>(args: &RouteArgs) -> Result<String, ApiError> {
    construct_url(M::schema().url(), args)
}

/// URL of one member of the collection of `M`.
pub fn member_url<M: Model>(id: &str, args: &RouteArgs) -> Result<String, ApiError> {
    Ok(format!("{}/{id}", collection_url::<M>(args)?))
}

fn with_query(mut url: String, query: &Map<String, Value>) -> String {
    let query = to_query_string(query);
    if !query.is_empty() {
        url.push('?');
        url.push_str(&query);
    }
    url
}

impl<T: Transport> Store<T> {
    pub fn new(adapter: HttpAdapter<T>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &HttpAdapter<T> {
        &self.adapter
    }

    /// Fetch one resource by id.
    #[tracing::instrument(skip_all, fields(resource = M::schema().resource_type(), id = id))]
    pub async fn fetch<M: Model>(
        &self,
        id: &str,
        args: &RouteArgs,
        query: Option<&Map<String, Value>>,
    ) -> Result<M, ApiError> {
        let mut url = member_url::<M>(id, args)?;
        if let Some(query) = query {
            url = with_query(url, query);
        }
        let payload = self.adapter.get(&url).await?;
        let document = payload.data.unwrap_or(Value::Null);
        codec::deserialize_one(&document)?.ok_or_else(|| {
            ApiError::Deserialization("response contained no primary data".to_string())
        })
    }

    /// Fetch the whole collection.
    #[tracing::instrument(skip_all, fields(resource = M::schema().resource_type()))]
    pub async fn fetch_all<M: Model>(&self, args: &RouteArgs) -> Result<Collection<M>, ApiError> {
        let url = collection_url::<M>(args)?;
        self.get_collection(&url).await
    }

    /// Fetch the collection filtered by `query` (filters, paging, sorting).
    #[tracing::instrument(skip_all, fields(resource = M::schema().resource_type()))]
    pub async fn query<M: Model>(
        &self,
        query: &Map<String, Value>,
        args: &RouteArgs,
    ) -> Result<Collection<M>, ApiError> {
        let url = with_query(collection_url::<M>(args)?, query);
        self.get_collection(&url).await
    }

    async fn get_collection<M: Model>(&self, url: &str) -> Result<Collection<M>, ApiError> {
        let payload = self.adapter.get(url).await?;
        codec::deserialize_many(&payload.data.unwrap_or(Value::Null))
    }

    /// Validate, then create or update `model` depending on whether it is
    /// persisted. Returns the server's copy.
    ///
    /// Fails with `ApiError::Validation` without sending anything when
    /// [`Model::validate`] reports errors. When the server rejects the write
    /// with 422, `model`'s errors are replaced by the returned error
    /// document and the rejection is passed on unchanged.
    #[tracing::instrument(skip_all, fields(resource = M::schema().resource_type(), persisted = model.is_persisted()))]
    pub async fn save<M: Model>(&self, model: &mut M) -> Result<M, ApiError> {
        if !model.is_valid() {
            tracing::debug!(errors = model.errors().count(), "local validation failed");
            return Err(ApiError::Validation);
        }

        let result = if model.is_persisted() {
            self.update(model).await
        } else {
            self.create(model).await
        };

        result.map_err(|err| {
            if let ApiError::Transport(payload) = &err {
                if payload.status == 422 {
                    let errors = ErrorSet::from_document(payload.data.as_ref());
                    tracing::debug!(errors = errors.count(), "server rejected model");
                    model.base_mut().set_errors(errors);
                }
            }
            err
        })
    }

    async fn create<M: Model>(&self, model: &M) -> Result<M, ApiError> {
        let url = collection_url::<M>(&model.route_args())?;
        let document = codec::serialize(model)?;
        let payload = self.adapter.post(&url, &document).await?;
        saved_copy(model, payload)
    }

    async fn update<M: Model>(&self, model: &M) -> Result<M, ApiError> {
        let url = member_url::<M>(model.id(), &model.route_args())?;
        let document = codec::serialize(model)?;
        let payload = self.adapter.patch(&url, &document).await?;
        saved_copy(model, payload)
    }

    /// Delete the resource behind `model`.
    #[tracing::instrument(skip_all, fields(resource = M::schema().resource_type(), id = model.id()))]
    pub async fn destroy<M: Model>(&self, model: &M) -> Result<ResponsePayload, ApiError> {
        let url = member_url::<M>(model.id(), &model.route_args())?;
        self.adapter.delete(&url).await
    }

    /// Delete a resource by id without loading it first.
    #[tracing::instrument(skip_all, fields(resource = M::schema().resource_type(), id = id))]
    pub async fn destroy_by_id<M: Model>(
        &self,
        id: &str,
        args: &RouteArgs,
    ) -> Result<ResponsePayload, ApiError> {
        let url = member_url::<M>(id, args)?;
        self.adapter.delete(&url).await
    }
}

/// The instance a successful write resolves to: the server's copy, or the
/// submitted instance marked persisted when the reply carried no data.
fn saved_copy<M: Model>(model: &M, payload: ResponsePayload) -> Result<M, ApiError> {
    let saved = match payload.data {
        Some(document) => codec::deserialize_one::<M>(&document)?,
        None => None,
    };
    Ok(saved.unwrap_or_else(|| {
        let mut copy = model.clone();
        copy.base_mut().set_persisted(true);
        copy
    }))
}
