//! The `Model` trait and the bookkeeping every model instance carries.
//!
//! # Design
//! A model is an ordinary struct that derives serde's `Serialize` and
//! `Deserialize` with camelCase field names and flattens a [`ModelBase`]
//! into itself. Field values travel through serde; which fields are
//! attributes and which are relationships comes from [`Model::schema`].
//!
//! `ModelBase` holds the identifier plus state that never goes on the wire
//! as an attribute: the persisted flag, the instance's `ErrorSet`, and the
//! pass-through `links`/`meta` maps.
//!
//! ```ignore
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! #[serde(rename_all = "camelCase")]
//! pub struct Person {
//!     #[serde(flatten)]
//!     pub base: ModelBase,
//!     #[serde(default)]
//!     pub first_name: String,
//!     #[serde(default)]
//!     pub addresses: Vec<Address>,
//!     #[serde(default)]
//!     pub drivers_license: Option<DriversLicense>,
//! }
//! ```

use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::ApiError;
use crate::error_set::ErrorSet;
use crate::routing::RouteArgs;
use crate::schema::{Schema, ID_FIELD};

/// Identifier and lifecycle state shared by all models.
///
/// Serializes to `{"id": ...}` for persisted instances and to nothing for
/// new ones, so a placeholder id never reaches a wire document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "BaseFields")]
pub struct ModelBase {
    id: String,
    persisted: bool,
    errors: ErrorSet,
    links: Map<String, Value>,
    meta: Map<String, Value>,
}

impl Serialize for ModelBase {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if self.persisted {
            map.serialize_entry(ID_FIELD, &self.id)?;
        }
        map.end()
    }
}

impl Default for ModelBase {
    /// A new, unpersisted instance with a freshly generated placeholder id.
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            persisted: false,
            errors: ErrorSet::new(),
            links: Map::new(),
            meta: Map::new(),
        }
    }
}

impl ModelBase {
    pub fn new() -> Self {
        Self::default()
    }

    /// State for a resource the backend already knows. An empty id is
    /// treated as absent.
    pub fn with_id(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.is_empty() {
            return Self::default();
        }
        Self {
            id,
            persisted: true,
            ..Self::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn persisted(&self) -> bool {
        self.persisted
    }

    pub fn set_persisted(&mut self, persisted: bool) {
        self.persisted = persisted;
    }

    pub fn errors(&self) -> &ErrorSet {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ErrorSet {
        &mut self.errors
    }

    /// Replace the error set wholesale.
    pub fn set_errors(&mut self, errors: ErrorSet) {
        self.errors = errors;
    }

    pub fn links(&self) -> &Map<String, Value> {
        &self.links
    }

    pub fn meta(&self) -> &Map<String, Value> {
        &self.meta
    }
}

#[derive(Deserialize)]
struct BaseFields {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    links: Value,
    #[serde(default)]
    meta: Value,
}

impl From<BaseFields> for ModelBase {
    fn from(fields: BaseFields) -> Self {
        let mut base = match truthy_id(&fields.id) {
            Some(id) => ModelBase::with_id(id),
            None => ModelBase::default(),
        };
        base.links = into_object(fields.links);
        base.meta = into_object(fields.meta);
        base
    }
}

/// Only a present, non-empty, non-zero id marks a resource as persisted.
fn truthy_id(id: &Value) -> Option<String> {
    match id {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// A typed record mapped to a JSON:API resource.
pub trait Model: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Declared shape of this type. Build it once, e.g. in a `OnceLock`.
    ///
    /// Declared names must match the struct's serde field names exactly.
    /// A declared name with no such field, or a serialized field that is
    /// not declared, is silently left out of wire documents; see
    /// [`fields_match_schema`] for a check to run from model tests.
    fn schema() -> &'static Schema;

    fn base(&self) -> &ModelBase;

    fn base_mut(&mut self) -> &mut ModelBase;

    /// Validation hook. Push one `ErrorObject` per problem found.
    fn validate(&self, _errors: &mut ErrorSet) {}

    /// Values for the placeholders of this type's URL template when acting
    /// on this instance.
    fn route_args(&self) -> RouteArgs {
        RouteArgs::new()
    }

    fn id(&self) -> &str {
        self.base().id()
    }

    fn is_persisted(&self) -> bool {
        self.base().persisted()
    }

    fn errors(&self) -> &ErrorSet {
        self.base().errors()
    }

    fn links(&self) -> &Map<String, Value> {
        self.base().links()
    }

    fn meta(&self) -> &Map<String, Value> {
        self.base().meta()
    }

    /// Clear errors, run [`Model::validate`], and report whether it found
    /// nothing.
    fn is_valid(&mut self) -> bool {
        let mut errors = ErrorSet::new();
        self.validate(&mut errors);
        let valid = errors.count() == 0;
        self.base_mut().set_errors(errors);
        valid
    }

    fn is_attribute(&self, field: &str) -> bool {
        Self::schema().is_attribute(field)
    }

    fn is_relationship(&self, field: &str) -> bool {
        Self::schema().is_relationship(field)
    }

    /// The attribute fields of this instance, keyed by model field name.
    fn attributes(&self) -> Result<Map<String, Value>, ApiError> {
        let fields = to_object(self)?;
        Ok(Self::schema()
            .attribute_field_names()
            .iter()
            .filter_map(|name| fields.get(*name).map(|v| (name.to_string(), v.clone())))
            .collect())
    }
}

/// Check that `model` serializes to exactly its declared fields plus `id`.
///
/// Fields serde skips for this particular value (e.g. a `None` behind
/// `skip_serializing_if`) count as missing, so pass a persisted instance with
/// every optional field set.
pub fn fields_match_schema<M: Model>(model: &M) -> Result<(), ApiError> {
    let fields = to_object(model)?;
    let schema = M::schema();

    let mut declared: Vec<&str> = schema.attribute_field_names().to_vec();
    declared.extend(schema.relationship_field_names());
    if model.is_persisted() {
        declared.push(ID_FIELD);
    }

    let missing: Vec<&str> = declared
        .iter()
        .copied()
        .filter(|name| !fields.contains_key(*name))
        .collect();
    let undeclared: Vec<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|name| !declared.contains(name))
        .collect();
    if missing.is_empty() && undeclared.is_empty() {
        return Ok(());
    }
    Err(ApiError::Configuration(format!(
        "fields of `{}` do not match its schema: declared but not serialized [{}], serialized but not declared [{}]",
        schema.resource_type(),
        missing.join(", "),
        undeclared.join(", ")
    )))
}

/// Serialize a model into its field map.
pub(crate) fn to_object<M: Serialize>(model: &M) -> Result<Map<String, Value>, ApiError> {
    match serde_json::to_value(model) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::Serialization(
            "model did not serialize to a JSON object".to_string(),
        )),
        Err(e) => Err(ApiError::Serialization(e.to_string())),
    }
}
