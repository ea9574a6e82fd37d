//! JSON:API document encoding and decoding for `Model` types.
//!
//! # Design
//! Serialization reads the model's field map through serde and arranges it
//! according to the type's `SerializerOptions`:
//!
//! ```text
//! {"data": {"type", "id"?, "attributes": {...}, "relationships": {...}},
//!  "included": [...]?}
//! ```
//!
//! Attribute keys are dash-cased. Each relationship becomes a `{type, id}`
//! linkage (or an array of them), and every related instance that has any of
//! the related type's attributes set is emitted once in `included` with that
//! attribute subset.
//!
//! Deserialization flattens each resource object into a record keyed by
//! model field names (`id`, converted attribute keys, relationships resolved
//! against `included`, resource `links`/`meta`) and hands the record to the
//! model's serde `Deserialize`. Related records are built before the owning
//! record, so the owning type receives fully formed related values.
//!
//! A document whose primary data is absent or `null` decodes to
//! [`Deserialized::Empty`]. Any other deviation from the JSON:API shape is an
//! `ApiError::Deserialization`.

use std::ops::Deref;

use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::inflect::{self, KeyCase};
use crate::model::{to_object, Model};
use crate::schema::{Cardinality, Schema};

/// Encode a model as a JSON:API resource document.
pub fn serialize<M: Model>(model: &M) -> Result<Value, ApiError> {
    let schema = M::schema();
    if schema.resource_type().is_empty() {
        return Err(ApiError::Configuration(
            "resource object missing jsonapi type; set `resource_type` on the model schema"
                .to_string(),
        ));
    }

    let options = schema.serializer_options();
    let fields = to_object(model)?;

    let mut attributes = Map::new();
    for name in schema.attribute_field_names() {
        if let Some(value) = fields.get(*name) {
            attributes.insert(inflect::dasherize(name), KeyCase::Dash.apply_deep(value));
        }
    }

    let mut included = Included::default();
    let mut relationships = Map::new();
    for relationship in schema.relationships() {
        let name = relationship.name();
        let related = relationship.related();
        let related_type = match related.resource_type() {
            "" => inflect::dasherize(name),
            declared => declared.to_string(),
        };
        let embedded: &[&str] = options
            .relationship(name)
            .map(|o| o.attributes.as_slice())
            .unwrap_or_default();

        let value = fields.get(name).unwrap_or(&Value::Null);
        let linkage = match (relationship.cardinality(), value) {
            (Cardinality::ToOne, Value::Null) => Value::Null,
            (Cardinality::ToMany, Value::Null) => Value::Array(Vec::new()),
            (Cardinality::ToOne, Value::Object(object)) => {
                included.push(&related_type, object, embedded)?
            }
            (Cardinality::ToMany, Value::Array(items)) => {
                let mut linkages = Vec::with_capacity(items.len());
                for item in items {
                    let object = item.as_object().ok_or_else(|| {
                        ApiError::Serialization(format!(
                            "to-many relationship `{name}` contains a non-object value"
                        ))
                    })?;
                    linkages.push(included.push(&related_type, object, embedded)?);
                }
                Value::Array(linkages)
            }
            (cardinality, _) => {
                return Err(ApiError::Serialization(format!(
                    "relationship `{name}` does not serialize as {}",
                    match cardinality {
                        Cardinality::ToOne => "an object",
                        Cardinality::ToMany => "an array",
                    }
                )))
            }
        };
        relationships.insert(inflect::dasherize(name), json!({ "data": linkage }));
    }

    let mut resource = Map::new();
    resource.insert("type".to_string(), Value::from(schema.resource_type()));
    if model.is_persisted() {
        resource.insert("id".to_string(), Value::from(model.id()));
    }
    resource.insert("attributes".to_string(), Value::Object(attributes));
    if !relationships.is_empty() {
        resource.insert("relationships".to_string(), Value::Object(relationships));
    }

    let mut document = Map::new();
    document.insert("data".to_string(), Value::Object(resource));
    if !included.resources.is_empty() {
        document.insert("included".to_string(), Value::Array(included.resources));
    }
    Ok(Value::Object(document))
}

#[derive(Default)]
struct Included {
    resources: Vec<Value>,
}

impl Included {
    /// Record `object` as a related resource and return its linkage.
    fn push(
        &mut self,
        resource_type: &str,
        object: &Map<String, Value>,
        embedded: &[&str],
    ) -> Result<Value, ApiError> {
        // New instances serialize without an id; the backend cannot resolve them.
        let id = object.get("id").and_then(id_string).ok_or_else(|| {
            ApiError::Serialization(format!(
                "related `{resource_type}` resource is not persisted; save it before linking it"
            ))
        })?;

        let attributes: Map<String, Value> = embedded
            .iter()
            .filter_map(|name| {
                object
                    .get(*name)
                    .map(|v| (inflect::dasherize(name), KeyCase::Dash.apply_deep(v)))
            })
            .collect();

        let seen = self
            .resources
            .iter()
            .any(|r| r["type"] == resource_type && r["id"] == id.as_str());
        if !attributes.is_empty() && !seen {
            self.resources.push(json!({
                "type": resource_type,
                "id": id,
                "attributes": attributes,
            }));
        }
        Ok(json!({ "type": resource_type, "id": id }))
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// An ordered sequence of models plus the document's `links` and `meta`.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection<M> {
    items: Vec<M>,
    links: Option<Map<String, Value>>,
    meta: Option<Map<String, Value>>,
}

impl<M> Default for Collection<M> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            links: None,
            meta: None,
        }
    }
}

impl<M> Collection<M> {
    pub fn new(items: Vec<M>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn links(&self) -> Option<&Map<String, Value>> {
        self.links.as_ref()
    }

    pub fn meta(&self) -> Option<&Map<String, Value>> {
        self.meta.as_ref()
    }

    pub fn into_vec(self) -> Vec<M> {
        self.items
    }
}

impl<M> Deref for Collection<M> {
    type Target = [M];

    fn deref(&self) -> &[M] {
        &self.items
    }
}

impl<M> IntoIterator for Collection<M> {
    type Item = M;
    type IntoIter = std::vec::IntoIter<M>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, M> IntoIterator for &'a Collection<M> {
    type Item = &'a M;
    type IntoIter = std::slice::Iter<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<M> FromIterator<M> for Collection<M> {
    fn from_iter<I: IntoIterator<Item = M>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Result of decoding a document's primary data.
#[derive(Debug, Clone, PartialEq)]
pub enum Deserialized<M> {
    /// `data` was absent or `null`.
    Empty,
    One(M),
    Many(Collection<M>),
}

/// Decode a JSON:API document into instances of `M`.
pub fn deserialize<M: Model>(document: &Value) -> Result<Deserialized<M>, ApiError> {
    let document = match document {
        Value::Null => return Ok(Deserialized::Empty),
        Value::Object(document) => document,
        _ => return Err(malformed("document is not a JSON object")),
    };

    let included: Vec<&Map<String, Value>> = match document.get("included") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_object().ok_or_else(|| malformed("included resource is not an object")))
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(malformed("`included` is not an array")),
    };
    let resolver = Resolver { included };
    let schema = M::schema();

    match document.get("data") {
        None | Some(Value::Null) => Ok(Deserialized::Empty),
        Some(Value::Object(resource)) => {
            let record = resolver.record(resource, schema, &mut Vec::new())?;
            Ok(Deserialized::One(instantiate(record)?))
        }
        Some(Value::Array(resources)) => {
            let mut items = Vec::with_capacity(resources.len());
            for resource in resources {
                let resource = resource
                    .as_object()
                    .ok_or_else(|| malformed("primary data contains a non-object"))?;
                let record = resolver.record(resource, schema, &mut Vec::new())?;
                items.push(instantiate(record)?);
            }
            Ok(Deserialized::Many(Collection {
                items,
                links: document.get("links").and_then(Value::as_object).cloned(),
                meta: document.get("meta").and_then(Value::as_object).cloned(),
            }))
        }
        Some(_) => Err(malformed("primary data is neither an object, an array nor null")),
    }
}

/// Decode a document expected to hold at most one resource.
pub fn deserialize_one<M: Model>(document: &Value) -> Result<Option<M>, ApiError> {
    match deserialize(document)? {
        Deserialized::Empty => Ok(None),
        Deserialized::One(model) => Ok(Some(model)),
        Deserialized::Many(_) => Err(malformed("expected a single resource, found a collection")),
    }
}

/// Decode a document expected to hold a collection. Absent data yields an
/// empty collection.
pub fn deserialize_many<M: Model>(document: &Value) -> Result<Collection<M>, ApiError> {
    match deserialize(document)? {
        Deserialized::Empty => Ok(Collection::default()),
        Deserialized::Many(collection) => Ok(collection),
        Deserialized::One(_) => Err(malformed("expected a collection, found a single resource")),
    }
}

fn malformed(message: &str) -> ApiError {
    ApiError::Deserialization(message.to_string())
}

fn instantiate<M: Model>(record: Map<String, Value>) -> Result<M, ApiError> {
    serde_json::from_value(Value::Object(record))
        .map_err(|e| ApiError::Deserialization(e.to_string()))
}

struct Resolver<'a> {
    included: Vec<&'a Map<String, Value>>,
}

impl<'a> Resolver<'a> {
    fn find(&self, resource_type: &str, id: &str) -> Option<&'a Map<String, Value>> {
        self.included.iter().copied().find(|resource| {
            resource.get("type").and_then(Value::as_str) == Some(resource_type)
                && resource.get("id").and_then(id_string).as_deref() == Some(id)
        })
    }

    /// Flatten one resource object into a model record. `visiting` holds the
    /// `(type, id)` pairs currently being expanded, which stops cycles
    /// through `included`.
    fn record(
        &self,
        resource: &Map<String, Value>,
        schema: &Schema,
        visiting: &mut Vec<(String, String)>,
    ) -> Result<Map<String, Value>, ApiError> {
        let key_case = schema.deserializer_options();
        let resource_type = resource
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("resource object has no `type`"))?;
        let id = match resource.get("id") {
            None | Some(Value::Null) => None,
            Some(value) => Some(id_string(value).ok_or_else(|| malformed("resource `id` is not a string"))?),
        };

        let mut record = Map::new();
        if let Some(id) = &id {
            record.insert("id".to_string(), Value::from(id.as_str()));
        }

        match resource.get("attributes") {
            None | Some(Value::Null) => {}
            Some(Value::Object(attributes)) => {
                for (key, value) in attributes {
                    record.insert(key_case.apply(key), key_case.apply_deep(value));
                }
            }
            Some(_) => return Err(malformed("resource `attributes` is not an object")),
        }

        if let Some(id) = &id {
            visiting.push((resource_type.to_string(), id.clone()));
        }
        let relationships = self.relationships(resource, schema, key_case, visiting);
        if id.is_some() {
            visiting.pop();
        }
        for (key, value) in relationships? {
            record.insert(key, value);
        }

        for key in ["links", "meta"] {
            if let Some(value @ Value::Object(_)) = resource.get(key) {
                record.insert(key.to_string(), value.clone());
            }
        }
        Ok(record)
    }

    fn relationships(
        &self,
        resource: &Map<String, Value>,
        schema: &Schema,
        key_case: KeyCase,
        visiting: &mut Vec<(String, String)>,
    ) -> Result<Vec<(String, Value)>, ApiError> {
        let relationships = match resource.get("relationships") {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Object(relationships)) => relationships,
            Some(_) => return Err(malformed("resource `relationships` is not an object")),
        };

        let mut out = Vec::with_capacity(relationships.len());
        for (key, relationship) in relationships {
            let relationship = relationship
                .as_object()
                .ok_or_else(|| malformed("relationship object is not an object"))?;
            let field = key_case.apply(key);
            // Relationships carrying only links have nothing to resolve.
            let Some(data) = relationship.get("data") else {
                continue;
            };
            let related = schema.relationship(&field).map(|r| r.related()).unwrap_or(schema);
            let value = match data {
                Value::Null => Value::Null,
                Value::Object(linkage) => Value::Object(self.linked(linkage, related, visiting)?),
                Value::Array(linkages) => {
                    let mut records = Vec::with_capacity(linkages.len());
                    for linkage in linkages {
                        let linkage = linkage
                            .as_object()
                            .ok_or_else(|| malformed("resource linkage is not an object"))?;
                        records.push(Value::Object(self.linked(linkage, related, visiting)?));
                    }
                    Value::Array(records)
                }
                _ => return Err(malformed("relationship `data` is not an object, array or null")),
            };
            out.push((field, value));
        }
        Ok(out)
    }

    /// Resolve a `{type, id}` linkage to a full record when the resource is
    /// included, or to `{id}` otherwise.
    fn linked(
        &self,
        linkage: &Map<String, Value>,
        schema: &Schema,
        visiting: &mut Vec<(String, String)>,
    ) -> Result<Map<String, Value>, ApiError> {
        let resource_type = linkage
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| malformed("resource linkage has no `type`"))?;
        let id = linkage
            .get("id")
            .and_then(id_string)
            .ok_or_else(|| malformed("resource linkage has no `id`"))?;

        let cyclic = visiting
            .iter()
            .any(|(t, i)| t == resource_type && *i == id);
        match self.find(resource_type, &id) {
            Some(resource) if !cyclic => self.record(resource, schema, visiting),
            _ => {
                let mut record = Map::new();
                record.insert("id".to_string(), Value::from(id));
                Ok(record)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelBase;
    use crate::testing::{Address, DriversLicense, Person, Untyped};

    fn person() -> Person {
        Person {
            base: ModelBase::with_id("1"),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            addresses: vec![
                Address {
                    base: ModelBase::with_id("10"),
                    kind: "home".to_string(),
                    street: "1 Main St".to_string(),
                    zip: "12345".to_string(),
                },
                Address {
                    base: ModelBase::with_id("11"),
                    kind: "work".to_string(),
                    street: "2 Side St".to_string(),
                    zip: "54321".to_string(),
                },
            ],
            drivers_license: Some(DriversLicense {
                base: ModelBase::with_id("20"),
                license_number: "D-42".to_string(),
            }),
        }
    }

    #[test]
    fn serialize_requires_a_resource_type() {
        let err = serialize(&Untyped::default()).unwrap_err();
        assert!(matches!(err, ApiError::Configuration(_)));
    }

    #[test]
    fn serialize_builds_resource_document() {
        let document = serialize(&person()).unwrap();
        assert_eq!(
            document["data"],
            json!({
                "type": "people",
                "id": "1",
                "attributes": {"first-name": "John", "last-name": "Doe"},
                "relationships": {
                    "addresses": {"data": [
                        {"type": "addresses", "id": "10"},
                        {"type": "addresses", "id": "11"}
                    ]},
                    "drivers-license": {"data": {"type": "drivers-licenses", "id": "20"}}
                }
            })
        );
        assert_eq!(
            document["included"],
            json!([
                {"type": "addresses", "id": "10", "attributes": {"kind": "home", "street": "1 Main St", "zip": "12345"}},
                {"type": "addresses", "id": "11", "attributes": {"kind": "work", "street": "2 Side St", "zip": "54321"}},
                {"type": "drivers-licenses", "id": "20", "attributes": {"license-number": "D-42"}}
            ])
        );
    }

    #[test]
    fn serialize_omits_placeholder_id_and_empty_relationships() {
        let person = Person {
            first_name: "New".to_string(),
            ..Person::default()
        };
        let document = serialize(&person).unwrap();
        let data = &document["data"];
        assert!(data.get("id").is_none());
        assert_eq!(data["relationships"]["addresses"], json!({"data": []}));
        assert_eq!(data["relationships"]["drivers-license"], json!({"data": null}));
        assert!(document.get("included").is_none());
    }

    #[test]
    fn serialize_rejects_unpersisted_related_instances() {
        let mut new_address = person();
        new_address.addresses.push(Address {
            street: "1 Main".to_string(),
            ..Address::default()
        });
        let err = serialize(&new_address).unwrap_err();
        assert!(matches!(err, ApiError::Serialization(ref m) if m.contains("not persisted")));

        let mut new_license = person();
        new_license.drivers_license = Some(DriversLicense::default());
        assert!(matches!(serialize(&new_license), Err(ApiError::Serialization(_))));
    }

    #[test]
    fn deserialize_single_resource_with_included_relationships() {
        let document = json!({
            "data": {
                "type": "people",
                "id": "1",
                "attributes": {"first-name": "John", "last-name": "Doe"},
                "relationships": {
                    "addresses": {"data": [{"type": "addresses", "id": "10"}]},
                    "drivers-license": {"data": {"type": "drivers-licenses", "id": "20"}}
                },
                "links": {"self": "/people/1"}
            },
            "included": [
                {"type": "addresses", "id": "10", "attributes": {"kind": "home", "street": "1 Main St", "zip": "12345"}}
            ]
        });

        let person: Person = deserialize_one(&document).unwrap().unwrap();
        assert_eq!(person.id(), "1");
        assert!(person.is_persisted());
        assert_eq!(person.first_name, "John");
        assert_eq!(person.links()["self"], "/people/1");
        assert_eq!(person.addresses.len(), 1);
        assert_eq!(person.addresses[0].street, "1 Main St");
        assert!(person.addresses[0].is_persisted());
        let license = person.drivers_license.unwrap();
        assert_eq!(license.id(), "20");
        assert_eq!(license.license_number, "");
    }

    #[test]
    fn deserialize_collection_keeps_links_and_meta() {
        let document = json!({
            "data": [
                {"type": "people", "id": "123", "attributes": {"first-name": "John", "last-name": "Doe"}},
                {"type": "people", "id": "456", "attributes": {"first-name": "Jane", "last-name": "Doe"}}
            ],
            "links": {"all": "/users"},
            "meta": {"count": 2}
        });

        let people: Collection<Person> = deserialize_many(&document).unwrap();
        assert_eq!(people.len(), 2);
        assert_eq!(people[1].first_name, "Jane");
        assert_eq!(people.links().unwrap()["all"], "/users");
        assert_eq!(people.meta().unwrap()["count"], 2);
    }

    #[test]
    fn absent_or_null_data_is_empty() {
        assert_eq!(deserialize::<Person>(&Value::Null).unwrap(), Deserialized::Empty);
        assert_eq!(deserialize::<Person>(&json!({})).unwrap(), Deserialized::Empty);
        assert_eq!(deserialize::<Person>(&json!({"data": null})).unwrap(), Deserialized::Empty);
        assert!(deserialize_many::<Person>(&json!({"meta": {}})).unwrap().is_empty());
    }

    #[test]
    fn malformed_documents_are_errors() {
        for document in [
            json!("text"),
            json!({"data": 5}),
            json!({"data": {"id": "1"}}),
            json!({"data": {"type": "people", "attributes": []}}),
            json!({"data": {"type": "people", "relationships": {"addresses": {"data": 1}}}}),
            json!({"data": [1]}),
        ] {
            let err = deserialize::<Person>(&document).unwrap_err();
            assert!(matches!(err, ApiError::Deserialization(_)), "{document}");
        }
    }

    #[test]
    fn shape_mismatch_between_one_and_many_is_an_error() {
        let single = json!({"data": {"type": "people", "id": "1"}});
        let many = json!({"data": [{"type": "people", "id": "1"}]});
        assert!(deserialize_many::<Person>(&single).is_err());
        assert!(deserialize_one::<Person>(&many).is_err());
    }

    #[test]
    fn cyclic_included_resources_terminate() {
        let document = json!({
            "data": {
                "type": "people", "id": "1",
                "relationships": {"addresses": {"data": [{"type": "addresses", "id": "10"}]}}
            },
            "included": [
                {"type": "addresses", "id": "10",
                 "attributes": {"street": "Loop"},
                 "relationships": {"owner": {"data": {"type": "people", "id": "1"}}}},
                {"type": "people", "id": "1",
                 "relationships": {"addresses": {"data": [{"type": "addresses", "id": "10"}]}}}
            ]
        });
        let person: Person = deserialize_one(&document).unwrap().unwrap();
        assert_eq!(person.addresses[0].street, "Loop");
    }

    #[test]
    fn round_trip_preserves_attributes_and_related_ids() {
        let original = person();
        let document = serialize(&original).unwrap();
        let back: Person = deserialize_one(&document).unwrap().unwrap();

        assert_eq!(back.id(), original.id());
        assert_eq!(back.first_name, original.first_name);
        assert_eq!(back.last_name, original.last_name);
        let ids: Vec<_> = back.addresses.iter().map(|a| a.id().to_string()).collect();
        assert_eq!(ids, vec!["10", "11"]);
        assert_eq!(back.addresses[1].zip, "54321");
        assert_eq!(back.drivers_license.unwrap().license_number, "D-42");
    }
}
