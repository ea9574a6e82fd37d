//! JSON:API error objects and the per-model error collection.
//!
//! # Design
//! Raw error objects are projected onto the fields JSON:API defines; anything
//! else the server adds is dropped. The projection never fails, so building
//! an `ErrorSet` from an `errors` array always keeps one record per entry.
//!
//! Records are grouped by the model field they concern through
//! `source.parameter` first, then `source.pointer`: `/data` maps to `base`,
//! `/data/attributes/<name>` maps to `<name>`. Anything else is kept in the
//! set but left out of [`ErrorSet::extract`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::inflect;

const DOCUMENT_POINTER: &str = "/data";
const ATTRIBUTES_POINTER: &str = "/data/attributes/";
const BASE_KEY: &str = "base";

/// Where in the request an error originated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

/// `links.about`: either a bare URL or a link object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AboutLink {
    Href(String),
    Object {
        href: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<Map<String, Value>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLinks {
    pub about: AboutLink,
}

/// A normalized JSON:API error object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<ErrorLinks>,
}

impl ErrorObject {
    /// Project an arbitrary JSON value onto the recognised error fields.
    ///
    /// Empty strings count as absent. Numeric `status`/`code` values are kept
    /// as their decimal string.
    pub fn from_raw(raw: &Value) -> Self {
        let field = |name: &str| raw.get(name).and_then(text);

        let source = raw.get("source").filter(|s| s.is_object()).map(|source| ErrorSource {
            pointer: source.get("pointer").and_then(text),
            parameter: source.get("parameter").and_then(text),
        });

        let links = raw
            .get("links")
            .and_then(|links| links.get("about"))
            .and_then(|about| match about {
                Value::String(href) if !href.is_empty() => Some(AboutLink::Href(href.clone())),
                Value::Object(object) => object.get("href").and_then(text).map(|href| {
                    AboutLink::Object {
                        href,
                        meta: object.get("meta").and_then(Value::as_object).cloned(),
                    }
                }),
                _ => None,
            })
            .map(|about| ErrorLinks { about });

        Self {
            id: field("id"),
            status: field("status"),
            code: field("code"),
            title: field("title"),
            detail: field("detail"),
            meta: raw.get("meta").and_then(Value::as_object).cloned(),
            source,
            links,
        }
    }

    /// Convenience constructor for validation hooks.
    pub fn for_attribute(attribute: &str, code: &str, detail: Option<&str>) -> Self {
        Self {
            code: Some(code.to_string()),
            detail: detail.map(str::to_string),
            source: Some(ErrorSource {
                pointer: Some(format!("{ATTRIBUTES_POINTER}{}", inflect::dasherize(attribute))),
                parameter: None,
            }),
            ..Self::default()
        }
    }

    /// The group key this error is filed under, if it can be attributed.
    pub fn field(&self) -> Option<String> {
        let source = self.source.as_ref()?;
        if let Some(parameter) = &source.parameter {
            return Some(parameter.clone());
        }
        parse_pointer(source.pointer.as_deref()?)
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_pointer(pointer: &str) -> Option<String> {
    if pointer == DOCUMENT_POINTER {
        return Some(BASE_KEY.to_string());
    }
    let rest = pointer.strip_prefix(ATTRIBUTES_POINTER)?;
    rest.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

/// Ordered collection of error objects owned by one model instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorSet {
    errors: Vec<ErrorObject>,
}

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a raw list of error objects. Every entry is kept.
    pub fn from_raw(errors: &[Value]) -> Self {
        Self {
            errors: errors.iter().map(ErrorObject::from_raw).collect(),
        }
    }

    /// Build from an error document (`{"errors": [...]}`). Anything without an
    /// `errors` array yields an empty set.
    pub fn from_document(document: Option<&Value>) -> Self {
        match document.and_then(|doc| doc.get("errors")).and_then(Value::as_array) {
            Some(errors) => Self::from_raw(errors),
            None => Self::default(),
        }
    }

    /// Normalize and append a raw error.
    pub fn add(&mut self, raw: &Value) {
        self.push(ErrorObject::from_raw(raw));
    }

    /// Append an already-normalized error.
    ///
    /// An error whose field and code both match an existing record is
    /// dropped, so re-running validation does not stack identical messages.
    pub fn push(&mut self, error: ErrorObject) {
        if let (Some(field), Some(code)) = (error.field(), error.code.as_deref()) {
            let duplicate = self
                .errors
                .iter()
                .any(|e| e.code.as_deref() == Some(code) && e.field().as_deref() == Some(field.as_str()));
            if duplicate {
                return;
            }
        }
        self.errors.push(error);
    }

    pub fn clear(&mut self) {
        self.errors = Vec::new();
    }

    pub fn count(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ErrorObject> {
        self.errors.iter()
    }

    pub fn as_slice(&self) -> &[ErrorObject] {
        &self.errors
    }

    /// Group attributable errors by field, preserving insertion order within
    /// each group.
    pub fn extract(&self) -> BTreeMap<String, Vec<ErrorObject>> {
        let mut grouped: BTreeMap<String, Vec<ErrorObject>> = BTreeMap::new();
        for error in &self.errors {
            if let Some(key) = error.field() {
                grouped.entry(key).or_default().push(error.clone());
            }
        }
        grouped
    }

    /// Errors for one field; accepts the model name (`firstName`) or the wire
    /// name (`first-name`).
    pub fn get(&self, field: &str) -> Vec<&ErrorObject> {
        let wire = inflect::dasherize(field);
        self.errors
            .iter()
            .filter(|error| match error.field() {
                Some(key) => key == field || key == wire,
                None => false,
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a ErrorSet {
    type Item = &'a ErrorObject;
    type IntoIter = std::slice::Iter<'a, ErrorObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}
