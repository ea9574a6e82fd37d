//! URL templates and query strings.
//!
//! Templates name their placeholders with a leading colon
//! (`/posts/:post_id/comments`). Every placeholder must have a value in the
//! supplied `RouteArgs`; a missing one is reported before any request is
//! built. Query strings are assembled from a JSON object: arrays repeat the
//! key with `[]`, nested objects nest the key with `[name]`, and scalar
//! values are percent-encoded.

use std::collections::HashMap;
use std::fmt::Display;

use serde_json::{Map, Number, Value};

use crate::error::ApiError;

/// Values for the `:name` placeholders of a URL template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteArgs {
    values: HashMap<String, String>,
}

impl RouteArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Display) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Display) {
        self.values.insert(name.into(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for RouteArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = RouteArgs::new();
        for (name, value) in iter {
            args.insert(name, value);
        }
        args
    }
}

fn is_param_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Placeholder names in `template`, in order of appearance.
pub fn url_params(template: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find(':') {
        let after = &rest[start + 1..];
        let len = after.find(|c: char| !is_param_char(c)).unwrap_or(after.len());
        if len > 0 {
            params.push(&after[..len]);
        }
        rest = &after[len..];
    }
    params
}

/// Substitute every placeholder in `template` from `args`.
pub fn construct_url(template: &str, args: &RouteArgs) -> Result<String, ApiError> {
    let missing: Vec<String> = url_params(template)
        .into_iter()
        .filter(|name| args.get(name).is_none())
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::Routing(missing));
    }

    let mut url = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(':') {
        url.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let len = after.find(|c: char| !is_param_char(c)).unwrap_or(after.len());
        match args.get(&after[..len]) {
            Some(value) if len > 0 => url.push_str(value),
            _ => {
                url.push(':');
                url.push_str(&after[..len]);
            }
        }
        rest = &after[len..];
    }
    url.push_str(rest);
    Ok(url)
}

/// Build a query string from `params`, keeping key insertion order.
pub fn to_query_string(params: &Map<String, Value>) -> String {
    let mut pairs = Vec::new();
    for (key, value) in params {
        append_pairs(&mut pairs, key, value);
    }
    pairs.join("&")
}

fn append_pairs(pairs: &mut Vec<String>, key: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            let key = format!("{key}[]");
            for item in items {
                append_pairs(pairs, &key, item);
            }
        }
        Value::Object(map) => {
            for (name, nested) in map {
                append_pairs(pairs, &format!("{key}[{name}]"), nested);
            }
        }
        Value::String(s) => pairs.push(format!("{key}={}", encode_component(s))),
        Value::Null => pairs.push(format!("{key}=")),
        Value::Number(n) => pairs.push(format!("{key}={}", encode_component(&number_text(n)))),
        Value::Bool(b) => pairs.push(format!("{key}={b}")),
    }
}

/// Integral floats render without a fraction (`1.0` as `1`).
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.abs() < 1e21 && f.fract() == 0.0 => {
            if f == 0.0 {
                "0".to_string()
            } else {
                format!("{f:.0}")
            }
        }
        _ => n.to_string(),
    }
}

/// Percent-encode everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
pub fn encode_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
