//! Key case conversion between model field names and wire attribute keys.
//!
//! Model fields are camelCase (`firstName`); JSON:API attribute keys are
//! dash-case (`first-name`). Conversion is applied recursively to the keys of
//! nested objects inside attribute values.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key convention applied to wire attribute keys on deserialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyCase {
    #[default]
    Camel,
    Dash,
    Snake,
    /// Keep wire keys as-is.
    Preserve,
}

impl KeyCase {
    pub fn apply(&self, key: &str) -> String {
        match self {
            KeyCase::Camel => camelize(key),
            KeyCase::Dash => dasherize(key),
            KeyCase::Snake => underscore(key),
            KeyCase::Preserve => key.to_string(),
        }
    }

    /// Convert every object key in `value`, descending into arrays and
    /// nested objects.
    pub fn apply_deep(&self, value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let converted: Map<String, Value> = map
                    .iter()
                    .map(|(key, value)| (self.apply(key), self.apply_deep(value)))
                    .collect();
                Value::Object(converted)
            }
            Value::Array(items) => Value::Array(items.iter().map(|v| self.apply_deep(v)).collect()),
            other => other.clone(),
        }
    }
}

fn words(key: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in key.chars() {
        if ch == '-' || ch == '_' || ch == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// `first-name` / `first_name` → `firstName`.
pub fn camelize(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, word) in words(key).iter().enumerate() {
        let lower = word.to_lowercase();
        if i == 0 {
            out.push_str(&lower);
        } else {
            let mut chars = lower.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

/// `firstName` / `first_name` → `first-name`.
pub fn dasherize(key: &str) -> String {
    join_lower(key, "-")
}

/// `firstName` / `first-name` → `first_name`.
pub fn underscore(key: &str) -> String {
    join_lower(key, "_")
}

fn join_lower(key: &str, separator: &str) -> String {
    words(key)
        .iter()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}
