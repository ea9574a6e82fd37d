//! Verify encoding/decoding against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs and the exact wire form they must
//! produce (or the typed result a wire form must decode to). Comparing parsed
//! JSON (not raw strings) avoids false negatives from field-ordering
//! differences.

use std::sync::OnceLock;

use jsonapi_model::{
    codec, construct_url, to_query_string, AdapterConfig, ApiError, Collection, Deserialized,
    ErrorSet, HttpAdapter, HttpMethod, MockTransport, Model, ModelBase, RouteArgs, Schema,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Address {
    #[serde(flatten)]
    base: ModelBase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    street: Option<String>,
}

impl Model for Address {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .resource_type("addresses")
                .attribute("street")
                .build()
        })
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModelBase {
        &mut self.base
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Person {
    #[serde(flatten)]
    base: ModelBase,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    addresses: Vec<Address>,
}

impl Model for Person {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .resource_type("people")
                .url("/people")
                .attributes(["firstName", "lastName"])
                .has_many::<Address>("addresses")
                .build()
        })
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModelBase {
        &mut self.base
    }
}

fn load(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

fn object(value: &Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    for case in load(include_str!("../../test-vectors/requests.json")) {
        let name = case["name"].as_str().unwrap();
        let config: AdapterConfig = serde_json::from_value(case["config"].clone()).unwrap();
        let adapter = HttpAdapter::new(config, MockTransport::new());
        let expected = &case["expected_request"];

        let req = adapter.build_request(
            parse_method(case["method"].as_str().unwrap()),
            case["url"].as_str().unwrap(),
            case.get("body"),
        );

        assert_eq!(
            req.method,
            parse_method(expected["method"].as_str().unwrap()),
            "{name}: method"
        );
        assert_eq!(req.path, expected["path"].as_str().unwrap(), "{name}: path");

        let expected_headers: Vec<(String, String)> = expected["headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|h| {
                let pair = h.as_array().unwrap();
                (
                    pair[0].as_str().unwrap().to_string(),
                    pair[1].as_str().unwrap().to_string(),
                )
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");

        match expected.get("body") {
            Some(body) => {
                let sent: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
                assert_eq!(&sent, body, "{name}: body");
            }
            None => assert!(req.body.is_none(), "{name}: body should be None"),
        }
    }
}

// ---------------------------------------------------------------------------
// URLs and query strings
// ---------------------------------------------------------------------------

#[test]
fn url_test_vectors() {
    for case in load(include_str!("../../test-vectors/urls.json")) {
        let name = case["name"].as_str().unwrap();
        let args: RouteArgs = object(&case["args"])
            .into_iter()
            .map(|(key, value)| (key, value.as_str().unwrap().to_string()))
            .collect();

        let result = construct_url(case["template"].as_str().unwrap(), &args);

        if let Some(missing) = case.get("expected_missing") {
            let expected: Vec<String> = serde_json::from_value(missing.clone()).unwrap();
            match result {
                Err(ApiError::Routing(names)) => assert_eq!(names, expected, "{name}: missing"),
                other => panic!("{name}: expected routing error, got {other:?}"),
            }
        } else {
            assert_eq!(result.unwrap(), case["expected"].as_str().unwrap(), "{name}");
        }
    }
}

#[test]
fn query_test_vectors() {
    for case in load(include_str!("../../test-vectors/query.json")) {
        let name = case["name"].as_str().unwrap();
        let query = to_query_string(&object(&case["input"]));
        assert_eq!(query, case["expected"].as_str().unwrap(), "{name}");
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn error_test_vectors() {
    for case in load(include_str!("../../test-vectors/errors.json")) {
        let name = case["name"].as_str().unwrap();
        let raw = case["errors"].as_array().unwrap();

        let errors = ErrorSet::from_raw(raw);
        assert_eq!(errors.count(), raw.len(), "{name}: every entry kept");

        let grouped: Map<String, Value> = errors
            .extract()
            .into_iter()
            .map(|(field, records)| {
                let codes = records
                    .into_iter()
                    .map(|record| Value::from(record.code.unwrap_or_default()))
                    .collect();
                (field, Value::Array(codes))
            })
            .collect();
        assert_eq!(Value::Object(grouped), case["expected"], "{name}: extract");
    }
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[test]
fn serialize_test_vectors() {
    for case in load(include_str!("../../test-vectors/serialize.json")) {
        let name = case["name"].as_str().unwrap();
        let person: Person = serde_json::from_value(case["input"].clone()).unwrap();

        let document = codec::serialize(&person).unwrap();
        assert_eq!(document, case["expected"], "{name}: document");
    }
}

#[test]
fn deserialize_test_vectors() {
    for case in load(include_str!("../../test-vectors/deserialize.json")) {
        let name = case["name"].as_str().unwrap();

        let people: Collection<Person> = match codec::deserialize(&case["document"]).unwrap() {
            Deserialized::Empty => Collection::default(),
            Deserialized::One(person) => Collection::new(vec![person]),
            Deserialized::Many(people) => people,
        };
        let decoded: Vec<Value> = people
            .iter()
            .map(|person| serde_json::to_value(person).unwrap())
            .collect();
        assert_eq!(Value::Array(decoded), case["expected"], "{name}: models");
        assert!(
            people.iter().all(|person| person.is_persisted()),
            "{name}: persisted"
        );

        if let Some(links) = case.get("expected_links") {
            assert_eq!(people.links(), links.as_object(), "{name}: links");
        }
        if let Some(meta) = case.get("expected_meta") {
            assert_eq!(people.meta(), meta.as_object(), "{name}: meta");
        }
    }
}
