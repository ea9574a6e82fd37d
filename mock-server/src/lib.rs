//! In-memory JSON:API backend serving a `people` resource.
//!
//! Routes:
//! - `GET    /people`       list, with `filter[last-name]`, `page[number]`, `page[size]`
//! - `POST   /people`       create, 422 with an error document when invalid
//! - `GET    /people/{id}`  fetch
//! - `PATCH  /people/{id}`  merge attributes, 422 when the result is invalid
//! - `DELETE /people/{id}`  204
//!
//! Validation: `last-name` must be present and non-blank, `email` (when set)
//! must contain `@`.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const RESOURCE_TYPE: &str = "people";
const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Clone, Debug, PartialEq)]
pub struct Person {
    pub id: Uuid,
    pub attributes: Map<String, Value>,
    pub relationships: Map<String, Value>,
}

impl Person {
    pub fn to_resource(&self) -> Value {
        let mut resource = json!({
            "type": RESOURCE_TYPE,
            "id": self.id.to_string(),
            "attributes": self.attributes,
            "links": {"self": format!("/people/{}", self.id)},
        });
        if !self.relationships.is_empty() {
            resource["relationships"] = Value::Object(self.relationships.clone());
        }
        resource
    }
}

/// Resource object accepted in request documents.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceObject {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default)]
    pub relationships: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Document {
    pub data: ResourceObject,
}

pub type Db = Arc<RwLock<Vec<Person>>>;

type Reply = (StatusCode, Json<Value>);

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Vec::new()));
    Router::new()
        .route("/people", get(list_people).post(create_person))
        .route(
            "/people/{id}",
            get(get_person).patch(update_person).delete(delete_person),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error_reply(status: StatusCode, errors: Vec<Value>) -> Reply {
    (status, Json(json!({ "errors": errors })))
}

fn not_found(id: Uuid) -> Reply {
    error_reply(
        StatusCode::NOT_FOUND,
        vec![json!({
            "status": "404",
            "title": "Not Found",
            "detail": format!("person {id} does not exist"),
        })],
    )
}

fn attribute_error(attribute: &str, code: &str, detail: &str) -> Value {
    json!({
        "status": "422",
        "code": code,
        "title": "Invalid Attribute",
        "detail": detail,
        "source": {"pointer": format!("/data/attributes/{attribute}")},
    })
}

/// Server-side validation of a person's attributes.
pub fn validate(attributes: &Map<String, Value>) -> Vec<Value> {
    let mut errors = Vec::new();
    let last_name = attributes
        .get("last-name")
        .and_then(Value::as_str)
        .unwrap_or("");
    if last_name.trim().is_empty() {
        errors.push(attribute_error("last-name", "blank", "can't be blank"));
    }
    if let Some(email) = attributes.get("email").and_then(Value::as_str) {
        if !email.contains('@') {
            errors.push(attribute_error("email", "invalid", "is not an email"));
        }
    }
    errors
}

fn check_type(resource: &ResourceObject) -> Result<(), Reply> {
    if resource.kind == RESOURCE_TYPE {
        return Ok(());
    }
    Err(error_reply(
        StatusCode::CONFLICT,
        vec![json!({
            "status": "409",
            "title": "Type Mismatch",
            "source": {"pointer": "/data/type"},
        })],
    ))
}

fn bad_parameter(key: &str) -> Reply {
    error_reply(
        StatusCode::BAD_REQUEST,
        vec![json!({
            "status": "400",
            "code": "invalid",
            "title": "Invalid Query Parameter",
            "source": {"parameter": key},
        })],
    )
}

fn page_param(params: &HashMap<String, String>, key: &str, default: usize) -> Result<usize, Reply> {
    match params.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| bad_parameter(key)),
    }
}

async fn list_people(
    State(db): State<Db>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, Reply> {
    let number = page_param(&params, "page[number]", 1)?;
    let size = page_param(&params, "page[size]", DEFAULT_PAGE_SIZE)?;
    // A page whose end overflows is out of range.
    let end = number
        .checked_mul(size)
        .ok_or_else(|| bad_parameter("page[number]"))?;
    let offset = end - size;
    let filter = params.get("filter[last-name]");

    let people = db.read().await;
    let matching: Vec<&Person> = people
        .iter()
        .filter(|person| match filter {
            Some(last_name) => person.attributes.get("last-name").and_then(Value::as_str)
                == Some(last_name.as_str()),
            None => true,
        })
        .collect();

    let total = matching.len();
    let data: Vec<Value> = matching
        .iter()
        .skip(offset)
        .take(size)
        .map(|person| person.to_resource())
        .collect();

    let page_link = |n: usize| format!("/people?page[number]={n}&page[size]={size}");
    let mut links = Map::new();
    links.insert("self".to_string(), Value::from(page_link(number)));
    if end < total {
        links.insert("next".to_string(), Value::from(page_link(number + 1)));
    }
    if number > 1 {
        links.insert("prev".to_string(), Value::from(page_link(number - 1)));
    }

    Ok(Json(json!({
        "data": data,
        "links": links,
        "meta": {"total": total},
    })))
}

async fn create_person(
    State(db): State<Db>,
    Json(document): Json<Document>,
) -> Result<Reply, Reply> {
    check_type(&document.data)?;
    let errors = validate(&document.data.attributes);
    if !errors.is_empty() {
        return Err(error_reply(StatusCode::UNPROCESSABLE_ENTITY, errors));
    }

    let person = Person {
        id: Uuid::new_v4(),
        attributes: document.data.attributes,
        relationships: document.data.relationships,
    };
    tracing::info!(id = %person.id, "created person");
    db.write().await.push(person.clone());
    Ok((
        StatusCode::CREATED,
        Json(json!({ "data": person.to_resource() })),
    ))
}

async fn get_person(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Value>, Reply> {
    let people = db.read().await;
    people
        .iter()
        .find(|person| person.id == id)
        .map(|person| Json(json!({ "data": person.to_resource() })))
        .ok_or_else(|| not_found(id))
}

async fn update_person(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(document): Json<Document>,
) -> Result<Json<Value>, Reply> {
    check_type(&document.data)?;
    let mut people = db.write().await;
    let person = people
        .iter_mut()
        .find(|person| person.id == id)
        .ok_or_else(|| not_found(id))?;

    let mut attributes = person.attributes.clone();
    for (key, value) in document.data.attributes {
        attributes.insert(key, value);
    }
    let errors = validate(&attributes);
    if !errors.is_empty() {
        return Err(error_reply(StatusCode::UNPROCESSABLE_ENTITY, errors));
    }

    person.attributes = attributes;
    for (key, value) in document.data.relationships {
        person.relationships.insert(key, value);
    }
    tracing::info!(%id, "updated person");
    Ok(Json(json!({ "data": person.to_resource() })))
}

async fn delete_person(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<StatusCode, Reply> {
    let mut people = db.write().await;
    let index = people
        .iter()
        .position(|person| person.id == id)
        .ok_or_else(|| not_found(id))?;
    people.remove(index);
    tracing::info!(%id, "deleted person");
    Ok(StatusCode::NO_CONTENT)
}
