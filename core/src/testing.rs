//! Model fixtures shared by the unit tests.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error_set::{ErrorObject, ErrorSet};
use crate::model::{Model, ModelBase};
use crate::routing::RouteArgs;
use crate::schema::Schema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(flatten)]
    pub base: ModelBase,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub zip: String,
}

impl Model for Address {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .resource_type("addresses")
                .url("/addresses")
                .attributes(["kind", "street", "zip"])
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

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriversLicense {
    #[serde(flatten)]
    pub base: ModelBase,
    #[serde(default)]
    pub license_number: String,
}

impl Model for DriversLicense {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .resource_type("drivers-licenses")
                .attribute("licenseNumber")
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

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(flatten)]
    pub base: ModelBase,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub addresses: Vec<Address>,
    #[serde(default)]
    pub drivers_license: Option<DriversLicense>,
}

impl Model for Person {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .resource_type("people")
                .url("/people")
                .attribute("firstName")
                .attribute("lastName")
                .has_many::<Address>("addresses")
                .has_one::<DriversLicense>("driversLicense")
                .build()
        })
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModelBase {
        &mut self.base
    }

    fn validate(&self, errors: &mut ErrorSet) {
        if self.first_name.trim().is_empty() {
            errors.push(ErrorObject::for_attribute("firstName", "blank", Some("can't be blank")));
        }
    }
}

/// A nested resource whose URL needs the parent post id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(flatten)]
    pub base: ModelBase,
    /// Route argument only; never part of the resource document.
    #[serde(skip)]
    pub post_id: String,
    #[serde(default)]
    pub body: String,
}

impl Model for Comment {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .resource_type("comments")
                .url("/posts/:post_id/comments")
                .attribute("body")
                .build()
        })
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModelBase {
        &mut self.base
    }

    fn route_args(&self) -> RouteArgs {
        RouteArgs::new().with("post_id", &self.post_id)
    }
}

/// A model that never configured its resource type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Untyped {
    #[serde(flatten)]
    pub base: ModelBase,
    #[serde(default)]
    pub name: String,
}

impl Model for Untyped {
    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| Schema::builder().url("/untyped").attribute("name").build())
    }

    fn base(&self) -> &ModelBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ModelBase {
        &mut self.base
    }
}
