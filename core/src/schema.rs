//! Type-level field declarations and the options derived from them.
//!
//! # Design
//! Each model type declares, once, which of its fields are attributes and
//! which are relationships (with cardinality and the related model type).
//! Classification is therefore a lookup in the declaration: a field is the
//! `id`, an attribute, a relationship, or unknown, and never two of those.
//!
//! Relationship declarations hold a function pointer to the related type's
//! schema rather than the schema itself, so mutually referencing models can
//! be declared without initialization order issues.
//!
//! ```ignore
//! impl Model for Person {
//!     fn schema() -> &'static Schema {
//!         static SCHEMA: OnceLock<Schema> = OnceLock::new();
//!         SCHEMA.get_or_init(|| {
//!             Schema::builder()
//!                 .resource_type("people")
//!                 .url("/people")
//!                 .attribute("firstName")
//!                 .attribute("lastName")
//!                 .has_many::<Address>("addresses")
//!                 .has_one::<DriversLicense>("driversLicense")
//!                 .build()
//!         })
//!     }
//!     // ...
//! }
//! ```

use crate::inflect::KeyCase;
use crate::model::Model;

/// Field name reserved for the resource identifier.
pub const ID_FIELD: &str = "id";

/// The field a relationship reference is keyed by.
pub const REFERENCE_KEY: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

/// A declared relationship field.
#[derive(Debug, Clone)]
pub struct Relationship {
    name: &'static str,
    cardinality: Cardinality,
    related: fn() -> &'static Schema,
}

impl Relationship {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Schema of the related model type.
    pub fn related(&self) -> &'static Schema {
        (self.related)()
    }
}

/// How a single field of a model is treated on the wire.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind<'a> {
    Id,
    Attribute,
    Relationship(&'a Relationship),
    Unknown,
}

/// Declared shape of a model type.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    resource_type: &'static str,
    url: &'static str,
    attributes: Vec<&'static str>,
    relationships: Vec<Relationship>,
    key_case: KeyCase,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// JSON:API `type` of this resource. Empty when not configured.
    pub fn resource_type(&self) -> &'static str {
        self.resource_type
    }

    /// URL template, e.g. `/posts/:post_id/comments`.
    pub fn url(&self) -> &'static str {
        self.url
    }

    pub fn classify(&self, field: &str) -> FieldKind<'_> {
        if field == ID_FIELD {
            return FieldKind::Id;
        }
        if self.attributes.contains(&field) {
            return FieldKind::Attribute;
        }
        match self.relationship(field) {
            Some(relationship) => FieldKind::Relationship(relationship),
            None => FieldKind::Unknown,
        }
    }

    pub fn is_attribute(&self, field: &str) -> bool {
        matches!(self.classify(field), FieldKind::Attribute)
    }

    pub fn is_relationship(&self, field: &str) -> bool {
        matches!(self.classify(field), FieldKind::Relationship(_))
    }

    pub fn attribute_field_names(&self) -> &[&'static str] {
        &self.attributes
    }

    pub fn relationship_field_names(&self) -> Vec<&'static str> {
        self.relationships.iter().map(|r| r.name).collect()
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn relationship(&self, field: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.name == field)
    }

    /// Options driving serialization: attribute names followed by
    /// relationship names, plus a reference sub-schema per relationship
    /// listing the related type's attributes. Nested relationships of the
    /// related type are not expanded.
    pub fn serializer_options(&self) -> SerializerOptions {
        let mut attributes: Vec<&'static str> = self.attributes.clone();
        attributes.extend(self.relationships.iter().map(|r| r.name));

        let relationships = self
            .relationships
            .iter()
            .map(|relationship| {
                (
                    relationship.name,
                    RelationshipOptions {
                        reference: REFERENCE_KEY,
                        attributes: relationship.related().attributes.clone(),
                    },
                )
            })
            .collect();

        SerializerOptions {
            attributes,
            relationships,
        }
    }

    /// Key convention applied to wire attribute keys when deserializing.
    pub fn deserializer_options(&self) -> KeyCase {
        self.key_case
    }
}

/// Flat attribute list plus per-relationship reference sub-schemas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializerOptions {
    pub attributes: Vec<&'static str>,
    pub relationships: Vec<(&'static str, RelationshipOptions)>,
}

impl SerializerOptions {
    pub fn relationship(&self, name: &str) -> Option<&RelationshipOptions> {
        self.relationships
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, options)| options)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipOptions {
    pub reference: &'static str,
    pub attributes: Vec<&'static str>,
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn resource_type(mut self, resource_type: &'static str) -> Self {
        self.schema.resource_type = resource_type;
        self
    }

    pub fn url(mut self, url: &'static str) -> Self {
        self.schema.url = url;
        self
    }

    pub fn attribute(mut self, name: &'static str) -> Self {
        self.schema.attributes.push(name);
        self
    }

    pub fn attributes<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        self.schema.attributes.extend(names);
        self
    }

    /// Declare a to-many relationship holding a sequence of `M`.
    pub fn has_many<M: Model>(self, name: &'static str) -> Self {
        self.relationship(name, Cardinality::ToMany, M::schema)
    }

    /// Declare a to-one relationship holding an optional `M`.
    pub fn has_one<M: Model>(self, name: &'static str) -> Self {
        self.relationship(name, Cardinality::ToOne, M::schema)
    }

    /// Same as [`SchemaBuilder::has_one`]; reads better for owning-side links.
    pub fn belongs_to<M: Model>(self, name: &'static str) -> Self {
        self.has_one::<M>(name)
    }

    pub fn key_for_attribute(mut self, key_case: KeyCase) -> Self {
        self.schema.key_case = key_case;
        self
    }

    fn relationship(
        mut self,
        name: &'static str,
        cardinality: Cardinality,
        related: fn() -> &'static Schema,
    ) -> Self {
        self.schema.relationships.push(Relationship {
            name,
            cardinality,
            related,
        });
        self
    }

    /// # Panics
    ///
    /// Panics if a field is declared more than once or a field is named
    /// `id`. Both are programming errors in the model definition.
    pub fn build(self) -> Schema {
        let mut seen: Vec<&str> = Vec::new();
        let names = self
            .schema
            .attributes
            .iter()
            .copied()
            .chain(self.schema.relationships.iter().map(|r| r.name));
        for name in names {
            assert!(name != ID_FIELD, "`id` cannot be declared as a field");
            assert!(!seen.contains(&name), "field `{name}` declared more than once");
            seen.push(name);
        }
        self.schema
    }
}
