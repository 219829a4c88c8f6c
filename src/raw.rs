//! Arena of raw schema nodes.
//!
//! Every schema object found in a document (component schemas, inline
//! operation schemas and everything nested below them) is ingested once into a
//! [`SchemaGraph`] and addressed by its [`SchemaId`]. Identity of a node is its
//! index, which keeps cycle detection independent of structural equality:
//! two nodes with identical content remain distinct.

use bigdecimal::BigDecimal;
use serde_json::{Map, Value};
use std::str::FromStr;
use tracing::warn;

/// Stable index of a node inside a [`SchemaGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(usize);

impl SchemaId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The `type` keyword as written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TypeDecl {
    #[default]
    Absent,
    Single(String),
    /// 3.1 type arrays, possibly containing `"null"`.
    Many(Vec<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositionKind {
    AllOf,
    OneOf,
    AnyOf,
}

impl CompositionKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            CompositionKind::AllOf => "allOf",
            CompositionKind::OneOf => "oneOf",
            CompositionKind::AnyOf => "anyOf",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composition {
    pub kind: CompositionKind,
    pub branches: Vec<SchemaId>,
}

/// `exclusiveMaximum`/`exclusiveMinimum` in either encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusiveBound {
    /// 3.0: modifier of `maximum`/`minimum`.
    Flag(bool),
    /// 3.1: the exclusive bound itself.
    Value(BigDecimal),
}

/// One schema object, with child schemas replaced by arena indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSchema {
    /// Where the node was found, as a JSON-pointer-like path.
    pub location: String,
    pub reference: Option<String>,
    pub types: TypeDecl,
    pub nullable: bool,
    pub format: Option<String>,
    pub enum_values: Vec<Value>,
    pub properties: Vec<(String, SchemaId)>,
    pub required: Vec<String>,
    pub items: Option<SchemaId>,
    pub composition: Option<Composition>,
    pub deprecated: bool,
    pub max_length: Option<u64>,
    pub min_length: Option<u64>,
    pub max_items: Option<u64>,
    pub min_items: Option<u64>,
    pub unique_items: bool,
    pub maximum: Option<BigDecimal>,
    pub minimum: Option<BigDecimal>,
    pub exclusive_maximum: Option<ExclusiveBound>,
    pub exclusive_minimum: Option<ExclusiveBound>,
}

impl RawSchema {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            ..Default::default()
        }
    }
}

/// Owner of all raw schema nodes of one document.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    pub nodes: Vec<RawSchema>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add(&mut self, schema: RawSchema) -> SchemaId {
        self.nodes.push(schema);
        SchemaId(self.nodes.len() - 1)
    }

    pub fn get(&self, id: SchemaId) -> Option<&RawSchema> {
        self.nodes.get(id.0)
    }

    /// Ingests a schema object and all of its nested schemas, returning the
    /// index of the root node. Non-object values produce an empty node.
    pub fn ingest(&mut self, value: &Value, location: &str) -> SchemaId {
        let Some(object) = value.as_object() else {
            if !value.is_boolean() {
                warn!(location, "schema is not an object, treating it as empty");
            }
            return self.add(RawSchema::new(location));
        };

        // Reserve the slot first so parents precede their children.
        let id = self.add(RawSchema::new(location));
        let mut schema = RawSchema::new(location);

        schema.reference = object
            .get("$ref")
            .and_then(Value::as_str)
            .map(str::to_string);
        schema.types = read_type(object.get("type"));
        schema.nullable = read_bool(object, "nullable");
        schema.deprecated = read_bool(object, "deprecated");
        schema.unique_items = read_bool(object, "uniqueItems");
        schema.format = object
            .get("format")
            .and_then(Value::as_str)
            .map(str::to_string);
        schema.enum_values = object
            .get("enum")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        schema.required = object
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        schema.max_length = object.get("maxLength").and_then(Value::as_u64);
        schema.min_length = object.get("minLength").and_then(Value::as_u64);
        schema.max_items = object.get("maxItems").and_then(Value::as_u64);
        schema.min_items = object.get("minItems").and_then(Value::as_u64);
        schema.maximum = object.get("maximum").and_then(read_decimal);
        schema.minimum = object.get("minimum").and_then(read_decimal);
        schema.exclusive_maximum = object.get("exclusiveMaximum").and_then(read_exclusive);
        schema.exclusive_minimum = object.get("exclusiveMinimum").and_then(read_exclusive);

        if let Some(properties) = object.get("properties").and_then(Value::as_object) {
            for (name, property) in properties {
                let child = self.ingest(
                    property,
                    &format!("{location}/properties/{}", escape_pointer(name)),
                );
                schema.properties.push((name.clone(), child));
            }
        }

        if let Some(items) = object.get("items") {
            schema.items = Some(self.ingest(items, &format!("{location}/items")));
        }

        for kind in [
            CompositionKind::AllOf,
            CompositionKind::OneOf,
            CompositionKind::AnyOf,
        ] {
            if let Some(branches) = object.get(kind.keyword()).and_then(Value::as_array) {
                let branches = branches
                    .iter()
                    .enumerate()
                    .map(|(index, branch)| {
                        self.ingest(branch, &format!("{location}/{}/{index}", kind.keyword()))
                    })
                    .collect();
                schema.composition = Some(Composition { kind, branches });
                break;
            }
        }

        self.nodes[id.0] = schema;
        id
    }
}

fn read_bool(object: &Map<String, Value>, key: &str) -> bool {
    object.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn read_type(value: Option<&Value>) -> TypeDecl {
    match value {
        Some(Value::String(name)) => TypeDecl::Single(name.clone()),
        Some(Value::Array(names)) => TypeDecl::Many(
            names
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => TypeDecl::Absent,
    }
}

/// Reads a JSON number as an exact decimal.
pub fn read_decimal(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(number) => BigDecimal::from_str(&number.to_string()).ok(),
        _ => None,
    }
}

fn read_exclusive(value: &Value) -> Option<ExclusiveBound> {
    match value {
        Value::Bool(flag) => Some(ExclusiveBound::Flag(*flag)),
        Value::Number(_) => read_decimal(value).map(ExclusiveBound::Value),
        _ => None,
    }
}

/// JSON-pointer escaping of a single path segment.
pub fn escape_pointer(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Inverse of [`escape_pointer`].
pub fn unescape_pointer(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}
