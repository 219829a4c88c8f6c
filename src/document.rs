//! Loading of raw OpenAPI documents.

use crate::error::{BrakeError, Result};
use crate::upgrade;
use crate::version::{ORIGINAL_VERSION_EXTENSION, OpenApiVersion};
use serde_json::{Map, Number, Value};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

/// A parsed document tree, already in the 3.x shape, with the diagnostics
/// collected while loading it.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub root: Value,
    pub version: OpenApiVersion,
    pub diagnostics: Vec<String>,
}

impl RawDocument {
    /// Reads and parses a JSON or YAML file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading API definition");
        content.parse()
    }

    /// Accepts an already parsed tree. Swagger 2.0 input is converted to the
    /// 3.0 shape; every accepted document is tagged with its detected version.
    pub fn from_value(root: Value) -> Result<Self> {
        if !root.is_object() {
            return Err(BrakeError::Parse(
                "document root must be a mapping".to_string(),
            ));
        }

        let (mut root, version, diagnostics) = if upgrade::is_swagger_v2(&root) {
            let upgraded = upgrade::upgrade_v2(&root);
            info!("detected Swagger 2.0 definition, converted to OpenAPI 3.0.x");
            (
                upgraded.document,
                OpenApiVersion::V2Converted,
                upgraded.diagnostics,
            )
        } else {
            let version = OpenApiVersion::resolve(&root)?;
            info!(%version, "detected OpenAPI definition");
            (root, version, Vec::new())
        };

        for diagnostic in &diagnostics {
            warn!(diagnostic = %diagnostic, "parse diagnostic");
        }

        if let Some(object) = root.as_object_mut() {
            object.insert(
                ORIGINAL_VERSION_EXTENSION.to_string(),
                Value::String(version.marker().to_string()),
            );
        }

        Ok(Self {
            root,
            version,
            diagnostics,
        })
    }
}

impl FromStr for RawDocument {
    type Err = BrakeError;

    /// Parses JSON when the content starts with `{`, YAML otherwise.
    fn from_str(content: &str) -> Result<Self> {
        let root = if content.trim_start().starts_with('{') {
            serde_json::from_str(content).map_err(|e| BrakeError::Parse(e.to_string()))?
        } else {
            let yaml: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| BrakeError::Parse(e.to_string()))?;
            yaml_to_json(yaml)
        };
        Self::from_value(root)
    }
}

/// Converts a YAML tree into a JSON tree. Non-string mapping keys (response
/// codes written as `200:`) are stringified.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(flag) => Value::Bool(flag),
        serde_yaml::Value::Number(number) => yaml_number(&number),
        serde_yaml::Value::String(text) => Value::String(text),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut object = Map::new();
            for (key, value) in mapping {
                match yaml_key(&key) {
                    Some(key) => {
                        object.insert(key, yaml_to_json(value));
                    }
                    None => warn!(?key, "skipping mapping entry with a non-scalar key"),
                }
            }
            Value::Object(object)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_number(number: &serde_yaml::Number) -> Value {
    if let Some(integer) = number.as_i64() {
        Value::Number(Number::from(integer))
    } else if let Some(integer) = number.as_u64() {
        Value::Number(Number::from(integer))
    } else {
        number
            .as_f64()
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number)
    }
}

fn yaml_key(key: &serde_yaml::Value) -> Option<String> {
    match key {
        serde_yaml::Value::String(text) => Some(text.clone()),
        serde_yaml::Value::Number(number) => Some(number.to_string()),
        serde_yaml::Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
