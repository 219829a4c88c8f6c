//! Version-aware resolution of a schema's type and nullability.

use crate::error::{BrakeError, Result};
use crate::raw::{RawSchema, TypeDecl};
use crate::version::OpenApiVersion;
use serde_json::Value;
use tracing::{trace, warn};

const DEFAULT_TYPE: &str = "object";
const NULL_TYPE: &str = "null";

/// Resolves types for one document: the version and the strictness are fixed
/// for the resolver's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver {
    version: OpenApiVersion,
    strict: bool,
}

impl TypeResolver {
    pub fn new(version: OpenApiVersion, strict: bool) -> Self {
        Self { version, strict }
    }

    pub fn version(&self) -> OpenApiVersion {
        self.version
    }

    /// Primary type of `schema`.
    ///
    /// `null` members of a type array are ignored; of several remaining types
    /// the first declared wins. A schema without a type gets one inferred from
    /// its shape, failing that it is an error in strict mode and `object`
    /// otherwise.
    pub fn resolve_type(&self, schema: &RawSchema) -> Result<String> {
        match &schema.types {
            TypeDecl::Single(name) if name != NULL_TYPE => return Ok(name.clone()),
            TypeDecl::Single(_) => return Ok(DEFAULT_TYPE.to_string()),
            TypeDecl::Many(names) if !names.is_empty() => {
                let non_null: Vec<&String> = names.iter().filter(|n| *n != NULL_TYPE).collect();
                let Some(primary) = non_null.first() else {
                    trace!(location = %schema.location, "type array only holds null");
                    return Ok(DEFAULT_TYPE.to_string());
                };
                if non_null.len() > 1 {
                    warn!(
                        location = %schema.location,
                        types = ?non_null,
                        "union types are not supported, using the first declared type"
                    );
                }
                if !self.version.uses_type_arrays() {
                    trace!(location = %schema.location, "type array in a 3.0 document");
                }
                return Ok((*primary).clone());
            }
            _ => {}
        }

        if let Some(inferred) = infer_type(schema) {
            trace!(location = %schema.location, inferred, "type inferred from schema shape");
            return Ok(inferred.to_string());
        }

        if self.strict {
            return Err(BrakeError::MissingType {
                location: schema.location.clone(),
            });
        }
        trace!(location = %schema.location, "schema has no type, using object");
        Ok(DEFAULT_TYPE.to_string())
    }

    /// 3.1: `null` is a member of the type array. 3.0 and converted 2.0: the
    /// `nullable` flag.
    pub fn is_nullable(&self, schema: &RawSchema) -> bool {
        if self.version.uses_type_arrays() {
            if let TypeDecl::Many(names) = &schema.types {
                return names.iter().any(|n| n == NULL_TYPE);
            }
            return matches!(&schema.types, TypeDecl::Single(name) if name == NULL_TYPE);
        }
        schema.nullable
    }
}

fn infer_type(schema: &RawSchema) -> Option<&'static str> {
    if !schema.properties.is_empty() || schema.composition.is_some() {
        return Some("object");
    }
    if schema.items.is_some() {
        return Some("array");
    }
    schema
        .enum_values
        .iter()
        .find(|value| !value.is_null())
        .map(json_type)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => NULL_TYPE,
        Value::Bool(_) => "boolean",
        Value::Number(number) if number.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
