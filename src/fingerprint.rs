//! Content hashing of specifications.
//!
//! Schema trees share subtrees whenever a reference is reused, and the number
//! of attribute paths through such a tree can grow far beyond the number of
//! nodes. Each node is therefore hashed once, with its children standing in
//! as their own digests, and the operations are hashed over those digests.

use crate::canonical::{
    HttpMethod, ParameterKind, ParameterLocation, Path, Schema, SchemaConstraints, Specification,
};
use crate::error::{BrakeError, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ptr;

#[derive(Serialize)]
struct SchemaNode<'a> {
    type_name: &'a str,
    format: Option<&'a str>,
    nullable: bool,
    enum_values: &'a BTreeSet<String>,
    attributes: Vec<AttributeNode<'a>>,
    items: Option<String>,
    constraints: &'a SchemaConstraints,
}

#[derive(Serialize)]
struct AttributeNode<'a> {
    name: &'a str,
    schema: Option<String>,
    required: bool,
    deprecated: bool,
}

#[derive(Serialize)]
struct PathNode<'a> {
    path: &'a str,
    method: HttpMethod,
    deprecated: bool,
    beta_api: bool,
    request: Option<BTreeMap<&'a str, String>>,
    parameters: Vec<ParameterNode<'a>>,
    responses: Vec<ResponseNode<'a>>,
}

#[derive(Serialize)]
struct ParameterNode<'a> {
    name: &'a str,
    location: ParameterLocation,
    required: bool,
    type_name: Option<&'a str>,
    schema: Option<String>,
    kind: &'a ParameterKind,
}

#[derive(Serialize)]
struct ResponseNode<'a> {
    code: &'a str,
    media: BTreeMap<&'a str, String>,
}

/// Hex SHA-256 of the serialized form of `value`.
fn hash<T: Serialize>(value: &T) -> Result<String> {
    let json_string = serde_json::to_string(value)
        .map_err(|e| BrakeError::Parse(format!("cannot serialize specification: {e}")))?;
    let mut hasher = Sha256::new();
    hasher.update(json_string.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Digests of the schema nodes seen so far, by address. Only valid while the
/// hashed specification is borrowed.
#[derive(Default)]
struct SchemaDigests {
    digests: HashMap<*const Schema, String>,
}

impl SchemaDigests {
    fn digest(&mut self, schema: &Schema) -> Result<String> {
        let key = ptr::from_ref(schema);
        if let Some(digest) = self.digests.get(&key) {
            return Ok(digest.clone());
        }

        let attributes = schema
            .attributes
            .iter()
            .map(|attribute| {
                Ok(AttributeNode {
                    name: &attribute.name,
                    schema: attribute.schema.as_deref().map(|s| self.digest(s)).transpose()?,
                    required: attribute.required,
                    deprecated: attribute.deprecated,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let node = SchemaNode {
            type_name: &schema.type_name,
            format: schema.format.as_deref(),
            nullable: schema.nullable,
            enum_values: &schema.enum_values,
            attributes,
            items: schema.items.as_deref().map(|s| self.digest(s)).transpose()?,
            constraints: &schema.constraints,
        };

        let digest = hash(&node)?;
        self.digests.insert(key, digest.clone());
        Ok(digest)
    }

    fn media<'a>(
        &mut self,
        media: &'a BTreeMap<String, std::sync::Arc<Schema>>,
    ) -> Result<BTreeMap<&'a str, String>> {
        media
            .iter()
            .map(|(media_type, schema)| Ok((media_type.as_str(), self.digest(schema)?)))
            .collect()
    }

    fn path<'a>(&mut self, path: &'a Path) -> Result<PathNode<'a>> {
        let request = path
            .request
            .as_ref()
            .map(|request| self.media(&request.media))
            .transpose()?;
        let parameters = path
            .parameters
            .iter()
            .map(|parameter| {
                Ok(ParameterNode {
                    name: &parameter.name,
                    location: parameter.location,
                    required: parameter.required,
                    type_name: parameter.type_name.as_deref(),
                    schema: parameter.schema.as_deref().map(|s| self.digest(s)).transpose()?,
                    kind: &parameter.kind,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let responses = path
            .responses
            .iter()
            .map(|response| {
                Ok(ResponseNode {
                    code: &response.code,
                    media: self.media(&response.media)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PathNode {
            path: &path.path,
            method: path.method,
            deprecated: path.deprecated,
            beta_api: path.beta_api,
            request,
            parameters,
            responses,
        })
    }
}

/// Hashes every operation of `specification`, ordered by path then method.
pub fn digest_specification(specification: &Specification) -> Result<String> {
    let mut digests = SchemaDigests::default();
    let paths = specification
        .sorted_paths()
        .into_iter()
        .map(|path| digests.path(path))
        .collect::<Result<Vec<_>>>()?;
    hash(&paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{Response, SchemaAttribute};
    use std::sync::Arc;

    fn holder(child: Arc<Schema>, shared: bool) -> Schema {
        let second = if shared {
            Arc::clone(&child)
        } else {
            Arc::new((*child).clone())
        };
        let mut schema = Schema::new("object");
        schema.attributes = [("first", child), ("second", second)]
            .into_iter()
            .map(|(name, schema)| SchemaAttribute {
                name: name.to_string(),
                schema: Some(schema),
                required: false,
                deprecated: false,
            })
            .collect();
        schema
    }

    fn specification(schema: Schema) -> Specification {
        let mut path = Path::new("/things", HttpMethod::Get);
        path.responses.push(Response {
            code: "200".to_string(),
            media: BTreeMap::from([("application/json".to_string(), Arc::new(schema))]),
        });
        Specification::new(vec![path])
    }

    #[test]
    fn test_sharing_does_not_change_the_digest() {
        let leaf = Arc::new(Schema::new("string"));
        let shared = specification(holder(Arc::clone(&leaf), true));
        let copied = specification(holder(leaf, false));
        assert_eq!(
            digest_specification(&shared).unwrap(),
            digest_specification(&copied).unwrap()
        );
    }

    #[test]
    fn test_digest_follows_nested_content() {
        let string = specification(holder(Arc::new(Schema::new("string")), true));
        let integer = specification(holder(Arc::new(Schema::new("integer")), true));
        assert_ne!(
            digest_specification(&string).unwrap(),
            digest_specification(&integer).unwrap()
        );
    }
}
