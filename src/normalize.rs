//! Converts a [`RawDocument`] into the normalized [`Specification`] model.
//!
//! Building runs in two phases. The first walks the document once, ingesting
//! every schema it meets (component schemas, parameter, request body and
//! response schemas) into one [`SchemaGraph`] and recording each operation
//! with arena indices in place of schemas. The second transforms those
//! indices into [`Schema`] trees against the finished graph.

use crate::canonical::{
    HttpMethod, ParameterKind, ParameterLocation, Path, Request, RequestParameter, Response,
    Schema, Specification,
};
use crate::document::RawDocument;
use crate::error::{BrakeError, Result};
use crate::options::CheckerOptions;
use crate::raw::{SchemaGraph, SchemaId, escape_pointer};
use crate::store::ReferenceStore;
use crate::transformer::SchemaTransformer;
use crate::type_resolver::TypeResolver;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Longest chain of `$ref` to `$ref` followed for parameters, request bodies
/// and responses.
const MAX_REFERENCE_HOPS: usize = 16;

/// Builds the specification of one document.
pub fn normalize_document(document: &RawDocument, options: &CheckerOptions) -> Result<Specification> {
    SpecificationBuilder::new(document, options).build()
}

//==============================================================================
// Pending model (phase 1)
//==============================================================================

#[derive(Debug)]
struct PendingParameter {
    name: String,
    location: ParameterLocation,
    required: bool,
    schema: Option<SchemaId>,
}

#[derive(Debug, Default)]
struct PendingMedia {
    media: BTreeMap<String, Option<SchemaId>>,
}

#[derive(Debug)]
struct PendingResponse {
    code: String,
    content: PendingMedia,
}

#[derive(Debug)]
struct PendingPath {
    path: String,
    method: HttpMethod,
    deprecated: bool,
    beta_api: bool,
    parameters: Vec<PendingParameter>,
    request: Option<PendingMedia>,
    responses: Vec<PendingResponse>,
}

//==============================================================================
// SpecificationBuilder
//==============================================================================

/// Assembles all operations of one document. Owns the document's schema
/// graph and reference store; nothing is shared with other builders.
pub struct SpecificationBuilder<'a> {
    document: &'a RawDocument,
    options: &'a CheckerOptions,
    graph: SchemaGraph,
    store: ReferenceStore,
}

impl<'a> SpecificationBuilder<'a> {
    pub fn new(document: &'a RawDocument, options: &'a CheckerOptions) -> Self {
        Self {
            document,
            options,
            graph: SchemaGraph::new(),
            store: ReferenceStore::new(),
        }
    }

    pub fn build(mut self) -> Result<Specification> {
        self.ingest_components();
        let pending = self.ingest_paths()?;

        let Self {
            document,
            options,
            graph,
            store,
        } = self;
        let resolver = TypeResolver::new(document.version, options.strict_validation);
        let mut transformer = SchemaTransformer::new(&graph, store, resolver, options);

        let paths = pending
            .into_iter()
            .map(|path| build_path(path, &mut transformer))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            version = %document.version,
            operations = paths.len(),
            schema_nodes = graph.len(),
            named_schemas = transformer.store().len(),
            memoized = transformer.store().transformed_count(),
            "built specification"
        );
        Ok(Specification::new(paths))
    }

    fn ingest_components(&mut self) {
        let Some(schemas) = self
            .document
            .root
            .pointer("/components/schemas")
            .and_then(Value::as_object)
        else {
            return;
        };
        for (name, schema) in schemas {
            let location = format!("#/components/schemas/{}", escape_pointer(name));
            let id = self.graph.ingest(schema, &location);
            self.store.register(name.clone(), id);
        }
        trace!(count = self.store.len(), "registered component schemas");
    }

    fn ingest_paths(&mut self) -> Result<Vec<PendingPath>> {
        let document = self.document;
        let root = &document.root;
        let Some(paths) = root.get("paths").and_then(Value::as_object) else {
            warn!("document has no paths");
            return Ok(Vec::new());
        };

        let mut pending = Vec::new();
        for (path, item) in paths {
            let location = format!("#/paths/{}", escape_pointer(path));
            let item = resolve_object(root, item, &location)?;
            let mut builder = PathBuilder {
                root,
                options: self.options,
                graph: &mut self.graph,
                path,
                location: &location,
            };
            pending.extend(builder.ingest(item)?);
        }
        Ok(pending)
    }
}

fn build_path(pending: PendingPath, transformer: &mut SchemaTransformer<'_>) -> Result<Path> {
    let mut path = Path::new(pending.path, pending.method);
    path.deprecated = pending.deprecated;
    path.beta_api = pending.beta_api;

    for parameter in pending.parameters {
        let schema = match parameter.schema {
            Some(id) => Some(transformer.transform(id)?),
            None => None,
        };
        path.parameters.push(RequestParameter {
            name: parameter.name,
            location: parameter.location,
            required: parameter.required,
            type_name: schema.as_ref().map(|s| s.type_name.clone()),
            kind: ParameterKind::of(schema.as_deref()),
            schema,
        });
    }

    if let Some(request) = pending.request {
        path.request = Some(Request {
            media: transform_media(request, transformer)?,
        });
    }

    for response in pending.responses {
        path.responses.push(Response {
            code: response.code,
            media: transform_media(response.content, transformer)?,
        });
    }

    Ok(path)
}

fn transform_media(
    pending: PendingMedia,
    transformer: &mut SchemaTransformer<'_>,
) -> Result<BTreeMap<String, Arc<Schema>>> {
    let mut media = BTreeMap::new();
    for (media_type, schema) in pending.media {
        let schema = match schema {
            Some(id) => transformer.transform(id)?,
            None => Arc::new(Schema::new("object")),
        };
        media.insert(media_type, schema);
    }
    Ok(media)
}

//==============================================================================
// PathBuilder
//==============================================================================

/// Extracts the operations of one path item.
struct PathBuilder<'b> {
    root: &'b Value,
    options: &'b CheckerOptions,
    graph: &'b mut SchemaGraph,
    path: &'b str,
    location: &'b str,
}

impl PathBuilder<'_> {
    fn ingest(&mut self, item: &Map<String, Value>) -> Result<Vec<PendingPath>> {
        let shared = match item.get("parameters") {
            Some(parameters) => self.parameters(parameters, &format!("{}/parameters", self.location))?,
            None => Vec::new(),
        };

        let mut operations = Vec::new();
        for method in HttpMethod::ALL {
            let Some(operation) = item.get(method.key()).and_then(Value::as_object) else {
                continue;
            };
            let location = format!("{}/{}", self.location, method.key());
            operations.push(self.operation(method, operation, &shared, &location)?);
        }
        Ok(operations)
    }

    fn operation(
        &mut self,
        method: HttpMethod,
        operation: &Map<String, Value>,
        shared: &[PendingParameter],
        location: &str,
    ) -> Result<PendingPath> {
        let own = match operation.get("parameters") {
            Some(parameters) => self.parameters(parameters, &format!("{location}/parameters"))?,
            None => Vec::new(),
        };
        let parameters = merge_parameters(shared, own);

        let request = match operation.get("requestBody") {
            Some(body) => {
                let body_location = format!("{location}/requestBody");
                let body = resolve_object(self.root, body, &body_location)?;
                Some(self.content(body, &body_location))
            }
            None => None,
        };

        let mut responses = Vec::new();
        if let Some(entries) = operation.get("responses").and_then(Value::as_object) {
            for (code, response) in entries {
                let response_location = format!("{location}/responses/{}", escape_pointer(code));
                let response = resolve_object(self.root, response, &response_location)?;
                responses.push(PendingResponse {
                    code: code.clone(),
                    content: self.content(response, &response_location),
                });
            }
        }

        let beta_api = operation
            .get(&self.options.beta_api_extension_name)
            .is_some_and(|value| to_boolean(&extension_text(value)));

        trace!(path = self.path, %method, beta_api, "ingested operation");
        Ok(PendingPath {
            path: self.path.to_string(),
            method,
            deprecated: operation
                .get("deprecated")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            beta_api,
            parameters,
            request,
            responses,
        })
    }

    fn parameters(&mut self, parameters: &Value, location: &str) -> Result<Vec<PendingParameter>> {
        let Some(parameters) = parameters.as_array() else {
            return Ok(Vec::new());
        };

        let mut result = Vec::with_capacity(parameters.len());
        for (index, parameter) in parameters.iter().enumerate() {
            let location = format!("{location}/{index}");
            let parameter = resolve_object(self.root, parameter, &location)?;

            let Some(name) = parameter.get("name").and_then(Value::as_str) else {
                warn!(location, "parameter without a name, skipping it");
                continue;
            };
            let Some(parameter_location) = parameter
                .get("in")
                .and_then(Value::as_str)
                .and_then(ParameterLocation::from_key)
            else {
                warn!(location, name, "parameter with an unknown location, skipping it");
                continue;
            };

            result.push(PendingParameter {
                name: name.to_string(),
                location: parameter_location,
                required: parameter
                    .get("required")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                schema: self.parameter_schema(parameter, &location),
            });
        }
        Ok(result)
    }

    /// The `schema` of a parameter, or the schema of its first `content`
    /// entry.
    fn parameter_schema(&mut self, parameter: &Map<String, Value>, location: &str) -> Option<SchemaId> {
        if let Some(schema) = parameter.get("schema") {
            return Some(self.graph.ingest(schema, &format!("{location}/schema")));
        }
        let (media_type, media) = parameter
            .get("content")
            .and_then(Value::as_object)?
            .iter()
            .next()?;
        let schema = media.get("schema")?;
        Some(self.graph.ingest(
            schema,
            &format!("{location}/content/{}/schema", escape_pointer(media_type)),
        ))
    }

    fn content(&mut self, holder: &Map<String, Value>, location: &str) -> PendingMedia {
        let mut pending = PendingMedia::default();
        let Some(content) = holder.get("content").and_then(Value::as_object) else {
            return pending;
        };
        for (media_type, media) in content {
            let schema = media.get("schema").map(|schema| {
                self.graph.ingest(
                    schema,
                    &format!("{location}/content/{}/schema", escape_pointer(media_type)),
                )
            });
            pending.media.insert(media_type.clone(), schema);
        }
        pending
    }
}

/// Path-item parameters followed by the operation's own; an operation
/// parameter replaces a path-item one with the same name and location.
fn merge_parameters(shared: &[PendingParameter], own: Vec<PendingParameter>) -> Vec<PendingParameter> {
    let mut merged: Vec<PendingParameter> = shared
        .iter()
        .filter(|s| !own.iter().any(|o| o.name == s.name && o.location == s.location))
        .map(|s| PendingParameter {
            name: s.name.clone(),
            location: s.location,
            required: s.required,
            schema: s.schema,
        })
        .collect();
    merged.extend(own);
    merged
}

/// Follows local `$ref`s until a non-reference object is reached.
fn resolve_object<'v>(root: &'v Value, value: &'v Value, location: &str) -> Result<&'v Map<String, Value>> {
    let mut current = value;
    for _ in 0..MAX_REFERENCE_HOPS {
        let Some(reference) = current.get("$ref").and_then(Value::as_str) else {
            return current.as_object().ok_or_else(|| BrakeError::Parse(format!(
                "expected a mapping at {location}"
            )));
        };
        current = reference
            .strip_prefix('#')
            .and_then(|pointer| root.pointer(pointer))
            .ok_or_else(|| BrakeError::UnresolvedReference {
                reference: reference.to_string(),
                location: location.to_string(),
            })?;
    }
    Err(BrakeError::UnresolvedReference {
        reference: format!("reference chain longer than {MAX_REFERENCE_HOPS}"),
        location: location.to_string(),
    })
}

fn extension_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// `true`, `yes`, `on`, `y` and `t` in any case are true; everything else is
/// false.
fn to_boolean(text: &str) -> bool {
    ["true", "yes", "on", "y", "t"]
        .iter()
        .any(|truthy| text.eq_ignore_ascii_case(truthy))
}
