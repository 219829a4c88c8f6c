//! Conversion of Swagger 2.0 documents into the OpenAPI 3.0 shape.
//!
//! Only the parts the comparison reads are converted: schemas, parameters,
//! request bodies and responses, plus the document-level metadata that is
//! carried along unchanged.

use serde_json::{Map, Value, json};
use std::collections::HashSet;

const DEFAULT_MEDIA_TYPE: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART: &str = "multipart/form-data";
const V2_METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];

/// Parameter fields that describe the value and move under `schema` in 3.0.
const SCHEMA_FIELDS: [&str; 15] = [
    "type",
    "format",
    "items",
    "enum",
    "default",
    "maximum",
    "minimum",
    "exclusiveMaximum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "maxItems",
    "minItems",
    "uniqueItems",
];

/// Result of an upgrade: the converted tree and what was lost on the way.
#[derive(Debug, Clone)]
pub struct Upgraded {
    pub document: Value,
    pub diagnostics: Vec<String>,
}

pub fn is_swagger_v2(root: &Value) -> bool {
    match root.get("swagger") {
        Some(Value::String(version)) => version.trim().starts_with("2."),
        Some(Value::Number(version)) => version.as_f64().is_some_and(|v| (2.0..3.0).contains(&v)),
        _ => false,
    }
}

pub fn upgrade_v2(root: &Value) -> Upgraded {
    let mut converter = Converter::new(root);
    let document = converter.convert();
    Upgraded {
        document,
        diagnostics: converter.diagnostics,
    }
}

struct Converter<'a> {
    root: &'a Value,
    /// Names of global parameters declared `in: body`; their references turn
    /// into request body references.
    body_parameters: HashSet<String>,
    consumes: Vec<String>,
    produces: Vec<String>,
    diagnostics: Vec<String>,
}

impl<'a> Converter<'a> {
    fn new(root: &'a Value) -> Self {
        let body_parameters = root
            .get("parameters")
            .and_then(Value::as_object)
            .map(|parameters| {
                parameters
                    .iter()
                    .filter(|(_, p)| p.get("in").and_then(Value::as_str) == Some("body"))
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            root,
            body_parameters,
            consumes: media_types(root.get("consumes")),
            produces: media_types(root.get("produces")),
            diagnostics: vec!["Swagger 2.0 definition converted to OpenAPI 3.0.3".to_string()],
        }
    }

    fn convert(&mut self) -> Value {
        let root = self.root;
        let mut document = Map::new();
        document.insert("openapi".to_string(), json!("3.0.3"));

        if let Some(object) = root.as_object() {
            for (key, value) in object {
                if key.starts_with("x-") || matches!(key.as_str(), "info" | "tags" | "externalDocs" | "security")
                {
                    document.insert(key.clone(), value.clone());
                }
            }
        }

        if let Some(server) = self.server_url() {
            document.insert("servers".to_string(), json!([{ "url": server }]));
        }

        let mut components = Map::new();
        if let Some(definitions) = root.get("definitions") {
            components.insert("schemas".to_string(), self.rewrite_refs(definitions));
        }
        if let Some(security) = root.get("securityDefinitions") {
            components.insert("securitySchemes".to_string(), security.clone());
            self.diagnostics
                .push("securityDefinitions copied without conversion".to_string());
        }
        self.convert_global_parameters(&mut components);
        if let Some(responses) = root.get("responses").and_then(Value::as_object) {
            let produces = self.produces.clone();
            let converted: Map<String, Value> = responses
                .iter()
                .map(|(name, response)| (name.clone(), self.convert_response(response, &produces)))
                .collect();
            components.insert("responses".to_string(), Value::Object(converted));
        }
        if !components.is_empty() {
            document.insert("components".to_string(), Value::Object(components));
        }

        let mut paths = Map::new();
        if let Some(source) = root.get("paths").and_then(Value::as_object) {
            for (path, item) in source {
                paths.insert(path.clone(), self.convert_path_item(path, item));
            }
        }
        document.insert("paths".to_string(), Value::Object(paths));

        Value::Object(document)
    }

    fn server_url(&self) -> Option<String> {
        let host = self.root.get("host").and_then(Value::as_str)?;
        let base_path = self
            .root
            .get("basePath")
            .and_then(Value::as_str)
            .unwrap_or("");
        let scheme = self
            .root
            .get("schemes")
            .and_then(Value::as_array)
            .and_then(|schemes| schemes.first())
            .and_then(Value::as_str)
            .unwrap_or("https");
        Some(format!("{scheme}://{host}{base_path}"))
    }

    fn convert_global_parameters(&mut self, components: &mut Map<String, Value>) {
        let root = self.root;
        let Some(parameters) = root.get("parameters").and_then(Value::as_object) else {
            return;
        };

        let mut converted = Map::new();
        let mut bodies = Map::new();
        let consumes = self.consumes.clone();
        for (name, parameter) in parameters {
            match parameter.get("in").and_then(Value::as_str) {
                Some("body") => {
                    bodies.insert(name.clone(), self.body_to_request(parameter, &consumes));
                }
                Some("formData") => {
                    self.diagnostics.push(format!(
                        "global formData parameter {name} cannot be referenced as a request body and was dropped"
                    ));
                }
                _ => {
                    converted.insert(name.clone(), self.convert_parameter(parameter));
                }
            }
        }

        if !converted.is_empty() {
            components.insert("parameters".to_string(), Value::Object(converted));
        }
        if !bodies.is_empty() {
            components.insert("requestBodies".to_string(), Value::Object(bodies));
        }
    }

    fn convert_path_item(&mut self, path: &str, item: &Value) -> Value {
        let Some(item) = item.as_object() else {
            return Value::Object(Map::new());
        };

        let mut converted = Map::new();
        let shared: Vec<Value> = item
            .get("parameters")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for (key, value) in item {
            if key.starts_with("x-") {
                converted.insert(key.clone(), value.clone());
            } else if key == "$ref" {
                self.diagnostics
                    .push(format!("path item reference at {path} is not followed"));
            }
        }

        for method in V2_METHODS {
            if let Some(operation) = item.get(method) {
                converted.insert(
                    method.to_string(),
                    self.convert_operation(operation, &shared),
                );
            }
        }

        Value::Object(converted)
    }

    fn convert_operation(&mut self, operation: &Value, shared: &[Value]) -> Value {
        let Some(source) = operation.as_object() else {
            return Value::Object(Map::new());
        };

        let mut converted = Map::new();
        for (key, value) in source {
            if key.starts_with("x-")
                || matches!(
                    key.as_str(),
                    "operationId" | "summary" | "description" | "tags" | "deprecated" | "security"
                )
            {
                converted.insert(key.clone(), value.clone());
            }
        }

        let consumes = source
            .get("consumes")
            .map(|c| media_types(Some(c)))
            .unwrap_or_else(|| self.consumes.clone());
        let produces = source
            .get("produces")
            .map(|p| media_types(Some(p)))
            .unwrap_or_else(|| self.produces.clone());

        let own: Vec<Value> = source
            .get("parameters")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut parameters = Vec::new();
        let mut request_body = None;
        let mut form_properties = Map::new();
        let mut form_required = Vec::new();

        for parameter in merge_parameters(shared, &own) {
            if let Some(reference) = parameter.get("$ref").and_then(Value::as_str) {
                let name = reference.trim_start_matches("#/parameters/");
                if self.body_parameters.contains(name) {
                    request_body = Some(json!({ "$ref": format!("#/components/requestBodies/{name}") }));
                } else {
                    parameters.push(json!({ "$ref": format!("#/components/parameters/{name}") }));
                }
                continue;
            }

            match parameter.get("in").and_then(Value::as_str) {
                Some("body") => {
                    request_body = Some(self.body_to_request(&parameter, &consumes));
                }
                Some("formData") => {
                    let Some(name) = parameter.get("name").and_then(Value::as_str) else {
                        continue;
                    };
                    if parameter.get("required").and_then(Value::as_bool) == Some(true) {
                        form_required.push(json!(name));
                    }
                    form_properties.insert(name.to_string(), self.schema_of(&parameter));
                }
                _ => parameters.push(self.convert_parameter(&parameter)),
            }
        }

        if !form_properties.is_empty() {
            if request_body.is_some() {
                self.diagnostics
                    .push("operation declares both body and formData parameters, keeping body".to_string());
            } else {
                let media_type = if consumes.iter().any(|c| c == MULTIPART) {
                    MULTIPART
                } else {
                    FORM_URLENCODED
                };
                let mut schema = json!({ "type": "object", "properties": form_properties });
                if !form_required.is_empty() {
                    schema["required"] = Value::Array(form_required);
                }
                request_body = Some(json!({ "content": { media_type: { "schema": schema } } }));
            }
        }

        if !parameters.is_empty() {
            converted.insert("parameters".to_string(), Value::Array(parameters));
        }
        if let Some(body) = request_body {
            converted.insert("requestBody".to_string(), body);
        }

        if let Some(responses) = source.get("responses").and_then(Value::as_object) {
            let converted_responses: Map<String, Value> = responses
                .iter()
                .map(|(code, response)| (code.clone(), self.convert_response(response, &produces)))
                .collect();
            converted.insert("responses".to_string(), Value::Object(converted_responses));
        }

        Value::Object(converted)
    }

    fn body_to_request(&mut self, parameter: &Value, consumes: &[String]) -> Value {
        let schema = parameter
            .get("schema")
            .map(|s| self.rewrite_refs(s))
            .unwrap_or_else(|| json!({}));
        let content: Map<String, Value> = consumes
            .iter()
            .map(|media_type| (media_type.clone(), json!({ "schema": schema.clone() })))
            .collect();

        let mut body = Map::new();
        body.insert("content".to_string(), Value::Object(content));
        for key in ["description", "required"] {
            if let Some(value) = parameter.get(key) {
                body.insert(key.to_string(), value.clone());
            }
        }
        Value::Object(body)
    }

    fn convert_parameter(&mut self, parameter: &Value) -> Value {
        if let Some(reference) = parameter.get("$ref") {
            return json!({ "$ref": reference.clone() });
        }
        let Some(source) = parameter.as_object() else {
            return parameter.clone();
        };

        let mut converted = Map::new();
        for (key, value) in source {
            if key.starts_with("x-")
                || matches!(
                    key.as_str(),
                    "name" | "in" | "required" | "description" | "deprecated" | "allowEmptyValue"
                )
            {
                converted.insert(key.clone(), value.clone());
            }
        }
        if source.contains_key("collectionFormat") {
            let name = source.get("name").and_then(Value::as_str).unwrap_or_default();
            self.diagnostics
                .push(format!("collectionFormat of parameter {name} is not represented"));
        }
        converted.insert("schema".to_string(), self.schema_of(parameter));
        Value::Object(converted)
    }

    /// Builds a schema object from the type fields of a non-body parameter or
    /// header.
    fn schema_of(&mut self, parameter: &Value) -> Value {
        let mut schema = Map::new();
        if let Some(source) = parameter.as_object() {
            for key in SCHEMA_FIELDS {
                if let Some(value) = source.get(key) {
                    schema.insert(key.to_string(), self.rewrite_refs(value));
                }
            }
        }
        if schema.get("type").and_then(Value::as_str) == Some("file") {
            schema.insert("type".to_string(), json!("string"));
            schema.insert("format".to_string(), json!("binary"));
        }
        Value::Object(schema)
    }

    fn convert_response(&mut self, response: &Value, produces: &[String]) -> Value {
        if let Some(reference) = response.get("$ref").and_then(Value::as_str) {
            let name = reference.trim_start_matches("#/responses/");
            return json!({ "$ref": format!("#/components/responses/{name}") });
        }

        let mut converted = Map::new();
        converted.insert(
            "description".to_string(),
            response.get("description").cloned().unwrap_or_else(|| json!("")),
        );

        if let Some(schema) = response.get("schema") {
            let schema = self.rewrite_refs(schema);
            let content: Map<String, Value> = produces
                .iter()
                .map(|media_type| (media_type.clone(), json!({ "schema": schema.clone() })))
                .collect();
            converted.insert("content".to_string(), Value::Object(content));
        }

        if let Some(headers) = response.get("headers").and_then(Value::as_object) {
            let headers: Map<String, Value> = headers
                .iter()
                .map(|(name, header)| {
                    let mut converted = Map::new();
                    if let Some(description) = header.get("description") {
                        converted.insert("description".to_string(), description.clone());
                    }
                    converted.insert("schema".to_string(), self.schema_of(header));
                    (name.clone(), Value::Object(converted))
                })
                .collect();
            converted.insert("headers".to_string(), Value::Object(headers));
        }

        Value::Object(converted)
    }

    /// Copies a schema tree, pointing `#/definitions/` references at
    /// `#/components/schemas/`.
    fn rewrite_refs(&self, value: &Value) -> Value {
        match value {
            Value::Object(object) => Value::Object(
                object
                    .iter()
                    .map(|(key, value)| {
                        let value = match (key.as_str(), value) {
                            ("$ref", Value::String(reference)) => {
                                Value::String(rewrite_reference(reference))
                            }
                            _ => self.rewrite_refs(value),
                        };
                        (key.clone(), value)
                    })
                    .collect(),
            ),
            Value::Array(items) => {
                Value::Array(items.iter().map(|item| self.rewrite_refs(item)).collect())
            }
            _ => value.clone(),
        }
    }
}

fn rewrite_reference(reference: &str) -> String {
    match reference.strip_prefix("#/definitions/") {
        Some(name) => format!("#/components/schemas/{name}"),
        None => reference.to_string(),
    }
}

fn media_types(value: Option<&Value>) -> Vec<String> {
    let declared: Vec<String> = value
        .and_then(Value::as_array)
        .map(|types| {
            types
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if declared.is_empty() {
        vec![DEFAULT_MEDIA_TYPE.to_string()]
    } else {
        declared
    }
}

/// Path-level parameters followed by operation parameters, the latter
/// replacing the former on the same name and location.
fn merge_parameters(shared: &[Value], own: &[Value]) -> Vec<Value> {
    let key = |p: &Value| {
        (
            p.get("name").and_then(Value::as_str).map(str::to_string),
            p.get("in").and_then(Value::as_str).map(str::to_string),
        )
    };
    let overridden: HashSet<_> = own
        .iter()
        .filter(|p| p.get("$ref").is_none())
        .map(key)
        .collect();

    shared
        .iter()
        .filter(|p| p.get("$ref").is_some() || !overridden.contains(&key(p)))
        .chain(own.iter())
        .cloned()
        .collect()
}
