use oas_brake::canonical::{HttpMethod, ParameterLocation};
use oas_brake::compat::BreakingChange;
use oas_brake::{BreakingResult, CheckerOptions, Compatibility, Spec, check_documents};
use serde_json::json;
use serde_yaml::Value;

const PETSTORE: &str = include_str!("data/petstore.yaml");

fn petstore() -> Value {
    serde_yaml::from_str(PETSTORE).unwrap()
}

fn edited(edit: impl FnOnce(&mut Value)) -> String {
    let mut document = petstore();
    edit(&mut document);
    serde_yaml::to_string(&document).unwrap()
}

fn yaml(text: &str) -> Value {
    serde_yaml::from_str(text).unwrap()
}

fn check(old: &str, new: &str) -> BreakingResult {
    check_documents(old, new, &CheckerOptions::default()).unwrap()
}

fn codes(result: &BreakingResult) -> Vec<&'static str> {
    result.changes.iter().map(BreakingChange::rule_code).collect()
}

#[test]
fn test_identical_documents_have_no_breaking_changes() {
    let result = check(PETSTORE, PETSTORE);
    assert!(!result.has_breaking_changes);
    assert!(result.changes.is_empty());
    assert_eq!(result.executed_rules.len(), 18);
}

#[test]
fn test_path_deletion() {
    let new = edited(|doc| {
        doc["paths"].as_mapping_mut().unwrap().remove("/pet/findByStatus");
    });

    let result = check(PETSTORE, &new);
    assert_eq!(
        result.changes,
        vec![BreakingChange::PathDeleted {
            path: "/pet/findByStatus".to_string(),
            method: HttpMethod::Get,
        }]
    );
    assert_eq!(result.summary.get("PATH"), Some(&1));
    assert!(result.changes[0].message().contains("/pet/findByStatus"));
}

#[test]
fn test_deprecated_path_deletion_follows_policy() {
    let old = edited(|doc| {
        doc["paths"]["/pet/findByStatus"]["get"]["deprecated"] = Value::Bool(true);
    });
    let new = edited(|doc| {
        doc["paths"].as_mapping_mut().unwrap().remove("/pet/findByStatus");
    });

    assert!(check(&old, &new).changes.is_empty());

    let strict = CheckerOptions::default().with_deprecated_api_deletion_allowed(false);
    let result = check_documents(&old, &new, &strict).unwrap();
    assert_eq!(codes(&result), vec!["R002"]);
}

#[test]
fn test_narrowed_maximum() {
    let new = edited(|doc| {
        doc["paths"]["/store/order/{orderId}"]["get"]["parameters"][0]["schema"]["maximum"] =
            Value::from(5);
    });

    let result = check(PETSTORE, &new);
    assert_eq!(codes(&result), vec!["R017"]);
    match &result.changes[0] {
        BreakingChange::RequestParameterConstraintChanged { name, change, .. } => {
            assert_eq!(name, "orderId");
            assert_eq!(change.attribute, "maximum");
            assert_eq!(change.old_value.to_string(), "10");
            assert_eq!(change.new_value.to_string(), "5");
        }
        other => panic!("unexpected change {other:?}"),
    }
}

#[test]
fn test_raised_minimum() {
    let new = edited(|doc| {
        doc["paths"]["/store/order/{orderId}"]["get"]["parameters"][0]["schema"]["minimum"] =
            Value::from(3);
    });

    let result = check(PETSTORE, &new);
    let message = result.changes[0].message();
    assert_eq!(codes(&result), vec!["R017"]);
    assert!(message.starts_with("minimum constraint of parameter orderId"), "{message}");
    assert!(message.ends_with("from 1 to 3"), "{message}");
}

#[test]
fn test_widened_bounds_are_compatible() {
    let new = edited(|doc| {
        doc["paths"]["/store/order/{orderId}"]["get"]["parameters"][0]["schema"] =
            yaml("{ type: integer, minimum: 0, maximum: 100 }");
    });
    assert!(check(PETSTORE, &new).changes.is_empty());
}

#[test]
fn test_introduced_maximum() {
    let new = edited(|doc| {
        doc["paths"]["/pet/{petId}"]["get"]["parameters"][0]["schema"]["maximum"] = Value::from(1000);
    });

    let result = check(PETSTORE, &new);
    match result.changes.as_slice() {
        [BreakingChange::RequestParameterConstraintChanged { name, change, .. }] => {
            assert_eq!(name, "petId");
            assert_eq!(change.attribute, "maximum");
            assert_eq!(change.old_value.to_string(), "null");
            assert_eq!(change.new_value.to_string(), "1000");
        }
        other => panic!("unexpected changes {other:?}"),
    }
}

#[test]
fn test_excluded_prefix_hides_changes() {
    let new = edited(|doc| {
        doc["paths"].as_mapping_mut().unwrap().remove("/pet/{petId}");
    });

    assert_eq!(codes(&check(PETSTORE, &new)), vec!["R002"]);

    let options = CheckerOptions::default().with_excluded_paths(["/pet"]);
    let result = check_documents(PETSTORE, &new, &options).unwrap();
    assert!(result.changes.is_empty());
}

#[test]
fn test_check_is_idempotent() {
    let new = edited(|doc| {
        doc["paths"].as_mapping_mut().unwrap().remove("/pet/findByStatus");
        doc["components"]["schemas"]["Order"]["properties"]["status"]["enum"] =
            yaml("[placed, delivered]");
        doc["paths"]["/store/order/{orderId}"]["get"]["parameters"][0]["schema"]["maximum"] =
            Value::from(5);
    });

    let first = check(PETSTORE, &new);
    let second = check(PETSTORE, &new);
    assert_eq!(first, second);
    assert_eq!(codes(&first), vec!["R002", "R017", "R016"]);
}

#[test]
fn test_operation_moved_to_beta() {
    let new = edited(|doc| {
        doc["paths"]["/pet/findByStatus"]["get"]["x-beta-api"] = Value::from("true");
    });

    let result = check(PETSTORE, &new);
    assert_eq!(
        result.changes,
        vec![BreakingChange::StandardApiToBetaApi {
            path: "/pet/findByStatus".to_string(),
            method: HttpMethod::Get,
        }]
    );
}

#[test]
fn test_excluded_operation_moved_to_beta_is_not_reported() {
    let new = edited(|doc| {
        doc["paths"]["/pet/{petId}"]["get"]["x-beta-api"] = Value::Bool(true);
    });

    assert_eq!(codes(&check(PETSTORE, &new)), vec!["R001"]);

    let options = CheckerOptions::default().with_excluded_paths(["/pet"]);
    let result = check_documents(PETSTORE, &new, &options).unwrap();
    assert!(result.changes.is_empty(), "{:?}", result.changes);
}

#[test]
fn test_required_and_added_parameters() {
    let new = edited(|doc| {
        let parameters = &mut doc["paths"]["/pet/findByStatus"]["get"]["parameters"];
        parameters[0]["required"] = Value::Bool(true);
        parameters
            .as_sequence_mut()
            .unwrap()
            .push(yaml("{ name: tags, in: query, required: true, schema: { type: string } }"));
    });

    let result = check(PETSTORE, &new);
    assert_eq!(codes(&result), vec!["R018", "R007"]);
    assert_eq!(
        result.changes[0].message(),
        "tags required parameter has been added to GET /pet/findByStatus"
    );
    assert_eq!(
        result.changes[1].message(),
        "status parameter became required in GET /pet/findByStatus"
    );
}

#[test]
fn test_parameter_enum_and_type_changes() {
    let new = edited(|doc| {
        doc["paths"]["/pet/findByStatus"]["get"]["parameters"][0]["schema"]["enum"] =
            yaml("[available, sold]");
        doc["paths"]["/pet/{petId}"]["get"]["parameters"][0]["schema"] = yaml("{ type: string }");
    });

    let result = check(PETSTORE, &new);
    assert_eq!(codes(&result), vec!["R005", "R008"]);
    assert!(result.changes[0].message().starts_with("Enum value pending has been deleted"));
}

#[test]
fn test_response_enum_value_deleted() {
    let new = edited(|doc| {
        doc["components"]["schemas"]["Order"]["properties"]["status"]["enum"] =
            yaml("[placed, delivered]");
    });

    let result = check(PETSTORE, &new);
    assert_eq!(
        result.changes,
        vec![BreakingChange::ResponseTypeEnumValueDeleted {
            path: "/store/order/{orderId}".to_string(),
            method: HttpMethod::Get,
            code: "200".to_string(),
            attribute: "status".to_string(),
            value: "approved".to_string(),
        }]
    );
    assert_eq!(
        result.changes[0].message(),
        "Enum value approved has been deleted in GET /store/order/{orderId}"
    );
    assert_eq!(result.summary.get("RESPONSE"), Some(&1));
}

#[test]
fn test_response_attribute_removed() {
    let new = edited(|doc| {
        doc["components"]["schemas"]["Order"]["properties"]
            .as_mapping_mut()
            .unwrap()
            .remove("status");
    });

    let result = check(PETSTORE, &new);
    assert_eq!(
        result.changes,
        vec![BreakingChange::ResponseTypeAttributeRemoved {
            path: "/store/order/{orderId}".to_string(),
            method: HttpMethod::Get,
            code: "200".to_string(),
            attribute: "status".to_string(),
        }]
    );
}

#[test]
fn test_response_deleted() {
    let new = edited(|doc| {
        doc["paths"]["/pet/{petId}"]["get"]["responses"]
            .as_mapping_mut()
            .unwrap()
            .remove("404");
    });

    let result = check(PETSTORE, &new);
    assert_eq!(codes(&result), vec!["R012"]);
    assert_eq!(result.changes[0].message(), "Response 404 has been removed from GET /pet/{petId}");
}

#[test]
fn test_recursive_schema_change_is_found() {
    let new = edited(|doc| {
        doc["components"]["schemas"]["Category"]["properties"]["name"] = yaml("{ type: integer }");
    });

    let result = check(PETSTORE, &new);
    assert!(result.has_breaking_changes);
    assert!(
        result
            .changes
            .iter()
            .any(|change| matches!(change, BreakingChange::RequestTypeChanged { attribute, .. } if attribute == "category.name"))
    );
    assert!(
        result
            .changes
            .iter()
            .any(|change| matches!(change, BreakingChange::ResponseTypeChanged { attribute, code, .. } if attribute == "category.name" && code == "200"))
    );
}

#[test]
fn test_request_media_type_deleted() {
    let new = edited(|doc| {
        doc["paths"]["/pet"]["post"]["requestBody"]["content"] = yaml(
            "{ application/xml: { schema: { $ref: '#/components/schemas/Pet' } } }",
        );
    });

    let result = check(PETSTORE, &new);
    assert_eq!(codes(&result), vec!["R003"]);
    assert_eq!(
        result.changes[0].message(),
        "application/json media type request was removed from POST /pet"
    );
}

/// Request body of `POST /pet` as an inline copy of `Pet`, so it can change
/// without touching the responses that share the component.
fn pet_request(edit: impl FnOnce(&mut Value)) -> String {
    edited(|doc| {
        let mut schema = doc["components"]["schemas"]["Pet"].clone();
        edit(&mut schema);
        doc["paths"]["/pet"]["post"]["requestBody"]["content"]["application/json"]["schema"] = schema;
    })
}

#[test]
fn test_inline_request_copy_is_compatible() {
    let new = pet_request(|_| {});
    assert!(check(PETSTORE, &new).changes.is_empty());
}

#[test]
fn test_request_attribute_removed() {
    let new = pet_request(|schema| {
        schema["properties"].as_mapping_mut().unwrap().remove("name");
        schema.as_mapping_mut().unwrap().remove("required");
    });

    let result = check(PETSTORE, &new);
    assert_eq!(
        result.changes,
        vec![BreakingChange::RequestTypeAttributeRemoved {
            path: "/pet".to_string(),
            method: HttpMethod::Post,
            attribute: "name".to_string(),
        }]
    );
}

#[test]
fn test_request_enum_value_deleted() {
    let new = pet_request(|schema| {
        schema["properties"]["status"]["enum"] = yaml("[available, sold]");
    });

    let result = check(PETSTORE, &new);
    assert_eq!(
        result.changes,
        vec![BreakingChange::RequestTypeEnumValueDeleted {
            path: "/pet".to_string(),
            method: HttpMethod::Post,
            attribute: "status".to_string(),
            value: "pending".to_string(),
        }]
    );
}

#[test]
fn test_response_media_type_deleted() {
    let new = edited(|doc| {
        let content = doc["paths"]["/store/order/{orderId}"]["get"]["responses"]["200"]["content"]
            .as_mapping_mut()
            .unwrap();
        let schema = content.remove("application/json").unwrap();
        content.insert(Value::from("application/xml"), schema);
    });

    let result = check(PETSTORE, &new);
    assert_eq!(
        result.changes,
        vec![BreakingChange::ResponseMediaTypeDeleted {
            path: "/store/order/{orderId}".to_string(),
            method: HttpMethod::Get,
            code: "200".to_string(),
            media_type: "application/json".to_string(),
        }]
    );
}

#[test]
fn test_parameter_moved_to_header() {
    let new = edited(|doc| {
        doc["paths"]["/pet/findByStatus"]["get"]["parameters"][0]["in"] = Value::from("header");
    });

    let result = check(PETSTORE, &new);
    assert_eq!(
        result.changes,
        vec![BreakingChange::RequestParameterInTypeChanged {
            path: "/pet/findByStatus".to_string(),
            method: HttpMethod::Get,
            name: "status".to_string(),
            old_location: ParameterLocation::Query,
            new_location: ParameterLocation::Header,
        }]
    );
    assert_eq!(
        result.changes[0].message(),
        "status parameter location was changed in GET /pet/findByStatus from query to header"
    );
}

/// Components that all reference each other, plus a `value` property of the
/// given type on each.
fn densely_connected(count: usize, value_type: &str) -> String {
    let names: Vec<String> = (0..count).map(|i| format!("C{i}")).collect();
    let mut properties = serde_json::Map::new();
    properties.insert("value".to_string(), json!({ "type": value_type }));
    for name in &names {
        properties.insert(
            name.to_lowercase(),
            json!({ "$ref": format!("#/components/schemas/{name}") }),
        );
    }
    let schemas: serde_json::Map<String, serde_json::Value> = names
        .iter()
        .map(|name| (name.clone(), json!({ "type": "object", "properties": properties })))
        .collect();
    let body = json!({ "schema": { "$ref": "#/components/schemas/C0" } });
    json!({
        "openapi": "3.0.3",
        "info": { "title": "Graph", "version": "1" },
        "paths": {
            "/graph": {
                "post": {
                    "requestBody": { "content": { "application/json": body } },
                    "responses": {
                        "200": { "description": "ok", "content": { "application/json": body } }
                    }
                }
            }
        },
        "components": { "schemas": schemas }
    })
    .to_string()
}

#[test]
fn test_densely_connected_components_are_checked() {
    let document = densely_connected(16, "string");
    assert!(check(&document, &document).changes.is_empty());

    let options = CheckerOptions::default();
    let spec = Spec::try_from(&document, &options).unwrap();
    assert_eq!(spec.compare_with(&spec).unwrap(), Compatibility::Green);

    let changed = densely_connected(16, "integer");
    let result = check(&document, &changed);
    assert!(!result.changes.is_empty());
    let unexpected: Vec<_> = result
        .changes
        .iter()
        .filter(|change| !matches!(change.rule_code(), "R010" | "R015"))
        .collect();
    assert!(unexpected.is_empty(), "{unexpected:?}");
}

#[test]
fn test_ignored_rule_codes_are_filtered_after_detection() {
    let new = edited(|doc| {
        doc["paths"].as_mapping_mut().unwrap().remove("/pet/findByStatus");
        doc["paths"]["/store/order/{orderId}"]["get"]["parameters"][0]["schema"]["maximum"] =
            Value::from(5);
    });

    let ignored = ["R017".to_string()].into_iter().collect();
    let result = check(PETSTORE, &new).without_rules(&ignored);
    assert_eq!(codes(&result), vec!["R002"]);
    assert_eq!(result.executed_rules.len(), 18);
}

#[test]
fn test_json_report() {
    let new = edited(|doc| {
        doc["paths"].as_mapping_mut().unwrap().remove("/pet/findByStatus");
    });

    let result = check(PETSTORE, &new);
    let report = serde_json::to_value(result.report()).unwrap();
    let change = &report["breaking_changes"][0];
    assert_eq!(change["rule_code"], "R002");
    assert_eq!(change["category"], "PATH");
    assert_eq!(change["type"], "PathDeleted");
    assert_eq!(change["path"], "/pet/findByStatus");
    assert_eq!(change["method"], "GET");
    assert_eq!(report["has_breaking_changes"], true);
}

#[test]
fn test_swagger_v2_documents() {
    let old = r#"
swagger: '2.0'
info: { title: Store, version: '1' }
produces: [application/json]
paths:
  /order/{orderId}:
    get:
      parameters:
        - { name: orderId, in: path, required: true, type: integer, maximum: 10 }
      responses:
        '200':
          description: An order
          schema:
            $ref: '#/definitions/Order'
  /order:
    delete:
      responses:
        '204':
          description: Deleted
definitions:
  Order:
    type: object
    properties:
      id: { type: integer }
      status: { type: string }
"#;
    let new = r#"
swagger: '2.0'
info: { title: Store, version: '2' }
produces: [application/json]
paths:
  /order/{orderId}:
    get:
      parameters:
        - { name: orderId, in: path, required: true, type: integer, maximum: 10 }
      responses:
        '200':
          description: An order
          schema:
            $ref: '#/definitions/Order'
definitions:
  Order:
    type: object
    properties:
      id: { type: integer }
"#;

    let result = check(old, new);
    assert_eq!(codes(&result), vec!["R002", "R014"]);
    assert_eq!(result.changes[0].path(), "/order");
    assert_eq!(result.changes[0].method(), HttpMethod::Delete);
}

#[test]
fn test_invalid_document_aborts_the_check() {
    let err = check_documents(PETSTORE, "openapi: 3.2.0\npaths: {}\n", &CheckerOptions::default())
        .unwrap_err();
    assert!(err.to_string().contains("3.2.0"), "{err}");
}
