//! Response rules

use crate::canonical::Specification;
use crate::compat::handlers::{SchemaDiff, matched_media, matched_paths, matched_responses};
use crate::compat::types::{BreakingChange, RuleContext, RuleResult};
use std::collections::BTreeSet;

/// R012 - a response code was removed.
pub fn check_response_deleted(old: &Specification, new: &Specification, context: &RuleContext) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for response in &path.responses {
            if new_path.response(&response.code).is_none() {
                changes.insert(BreakingChange::ResponseDeleted {
                    path: path.path.clone(),
                    method: path.method,
                    code: response.code.clone(),
                });
            }
        }
    }
    RuleResult::with_changes(changes)
}

/// R013 - a media type of a response was removed.
pub fn check_response_media_type_deleted(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for (response, new_response) in matched_responses(path, new_path) {
            for media_type in response.media.keys() {
                if !new_response.media.contains_key(media_type) {
                    changes.insert(BreakingChange::ResponseMediaTypeDeleted {
                        path: path.path.clone(),
                        method: path.method,
                        code: response.code.clone(),
                        media_type: media_type.clone(),
                    });
                }
            }
        }
    }
    RuleResult::with_changes(changes)
}

/// R014 - an attribute of a response was removed. Attributes already
/// deprecated in the old schema may go.
pub fn check_response_type_attribute_removed(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for (response, new_response) in matched_responses(path, new_path) {
            for (_, schema, new_schema) in matched_media(&response.media, &new_response.media) {
                let diff = SchemaDiff::between_non_deprecated(schema, new_schema);
                for attribute in diff.removed {
                    changes.insert(BreakingChange::ResponseTypeAttributeRemoved {
                        path: path.path.clone(),
                        method: path.method,
                        code: response.code.clone(),
                        attribute,
                    });
                }
            }
        }
    }
    RuleResult::with_changes(changes)
}

/// R015 - the type of a response attribute changed.
pub fn check_response_type_changed(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for (response, new_response) in matched_responses(path, new_path) {
            for (_, schema, new_schema) in matched_media(&response.media, &new_response.media) {
                let diff = SchemaDiff::between(schema, new_schema);
                for (attribute, old_type, new_type) in diff.changed_types {
                    changes.insert(BreakingChange::ResponseTypeChanged {
                        path: path.path.clone(),
                        method: path.method,
                        code: response.code.clone(),
                        attribute,
                        old_type,
                        new_type,
                    });
                }
            }
        }
    }
    RuleResult::with_changes(changes)
}

/// R016 - an enum value inside a response was removed. Kept per response
/// code, reported once per attribute and value.
pub fn check_response_type_enum_value_deleted(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for (response, new_response) in matched_responses(path, new_path) {
            for (_, schema, new_schema) in matched_media(&response.media, &new_response.media) {
                let diff = SchemaDiff::between(schema, new_schema);
                for (attribute, value) in diff.deleted_enum_values {
                    changes.insert(BreakingChange::ResponseTypeEnumValueDeleted {
                        path: path.path.clone(),
                        method: path.method,
                        code: response.code.clone(),
                        attribute,
                        value,
                    });
                }
            }
        }
    }
    RuleResult::with_changes(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{HttpMethod, Path, Response, Schema, SchemaAttribute};
    use crate::options::CheckerOptions;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn status(values: &[&str]) -> Schema {
        let mut status = Schema::new("string");
        status.enum_values = values.iter().map(|v| v.to_string()).collect();
        let mut order = Schema::new("object");
        order.attributes.push(SchemaAttribute {
            name: "status".to_string(),
            schema: Some(Arc::new(status)),
            required: false,
            deprecated: false,
        });
        order
    }

    fn spec(codes: &[&str], schema: &Schema) -> Specification {
        let mut path = Path::new("/order", HttpMethod::Get);
        for code in codes {
            path.responses.push(Response {
                code: code.to_string(),
                media: BTreeMap::from([("application/json".to_string(), Arc::new(schema.clone()))]),
            });
        }
        Specification::new(vec![path])
    }

    #[test]
    fn test_enum_deletion_per_code() {
        let old = spec(&["200", "201"], &status(&["placed", "approved"]));
        let new = spec(&["200", "201"], &status(&["placed"]));
        let context = RuleContext::new(&CheckerOptions::default()).unwrap();
        let changes = check_response_type_enum_value_deleted(&old, &new, &context).changes;
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.message() == "Enum value approved has been deleted in GET /order"));
    }

    #[test]
    fn test_response_deleted() {
        let schema = status(&[]);
        let old = spec(&["200", "404"], &schema);
        let new = spec(&["200"], &schema);
        let context = RuleContext::new(&CheckerOptions::default()).unwrap();
        let changes: Vec<_> = check_response_deleted(&old, &new, &context).changes.into_iter().collect();
        assert_eq!(
            changes,
            vec![BreakingChange::ResponseDeleted {
                path: "/order".to_string(),
                method: HttpMethod::Get,
                code: "404".to_string(),
            }]
        );
    }
}
