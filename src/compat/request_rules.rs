//! Request rules: parameters and request bodies

use crate::canonical::Specification;
use crate::compat::constraint::compare_parameter;
use crate::compat::handlers::{
    SchemaDiff, matched_parameters, matched_paths, matched_request_media, parameter_enum_values,
};
use crate::compat::types::{BreakingChange, RuleContext, RuleResult};
use std::collections::BTreeSet;

/// R003 - a request body media type was removed.
pub fn check_request_media_type_deleted(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        let Some(request) = &path.request else {
            continue;
        };
        for media_type in request.media.keys() {
            let still_there = new_path
                .request
                .as_ref()
                .is_some_and(|r| r.media.contains_key(media_type));
            if !still_there {
                changes.insert(BreakingChange::RequestMediaTypeDeleted {
                    path: path.path.clone(),
                    method: path.method,
                    media_type: media_type.clone(),
                });
            }
        }
    }
    RuleResult::with_changes(changes)
}

/// R004 - a parameter (by name) was removed.
pub fn check_request_parameter_deleted(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for parameter in &path.parameters {
            if new_path.parameter(&parameter.name).is_none() {
                changes.insert(BreakingChange::RequestParameterDeleted {
                    path: path.path.clone(),
                    method: path.method,
                    name: parameter.name.clone(),
                });
            }
        }
    }
    RuleResult::with_changes(changes)
}

/// R005 - an enum value of a parameter was removed.
pub fn check_request_parameter_enum_value_deleted(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for (parameter, new_parameter) in matched_parameters(path, new_path) {
            let new_values = parameter_enum_values(new_parameter);
            if new_values.is_empty() {
                continue;
            }
            for value in parameter_enum_values(parameter).difference(&new_values) {
                changes.insert(BreakingChange::RequestParameterEnumValueDeleted {
                    path: path.path.clone(),
                    method: path.method,
                    name: parameter.name.clone(),
                    value: value.to_string(),
                });
            }
        }
    }
    RuleResult::with_changes(changes)
}

/// R006 - a parameter moved to another location.
pub fn check_request_parameter_in_type_changed(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for (parameter, new_parameter) in matched_parameters(path, new_path) {
            if parameter.location != new_parameter.location {
                changes.insert(BreakingChange::RequestParameterInTypeChanged {
                    path: path.path.clone(),
                    method: path.method,
                    name: parameter.name.clone(),
                    old_location: parameter.location,
                    new_location: new_parameter.location,
                });
            }
        }
    }
    RuleResult::with_changes(changes)
}

/// R007 - an optional parameter became required.
pub fn check_request_parameter_required(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for (parameter, new_parameter) in matched_parameters(path, new_path) {
            if !parameter.required && new_parameter.required {
                changes.insert(BreakingChange::RequestParameterRequired {
                    path: path.path.clone(),
                    method: path.method,
                    name: parameter.name.clone(),
                });
            }
        }
    }
    RuleResult::with_changes(changes)
}

/// R008 - the declared type of a parameter changed.
pub fn check_request_parameter_type_changed(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for (parameter, new_parameter) in matched_parameters(path, new_path) {
            let (Some(old_type), Some(new_type)) = (&parameter.type_name, &new_parameter.type_name) else {
                continue;
            };
            if old_type != new_type {
                changes.insert(BreakingChange::RequestParameterTypeChanged {
                    path: path.path.clone(),
                    method: path.method,
                    name: parameter.name.clone(),
                    old_type: old_type.clone(),
                    new_type: new_type.clone(),
                });
            }
        }
    }
    RuleResult::with_changes(changes)
}

/// R009 - an attribute of a request body was removed.
pub fn check_request_type_attribute_removed(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for (_, schema, new_schema) in matched_request_media(path, new_path) {
            for attribute in SchemaDiff::between(schema, new_schema).removed {
                changes.insert(BreakingChange::RequestTypeAttributeRemoved {
                    path: path.path.clone(),
                    method: path.method,
                    attribute,
                });
            }
        }
    }
    RuleResult::with_changes(changes)
}

/// R010 - the type of a request body attribute changed.
pub fn check_request_type_changed(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for (_, schema, new_schema) in matched_request_media(path, new_path) {
            let diff = SchemaDiff::between(schema, new_schema);
            for (attribute, old_type, new_type) in diff.changed_types {
                changes.insert(BreakingChange::RequestTypeChanged {
                    path: path.path.clone(),
                    method: path.method,
                    attribute,
                    old_type,
                    new_type,
                });
            }
        }
    }
    RuleResult::with_changes(changes)
}

/// R011 - an enum value inside a request body was removed.
pub fn check_request_type_enum_value_deleted(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for (_, schema, new_schema) in matched_request_media(path, new_path) {
            let diff = SchemaDiff::between(schema, new_schema);
            for (attribute, value) in diff.deleted_enum_values {
                changes.insert(BreakingChange::RequestTypeEnumValueDeleted {
                    path: path.path.clone(),
                    method: path.method,
                    attribute,
                    value,
                });
            }
        }
    }
    RuleResult::with_changes(changes)
}

/// R017 - a parameter constraint was narrowed.
pub fn check_request_parameter_constraint_changed(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for (parameter, new_parameter) in matched_parameters(path, new_path) {
            for change in compare_parameter(&parameter.kind, &new_parameter.kind) {
                changes.insert(BreakingChange::RequestParameterConstraintChanged {
                    path: path.path.clone(),
                    method: path.method,
                    name: parameter.name.clone(),
                    change,
                });
            }
        }
    }
    RuleResult::with_changes(changes)
}

/// R018 - a required parameter appeared. New optional parameters are fine.
pub fn check_request_parameter_added(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, new_path) in matched_paths(old, new, context) {
        for parameter in &new_path.parameters {
            if parameter.required && path.parameter(&parameter.name).is_none() {
                changes.insert(BreakingChange::RequestParameterAdded {
                    path: path.path.clone(),
                    method: path.method,
                    name: parameter.name.clone(),
                });
            }
        }
    }
    RuleResult::with_changes(changes)
}
