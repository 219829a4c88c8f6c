//! Shared walking helpers for the rules
//!
//! Rules compare an old operation with its counterpart in the new
//! specification. The helpers here pair up operations, responses and media
//! types, and diff schemas pairwise by attribute path.

use crate::canonical::{
    AttributeType, Path, ROOT_ATTRIBUTE, RequestParameter, Response, Schema, Specification,
};
use crate::compat::types::RuleContext;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ptr;
use std::sync::Arc;
use tracing::trace;

/// Old operations that are not skipped, each with its counterpart in the new
/// specification when there is one. Ordered by path, then method.
pub fn compared_paths<'a>(
    old: &'a Specification,
    new: &'a Specification,
    context: &RuleContext,
) -> Vec<(&'a Path, Option<&'a Path>)> {
    old.sorted_paths()
        .into_iter()
        .filter(|path| !context.skipper.should_skip(path))
        .map(|path| (path, new.get_path(path)))
        .collect()
}

/// Old operations that still exist in the new specification.
pub fn matched_paths<'a>(
    old: &'a Specification,
    new: &'a Specification,
    context: &RuleContext,
) -> Vec<(&'a Path, &'a Path)> {
    compared_paths(old, new, context)
        .into_iter()
        .filter_map(|(old_path, new_path)| new_path.map(|new_path| (old_path, new_path)))
        .collect()
}

/// Parameters present (by name) on both sides.
pub fn matched_parameters<'a>(
    old: &'a Path,
    new: &'a Path,
) -> Vec<(&'a RequestParameter, &'a RequestParameter)> {
    old.parameters
        .iter()
        .filter_map(|parameter| new.parameter(&parameter.name).map(|n| (parameter, n)))
        .collect()
}

/// Responses present (by code) on both sides.
pub fn matched_responses<'a>(old: &'a Path, new: &'a Path) -> Vec<(&'a Response, &'a Response)> {
    old.responses
        .iter()
        .filter_map(|response| new.response(&response.code).map(|n| (response, n)))
        .collect()
}

/// Schemas of the media types present on both sides.
pub fn matched_media<'a>(
    old: &'a BTreeMap<String, Arc<Schema>>,
    new: &'a BTreeMap<String, Arc<Schema>>,
) -> Vec<(&'a str, &'a Schema, &'a Schema)> {
    old.iter()
        .filter_map(|(media_type, schema)| {
            new.get(media_type)
                .map(|new_schema| (media_type.as_str(), schema.as_ref(), new_schema.as_ref()))
        })
        .collect()
}

/// Request body schemas of both operations, by media type.
pub fn matched_request_media<'a>(old: &'a Path, new: &'a Path) -> Vec<(&'a str, &'a Schema, &'a Schema)> {
    match (&old.request, &new.request) {
        (Some(old_request), Some(new_request)) => matched_media(&old_request.media, &new_request.media),
        _ => Vec::new(),
    }
}

/// Differences between two schema trees, found by walking both side by side.
///
/// Each pair of nodes is compared once per diff; a pair reached again through
/// another attribute path (schemas reused by reference) adds nothing new, so
/// its findings carry the first path in walk order. A property kept without a
/// schema on either side (its reference was being resolved) is not descended
/// into.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    /// Attribute paths of the old schema with no counterpart in the new one.
    pub removed: BTreeSet<String>,
    pub changed_types: BTreeSet<(String, AttributeType, AttributeType)>,
    /// Enum values removed at attribute paths that declare an enum on both
    /// sides. An attribute that lost its enum altogether accepts more values,
    /// so it is not reported.
    pub deleted_enum_values: BTreeSet<(String, String)>,
}

impl SchemaDiff {
    pub fn between(old: &Schema, new: &Schema) -> Self {
        SchemaWalk::new(false).diff(old, new)
    }

    /// Like [`SchemaDiff::between`], leaving out properties deprecated in the
    /// old schema and everything below them.
    pub fn between_non_deprecated(old: &Schema, new: &Schema) -> Self {
        SchemaWalk::new(true).diff(old, new)
    }
}

struct SchemaWalk {
    skip_deprecated: bool,
    compared: HashSet<(*const Schema, *const Schema)>,
    expanded: HashSet<*const Schema>,
    diff: SchemaDiff,
}

impl SchemaWalk {
    fn new(skip_deprecated: bool) -> Self {
        Self {
            skip_deprecated,
            compared: HashSet::new(),
            expanded: HashSet::new(),
            diff: SchemaDiff::default(),
        }
    }

    fn diff(mut self, old: &Schema, new: &Schema) -> SchemaDiff {
        self.compare(old, new, "");
        self.diff
    }

    fn compare(&mut self, old: &Schema, new: &Schema, path: &str) {
        if !self.compared.insert((ptr::from_ref(old), ptr::from_ref(new))) {
            return;
        }

        let (old_type, new_type) = (old.attribute_type(), new.attribute_type());
        if old_type != new_type {
            self.diff
                .changed_types
                .insert((display_path(path), old_type, new_type));
        }

        if !old.enum_values.is_empty() {
            if new.enum_values.is_empty() {
                trace!(attribute = display_path(path), "enum dropped entirely");
            } else {
                for value in old.enum_values.difference(&new.enum_values) {
                    self.diff
                        .deleted_enum_values
                        .insert((display_path(path), value.clone()));
                }
            }
        }

        for attribute in &old.attributes {
            if self.skip_deprecated && attribute.deprecated {
                continue;
            }
            let attribute_path = child_path(path, &attribute.name);
            match (new.attribute(&attribute.name), &attribute.schema) {
                (None, old_child) => {
                    if let Some(old_child) = old_child {
                        self.expand_removed(old_child, &attribute_path);
                    }
                    self.diff.removed.insert(attribute_path);
                }
                (Some(new_attribute), Some(old_child)) => {
                    if let Some(new_child) = &new_attribute.schema {
                        self.compare(old_child, new_child, &attribute_path);
                    }
                }
                (Some(_), None) => {}
            }
        }

        let items_path = format!("{path}[*]");
        match (&old.items, &new.items) {
            (Some(old_items), Some(new_items)) => self.compare(old_items, new_items, &items_path),
            (Some(old_items), None) => self.expand_removed(old_items, &items_path),
            _ => {}
        }
    }

    /// Everything below a removed property is removed as well. Each node is
    /// expanded once per diff.
    fn expand_removed(&mut self, schema: &Schema, path: &str) {
        if !self.expanded.insert(ptr::from_ref(schema)) {
            return;
        }
        for attribute in &schema.attributes {
            if self.skip_deprecated && attribute.deprecated {
                continue;
            }
            let attribute_path = child_path(path, &attribute.name);
            if let Some(child) = &attribute.schema {
                self.expand_removed(child, &attribute_path);
            }
            self.diff.removed.insert(attribute_path);
        }
        if let Some(items) = &schema.items {
            self.expand_removed(items, &format!("{path}[*]"));
        }
    }
}

fn child_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        ROOT_ATTRIBUTE.to_string()
    } else {
        path.to_string()
    }
}

/// Every enum value declared anywhere in a parameter's schema.
pub fn parameter_enum_values(parameter: &RequestParameter) -> BTreeSet<&str> {
    let mut values = BTreeSet::new();
    if let Some(schema) = parameter.schema.as_deref() {
        collect_enum_values(schema, &mut HashSet::new(), &mut values);
    }
    values
}

fn collect_enum_values<'a>(
    schema: &'a Schema,
    visited: &mut HashSet<*const Schema>,
    values: &mut BTreeSet<&'a str>,
) {
    if !visited.insert(ptr::from_ref(schema)) {
        return;
    }
    values.extend(schema.enum_values.iter().map(String::as_str));
    for child in schema.attributes.iter().filter_map(|a| a.schema.as_deref()) {
        collect_enum_values(child, visited, values);
    }
    if let Some(items) = schema.items.as_deref() {
        collect_enum_values(items, visited, values);
    }
}
