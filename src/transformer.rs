//! Conversion of raw schema nodes into normalized [`Schema`] trees.
//!
//! Raw graphs may loop back on themselves, either through `$ref` chains or
//! (for graphs built in code) through shared nodes. Every top-level
//! [`SchemaTransformer::transform`] call owns a fresh [`TransformContext`]
//! that records the references being resolved and the nodes on the current
//! descent path; a reference already being resolved yields no schema, and a
//! node already on the path or beyond the depth limit is cut.

use crate::canonical::{NumericBounds, Schema, SchemaAttribute, SchemaConstraints};
use crate::error::{BrakeError, Result};
use crate::options::CheckerOptions;
use crate::raw::{Composition, ExclusiveBound, RawSchema, SchemaGraph, SchemaId};
use crate::safe_format;
use crate::store::{MemoKey, ReferenceStore, reference_name};
use crate::type_resolver::TypeResolver;
use bigdecimal::BigDecimal;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{Level, debug, enabled, trace, warn};

const OBJECT_TYPE: &str = "object";

/// Tracking state of one top-level transformation. Created by
/// [`SchemaTransformer::transform`] and dropped when it returns, on success
/// and on error alike.
#[derive(Debug)]
struct TransformContext {
    /// Names of references currently being resolved.
    resolving: BTreeSet<String>,
    /// Nodes on the current descent path.
    active: HashSet<SchemaId>,
    depth: usize,
    max_depth: usize,
}

impl TransformContext {
    fn new(root: SchemaId, max_depth: usize) -> Self {
        Self {
            resolving: BTreeSet::new(),
            active: HashSet::from([root]),
            depth: 0,
            max_depth,
        }
    }

    fn enter(&mut self, id: SchemaId) {
        self.active.insert(id);
        self.depth += 1;
    }

    fn exit(&mut self, id: SchemaId) {
        self.active.remove(&id);
        self.depth -= 1;
    }
}

/// Outcome of stepping into a child node.
enum Descent {
    Circular,
    DepthLimited,
    Transformed(Option<Arc<Schema>>),
}

/// Transforms the schemas of one document.
pub struct SchemaTransformer<'a> {
    graph: &'a SchemaGraph,
    resolver: TypeResolver,
    options: &'a CheckerOptions,
    store: ReferenceStore,
}

impl<'a> SchemaTransformer<'a> {
    pub fn new(
        graph: &'a SchemaGraph,
        store: ReferenceStore,
        resolver: TypeResolver,
        options: &'a CheckerOptions,
    ) -> Self {
        Self {
            graph,
            resolver,
            options,
            store,
        }
    }

    pub fn store(&self) -> &ReferenceStore {
        &self.store
    }

    /// Transforms the node `id` and everything reachable from it.
    ///
    /// # Errors
    ///
    /// [`BrakeError::MissingType`] for untyped schemas in strict mode and
    /// [`BrakeError::UnresolvedReference`] for references to undefined
    /// schemas. Cycles never fail.
    pub fn transform(&mut self, id: SchemaId) -> Result<Arc<Schema>> {
        let mut context = TransformContext::new(id, self.options.max_schema_transformation_depth);
        let schema = self.transform_node(id, &mut context)?;
        Ok(schema.unwrap_or_else(|| Arc::new(Schema::new(OBJECT_TYPE))))
    }

    fn node(&self, id: SchemaId) -> Result<&'a RawSchema> {
        self.graph.get(id).ok_or_else(|| BrakeError::UnresolvedReference {
            reference: format!("schema node {}", id.index()),
            location: "schema graph".to_string(),
        })
    }

    fn transform_node(
        &mut self,
        id: SchemaId,
        context: &mut TransformContext,
    ) -> Result<Option<Arc<Schema>>> {
        let node = self.node(id)?;

        if let Some(reference) = &node.reference {
            return self.resolve_reference(reference, &node.location, context);
        }
        if let Some(composition) = &node.composition {
            return self.transform_composed(node, composition, context).map(Some);
        }
        self.transform_plain(node, context).map(Some)
    }

    fn resolve_reference(
        &mut self,
        reference: &str,
        location: &str,
        context: &mut TransformContext,
    ) -> Result<Option<Arc<Schema>>> {
        let name = reference_name(reference);
        if context.resolving.contains(&name) {
            trace!(reference, location, "reference already being resolved, cutting recursion");
            return Ok(None);
        }

        let target = self
            .store
            .lookup(&name)
            .ok_or_else(|| BrakeError::UnresolvedReference {
                reference: name.clone(),
                location: location.to_string(),
            })?;

        let key = MemoKey::new(&name, context.depth);
        if let Some(cached) = self.store.cached(&key) {
            return Ok(cached);
        }

        context.resolving.insert(name.clone());
        let result = self.transform_node(target, context);
        context.resolving.remove(&name);

        let schema = result?;
        self.store.remember(key, schema.clone());
        Ok(schema)
    }

    /// allOf, oneOf and anyOf alike: an object carrying the union of every
    /// branch's attributes, first occurrence of a name winning.
    fn transform_composed(
        &mut self,
        node: &RawSchema,
        composition: &Composition,
        context: &mut TransformContext,
    ) -> Result<Arc<Schema>> {
        let mut schema = Schema::new(OBJECT_TYPE);
        schema.nullable = self.resolver.is_nullable(node);
        schema.attributes = self.attributes(node, context)?;

        let mut names: HashSet<String> = schema.attributes.iter().map(|a| a.name.clone()).collect();
        for branch in &composition.branches {
            let Descent::Transformed(Some(branch_schema)) = self.descend(*branch, context)? else {
                continue;
            };
            for attribute in &branch_schema.attributes {
                if names.insert(attribute.name.clone()) {
                    schema.attributes.push(attribute.clone());
                }
            }
        }

        debug!(
            location = %node.location,
            keyword = composition.kind.keyword(),
            attributes = schema.attributes.len(),
            "flattened composed schema"
        );
        Ok(Arc::new(schema))
    }

    fn transform_plain(
        &mut self,
        node: &RawSchema,
        context: &mut TransformContext,
    ) -> Result<Arc<Schema>> {
        let type_name = self.resolver.resolve_type(node)?;
        let mut schema = Schema::new(type_name);
        schema.format = node.format.clone();
        schema.nullable = self.resolver.is_nullable(node);
        schema.enum_values = enum_values(&node.enum_values);
        schema.constraints = SchemaConstraints {
            max_length: node.max_length,
            min_length: node.min_length,
            max_items: node.max_items,
            min_items: node.min_items,
            unique_items: node.unique_items,
            bounds: self.bounds(node),
        };

        if let Some(items) = node.items {
            schema.items = match self.descend(items, context)? {
                Descent::Transformed(items) => items,
                Descent::Circular | Descent::DepthLimited => None,
            };
        }
        schema.attributes = self.attributes(node, context)?;

        Ok(Arc::new(schema))
    }

    fn attributes(
        &mut self,
        node: &RawSchema,
        context: &mut TransformContext,
    ) -> Result<Vec<SchemaAttribute>> {
        let mut attributes = Vec::with_capacity(node.properties.len());
        for (name, child) in &node.properties {
            let schema = match self.descend(*child, context)? {
                Descent::Transformed(schema) => schema,
                Descent::Circular => {
                    if enabled!(Level::TRACE) {
                        trace!(
                            property = %name,
                            schema = %self.render(*child),
                            "circular property, skipping"
                        );
                    }
                    continue;
                }
                Descent::DepthLimited => {
                    if enabled!(Level::TRACE) {
                        trace!(
                            property = %name,
                            schema = %self.render(*child),
                            "max transformation depth reached, skipping"
                        );
                    }
                    continue;
                }
            };

            let deprecated = self.graph.get(*child).is_some_and(|c| c.deprecated);
            attributes.push(SchemaAttribute {
                name: name.clone(),
                schema,
                required: node.required.iter().any(|r| r == name),
                deprecated,
            });
        }
        Ok(attributes)
    }

    fn descend(&mut self, child: SchemaId, context: &mut TransformContext) -> Result<Descent> {
        if context.active.contains(&child) {
            return Ok(Descent::Circular);
        }
        if context.depth >= context.max_depth {
            return Ok(Descent::DepthLimited);
        }

        context.enter(child);
        let result = self.transform_node(child, context);
        context.exit(child);
        result.map(Descent::Transformed)
    }

    /// Normalizes exclusive bounds to the excluded value. 3.1 documents carry
    /// it directly; 3.0 documents flag `maximum`/`minimum` as exclusive.
    fn bounds(&self, node: &RawSchema) -> NumericBounds {
        let numeric = self.resolver.version().uses_numeric_exclusive_bounds();
        let exclusive = |bound: &Option<ExclusiveBound>, base: &Option<BigDecimal>, keyword: &str| {
            match (bound, numeric) {
                (Some(ExclusiveBound::Value(value)), true) => Some(value.clone()),
                (Some(ExclusiveBound::Flag(true)), false) => base.clone(),
                (Some(ExclusiveBound::Flag(_)), true) | (Some(ExclusiveBound::Value(_)), false) => {
                    warn!(
                        location = %node.location,
                        keyword,
                        version = %self.resolver.version(),
                        "exclusive bound encoding does not match the document version, ignoring it"
                    );
                    None
                }
                _ => None,
            }
        };

        NumericBounds {
            exclusive_maximum: exclusive(&node.exclusive_maximum, &node.maximum, "exclusiveMaximum"),
            exclusive_minimum: exclusive(&node.exclusive_minimum, &node.minimum, "exclusiveMinimum"),
            maximum: node.maximum.clone(),
            minimum: node.minimum.clone(),
        }
    }

    fn render(&self, id: SchemaId) -> String {
        safe_format::render(self.graph, id, self.options.max_log_serialization_depth)
    }
}

fn enum_values(values: &[Value]) -> BTreeSet<String> {
    values
        .iter()
        .filter(|value| !value.is_null())
        .map(|value| match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        })
        .collect()
}
