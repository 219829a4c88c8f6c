//! Bounded rendering of raw schema nodes for log lines.
//!
//! Raw graphs may be cyclic, so rendering tracks the nodes on the current
//! path and stops at a fixed depth.

use crate::raw::{SchemaGraph, SchemaId, TypeDecl};
use std::collections::HashSet;
use std::fmt::Write;

/// Entries shown per collection before eliding the rest.
const COLLECTION_LIMIT: usize = 3;

/// Renders `id` as `Schema[type=.., $ref=.., properties={..}]`, descending at
/// most `max_depth` levels. Deeper nodes render as `[MAX_DEPTH:n]`, nodes
/// already on the path as `[CIRCULAR_REF]`.
pub fn render(graph: &SchemaGraph, id: SchemaId, max_depth: usize) -> String {
    let mut seen = HashSet::new();
    let mut out = String::new();
    render_node(graph, id, 0, max_depth, &mut seen, &mut out);
    out
}

fn render_node(
    graph: &SchemaGraph,
    id: SchemaId,
    depth: usize,
    max_depth: usize,
    seen: &mut HashSet<SchemaId>,
    out: &mut String,
) {
    if depth >= max_depth {
        let _ = write!(out, "[MAX_DEPTH:{max_depth}]");
        return;
    }
    if !seen.insert(id) {
        out.push_str("[CIRCULAR_REF]");
        return;
    }
    let Some(node) = graph.get(id) else {
        out.push_str("null");
        return;
    };

    let mut fields = Vec::new();
    match &node.types {
        TypeDecl::Single(name) => fields.push(format!("type={name}")),
        TypeDecl::Many(names) => fields.push(format!("type=[{}]", names.join(", "))),
        TypeDecl::Absent => {}
    }
    if let Some(reference) = &node.reference {
        fields.push(format!("$ref={reference}"));
    }
    if let Some(composition) = &node.composition {
        fields.push(format!(
            "{}={}",
            composition.kind.keyword(),
            composition.branches.len()
        ));
    }

    out.push_str("Schema[");
    out.push_str(&fields.join(", "));

    if let Some(items) = node.items {
        if !fields.is_empty() {
            out.push_str(", ");
        }
        out.push_str("items=");
        render_node(graph, items, depth + 1, max_depth, seen, out);
    }

    if !node.properties.is_empty() {
        if !fields.is_empty() || node.items.is_some() {
            out.push_str(", ");
        }
        out.push_str("properties={");
        for (index, (name, child)) in node.properties.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            if index >= COLLECTION_LIMIT {
                let _ = write!(out, "... +{} more", node.properties.len() - COLLECTION_LIMIT);
                break;
            }
            let _ = write!(out, "{name}=");
            render_node(graph, *child, depth + 1, max_depth, seen, out);
        }
        out.push('}');
    }
    out.push(']');
    seen.remove(&id);
}
