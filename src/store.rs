//! Per-document store of named schemas.

use crate::canonical::Schema;
use crate::raw::{SchemaId, unescape_pointer};
use std::collections::HashMap;
use std::sync::Arc;

const SCHEMA_PREFIXES: [&str; 2] = ["#/components/schemas/", "#/definitions/"];

/// Name a `$ref` points at: the segment after the schemas prefix, or the last
/// pointer segment for anything else, unescaped.
pub fn reference_name(reference: &str) -> String {
    let raw = SCHEMA_PREFIXES
        .iter()
        .find_map(|prefix| reference.strip_prefix(prefix))
        .unwrap_or_else(|| reference.rsplit('/').next().unwrap_or(reference));
    unescape_pointer(raw)
}

/// Identifies one memoized transformation: the reference name and the depth
/// it was reached at. The depth keeps a reused tree within the depth limit
/// wherever it is attached; the references being resolved above it are not
/// part of the key, so a name is transformed at most once per depth.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemoKey {
    name: String,
    depth: usize,
}

impl MemoKey {
    pub fn new(name: &str, depth: usize) -> Self {
        Self {
            name: name.to_string(),
            depth,
        }
    }
}

/// Named component schemas of one document plus the transformations computed
/// from them. Never shared between documents.
#[derive(Debug, Default)]
pub struct ReferenceStore {
    schemas: HashMap<String, SchemaId>,
    transformed: HashMap<MemoKey, Option<Arc<Schema>>>,
}

impl ReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, id: SchemaId) {
        self.schemas.insert(name.into(), id);
    }

    pub fn lookup(&self, name: &str) -> Option<SchemaId> {
        self.schemas.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn cached(&self, key: &MemoKey) -> Option<Option<Arc<Schema>>> {
        self.transformed.get(key).cloned()
    }

    pub fn remember(&mut self, key: MemoKey, schema: Option<Arc<Schema>>) {
        self.transformed.insert(key, schema);
    }

    pub fn transformed_count(&self) -> usize {
        self.transformed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{RawSchema, SchemaGraph};

    #[test]
    fn test_reference_names() {
        assert_eq!(reference_name("#/components/schemas/Pet"), "Pet");
        assert_eq!(reference_name("#/definitions/Pet"), "Pet");
        assert_eq!(reference_name("#/components/schemas/a~1b~0c"), "a/b~c");
        assert_eq!(reference_name("other.yaml#/Thing"), "Thing");
        assert_eq!(reference_name("Bare"), "Bare");
    }

    #[test]
    fn test_memo_is_keyed_by_depth() {
        let mut graph = SchemaGraph::new();
        let id = graph.add(RawSchema::new("#/components/schemas/Pet"));
        let mut store = ReferenceStore::new();
        store.register("Pet", id);
        assert_eq!(store.lookup("Pet"), Some(id));

        store.remember(MemoKey::new("Pet", 0), Some(Arc::new(Schema::new("object"))));

        assert!(store.cached(&MemoKey::new("Pet", 0)).is_some());
        assert!(store.cached(&MemoKey::new("Pet", 3)).is_none());
        assert_eq!(store.transformed_count(), 1);
    }
}
