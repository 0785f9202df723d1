//! Type Registry
//!
//! Maps every namespace-qualified [`Identifier`] to its named type definition and
//! the document that defined it. Entries are write-once: the first registration of
//! an identifier wins and later ones are ignored, which keeps the source-file
//! attribution of a type stable across load passes.
//!
//! Lifecycle per compilation run: created empty, populated while loading, settled
//! once loading converged, pruned to the reachable set, then read-only.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::models::{ComplexType, Identifier, InnerModels, Model, ModelKind};

/// A registered definition and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredType {
    pub definition: ComplexType,
    pub source_file: PathBuf,
}

/// Identifier → definition, write-once
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: BTreeMap<Identifier, RegisteredType>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Returns `false` when the identifier was already taken.
    pub fn register(&mut self, id: Identifier, definition: ComplexType, source_file: &Path) -> bool {
        if id.namespace.is_empty() || self.types.contains_key(&id) {
            return false;
        }
        debug!(type_id = %id, file = %source_file.display(), "Registered type");
        self.types.insert(
            id,
            RegisteredType {
                definition,
                source_file: source_file.to_path_buf(),
            },
        );
        true
    }

    /// Register every inline ComplexType of a tree that has a namespace.
    ///
    /// Does not look through resolved links; those are registered already.
    pub fn register_tree(&mut self, model: &Model, source_file: &Path) {
        if let ModelKind::Complex(complex) = &model.kind {
            if let Some(id) = model.complex_identifier() {
                self.register(id, complex.clone(), source_file);
            }
        }
        for child in model.inner_models() {
            self.register_tree(child, source_file);
        }
    }

    pub fn lookup(&self, id: &Identifier) -> Option<&ComplexType> {
        self.types.get(id).map(|entry| &entry.definition)
    }

    pub fn get(&self, id: &Identifier) -> Option<&RegisteredType> {
        self.types.get(id)
    }

    pub fn source_file(&self, id: &Identifier) -> Option<&Path> {
        self.types.get(id).map(|entry| entry.source_file.as_path())
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.types.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Registered identifiers in sorted order
    pub fn identifiers(&self) -> Vec<Identifier> {
        self.types.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &RegisteredType)> {
        self.types.iter()
    }

    /// Bring every stored definition up to date once loading has converged.
    ///
    /// A definition is captured when it is first registered, which may be during a
    /// pass where some of its references could not be resolved yet.
    pub fn settle(&mut self) {
        for id in self.identifiers() {
            let Some(mut definition) = self.lookup(&id).cloned() else {
                continue;
            };
            definition.propagate_namespace(&id.namespace);
            definition.resolve_references(self);
            if let Some(entry) = self.types.get_mut(&id) {
                entry.definition = definition;
            }
        }
    }

    /// Drop every entry outside `reachable`. Returns how many were removed.
    pub fn prune(&mut self, reachable: &BTreeSet<Identifier>) -> usize {
        let before = self.types.len();
        self.types.retain(|id, _| reachable.contains(id));
        before - self.types.len()
    }
}

/// Identifiers of types that need cycle-safe handling in generated code.
///
/// Grows monotonically; a marked identifier is never unmarked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CyclicSet {
    ids: BTreeSet<Identifier>,
}

impl CyclicSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the identifier was not marked before
    pub fn mark(&mut self, id: Identifier) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.ids.iter()
    }
}
