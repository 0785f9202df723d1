//! Namespace Propagation and Reference Resolution
//!
//! Both passes are recursions over [`InnerModels`]. They never fail: a reference
//! that cannot be resolved yet is left in place for a later load pass.

use std::path::Path;

use super::{ComplexType, InnerModels, Model, ModelKind};
use crate::registry::TypeRegistry;

impl Model {
    /// Decode side-effect chain: register, propagate namespaces, resolve references.
    ///
    /// Named types that only receive their namespace through propagation are
    /// registered right after it, so references to them in the same document
    /// resolve in this same chain.
    pub fn settle(&mut self, registry: &mut TypeRegistry, source_file: &Path) {
        registry.register_tree(self, source_file);
        self.propagate_namespace();
        registry.register_tree(self, source_file);
        self.resolve_references(registry);
    }

    /// Hand this node's namespace down to every descendant that has none.
    ///
    /// A subtree with an explicit namespace keeps it and propagates its own
    /// instead. A reference without a namespace inherits the one of its node.
    pub fn propagate_namespace(&mut self) {
        if let (Some(namespace), ModelKind::Reference(id)) = (&self.namespace, &mut self.kind) {
            if id.namespace.is_empty() {
                id.namespace = namespace.clone();
            }
        }

        let namespace = self.namespace.clone();
        propagate_into_children(self, namespace.as_deref());
    }

    /// Replace every reference found in the registry by a link to it.
    pub fn resolve_references(&mut self, registry: &TypeRegistry) {
        let resolved = match &self.kind {
            ModelKind::Reference(id) if registry.contains(id) => Some(id.clone()),
            _ => None,
        };
        if let Some(id) = resolved {
            self.kind = ModelKind::Named(id);
        }

        // Children may reference independently of this node
        for child in self.inner_models_mut() {
            child.resolve_references(registry);
        }
    }
}

impl ComplexType {
    /// Propagate the namespace of the registry entry into this definition
    pub fn propagate_namespace(&mut self, namespace: &str) {
        let namespace = (!namespace.is_empty()).then_some(namespace);
        propagate_into_children(self, namespace);
    }

    pub fn resolve_references(&mut self, registry: &TypeRegistry) {
        for child in self.inner_models_mut() {
            child.resolve_references(registry);
        }
    }
}

fn propagate_into_children<T: InnerModels + ?Sized>(parent: &mut T, namespace: Option<&str>) {
    for child in parent.inner_models_mut() {
        if child.namespace.is_none() {
            child.namespace = namespace.map(str::to_string);
        }
        child.propagate_namespace();
    }
}
