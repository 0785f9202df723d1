//! Reachability Pruning
//!
//! Restricts the registry to the types the requested roots actually use, so the
//! emitter never sees a type nothing refers to.

use std::collections::BTreeSet;

use tracing::info;

use super::ModelGraph;
use crate::models::{Identifier, Model};
use crate::registry::TypeRegistry;

/// Transitive closure of ComplexTypes reachable from `roots`
pub fn reachable_types<'m>(
    registry: &TypeRegistry,
    roots: impl IntoIterator<Item = &'m Model>,
) -> BTreeSet<Identifier> {
    let graph = ModelGraph::new(registry);
    let mut reachable = BTreeSet::new();
    for root in roots {
        reachable.extend(graph.dependencies(root));
    }
    reachable
}

/// Prune the registry to what `roots` reach. Returns how many types were dropped.
pub fn trim_unneeded_models<'m>(
    registry: &mut TypeRegistry,
    roots: impl IntoIterator<Item = &'m Model>,
) -> usize {
    let reachable = reachable_types(registry, roots);
    let removed = registry.prune(&reachable);
    info!(kept = registry.len(), removed, "Trimmed unreachable models");
    removed
}
