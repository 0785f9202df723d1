//! Cycle Detection
//!
//! Finds recursive type chains in the (pruned) registry and marks every type that
//! needs cycle-safe handling in generated code.
//!
//! The detection rule is deliberately narrow. Walking from a root `R`, a chain is
//! reported when it re-enters `R`'s namespace from a different namespace: the
//! child's namespace equals `R`'s, and the node just before it on the path lives
//! elsewhere. Ordinary references inside one namespace are not cycles by this rule.
//! A type that reaches itself without ever leaving its namespace is a degenerate
//! self-cycle and aborts the run.
//!
//! After every root has been searched, cyclic marks spread: a type whose
//! dependency set contains a cyclic type gets its whole dependency set marked.

use std::collections::HashSet;

use tracing::{debug, info};

use super::ModelGraph;
use crate::error::{CodegenError, Result};
use crate::models::{Identifier, Model};
use crate::registry::{CyclicSet, TypeRegistry};

// =============================================================================
// Analysis Result
// =============================================================================

/// What the cycle detector found
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleAnalysis {
    /// Every reported chain, root first, re-entry point last
    pub chains: Vec<Vec<Identifier>>,
    /// Types marked cyclic only because they depend on a cyclic type
    pub infected: usize,
}

impl CycleAnalysis {
    pub fn has_cycles(&self) -> bool {
        !self.chains.is_empty()
    }
}

/// `a.B -> c.D -> a.E`
pub fn format_chain(chain: &[Identifier]) -> String {
    chain
        .iter()
        .map(|id| id.qualified_classpath())
        .collect::<Vec<_>>()
        .join(" -> ")
}

// =============================================================================
// Detection
// =============================================================================

/// Search every registered type for cycles, then propagate cyclic marks.
///
/// Fails only on a degenerate self-cycle.
pub fn resolve_cyclic_dependencies(registry: &TypeRegistry, cyclic: &mut CyclicSet) -> Result<CycleAnalysis> {
    let graph = ModelGraph::new(registry);
    let mut analysis = CycleAnalysis::default();

    for root in registry.identifiers() {
        // Marking can expose or hide further chains from the same root
        while let Some(chain) = find_cycle(&graph, &root, cyclic)? {
            info!("Detected cyclic dependency: {}", format_chain(&chain));
            analysis.chains.push(chain);
        }
    }

    let marked_before = cyclic.len();
    infect_dependents(&graph, cyclic);
    analysis.infected = cyclic.len() - marked_before;
    debug!(
        chains = analysis.chains.len(),
        infected = analysis.infected,
        cyclic = cyclic.len(),
        "Cycle analysis complete"
    );

    Ok(analysis)
}

/// One depth-first search from `root`. Marks and returns the first chain found.
fn find_cycle(graph: &ModelGraph<'_>, root: &Identifier, cyclic: &mut CyclicSet) -> Result<Option<Vec<Identifier>>> {
    let mut walk = CycleWalk {
        graph,
        root,
        cyclic,
        visited: HashSet::new(),
    };
    let start = Model::named(root.clone());
    walk.traverse(&start, &[root.clone()])
}

struct CycleWalk<'g, 'a> {
    graph: &'g ModelGraph<'a>,
    root: &'g Identifier,
    cyclic: &'g mut CyclicSet,
    visited: HashSet<Identifier>,
}

impl<'g, 'a> CycleWalk<'g, 'a> {
    fn traverse<'m>(&mut self, model: &'m Model, path: &[Identifier]) -> Result<Option<Vec<Identifier>>>
    where
        'a: 'm,
    {
        for child in self.graph.children(model) {
            let mut inner_path = path.to_vec();

            if let Some(child_id) = child.complex_identifier() {
                inner_path.push(child_id.clone());

                if child_id == *self.root && path.iter().all(|id| id.namespace == self.root.namespace) {
                    return Err(CodegenError::SelfCycle { chain: inner_path });
                }

                if self.visited.contains(&child_id) || self.cyclic.contains(&child_id) {
                    continue;
                }

                let re_enters = path
                    .last()
                    .map(|previous| previous.namespace != child_id.namespace)
                    .unwrap_or(false);
                if child_id.namespace == self.root.namespace && re_enters {
                    for id in &inner_path {
                        self.cyclic.mark(id.clone());
                    }
                    return Ok(Some(inner_path));
                }

                self.visited.insert(child_id);
            }

            if let Some(chain) = self.traverse(child, &inner_path)? {
                return Ok(Some(chain));
            }
        }

        Ok(None)
    }
}

// =============================================================================
// Infection
// =============================================================================

/// Mark the full dependency set of every type that depends on a cyclic type,
/// repeating until no new type gets marked.
fn infect_dependents(graph: &ModelGraph<'_>, cyclic: &mut CyclicSet) {
    loop {
        let mut changed = false;
        for id in graph.registry().identifiers() {
            let dependencies = graph.dependencies_of(&id);
            if dependencies.iter().any(|dep| cyclic.contains(dep)) {
                for dep in dependencies {
                    changed |= cyclic.mark(dep);
                }
            }
        }
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComplexKind, ComplexType, Field};
    use std::path::Path;

    fn id(qualified: &str) -> Identifier {
        Identifier::parse(qualified)
    }

    /// Register a record whose fields link to `refs`
    fn record(registry: &mut TypeRegistry, qualified: &str, refs: &[&str]) {
        let identifier = id(qualified);
        let fields = refs
            .iter()
            .enumerate()
            .map(|(i, target)| Field {
                name: format!("field{}", i),
                model: Model::named(id(target)),
                optional: true,
                default: None,
                doc: None,
            })
            .collect();
        registry.register(
            identifier.clone(),
            ComplexType {
                name: identifier.name.clone(),
                doc: None,
                kind: ComplexKind::Record { fields },
            },
            Path::new("cycles.pdsc"),
        );
    }

    #[test]
    fn test_mutual_recursion_across_namespaces() {
        let mut registry = TypeRegistry::new();
        record(&mut registry, "ns1.A", &["ns2.B"]);
        record(&mut registry, "ns2.B", &["ns1.A"]);
        let mut cyclic = CyclicSet::new();

        let analysis = resolve_cyclic_dependencies(&registry, &mut cyclic).unwrap();

        assert_eq!(analysis.chains, vec![vec![id("ns1.A"), id("ns2.B"), id("ns1.A")]]);
        assert!(cyclic.contains(&id("ns1.A")));
        assert!(cyclic.contains(&id("ns2.B")));
    }

    #[test]
    fn test_direct_self_reference_is_fatal() {
        let mut registry = TypeRegistry::new();
        record(&mut registry, "ns1.A", &["ns1.A"]);
        let mut cyclic = CyclicSet::new();

        let err = resolve_cyclic_dependencies(&registry, &mut cyclic).unwrap_err();

        match err {
            CodegenError::SelfCycle { chain } => assert_eq!(chain, vec![id("ns1.A"), id("ns1.A")]),
            other => panic!("expected SelfCycle, got {:?}", other),
        }
    }

    #[test]
    fn test_indirect_self_cycle_within_namespace_is_fatal() {
        let mut registry = TypeRegistry::new();
        record(&mut registry, "ns1.A", &["ns1.B"]);
        record(&mut registry, "ns1.B", &["ns1.A"]);
        let mut cyclic = CyclicSet::new();

        let err = resolve_cyclic_dependencies(&registry, &mut cyclic).unwrap_err();

        assert!(matches!(err, CodegenError::SelfCycle { .. }));
    }

    #[test]
    fn test_re_entry_into_root_namespace_through_other_type() {
        let mut registry = TypeRegistry::new();
        record(&mut registry, "ns1.A", &["ns2.B"]);
        record(&mut registry, "ns2.B", &["ns1.C"]);
        record(&mut registry, "ns1.C", &[]);
        let mut cyclic = CyclicSet::new();

        let analysis = resolve_cyclic_dependencies(&registry, &mut cyclic).unwrap();

        assert_eq!(analysis.chains, vec![vec![id("ns1.A"), id("ns2.B"), id("ns1.C")]]);
        assert!(cyclic.contains(&id("ns1.C")));
    }

    #[test]
    fn test_search_repeats_for_same_root_until_exhausted() {
        let mut registry = TypeRegistry::new();
        record(&mut registry, "ns1.A", &["ns2.B", "ns3.D"]);
        record(&mut registry, "ns2.B", &["ns1.C"]);
        record(&mut registry, "ns3.D", &["ns1.E"]);
        record(&mut registry, "ns1.C", &[]);
        record(&mut registry, "ns1.E", &[]);
        let mut cyclic = CyclicSet::new();

        let analysis = resolve_cyclic_dependencies(&registry, &mut cyclic).unwrap();

        assert_eq!(
            analysis.chains,
            vec![
                vec![id("ns1.A"), id("ns2.B"), id("ns1.C")],
                vec![id("ns1.A"), id("ns3.D"), id("ns1.E")],
            ]
        );
        for marked in ["ns1.A", "ns2.B", "ns1.C", "ns3.D", "ns1.E"] {
            assert!(cyclic.contains(&id(marked)));
        }
        assert_eq!(analysis.infected, 0);
    }

    #[test]
    fn test_intra_namespace_references_are_not_cycles() {
        let mut registry = TypeRegistry::new();
        record(&mut registry, "ns1.A", &["ns1.B", "ns1.C"]);
        record(&mut registry, "ns1.B", &["ns1.C"]);
        record(&mut registry, "ns1.C", &[]);
        let mut cyclic = CyclicSet::new();

        let analysis = resolve_cyclic_dependencies(&registry, &mut cyclic).unwrap();

        assert!(!analysis.has_cycles());
        assert!(cyclic.is_empty());
    }

    #[test]
    fn test_container_of_cyclic_type_is_infected() {
        let mut registry = TypeRegistry::new();
        record(&mut registry, "ns1.A", &["ns2.B"]);
        record(&mut registry, "ns2.B", &["ns1.A"]);
        record(&mut registry, "ns1.C", &["ns1.A"]);
        let mut cyclic = CyclicSet::new();

        let analysis = resolve_cyclic_dependencies(&registry, &mut cyclic).unwrap();

        assert_eq!(analysis.chains.len(), 1);
        assert!(cyclic.contains(&id("ns1.C")));
        assert_eq!(analysis.infected, 1);
    }

    #[test]
    fn test_format_chain() {
        assert_eq!(format_chain(&[id("a.B"), id("c.D")]), "a.B -> c.D");
    }
}
