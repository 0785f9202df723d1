//! Model Dependency Graph
//!
//! Registry-aware traversal over [`InnerModels`]. A resolved link (`Named`) has no
//! children of its own in the tree; its children are those of the registered
//! definition. Every whole-registry pass (reachability, cycle detection, infection)
//! walks the graph through [`ModelGraph`].
//!
//! - `loader`: fixed-point loading of a schema directory
//! - `reachability`: restricting the registry to what the roots use
//! - `analysis`: cycle detection and cyclic-type propagation

pub mod analysis;
pub mod loader;
pub mod reachability;

pub use analysis::{resolve_cyclic_dependencies, CycleAnalysis};
pub use loader::{load_from_directory, LoadConfig, LoadedDocument, LoadedModels};
pub use reachability::{reachable_types, trim_unneeded_models};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashMap};

use crate::models::{Identifier, InnerModels, Model, ModelKind};
use crate::registry::{CyclicSet, TypeRegistry};

/// Read-only view of the model graph backed by a registry
#[derive(Clone, Copy)]
pub struct ModelGraph<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> ModelGraph<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// Structural children of `model`, looking through resolved links
    pub fn children<'m>(&self, model: &'m Model) -> Vec<&'m Model>
    where
        'a: 'm,
    {
        match &model.kind {
            ModelKind::Named(id) => self
                .registry
                .lookup(id)
                .map(|definition| definition.inner_models())
                .unwrap_or_default(),
            _ => model.inner_models(),
        }
    }

    /// Every ComplexType reachable from `model`, the model itself included
    pub fn dependencies<'m>(&self, model: &'m Model) -> BTreeSet<Identifier>
    where
        'a: 'm,
    {
        let mut deps = BTreeSet::new();
        if let Some(id) = model.complex_identifier() {
            deps.insert(id);
        }
        self.collect_dependencies(model, &mut deps);
        deps
    }

    /// Dependencies of a registered type, the type itself included
    pub fn dependencies_of(&self, id: &Identifier) -> BTreeSet<Identifier> {
        self.dependencies(&Model::named(id.clone()))
    }

    fn collect_dependencies<'m>(&self, model: &'m Model, deps: &mut BTreeSet<Identifier>)
    where
        'a: 'm,
    {
        for child in self.children(model) {
            if let Some(id) = child.complex_identifier() {
                if !deps.insert(id) {
                    continue;
                }
            }
            self.collect_dependencies(child, deps);
        }
    }

    /// ComplexTypes a registered type refers to without another named type in between
    pub fn direct_dependencies(&self, id: &Identifier) -> BTreeSet<Identifier> {
        let mut deps = BTreeSet::new();
        let start = Model::named(id.clone());
        let mut stack = self.children(&start);
        while let Some(model) = stack.pop() {
            match model.complex_identifier() {
                Some(dep) => {
                    deps.insert(dep);
                }
                None => stack.extend(model.inner_models()),
            }
        }
        deps
    }

    /// Build a petgraph view: one node per registered type, one edge per direct dependency
    pub fn dependency_graph(&self) -> DiGraph<Identifier, ()> {
        let mut graph = DiGraph::with_capacity(self.registry.len(), self.registry.len() * 2);
        let mut indices: HashMap<Identifier, NodeIndex> = HashMap::with_capacity(self.registry.len());

        for id in self.registry.identifiers() {
            let idx = graph.add_node(id.clone());
            indices.insert(id, idx);
        }
        for (id, &from) in &indices {
            for dep in self.direct_dependencies(id) {
                if let Some(&to) = indices.get(&dep) {
                    graph.add_edge(from, to, ());
                }
            }
        }
        graph
    }

    /// Export the dependency graph to GraphViz DOT, cyclic types highlighted
    pub fn to_dot(&self, cyclic: &CyclicSet) -> String {
        let graph = self.dependency_graph();
        let mut output = String::new();

        output.push_str("digraph ModelGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push('\n');

        let mut nodes: Vec<&Identifier> = graph.node_weights().collect();
        nodes.sort();
        for id in nodes {
            let kind = self
                .registry
                .lookup(id)
                .map(|definition| definition.kind.kind_name())
                .unwrap_or("unknown");
            let color = if cyclic.contains(id) { "#F44336" } else { "#90CAF9" };
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\\n<{}>\", fillcolor=\"{}\"];\n",
                id, id.name, kind, color
            ));
        }

        output.push('\n');

        let mut edges: Vec<(&Identifier, &Identifier)> = graph
            .edge_references()
            .map(|edge| (&graph[edge.source()], &graph[edge.target()]))
            .collect();
        edges.sort();
        for (source, target) in edges {
            output.push_str(&format!("  \"{}\" -> \"{}\";\n", source, target));
        }

        output.push_str("}\n");
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BuiltinType, ComplexKind, ComplexType, Field};
    use std::path::Path;

    fn record(registry: &mut TypeRegistry, ns: &str, name: &str, field_types: Vec<Model>) {
        let fields = field_types
            .into_iter()
            .enumerate()
            .map(|(i, model)| Field {
                name: format!("f{}", i),
                model,
                optional: false,
                default: None,
                doc: None,
            })
            .collect();
        registry.register(
            Identifier::new(ns, name),
            ComplexType {
                name: name.to_string(),
                doc: None,
                kind: ComplexKind::Record { fields },
            },
            Path::new("graph.pdsc"),
        );
    }

    fn link(ns: &str, name: &str) -> Model {
        Model::named(Identifier::new(ns, name))
    }

    fn registry() -> TypeRegistry {
        let mut registry = TypeRegistry::new();
        record(&mut registry, "ns", "Root", vec![
            Model::builtin(BuiltinType::Array { items: Box::new(link("ns", "Middle")) }),
        ]);
        record(&mut registry, "ns", "Middle", vec![link("ns", "Leaf"), link("ns", "Root")]);
        record(&mut registry, "ns", "Leaf", Vec::new());
        registry
    }

    #[test]
    fn test_dependencies_include_self_and_terminate_on_cycles() {
        let registry = registry();
        let graph = ModelGraph::new(&registry);
        let deps = graph.dependencies_of(&Identifier::new("ns", "Root"));
        let names: Vec<_> = deps.iter().map(|id| id.name.as_str()).collect();
        assert_eq!(names, vec!["Leaf", "Middle", "Root"]);
    }

    #[test]
    fn test_direct_dependencies_look_through_builtins_only() {
        let registry = registry();
        let graph = ModelGraph::new(&registry);
        let deps = graph.direct_dependencies(&Identifier::new("ns", "Root"));
        assert_eq!(deps.into_iter().collect::<Vec<_>>(), vec![Identifier::new("ns", "Middle")]);
    }

    #[test]
    fn test_dot_export_contains_edges() {
        let registry = registry();
        let graph = ModelGraph::new(&registry);
        let mut cyclic = CyclicSet::new();
        cyclic.mark(Identifier::new("ns", "Root"));

        let dot = graph.to_dot(&cyclic);
        assert!(dot.starts_with("digraph ModelGraph {"));
        assert!(dot.contains("\"ns.Root\" -> \"ns.Middle\";"));
        assert!(dot.contains("\"ns.Middle\" -> \"ns.Leaf\";"));
        assert_eq!(graph.dependency_graph().edge_count(), 3);
    }
}
