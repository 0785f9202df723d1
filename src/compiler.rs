//! Compilation Pipeline
//!
//! load → settle → select roots → prune → detect cycles.
//!
//! [`CompiledModels`] is the hand-off to emitters: a pruned, read-only registry plus
//! the cyclic marks and the documents that were requested as roots. Emitters never
//! see raw JSON.

use std::path::Path;

use petgraph::graph::DiGraph;
use regex::Regex;
use tracing::info;

use crate::config::CodegenConfig;
use crate::error::Result;
use crate::graph::{
    load_from_directory, resolve_cyclic_dependencies, trim_unneeded_models, CycleAnalysis, LoadedDocument,
    ModelGraph,
};
use crate::models::{ComplexType, Identifier, Model};
use crate::registry::{CyclicSet, RegisteredType, TypeRegistry};

// =============================================================================
// Root Selection
// =============================================================================

/// Decides which loaded documents are compilation roots
#[derive(Debug, Clone, Default)]
pub struct RootSelector {
    patterns: Vec<Regex>,
}

impl RootSelector {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Every document is a root
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_root(&self, model: &Model) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        match model.complex_identifier() {
            Some(id) => {
                let classpath = id.qualified_classpath();
                self.patterns.iter().any(|p| p.is_match(&classpath))
            }
            None => false,
        }
    }
}

// =============================================================================
// Compiled Models
// =============================================================================

/// Everything an emitter needs, fixed after compilation
#[derive(Debug)]
pub struct CompiledModels {
    registry: TypeRegistry,
    cyclic: CyclicSet,
    roots: Vec<LoadedDocument>,
    analysis: CycleAnalysis,
    bundle_hash: String,
}

impl CompiledModels {
    /// Run the post-load stages over an already loaded registry.
    ///
    /// Settling again is a no-op for a registry coming out of the loader.
    pub fn build(
        mut registry: TypeRegistry,
        documents: Vec<LoadedDocument>,
        selector: &RootSelector,
        bundle_hash: String,
    ) -> Result<Self> {
        registry.settle();

        let roots: Vec<LoadedDocument> = documents.into_iter().filter(|doc| selector.is_root(&doc.model)).collect();
        trim_unneeded_models(&mut registry, roots.iter().map(|doc| &doc.model));

        let mut cyclic = CyclicSet::new();
        let analysis = resolve_cyclic_dependencies(&registry, &mut cyclic)?;

        info!(
            roots = roots.len(),
            types = registry.len(),
            cyclic = cyclic.len(),
            "Compiled models"
        );

        Ok(Self {
            registry,
            cyclic,
            roots,
            analysis,
            bundle_hash,
        })
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn cyclic(&self) -> &CyclicSet {
        &self.cyclic
    }

    /// Root documents in path order
    pub fn roots(&self) -> &[LoadedDocument] {
        &self.roots
    }

    pub fn analysis(&self) -> &CycleAnalysis {
        &self.analysis
    }

    pub fn bundle_hash(&self) -> &str {
        &self.bundle_hash
    }

    pub fn is_cyclic(&self, id: &Identifier) -> bool {
        self.cyclic.contains(id)
    }

    pub fn definition(&self, id: &Identifier) -> Option<&ComplexType> {
        self.registry.lookup(id)
    }

    pub fn source_file(&self, id: &Identifier) -> Option<&Path> {
        self.registry.source_file(id)
    }

    pub fn types(&self) -> impl Iterator<Item = (&Identifier, &RegisteredType)> {
        self.registry.iter()
    }

    pub fn graph(&self) -> ModelGraph<'_> {
        ModelGraph::new(&self.registry)
    }

    pub fn dependency_graph(&self) -> DiGraph<Identifier, ()> {
        self.graph().dependency_graph()
    }

    pub fn to_dot(&self) -> String {
        self.graph().to_dot(&self.cyclic)
    }
}

// =============================================================================
// Compiler
// =============================================================================

pub struct Compiler {
    config: CodegenConfig,
}

impl Compiler {
    pub fn new(config: CodegenConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    pub fn compile(&self) -> Result<CompiledModels> {
        let selector = RootSelector::new(&self.config.roots.patterns)?;
        let mut registry = TypeRegistry::new();
        let loaded = load_from_directory(&self.config.input.schema_dir, &self.config.load_config(), &mut registry)?;
        CompiledModels::build(registry, loaded.documents, &selector, loaded.bundle_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CodegenError;
    use crate::models::ModelDecoder;
    use serde_json::json;
    use std::path::PathBuf;

    fn load(registry: &mut TypeRegistry, path: &str, value: serde_json::Value) -> LoadedDocument {
        let model = ModelDecoder::new(registry, path).decode_document(&value).unwrap();
        LoadedDocument {
            path: PathBuf::from(path),
            model,
            checksum: String::new(),
        }
    }

    fn fixture() -> (TypeRegistry, Vec<LoadedDocument>) {
        let mut registry = TypeRegistry::new();
        let documents = vec![
            load(&mut registry, "Leaf.pdsc", json!({"type": "fixed", "name": "Leaf", "namespace": "com.a", "size": 4})),
            load(
                &mut registry,
                "Root.pdsc",
                json!({
                    "type": "record", "name": "Root", "namespace": "com.a",
                    "fields": [{"name": "leaf", "type": "Leaf"}]
                }),
            ),
            load(&mut registry, "Other.pdsc", json!({"type": "enum", "name": "Other", "namespace": "com.b", "symbols": ["X"]})),
        ];
        (registry, documents)
    }

    #[test]
    fn test_selector_without_patterns_accepts_everything() {
        let selector = RootSelector::all();
        assert!(selector.is_root(&Model::named(Identifier::new("com.a", "Root"))));
        assert!(selector.is_root(&Model::builtin(crate::models::BuiltinType::Bytes)));
    }

    #[test]
    fn test_selector_matches_qualified_classpath() {
        let selector = RootSelector::new(&["^com\\.a\\.R"]).unwrap();
        assert!(selector.is_root(&Model::named(Identifier::new("com.a", "Root"))));
        assert!(!selector.is_root(&Model::named(Identifier::new("com.b", "Root"))));
        assert!(!selector.is_root(&Model::builtin(crate::models::BuiltinType::Bytes)));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let err = RootSelector::new(&["(unclosed"]).unwrap_err();
        assert!(matches!(err, CodegenError::InvalidRootPattern(_)));
    }

    #[test]
    fn test_build_prunes_to_selected_roots() {
        let (registry, documents) = fixture();
        let selector = RootSelector::new(&["Root$"]).unwrap();

        let compiled = CompiledModels::build(registry, documents, &selector, "hash".into()).unwrap();

        assert_eq!(compiled.roots().len(), 1);
        assert!(compiled.definition(&Identifier::new("com.a", "Leaf")).is_some());
        assert!(compiled.definition(&Identifier::new("com.b", "Other")).is_none());
        assert_eq!(compiled.source_file(&Identifier::new("com.a", "Leaf")), Some(Path::new("Leaf.pdsc")));
        assert!(!compiled.is_cyclic(&Identifier::new("com.a", "Root")));
        assert_eq!(compiled.dependency_graph().edge_count(), 1);
        assert_eq!(compiled.bundle_hash(), "hash");
    }
}
