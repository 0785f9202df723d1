//! JSON manifest of a compilation run
//!
//! A language-neutral description of every reachable type, enough for an external
//! backend to generate code without re-reading the schema documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CodeFile, Emitter};
use crate::compiler::CompiledModels;
use crate::config::OutputFormat;
use crate::error::Result;
use crate::models::{ComplexKind, Identifier};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Top-level manifest document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// When this manifest was generated
    pub generated_at: DateTime<Utc>,
    /// SHA-256 over every input document
    pub bundle_hash: String,
    /// Qualified names of the root documents' top-level types
    pub roots: Vec<String>,
    /// Types that need cycle-safe handling
    pub cyclic: Vec<String>,
    pub types: Vec<TypeEntry>,
}

/// One reachable named type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeEntry {
    pub id: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub source_file: String,
    pub cyclic: bool,
    /// Named types referenced without another named type in between
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub model: String,
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl Manifest {
    pub fn from_models(models: &CompiledModels) -> Self {
        let graph = models.graph();

        let types = models
            .types()
            .map(|(id, entry)| {
                let definition = &entry.definition;
                let mut type_entry = TypeEntry {
                    id: id.qualified_classpath(),
                    kind: definition.kind.kind_name().to_string(),
                    doc: definition.doc.clone(),
                    source_file: entry.source_file.to_string_lossy().into_owned(),
                    cyclic: models.is_cyclic(id),
                    dependencies: graph
                        .direct_dependencies(id)
                        .iter()
                        .map(Identifier::qualified_classpath)
                        .collect(),
                    fields: Vec::new(),
                    symbols: Vec::new(),
                    size: None,
                    target: None,
                };
                match &definition.kind {
                    ComplexKind::Record { fields } => {
                        type_entry.fields = fields
                            .iter()
                            .map(|field| FieldEntry {
                                name: field.name.clone(),
                                model: field.model.to_string(),
                                optional: field.optional,
                                default: field.default.clone(),
                            })
                            .collect();
                    }
                    ComplexKind::Enum { symbols, .. } => type_entry.symbols = symbols.clone(),
                    ComplexKind::Fixed { size } => type_entry.size = Some(*size),
                    ComplexKind::Typeref { target } => type_entry.target = Some(target.to_string()),
                }
                type_entry
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            bundle_hash: models.bundle_hash().to_string(),
            roots: models
                .roots()
                .iter()
                .filter_map(|doc| doc.model.complex_identifier())
                .map(|id| id.qualified_classpath())
                .collect(),
            cyclic: models.cyclic().iter().map(Identifier::qualified_classpath).collect(),
            types,
        }
    }
}

/// Writes `manifest.json` at the root of the output directory
#[derive(Debug, Clone, Default)]
pub struct ManifestEmitter {
    format: OutputFormat,
}

impl ManifestEmitter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl Emitter for ManifestEmitter {
    fn name(&self) -> &'static str {
        "manifest"
    }

    fn emit(&self, models: &CompiledModels) -> Result<Vec<CodeFile>> {
        let manifest = Manifest::from_models(models);
        let contents = match self.format {
            OutputFormat::Pretty => serde_json::to_string_pretty(&manifest)?,
            OutputFormat::Compact => serde_json::to_string(&manifest)?,
        };
        Ok(vec![CodeFile::new("", MANIFEST_FILE, contents)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::RootSelector;
    use crate::graph::LoadedDocument;
    use crate::models::ModelDecoder;
    use crate::registry::TypeRegistry;
    use serde_json::json;
    use std::path::PathBuf;

    fn compiled() -> CompiledModels {
        let mut registry = TypeRegistry::new();
        let value = json!({
            "type": "record", "name": "Order", "namespace": "com.shop",
            "fields": [
                {"name": "status", "type": {"type": "enum", "name": "Status", "symbols": ["OPEN", "CLOSED"]}},
                {"name": "lines", "type": {"type": "array", "items": "string"}, "optional": true}
            ]
        });
        let model = ModelDecoder::new(&mut registry, "Order.pdsc").decode_document(&value).unwrap();
        let documents = vec![LoadedDocument {
            path: PathBuf::from("Order.pdsc"),
            model,
            checksum: String::new(),
        }];
        CompiledModels::build(registry, documents, &RootSelector::all(), "abc".into()).unwrap()
    }

    #[test]
    fn test_manifest_describes_reachable_types() {
        let manifest = Manifest::from_models(&compiled());

        assert_eq!(manifest.roots, vec!["com.shop.Order"]);
        assert!(manifest.cyclic.is_empty());
        assert_eq!(manifest.types.len(), 2);

        let order = manifest.types.iter().find(|t| t.id == "com.shop.Order").unwrap();
        assert_eq!(order.kind, "record");
        assert_eq!(order.dependencies, vec!["com.shop.Status"]);
        assert_eq!(order.fields.len(), 2);
        assert!(order.fields[1].optional);

        let status = manifest.types.iter().find(|t| t.id == "com.shop.Status").unwrap();
        assert_eq!(status.symbols, vec!["OPEN", "CLOSED"]);
        assert_eq!(status.source_file, "Order.pdsc");
    }

    #[test]
    fn test_compact_format_is_single_line() {
        let files = ManifestEmitter::new(OutputFormat::Compact).emit(&compiled()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, MANIFEST_FILE);
        assert!(!files[0].contents.contains('\n'));

        let parsed: Manifest = serde_json::from_str(&files[0].contents).unwrap();
        assert_eq!(parsed.bundle_hash, "abc");
    }
}
