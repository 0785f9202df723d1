//! Schema Loading
//!
//! Walks a schema directory, decodes every document against a shared registry and
//! retries the documents that failed until a full pass makes no progress. A failed
//! document is usually waiting on a type that a later document defines; each
//! successful decode registers more types, so a retry can only help.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{CodegenError, DecodeError, FileFailure, Result};
use crate::models::{Model, ModelDecoder};
use crate::registry::TypeRegistry;

/// Configuration for schema loading
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Skip documents matching these path prefixes
    pub skip_prefixes: Vec<String>,
    /// Only load documents matching these path prefixes
    pub include_prefixes: Vec<String>,
    /// File extensions treated as schema documents
    pub extensions: Vec<String>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            skip_prefixes: vec![
                "target/".to_string(),
                ".git/".to_string(),
                "node_modules/".to_string(),
                "generated/".to_string(),
            ],
            include_prefixes: Vec::new(),
            extensions: vec!["pdsc".to_string(), "json".to_string()],
        }
    }
}

impl LoadConfig {
    fn accepts(&self, relative: &str) -> bool {
        if !self.include_prefixes.is_empty() && !self.include_prefixes.iter().any(|p| relative.starts_with(p)) {
            return false;
        }
        !self.skip_prefixes.iter().any(|p| relative.starts_with(p))
    }

    fn has_schema_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|allowed| allowed == ext))
            .unwrap_or(false)
    }
}

/// A successfully decoded document
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Path relative to the schema directory
    pub path: PathBuf,
    /// Fully resolved top-level model
    pub model: Model,
    /// SHA-256 of the document text
    pub checksum: String,
}

/// Result of loading a schema directory
#[derive(Debug, Clone)]
pub struct LoadedModels {
    /// Decoded documents in path order
    pub documents: Vec<LoadedDocument>,
    /// SHA-256 over every document text in path order
    pub bundle_hash: String,
    /// Retry passes needed after the initial pass
    pub retry_passes: usize,
}

struct SourceDocument {
    path: PathBuf,
    /// Raw bytes, or the error reading them failed with
    content: io::Result<Vec<u8>>,
}

impl SourceDocument {
    fn bytes(&self) -> &[u8] {
        self.content.as_deref().unwrap_or_default()
    }

    fn text(&self) -> std::result::Result<&str, DecodeError> {
        let bytes = self
            .content
            .as_deref()
            .map_err(|err| io::Error::new(err.kind(), err.to_string()))?;
        std::str::from_utf8(bytes).map_err(|err| DecodeError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
    }

    fn decode(&self, registry: &mut TypeRegistry) -> std::result::Result<Model, DecodeError> {
        let value: serde_json::Value = serde_json::from_str(self.text()?)?;
        ModelDecoder::new(registry, &self.path).decode_document(&value)
    }
}

/// Load and resolve every schema document under `schema_dir`
pub fn load_from_directory(schema_dir: &Path, config: &LoadConfig, registry: &mut TypeRegistry) -> Result<LoadedModels> {
    let sources = collect_sources(schema_dir, config)?;
    info!(dir = %schema_dir.display(), documents = sources.len(), "Loading schema documents");

    let mut hasher = Sha256::new();
    for source in &sources {
        hasher.update(source.bytes());
    }
    let bundle_hash = format!("{:x}", hasher.finalize());

    let mut documents = Vec::with_capacity(sources.len());
    let mut failures = decode_pass(&sources, (0..sources.len()).collect(), registry, &mut documents);
    let mut retry_passes = 0;

    while !failures.is_empty() {
        retry_passes += 1;
        let previous = failures.len();
        info!(pass = retry_passes, pending = previous, "Retrying failed documents");

        let pending = failures.into_iter().map(|(index, _)| index).collect();
        failures = decode_pass(&sources, pending, registry, &mut documents);

        if failures.len() == previous {
            for (index, error) in &failures {
                warn!(file = %sources[*index].path.display(), error = %error, "Document failed to load");
            }
            return Err(CodegenError::Load {
                failures: failures
                    .into_iter()
                    .map(|(index, error)| FileFailure {
                        path: sources[index].path.clone(),
                        error,
                    })
                    .collect(),
                retry_passes,
            });
        }
    }

    registry.settle();
    documents.sort_by(|a, b| a.path.cmp(&b.path));
    info!(
        documents = documents.len(),
        types = registry.len(),
        retry_passes,
        "Loaded schema documents"
    );

    Ok(LoadedModels {
        documents,
        bundle_hash,
        retry_passes,
    })
}

/// Decode the given documents once. Returns the ones that failed with their errors.
fn decode_pass(
    sources: &[SourceDocument],
    pending: Vec<usize>,
    registry: &mut TypeRegistry,
    documents: &mut Vec<LoadedDocument>,
) -> Vec<(usize, DecodeError)> {
    let mut failures = Vec::new();
    for index in pending {
        let source = &sources[index];
        match source.decode(registry) {
            Ok(model) => {
                debug!(file = %source.path.display(), "Decoded document");
                documents.push(LoadedDocument {
                    path: source.path.clone(),
                    model,
                    checksum: format!("{:x}", Sha256::digest(source.bytes())),
                });
            }
            Err(error) => {
                debug!(file = %source.path.display(), error = %error, "Document not decoded yet");
                failures.push((index, error));
            }
        }
    }
    failures
}

fn collect_sources(schema_dir: &Path, config: &LoadConfig) -> Result<Vec<SourceDocument>> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(schema_dir).sort_by_file_name() {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() || !config.has_schema_extension(path) {
            continue;
        }

        let relative = path.strip_prefix(schema_dir).unwrap_or(path).to_path_buf();
        if !config.accepts(&relative.to_string_lossy()) {
            continue;
        }

        sources.push(SourceDocument {
            content: fs::read(path),
            path: relative,
        });
    }
    sources.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identifier;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_filters_by_extension_and_prefix() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a/Hash.pdsc", r#"{"type": "fixed", "name": "Hash", "namespace": "a", "size": 16}"#);
        write(&dir, "a/notes.txt", "not a schema");
        write(&dir, "target/Skip.pdsc", r#"{"type": "fixed", "name": "Skip", "namespace": "t", "size": 1}"#);

        let mut registry = TypeRegistry::new();
        let loaded = load_from_directory(dir.path(), &LoadConfig::default(), &mut registry).unwrap();

        assert_eq!(loaded.documents.len(), 1);
        assert_eq!(loaded.documents[0].path, PathBuf::from("a/Hash.pdsc"));
        assert!(registry.contains(&Identifier::new("a", "Hash")));
        assert!(!registry.contains(&Identifier::new("t", "Skip")));
    }

    #[test]
    fn test_include_prefixes_restrict_input() {
        let dir = TempDir::new().unwrap();
        write(&dir, "keep/A.pdsc", r#"{"type": "fixed", "name": "A", "namespace": "k", "size": 1}"#);
        write(&dir, "other/B.pdsc", r#"{"type": "fixed", "name": "B", "namespace": "o", "size": 1}"#);
        let config = LoadConfig {
            include_prefixes: vec!["keep/".to_string()],
            ..LoadConfig::default()
        };

        let mut registry = TypeRegistry::new();
        let loaded = load_from_directory(dir.path(), &config, &mut registry).unwrap();

        assert_eq!(loaded.documents.len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_malformed_json_reports_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "Broken.pdsc", "{ not json");

        let mut registry = TypeRegistry::new();
        let err = load_from_directory(dir.path(), &LoadConfig::default(), &mut registry).unwrap_err();

        match err {
            CodegenError::Load { failures, retry_passes } => {
                assert_eq!(retry_passes, 1);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].path, PathBuf::from("Broken.pdsc"));
                assert!(matches!(failures[0].error, DecodeError::Json(_)));
            }
            other => panic!("expected Load error, got {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_document_joins_aggregate_failure() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Bad.pdsc"), [0xff, 0xfe, b'{']).unwrap();
        write(
            &dir,
            "Orphan.pdsc",
            r#"{"type": "record", "name": "Orphan", "namespace": "k",
                "fields": [{"name": "ghost", "type": "k.Ghost"}]}"#,
        );
        write(&dir, "Fine.pdsc", r#"{"type": "fixed", "name": "Fine", "namespace": "k", "size": 1}"#);

        let mut registry = TypeRegistry::new();
        let err = load_from_directory(dir.path(), &LoadConfig::default(), &mut registry).unwrap_err();

        match err {
            CodegenError::Load { failures, retry_passes } => {
                assert_eq!(retry_passes, 1);
                let paths: Vec<_> = failures.iter().map(|f| f.path.clone()).collect();
                assert_eq!(paths, vec![PathBuf::from("Bad.pdsc"), PathBuf::from("Orphan.pdsc")]);
                match &failures[0].error {
                    DecodeError::Io(io_err) => assert_eq!(io_err.kind(), io::ErrorKind::InvalidData),
                    other => panic!("expected Io error, got {:?}", other),
                }
                assert!(matches!(failures[1].error, DecodeError::UnresolvedReferences { .. }));
            }
            other => panic!("expected Load error, got {:?}", other),
        }
        assert!(registry.contains(&Identifier::new("k", "Fine")));
    }

    #[test]
    fn test_checksums_are_stable() {
        let dir = TempDir::new().unwrap();
        write(&dir, "A.pdsc", r#"{"type": "fixed", "name": "A", "namespace": "k", "size": 1}"#);

        let first = load_from_directory(dir.path(), &LoadConfig::default(), &mut TypeRegistry::new()).unwrap();
        let second = load_from_directory(dir.path(), &LoadConfig::default(), &mut TypeRegistry::new()).unwrap();

        assert_eq!(first.bundle_hash, second.bundle_hash);
        assert_eq!(first.documents[0].checksum.len(), 64);
        assert_eq!(first.retry_passes, 0);
    }
}
