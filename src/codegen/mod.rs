//! Code Generation
//!
//! Emitters turn [`CompiledModels`] into files. They run after every type is resolved,
//! pruned and marked, and read nothing but the compiled models.

pub mod manifest;

pub use manifest::{Manifest, ManifestEmitter, TypeEntry};

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::compiler::CompiledModels;
use crate::error::Result;

/// A language backend
pub trait Emitter {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn emit(&self, models: &CompiledModels) -> Result<Vec<CodeFile>>;
}

/// One generated file, relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFile {
    /// Directory derived from a namespace (`com.example` → `com/example`)
    pub package_path: PathBuf,
    pub filename: String,
    pub contents: String,
}

impl CodeFile {
    pub fn new(package_path: impl Into<PathBuf>, filename: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            package_path: package_path.into(),
            filename: filename.into(),
            contents: contents.into(),
        }
    }

    pub fn relative_path(&self) -> PathBuf {
        self.package_path.join(&self.filename)
    }

    /// Write under `output_dir`, creating parent directories
    pub fn write(&self, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join(self.relative_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &self.contents)?;
        debug!(file = %path.display(), bytes = self.contents.len(), "Wrote generated file");
        Ok(path)
    }
}

/// Run an emitter and write everything it produced
pub fn emit_to(emitter: &dyn Emitter, models: &CompiledModels, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let files = emitter.emit(models)?;
    debug!(emitter = emitter.name(), files = files.len(), "Emitted files");
    files.iter().map(|file| file.write(output_dir)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identifier;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_package_directories() {
        let dir = TempDir::new().unwrap();
        let package = Identifier::new("com.example", "Fortune").package_path();
        let file = CodeFile::new(package, "Fortune.json", "{}");

        let written = file.write(dir.path()).unwrap();

        assert_eq!(written, dir.path().join("com/example/Fortune.json"));
        assert_eq!(fs::read_to_string(written).unwrap(), "{}");
    }
}
