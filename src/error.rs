//! Error types for model loading and resolution

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::Identifier;

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, CodegenError>;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum CodegenError {
    #[error("Failed to deserialize {} file(s) after {retry_passes} retry pass(es):\n{}", .failures.len(), format_failures(.failures))]
    Load {
        failures: Vec<FileFailure>,
        retry_passes: usize,
    },

    #[error("{} depends on itself! ({})", .chain.first().map(|id| id.to_string()).unwrap_or_default(), format_chain(.chain))]
    SelfCycle { chain: Vec<Identifier> },

    #[error("Invalid root pattern: {0}")]
    InvalidRootPattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Why a single document could not be decoded
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid {variant} schema: {source}")]
    InvalidVariant {
        variant: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("illegal model type: [{}] ({raw})", format_attempts(.attempts))]
    NoMatchingVariant {
        attempts: Vec<VariantAttempt>,
        raw: String,
    },

    #[error("unresolved references: {}", format_chain_with(.references, ", "))]
    UnresolvedReferences { references: Vec<Identifier> },

    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One rung of the fallback ladder that did not match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantAttempt {
    pub variant: &'static str,
    pub reason: String,
}

impl fmt::Display for VariantAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.variant, self.reason)
    }
}

/// A document that was still failing when loading stopped making progress
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: DecodeError,
}

fn format_failures(failures: &[FileFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("  {}: {}", f.path.display(), f.error))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_attempts(attempts: &[VariantAttempt]) -> String {
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_chain(chain: &[Identifier]) -> String {
    format_chain_with(chain, " -> ")
}

fn format_chain_with(ids: &[Identifier], separator: &str) -> String {
    ids.iter()
        .map(|id| id.qualified_classpath())
        .collect::<Vec<_>>()
        .join(separator)
}
