//! Configuration management for the model compiler
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (pdsc-codegen.toml)
//! - Environment variables (PDSC_*)
//!
//! ## Example config file (pdsc-codegen.toml):
//! ```toml
//! [input]
//! schema_dir = "./schemas"
//! extensions = ["pdsc", "json"]
//! skip_prefixes = ["target/", ".git/"]
//!
//! [output]
//! dir = "generated"
//! format = "pretty"
//!
//! [roots]
//! patterns = ["^com\\.example\\.api\\."]
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::graph::LoadConfig;

/// Main configuration for a compilation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodegenConfig {
    /// Where schema documents are read from
    #[serde(default)]
    pub input: InputConfig,

    /// Where generated files go
    #[serde(default)]
    pub output: OutputConfig,

    /// Which documents are compilation roots
    #[serde(default)]
    pub roots: RootsConfig,
}

/// Input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory holding the schema documents
    #[serde(default = "default_schema_dir")]
    pub schema_dir: PathBuf,

    /// File extensions treated as schema documents
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Skip documents under these relative path prefixes
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,

    /// Only load documents under these relative path prefixes
    #[serde(default)]
    pub include_prefixes: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory generated files are written to
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// JSON layout of generated files
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

/// Root selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootsConfig {
    /// Regexes matched against the qualified name of each document's top-level type.
    /// Empty means every document is a root.
    #[serde(default)]
    pub patterns: Vec<String>,
}

fn default_schema_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

fn default_extensions() -> Vec<String> {
    LoadConfig::default().extensions
}

fn default_skip_prefixes() -> Vec<String> {
    LoadConfig::default().skip_prefixes
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            schema_dir: default_schema_dir(),
            extensions: default_extensions(),
            skip_prefixes: default_skip_prefixes(),
            include_prefixes: Vec::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: OutputFormat::Pretty,
        }
    }
}

impl From<&InputConfig> for LoadConfig {
    fn from(input: &InputConfig) -> Self {
        Self {
            skip_prefixes: input.skip_prefixes.clone(),
            include_prefixes: input.include_prefixes.clone(),
            extensions: input.extensions.clone(),
        }
    }
}

impl CodegenConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&Path>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["pdsc-codegen.toml", ".pdsc-codegen.toml", "config/pdsc-codegen.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(dirs) = directories::ProjectDirs::from("dev", "pdsc", "pdsc-codegen") {
            let xdg_config = dirs.config_dir().join("pdsc-codegen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // PDSC_INPUT__SCHEMA_DIR=./schemas
        builder = builder.add_source(Environment::with_prefix("PDSC").separator("__").try_parsing(true));

        builder.build()?.try_deserialize()
    }

    /// Save configuration as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn load_config(&self) -> LoadConfig {
        LoadConfig::from(&self.input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CodegenConfig::default();
        assert_eq!(config.output.dir, PathBuf::from("generated"));
        assert_eq!(config.output.format, OutputFormat::Pretty);
        assert_eq!(config.input.extensions, vec!["pdsc", "json"]);
        assert!(config.roots.patterns.is_empty());
    }

    #[test]
    fn test_serialize_config() {
        let config = CodegenConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[input]"));
        assert!(toml_str.contains("[output]"));
        assert!(toml_str.contains("[roots]"));
    }

    #[test]
    fn test_save_then_load_explicit_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/pdsc-codegen.toml");
        let mut config = CodegenConfig::default();
        config.input.schema_dir = PathBuf::from("models");
        config.output.format = OutputFormat::Compact;
        config.roots.patterns = vec!["^com\\.example\\.".to_string()];

        config.save(&path).unwrap();
        let loaded = CodegenConfig::load_from(Some(&path)).unwrap();

        assert_eq!(loaded.input.schema_dir, PathBuf::from("models"));
        assert_eq!(loaded.output.format, OutputFormat::Compact);
        assert_eq!(loaded.roots.patterns, config.roots.patterns);
    }

    #[test]
    fn test_input_maps_to_load_config() {
        let mut config = CodegenConfig::default();
        config.input.include_prefixes = vec!["api/".to_string()];
        let load = config.load_config();
        assert_eq!(load.include_prefixes, vec!["api/"]);
        assert_eq!(load.extensions, config.input.extensions);
    }
}
