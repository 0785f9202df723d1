//! PDSC Model Compiler
//!
//! Loads a directory of PDSC-style JSON data-model documents, resolves every
//! named-type reference across documents and namespaces, prunes the result to what
//! the requested roots use, and flags the types that take part in recursive chains
//! so a backend can emit cycle-safe code for them.
//!
//! ## Pipeline
//!
//! ```text
//! schema dir ──walkdir──▶ loader (retry until no progress)
//!                            │  per document: decode → register → propagate → resolve
//!                            ▼
//!                       TypeRegistry ──settle──▶ prune to roots ──▶ cycle detection
//!                                                                        │
//!                                                                        ▼
//!                                                    CompiledModels ──▶ Emitter
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use pdsc_codegen::{CodegenConfig, Compiler};
//!
//! let compiled = Compiler::new(CodegenConfig::default()).compile()?;
//! for id in compiled.cyclic().iter() {
//!     println!("cyclic: {}", id);
//! }
//! # Ok::<(), pdsc_codegen::CodegenError>(())
//! ```

pub mod codegen;
pub mod compiler;
pub mod config;
pub mod error;
pub mod graph;
pub mod models;
pub mod registry;

pub use codegen::{CodeFile, Emitter, ManifestEmitter};
pub use compiler::{CompiledModels, Compiler, RootSelector};
pub use config::{CodegenConfig, OutputFormat};
pub use error::{CodegenError, DecodeError, Result};
pub use graph::{load_from_directory, LoadConfig, LoadedModels, ModelGraph};
pub use models::{ComplexKind, ComplexType, Identifier, Model, ModelDecoder, ModelKind};
pub use registry::{CyclicSet, TypeRegistry};
