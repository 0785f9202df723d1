//! Data Model Tree
//!
//! A decoded schema document is a tree of [`Model`] nodes. Every node carries an
//! optional namespace (its own, or one inherited from its parent) and exactly one
//! payload:
//!
//! - [`BuiltinType`]: unnamed structural types (primitives, bytes, array, map, union)
//! - [`ComplexType`]: named, registrable types (record, enum, fixed, typeref)
//! - `Named`: a resolved link to a ComplexType held by the type registry
//! - `Reference`: a pointer-by-name that has not been resolved yet
//!
//! Resolved references never own the definition they point at. Recursive schemas
//! (a record that transitively contains itself) therefore stay finite; walks that
//! need to look through a link go via [`crate::graph::ModelGraph`].

pub mod decode;
pub mod identifier;
pub mod resolve;

pub use decode::ModelDecoder;
pub use identifier::Identifier;

use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Model
// =============================================================================

/// One node of a decoded schema tree
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    /// Own namespace, explicit or inherited. `None` until one is known.
    pub namespace: Option<String>,
    pub kind: ModelKind,
}

/// The polymorphic payload of a [`Model`]
#[derive(Debug, Clone, PartialEq)]
pub enum ModelKind {
    Builtin(BuiltinType),
    Complex(ComplexType),
    /// Resolved reference: the definition lives in the type registry
    Named(Identifier),
    /// Unresolved reference, only valid while loading
    Reference(Identifier),
}

impl Model {
    pub fn new(kind: ModelKind) -> Self {
        Self { namespace: None, kind }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = if namespace.is_empty() { None } else { Some(namespace) };
        self
    }

    pub fn builtin(builtin: BuiltinType) -> Self {
        Self::new(ModelKind::Builtin(builtin))
    }

    pub fn complex(complex: ComplexType) -> Self {
        Self::new(ModelKind::Complex(complex))
    }

    /// A resolved link to a registered type
    pub fn named(identifier: Identifier) -> Self {
        let namespace = identifier.namespace.clone();
        Self::new(ModelKind::Named(identifier)).with_namespace(namespace)
    }

    pub fn reference(identifier: Identifier) -> Self {
        Self::new(ModelKind::Reference(identifier))
    }

    /// Namespace as a string slice, empty when unknown
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or("")
    }

    /// Identifier of the ComplexType this node stands for, inline or linked
    pub fn complex_identifier(&self) -> Option<Identifier> {
        match &self.kind {
            ModelKind::Complex(complex) => Some(Identifier::new(self.namespace(), &complex.name)),
            ModelKind::Named(id) => Some(id.clone()),
            _ => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, ModelKind::Reference(_))
    }

    /// Every reference in this tree that is still dangling
    pub fn unresolved_references(&self) -> Vec<Identifier> {
        let mut references = Vec::new();
        self.collect_unresolved(&mut references);
        references.sort();
        references.dedup();
        references
    }

    fn collect_unresolved(&self, references: &mut Vec<Identifier>) {
        if let ModelKind::Reference(id) = &self.kind {
            references.push(id.clone());
        }
        for child in self.inner_models() {
            child.collect_unresolved(references);
        }
    }

    /// Short kind label used in manifests and diagnostics
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ModelKind::Builtin(builtin) => builtin.kind_name(),
            ModelKind::Complex(complex) => complex.kind.kind_name(),
            ModelKind::Named(_) => "named",
            ModelKind::Reference(_) => "reference",
        }
    }
}

/// Renders a model as a type expression, e.g. `map<array<com.example.Item>>`
impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ModelKind::Builtin(BuiltinType::Primitive(p)) => write!(f, "{}", p.keyword()),
            ModelKind::Builtin(BuiltinType::Bytes) => write!(f, "bytes"),
            ModelKind::Builtin(BuiltinType::Array { items }) => write!(f, "array<{}>", items),
            ModelKind::Builtin(BuiltinType::Map { values }) => write!(f, "map<{}>", values),
            ModelKind::Builtin(BuiltinType::Union { members }) => {
                let members: Vec<String> = members.iter().map(|m| m.to_string()).collect();
                write!(f, "union[{}]", members.join(", "))
            }
            ModelKind::Complex(complex) => {
                write!(f, "{}", Identifier::new(self.namespace(), &complex.name))
            }
            ModelKind::Named(id) => write!(f, "{}", id),
            ModelKind::Reference(id) => write!(f, "?{}", id),
        }
    }
}

// =============================================================================
// Builtin Types
// =============================================================================

/// Unnamed structural types
#[derive(Debug, Clone, PartialEq)]
pub enum BuiltinType {
    Primitive(Primitive),
    Bytes,
    Array { items: Box<Model> },
    Map { values: Box<Model> },
    Union { members: Vec<Model> },
}

impl BuiltinType {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::Bytes => "bytes",
            Self::Array { .. } => "array",
            Self::Map { .. } => "map",
            Self::Union { .. } => "union",
        }
    }
}

/// Primitive keywords a bare type string may name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Null,
}

impl Primitive {
    pub const ALL: [Primitive; 7] = [
        Self::String,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
        Self::Boolean,
        Self::Null,
    ];

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.keyword() == keyword)
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

// =============================================================================
// Complex Types
// =============================================================================

/// A named type. Its namespace is the namespace of the [`Model`] holding it.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexType {
    pub name: String,
    pub doc: Option<String>,
    pub kind: ComplexKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComplexKind {
    Record { fields: Vec<Field> },
    Enum {
        symbols: Vec<String>,
        symbol_docs: BTreeMap<String, String>,
    },
    Fixed { size: u64 },
    /// Named alias for another type
    Typeref { target: Box<Model> },
}

impl ComplexKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Record { .. } => "record",
            Self::Enum { .. } => "enum",
            Self::Fixed { .. } => "fixed",
            Self::Typeref { .. } => "typeref",
        }
    }
}

/// A record field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub model: Model,
    pub optional: bool,
    pub default: Option<serde_json::Value>,
    pub doc: Option<String>,
}

// =============================================================================
// Inner Models
// =============================================================================

/// Structural children of a node.
///
/// Every whole-tree pass (namespace propagation, reference resolution, dependency
/// and cycle walks) is a recursion over this one capability.
pub trait InnerModels {
    fn inner_models(&self) -> Vec<&Model>;
    fn inner_models_mut(&mut self) -> Vec<&mut Model>;
}

impl InnerModels for BuiltinType {
    fn inner_models(&self) -> Vec<&Model> {
        match self {
            Self::Array { items } => vec![items.as_ref()],
            Self::Map { values } => vec![values.as_ref()],
            Self::Union { members } => members.iter().collect(),
            Self::Primitive(_) | Self::Bytes => Vec::new(),
        }
    }

    fn inner_models_mut(&mut self) -> Vec<&mut Model> {
        match self {
            Self::Array { items } => vec![items.as_mut()],
            Self::Map { values } => vec![values.as_mut()],
            Self::Union { members } => members.iter_mut().collect(),
            Self::Primitive(_) | Self::Bytes => Vec::new(),
        }
    }
}

impl InnerModels for ComplexType {
    fn inner_models(&self) -> Vec<&Model> {
        match &self.kind {
            ComplexKind::Record { fields } => fields.iter().map(|f| &f.model).collect(),
            ComplexKind::Typeref { target } => vec![target.as_ref()],
            ComplexKind::Enum { .. } | ComplexKind::Fixed { .. } => Vec::new(),
        }
    }

    fn inner_models_mut(&mut self) -> Vec<&mut Model> {
        match &mut self.kind {
            ComplexKind::Record { fields } => fields.iter_mut().map(|f| &mut f.model).collect(),
            ComplexKind::Typeref { target } => vec![target.as_mut()],
            ComplexKind::Enum { .. } | ComplexKind::Fixed { .. } => Vec::new(),
        }
    }
}

impl InnerModels for Model {
    fn inner_models(&self) -> Vec<&Model> {
        match &self.kind {
            ModelKind::Builtin(builtin) => builtin.inner_models(),
            ModelKind::Complex(complex) => complex.inner_models(),
            ModelKind::Named(_) | ModelKind::Reference(_) => Vec::new(),
        }
    }

    fn inner_models_mut(&mut self) -> Vec<&mut Model> {
        match &mut self.kind {
            ModelKind::Builtin(builtin) => builtin.inner_models_mut(),
            ModelKind::Complex(complex) => complex.inner_models_mut(),
            ModelKind::Named(_) | ModelKind::Reference(_) => Vec::new(),
        }
    }
}
