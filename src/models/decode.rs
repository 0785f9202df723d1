//! Model Decoder
//!
//! Turns one JSON schema value into a [`Model`]. Objects with a `type`
//! discriminator naming a schema variant are decoded as that variant and nothing
//! else. Everything else (bare strings, arrays, objects whose `type` is a type
//! expression) goes down a fixed ladder: bytes, primitive, reference, union.
//! Primitives and references share the bare-string shape and are told apart only
//! by the primitive keywords, which is why the ladder order is fixed.
//!
//! Every successfully decoded node runs its side-effect chain immediately
//! (register, propagate namespaces, resolve references), see [`Model::settle`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{BuiltinType, ComplexKind, ComplexType, Field, Identifier, Model, ModelKind, Primitive};
use crate::error::{DecodeError, VariantAttempt};
use crate::registry::TypeRegistry;

// Discriminator values
const RECORD: &str = "record";
const ENUM: &str = "enum";
const FIXED: &str = "fixed";
const MAP: &str = "map";
const ARRAY: &str = "array";
const TYPEREF: &str = "typeref";
const BYTES: &str = "bytes";

// =============================================================================
// Raw Shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    namespace: Option<String>,
    #[serde(rename = "type", default)]
    model_type: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    name: String,
    #[serde(default)]
    doc: Option<String>,
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    model: Value,
    #[serde(default)]
    optional: bool,
    #[serde(default)]
    default: Option<Value>,
    #[serde(default)]
    doc: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnum {
    name: String,
    #[serde(default)]
    doc: Option<String>,
    symbols: Vec<String>,
    #[serde(default)]
    symbol_docs: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawFixed {
    name: String,
    #[serde(default)]
    doc: Option<String>,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct RawTyperef {
    name: String,
    #[serde(default)]
    doc: Option<String>,
    #[serde(rename = "ref")]
    target: Value,
}

#[derive(Debug, Deserialize)]
struct RawMap {
    values: Value,
}

#[derive(Debug, Deserialize)]
struct RawArray {
    items: Value,
}

// =============================================================================
// Decoder
// =============================================================================

/// Decodes the documents of one source file against a shared registry
pub struct ModelDecoder<'r> {
    registry: &'r mut TypeRegistry,
    source_file: PathBuf,
}

impl<'r> ModelDecoder<'r> {
    pub fn new(registry: &'r mut TypeRegistry, source_file: impl AsRef<Path>) -> Self {
        Self {
            registry,
            source_file: source_file.as_ref().to_path_buf(),
        }
    }

    /// Decode a whole document. Fails if any reference is still dangling.
    pub fn decode_document(&mut self, value: &Value) -> Result<Model, DecodeError> {
        let model = self.decode(value)?;
        let references = model.unresolved_references();
        if !references.is_empty() {
            return Err(DecodeError::UnresolvedReferences { references });
        }
        Ok(model)
    }

    /// Decode one value and run its side-effect chain
    pub fn decode(&mut self, value: &Value) -> Result<Model, DecodeError> {
        let mut model = self.decode_shape(value)?;
        model.settle(self.registry, &self.source_file);
        Ok(model)
    }

    fn decode_shape(&mut self, value: &Value) -> Result<Model, DecodeError> {
        if !value.is_object() {
            return Ok(Model::new(self.decode_fallback(value, Vec::new())?));
        }

        let envelope = match Envelope::deserialize(value) {
            Ok(envelope) => envelope,
            Err(err) => {
                let attempts = vec![VariantAttempt { variant: "schema", reason: err.to_string() }];
                return Ok(Model::new(self.decode_fallback(value, attempts)?));
            }
        };

        let kind = match envelope.model_type.as_ref().and_then(Value::as_str) {
            Some(RECORD) => ModelKind::Complex(self.decode_record(value)?),
            Some(ENUM) => ModelKind::Complex(decode_enum(value)?),
            Some(FIXED) => ModelKind::Complex(decode_fixed(value)?),
            Some(TYPEREF) => ModelKind::Complex(self.decode_typeref(value)?),
            Some(MAP) => {
                let raw: RawMap = variant(MAP, value)?;
                ModelKind::Builtin(BuiltinType::Map {
                    values: Box::new(self.decode(&raw.values)?),
                })
            }
            Some(ARRAY) => {
                let raw: RawArray = variant(ARRAY, value)?;
                ModelKind::Builtin(BuiltinType::Array {
                    items: Box::new(self.decode(&raw.items)?),
                })
            }
            Some(BYTES) => ModelKind::Builtin(BuiltinType::Bytes),
            _ => match &envelope.model_type {
                Some(model_type) => self.decode_fallback(model_type, Vec::new())?,
                None => self.decode_fallback(value, Vec::new())?,
            },
        };

        let mut model = Model::new(kind);
        model.namespace = envelope.namespace.filter(|ns| !ns.is_empty());
        qualify_from_name(&mut model);
        Ok(model)
    }

    fn decode_fallback(
        &mut self,
        value: &Value,
        mut attempts: Vec<VariantAttempt>,
    ) -> Result<ModelKind, DecodeError> {
        match decode_bytes(value) {
            Ok(kind) => return Ok(kind),
            Err(reason) => attempts.push(VariantAttempt { variant: BYTES, reason }),
        }
        match decode_primitive(value) {
            Ok(kind) => return Ok(kind),
            Err(reason) => attempts.push(VariantAttempt { variant: "primitive", reason }),
        }
        match decode_reference(value) {
            Ok(kind) => return Ok(kind),
            Err(reason) => attempts.push(VariantAttempt { variant: "reference", reason }),
        }
        match self.decode_union(value) {
            Ok(kind) => return Ok(kind),
            Err(reason) => attempts.push(VariantAttempt { variant: "union", reason }),
        }

        Err(DecodeError::NoMatchingVariant {
            attempts,
            raw: value.to_string(),
        })
    }

    fn decode_union(&mut self, value: &Value) -> Result<ModelKind, String> {
        let Value::Array(raw_members) = value else {
            return Err("not an array".to_string());
        };
        let mut members = Vec::with_capacity(raw_members.len());
        for raw in raw_members {
            members.push(self.decode(raw).map_err(|err| err.to_string())?);
        }
        Ok(ModelKind::Builtin(BuiltinType::Union { members }))
    }

    fn decode_record(&mut self, value: &Value) -> Result<ComplexType, DecodeError> {
        let raw: RawRecord = variant(RECORD, value)?;
        let mut fields = Vec::with_capacity(raw.fields.len());
        for raw_field in raw.fields {
            fields.push(Field {
                model: self.decode(&raw_field.model)?,
                name: raw_field.name,
                optional: raw_field.optional,
                default: raw_field.default,
                doc: raw_field.doc,
            });
        }
        Ok(ComplexType {
            name: raw.name,
            doc: raw.doc,
            kind: ComplexKind::Record { fields },
        })
    }

    fn decode_typeref(&mut self, value: &Value) -> Result<ComplexType, DecodeError> {
        let raw: RawTyperef = variant(TYPEREF, value)?;
        Ok(ComplexType {
            kind: ComplexKind::Typeref {
                target: Box::new(self.decode(&raw.target)?),
            },
            name: raw.name,
            doc: raw.doc,
        })
    }
}

fn variant<T: DeserializeOwned>(variant: &'static str, value: &Value) -> Result<T, DecodeError> {
    T::deserialize(value).map_err(|source| DecodeError::InvalidVariant { variant, source })
}

fn decode_enum(value: &Value) -> Result<ComplexType, DecodeError> {
    let raw: RawEnum = variant(ENUM, value)?;
    Ok(ComplexType {
        name: raw.name,
        doc: raw.doc,
        kind: ComplexKind::Enum {
            symbols: raw.symbols,
            symbol_docs: raw.symbol_docs,
        },
    })
}

fn decode_fixed(value: &Value) -> Result<ComplexType, DecodeError> {
    let raw: RawFixed = variant(FIXED, value)?;
    Ok(ComplexType {
        name: raw.name,
        doc: raw.doc,
        kind: ComplexKind::Fixed { size: raw.size },
    })
}

fn decode_bytes(value: &Value) -> Result<ModelKind, String> {
    match value.as_str() {
        Some(BYTES) => Ok(ModelKind::Builtin(BuiltinType::Bytes)),
        Some(other) => Err(format!("{:?} is not bytes", other)),
        None => Err("not a string".to_string()),
    }
}

fn decode_primitive(value: &Value) -> Result<ModelKind, String> {
    let keyword = value.as_str().ok_or_else(|| "not a string".to_string())?;
    Primitive::from_keyword(keyword)
        .map(|p| ModelKind::Builtin(BuiltinType::Primitive(p)))
        .ok_or_else(|| format!("{:?} is not a primitive type", keyword))
}

fn decode_reference(value: &Value) -> Result<ModelKind, String> {
    let name = value.as_str().ok_or_else(|| "not a string".to_string())?;
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(format!("{:?} is not a type name", name));
    }
    Ok(ModelKind::Reference(Identifier::parse(name)))
}

/// `{"name": "com.example.Fortune"}` without a namespace field names its own namespace
fn qualify_from_name(model: &mut Model) {
    let ModelKind::Complex(complex) = &mut model.kind else {
        return;
    };
    let Some((namespace, name)) = complex.name.rsplit_once('.') else {
        return;
    };
    if model.namespace.is_none() {
        model.namespace = Some(namespace.to_string());
    }
    complex.name = name.to_string();
}
