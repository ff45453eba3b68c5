// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Type Descriptors
//!
//! Declarative, recursive type descriptors for namespace values. The
//! vocabulary is a closed sum — primitives, the two containers, object
//! shapes, `Any`, `Optional`, `Enum`, and `Union` — and the structural
//! validator in `services::type_validator` dispatches over it exhaustively.
//! There is no reflection and no open registry of types; what the enum
//! enumerates is everything the engine can check.
//!
//! ## Optionality
//!
//! Optional object-shape fields can be declared two ways with identical
//! meaning: a trailing `?` on the field name (`"subtitle?"`) or an
//! `Optional` wrapper at value level. Both permit the field to be missing
//! or null.
//!
//! # Examples
//!
//! ```
//! use dataflow_pipeline_domain::value_objects::TypeDescriptor;
//!
//! let descriptor = TypeDescriptor::array(TypeDescriptor::text());
//! assert_eq!(descriptor.to_string(), "Array[String]");
//!
//! let shape = TypeDescriptor::shape([
//!     ("title", TypeDescriptor::text()),
//!     ("subtitle?", TypeDescriptor::text()),
//! ]);
//! assert_eq!(shape.to_string(), "Shape{subtitle?: String, title: String}");
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value_objects::Value;

/// Primitive class tokens of the type vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    /// UTF-8 text
    Text,
    /// Signed integer
    Int,
    /// Floating point number
    Float,
    /// True or false only
    Bool,
    /// Symbolic token
    Symbol,
}

impl std::fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimitiveType::Text => write!(f, "String"),
            PrimitiveType::Int => write!(f, "Int"),
            PrimitiveType::Float => write!(f, "Float"),
            PrimitiveType::Bool => write!(f, "Bool"),
            PrimitiveType::Symbol => write!(f, "Symbol"),
        }
    }
}

/// One field of an object shape: the value type plus whether the field may
/// be absent or null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeField {
    pub descriptor: TypeDescriptor,
    pub optional: bool,
}

/// Recursive type descriptor for namespace values.
///
/// See the module documentation for the vocabulary. Equality is
/// structural, which is what parallel type-consistency checking compares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDescriptor {
    /// A primitive class token
    Primitive(PrimitiveType),
    /// A homogeneous sequence; the empty sequence always matches
    Array(Box<TypeDescriptor>),
    /// A homogeneous mapping over key and value types
    Mapping(Box<TypeDescriptor>, Box<TypeDescriptor>),
    /// An object shape; extra fields on the value are allowed
    Shape(BTreeMap<String, ShapeField>),
    /// Matches any value
    Any,
    /// Null or the wrapped type
    Optional(Box<TypeDescriptor>),
    /// One of a closed set of literal values
    Enum(Vec<Value>),
    /// Any branch may match
    Union(Vec<TypeDescriptor>),
}

impl TypeDescriptor {
    /// Text primitive
    pub fn text() -> Self {
        TypeDescriptor::Primitive(PrimitiveType::Text)
    }

    /// Integer primitive
    pub fn int() -> Self {
        TypeDescriptor::Primitive(PrimitiveType::Int)
    }

    /// Float primitive
    pub fn float() -> Self {
        TypeDescriptor::Primitive(PrimitiveType::Float)
    }

    /// Boolean primitive
    pub fn bool() -> Self {
        TypeDescriptor::Primitive(PrimitiveType::Bool)
    }

    /// Symbol primitive
    pub fn symbol() -> Self {
        TypeDescriptor::Primitive(PrimitiveType::Symbol)
    }

    /// Homogeneous array of the given element type
    pub fn array(element: TypeDescriptor) -> Self {
        TypeDescriptor::Array(Box::new(element))
    }

    /// Homogeneous mapping over the given key and value types
    pub fn mapping(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Mapping(Box::new(key), Box::new(value))
    }

    /// Null or the wrapped type
    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Optional(Box::new(inner))
    }

    /// Closed set of literal values
    pub fn one_of(values: impl IntoIterator<Item = Value>) -> Self {
        TypeDescriptor::Enum(values.into_iter().collect())
    }

    /// Union over the given branches
    pub fn union(branches: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        TypeDescriptor::Union(branches.into_iter().collect())
    }

    /// Builds an object shape from `(name, type)` pairs.
    ///
    /// A trailing `?` on a field name marks the field optional and is
    /// stripped from the stored name.
    pub fn shape<'a>(fields: impl IntoIterator<Item = (&'a str, TypeDescriptor)>) -> Self {
        let entries = fields
            .into_iter()
            .map(|(name, descriptor)| {
                let (name, optional) = match name.strip_suffix('?') {
                    Some(stripped) => (stripped, true),
                    None => (name, false),
                };
                (name.to_string(), ShapeField { descriptor, optional })
            })
            .collect();
        TypeDescriptor::Shape(entries)
    }

    /// Infers a descriptor from a literal value, used by declarations that
    /// promise a constant (`Link` assignments). Containers widen to `Any`
    /// element types; null and media yield no useful descriptor.
    pub fn of_value(value: &Value) -> Option<TypeDescriptor> {
        match value {
            Value::Bool(_) => Some(TypeDescriptor::bool()),
            Value::Int(_) => Some(TypeDescriptor::int()),
            Value::Float(_) => Some(TypeDescriptor::float()),
            Value::Text(_) => Some(TypeDescriptor::text()),
            Value::Symbol(_) => Some(TypeDescriptor::symbol()),
            Value::List(_) => Some(TypeDescriptor::array(TypeDescriptor::Any)),
            Value::Map(_) => Some(TypeDescriptor::mapping(TypeDescriptor::Any, TypeDescriptor::Any)),
            Value::Null | Value::Media(_) => None,
        }
    }
}

impl std::fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeDescriptor::Primitive(p) => write!(f, "{}", p),
            TypeDescriptor::Array(element) => write!(f, "Array[{}]", element),
            TypeDescriptor::Mapping(key, value) => write!(f, "Mapping[{}, {}]", key, value),
            TypeDescriptor::Shape(fields) => {
                write!(f, "Shape{{")?;
                for (idx, (name, field)) in fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    let marker = if field.optional { "?" } else { "" };
                    write!(f, "{}{}: {}", name, marker, field.descriptor)?;
                }
                write!(f, "}}")
            }
            TypeDescriptor::Any => write!(f, "Any"),
            TypeDescriptor::Optional(inner) => write!(f, "Optional[{}]", inner),
            TypeDescriptor::Enum(values) => {
                write!(f, "Enum[")?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value.describe())?;
                }
                write!(f, "]")
            }
            TypeDescriptor::Union(branches) => {
                write!(f, "Union[")?;
                for (idx, branch) in branches.iter().enumerate() {
                    if idx > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{}", branch)?;
                }
                write!(f, "]")
            }
        }
    }
}
