// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Structural Type Validator
//!
//! Recursive validation of dynamic values against type descriptors with
//! path-aware errors. The validator dispatches exhaustively over the
//! closed descriptor vocabulary; there is no fallthrough case to hide a
//! forgotten variant.
//!
//! ## Error Format
//!
//! Failures render as `"<path>: expected <type>, got <value-descriptor>"`,
//! with field access spelled `a.b` and array indexing spelled `a[2]`.
//! Value descriptors truncate long strings to a prefix plus a length
//! marker (see [`Value::describe`]).
//!
//! # Examples
//!
//! ```
//! use dataflow_pipeline_domain::services::type_validator::validate_value;
//! use dataflow_pipeline_domain::value_objects::{TypeDescriptor, Value};
//!
//! let descriptor = TypeDescriptor::array(TypeDescriptor::int());
//! let value = Value::list([Value::int(1), Value::text("two")]);
//!
//! let err = validate_value(&value, &descriptor, "counts").unwrap_err();
//! assert!(err.to_string().contains("counts[1]: expected Int"));
//! ```

use crate::error::PipelineError;
use crate::value_objects::{PrimitiveType, TypeDescriptor, Value};

/// Validates a value against a descriptor, reporting the first mismatch.
///
/// `path` is the symbolic location of `value` and prefixes every error
/// message. Validation short-circuits on the first failure in document
/// order.
pub fn validate_value(value: &Value, descriptor: &TypeDescriptor, path: &str) -> Result<(), PipelineError> {
    match descriptor {
        TypeDescriptor::Any => Ok(()),

        TypeDescriptor::Primitive(primitive) => {
            if primitive_matches(value, *primitive) {
                Ok(())
            } else {
                Err(mismatch(path, descriptor, value))
            }
        }

        TypeDescriptor::Array(element) => match value {
            Value::List(items) => {
                for (idx, item) in items.iter().enumerate() {
                    validate_value(item, element, &format!("{}[{}]", path, idx))?;
                }
                Ok(())
            }
            _ => Err(mismatch(path, descriptor, value)),
        },

        TypeDescriptor::Mapping(key_type, value_type) => match value {
            Value::Map(entries) => {
                for (key, entry) in entries {
                    validate_map_key(key, key_type, path)?;
                    validate_value(entry, value_type, &format!("{}.{}", path, key))?;
                }
                Ok(())
            }
            _ => Err(mismatch(path, descriptor, value)),
        },

        TypeDescriptor::Shape(fields) => match value {
            Value::Map(entries) => {
                for (name, field) in fields {
                    let field_path = format!("{}.{}", path, name);
                    match entries.get(name) {
                        Some(Value::Null) if field.optional => {}
                        Some(entry) => validate_value(entry, &field.descriptor, &field_path)?,
                        None if field.optional => {}
                        None => {
                            return Err(PipelineError::PropertyNotFound(format!(
                                "{}: missing required field (expected {})",
                                field_path, field.descriptor
                            )));
                        }
                    }
                }
                // Extra fields on the value are allowed.
                Ok(())
            }
            _ => Err(mismatch(path, descriptor, value)),
        },

        TypeDescriptor::Optional(inner) => {
            if value.is_null() {
                Ok(())
            } else {
                validate_value(value, inner, path)
            }
        }

        TypeDescriptor::Enum(literals) => {
            if literals.contains(value) {
                Ok(())
            } else {
                Err(mismatch(path, descriptor, value))
            }
        }

        TypeDescriptor::Union(branches) => {
            for branch in branches {
                if validate_value(value, branch, path).is_ok() {
                    return Ok(());
                }
            }
            Err(mismatch(path, descriptor, value))
        }
    }
}

fn primitive_matches(value: &Value, primitive: PrimitiveType) -> bool {
    matches!(
        (value, primitive),
        (Value::Text(_), PrimitiveType::Text)
            | (Value::Int(_), PrimitiveType::Int)
            | (Value::Float(_), PrimitiveType::Float)
            | (Value::Bool(_), PrimitiveType::Bool)
            | (Value::Symbol(_), PrimitiveType::Symbol)
    )
}

// Mapping keys are stored as strings; a key descriptor of Text, Symbol, or
// Any accepts them, an Enum matches either string form, anything else is a
// mismatch on the key itself.
fn validate_map_key(key: &str, key_type: &TypeDescriptor, path: &str) -> Result<(), PipelineError> {
    let accepted = match key_type {
        TypeDescriptor::Any => true,
        TypeDescriptor::Primitive(PrimitiveType::Text) | TypeDescriptor::Primitive(PrimitiveType::Symbol) => true,
        TypeDescriptor::Enum(literals) => {
            literals.contains(&Value::text(key)) || literals.contains(&Value::symbol(key))
        }
        _ => false,
    };
    if accepted {
        Ok(())
    } else {
        Err(PipelineError::TypeMismatch(format!(
            "{}: expected mapping key of type {}, got \"{}\"",
            path, key_type, key
        )))
    }
}

fn mismatch(path: &str, descriptor: &TypeDescriptor, value: &Value) -> PipelineError {
    PipelineError::TypeMismatch(format!(
        "{}: expected {}, got {}",
        path,
        descriptor,
        value.describe()
    ))
}
