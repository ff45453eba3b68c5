// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Value Objects
//!
//! Immutable, attribute-defined objects of the dataflow domain: field
//! names, dynamic values, namespaces, type descriptors, capabilities, and
//! invocation ids. None of them has identity; equality is structural.

pub mod capability;
pub mod execution_id;
pub mod field_name;
pub mod namespace;
pub mod type_descriptor;
pub mod value;

pub use capability::ModelCapability;
pub use execution_id::ExecutionId;
pub use field_name::{field, FieldName};
pub use namespace::Namespace;
pub use type_descriptor::{PrimitiveType, ShapeField, TypeDescriptor};
pub use value::{MediaValue, Value};
