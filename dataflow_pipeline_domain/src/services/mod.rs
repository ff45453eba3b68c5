// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Services
//!
//! Stateless domain logic that does not belong to a single entity: the
//! operation contract surface, structural type validation, schema
//! propagation, and the observability trait surface the engine emits into.

pub mod observability;
pub mod operation;
pub mod schema_propagator;
pub mod type_validator;

pub use observability::{MetricsCollector, NullMetricsCollector, NullTraceSink, TraceSink};
pub use operation::{
    ErrorPolicy, FieldContract, InlineOperation, InlineOperationBuilder, Operation, OperationCallable,
    OperationContract, OperationFuture, PrefixSchema, ANONYMOUS_OPERATION,
};
pub use schema_propagator::{PipeSchema, ResolvedContract, SchemaPropagator, StageSchema};
pub use type_validator::validate_value;
