// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Dataflow Pipeline Domain
//!
//! The pure core of the staged pipeline execution engine: what a pipeline
//! *is*, independent of how it runs. This crate has no runtime, no I/O, and
//! no logging; it defines the data model and the construction-time laws the
//! engine crate enforces at execution time.
//!
//! ## Domain Concepts
//!
//! ### Value Objects
//! Immutable, attribute-defined objects:
//! - [`Namespace`]: the immutable keyed record flowing between operations
//! - [`Value`]: the closed dynamic value sum namespaces carry
//! - [`FieldName`]: canonical symbolic field keys
//! - [`TypeDescriptor`]: recursive declarative type descriptors
//! - [`ModelCapability`]: the fixed capability vocabulary
//! - [`ExecutionId`]: time-ordered identity of one pipe invocation
//!
//! ### Entities
//! Objects with identity and validated construction:
//! - [`Stage`]: an ordered operation group with a mode and merge strategy
//! - [`Pipe`]: a stage sequence with a proven end-to-end schema
//! - [`ModelRecord`] / [`ModelRegistry`]: named model descriptions
//!
//! ### Domain Services
//! Stateless logic spanning entities:
//! - [`Operation`]: the unified contract every work unit implements
//! - [`SchemaPropagator`]: the left-to-right prefix-schema flow analysis
//! - [`services::type_validator`]: structural validation with path-aware
//!   errors
//! - [`MetricsCollector`] / [`TraceSink`]: the observability surface the
//!   engine emits into
//!
//! ## Error Handling
//!
//! All fallible paths return [`PipelineError`], a single flat enum grouped
//! into configuration, execution, and contract categories.

pub mod entities;
pub mod error;
pub mod services;
pub mod value_objects;

// Re-export the working vocabulary at crate root for convenient access
pub use entities::{ExecutionMode, MergeStrategy, ModelRecord, ModelRegistry, Pipe, Stage};
pub use error::PipelineError;
pub use services::{
    ErrorPolicy, FieldContract, InlineOperation, MetricsCollector, NullMetricsCollector, NullTraceSink, Operation,
    OperationCallable, OperationContract, OperationFuture, PipeSchema, PrefixSchema, SchemaPropagator, TraceSink,
};
pub use value_objects::{
    field, ExecutionId, FieldName, MediaValue, ModelCapability, Namespace, PrimitiveType, TypeDescriptor, Value,
};
