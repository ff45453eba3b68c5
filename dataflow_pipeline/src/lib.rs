// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Dataflow Pipeline
//!
//! A staged pipeline execution engine for composing discrete operations
//! into deterministic, contract-checked, concurrently-executable
//! dataflows. A typed input record enters a pipe, flows through an ordered
//! list of stages — each running one or more operations in parallel under
//! a bounded worker pool — and leaves as a single typed output record,
//! with every operation held to the fields it declared it would read, set,
//! and delete.
//!
//! ## Architecture Overview
//!
//! The workspace follows the domain/infrastructure split:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer                          │
//! │  (PipeRunner: invocation orchestration, call options)       │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! │  (Namespace, Value, TypeDescriptor, Operation contracts,    │
//! │   Stage, Pipe, SchemaPropagator, observability traits)      │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer                         │
//! │  (OperationExecutor, StageScheduler, TimeBudget, config     │
//! │   documents + PipeBuilder, metrics, tracer, adapters,       │
//! │   built-in dataflow operations)                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Concepts
//!
//! ### Namespace
//! The immutable keyed record flowing between operations. Merging and
//! deleting return new instances; parallel workers can never observe each
//! other's intermediate state.
//!
//! ### Operation
//! A unit of work declaring the fields it reads, sets, and deletes,
//! optionally a required model capability, an error policy, and a
//! timeout. Contracts may be static tables or computed from the prefix
//! schema.
//!
//! ### Stage
//! An ordered operation group executed under one of three modes (`merge`,
//! `fan_out`, `batch`) whose parallel outputs combine through one of four
//! merge strategies (`last_in`, `first_in`, `collate`, `disjoint`).
//!
//! ### Pipe
//! A stage sequence proven compatible at construction: the schema
//! propagator walks the stages with the accumulated prefix schema and
//! rejects unsatisfiable reads and conflicting parallel types before
//! anything executes.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use dataflow_pipeline::application::services::PipeRunner;
//! use dataflow_pipeline::{
//!     field, ExecutionMode, InlineOperation, MergeStrategy, Namespace, Operation, Pipe, Stage,
//!     TypeDescriptor, Value,
//! };
//!
//! # fn main() -> Result<(), dataflow_pipeline::PipelineError> {
//! let upcase: Arc<dyn Operation> = Arc::new(
//!     InlineOperation::builder("upcase")
//!         .reads("greeting", TypeDescriptor::text())
//!         .sets("shout", TypeDescriptor::text())
//!         .map(|ns| {
//!             let text = ns.get(&field("greeting")).and_then(|v| v.as_text()).unwrap_or_default();
//!             Ok([(field("shout"), Value::text(text.to_uppercase()))].into())
//!         }),
//! );
//!
//! let stage = Stage::new("shout", ExecutionMode::Merge, vec![upcase], MergeStrategy::LastIn)?;
//! let pipe = Pipe::new("demo", vec![stage])?;
//!
//! let runtime = tokio::runtime::Runtime::new().map_err(dataflow_pipeline::PipelineError::from)?;
//! let output = runtime.block_on(
//!     PipeRunner::new().run(&pipe, Namespace::from_pairs([("greeting", Value::text("hi"))])),
//! )?;
//! assert_eq!(output.get(&field("shout")), Some(&Value::text("HI")));
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every failure is a [`PipelineError`] variant grouped into
//! configuration (construction-time), execution (invocation-time), and
//! contract (executor-raised) categories.
//!
//! ## Observability
//!
//! Pipe, stage, and operation lifecycles emit into two injectable sinks:
//! a structured [`MetricsCollector`] (null, in-memory, and Prometheus
//! implementations included) and a human-readable
//! [`TraceSink`](dataflow_pipeline_domain::TraceSink) (console and
//! buffered implementations included).

pub mod application;
pub mod infrastructure;

// Tests are organized as:
// - Unit tests: #[cfg(test)] modules within each source file
// - Integration tests: separate files in tests/ directory

// Re-export domain types for convenient access
pub use dataflow_pipeline_domain::{
    field, ErrorPolicy, ExecutionId, ExecutionMode, FieldContract, FieldName, InlineOperation, MediaValue,
    MergeStrategy, MetricsCollector, ModelCapability, ModelRecord, ModelRegistry, Namespace, NullMetricsCollector,
    NullTraceSink, Operation, OperationCallable, OperationContract, Pipe, PipelineError, PrefixSchema,
    SchemaPropagator, Stage, TraceSink, TypeDescriptor, Value,
};

// Re-export the engine's working surface
pub use application::services::{CallOptions, PipeRunner};
pub use infrastructure::config::{
    GlobalDocument, OperationRegistry, OperationSpec, PipeBuilder, PipeCatalog, PipeDocument, SecretResolver,
};
pub use infrastructure::metrics::{BasicMetricsCollector, BufferTraceSink, ConsoleTraceSink, MetricsService};
pub use infrastructure::runtime::DEFAULT_MAX_PARALLEL_OPERATIONS;
pub use infrastructure::services::{
    CollapseMode, CollapseOperation, ExplodeOperation, FilterOperation, LinkOperation, LogOperation,
};
