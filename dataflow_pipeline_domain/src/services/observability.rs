// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Observability Trait Surface
//!
//! The domain defines two sinks and the engine emits into both at every
//! lifecycle boundary (pipe, stage, operation):
//!
//! - [`MetricsCollector`]: a structured event collector. Every method has a
//!   no-op default, so an implementation only overrides the events it cares
//!   about and the null implementation is a unit struct.
//! - [`TraceSink`]: a human-readable execution tracer, the `debugger`
//!   surface of the pipe call options.
//!
//! Implementations must be safe to invoke from multiple workers
//! concurrently; the engine calls them from inside parallel operation
//! tasks without any external serialization.

use std::time::Duration;

use crate::error::PipelineError;
use crate::value_objects::Namespace;

/// Structured event collector for pipe execution.
///
/// All methods default to no-ops. Durations are wall-clock times measured
/// by the engine; `op_count` on [`MetricsCollector::pipe_completed`] is the
/// total number of operation invocations the pipe performed.
#[allow(unused_variables)]
pub trait MetricsCollector: Send + Sync {
    fn pipe_started(&self, pipe: &str, input: &Namespace) {}

    fn pipe_completed(&self, pipe: &str, input: &Namespace, output: &Namespace, duration: Duration, op_count: u64) {}

    fn pipe_failed(&self, pipe: &str, error: &PipelineError, duration: Duration) {}

    fn stage_started(&self, stage: &str, namespace_count: usize, pipe: &str) {}

    fn stage_completed(&self, stage: &str, namespace_count: usize, duration: Duration, pipe: &str) {}

    fn stage_failed(&self, stage: &str, error: &PipelineError, duration: Duration, pipe: &str) {}

    fn operation_started(&self, operation: &str, inputs: &[Namespace], stage: &str, pipe: &str) {}

    fn operation_completed(&self, operation: &str, outputs: &[Namespace], duration: Duration, stage: &str, pipe: &str) {
    }

    fn operation_failed(&self, operation: &str, error: &PipelineError, duration: Duration, stage: &str, pipe: &str) {}

    fn model_called(
        &self,
        model: &str,
        input_preview: &str,
        output_preview: &str,
        tokens_in: u64,
        tokens_out: u64,
        duration: Duration,
    ) {
    }
}

/// Metrics collector that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMetricsCollector;

impl MetricsCollector for NullMetricsCollector {}

/// Human-readable execution tracer.
///
/// The engine calls the lifecycle methods in strict nesting order per
/// worker (pipe wraps stages, stages wrap operations), but methods of
/// *different* workers interleave.
#[allow(unused_variables)]
pub trait TraceSink: Send + Sync {
    fn pipe_started(&self, pipe: &str, input: &Namespace) {}

    fn pipe_completed(&self, pipe: &str, output: &Namespace, duration: Duration) {}

    fn pipe_failed(&self, pipe: &str, error: &PipelineError, duration: Duration) {}

    fn stage_started(&self, stage: &str, namespace_count: usize) {}

    fn stage_completed(&self, stage: &str, namespace_count: usize, duration: Duration) {}

    fn stage_failed(&self, stage: &str, error: &PipelineError, duration: Duration) {}

    fn operation_started(&self, operation: &str, inputs: &[Namespace]) {}

    fn operation_completed(&self, operation: &str, outputs: &[Namespace], duration: Duration) {}

    fn operation_failed(&self, operation: &str, error: &PipelineError, duration: Duration) {}
}

/// Trace sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {}
