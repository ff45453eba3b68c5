// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipe Runner
//!
//! The application-layer orchestrator for pipe invocation. The runner owns
//! nothing a pipe invocation does not need: it stamps an execution id,
//! builds the per-invocation context (sinks and worker pool), derives the
//! root time budget from the pipe timeout, then feeds the namespace list
//! through the stages in declared order and returns the single record the
//! final merge stage produced.
//!
//! ## Invocation Sequence
//!
//! 1. Emit `pipe_started` to both sinks.
//! 2. Validate the input against the pipe's cached input schema
//!    (`EmptyInput` for an empty mapping, contract errors for missing or
//!    mistyped fields).
//! 3. Run each stage through the scheduler, handing the accumulated
//!    namespace list forward. Stage and operation budgets are clamped from
//!    the remaining pipe budget, never from configured values alone.
//! 4. Emit `pipe_completed` with the total duration and the number of
//!    operation invocations, or `pipe_failed` with the first error.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, info_span, Instrument};

use dataflow_pipeline_domain::{
    ExecutionId, MetricsCollector, Namespace, NullMetricsCollector, NullTraceSink, Pipe, PipelineError, TraceSink,
};

use crate::infrastructure::runtime::{
    ExecutionContext, StageScheduler, TimeBudget, DEFAULT_MAX_PARALLEL_OPERATIONS,
};

/// Per-call options recognized by [`PipeRunner::run_with_options`].
#[derive(Clone, Default)]
pub struct CallOptions {
    /// Structured event collector; defaults to the null collector
    pub metrics_collector: Option<Arc<dyn MetricsCollector>>,
    /// Human-readable tracer; defaults to the null sink
    pub debugger: Option<Arc<dyn TraceSink>>,
    /// Overrides the runner's parallel-operation bound for this call
    pub max_parallel_operations: Option<usize>,
}

/// Executes validated pipes.
///
/// A runner is cheap and stateless between calls; different invocations
/// are independent and may run concurrently on the same runner.
#[derive(Debug, Clone)]
pub struct PipeRunner {
    max_parallel_operations: usize,
}

impl PipeRunner {
    /// Creates a runner with the process-wide default worker bound
    pub fn new() -> Self {
        Self {
            max_parallel_operations: DEFAULT_MAX_PARALLEL_OPERATIONS,
        }
    }

    /// Creates a runner with a specific parallel-operation bound
    pub fn with_max_parallel_operations(max_parallel_operations: usize) -> Self {
        Self {
            max_parallel_operations: max_parallel_operations.max(1),
        }
    }

    /// Runs a pipe with default options
    pub async fn run(&self, pipe: &Pipe, input: Namespace) -> Result<Namespace, PipelineError> {
        self.run_with_options(pipe, input, &CallOptions::default()).await
    }

    /// Runs a pipe with explicit observability sinks and pool bounds.
    pub async fn run_with_options(
        &self,
        pipe: &Pipe,
        input: Namespace,
        options: &CallOptions,
    ) -> Result<Namespace, PipelineError> {
        let execution_id = ExecutionId::new();
        let metrics: Arc<dyn MetricsCollector> = options
            .metrics_collector
            .clone()
            .unwrap_or_else(|| Arc::new(NullMetricsCollector));
        let tracer: Arc<dyn TraceSink> = options.debugger.clone().unwrap_or_else(|| Arc::new(NullTraceSink));
        let max_parallel = options
            .max_parallel_operations
            .unwrap_or(self.max_parallel_operations)
            .max(1);

        let span = info_span!("pipe", name = %pipe.name(), execution = %execution_id);
        self.execute(pipe, input, execution_id, metrics, tracer, max_parallel)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        pipe: &Pipe,
        input: Namespace,
        execution_id: ExecutionId,
        metrics: Arc<dyn MetricsCollector>,
        tracer: Arc<dyn TraceSink>,
        max_parallel: usize,
    ) -> Result<Namespace, PipelineError> {
        let start = Instant::now();
        metrics.pipe_started(pipe.name(), &input);
        tracer.pipe_started(pipe.name(), &input);
        info!(stages = pipe.stages().len(), "pipe started");

        let ctx = Arc::new(ExecutionContext::new(
            pipe.name(),
            execution_id,
            Arc::clone(&metrics),
            Arc::clone(&tracer),
            max_parallel,
        ));

        let result = self.run_stages(pipe, input.clone(), &ctx).await;
        let duration = start.elapsed();

        match result {
            Ok(output) => {
                metrics.pipe_completed(pipe.name(), &input, &output, duration, ctx.operations_invoked());
                tracer.pipe_completed(pipe.name(), &output, duration);
                info!(
                    duration_ms = duration.as_millis() as u64,
                    operations = ctx.operations_invoked(),
                    "pipe completed"
                );
                Ok(output)
            }
            Err(error) => {
                metrics.pipe_failed(pipe.name(), &error, duration);
                tracer.pipe_failed(pipe.name(), &error, duration);
                debug!(error = %error, "pipe failed");
                Err(error)
            }
        }
    }

    async fn run_stages(
        &self,
        pipe: &Pipe,
        input: Namespace,
        ctx: &Arc<ExecutionContext>,
    ) -> Result<Namespace, PipelineError> {
        pipe.validate_input(&input)?;

        let budget = TimeBudget::unbounded().clamp(pipe.timeout(), &format!("pipe '{}'", pipe.name()));
        let scheduler = StageScheduler::new(Arc::clone(ctx));

        let mut list = vec![input];
        for (stage, schema) in pipe.stages().iter().zip(&pipe.schema().stages) {
            list = scheduler.execute(stage, schema, list, &budget).await?;
        }

        // The last stage runs in merge mode, so a well-behaved pipe always
        // lands here with exactly one record.
        match list.len() {
            1 => Ok(list.remove(0)),
            count => Err(PipelineError::internal_error(format!(
                "Pipe '{}' produced {} records instead of one",
                pipe.name(),
                count
            ))),
        }
    }
}

impl Default for PipeRunner {
    fn default() -> Self {
        PipeRunner::new()
    }
}
