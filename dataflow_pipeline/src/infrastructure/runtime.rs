// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Runtime Infrastructure
//!
//! The execution machinery behind a pipe invocation: the hierarchical
//! time budget, the contract-enforcing operation executor, and the
//! bounded-parallel stage scheduler, plus the per-invocation context they
//! all share.

pub mod operation_executor;
pub mod stage_scheduler;
pub mod time_budget;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;

use dataflow_pipeline_domain::{ExecutionId, MetricsCollector, TraceSink};

pub use operation_executor::{OperationExecutor, OperationOutcome};
pub use stage_scheduler::StageScheduler;
pub use time_budget::TimeBudget;

/// Process-wide default bound on parallel operations within one stage.
pub const DEFAULT_MAX_PARALLEL_OPERATIONS: usize = 10;

/// Shared state of one pipe invocation.
///
/// Holds the observability sinks, the worker-pool semaphore bounding
/// parallel operations, and the running operation-invocation count.
/// Everything here is safe to share across the invocation's parallel
/// workers.
pub struct ExecutionContext {
    pipe_name: String,
    execution_id: ExecutionId,
    metrics: Arc<dyn MetricsCollector>,
    tracer: Arc<dyn TraceSink>,
    permits: Arc<Semaphore>,
    operations_invoked: AtomicU64,
}

impl ExecutionContext {
    /// Creates the context for one invocation with a pool of
    /// `max_parallel_operations` worker permits.
    pub fn new(
        pipe_name: impl Into<String>,
        execution_id: ExecutionId,
        metrics: Arc<dyn MetricsCollector>,
        tracer: Arc<dyn TraceSink>,
        max_parallel_operations: usize,
    ) -> Self {
        Self {
            pipe_name: pipe_name.into(),
            execution_id,
            metrics,
            tracer,
            permits: Arc::new(Semaphore::new(max_parallel_operations.max(1))),
            operations_invoked: AtomicU64::new(0),
        }
    }

    /// Gets the owning pipe's name
    pub fn pipe_name(&self) -> &str {
        &self.pipe_name
    }

    /// Gets the invocation id
    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    /// Gets the metrics sink
    pub fn metrics(&self) -> &Arc<dyn MetricsCollector> {
        &self.metrics
    }

    /// Gets the trace sink
    pub fn tracer(&self) -> &Arc<dyn TraceSink> {
        &self.tracer
    }

    /// Gets the worker-pool semaphore
    pub fn permits(&self) -> &Arc<Semaphore> {
        &self.permits
    }

    /// Records one operation invocation and returns the new total
    pub fn count_operation(&self) -> u64 {
        self.operations_invoked.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Gets the number of operation invocations so far
    pub fn operations_invoked(&self) -> u64 {
        self.operations_invoked.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("pipe_name", &self.pipe_name)
            .field("execution_id", &self.execution_id)
            .field("operations_invoked", &self.operations_invoked)
            .finish()
    }
}
