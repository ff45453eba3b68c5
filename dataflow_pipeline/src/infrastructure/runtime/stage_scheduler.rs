// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Scheduler
//!
//! Runtime behavior of one stage invocation: apply the execution mode to
//! the incoming namespace list over the stage's operations, bounded by the
//! shared worker pool, and combine the per-operation outputs with the
//! stage's merge strategy.
//!
//! ## Dispatch and Determinism
//!
//! Every operation invocation becomes one task keyed by
//! `(operation index, element index)`. Tasks acquire a permit from the
//! invocation-wide semaphore before running, so at most
//! `min(K·M, max_parallel_operations)` callables execute concurrently
//! while all of them make progress. Completion order is arbitrary;
//! everything order-sensitive — merge precedence, collate sequences, error
//! selection — is computed from declared indices after all tasks finish.
//!
//! ## Merge Mode and Count-Changing Operations
//!
//! Merge mode folds the input list into one record before feeding
//! count-preserving operations. Operations that declare
//! `allows_count_change` are N→M shapes by definition — a collapse over a
//! pre-folded record would reduce a single survivor — so they receive the
//! un-folded input list instead, and their first output participates in
//! the stage's single-record combine.
//!
//! ## Failure Discipline
//!
//! Peers are never cancelled. The scheduler waits for every task, collects
//! every failure, and re-raises the first one in dispatch order. A
//! suppressed failure (the operation's own error policy) contributes an
//! empty output instead; a position where every operation was suppressed
//! passes its input through unchanged.
//!
//! ## State Machine
//!
//! One invocation steps `entered → dispatched → awaited → merged →
//! completed` (or `failed` from any step); the transitions are visible as
//! trace-level log events.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, trace};

use dataflow_pipeline_domain::services::schema_propagator::StageSchema;
use dataflow_pipeline_domain::{MergeStrategy, Namespace, PipelineError, Stage};

use crate::infrastructure::runtime::{ExecutionContext, OperationExecutor, OperationOutcome, TimeBudget};

type InvocationResult = (usize, usize, Result<OperationOutcome, PipelineError>);

/// Executes stages against a shared invocation context.
pub struct StageScheduler {
    ctx: Arc<ExecutionContext>,
}

impl StageScheduler {
    /// Creates a scheduler bound to one pipe invocation
    pub fn new(ctx: Arc<ExecutionContext>) -> Self {
        Self { ctx }
    }

    /// Runs one stage invocation, returning the outgoing namespace list.
    pub async fn execute(
        &self,
        stage: &Stage,
        schema: &StageSchema,
        inputs: Vec<Namespace>,
        pipe_budget: &TimeBudget,
    ) -> Result<Vec<Namespace>, PipelineError> {
        let start = Instant::now();
        self.ctx
            .metrics()
            .stage_started(stage.name(), inputs.len(), self.ctx.pipe_name());
        self.ctx.tracer().stage_started(stage.name(), inputs.len());
        trace!(stage = %stage.name(), state = "entered", inputs = inputs.len());

        let budget = pipe_budget.clamp(stage.timeout(), &format!("stage '{}'", stage.name()));
        let result = self.run(stage, schema, inputs, &budget).await;
        let duration = start.elapsed();

        match result {
            Ok(outputs) => {
                self.ctx
                    .metrics()
                    .stage_completed(stage.name(), outputs.len(), duration, self.ctx.pipe_name());
                self.ctx.tracer().stage_completed(stage.name(), outputs.len(), duration);
                debug!(
                    stage = %stage.name(),
                    outputs = outputs.len(),
                    duration_ms = duration.as_millis() as u64,
                    "stage completed"
                );
                Ok(outputs)
            }
            Err(error) => {
                self.ctx
                    .metrics()
                    .stage_failed(stage.name(), &error, duration, self.ctx.pipe_name());
                self.ctx.tracer().stage_failed(stage.name(), &error, duration);
                debug!(stage = %stage.name(), error = %error, "stage failed");
                Err(error)
            }
        }
    }

    async fn run(
        &self,
        stage: &Stage,
        schema: &StageSchema,
        inputs: Vec<Namespace>,
        budget: &TimeBudget,
    ) -> Result<Vec<Namespace>, PipelineError> {
        if budget.is_exhausted() {
            return Err(budget.timeout_error());
        }

        // One callable per operation per stage invocation; executors are
        // shared across fan-out elements.
        let mut executors = Vec::with_capacity(stage.operations().len());
        for (op, contract) in stage.operations().iter().zip(&schema.contracts) {
            let callable = op.create()?;
            executors.push(Arc::new(OperationExecutor::new(
                op,
                Arc::new(contract.clone()),
                callable,
                budget,
                stage.name(),
                Arc::clone(&self.ctx),
            )));
        }

        let strategy = stage.merge_strategy();
        match stage.mode() {
            dataflow_pipeline_domain::ExecutionMode::Merge => self.run_merge(&executors, &inputs, strategy).await,
            dataflow_pipeline_domain::ExecutionMode::FanOut => self.run_fan_out(&executors, &inputs, strategy).await,
            dataflow_pipeline_domain::ExecutionMode::Batch => self.run_batch(&executors, inputs, strategy).await,
        }
    }

    fn spawn_invocation(
        &self,
        join: &mut JoinSet<InvocationResult>,
        executor: Arc<OperationExecutor>,
        feed: Vec<Namespace>,
        op_idx: usize,
        elem_idx: usize,
    ) {
        let permits = Arc::clone(self.ctx.permits());
        join.spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return (
                        op_idx,
                        elem_idx,
                        Err(PipelineError::internal_error("worker pool closed")),
                    );
                }
            };
            (op_idx, elem_idx, executor.invoke(feed).await)
        });
    }

    // Waits for every task (peers are never cancelled), then reports the
    // collected outcomes and failures in dispatch order.
    async fn await_all(
        mut join: JoinSet<InvocationResult>,
    ) -> (BTreeMap<(usize, usize), OperationOutcome>, Vec<PipelineError>) {
        let mut outcomes = BTreeMap::new();
        let mut failures: Vec<(usize, usize, PipelineError)> = Vec::new();
        while let Some(joined) = join.join_next().await {
            match joined {
                Ok((op_idx, elem_idx, Ok(outcome))) => {
                    outcomes.insert((op_idx, elem_idx), outcome);
                }
                Ok((op_idx, elem_idx, Err(error))) => failures.push((op_idx, elem_idx, error)),
                Err(join_error) => failures.push((
                    usize::MAX,
                    usize::MAX,
                    PipelineError::internal_error(format!("operation task aborted: {}", join_error)),
                )),
            }
        }
        failures.sort_by_key(|(op_idx, elem_idx, _)| (*elem_idx, *op_idx));
        (outcomes, failures.into_iter().map(|(_, _, error)| error).collect())
    }

    async fn run_merge(
        &self,
        executors: &[Arc<OperationExecutor>],
        inputs: &[Namespace],
        strategy: MergeStrategy,
    ) -> Result<Vec<Namespace>, PipelineError> {
        let merged = Namespace::merge_all(inputs);
        let mut join = JoinSet::new();
        for (op_idx, executor) in executors.iter().enumerate() {
            // Count-preserving operations see the folded record; N→M shapes
            // (collapse, filter, explode) reduce over the un-folded list.
            let feed = if executor.allows_count_change() {
                inputs.to_vec()
            } else {
                vec![merged.clone()]
            };
            self.spawn_invocation(&mut join, Arc::clone(executor), feed, op_idx, 0);
        }
        trace!(state = "dispatched", operations = executors.len());

        let (outcomes, failures) = Self::await_all(join).await;
        trace!(state = "awaited", failures = failures.len());
        if let Some(first) = failures.into_iter().next() {
            return Err(first);
        }

        let non_suppressed: Vec<&OperationOutcome> = (0..executors.len())
            .filter_map(|op_idx| outcomes.get(&(op_idx, 0)))
            .filter(|outcome| !outcome.suppressed)
            .collect();
        if non_suppressed.is_empty() {
            // Every operation suppressed its failure: pass through.
            return Ok(vec![merged]);
        }

        let contributions: Vec<Namespace> = non_suppressed
            .iter()
            .filter_map(|outcome| outcome.namespaces.first().cloned())
            .collect();
        if contributions.is_empty() {
            // A count-changing operation legitimately dropped the record.
            return Ok(Vec::new());
        }
        trace!(state = "merged", contributions = contributions.len());
        Ok(vec![strategy.combine(&contributions)])
    }

    async fn run_fan_out(
        &self,
        executors: &[Arc<OperationExecutor>],
        inputs: &[Namespace],
        strategy: MergeStrategy,
    ) -> Result<Vec<Namespace>, PipelineError> {
        let mut join = JoinSet::new();
        for (elem_idx, ns) in inputs.iter().enumerate() {
            for (op_idx, executor) in executors.iter().enumerate() {
                self.spawn_invocation(&mut join, Arc::clone(executor), vec![ns.clone()], op_idx, elem_idx);
            }
        }
        trace!(
            state = "dispatched",
            operations = executors.len(),
            elements = inputs.len()
        );

        let (outcomes, failures) = Self::await_all(join).await;
        trace!(state = "awaited", failures = failures.len());
        if let Some(first) = failures.into_iter().next() {
            return Err(first);
        }

        let mut outputs = Vec::with_capacity(inputs.len());
        for (elem_idx, original) in inputs.iter().enumerate() {
            let non_suppressed: Vec<&OperationOutcome> = (0..executors.len())
                .filter_map(|op_idx| outcomes.get(&(op_idx, elem_idx)))
                .filter(|outcome| !outcome.suppressed)
                .collect();
            if non_suppressed.is_empty() {
                outputs.push(original.clone());
                continue;
            }
            let contributions: Vec<Namespace> = non_suppressed
                .iter()
                .filter_map(|outcome| outcome.namespaces.first().cloned())
                .collect();
            if contributions.is_empty() {
                // Dropped by a count-changing operation at this element.
                continue;
            }
            outputs.push(strategy.combine(&contributions));
        }
        trace!(state = "merged", outputs = outputs.len());
        Ok(outputs)
    }

    async fn run_batch(
        &self,
        executors: &[Arc<OperationExecutor>],
        inputs: Vec<Namespace>,
        strategy: MergeStrategy,
    ) -> Result<Vec<Namespace>, PipelineError> {
        let mut join = JoinSet::new();
        for (op_idx, executor) in executors.iter().enumerate() {
            self.spawn_invocation(&mut join, Arc::clone(executor), inputs.clone(), op_idx, 0);
        }
        trace!(state = "dispatched", operations = executors.len());

        let (outcomes, failures) = Self::await_all(join).await;
        trace!(state = "awaited", failures = failures.len());
        if let Some(first) = failures.into_iter().next() {
            return Err(first);
        }

        let non_suppressed: Vec<&OperationOutcome> = (0..executors.len())
            .filter_map(|op_idx| outcomes.get(&(op_idx, 0)))
            .filter(|outcome| !outcome.suppressed)
            .collect();
        if non_suppressed.is_empty() {
            return Ok(inputs);
        }

        // Canonical output length comes from the first successful
        // operation in declared order.
        let canonical = non_suppressed[0].namespaces.len();
        let mut outputs = Vec::with_capacity(canonical);
        for position in 0..canonical {
            let contributions: Vec<Namespace> = non_suppressed
                .iter()
                .filter_map(|outcome| outcome.namespaces.get(position).cloned())
                .collect();
            outputs.push(strategy.combine(&contributions));
        }
        trace!(state = "merged", outputs = outputs.len());
        Ok(outputs)
    }
}
