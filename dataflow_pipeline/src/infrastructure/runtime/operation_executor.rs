// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Operation Executor
//!
//! The per-invocation wrapper that enforces an operation's contract around
//! its callable. One executor lives for one operation invocation inside
//! one stage invocation; the scheduler constructs it with the contract the
//! schema propagator resolved for exactly this stage position.
//!
//! ## Enforcement Sequence
//!
//! 1. **validate reads** on every input namespace: declared non-optional
//!    reads must be present and, when typed, structurally valid. A read
//!    failure means the callable is never invoked and no lifecycle event
//!    fires — contract errors are not recoverable and not observable as
//!    operation activity.
//! 2. emit `operation_started`.
//! 3. invoke the callable under the operation's time budget. A fired
//!    budget raises `Timeout` attributed to the binding owner; the
//!    callable's future is dropped, so a late result is discarded.
//! 4. on failure, consult the error policy. A suppressed failure yields an
//!    empty output list and emits `operation_completed`; anything else
//!    emits `operation_failed` and re-raises the original error. Timeouts
//!    are never suppressible.
//! 5. on success, validate the output shape: length (unless the operation
//!    allows count change), declared sets present and typed, declared
//!    deletes honored, and no undeclared growth, mutation, or loss of
//!    fields.
//! 6. emit `operation_completed` with the measured duration.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use dataflow_pipeline_domain::services::schema_propagator::ResolvedContract;
use dataflow_pipeline_domain::services::type_validator::validate_value;
use dataflow_pipeline_domain::{
    ErrorPolicy, Namespace, Operation, OperationCallable, PipelineError,
};

use crate::infrastructure::runtime::{ExecutionContext, TimeBudget};

/// Result of one executor invocation.
///
/// `suppressed` marks an error-policy suppression: the operation failed
/// but its policy swallowed the failure, so it contributes nothing and the
/// stage treats its position as pass-through.
#[derive(Debug)]
pub struct OperationOutcome {
    pub namespaces: Vec<Namespace>,
    pub suppressed: bool,
}

/// Contract-enforcing wrapper around one operation invocation.
pub struct OperationExecutor {
    operation_name: String,
    stage_name: String,
    contract: Arc<ResolvedContract>,
    callable: OperationCallable,
    allows_count_change: bool,
    error_policy: ErrorPolicy,
    budget: TimeBudget,
    ctx: Arc<ExecutionContext>,
}

impl OperationExecutor {
    /// Creates an executor for one operation at one stage position.
    ///
    /// The operation's own timeout clamps the stage budget here, so the
    /// guard inside [`OperationExecutor::invoke`] enforces
    /// `min(operation, stage, pipe)` remaining time.
    pub fn new(
        operation: &Arc<dyn Operation>,
        contract: Arc<ResolvedContract>,
        callable: OperationCallable,
        stage_budget: &TimeBudget,
        stage_name: &str,
        ctx: Arc<ExecutionContext>,
    ) -> Self {
        let operation_name = operation.name().to_string();
        let budget = stage_budget.clamp(operation.timeout(), &format!("operation '{}'", operation_name));
        Self {
            operation_name,
            stage_name: stage_name.to_string(),
            contract,
            callable,
            allows_count_change: operation.allows_count_change(),
            error_policy: operation.error_policy(),
            budget,
            ctx,
        }
    }

    /// Gets the operation's display name
    pub fn operation_name(&self) -> &str {
        &self.operation_name
    }

    /// Whether the wrapped operation may change the namespace count
    pub fn allows_count_change(&self) -> bool {
        self.allows_count_change
    }

    /// Runs one contract-enforced invocation.
    pub async fn invoke(&self, inputs: Vec<Namespace>) -> Result<OperationOutcome, PipelineError> {
        self.validate_reads(&inputs)?;

        self.ctx.count_operation();
        self.ctx
            .metrics()
            .operation_started(&self.operation_name, &inputs, &self.stage_name, self.ctx.pipe_name());
        self.ctx.tracer().operation_started(&self.operation_name, &inputs);
        debug!(
            operation = %self.operation_name,
            stage = %self.stage_name,
            inputs = inputs.len(),
            "operation started"
        );

        let start = Instant::now();
        let result = self.budget.guard((self.callable)(inputs.clone())).await;
        let duration = start.elapsed();

        let outputs = match result {
            Err(error) if error.is_timeout() => {
                // Timeouts always surface; the error policy is never consulted.
                return Err(self.fail(error, duration));
            }
            Err(error) => {
                if self.error_policy.suppresses(&error) {
                    debug!(
                        operation = %self.operation_name,
                        stage = %self.stage_name,
                        error = %error,
                        "operation error suppressed by its handler"
                    );
                    self.complete(&[], duration);
                    return Ok(OperationOutcome {
                        namespaces: Vec::new(),
                        suppressed: true,
                    });
                }
                return Err(self.fail(error, duration));
            }
            Ok(outputs) => outputs,
        };

        if let Err(error) = self.validate_outputs(&inputs, &outputs) {
            return Err(self.fail(error, duration));
        }

        self.complete(&outputs, duration);
        Ok(OperationOutcome {
            namespaces: outputs,
            suppressed: false,
        })
    }

    fn complete(&self, outputs: &[Namespace], duration: std::time::Duration) {
        self.ctx.metrics().operation_completed(
            &self.operation_name,
            outputs,
            duration,
            &self.stage_name,
            self.ctx.pipe_name(),
        );
        self.ctx
            .tracer()
            .operation_completed(&self.operation_name, outputs, duration);
        debug!(
            operation = %self.operation_name,
            stage = %self.stage_name,
            outputs = outputs.len(),
            duration_ms = duration.as_millis() as u64,
            "operation completed"
        );
    }

    fn fail(&self, error: PipelineError, duration: std::time::Duration) -> PipelineError {
        self.ctx.metrics().operation_failed(
            &self.operation_name,
            &error,
            duration,
            &self.stage_name,
            self.ctx.pipe_name(),
        );
        self.ctx.tracer().operation_failed(&self.operation_name, &error, duration);
        warn!(
            operation = %self.operation_name,
            stage = %self.stage_name,
            error = %error,
            "operation failed"
        );
        error
    }

    fn qualified(&self) -> String {
        format!(
            "operation '{}' in stage '{}' of pipe '{}'",
            self.operation_name,
            self.stage_name,
            self.ctx.pipe_name()
        )
    }

    fn validate_reads(&self, inputs: &[Namespace]) -> Result<(), PipelineError> {
        for ns in inputs {
            for (name, entry) in &self.contract.reads {
                match ns.get(name) {
                    None if entry.optional => {}
                    None => {
                        return Err(PipelineError::PropertyNotFound(format!(
                            "{} requires input field '{}'",
                            self.qualified(),
                            name
                        )));
                    }
                    Some(value) => {
                        if entry.optional && value.is_null() {
                            continue;
                        }
                        if let Some(descriptor) = &entry.descriptor {
                            validate_value(value, descriptor, name.as_str())
                                .map_err(|e| self.contextualize(e))?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn validate_outputs(&self, inputs: &[Namespace], outputs: &[Namespace]) -> Result<(), PipelineError> {
        if !self.allows_count_change && outputs.len() != inputs.len() {
            return Err(PipelineError::OutputCountMismatch(format!(
                "{} returned {} namespaces for {} inputs",
                self.qualified(),
                outputs.len(),
                inputs.len()
            )));
        }

        // Count-changing operations cannot be paired with an input
        // positionally; their growth checks run against the union of input
        // keys and vanished fields are not checkable.
        let paired = !self.allows_count_change;
        let input_keys: BTreeSet<_> = inputs.iter().flat_map(|ns| ns.keys().cloned()).collect();

        for (index, ns) in outputs.iter().enumerate() {
            for (name, entry) in &self.contract.sets {
                match ns.get(name) {
                    None if entry.optional => {}
                    None => {
                        return Err(PipelineError::PropertyNotFound(format!(
                            "{} declared set '{}' but output {} lacks it",
                            self.qualified(),
                            name,
                            index
                        )));
                    }
                    Some(value) => {
                        if entry.optional && value.is_null() {
                            continue;
                        }
                        if let Some(descriptor) = &entry.descriptor {
                            validate_value(value, descriptor, name.as_str())
                                .map_err(|e| self.contextualize(e))?;
                        }
                    }
                }
            }

            for name in &self.contract.deletes {
                if ns.has(name) {
                    return Err(PipelineError::UnexpectedProperty(format!(
                        "{} declared delete of '{}' but it remains in output {}",
                        self.qualified(),
                        name,
                        index
                    )));
                }
            }

            let baseline = if paired { inputs.get(index) } else { None };
            for (name, value) in ns.iter() {
                if self.contract.sets.contains_key(name) {
                    continue;
                }
                let known = match baseline {
                    Some(input) => input.has(name),
                    None => input_keys.contains(name),
                };
                if !known {
                    return Err(PipelineError::UnexpectedProperty(format!(
                        "{} set undeclared field '{}' in output {}",
                        self.qualified(),
                        name,
                        index
                    )));
                }
                if let Some(input) = baseline {
                    if input.get(name) != Some(value) {
                        return Err(PipelineError::UnexpectedProperty(format!(
                            "{} modified field '{}' without declaring it in output {}",
                            self.qualified(),
                            name,
                            index
                        )));
                    }
                }
            }

            if let Some(input) = baseline {
                for name in input.keys() {
                    if !ns.has(name) && !self.contract.deletes.contains(name) {
                        return Err(PipelineError::UnexpectedDeletion(format!(
                            "{} dropped field '{}' without declaring its deletion in output {}",
                            self.qualified(),
                            name,
                            index
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn contextualize(&self, error: PipelineError) -> PipelineError {
        match error {
            PipelineError::TypeMismatch(message) => {
                PipelineError::TypeMismatch(format!("{}: {}", self.qualified(), message))
            }
            PipelineError::PropertyNotFound(message) => {
                PipelineError::PropertyNotFound(format!("{}: {}", self.qualified(), message))
            }
            other => other,
        }
    }
}
