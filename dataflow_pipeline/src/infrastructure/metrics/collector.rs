// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Memory Metrics Collector
//!
//! A [`MetricsCollector`] implementation that aggregates lifecycle events
//! into plain counters and per-pipe execution records. Suited to tests and
//! embedders that want to inspect what a pipe invocation did without
//! standing up a metrics backend; the Prometheus bridge in
//! `metrics::service` covers the export path.

use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use dataflow_pipeline_domain::{MetricsCollector, Namespace, PipelineError};

/// Completed or failed pipe invocation summary.
#[derive(Debug, Clone)]
pub struct PipeExecutionRecord {
    pub pipe: String,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
    pub operations: u64,
    pub succeeded: bool,
    pub error: Option<String>,
}

/// Aggregated counters over every event the collector has seen.
#[derive(Debug, Clone, Default)]
pub struct CollectedMetrics {
    pub pipes_started: u64,
    pub pipes_completed: u64,
    pub pipes_failed: u64,
    pub stages_started: u64,
    pub stages_completed: u64,
    pub stages_failed: u64,
    pub operations_started: u64,
    pub operations_completed: u64,
    pub operations_failed: u64,
    pub model_calls: u64,
    pub model_tokens_in: u64,
    pub model_tokens_out: u64,
    pub executions: Vec<PipeExecutionRecord>,
}

/// Thread-safe aggregating collector.
#[derive(Debug, Default)]
pub struct BasicMetricsCollector {
    inner: Mutex<CollectedMetrics>,
}

impl BasicMetricsCollector {
    /// Creates an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a snapshot of everything collected so far
    pub fn snapshot(&self) -> CollectedMetrics {
        self.inner.lock().clone()
    }
}

impl MetricsCollector for BasicMetricsCollector {
    fn pipe_started(&self, _pipe: &str, _input: &Namespace) {
        self.inner.lock().pipes_started += 1;
    }

    fn pipe_completed(&self, pipe: &str, _input: &Namespace, _output: &Namespace, duration: Duration, op_count: u64) {
        let mut inner = self.inner.lock();
        inner.pipes_completed += 1;
        inner.executions.push(PipeExecutionRecord {
            pipe: pipe.to_string(),
            finished_at: Utc::now(),
            duration,
            operations: op_count,
            succeeded: true,
            error: None,
        });
    }

    fn pipe_failed(&self, pipe: &str, error: &PipelineError, duration: Duration) {
        let mut inner = self.inner.lock();
        inner.pipes_failed += 1;
        inner.executions.push(PipeExecutionRecord {
            pipe: pipe.to_string(),
            finished_at: Utc::now(),
            duration,
            operations: 0,
            succeeded: false,
            error: Some(error.to_string()),
        });
    }

    fn stage_started(&self, _stage: &str, _namespace_count: usize, _pipe: &str) {
        self.inner.lock().stages_started += 1;
    }

    fn stage_completed(&self, _stage: &str, _namespace_count: usize, _duration: Duration, _pipe: &str) {
        self.inner.lock().stages_completed += 1;
    }

    fn stage_failed(&self, _stage: &str, _error: &PipelineError, _duration: Duration, _pipe: &str) {
        self.inner.lock().stages_failed += 1;
    }

    fn operation_started(&self, _operation: &str, _inputs: &[Namespace], _stage: &str, _pipe: &str) {
        self.inner.lock().operations_started += 1;
    }

    fn operation_completed(
        &self,
        _operation: &str,
        _outputs: &[Namespace],
        _duration: Duration,
        _stage: &str,
        _pipe: &str,
    ) {
        self.inner.lock().operations_completed += 1;
    }

    fn operation_failed(&self, _operation: &str, _error: &PipelineError, _duration: Duration, _stage: &str, _pipe: &str) {
        self.inner.lock().operations_failed += 1;
    }

    fn model_called(
        &self,
        _model: &str,
        _input_preview: &str,
        _output_preview: &str,
        tokens_in: u64,
        tokens_out: u64,
        _duration: Duration,
    ) {
        let mut inner = self.inner.lock();
        inner.model_calls += 1;
        inner.model_tokens_in += tokens_in;
        inner.model_tokens_out += tokens_out;
    }
}
