// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Prometheus Metrics Service
//!
//! Prometheus-backed export path for pipe execution metrics. The service
//! owns an isolated registry with counters, gauges, and duration
//! histograms at all three lifecycle levels;
//! [`PrometheusMetricsCollector`] bridges the domain's
//! [`MetricsCollector`] trait onto it so a pipe invocation feeds
//! Prometheus by passing one option.
//!
//! The registry is per-service rather than the process-global default
//! registry, so embedders and tests can keep instances isolated.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder};

use dataflow_pipeline_domain::{MetricsCollector, Namespace, PipelineError};

/// Owns the Prometheus registry and the engine's metric families.
pub struct MetricsService {
    registry: Registry,
    active_pipes: IntGauge,
    pipes_completed: IntCounter,
    pipes_failed: IntCounter,
    pipe_duration_seconds: Histogram,
    stages_completed: IntCounter,
    stages_failed: IntCounter,
    stage_duration_seconds: Histogram,
    operations_completed: IntCounter,
    operations_failed: IntCounter,
    operation_duration_seconds: Histogram,
    model_calls: IntCounter,
    model_tokens_in: IntCounter,
    model_tokens_out: IntCounter,
}

impl MetricsService {
    /// Creates a service with a fresh registry and registered families.
    pub fn new() -> Result<Self, PipelineError> {
        let registry = Registry::new();

        let active_pipes = IntGauge::with_opts(Opts::new("pipeline_active_pipes", "Pipe invocations in flight"))
            .map_err(internal)?;
        let pipes_completed = IntCounter::with_opts(Opts::new(
            "pipeline_pipes_completed_total",
            "Pipe invocations that completed",
        ))
        .map_err(internal)?;
        let pipes_failed =
            IntCounter::with_opts(Opts::new("pipeline_pipes_failed_total", "Pipe invocations that failed"))
                .map_err(internal)?;
        let pipe_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "pipeline_pipe_duration_seconds",
            "Wall-clock duration of pipe invocations",
        ))
        .map_err(internal)?;

        let stages_completed = IntCounter::with_opts(Opts::new(
            "pipeline_stages_completed_total",
            "Stage invocations that completed",
        ))
        .map_err(internal)?;
        let stages_failed =
            IntCounter::with_opts(Opts::new("pipeline_stages_failed_total", "Stage invocations that failed"))
                .map_err(internal)?;
        let stage_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "pipeline_stage_duration_seconds",
            "Wall-clock duration of stage invocations",
        ))
        .map_err(internal)?;

        let operations_completed = IntCounter::with_opts(Opts::new(
            "pipeline_operations_completed_total",
            "Operation invocations that completed",
        ))
        .map_err(internal)?;
        let operations_failed = IntCounter::with_opts(Opts::new(
            "pipeline_operations_failed_total",
            "Operation invocations that failed",
        ))
        .map_err(internal)?;
        let operation_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "pipeline_operation_duration_seconds",
            "Wall-clock duration of operation invocations",
        ))
        .map_err(internal)?;

        let model_calls =
            IntCounter::with_opts(Opts::new("pipeline_model_calls_total", "Model invocations reported"))
                .map_err(internal)?;
        let model_tokens_in = IntCounter::with_opts(Opts::new(
            "pipeline_model_tokens_in_total",
            "Input tokens reported by model calls",
        ))
        .map_err(internal)?;
        let model_tokens_out = IntCounter::with_opts(Opts::new(
            "pipeline_model_tokens_out_total",
            "Output tokens reported by model calls",
        ))
        .map_err(internal)?;

        for collector in [
            Box::new(active_pipes.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(pipes_completed.clone()),
            Box::new(pipes_failed.clone()),
            Box::new(pipe_duration_seconds.clone()),
            Box::new(stages_completed.clone()),
            Box::new(stages_failed.clone()),
            Box::new(stage_duration_seconds.clone()),
            Box::new(operations_completed.clone()),
            Box::new(operations_failed.clone()),
            Box::new(operation_duration_seconds.clone()),
            Box::new(model_calls.clone()),
            Box::new(model_tokens_in.clone()),
            Box::new(model_tokens_out.clone()),
        ] {
            registry.register(collector).map_err(internal)?;
        }

        Ok(Self {
            registry,
            active_pipes,
            pipes_completed,
            pipes_failed,
            pipe_duration_seconds,
            stages_completed,
            stages_failed,
            stage_duration_seconds,
            operations_completed,
            operations_failed,
            operation_duration_seconds,
            model_calls,
            model_tokens_in,
            model_tokens_out,
        })
    }

    /// Gets the underlying registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Renders the registry in the Prometheus text exposition format
    pub fn export(&self) -> Result<String, PipelineError> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&self.registry.gather(), &mut buffer).map_err(internal)?;
        String::from_utf8(buffer).map_err(|e| PipelineError::internal_error(e.to_string()))
    }
}

fn internal(error: impl std::fmt::Display) -> PipelineError {
    PipelineError::internal_error(format!("metrics registry error: {}", error))
}

/// Bridges the domain metrics trait onto a [`MetricsService`].
pub struct PrometheusMetricsCollector {
    service: Arc<MetricsService>,
}

impl PrometheusMetricsCollector {
    /// Creates a bridge over the given service
    pub fn new(service: Arc<MetricsService>) -> Self {
        Self { service }
    }
}

impl MetricsCollector for PrometheusMetricsCollector {
    fn pipe_started(&self, _pipe: &str, _input: &Namespace) {
        self.service.active_pipes.inc();
    }

    fn pipe_completed(&self, _pipe: &str, _input: &Namespace, _output: &Namespace, duration: Duration, _op_count: u64) {
        self.service.active_pipes.dec();
        self.service.pipes_completed.inc();
        self.service.pipe_duration_seconds.observe(duration.as_secs_f64());
    }

    fn pipe_failed(&self, _pipe: &str, _error: &PipelineError, duration: Duration) {
        self.service.active_pipes.dec();
        self.service.pipes_failed.inc();
        self.service.pipe_duration_seconds.observe(duration.as_secs_f64());
    }

    fn stage_completed(&self, _stage: &str, _namespace_count: usize, duration: Duration, _pipe: &str) {
        self.service.stages_completed.inc();
        self.service.stage_duration_seconds.observe(duration.as_secs_f64());
    }

    fn stage_failed(&self, _stage: &str, _error: &PipelineError, duration: Duration, _pipe: &str) {
        self.service.stages_failed.inc();
        self.service.stage_duration_seconds.observe(duration.as_secs_f64());
    }

    fn operation_completed(
        &self,
        _operation: &str,
        _outputs: &[Namespace],
        duration: Duration,
        _stage: &str,
        _pipe: &str,
    ) {
        self.service.operations_completed.inc();
        self.service.operation_duration_seconds.observe(duration.as_secs_f64());
    }

    fn operation_failed(&self, _operation: &str, _error: &PipelineError, duration: Duration, _stage: &str, _pipe: &str) {
        self.service.operations_failed.inc();
        self.service.operation_duration_seconds.observe(duration.as_secs_f64());
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
        self.service.model_calls.inc();
        self.service.model_tokens_in.inc_by(tokens_in);
        self.service.model_tokens_out.inc_by(tokens_out);
    }
}
