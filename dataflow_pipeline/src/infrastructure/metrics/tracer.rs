// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Execution Tracer
//!
//! Human-readable trace sinks, the `debugger` surface of the pipe call
//! options. Lines nest by indentation (pipe > stage > operation), carry a
//! start or end marker, format durations as `ms` under a second and `s`
//! above, and preview namespaces truncated to a fixed length.
//!
//! Two implementations share one formatter: [`ConsoleTraceSink`] writes to
//! stdout for interactive debugging, [`BufferTraceSink`] collects rendered
//! lines so tests can assert on exact output.

use std::time::Duration;

use parking_lot::Mutex;

use dataflow_pipeline_domain::{Namespace, PipelineError, TraceSink};

/// Maximum characters of a namespace preview in trace lines.
pub const PREVIEW_LEN: usize = 80;

/// Formats a duration the way trace lines render it: whole milliseconds
/// under one second, fractional seconds above.
pub fn format_duration(duration: Duration) -> String {
    if duration < Duration::from_secs(1) {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

fn preview(namespaces: &[Namespace]) -> String {
    match namespaces {
        [] => "(no namespaces)".to_string(),
        [single] => single.preview(PREVIEW_LEN),
        many => format!("{} namespaces, first {}", many.len(), many[0].preview(PREVIEW_LEN)),
    }
}

// One rendering for every sink; the enum keeps start/end markers and
// indentation in a single place.
enum TraceLine<'a> {
    PipeStarted(&'a str, &'a Namespace),
    PipeCompleted(&'a str, &'a Namespace, Duration),
    PipeFailed(&'a str, &'a PipelineError, Duration),
    StageStarted(&'a str, usize),
    StageCompleted(&'a str, usize, Duration),
    StageFailed(&'a str, &'a PipelineError, Duration),
    OperationStarted(&'a str, &'a [Namespace]),
    OperationCompleted(&'a str, &'a [Namespace], Duration),
    OperationFailed(&'a str, &'a PipelineError, Duration),
}

impl TraceLine<'_> {
    fn render(&self) -> String {
        match self {
            TraceLine::PipeStarted(pipe, input) => {
                format!("→ pipe '{}' started: {}", pipe, input.preview(PREVIEW_LEN))
            }
            TraceLine::PipeCompleted(pipe, output, duration) => format!(
                "✓ pipe '{}' completed in {}: {}",
                pipe,
                format_duration(*duration),
                output.preview(PREVIEW_LEN)
            ),
            TraceLine::PipeFailed(pipe, error, duration) => format!(
                "✗ pipe '{}' failed after {}: {}",
                pipe,
                format_duration(*duration),
                error
            ),
            TraceLine::StageStarted(stage, count) => {
                format!("  → stage '{}' started with {} namespace(s)", stage, count)
            }
            TraceLine::StageCompleted(stage, count, duration) => format!(
                "  ✓ stage '{}' completed in {} with {} namespace(s)",
                stage,
                format_duration(*duration),
                count
            ),
            TraceLine::StageFailed(stage, error, duration) => format!(
                "  ✗ stage '{}' failed after {}: {}",
                stage,
                format_duration(*duration),
                error
            ),
            TraceLine::OperationStarted(operation, inputs) => {
                format!("    → operation '{}' started: {}", operation, preview(inputs))
            }
            TraceLine::OperationCompleted(operation, outputs, duration) => format!(
                "    ✓ operation '{}' completed in {}: {}",
                operation,
                format_duration(*duration),
                preview(outputs)
            ),
            TraceLine::OperationFailed(operation, error, duration) => format!(
                "    ✗ operation '{}' failed after {}: {}",
                operation,
                format_duration(*duration),
                error
            ),
        }
    }
}

/// Trace sink that prints rendered lines to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleTraceSink;

impl ConsoleTraceSink {
    /// Creates a console sink
    pub fn new() -> Self {
        Self
    }

    fn emit(&self, line: TraceLine<'_>) {
        println!("{}", line.render());
    }
}

impl TraceSink for ConsoleTraceSink {
    fn pipe_started(&self, pipe: &str, input: &Namespace) {
        self.emit(TraceLine::PipeStarted(pipe, input));
    }

    fn pipe_completed(&self, pipe: &str, output: &Namespace, duration: Duration) {
        self.emit(TraceLine::PipeCompleted(pipe, output, duration));
    }

    fn pipe_failed(&self, pipe: &str, error: &PipelineError, duration: Duration) {
        self.emit(TraceLine::PipeFailed(pipe, error, duration));
    }

    fn stage_started(&self, stage: &str, namespace_count: usize) {
        self.emit(TraceLine::StageStarted(stage, namespace_count));
    }

    fn stage_completed(&self, stage: &str, namespace_count: usize, duration: Duration) {
        self.emit(TraceLine::StageCompleted(stage, namespace_count, duration));
    }

    fn stage_failed(&self, stage: &str, error: &PipelineError, duration: Duration) {
        self.emit(TraceLine::StageFailed(stage, error, duration));
    }

    fn operation_started(&self, operation: &str, inputs: &[Namespace]) {
        self.emit(TraceLine::OperationStarted(operation, inputs));
    }

    fn operation_completed(&self, operation: &str, outputs: &[Namespace], duration: Duration) {
        self.emit(TraceLine::OperationCompleted(operation, outputs, duration));
    }

    fn operation_failed(&self, operation: &str, error: &PipelineError, duration: Duration) {
        self.emit(TraceLine::OperationFailed(operation, error, duration));
    }
}

/// Trace sink that collects rendered lines in memory.
///
/// Safe for concurrent workers; lines arrive in emission order under a
/// lock.
#[derive(Debug, Default)]
pub struct BufferTraceSink {
    lines: Mutex<Vec<String>>,
}

impl BufferTraceSink {
    /// Creates an empty buffer sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a snapshot of the rendered lines
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    fn emit(&self, line: TraceLine<'_>) {
        self.lines.lock().push(line.render());
    }
}

impl TraceSink for BufferTraceSink {
    fn pipe_started(&self, pipe: &str, input: &Namespace) {
        self.emit(TraceLine::PipeStarted(pipe, input));
    }

    fn pipe_completed(&self, pipe: &str, output: &Namespace, duration: Duration) {
        self.emit(TraceLine::PipeCompleted(pipe, output, duration));
    }

    fn pipe_failed(&self, pipe: &str, error: &PipelineError, duration: Duration) {
        self.emit(TraceLine::PipeFailed(pipe, error, duration));
    }

    fn stage_started(&self, stage: &str, namespace_count: usize) {
        self.emit(TraceLine::StageStarted(stage, namespace_count));
    }

    fn stage_completed(&self, stage: &str, namespace_count: usize, duration: Duration) {
        self.emit(TraceLine::StageCompleted(stage, namespace_count, duration));
    }

    fn stage_failed(&self, stage: &str, error: &PipelineError, duration: Duration) {
        self.emit(TraceLine::StageFailed(stage, error, duration));
    }

    fn operation_started(&self, operation: &str, inputs: &[Namespace]) {
        self.emit(TraceLine::OperationStarted(operation, inputs));
    }

    fn operation_completed(&self, operation: &str, outputs: &[Namespace], duration: Duration) {
        self.emit(TraceLine::OperationCompleted(operation, outputs, duration));
    }

    fn operation_failed(&self, operation: &str, error: &PipelineError, duration: Duration) {
        self.emit(TraceLine::OperationFailed(operation, error, duration));
    }
}
