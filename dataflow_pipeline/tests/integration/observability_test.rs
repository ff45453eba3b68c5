// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Observability Tests
//!
//! The event surface through real pipe invocations: metrics aggregation,
//! trace line nesting, failure paths, and the Prometheus bridge.

use std::sync::Arc;
use std::time::Duration;

use dataflow_pipeline::infrastructure::metrics::{MetricsService, PrometheusMetricsCollector};
use dataflow_pipeline::{
    BasicMetricsCollector, BufferTraceSink, CallOptions, ErrorPolicy, ExecutionMode, MergeStrategy, MetricsCollector,
    Namespace, Pipe, PipeRunner, Stage, TraceSink, Value,
};

use crate::common;

fn two_stage_pipe() -> Pipe {
    Pipe::new(
        "traced",
        vec![
            Stage::new(
                "draft",
                ExecutionMode::Merge,
                vec![common::upcase("raise", "in", "draft")],
                MergeStrategy::LastIn,
            )
            .unwrap(),
            Stage::new(
                "final",
                ExecutionMode::Merge,
                vec![common::upcase("polish", "draft", "final")],
                MergeStrategy::LastIn,
            )
            .unwrap(),
        ],
    )
    .unwrap()
}

/// Tests metrics aggregation over a successful run.
/// Validates that:
/// - Pipe, stage, and operation events are each counted once per
///   lifecycle
/// - The completion record carries the operation invocation count
#[tokio::test]
async fn test_metrics_for_successful_run() {
    let metrics = Arc::new(BasicMetricsCollector::new());
    let options = CallOptions {
        metrics_collector: Some(metrics.clone() as Arc<dyn MetricsCollector>),
        ..CallOptions::default()
    };

    PipeRunner::new()
        .run_with_options(
            &two_stage_pipe(),
            Namespace::from_pairs([("in", Value::text("hi"))]),
            &options,
        )
        .await
        .unwrap();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.pipes_started, 1);
    assert_eq!(snapshot.pipes_completed, 1);
    assert_eq!(snapshot.pipes_failed, 0);
    assert_eq!(snapshot.stages_started, 2);
    assert_eq!(snapshot.stages_completed, 2);
    assert_eq!(snapshot.operations_started, 2);
    assert_eq!(snapshot.operations_completed, 2);
    assert_eq!(snapshot.executions.len(), 1);
    assert_eq!(snapshot.executions[0].operations, 2);
    assert!(snapshot.executions[0].succeeded);
}

/// Tests metrics on the failure path.
/// Validates that:
/// - A failing operation produces operation, stage, and pipe failure
///   events
#[tokio::test]
async fn test_metrics_for_failed_run() {
    let pipe = Pipe::new(
        "doomed",
        vec![Stage::new(
            "boom",
            ExecutionMode::Merge,
            vec![common::failing("bomb", "kaboom", ErrorPolicy::Propagate)],
            MergeStrategy::LastIn,
        )
        .unwrap()],
    )
    .unwrap();

    let metrics = Arc::new(BasicMetricsCollector::new());
    let options = CallOptions {
        metrics_collector: Some(metrics.clone() as Arc<dyn MetricsCollector>),
        ..CallOptions::default()
    };

    let err = PipeRunner::new()
        .run_with_options(&pipe, Namespace::from_pairs([("seed", Value::int(1))]), &options)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("kaboom"));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.operations_failed, 1);
    assert_eq!(snapshot.stages_failed, 1);
    assert_eq!(snapshot.pipes_failed, 1);
    assert_eq!(snapshot.pipes_completed, 0);
    assert_eq!(snapshot.executions.len(), 1);
    assert!(!snapshot.executions[0].succeeded);
}

/// Tests trace line nesting through a real run.
/// Validates that:
/// - The line sequence nests pipe > stage > operation
/// - Start markers precede completion markers at every level
#[tokio::test]
async fn test_trace_nesting() {
    let tracer = Arc::new(BufferTraceSink::new());
    let options = CallOptions {
        debugger: Some(tracer.clone() as Arc<dyn TraceSink>),
        ..CallOptions::default()
    };

    PipeRunner::new()
        .run_with_options(
            &two_stage_pipe(),
            Namespace::from_pairs([("in", Value::text("hi"))]),
            &options,
        )
        .await
        .unwrap();

    let lines = tracer.lines();
    assert_eq!(lines.len(), 10);
    assert!(lines[0].starts_with("→ pipe 'traced'"));
    assert!(lines[1].starts_with("  → stage 'draft'"));
    assert!(lines[2].starts_with("    → operation 'raise'"));
    assert!(lines[3].starts_with("    ✓ operation 'raise'"));
    assert!(lines[4].starts_with("  ✓ stage 'draft'"));
    assert!(lines[5].starts_with("  → stage 'final'"));
    assert!(lines[8].starts_with("  ✓ stage 'final'"));
    assert!(lines[9].starts_with("✓ pipe 'traced'"));
}

/// Tests that both sinks receive events in the same run.
/// Validates that:
/// - metrics_collector and debugger can be combined in one call
#[tokio::test]
async fn test_both_sinks_together() {
    let metrics = Arc::new(BasicMetricsCollector::new());
    let tracer = Arc::new(BufferTraceSink::new());
    let options = CallOptions {
        metrics_collector: Some(metrics.clone() as Arc<dyn MetricsCollector>),
        debugger: Some(tracer.clone() as Arc<dyn TraceSink>),
        ..CallOptions::default()
    };

    PipeRunner::new()
        .run_with_options(
            &two_stage_pipe(),
            Namespace::from_pairs([("in", Value::text("hi"))]),
            &options,
        )
        .await
        .unwrap();

    assert_eq!(metrics.snapshot().pipes_completed, 1);
    assert!(!tracer.lines().is_empty());
}

/// Tests the Prometheus bridge through a real run.
/// Validates that:
/// - Counters and histograms advance
/// - The text exposition mentions the engine's families
#[tokio::test]
async fn test_prometheus_bridge() {
    let service = Arc::new(MetricsService::new().unwrap());
    let collector = Arc::new(PrometheusMetricsCollector::new(Arc::clone(&service)));
    let options = CallOptions {
        metrics_collector: Some(collector as Arc<dyn MetricsCollector>),
        ..CallOptions::default()
    };

    PipeRunner::new()
        .run_with_options(
            &two_stage_pipe(),
            Namespace::from_pairs([("in", Value::text("hi"))]),
            &options,
        )
        .await
        .unwrap();

    let exported = service.export().unwrap();
    assert!(exported.contains("pipeline_pipes_completed_total 1"));
    assert!(exported.contains("pipeline_operations_completed_total 2"));
}

/// Tests duration plausibility in trace output.
/// Validates that:
/// - A deliberately slow operation reports a duration in its completion
///   line
#[tokio::test]
async fn test_trace_durations() {
    let pipe = Pipe::new(
        "slowish",
        vec![Stage::new(
            "nap",
            ExecutionMode::Merge,
            vec![common::sleeper("doze", Duration::from_millis(30), "done")],
            MergeStrategy::LastIn,
        )
        .unwrap()],
    )
    .unwrap();

    let tracer = Arc::new(BufferTraceSink::new());
    let options = CallOptions {
        debugger: Some(tracer.clone() as Arc<dyn TraceSink>),
        ..CallOptions::default()
    };
    PipeRunner::new()
        .run_with_options(&pipe, Namespace::from_pairs([("seed", Value::int(1))]), &options)
        .await
        .unwrap();

    let completion = tracer
        .lines()
        .into_iter()
        .find(|line| line.starts_with("    ✓ operation 'doze'"))
        .expect("operation completion line");
    assert!(completion.contains("ms"));
}
