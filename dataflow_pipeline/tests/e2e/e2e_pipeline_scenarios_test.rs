// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # End-to-End Pipeline Scenarios
//!
//! The canonical engine scenarios with literal inputs and outputs:
//! identity transformation, parallel enrichment, collate conflicts,
//! fan-out mapping, explode-then-collapse reassembly, and the timeout
//! clamp.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dataflow_pipeline::infrastructure::runtime::{ExecutionContext, StageScheduler, TimeBudget};
use dataflow_pipeline::{
    field, CollapseMode, CollapseOperation, ExecutionId, ExecutionMode, ExplodeOperation, MergeStrategy, Namespace,
    NullMetricsCollector, NullTraceSink, Operation, Pipe, PipeRunner, PipelineError, SchemaPropagator, Stage, Value,
};

use crate::common;

async fn run_single_stage(stage: Stage, inputs: Vec<Namespace>) -> Result<Vec<Namespace>, PipelineError> {
    let stages = vec![stage];
    let schema = SchemaPropagator::propagate(&stages)?;
    let ctx = Arc::new(ExecutionContext::new(
        "scenario",
        ExecutionId::new(),
        Arc::new(NullMetricsCollector),
        Arc::new(NullTraceSink),
        10,
    ));
    StageScheduler::new(ctx)
        .execute(&stages[0], &schema.stages[0], inputs, &TimeBudget::unbounded())
        .await
}

/// Scenario: identity pipe.
/// Validates that:
/// - One merge stage reading `in` and setting `out` maps
///   {in: "hi"} to {in: "hi", out: "HI"}
#[tokio::test]
async fn test_identity_pipe() {
    let pipe = Pipe::new(
        "identity",
        vec![Stage::new(
            "shout",
            ExecutionMode::Merge,
            vec![common::upcase("upcase", "in", "out")],
            MergeStrategy::LastIn,
        )
        .unwrap()],
    )
    .unwrap();

    let output = PipeRunner::new()
        .run(&pipe, Namespace::from_pairs([("in", Value::text("hi"))]))
        .await
        .unwrap();
    common::assert_ns_eq(&output, &[("in", Value::text("hi")), ("out", Value::text("HI"))]);
}

/// Scenario: parallel enrichment under disjoint.
/// Validates that:
/// - Two parallel setters over the empty record produce {a: 1, b: 2}
#[tokio::test]
async fn test_parallel_enrichment_disjoint() {
    let stage = Stage::new(
        "enrich",
        ExecutionMode::Merge,
        vec![common::int_setter("a", "a", 1), common::int_setter("b", "b", 2)],
        MergeStrategy::Disjoint,
    )
    .unwrap();

    let outputs = run_single_stage(stage, vec![Namespace::empty()]).await.unwrap();
    assert_eq!(outputs.len(), 1);
    common::assert_ns_eq(&outputs[0], &[("a", Value::int(1)), ("b", Value::int(2))]);
}

/// Scenario: collate conflict.
/// Validates that:
/// - Two operations setting `out` to "x" and "y" collate to the
///   two-element sequence ["x", "y"] in declared order
#[tokio::test]
async fn test_collate_conflict() {
    let stage = Stage::new(
        "conflict",
        ExecutionMode::Merge,
        vec![common::text_setter("a", "out", "x"), common::text_setter("b", "out", "y")],
        MergeStrategy::Collate,
    )
    .unwrap();

    let outputs = run_single_stage(stage, vec![Namespace::empty()]).await.unwrap();
    assert_eq!(
        outputs[0].get(&field("out")),
        Some(&Value::list([Value::text("x"), Value::text("y")]))
    );
}

/// Scenario: fan-out map.
/// Validates that:
/// - A single squaring operation over [{v:1},{v:2},{v:3}] yields
///   [{v:1,sq:1},{v:2,sq:4},{v:3,sq:9}]
#[tokio::test]
async fn test_fan_out_map() {
    let stage = Stage::new(
        "square",
        ExecutionMode::FanOut,
        vec![common::square("square", "v", "sq")],
        MergeStrategy::LastIn,
    )
    .unwrap();

    let inputs: Vec<Namespace> = (1..=3)
        .map(|v| Namespace::from_pairs([("v", Value::int(v))]))
        .collect();
    let outputs = run_single_stage(stage, inputs).await.unwrap();

    assert_eq!(outputs.len(), 3);
    common::assert_ns_eq(&outputs[0], &[("v", Value::int(1)), ("sq", Value::int(1))]);
    common::assert_ns_eq(&outputs[1], &[("v", Value::int(2)), ("sq", Value::int(4))]);
    common::assert_ns_eq(&outputs[2], &[("v", Value::int(3)), ("sq", Value::int(9))]);
}

/// Scenario: explode then collapse.
/// Validates that:
/// - A batch explode of {items:[a,b,c]} into three records followed by a
///   merge collapse with collect reassembles {item:[a,b,c]}
#[tokio::test]
async fn test_explode_then_collapse() {
    let explode: Arc<dyn Operation> = Arc::new(ExplodeOperation::new("explode", field("items"), field("item")));
    let collapse: Arc<dyn Operation> = Arc::new(CollapseOperation::new(
        "collapse",
        field("item"),
        field("item"),
        CollapseMode::Collect,
    ));

    let pipe = Pipe::new(
        "reassemble",
        vec![
            Stage::new("split", ExecutionMode::Batch, vec![explode], MergeStrategy::LastIn).unwrap(),
            Stage::new("gather", ExecutionMode::Merge, vec![collapse], MergeStrategy::LastIn).unwrap(),
        ],
    )
    .unwrap();

    let input = Namespace::from_pairs([(
        "items",
        Value::list([Value::text("a"), Value::text("b"), Value::text("c")]),
    )]);
    let output = PipeRunner::new().run(&pipe, input).await.unwrap();

    common::assert_ns_eq(
        &output,
        &[(
            "item",
            Value::list([Value::text("a"), Value::text("b"), Value::text("c")]),
        )],
    );
}

/// Scenario: timeout clamp.
/// Validates that:
/// - pipe timeout 1s, stage timeout 10s, operation sleeping 5s raises
///   Timeout in roughly 1s with a message citing the pipe name
#[tokio::test]
async fn test_timeout_clamp() {
    let stage = Stage::new(
        "patient",
        ExecutionMode::Merge,
        vec![common::sleeper("sleepy", Duration::from_secs(5), "done")],
        MergeStrategy::LastIn,
    )
    .unwrap()
    .with_timeout(Duration::from_secs(10));

    let pipe = Pipe::new("clamped", vec![stage])
        .unwrap()
        .with_timeout(Duration::from_secs(1));

    let started = Instant::now();
    let err = PipeRunner::new()
        .run(&pipe, Namespace::from_pairs([("seed", Value::int(1))]))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout());
    assert!(err.to_string().contains("pipe 'clamped'"), "got: {}", err);
    assert!(
        elapsed > Duration::from_millis(800) && elapsed < Duration::from_secs(3),
        "took {:?}",
        elapsed
    );
}
