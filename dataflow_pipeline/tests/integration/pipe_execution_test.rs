// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipe Execution Tests
//!
//! End-to-end runner behavior over validated pipes: schema flow across
//! stages, input validation, pass-through of undeclared fields, the
//! hierarchical timeout clamp, and construction-time rejections.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dataflow_pipeline::{
    field, ExecutionMode, InlineOperation, MergeStrategy, Namespace, Operation, Pipe, PipeRunner, PipelineError,
    Stage, TypeDescriptor, Value,
};

use crate::common;

fn merge_stage(name: &str, ops: Vec<Arc<dyn Operation>>) -> Stage {
    Stage::new(name, ExecutionMode::Merge, ops, MergeStrategy::LastIn).unwrap()
}

/// Tests the identity pipe.
/// Validates that:
/// - A single merge stage reading `in` and setting `out` yields both
///   fields
#[tokio::test]
async fn test_identity_pipe() {
    let pipe = Pipe::new("identity", vec![merge_stage("shout", vec![common::upcase("upcase", "in", "out")])]).unwrap();
    let output = PipeRunner::new()
        .run(&pipe, Namespace::from_pairs([("in", Value::text("hi"))]))
        .await
        .unwrap();
    common::assert_ns_eq(&output, &[("in", Value::text("hi")), ("out", Value::text("HI"))]);
}

/// Tests pass-through of undeclared input fields.
/// Validates that:
/// - A no-op pipe returns its input unchanged
/// - Extra fields beyond the declared reads flow through untouched
#[tokio::test]
async fn test_extra_fields_pass_through() {
    let noop: Arc<dyn Operation> = Arc::new(
        InlineOperation::builder("noop")
            .reads("in", TypeDescriptor::text())
            .apply(|inputs| Box::pin(async move { Ok(inputs) })),
    );
    let pipe = Pipe::new("noop", vec![merge_stage("only", vec![noop])]).unwrap();

    let input = Namespace::from_pairs([("in", Value::text("x")), ("extra", Value::int(42))]);
    let output = PipeRunner::new().run(&pipe, input.clone()).await.unwrap();
    assert_eq!(output, input);
}

/// Tests schema flow across stages.
/// Validates that:
/// - A second stage reads a field the first stage set
/// - The final output carries both stages' work
#[tokio::test]
async fn test_two_stage_flow() {
    let pipe = Pipe::new(
        "chain",
        vec![
            merge_stage("draft", vec![common::upcase("raise", "in", "draft")]),
            merge_stage("final", vec![common::upcase("raise-again", "draft", "final")]),
        ],
    )
    .unwrap();

    let output = PipeRunner::new()
        .run(&pipe, Namespace::from_pairs([("in", Value::text("ok"))]))
        .await
        .unwrap();
    assert_eq!(output.get(&field("draft")), Some(&Value::text("OK")));
    assert_eq!(output.get(&field("final")), Some(&Value::text("OK")));
}

/// Tests invocation input validation.
/// Validates that:
/// - An empty mapping raises EmptyInput
/// - A missing declared read raises PropertyNotFound
/// - A mistyped declared read raises TypeMismatch
#[tokio::test]
async fn test_input_validation() {
    let pipe = Pipe::new("strict", vec![merge_stage("shout", vec![common::upcase("upcase", "in", "out")])]).unwrap();
    let runner = PipeRunner::new();

    let err = runner.run(&pipe, Namespace::empty()).await.unwrap_err();
    assert!(matches!(err, PipelineError::EmptyInput(_)));

    let err = runner
        .run(&pipe, Namespace::from_pairs([("other", Value::int(1))]))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::PropertyNotFound(_)));

    let err = runner
        .run(&pipe, Namespace::from_pairs([("in", Value::int(1))]))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::TypeMismatch(_)));
}

/// Tests construction-time rejections.
/// Validates that:
/// - A non-merge last stage is rejected
/// - An unsatisfiable read across stages raises IncompatibleStages
#[tokio::test]
async fn test_construction_rejections() {
    let fan_out = Stage::new(
        "fan",
        ExecutionMode::FanOut,
        vec![common::passthrough("noop")],
        MergeStrategy::LastIn,
    )
    .unwrap();
    let err = Pipe::new("bad-tail", vec![fan_out]).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidConfiguration(_)));

    let err = Pipe::new(
        "bad-flow",
        vec![
            merge_stage("first", vec![common::upcase("a", "in", "draft")]),
            merge_stage("second", vec![common::upcase("b", "phantom", "out")]),
        ],
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::IncompatibleStages(_)));
}

/// Tests the hierarchical timeout clamp.
/// Validates that:
/// - With pipe timeout far below the stage timeout, a slow operation
///   raises Timeout within roughly the pipe budget
/// - The message cites the pipe name
#[tokio::test]
async fn test_timeout_clamp_cites_pipe() {
    let stage = Stage::new(
        "patient",
        ExecutionMode::Merge,
        vec![common::sleeper("sleepy", Duration::from_secs(5), "done")],
        MergeStrategy::LastIn,
    )
    .unwrap()
    .with_timeout(Duration::from_secs(10));

    let pipe = Pipe::new("hasty", vec![stage])
        .unwrap()
        .with_timeout(Duration::from_millis(200));

    let started = Instant::now();
    let err = PipeRunner::new()
        .run(&pipe, Namespace::from_pairs([("seed", Value::int(1))]))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(err.is_timeout());
    assert!(err.to_string().contains("pipe 'hasty'"), "got: {}", err);
    assert!(elapsed < Duration::from_secs(2), "took {:?}", elapsed);
}

/// Tests fan-out inside a full pipe.
/// Validates that:
/// - explode → fan_out transform → collapse reassembles positionally
#[tokio::test]
async fn test_fan_out_within_pipe() {
    let explode: Arc<dyn Operation> = Arc::new(dataflow_pipeline::ExplodeOperation::new(
        "explode",
        field("vs"),
        field("v"),
    ));
    let collapse: Arc<dyn Operation> = Arc::new(dataflow_pipeline::CollapseOperation::new(
        "collapse",
        field("sq"),
        field("squares"),
        dataflow_pipeline::CollapseMode::Collect,
    ));

    let pipe = Pipe::new(
        "squares",
        vec![
            Stage::new("split", ExecutionMode::Batch, vec![explode], MergeStrategy::LastIn).unwrap(),
            Stage::new(
                "square",
                ExecutionMode::FanOut,
                vec![common::square("square", "v", "sq")],
                MergeStrategy::LastIn,
            )
            .unwrap(),
            Stage::new("gather", ExecutionMode::Merge, vec![collapse], MergeStrategy::LastIn).unwrap(),
        ],
    )
    .unwrap();

    let input = Namespace::from_pairs([("vs", Value::list([Value::int(1), Value::int(2), Value::int(3)]))]);
    let output = PipeRunner::new().run(&pipe, input).await.unwrap();

    assert_eq!(
        output.get(&field("squares")),
        Some(&Value::list([Value::int(1), Value::int(4), Value::int(9)]))
    );
}
