// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Scheduling Tests
//!
//! Exercises the scheduler's mode × strategy matrix, positional
//! determinism under arbitrary completion order, the bounded-parallel
//! wall-clock behavior, failure collection, and the pinned semantics for
//! suppressed operations and parallel deletes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dataflow_pipeline::infrastructure::runtime::{ExecutionContext, StageScheduler, TimeBudget};
use dataflow_pipeline::{
    field, ErrorPolicy, ExecutionId, ExecutionMode, InlineOperation, MergeStrategy, Namespace, NullMetricsCollector,
    NullTraceSink, Operation, PipelineError, SchemaPropagator, Stage, TypeDescriptor, Value,
};

use crate::common;

async fn run_stage(stage: Stage, inputs: Vec<Namespace>) -> Result<Vec<Namespace>, PipelineError> {
    let stages = vec![stage];
    let schema = SchemaPropagator::propagate(&stages)?;
    let ctx = Arc::new(ExecutionContext::new(
        "stage-test",
        ExecutionId::new(),
        Arc::new(NullMetricsCollector),
        Arc::new(NullTraceSink),
        10,
    ));
    StageScheduler::new(ctx)
        .execute(&stages[0], &schema.stages[0], inputs, &TimeBudget::unbounded())
        .await
}

/// Tests parallel enrichment under the disjoint strategy.
/// Validates that:
/// - Two parallel setters with disjoint sets both land in the single
///   merged output
#[tokio::test]
async fn test_merge_disjoint_enrichment() {
    let stage = Stage::new(
        "enrich",
        ExecutionMode::Merge,
        vec![common::int_setter("a", "a", 1), common::int_setter("b", "b", 2)],
        MergeStrategy::Disjoint,
    )
    .unwrap();

    let outputs = run_stage(stage, vec![Namespace::empty()]).await.unwrap();
    assert_eq!(outputs.len(), 1);
    common::assert_ns_eq(&outputs[0], &[("a", Value::int(1)), ("b", Value::int(2))]);
}

/// Tests the collate strategy on a conflict.
/// Validates that:
/// - Conflicting values become a sequence in declared operation order
/// - Identical values collapse to one
#[tokio::test]
async fn test_merge_collate_conflict() {
    let stage = Stage::new(
        "conflict",
        ExecutionMode::Merge,
        vec![common::text_setter("a", "out", "x"), common::text_setter("b", "out", "y")],
        MergeStrategy::Collate,
    )
    .unwrap();

    let outputs = run_stage(stage, vec![Namespace::empty()]).await.unwrap();
    assert_eq!(
        outputs[0].get(&field("out")),
        Some(&Value::list([Value::text("x"), Value::text("y")]))
    );

    let stage = Stage::new(
        "agreement",
        ExecutionMode::Merge,
        vec![common::text_setter("a", "out", "x"), common::text_setter("b", "out", "x")],
        MergeStrategy::Collate,
    )
    .unwrap();
    let outputs = run_stage(stage, vec![Namespace::empty()]).await.unwrap();
    assert_eq!(outputs[0].get(&field("out")), Some(&Value::text("x")));
}

/// Tests last_in and first_in precedence by declared position.
/// Validates that:
/// - last_in lets the later operation win
/// - first_in lets the earlier operation win
#[tokio::test]
async fn test_merge_precedence_strategies() {
    let ops = || {
        vec![
            common::text_setter("early", "out", "early"),
            common::text_setter("late", "out", "late"),
        ]
    };

    let last = Stage::new("last", ExecutionMode::Merge, ops(), MergeStrategy::LastIn).unwrap();
    let outputs = run_stage(last, vec![Namespace::empty()]).await.unwrap();
    assert_eq!(outputs[0].get(&field("out")), Some(&Value::text("late")));

    let first = Stage::new("first", ExecutionMode::Merge, ops(), MergeStrategy::FirstIn).unwrap();
    let outputs = run_stage(first, vec![Namespace::empty()]).await.unwrap();
    assert_eq!(outputs[0].get(&field("out")), Some(&Value::text("early")));
}

/// Tests merge-mode input folding.
/// Validates that:
/// - The input list folds right-biased before operations run
#[tokio::test]
async fn test_merge_folds_inputs() {
    let stage = Stage::new(
        "fold",
        ExecutionMode::Merge,
        vec![common::passthrough("noop")],
        MergeStrategy::LastIn,
    )
    .unwrap();

    let inputs = vec![
        Namespace::from_pairs([("k", Value::int(1)), ("only", Value::int(7))]),
        Namespace::from_pairs([("k", Value::int(2))]),
    ];
    let outputs = run_stage(stage, inputs).await.unwrap();
    common::assert_ns_eq(&outputs[0], &[("k", Value::int(2)), ("only", Value::int(7))]);
}

/// Tests fan-out positional correspondence.
/// Validates that:
/// - Output index i corresponds to input index i regardless of
///   completion order (earlier elements finish later here)
#[tokio::test]
async fn test_fan_out_preserves_positions() {
    let source = field("v");
    let target = field("sq");
    let op: Arc<dyn Operation> = Arc::new(
        InlineOperation::builder("slow-square")
            .reads("v", TypeDescriptor::int())
            .sets("sq", TypeDescriptor::int())
            .apply(move |inputs| {
                let source = source.clone();
                let target = target.clone();
                Box::pin(async move {
                    let v = inputs[0].get(&source).and_then(|v| v.as_int()).unwrap_or_default();
                    // Invert completion order: low values sleep longest.
                    tokio::time::sleep(Duration::from_millis(60 - (v as u64) * 20)).await;
                    Ok(vec![inputs[0].merge([(target.clone(), Value::int(v * v))])])
                })
            }),
    );

    let stage = Stage::new("square", ExecutionMode::FanOut, vec![op], MergeStrategy::LastIn).unwrap();
    let inputs: Vec<Namespace> = (1..=3)
        .map(|v| Namespace::from_pairs([("v", Value::int(v))]))
        .collect();
    let outputs = run_stage(stage, inputs).await.unwrap();

    assert_eq!(outputs.len(), 3);
    for (idx, expected) in [(0usize, 1i64), (1, 4), (2, 9)] {
        assert_eq!(outputs[idx].get(&field("v")), Some(&Value::int(idx as i64 + 1)));
        assert_eq!(outputs[idx].get(&field("sq")), Some(&Value::int(expected)));
    }
}

/// Tests batch mode with a count-changing operation.
/// Validates that:
/// - The canonical output length follows the first successful operation
/// - A filter dropping records shortens the stage output
#[tokio::test]
async fn test_batch_filter_drops_records() {
    let filter: Arc<dyn Operation> = Arc::new(dataflow_pipeline::FilterOperation::field_equals(
        "keep-a",
        field("kind"),
        Value::text("a"),
    ));
    let stage = Stage::new("sift", ExecutionMode::Batch, vec![filter], MergeStrategy::LastIn).unwrap();

    let inputs = vec![
        Namespace::from_pairs([("kind", Value::text("a")), ("n", Value::int(1))]),
        Namespace::from_pairs([("kind", Value::text("b")), ("n", Value::int(2))]),
        Namespace::from_pairs([("kind", Value::text("a")), ("n", Value::int(3))]),
    ];
    let outputs = run_stage(stage, inputs).await.unwrap();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].get(&field("n")), Some(&Value::int(1)));
    assert_eq!(outputs[1].get(&field("n")), Some(&Value::int(3)));
}

/// Tests the bounded-parallel wall clock.
/// Validates that:
/// - Four 150ms operations complete together in far less than 600ms
#[tokio::test]
async fn test_parallel_wall_clock() {
    let ops: Vec<Arc<dyn Operation>> = (0..4)
        .map(|idx| common::sleeper(&format!("sleep-{}", idx), Duration::from_millis(150), &format!("done{}", idx)))
        .collect();
    let stage = Stage::new("sleepers", ExecutionMode::Merge, ops, MergeStrategy::LastIn).unwrap();

    let started = Instant::now();
    let outputs = run_stage(stage, vec![Namespace::empty()]).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(outputs[0].len(), 4);
    assert!(
        elapsed < Duration::from_millis(450),
        "stage took {:?}, expected parallel execution",
        elapsed
    );
}

/// Tests failure collection discipline.
/// Validates that:
/// - All peers run to completion despite an early failure
/// - The first failure in declared order is the one raised
#[tokio::test]
async fn test_failures_collected_peers_complete() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let ops: Vec<Arc<dyn Operation>> = vec![
        common::failing("first-fail", "first boom", ErrorPolicy::Propagate),
        common::failing("second-fail", "second boom", ErrorPolicy::Propagate),
        common::counting("survivor", Arc::clone(&invocations)),
    ];
    let stage = Stage::new("doomed", ExecutionMode::Merge, ops, MergeStrategy::LastIn).unwrap();

    let err = run_stage(stage, vec![Namespace::empty()]).await.unwrap_err();
    assert!(err.to_string().contains("first boom"));
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

/// Tests pass-through when every operation suppresses its failure.
/// Validates that:
/// - A merge position with only suppressed contributions yields the
///   folded input unchanged
#[tokio::test]
async fn test_all_suppressed_passes_through() {
    let ops: Vec<Arc<dyn Operation>> = vec![
        common::failing("soft-a", "boom", ErrorPolicy::Ignore),
        common::failing("soft-b", "boom", ErrorPolicy::Ignore),
    ];
    let stage = Stage::new("soft", ExecutionMode::Merge, ops, MergeStrategy::LastIn).unwrap();

    let input = Namespace::from_pairs([("k", Value::int(5))]);
    let outputs = run_stage(stage, vec![input.clone()]).await.unwrap();
    assert_eq!(outputs, vec![input]);
}

/// Tests fan-out suppression per element.
/// Validates that:
/// - Elements where the only operation suppressed pass through unchanged
///   while other elements are transformed
#[tokio::test]
async fn test_fan_out_suppression_is_per_element() {
    let target = field("tag");
    let flaky: Arc<dyn Operation> = Arc::new(
        InlineOperation::builder("flaky")
            .reads("v", TypeDescriptor::int())
            .sets("tag", TypeDescriptor::bool())
            .error_policy(ErrorPolicy::Ignore)
            .apply(move |inputs| {
                let target = target.clone();
                Box::pin(async move {
                    let v = inputs[0].get(&field("v")).and_then(|v| v.as_int()).unwrap_or_default();
                    if v % 2 == 0 {
                        Err(PipelineError::operation_failed("even values fail"))
                    } else {
                        Ok(vec![inputs[0].merge([(target.clone(), Value::bool(true))])])
                    }
                })
            }),
    );
    let stage = Stage::new("tagger", ExecutionMode::FanOut, vec![flaky], MergeStrategy::LastIn).unwrap();

    let inputs: Vec<Namespace> = (1..=3)
        .map(|v| Namespace::from_pairs([("v", Value::int(v))]))
        .collect();
    let outputs = run_stage(stage, inputs).await.unwrap();

    assert_eq!(outputs.len(), 3);
    assert!(outputs[0].has(&field("tag")));
    assert!(!outputs[1].has(&field("tag")));
    assert!(outputs[2].has(&field("tag")));
}

/// Tests the pinned rename-and-delete semantics under last_in.
/// Validates that:
/// - A key deleted by one parallel operation reappears when a peer's
///   output still carries it (combine works on full output namespaces)
#[tokio::test]
async fn test_parallel_delete_is_not_authoritative() {
    let deleter: Arc<dyn Operation> = Arc::new(
        InlineOperation::builder("deleter")
            .reads_any("k")
            .deletes("k")
            .map(|_| Ok(Default::default())),
    );
    let stage = Stage::new(
        "ambiguous",
        ExecutionMode::Merge,
        vec![deleter, common::passthrough("keeper")],
        MergeStrategy::LastIn,
    )
    .unwrap();

    let outputs = run_stage(stage, vec![Namespace::from_pairs([("k", Value::int(1))])])
        .await
        .unwrap();
    // The keeper runs later in declared order and still carries k.
    assert_eq!(outputs[0].get(&field("k")), Some(&Value::int(1)));
}

/// Tests stage timeout attribution.
/// Validates that:
/// - A stage timeout bounds an operation with no timeout of its own
/// - The raised error cites the stage
#[tokio::test]
async fn test_stage_timeout_binds_operations() {
    let stage = Stage::new(
        "slow",
        ExecutionMode::Merge,
        vec![common::sleeper("sleepy", Duration::from_secs(5), "done")],
        MergeStrategy::LastIn,
    )
    .unwrap()
    .with_timeout(Duration::from_millis(80));

    let started = Instant::now();
    let err = run_stage(stage, vec![Namespace::empty()]).await.unwrap_err();
    assert!(err.is_timeout());
    assert!(err.to_string().contains("stage 'slow'"));
    assert!(started.elapsed() < Duration::from_secs(2));
}
