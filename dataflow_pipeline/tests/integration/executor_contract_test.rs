// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Executor Contract Tests
//!
//! Exercises the operation executor's enforcement sequence directly:
//! read validation before invocation, output shape checks, the undeclared
//! growth/mutation/loss detections, error-policy suppression, and timeout
//! attribution.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dataflow_pipeline::infrastructure::runtime::{ExecutionContext, OperationExecutor, TimeBudget};
use dataflow_pipeline::{
    field, BasicMetricsCollector, ErrorPolicy, ExecutionId, InlineOperation, MetricsCollector, Namespace,
    NullMetricsCollector, NullTraceSink, Operation, PipelineError, PrefixSchema, TypeDescriptor, Value,
};
use dataflow_pipeline_domain::services::schema_propagator::ResolvedContract;

use crate::common;

fn context_with(metrics: Arc<dyn MetricsCollector>) -> Arc<ExecutionContext> {
    Arc::new(ExecutionContext::new(
        "test-pipe",
        ExecutionId::new(),
        metrics,
        Arc::new(NullTraceSink),
        4,
    ))
}

fn context() -> Arc<ExecutionContext> {
    context_with(Arc::new(NullMetricsCollector))
}

fn executor_for(op: &Arc<dyn Operation>, ctx: &Arc<ExecutionContext>) -> OperationExecutor {
    let prefix = PrefixSchema::empty();
    let contract = ResolvedContract {
        operation: op.name().to_string(),
        reads: op.declared_reads(&prefix),
        sets: op.declared_sets(&prefix),
        deletes: op.declared_deletes(&prefix),
    };
    OperationExecutor::new(
        op,
        Arc::new(contract),
        op.create().unwrap(),
        &TimeBudget::unbounded(),
        "test-stage",
        Arc::clone(ctx),
    )
}

/// Tests contract soundness for reads.
/// Validates that:
/// - A missing non-optional read raises PropertyNotFound
/// - The callable is never invoked
/// - The message carries the qualified operation name
#[tokio::test]
async fn test_missing_read_blocks_invocation() {
    let invocations = Arc::new(AtomicUsize::new(0));
    let probe = Arc::clone(&invocations);
    let op: Arc<dyn Operation> = Arc::new(
        InlineOperation::builder("strict")
            .reads("needed", TypeDescriptor::text())
            .apply(move |inputs| {
                probe.fetch_add(1, Ordering::SeqCst);
                Box::pin(async move { Ok(inputs) })
            }),
    );

    let ctx = context();
    let err = executor_for(&op, &ctx)
        .invoke(vec![Namespace::from_pairs([("other", Value::int(1))])])
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::PropertyNotFound(_)));
    assert!(err.to_string().contains("operation 'strict' in stage 'test-stage'"));
    assert_eq!(invocations.load(Ordering::SeqCst), 0);
}

/// Tests typed read validation.
/// Validates that:
/// - A present but mistyped read raises TypeMismatch with the field path
/// - An absent optional read passes
#[tokio::test]
async fn test_read_type_validation() {
    let op: Arc<dyn Operation> = Arc::new(
        InlineOperation::builder("typed")
            .reads("count", TypeDescriptor::int())
            .reads_optional("note", Some(TypeDescriptor::text()))
            .apply(|inputs| Box::pin(async move { Ok(inputs) })),
    );
    let ctx = context();

    let err = executor_for(&op, &ctx)
        .invoke(vec![Namespace::from_pairs([("count", Value::text("three"))])])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("count: expected Int"));

    let ok = executor_for(&op, &ctx)
        .invoke(vec![Namespace::from_pairs([("count", Value::int(3))])])
        .await
        .unwrap();
    assert_eq!(ok.namespaces.len(), 1);
}

/// Tests the output length contract.
/// Validates that:
/// - Without allows_count_change, output length must equal input length
/// - The error names expected and actual counts
#[tokio::test]
async fn test_output_count_mismatch() {
    let op: Arc<dyn Operation> = Arc::new(InlineOperation::builder("duplicator").apply(|inputs| {
        Box::pin(async move {
            let doubled: Vec<Namespace> = inputs.iter().chain(inputs.iter()).cloned().collect();
            Ok(doubled)
        })
    }));
    let ctx = context();

    let err = executor_for(&op, &ctx)
        .invoke(vec![Namespace::from_pairs([("k", Value::int(1))])])
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::OutputCountMismatch(_)));
    assert!(err.to_string().contains("returned 2 namespaces for 1 inputs"));
}

/// Tests declared-set enforcement.
/// Validates that:
/// - A promised non-optional set that never appears raises
///   PropertyNotFound
/// - A mistyped set raises TypeMismatch
/// - An optional set may stay absent
#[tokio::test]
async fn test_set_validation() {
    let ctx = context();

    let promises: Arc<dyn Operation> = Arc::new(
        InlineOperation::builder("promises")
            .sets("result", TypeDescriptor::int())
            .apply(|inputs| Box::pin(async move { Ok(inputs) })),
    );
    let err = executor_for(&promises, &ctx)
        .invoke(vec![Namespace::from_pairs([("k", Value::int(1))])])
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::PropertyNotFound(_)));
    assert!(err.to_string().contains("declared set 'result'"));

    let mistyped: Arc<dyn Operation> = Arc::new(
        InlineOperation::builder("mistyped")
            .sets("result", TypeDescriptor::int())
            .map(|_| Ok([(field("result"), Value::text("nope"))].into())),
    );
    let err = executor_for(&mistyped, &ctx)
        .invoke(vec![Namespace::from_pairs([("k", Value::int(1))])])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("result: expected Int"));

    let lazy: Arc<dyn Operation> = Arc::new(
        InlineOperation::builder("lazy")
            .sets_optional("maybe", Some(TypeDescriptor::int()))
            .apply(|inputs| Box::pin(async move { Ok(inputs) })),
    );
    assert!(executor_for(&lazy, &ctx)
        .invoke(vec![Namespace::from_pairs([("k", Value::int(1))])])
        .await
        .is_ok());
}

/// Tests undeclared output mutations.
/// Validates that:
/// - Growing an undeclared field raises UnexpectedProperty
/// - Modifying an existing field without declaring it raises
///   UnexpectedProperty
/// - Dropping a field without declaring the delete raises
///   UnexpectedDeletion
/// - Keeping a declared-delete field raises UnexpectedProperty
#[tokio::test]
async fn test_undeclared_output_changes() {
    let ctx = context();
    let input = vec![Namespace::from_pairs([("k", Value::int(1))])];

    let grower: Arc<dyn Operation> = Arc::new(
        InlineOperation::builder("grower").map(|_| Ok([(field("surprise"), Value::int(9))].into())),
    );
    let err = executor_for(&grower, &ctx).invoke(input.clone()).await.unwrap_err();
    assert!(matches!(err, PipelineError::UnexpectedProperty(_)));
    assert!(err.to_string().contains("surprise"));

    let mutator: Arc<dyn Operation> = Arc::new(
        InlineOperation::builder("mutator").map(|_| Ok([(field("k"), Value::int(99))].into())),
    );
    let err = executor_for(&mutator, &ctx).invoke(input.clone()).await.unwrap_err();
    assert!(matches!(err, PipelineError::UnexpectedProperty(_)));
    assert!(err.to_string().contains("modified field 'k'"));

    let dropper: Arc<dyn Operation> = Arc::new(InlineOperation::builder("dropper").apply(|inputs| {
        Box::pin(async move {
            Ok(inputs.iter().map(|ns| ns.delete([&field("k")])).collect::<Vec<_>>())
        })
    }));
    let err = executor_for(&dropper, &ctx).invoke(input.clone()).await.unwrap_err();
    assert!(matches!(err, PipelineError::UnexpectedDeletion(_)));

    let keeper: Arc<dyn Operation> = Arc::new(
        InlineOperation::builder("keeper")
            .deletes("k")
            .apply(|inputs| Box::pin(async move { Ok(inputs) })),
    );
    let err = executor_for(&keeper, &ctx).invoke(input).await.unwrap_err();
    assert!(matches!(err, PipelineError::UnexpectedProperty(_)));
    assert!(err.to_string().contains("declared delete of 'k'"));
}

/// Tests error-policy suppression.
/// Validates that:
/// - Ignore turns a failure into an empty suppressed outcome
/// - operation_completed (not operation_failed) is emitted
/// - A predicate policy only suppresses approved failures
#[tokio::test]
async fn test_error_policy_suppression() {
    let metrics = Arc::new(BasicMetricsCollector::new());
    let ctx = context_with(metrics.clone() as Arc<dyn MetricsCollector>);

    let ignored = common::failing("ignored", "boom", ErrorPolicy::Ignore);
    let outcome = executor_for(&ignored, &ctx)
        .invoke(vec![Namespace::from_pairs([("k", Value::int(1))])])
        .await
        .unwrap();
    assert!(outcome.suppressed);
    assert!(outcome.namespaces.is_empty());

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.operations_completed, 1);
    assert_eq!(snapshot.operations_failed, 0);

    let picky = common::failing(
        "picky",
        "boom",
        ErrorPolicy::IgnoreIf(Arc::new(|e| matches!(e, PipelineError::Timeout(_)))),
    );
    let err = executor_for(&picky, &ctx)
        .invoke(vec![Namespace::from_pairs([("k", Value::int(1))])])
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::OperationFailed(_)));
}

/// Tests operation timeouts.
/// Validates that:
/// - A slow callable raises Timeout citing the operation
/// - The error policy never suppresses a timeout
#[tokio::test]
async fn test_timeout_is_not_suppressible() {
    let slow: Arc<dyn Operation> = Arc::new(
        InlineOperation::builder("slow")
            .timeout(Duration::from_millis(50))
            .error_policy(ErrorPolicy::Ignore)
            .apply(|inputs| {
                Box::pin(async move {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(inputs)
                })
            }),
    );
    let ctx = context();

    let started = std::time::Instant::now();
    let err = executor_for(&slow, &ctx)
        .invoke(vec![Namespace::from_pairs([("k", Value::int(1))])])
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.to_string().contains("operation 'slow'"));
    assert!(started.elapsed() < Duration::from_secs(2));
}
