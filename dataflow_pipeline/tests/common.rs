// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Common Test Helpers
//!
//! Shared operation builders for integration and end-to-end tests. All of
//! them are thin wrappers over [`InlineOperation`] so tests read as
//! declarations rather than plumbing.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dataflow_pipeline::{
    field, ErrorPolicy, InlineOperation, Namespace, Operation, PipelineError, TypeDescriptor, Value,
};

/// Operation that sets one integer field to a constant.
pub fn int_setter(name: &str, target: &str, value: i64) -> Arc<dyn Operation> {
    let target_name = field(target);
    Arc::new(
        InlineOperation::builder(name)
            .sets(target, TypeDescriptor::int())
            .map(move |_| Ok([(target_name.clone(), Value::int(value))].into())),
    )
}

/// Operation that sets one text field to a constant.
pub fn text_setter(name: &str, target: &str, value: &str) -> Arc<dyn Operation> {
    let target_name = field(target);
    let text = value.to_string();
    Arc::new(
        InlineOperation::builder(name)
            .sets(target, TypeDescriptor::text())
            .map(move |_| Ok([(target_name.clone(), Value::text(text.clone()))].into())),
    )
}

/// Operation reading `source` (text) and setting `target` to its uppercase.
pub fn upcase(name: &str, source: &str, target: &str) -> Arc<dyn Operation> {
    let source_name = field(source);
    let target_name = field(target);
    Arc::new(
        InlineOperation::builder(name)
            .reads(source, TypeDescriptor::text())
            .sets(target, TypeDescriptor::text())
            .map(move |ns| {
                let text = ns
                    .get(&source_name)
                    .and_then(|v| v.as_text())
                    .unwrap_or_default();
                Ok([(target_name.clone(), Value::text(text.to_uppercase()))].into())
            }),
    )
}

/// Operation reading integer `source` and setting `target` to its square.
pub fn square(name: &str, source: &str, target: &str) -> Arc<dyn Operation> {
    let source_name = field(source);
    let target_name = field(target);
    Arc::new(
        InlineOperation::builder(name)
            .reads(source, TypeDescriptor::int())
            .sets(target, TypeDescriptor::int())
            .map(move |ns| {
                let v = ns.get(&source_name).and_then(|v| v.as_int()).unwrap_or_default();
                Ok([(target_name.clone(), Value::int(v * v))].into())
            }),
    )
}

/// Operation with no declarations that returns its inputs unchanged.
pub fn passthrough(name: &str) -> Arc<dyn Operation> {
    Arc::new(
        InlineOperation::builder(name).apply(|inputs| Box::pin(async move { Ok(inputs) })),
    )
}

/// Operation that sleeps, then sets a marker field.
pub fn sleeper(name: &str, delay: Duration, target: &str) -> Arc<dyn Operation> {
    let target_name = field(target);
    Arc::new(
        InlineOperation::builder(name)
            .sets(target, TypeDescriptor::bool())
            .apply(move |inputs| {
                let target_name = target_name.clone();
                Box::pin(async move {
                    tokio::time::sleep(delay).await;
                    Ok(inputs
                        .iter()
                        .map(|ns| ns.merge([(target_name.clone(), Value::bool(true))]))
                        .collect())
                })
            }),
    )
}

/// Operation that always fails with the given message.
pub fn failing(name: &str, message: &str, policy: ErrorPolicy) -> Arc<dyn Operation> {
    let message = message.to_string();
    Arc::new(
        InlineOperation::builder(name)
            .error_policy(policy)
            .apply(move |_| {
                let message = message.clone();
                Box::pin(async move { Err(PipelineError::operation_failed(message)) })
            }),
    )
}

/// Operation that counts invocations of its callable and passes through.
pub fn counting(name: &str, counter: Arc<AtomicUsize>) -> Arc<dyn Operation> {
    Arc::new(InlineOperation::builder(name).apply(move |inputs| {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move { Ok(inputs) })
    }))
}

/// Asserts a namespace holds exactly the given pairs.
pub fn assert_ns_eq(ns: &Namespace, pairs: &[(&str, Value)]) {
    let expected = Namespace::from_pairs(pairs.iter().map(|(k, v)| (*k, v.clone())));
    assert_eq!(ns, &expected);
}
