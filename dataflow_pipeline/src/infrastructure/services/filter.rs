// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Filter Operation
//!
//! Count-reducing predicate over namespaces: inputs that satisfy the
//! predicate pass through untouched, the rest are dropped. Filter carries
//! `allows_count_change`, so its executor accepts any output length up to
//! the input length.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dataflow_pipeline_domain::services::operation::{
    FieldContract, Operation, OperationCallable, OperationContract, OperationFuture,
};
use dataflow_pipeline_domain::{FieldName, Namespace, PipelineError, Value};

type Predicate = Arc<dyn Fn(&Namespace) -> bool + Send + Sync>;

/// Keeps the input namespaces a predicate approves.
pub struct FilterOperation {
    name: String,
    reads: BTreeMap<FieldName, FieldContract>,
    predicate: Predicate,
    timeout: Option<Duration>,
}

impl FilterOperation {
    /// Creates a filter over an arbitrary predicate.
    ///
    /// The predicate sees whole namespaces; declare reads via the builder
    /// constructors when the predicate depends on specific fields.
    pub fn new(name: impl Into<String>, predicate: impl Fn(&Namespace) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            reads: BTreeMap::new(),
            predicate: Arc::new(predicate),
            timeout: None,
        }
    }

    /// Filter keeping namespaces whose field equals the expected value
    pub fn field_equals(name: impl Into<String>, field_name: FieldName, expected: Value) -> Self {
        let probe = field_name.clone();
        let mut filter = Self::new(name, move |ns: &Namespace| ns.get(&probe) == Some(&expected));
        filter.reads.insert(field_name, FieldContract::optional(None));
        filter
    }

    /// Filter keeping namespaces that carry the field
    pub fn field_exists(name: impl Into<String>, field_name: FieldName) -> Self {
        let probe = field_name.clone();
        let mut filter = Self::new(name, move |ns: &Namespace| ns.has(&probe));
        filter.reads.insert(field_name, FieldContract::optional(None));
        filter
    }

    /// Filter keeping namespaces that lack the field
    pub fn field_missing(name: impl Into<String>, field_name: FieldName) -> Self {
        let probe = field_name.clone();
        let mut filter = Self::new(name, move |ns: &Namespace| !ns.has(&probe));
        filter.reads.insert(field_name, FieldContract::optional(None));
        filter
    }

    /// Sets the operation timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Operation for FilterOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn contract(&self) -> OperationContract {
        OperationContract {
            reads: self.reads.clone(),
            ..OperationContract::default()
        }
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn allows_count_change(&self) -> bool {
        true
    }

    fn create(&self) -> Result<OperationCallable, PipelineError> {
        let predicate = Arc::clone(&self.predicate);
        Ok(Arc::new(move |inputs: Vec<Namespace>| {
            let predicate = Arc::clone(&predicate);
            Box::pin(async move {
                Ok(inputs.into_iter().filter(|ns| predicate(ns)).collect::<Vec<_>>())
            }) as OperationFuture
        }))
    }
}

impl std::fmt::Debug for FilterOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterOperation")
            .field("name", &self.name)
            .field("reads", &self.reads)
            .field("timeout", &self.timeout)
            .finish()
    }
}
