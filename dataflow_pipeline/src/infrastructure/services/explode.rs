// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Explode Operation
//!
//! 1→N flatmap: for every input namespace, turns each element of an array
//! field into its own output namespace carrying that element under the
//! target field, with the source array deleted. An empty array contributes
//! no outputs — exploding it genuinely produces nothing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dataflow_pipeline_domain::services::operation::{
    FieldContract, Operation, OperationCallable, OperationFuture, PrefixSchema,
};
use dataflow_pipeline_domain::{FieldName, Namespace, PipelineError, TypeDescriptor};

/// Splits an array field into one namespace per element.
#[derive(Debug, Clone)]
pub struct ExplodeOperation {
    name: String,
    source: FieldName,
    target: FieldName,
    timeout: Option<Duration>,
}

impl ExplodeOperation {
    /// Creates an explode of `source` elements into `target`
    pub fn new(name: impl Into<String>, source: FieldName, target: FieldName) -> Self {
        Self {
            name: name.into(),
            source,
            target,
            timeout: None,
        }
    }

    /// Sets the operation timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Operation for ExplodeOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn declared_reads(&self, prefix: &PrefixSchema) -> BTreeMap<FieldName, FieldContract> {
        let descriptor = prefix
            .descriptor_of(&self.source)
            .cloned()
            .or_else(|| Some(TypeDescriptor::array(TypeDescriptor::Any)));
        [(
            self.source.clone(),
            FieldContract {
                descriptor,
                optional: false,
            },
        )]
        .into()
    }

    fn declared_sets(&self, prefix: &PrefixSchema) -> BTreeMap<FieldName, FieldContract> {
        // Element typing survives the explode when the prefix knows the
        // source is an array.
        let descriptor = match prefix.descriptor_of(&self.source) {
            Some(TypeDescriptor::Array(element)) => Some((**element).clone()),
            _ => None,
        };
        [(
            self.target.clone(),
            FieldContract {
                descriptor,
                optional: false,
            },
        )]
        .into()
    }

    fn declared_deletes(&self, _prefix: &PrefixSchema) -> Vec<FieldName> {
        if self.source != self.target {
            vec![self.source.clone()]
        } else {
            Vec::new()
        }
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn allows_count_change(&self) -> bool {
        true
    }

    fn create(&self) -> Result<OperationCallable, PipelineError> {
        let name = self.name.clone();
        let source = self.source.clone();
        let target = self.target.clone();

        Ok(Arc::new(move |inputs: Vec<Namespace>| {
            let name = name.clone();
            let source = source.clone();
            let target = target.clone();
            Box::pin(async move {
                let mut outputs = Vec::new();
                for ns in &inputs {
                    let value = ns.get(&source).ok_or_else(|| {
                        PipelineError::PropertyNotFound(format!(
                            "Operation '{}': explode source '{}' is missing",
                            name, source
                        ))
                    })?;
                    let items = value.as_list().ok_or_else(|| {
                        PipelineError::TypeMismatch(format!(
                            "{}: expected Array to explode, got {}",
                            source,
                            value.describe()
                        ))
                    })?;
                    for item in items {
                        outputs.push(ns.delete([&source]).merge([(target.clone(), item.clone())]));
                    }
                }
                Ok(outputs)
            }) as OperationFuture
        }))
    }
}
