// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Collapse Operation
//!
//! N→1 reduction: gathers one field's value from every input namespace,
//! reduces the values with the chosen collapse mode, and produces a single
//! namespace — the right-biased merge of all inputs with the target field
//! set to the reduction. When the target differs from the source, the
//! source field is deleted from the result.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use dataflow_pipeline_domain::services::operation::{
    FieldContract, Operation, OperationCallable, OperationFuture, PrefixSchema,
};
use dataflow_pipeline_domain::{FieldName, Namespace, PipelineError, TypeDescriptor, Value};

/// How collapse reduces the gathered values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapseMode {
    /// Gather every value into an array, in input order
    Collect,
    /// Keep the first value
    First,
    /// Keep the last value
    Last,
    /// Concatenate text values
    Concat,
}

impl std::fmt::Display for CollapseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollapseMode::Collect => write!(f, "collect"),
            CollapseMode::First => write!(f, "first"),
            CollapseMode::Last => write!(f, "last"),
            CollapseMode::Concat => write!(f, "concat"),
        }
    }
}

impl std::str::FromStr for CollapseMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "collect" => Ok(CollapseMode::Collect),
            "first" => Ok(CollapseMode::First),
            "last" => Ok(CollapseMode::Last),
            "concat" => Ok(CollapseMode::Concat),
            other => Err(PipelineError::InvalidDocument(format!(
                "Unknown collapse strategy: {}",
                other
            ))),
        }
    }
}

/// Reduces a field across all input namespaces into one output namespace.
#[derive(Debug, Clone)]
pub struct CollapseOperation {
    name: String,
    source: FieldName,
    target: FieldName,
    mode: CollapseMode,
    timeout: Option<Duration>,
}

impl CollapseOperation {
    /// Creates a collapse of `source` into `target` with the given mode
    pub fn new(name: impl Into<String>, source: FieldName, target: FieldName, mode: CollapseMode) -> Self {
        Self {
            name: name.into(),
            source,
            target,
            mode,
            timeout: None,
        }
    }

    /// Sets the operation timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Operation for CollapseOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn declared_reads(&self, prefix: &PrefixSchema) -> BTreeMap<FieldName, FieldContract> {
        [(
            self.source.clone(),
            FieldContract {
                descriptor: prefix.descriptor_of(&self.source).cloned(),
                optional: false,
            },
        )]
        .into()
    }

    fn declared_sets(&self, prefix: &PrefixSchema) -> BTreeMap<FieldName, FieldContract> {
        let element = prefix.descriptor_of(&self.source).cloned();
        let descriptor = match self.mode {
            CollapseMode::Collect => Some(TypeDescriptor::array(element.unwrap_or(TypeDescriptor::Any))),
            CollapseMode::First | CollapseMode::Last => element,
            CollapseMode::Concat => Some(TypeDescriptor::text()),
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
        let mode = self.mode;

        Ok(Arc::new(move |inputs: Vec<Namespace>| {
            let name = name.clone();
            let source = source.clone();
            let target = target.clone();
            Box::pin(async move {
                if inputs.is_empty() {
                    return Ok(Vec::new());
                }

                let mut values = Vec::with_capacity(inputs.len());
                for ns in &inputs {
                    let value = ns.get(&source).cloned().ok_or_else(|| {
                        PipelineError::PropertyNotFound(format!(
                            "Operation '{}': collapse source '{}' is missing",
                            name, source
                        ))
                    })?;
                    values.push(value);
                }

                let reduced = match mode {
                    CollapseMode::Collect => Value::List(values),
                    CollapseMode::First => match values.first() {
                        Some(first) => first.clone(),
                        None => Value::Null,
                    },
                    CollapseMode::Last => match values.last() {
                        Some(last) => last.clone(),
                        None => Value::Null,
                    },
                    CollapseMode::Concat => {
                        let mut joined = String::new();
                        for value in &values {
                            let text = value.as_text().ok_or_else(|| {
                                PipelineError::TypeMismatch(format!(
                                    "{}: expected String to concatenate, got {}",
                                    source,
                                    value.describe()
                                ))
                            })?;
                            joined.push_str(text);
                        }
                        Value::text(joined)
                    }
                };

                let base = Namespace::merge_all(&inputs);
                let mut out = base.merge([(target.clone(), reduced)]);
                if source != target {
                    out = out.delete([&source]);
                }
                Ok(vec![out])
            }) as OperationFuture
        }))
    }
}
