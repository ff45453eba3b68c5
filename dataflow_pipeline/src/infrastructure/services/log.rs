// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Log Operation
//!
//! Pass-through observation point: emits a structured log line per input
//! namespace and returns the inputs untouched. Optionally restricted to a
//! set of fields, all declared as optional reads so a logged field may be
//! absent without failing the contract.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use dataflow_pipeline_domain::services::operation::{
    Operation, OperationCallable, OperationContract, OperationFuture,
};
use dataflow_pipeline_domain::{FieldName, Namespace, PipelineError};

const LOG_PREVIEW_LEN: usize = 120;

/// Logs namespaces as they pass through a stage.
#[derive(Debug, Clone)]
pub struct LogOperation {
    name: String,
    label: Option<String>,
    fields: Option<Vec<FieldName>>,
    timeout: Option<Duration>,
}

impl LogOperation {
    /// Creates a log operation previewing whole namespaces
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            fields: None,
            timeout: None,
        }
    }

    /// Sets the label rendered with every line
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Restricts the preview to specific fields
    pub fn with_fields(mut self, fields: Vec<FieldName>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Sets the operation timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn render(fields: &Option<Vec<FieldName>>, ns: &Namespace) -> String {
        match fields {
            None => ns.preview(LOG_PREVIEW_LEN),
            Some(names) => {
                let parts: Vec<String> = names
                    .iter()
                    .filter_map(|name| ns.get(name).map(|value| format!("{}: {}", name, value.describe())))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
        }
    }
}

impl Operation for LogOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn contract(&self) -> OperationContract {
        let mut contract = OperationContract::new();
        if let Some(fields) = &self.fields {
            for name in fields {
                contract = contract.reads_optional(name.as_str(), None);
            }
        }
        contract
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn create(&self) -> Result<OperationCallable, PipelineError> {
        let label = self.label.clone().unwrap_or_else(|| self.name.clone());
        let fields = self.fields.clone();

        Ok(Arc::new(move |inputs: Vec<Namespace>| {
            let label = label.clone();
            let fields = fields.clone();
            Box::pin(async move {
                for (index, ns) in inputs.iter().enumerate() {
                    info!(
                        target: "dataflow_pipeline::log",
                        label = %label,
                        index,
                        "{}",
                        LogOperation::render(&fields, ns)
                    );
                }
                Ok(inputs)
            }) as OperationFuture
        }))
    }
}
