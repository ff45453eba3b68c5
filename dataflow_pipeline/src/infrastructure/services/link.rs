// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Link Operation
//!
//! Field plumbing: copy a field, move (rename) a field, set literal
//! values, delete fields — any combination in one operation. Link is the
//! canonical dynamic-declaration operation: its set types are computed
//! from the prefix schema, so a rename preserves the source field's
//! declared type instead of degrading it to "any".

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use dataflow_pipeline_domain::services::operation::{
    FieldContract, Operation, OperationCallable, OperationFuture, PrefixSchema,
};
use dataflow_pipeline_domain::{FieldName, PipelineError, TypeDescriptor, Value};

/// Copy/move/set/delete plumbing over each input namespace.
#[derive(Debug, Clone)]
pub struct LinkOperation {
    name: String,
    copies: Vec<(FieldName, FieldName)>,
    moves: Vec<(FieldName, FieldName)>,
    assignments: BTreeMap<FieldName, Value>,
    removals: Vec<FieldName>,
    timeout: Option<Duration>,
}

impl LinkOperation {
    /// Creates an empty link operation
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            copies: Vec::new(),
            moves: Vec::new(),
            assignments: BTreeMap::new(),
            removals: Vec::new(),
            timeout: None,
        }
    }

    /// Adds a field copy
    pub fn copy(mut self, from: FieldName, to: FieldName) -> Self {
        self.copies.push((from, to));
        self
    }

    /// Adds a field move: the value lands under `to` and `from` is deleted
    pub fn rename(mut self, from: FieldName, to: FieldName) -> Self {
        self.moves.push((from, to));
        self
    }

    /// Adds a literal assignment
    pub fn assign(mut self, field: FieldName, value: Value) -> Self {
        self.assignments.insert(field, value);
        self
    }

    /// Adds a field deletion
    pub fn remove(mut self, field: FieldName) -> Self {
        self.removals.push(field);
        self
    }

    /// Sets the operation timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks whether the operation does nothing
    pub fn is_empty(&self) -> bool {
        self.copies.is_empty() && self.moves.is_empty() && self.assignments.is_empty() && self.removals.is_empty()
    }

    // Deletes are move sources plus explicit removals, minus anything this
    // operation also sets (a swap must not delete its own target).
    fn delete_set(&self) -> Vec<FieldName> {
        let set_targets: BTreeSet<&FieldName> = self
            .copies
            .iter()
            .map(|(_, to)| to)
            .chain(self.moves.iter().map(|(_, to)| to))
            .chain(self.assignments.keys())
            .collect();

        let mut deletes = Vec::new();
        for name in self.moves.iter().map(|(from, _)| from).chain(self.removals.iter()) {
            if !set_targets.contains(name) && !deletes.contains(name) {
                deletes.push(name.clone());
            }
        }
        deletes
    }
}

impl Operation for LinkOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn declared_reads(&self, prefix: &PrefixSchema) -> BTreeMap<FieldName, FieldContract> {
        self.copies
            .iter()
            .chain(self.moves.iter())
            .map(|(from, _)| {
                (
                    from.clone(),
                    FieldContract {
                        descriptor: prefix.descriptor_of(from).cloned(),
                        optional: false,
                    },
                )
            })
            .collect()
    }

    fn declared_sets(&self, prefix: &PrefixSchema) -> BTreeMap<FieldName, FieldContract> {
        let mut sets: BTreeMap<FieldName, FieldContract> = self
            .copies
            .iter()
            .chain(self.moves.iter())
            .map(|(from, to)| {
                (
                    to.clone(),
                    FieldContract {
                        descriptor: prefix.descriptor_of(from).cloned(),
                        optional: false,
                    },
                )
            })
            .collect();
        for (field_name, value) in &self.assignments {
            sets.insert(
                field_name.clone(),
                FieldContract {
                    descriptor: TypeDescriptor::of_value(value),
                    optional: false,
                },
            );
        }
        sets
    }

    fn declared_deletes(&self, _prefix: &PrefixSchema) -> Vec<FieldName> {
        self.delete_set()
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn create(&self) -> Result<OperationCallable, PipelineError> {
        let sources: Vec<(FieldName, FieldName)> = self.copies.iter().chain(self.moves.iter()).cloned().collect();
        let assignments = self.assignments.clone();
        let deletes = self.delete_set();
        let name = self.name.clone();

        Ok(Arc::new(move |inputs| {
            let sources = sources.clone();
            let assignments = assignments.clone();
            let deletes = deletes.clone();
            let name = name.clone();
            Box::pin(async move {
                let mut outputs = Vec::with_capacity(inputs.len());
                for ns in &inputs {
                    let mut delta: Vec<(FieldName, Value)> = Vec::with_capacity(sources.len() + assignments.len());
                    for (from, to) in &sources {
                        let value = ns.get(from).cloned().ok_or_else(|| {
                            PipelineError::PropertyNotFound(format!(
                                "Operation '{}': link source '{}' is missing",
                                name, from
                            ))
                        })?;
                        delta.push((to.clone(), value));
                    }
                    for (field_name, value) in &assignments {
                        delta.push((field_name.clone(), value.clone()));
                    }
                    outputs.push(ns.merge(delta).delete(deletes.iter()));
                }
                Ok(outputs)
            }) as OperationFuture
        }))
    }
}
