// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipe Entity
//!
//! An ordered sequence of stages forming an end-to-end transformation from
//! one input namespace to one output namespace. Construction is where the
//! pipe earns its guarantees:
//!
//! - at least one stage, and the last stage runs in `merge` mode so the
//!   pipe output is a single record
//! - the schema propagator proves every non-optional read satisfiable and
//!   every parallel set type-consistent
//! - every operation that requires a model capability is resolved against
//!   its assigned model record
//!
//! The propagation result is cached on the entity: the engine executes
//! against the exact resolved contracts construction proved, and the
//! `inputs`/`outputs` schemas are served without re-walking the stages.

use std::time::Duration;

use crate::entities::stage::{ExecutionMode, Stage};
use crate::error::PipelineError;
use crate::services::operation::FieldContract;
use crate::services::schema_propagator::{PipeSchema, SchemaPropagator};
use crate::services::type_validator::validate_value;
use crate::value_objects::{FieldName, Namespace};
use std::collections::BTreeMap;

/// A validated, schema-checked sequence of stages.
#[derive(Debug)]
pub struct Pipe {
    name: String,
    stages: Vec<Stage>,
    timeout: Option<Duration>,
    schema: PipeSchema,
}

impl Pipe {
    /// Creates a validated pipe.
    ///
    /// # Errors
    ///
    /// - `InvalidConfiguration` for an empty name, no stages, or a last
    ///   stage whose mode is not `merge`
    /// - `IncompatibleStages` / `TypeConflict` from schema propagation
    /// - `MissingModel` / `CapabilityMismatch` from capability resolution
    pub fn new(name: impl Into<String>, stages: Vec<Stage>) -> Result<Self, PipelineError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PipelineError::InvalidConfiguration(
                "Pipe name cannot be empty".to_string(),
            ));
        }
        if stages.is_empty() {
            return Err(PipelineError::InvalidConfiguration(format!(
                "Pipe '{}' must have at least one stage",
                name
            )));
        }
        let last = stages.last().expect("non-empty checked above");
        if last.mode() != ExecutionMode::Merge {
            return Err(PipelineError::InvalidConfiguration(format!(
                "Pipe '{}': last stage '{}' must use merge mode so the pipe yields a single record, got {}",
                name,
                last.name(),
                last.mode()
            )));
        }

        for stage in &stages {
            for op in stage.operations() {
                let Some(capability) = op.required_capability() else {
                    continue;
                };
                match op.assigned_model() {
                    None => {
                        return Err(PipelineError::MissingModel(format!(
                            "Operation '{}' in stage '{}' of pipe '{}' requires capability '{}' but has no model assigned",
                            op.name(),
                            stage.name(),
                            name,
                            capability
                        )));
                    }
                    Some(model) if !model.has_capability(capability) => {
                        return Err(PipelineError::CapabilityMismatch(format!(
                            "Operation '{}' in stage '{}' of pipe '{}' requires capability '{}' but model '{}' provides {:?}",
                            op.name(),
                            stage.name(),
                            name,
                            capability,
                            model.name(),
                            model
                                .capabilities()
                                .iter()
                                .map(|c| c.to_string())
                                .collect::<Vec<_>>()
                        )));
                    }
                    Some(_) => {}
                }
            }
        }

        let schema = SchemaPropagator::propagate(&stages)?;

        Ok(Self {
            name,
            stages,
            timeout: None,
            schema,
        })
    }

    /// Sets the pipe timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Gets the pipe name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the stages in declared order
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Gets the pipe timeout, if set
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Gets the cached propagation result
    pub fn schema(&self) -> &PipeSchema {
        &self.schema
    }

    /// Gets the end-to-end input schema (first-stage declared reads)
    pub fn inputs(&self) -> &BTreeMap<FieldName, FieldContract> {
        &self.schema.inputs
    }

    /// Gets the end-to-end output schema (last-stage declared sets)
    pub fn outputs(&self) -> &BTreeMap<FieldName, FieldContract> {
        &self.schema.outputs
    }

    /// Validates an invocation input against the pipe's input schema.
    ///
    /// Extra fields beyond the declared reads are allowed and pass through
    /// the pipe untouched.
    ///
    /// # Errors
    ///
    /// - `EmptyInput` for an empty namespace
    /// - `PropertyNotFound` for a missing non-optional input field
    /// - `TypeMismatch` when a present field fails structural validation
    pub fn validate_input(&self, input: &Namespace) -> Result<(), PipelineError> {
        if input.is_empty() {
            return Err(PipelineError::EmptyInput(format!(
                "Pipe '{}' was invoked with an empty input",
                self.name
            )));
        }

        for (name, entry) in &self.schema.inputs {
            match input.get(name) {
                None if entry.optional => {}
                None => {
                    return Err(PipelineError::PropertyNotFound(format!(
                        "Pipe '{}' input is missing required field '{}'",
                        self.name, name
                    )));
                }
                Some(value) => {
                    if entry.optional && value.is_null() {
                        continue;
                    }
                    if let Some(descriptor) = &entry.descriptor {
                        validate_value(value, descriptor, name.as_str())?;
                    }
                }
            }
        }
        Ok(())
    }
}
