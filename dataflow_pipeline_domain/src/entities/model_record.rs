// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Model Records and Registry
//!
//! Named model records with a declared capability set, plus the registry
//! that resolves model names during pipe construction. Records are
//! immutable after construction and freely sharable between concurrent
//! pipe invocations; the registry is an explicit context object rather
//! than process-global state, so tests construct isolated instances.
//!
//! The core never calls a model. Records exist so that operations
//! declaring a required capability can be proven compatible at load time,
//! and so that provider adapters receive the identifier and options they
//! need.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::value_objects::{ModelCapability, Value};

/// Immutable named model description.
///
/// `capabilities` is validated against the fixed vocabulary by
/// construction (the type makes invalid members unrepresentable);
/// `options` carries provider-specific settings such as resolved API keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecord {
    name: String,
    provider: String,
    model_id: String,
    capabilities: BTreeSet<ModelCapability>,
    options: BTreeMap<String, Value>,
}

impl ModelRecord {
    /// Creates a model record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when the name, provider, or model
    /// identifier is empty.
    pub fn new(
        name: impl Into<String>,
        provider: impl Into<String>,
        model_id: impl Into<String>,
        capabilities: impl IntoIterator<Item = ModelCapability>,
        options: BTreeMap<String, Value>,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        let provider = provider.into();
        let model_id = model_id.into();

        if name.trim().is_empty() {
            return Err(PipelineError::InvalidConfiguration(
                "Model name cannot be empty".to_string(),
            ));
        }
        if provider.trim().is_empty() {
            return Err(PipelineError::InvalidConfiguration(format!(
                "Model '{}' has an empty provider",
                name
            )));
        }
        if model_id.trim().is_empty() {
            return Err(PipelineError::InvalidConfiguration(format!(
                "Model '{}' has an empty model identifier",
                name
            )));
        }

        Ok(Self {
            name,
            provider,
            model_id,
            capabilities: capabilities.into_iter().collect(),
            options,
        })
    }

    /// Gets the registry name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the provider id
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Gets the provider-side model identifier
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Gets the declared capability set
    pub fn capabilities(&self) -> &BTreeSet<ModelCapability> {
        &self.capabilities
    }

    /// Checks whether the record declares a capability
    pub fn has_capability(&self, capability: ModelCapability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Gets the provider-specific options
    pub fn options(&self) -> &BTreeMap<String, Value> {
        &self.options
    }

    /// Gets one option value, if present
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }
}

/// Name-keyed collection of model records.
///
/// Registration replaces an existing record of the same name; lookups of
/// unknown names raise `MissingModel`.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    records: BTreeMap<String, ModelRecord>,
}

impl ModelRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a record under its own name
    pub fn register(&mut self, record: ModelRecord) {
        self.records.insert(record.name().to_string(), record);
    }

    /// Resolves a model by name.
    ///
    /// # Errors
    ///
    /// Returns `MissingModel` with the known names when the lookup fails.
    pub fn get(&self, name: &str) -> Result<&ModelRecord, PipelineError> {
        self.records.get(name).ok_or_else(|| {
            PipelineError::MissingModel(format!(
                "No model named '{}' is registered. Known models: {:?}",
                name,
                self.records.keys().collect::<Vec<_>>()
            ))
        })
    }

    /// Checks whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Iterates over registered records in name order
    pub fn iter(&self) -> impl Iterator<Item = &ModelRecord> {
        self.records.values()
    }

    /// Gets the number of registered records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Checks whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
