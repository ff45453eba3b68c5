// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Provider Adapter Registry
//!
//! The engine never talks to a model provider itself; it exposes a
//! capability-uniform adapter interface and a registry keyed by provider
//! id. Operations that need a model resolve their record's provider here
//! and speak the three-method surface — `call`, `extract_text`,
//! `extract_image` — regardless of which provider sits behind it.
//!
//! Provider ids are normalized to be hyphen/underscore- and
//! case-insensitive: `"Acme-AI"` and `"acme_ai"` address the same adapter.
//!
//! Raw responses travel as [`Value`] so the registry stays SDK-agnostic;
//! each adapter knows how to dig its own text or image payloads back out.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use dataflow_pipeline_domain::{MediaValue, ModelRecord, PipelineError, Value};

/// Canonical form of a provider id: lowercase with underscores.
pub fn normalize_provider_id(id: &str) -> String {
    id.trim().to_lowercase().replace('-', "_")
}

/// Capability-uniform interface onto one model provider.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Performs one model call and returns the provider's raw response.
    async fn call(
        &self,
        prompt: &str,
        model: &ModelRecord,
        images: &[MediaValue],
        json_mode: bool,
    ) -> Result<Value, PipelineError>;

    /// Extracts the text payload from a raw response
    fn extract_text(&self, raw: &Value) -> Result<String, PipelineError>;

    /// Extracts the image payload from a raw response
    fn extract_image(&self, raw: &Value) -> Result<MediaValue, PipelineError>;
}

/// Registry mapping normalized provider ids to adapter implementations.
#[derive(Default)]
pub struct ProviderAdapters {
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
}

impl ProviderAdapters {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under a provider id (normalized)
    pub fn register(&mut self, provider_id: &str, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(normalize_provider_id(provider_id), adapter);
    }

    /// Resolves an adapter by provider id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` naming the known providers when the
    /// lookup fails.
    pub fn get(&self, provider_id: &str) -> Result<Arc<dyn ProviderAdapter>, PipelineError> {
        let normalized = normalize_provider_id(provider_id);
        self.adapters.get(&normalized).cloned().ok_or_else(|| {
            let mut known: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
            known.sort_unstable();
            PipelineError::InvalidConfiguration(format!(
                "No adapter registered for provider '{}'. Known providers: {:?}",
                provider_id, known
            ))
        })
    }

    /// Resolves the adapter for a model record's provider
    pub fn for_model(&self, model: &ModelRecord) -> Result<Arc<dyn ProviderAdapter>, PipelineError> {
        self.get(model.provider())
    }

    /// Checks whether a provider id is registered
    pub fn contains(&self, provider_id: &str) -> bool {
        self.adapters.contains_key(&normalize_provider_id(provider_id))
    }
}

/// Adapter that answers every call with a fixed text payload.
///
/// Exists for tests and wiring demos; the response shape mimics a minimal
/// provider envelope (`{text: …, model: …}`).
#[derive(Debug, Clone)]
pub struct StaticResponseAdapter {
    text: String,
}

impl StaticResponseAdapter {
    /// Creates an adapter replying with the given text
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl ProviderAdapter for StaticResponseAdapter {
    async fn call(
        &self,
        _prompt: &str,
        model: &ModelRecord,
        _images: &[MediaValue],
        _json_mode: bool,
    ) -> Result<Value, PipelineError> {
        let mut envelope = BTreeMap::new();
        envelope.insert("text".to_string(), Value::text(self.text.clone()));
        envelope.insert("model".to_string(), Value::text(model.model_id()));
        Ok(Value::Map(envelope))
    }

    fn extract_text(&self, raw: &Value) -> Result<String, PipelineError> {
        raw.as_map()
            .and_then(|map| map.get("text"))
            .and_then(|value| value.as_text())
            .map(str::to_string)
            .ok_or_else(|| PipelineError::SerializationError("response has no text payload".to_string()))
    }

    fn extract_image(&self, _raw: &Value) -> Result<MediaValue, PipelineError> {
        Err(PipelineError::SerializationError(
            "static responses carry no image payload".to_string(),
        ))
    }
}
