// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration Documents
//!
//! Typed models of the two YAML documents the engine understands: the pipe
//! document (stages, operations, timeouts) and the global document (debug
//! flag plus model records). Parsing is strict serde; unknown modes,
//! strategies, or capabilities fail at load time as `InvalidDocument`.
//!
//! This layer is parsing only. Turning documents into validated [`Pipe`]s
//! happens in the builder, and nothing here discovers files or operation
//! implementations on its own.
//!
//! ## Pipe Document Shape
//!
//! ```yaml
//! name: article
//! timeout: 30
//! stages:
//!   - name: enrich
//!     mode: merge
//!     merge_strategy: disjoint
//!     operations:
//!       - type: link
//!         options: { copy: { from: body, to: draft } }
//! ```
//!
//! ## Global Document Shape
//!
//! ```yaml
//! debug: true
//! models:
//!   writer:
//!     provider: acme
//!     model: acme-large-1
//!     capabilities: [text_to_text]
//!     options: { api_key: "${ACME_KEY}" }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use dataflow_pipeline_domain::{ExecutionMode, MergeStrategy, PipelineError, Value};

/// One operation entry of a stage document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationDocument {
    /// Operation id resolved against the operation registry
    #[serde(rename = "type")]
    pub operation_type: String,
    /// Model name resolved against the model registry
    #[serde(default)]
    pub model: Option<String>,
    /// Operation timeout in seconds
    #[serde(default)]
    pub timeout: Option<f64>,
    /// Operation-specific options
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

/// One stage entry of a pipe document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageDocument {
    pub name: String,
    pub mode: ExecutionMode,
    #[serde(default = "default_merge_strategy")]
    pub merge_strategy: MergeStrategy,
    /// Stage timeout in seconds
    #[serde(default)]
    pub timeout: Option<f64>,
    pub operations: Vec<OperationDocument>,
}

fn default_merge_strategy() -> MergeStrategy {
    MergeStrategy::LastIn
}

/// A whole pipe document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipeDocument {
    pub name: String,
    /// Pipe timeout in seconds
    #[serde(default)]
    pub timeout: Option<f64>,
    pub stages: Vec<StageDocument>,
}

impl PipeDocument {
    /// Parses a pipe document from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PipelineError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| PipelineError::InvalidDocument(format!("Pipe document failed to parse: {}", e)))
    }

    /// Reads and parses a pipe document from a file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }
}

/// One model entry of the global document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDocument {
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub options: BTreeMap<String, Value>,
}

/// The global document: process-level flags plus model records.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalDocument {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub models: BTreeMap<String, ModelDocument>,
}

impl GlobalDocument {
    /// Parses a global document from YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PipelineError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| PipelineError::InvalidDocument(format!("Global document failed to parse: {}", e)))
    }

    /// Reads and parses a global document from a file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }
}

/// Converts a document timeout in seconds into a duration.
///
/// # Errors
///
/// Returns `InvalidDocument` for negative or non-finite values.
pub fn timeout_duration(seconds: Option<f64>, context: &str) -> Result<Option<Duration>, PipelineError> {
    match seconds {
        None => Ok(None),
        Some(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(Some(Duration::from_secs_f64(seconds))),
        Some(seconds) => Err(PipelineError::InvalidDocument(format!(
            "{} has an invalid timeout: {}",
            context, seconds
        ))),
    }
}
