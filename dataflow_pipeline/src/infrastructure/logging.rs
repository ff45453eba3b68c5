// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Logging
//!
//! Structured logging bootstrap for embedders that do not install their
//! own subscriber. The engine itself only *emits* `tracing` events; this
//! module wires a formatted subscriber with env-filter support so those
//! events land somewhere during development and tests.
//!
//! `RUST_LOG` overrides the default filter as usual.

use tracing_subscriber::EnvFilter;

use dataflow_pipeline_domain::PipelineError;

/// Installs a formatted global subscriber with the given default filter.
///
/// # Errors
///
/// Returns `InvalidConfiguration` when the filter does not parse or a
/// global subscriber is already installed.
pub fn init_logging(default_filter: &str) -> Result<(), PipelineError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| PipelineError::InvalidConfiguration(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| PipelineError::InvalidConfiguration(format!("Logging already initialized: {}", e)))
}

/// Installs the default subscriber at `info` for the engine crates.
pub fn init_default_logging() -> Result<(), PipelineError> {
    init_logging("dataflow_pipeline=info,dataflow_pipeline_domain=info")
}
