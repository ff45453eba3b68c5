// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the hierarchical error system for the dataflow
//! pipeline domain. Failures are organized into three taxonomy groups that
//! mirror when they can occur:
//!
//! ## Error Categories
//!
//! ### Configuration Errors (raised at construction)
//! - **InvalidConfiguration**: Malformed pipe, stage, or operation setup
//! - **InvalidDocument**: A configuration document that fails to parse or
//!   references an unknown vocabulary entry
//! - **MissingOperation**: An operation id with no registered factory
//! - **MissingModel**: A model name absent from the model registry, or an
//!   operation requiring a capability with no model assigned
//! - **MissingPipe**: A pipe name absent from the catalog
//! - **CapabilityMismatch**: An operation's required capability is not in
//!   its assigned model's capability set
//! - **IncompatibleStages**: A non-optional read that no earlier stage
//!   provides
//! - **TypeConflict**: Two parallel operations declare the same field with
//!   different types, or a `disjoint` stage with overlapping sets
//!
//! ### Execution Errors (raised at invocation)
//! - **Timeout**: A pipe, stage, or operation deadline fired
//! - **EmptyInput**: A pipe was invoked with an empty input mapping
//! - **OperationFailed**: An operation callable reported a failure of its
//!   own
//!
//! ### Contract Errors (raised by the executor)
//! - **PropertyNotFound**: A declared non-optional read or set is absent
//! - **TypeMismatch**: A value fails structural validation against its
//!   declared type
//! - **UnexpectedProperty**: An output grew a field the operation never
//!   declared, or kept a field it declared deleted
//! - **UnexpectedDeletion**: An output lost a field the operation never
//!   declared deleted
//! - **OutputCountMismatch**: An operation without `allows_count_change`
//!   returned a different number of namespaces than it received
//!
//! Contract errors are not recoverable by the core; an operation's error
//! handler is consulted only for failures raised by its own callable.
//!
//! User-visible messages carry the qualified operation/stage/pipe name and,
//! for contract errors, the offending field path.

use thiserror::Error;

/// Domain-specific errors for the dataflow pipeline system.
///
/// Each variant includes a descriptive message. Variants map one-to-one
/// onto the taxonomy documented at module level; [`PipelineError::category`]
/// returns the group a variant belongs to.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    // Configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Missing operation: {0}")]
    MissingOperation(String),

    #[error("Missing model: {0}")]
    MissingModel(String),

    #[error("Missing pipe: {0}")]
    MissingPipe(String),

    #[error("Capability mismatch: {0}")]
    CapabilityMismatch(String),

    #[error("Incompatible stages: {0}")]
    IncompatibleStages(String),

    #[error("Type conflict: {0}")]
    TypeConflict(String),

    // Execution
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    // Contract
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Unexpected property: {0}")]
    UnexpectedProperty(String),

    #[error("Unexpected deletion: {0}")]
    UnexpectedDeletion(String),

    #[error("Output count mismatch: {0}")]
    OutputCountMismatch(String),

    // Interop
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl PipelineError {
    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new document error
    pub fn invalid_document(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }

    /// Creates a new timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Creates a new operation failure error
    pub fn operation_failed(msg: impl Into<String>) -> Self {
        Self::OperationFailed(msg.into())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Checks if the error is a contract violation raised by the executor
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            PipelineError::PropertyNotFound(_)
                | PipelineError::TypeMismatch(_)
                | PipelineError::UnexpectedProperty(_)
                | PipelineError::UnexpectedDeletion(_)
                | PipelineError::OutputCountMismatch(_)
        )
    }

    /// Checks if the error is raised during construction rather than
    /// invocation
    pub fn is_configuration_error(&self) -> bool {
        self.category() == "configuration"
    }

    /// Checks if the error is a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, PipelineError::Timeout(_))
    }

    /// Gets the error category
    pub fn category(&self) -> &'static str {
        match self {
            PipelineError::InvalidConfiguration(_)
            | PipelineError::InvalidDocument(_)
            | PipelineError::MissingOperation(_)
            | PipelineError::MissingModel(_)
            | PipelineError::MissingPipe(_)
            | PipelineError::CapabilityMismatch(_)
            | PipelineError::IncompatibleStages(_)
            | PipelineError::TypeConflict(_) => "configuration",
            PipelineError::Timeout(_) | PipelineError::EmptyInput(_) | PipelineError::OperationFailed(_) => {
                "execution"
            }
            PipelineError::PropertyNotFound(_)
            | PipelineError::TypeMismatch(_)
            | PipelineError::UnexpectedProperty(_)
            | PipelineError::UnexpectedDeletion(_)
            | PipelineError::OutputCountMismatch(_) => "contract",
            PipelineError::IoError(_) | PipelineError::SerializationError(_) | PipelineError::InternalError(_) => {
                "internal"
            }
        }
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::SerializationError(err.to_string())
    }
}

// NOTE: YAML error conversion lives in the engine crate - serialization
// format is an infrastructure concern. The domain only needs JSON
// serialization for value interop.
