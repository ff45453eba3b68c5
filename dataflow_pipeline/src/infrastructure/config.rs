// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Configuration Infrastructure
//!
//! The document-to-pipe path: typed YAML document models, secret token
//! resolution, and the registry-driven builder producing validated pipes.

pub mod builder;
pub mod document;
pub mod secrets;

pub use builder::{OperationFactory, OperationRegistry, OperationSpec, PipeBuilder, PipeCatalog};
pub use document::{timeout_duration, GlobalDocument, ModelDocument, OperationDocument, PipeDocument, StageDocument};
pub use secrets::{resolve_options, resolve_token, resolve_value, SecretResolver};
