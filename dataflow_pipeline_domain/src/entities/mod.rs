// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Entities
//!
//! Objects with identity and construction-time invariants: stages, pipes,
//! and model records with their registry.

pub mod model_record;
pub mod pipe;
pub mod stage;

pub use model_record::{ModelRecord, ModelRegistry};
pub use pipe::Pipe;
pub use stage::{ExecutionMode, MergeStrategy, Stage};
