// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Application services coordinating domain entities with the runtime
//! infrastructure.

pub mod pipe_runner;

pub use pipe_runner::{CallOptions, PipeRunner};
