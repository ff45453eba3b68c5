// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Layer
//!
//! Concrete machinery behind the domain contracts: the execution runtime,
//! observability implementations, provider adapters, configuration
//! loading, the built-in dataflow operations, and logging bootstrap.

pub mod adapters;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod runtime;
pub mod services;
