// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Layer
//!
//! Orchestration over the domain entities: the pipe runner that turns a
//! validated [`dataflow_pipeline_domain::Pipe`] plus an input namespace
//! into a single output namespace.

pub mod services;
