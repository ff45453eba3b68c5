// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Lexicographically sortable identity for a single pipe invocation,
//! stamped on trace spans so concurrent invocations stay distinguishable
//! in logs.

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique, time-ordered id for one pipe invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(Ulid);

impl ExecutionId {
    /// Creates a fresh invocation id
    pub fn new() -> Self {
        ExecutionId(Ulid::new())
    }

    /// Gets the underlying ulid
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for ExecutionId {
    fn default() -> Self {
        ExecutionId::new()
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
