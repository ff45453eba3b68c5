// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Hierarchical Time Budget
//!
//! Deadline arithmetic for the nested timeout model. A budget is an
//! absolute deadline plus the label of whichever component imposed it. Each
//! nesting level clamps the budget it received:
//!
//! ```text
//! pipe budget      = unbounded        clamped by the pipe timeout
//! stage budget     = pipe budget      clamped by the stage timeout
//! operation budget = stage budget     clamped by the operation timeout
//! ```
//!
//! Clamping keeps whichever deadline is earlier, so the effective timeout
//! at any level is `min` of every enclosing timeout, computed against
//! *remaining* time rather than configured time. When a guard fires, the
//! raised `Timeout` cites the owner of the binding deadline — a pipe-bound
//! operation timeout names the pipe, which is what an operator needs to
//! see.
//!
//! Deadlines are absolute `Instant`s: time spent queued for a worker
//! permit consumes budget exactly like time spent executing.

use std::future::Future;
use std::time::{Duration, Instant};

use dataflow_pipeline_domain::PipelineError;

/// An absolute deadline with owner attribution.
#[derive(Debug, Clone)]
pub struct TimeBudget {
    deadline: Option<Instant>,
    owner: Option<String>,
    limit: Option<Duration>,
}

impl TimeBudget {
    /// Creates a budget with no deadline
    pub fn unbounded() -> Self {
        Self {
            deadline: None,
            owner: None,
            limit: None,
        }
    }

    /// Returns this budget clamped by an optional timeout owned by
    /// `owner`.
    ///
    /// The result keeps whichever deadline is earlier; owner attribution
    /// follows the binding deadline. A `None` timeout leaves the budget
    /// unchanged.
    pub fn clamp(&self, timeout: Option<Duration>, owner: &str) -> Self {
        let Some(timeout) = timeout else {
            return self.clone();
        };
        let candidate = Instant::now() + timeout;
        match self.deadline {
            Some(existing) if existing <= candidate => self.clone(),
            _ => Self {
                deadline: Some(candidate),
                owner: Some(owner.to_string()),
                limit: Some(timeout),
            },
        }
    }

    /// Gets the remaining time, `None` when unbounded.
    ///
    /// An exhausted budget reports `Some(Duration::ZERO)`.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline.map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Checks whether the deadline has already passed
    pub fn is_exhausted(&self) -> bool {
        matches!(self.remaining(), Some(remaining) if remaining.is_zero())
    }

    /// Gets the label of the component owning the binding deadline
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Builds the timeout error this budget raises when it fires
    pub fn timeout_error(&self) -> PipelineError {
        let owner = self.owner.as_deref().unwrap_or("execution");
        match self.limit {
            Some(limit) => PipelineError::Timeout(format!(
                "{} timed out after {:.3}s",
                owner,
                limit.as_secs_f64()
            )),
            None => PipelineError::Timeout(format!("{} timed out", owner)),
        }
    }

    /// Runs a future under this budget.
    ///
    /// Unbounded budgets run the future directly. Bounded budgets race it
    /// against the remaining time; on expiry the future is dropped — any
    /// value a late completion would have produced is discarded — and the
    /// owner-attributed `Timeout` is raised.
    ///
    /// Enforcement happens at the await boundary: a callable that blocks
    /// its worker thread in synchronous code is only observed once it
    /// yields, so the timeout may fire late for such operations.
    pub async fn guard<T>(
        &self,
        future: impl Future<Output = Result<T, PipelineError>>,
    ) -> Result<T, PipelineError> {
        match self.remaining() {
            None => future.await,
            Some(remaining) => match tokio::time::timeout(remaining, future).await {
                Ok(result) => result,
                Err(_elapsed) => Err(self.timeout_error()),
            },
        }
    }
}
