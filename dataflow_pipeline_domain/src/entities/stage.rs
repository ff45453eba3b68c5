// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Entity
//!
//! An ordered group of operations executed under a shared execution mode
//! and merge strategy. The stage entity is pure structure plus
//! construction-time validation; the engine's scheduler gives it runtime
//! behavior.
//!
//! ## Execution Modes
//!
//! - **merge**: fold the input list into one namespace, feed it to every
//!   operation, combine the results into a single output
//! - **fan_out**: feed each input element to every operation independently,
//!   preserving positional correspondence
//! - **batch**: feed the whole input list to every operation at once
//!
//! ## Merge Strategies
//!
//! The algebra for combining the outputs of parallel operations at one
//! output position:
//!
//! - **last_in**: later operations' keys overwrite earlier ones'
//! - **first_in**: earlier operations' keys win
//! - **collate**: conflicting values become a sequence of all distinct
//!   values in declared operation order; identical values collapse to one
//! - **disjoint**: no key overlap, validated at construction; the merge
//!   itself behaves like `last_in`
//!
//! "Later" and "earlier" are defined by declared operation position, never
//! by completion time, so pipes stay deterministic regardless of scheduler
//! timing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::services::operation::{FieldContract, Operation, PrefixSchema};
use crate::services::schema_propagator::check_parallel_sets;
use crate::value_objects::{FieldName, Namespace, Value};

/// How a stage applies its operations to the incoming namespace list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Fold inputs into one namespace, produce one output
    Merge,
    /// Apply every operation to each element independently
    FanOut,
    /// Hand the whole input list to every operation
    Batch,
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionMode::Merge => write!(f, "merge"),
            ExecutionMode::FanOut => write!(f, "fan_out"),
            ExecutionMode::Batch => write!(f, "batch"),
        }
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "merge" => Ok(ExecutionMode::Merge),
            "fan_out" => Ok(ExecutionMode::FanOut),
            "batch" => Ok(ExecutionMode::Batch),
            other => Err(PipelineError::InvalidConfiguration(format!(
                "Unknown execution mode: {}",
                other
            ))),
        }
    }
}

/// How the outputs of parallel operations combine at one position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Later operations overwrite earlier ones
    LastIn,
    /// Earlier operations win
    FirstIn,
    /// Conflicts become a sequence of distinct values in declared order
    Collate,
    /// No overlap, checked at construction; merge behaves like last_in
    Disjoint,
}

impl MergeStrategy {
    /// Combines per-operation output namespaces in declared operation
    /// order into a single namespace.
    pub fn combine(&self, contributions: &[Namespace]) -> Namespace {
        match self {
            MergeStrategy::LastIn | MergeStrategy::Disjoint => Namespace::merge_all(contributions),
            MergeStrategy::FirstIn => Namespace::merge_all(contributions.iter().rev()),
            MergeStrategy::Collate => {
                let mut collated: BTreeMap<FieldName, Vec<Value>> = BTreeMap::new();
                for ns in contributions {
                    for (name, value) in ns.iter() {
                        let values = collated.entry(name.clone()).or_default();
                        if !values.contains(value) {
                            values.push(value.clone());
                        }
                    }
                }
                collated
                    .into_iter()
                    .map(|(name, mut values)| {
                        let value = if values.len() == 1 {
                            values.remove(0)
                        } else {
                            Value::List(values)
                        };
                        (name, value)
                    })
                    .collect()
            }
        }
    }
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeStrategy::LastIn => write!(f, "last_in"),
            MergeStrategy::FirstIn => write!(f, "first_in"),
            MergeStrategy::Collate => write!(f, "collate"),
            MergeStrategy::Disjoint => write!(f, "disjoint"),
        }
    }
}

impl std::str::FromStr for MergeStrategy {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "last_in" => Ok(MergeStrategy::LastIn),
            "first_in" => Ok(MergeStrategy::FirstIn),
            "collate" => Ok(MergeStrategy::Collate),
            "disjoint" => Ok(MergeStrategy::Disjoint),
            other => Err(PipelineError::InvalidConfiguration(format!(
                "Unknown merge strategy: {}",
                other
            ))),
        }
    }
}

/// An ordered group of operations with a shared mode and strategy.
///
/// Construction validates the stage's own invariants: a non-empty name, at
/// least one operation, and — resolved against the empty prefix, re-checked
/// with real prefixes during pipe construction — parallel type consistency
/// and, for `disjoint`, pairwise-disjoint declared sets.
pub struct Stage {
    name: String,
    mode: ExecutionMode,
    operations: Vec<Arc<dyn Operation>>,
    merge_strategy: MergeStrategy,
    timeout: Option<Duration>,
}

impl Stage {
    /// Creates a validated stage.
    ///
    /// # Errors
    ///
    /// - `InvalidConfiguration` for an empty name or operation list
    /// - `TypeConflict` when two operations declare the same set field with
    ///   different types, or overlap at all under `disjoint`
    pub fn new(
        name: impl Into<String>,
        mode: ExecutionMode,
        operations: Vec<Arc<dyn Operation>>,
        merge_strategy: MergeStrategy,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PipelineError::InvalidConfiguration(
                "Stage name cannot be empty".to_string(),
            ));
        }
        if operations.is_empty() {
            return Err(PipelineError::InvalidConfiguration(format!(
                "Stage '{}' must have at least one operation",
                name
            )));
        }

        // Best-effort check against the empty prefix; dynamic declarations
        // are re-resolved with the real prefix during propagation.
        let empty = PrefixSchema::empty();
        let resolved: Vec<(String, BTreeMap<FieldName, FieldContract>)> = operations
            .iter()
            .map(|op| (op.name().to_string(), op.declared_sets(&empty)))
            .collect();
        check_parallel_sets(&name, merge_strategy, &resolved)?;

        Ok(Self {
            name,
            mode,
            operations,
            merge_strategy,
            timeout: None,
        })
    }

    /// Sets the stage timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Gets the stage name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the execution mode
    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Gets the operations in declared order
    pub fn operations(&self) -> &[Arc<dyn Operation>] {
        &self.operations
    }

    /// Gets the merge strategy
    pub fn merge_strategy(&self) -> MergeStrategy {
        self.merge_strategy
    }

    /// Gets the stage timeout, if set
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field(
                "operations",
                &self.operations.iter().map(|op| op.name()).collect::<Vec<_>>(),
            )
            .field("merge_strategy", &self.merge_strategy)
            .field("timeout", &self.timeout)
            .finish()
    }
}
