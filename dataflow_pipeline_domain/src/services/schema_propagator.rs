// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Schema Propagation
//!
//! The construction-time flow analysis that makes pipes checkable before
//! anything runs. The propagator walks the stages left-to-right carrying a
//! prefix schema — "what is guaranteed present after stage k" — and at each
//! stage:
//!
//! 1. Resolves every operation's declared reads/sets/deletes against the
//!    current prefix, so dynamic declarations see real types.
//! 2. Verifies that every non-optional read is a key of the prefix
//!    (`IncompatibleStages` otherwise).
//! 3. Checks parallel type-consistency across the stage's declared sets
//!    and, for the `disjoint` strategy, pairwise-disjointness
//!    (`TypeConflict` otherwise).
//! 4. Advances the prefix: deletes are removed, sets are added, and reads
//!    of fields the prefix does not guarantee are added as optional
//!    flow-through entries — unless the stage itself deletes them.
//!
//! The first stage is special: its reads *define* the pipe input schema,
//! so they seed the prefix instead of being checked against it. The
//! resolved contracts are retained per stage; the executor enforces the
//! exact contracts the propagator proved.

use std::collections::{BTreeMap, BTreeSet};

use crate::entities::stage::{MergeStrategy, Stage};
use crate::error::PipelineError;
use crate::services::operation::{FieldContract, PrefixSchema};
use crate::value_objects::FieldName;

/// One operation's declarations, resolved against the prefix of its stage.
#[derive(Debug, Clone)]
pub struct ResolvedContract {
    /// Operation display name
    pub operation: String,
    pub reads: BTreeMap<FieldName, FieldContract>,
    pub sets: BTreeMap<FieldName, FieldContract>,
    pub deletes: Vec<FieldName>,
}

/// Flow analysis result for one stage.
#[derive(Debug, Clone)]
pub struct StageSchema {
    /// Prefix guaranteed before the stage runs
    pub prefix: PrefixSchema,
    /// Resolved contracts in declared operation order
    pub contracts: Vec<ResolvedContract>,
    /// Prefix guaranteed after the stage runs
    pub output: PrefixSchema,
}

/// Flow analysis result for a whole pipe.
#[derive(Debug, Clone)]
pub struct PipeSchema {
    /// End-to-end input schema (the first stage's declared reads)
    pub inputs: BTreeMap<FieldName, FieldContract>,
    /// End-to-end output schema (the last stage's declared sets)
    pub outputs: BTreeMap<FieldName, FieldContract>,
    /// Per-stage schemas in declared order
    pub stages: Vec<StageSchema>,
}

/// Stateless propagation service.
pub struct SchemaPropagator;

impl SchemaPropagator {
    /// Walks the stages and produces the pipe schema.
    ///
    /// # Errors
    ///
    /// - `IncompatibleStages` when a non-optional read of a later stage is
    ///   not guaranteed by the accumulated prefix
    /// - `TypeConflict` when parallel declared sets disagree on a field's
    ///   type, or overlap at all under the `disjoint` strategy
    pub fn propagate(stages: &[Stage]) -> Result<PipeSchema, PipelineError> {
        let mut stage_schemas: Vec<StageSchema> = Vec::with_capacity(stages.len());
        let mut prefix = PrefixSchema::empty();
        let mut inputs: BTreeMap<FieldName, FieldContract> = BTreeMap::new();

        for (index, stage) in stages.iter().enumerate() {
            let contracts: Vec<ResolvedContract> = stage
                .operations()
                .iter()
                .map(|op| ResolvedContract {
                    operation: op.name().to_string(),
                    reads: op.declared_reads(&prefix),
                    sets: op.declared_sets(&prefix),
                    deletes: op.declared_deletes(&prefix),
                })
                .collect();

            if index == 0 {
                // The first stage's reads define the pipe input schema.
                for contract in &contracts {
                    for (name, entry) in &contract.reads {
                        match inputs.get_mut(name) {
                            None => {
                                inputs.insert(name.clone(), entry.clone());
                            }
                            Some(existing) => {
                                if existing.descriptor.is_none() {
                                    existing.descriptor = entry.descriptor.clone();
                                }
                                if !entry.optional {
                                    existing.optional = false;
                                }
                            }
                        }
                    }
                }
                prefix = PrefixSchema::from_entries(inputs.clone());
            } else {
                for contract in &contracts {
                    for (name, entry) in &contract.reads {
                        if !entry.optional && !prefix.contains(name) {
                            return Err(PipelineError::IncompatibleStages(format!(
                                "Stage '{}': operation '{}' reads '{}' but no earlier stage provides it",
                                stage.name(),
                                contract.operation,
                                name
                            )));
                        }
                    }
                }
            }

            let named_sets: Vec<(String, BTreeMap<FieldName, FieldContract>)> = contracts
                .iter()
                .map(|contract| (contract.operation.clone(), contract.sets.clone()))
                .collect();
            check_parallel_sets(stage.name(), stage.merge_strategy(), &named_sets)?;

            let stage_prefix = prefix.clone();

            // Advance: minus deletes, plus sets, plus optional flow-through
            // reads the prefix never guaranteed.
            let mut next = prefix.clone();
            let deleted: BTreeSet<&FieldName> = contracts.iter().flat_map(|c| c.deletes.iter()).collect();
            for name in &deleted {
                next.remove(name);
            }
            for contract in &contracts {
                for (name, entry) in &contract.sets {
                    next.insert(name.clone(), entry.clone());
                }
            }
            for contract in &contracts {
                for (name, entry) in &contract.reads {
                    if !next.contains(name) && !deleted.contains(name) {
                        next.insert(name.clone(), FieldContract::optional(entry.descriptor.clone()));
                    }
                }
            }

            stage_schemas.push(StageSchema {
                prefix: stage_prefix,
                contracts,
                output: next.clone(),
            });
            prefix = next;
        }

        let outputs: BTreeMap<FieldName, FieldContract> = stage_schemas
            .last()
            .map(|schema| {
                schema
                    .contracts
                    .iter()
                    .flat_map(|contract| contract.sets.clone())
                    .collect()
            })
            .unwrap_or_default();

        Ok(PipeSchema {
            inputs,
            outputs,
            stages: stage_schemas,
        })
    }
}

/// Validates parallel declared sets within one stage: disjointness under
/// the `disjoint` strategy, identical declared types everywhere else
/// (`None` is a wildcard).
pub(crate) fn check_parallel_sets(
    stage_name: &str,
    strategy: MergeStrategy,
    ops: &[(String, BTreeMap<FieldName, FieldContract>)],
) -> Result<(), PipelineError> {
    let describe = |entry: &FieldContract| {
        entry
            .descriptor
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "any".to_string())
    };

    let mut seen: BTreeMap<&FieldName, (&str, &FieldContract)> = BTreeMap::new();
    for (op_name, sets) in ops {
        for (name, entry) in sets {
            match seen.get(name) {
                None => {
                    seen.insert(name, (op_name, entry));
                }
                Some((first_op, first_entry)) => {
                    if strategy == MergeStrategy::Disjoint {
                        return Err(PipelineError::TypeConflict(format!(
                            "Stage '{}' uses the disjoint strategy but operations '{}' and '{}' both set '{}'",
                            stage_name, first_op, op_name, name
                        )));
                    }
                    if !first_entry.type_consistent_with(entry) {
                        return Err(PipelineError::TypeConflict(format!(
                            "Stage '{}': operations '{}' and '{}' set '{}' with conflicting types {} vs {}",
                            stage_name,
                            first_op,
                            op_name,
                            name,
                            describe(first_entry),
                            describe(entry)
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}
