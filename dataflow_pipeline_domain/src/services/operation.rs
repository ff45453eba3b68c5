// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Operation Contract Surface
//!
//! This module defines the unified trait that ALL pipeline operations
//! implement, whether built-in dataflow shapes (link, filter, collapse,
//! explode, log) or user-defined work units.
//!
//! ## Overview
//!
//! An operation is a factory: its contract queries describe what it reads,
//! sets, and deletes, and [`Operation::create`] produces a fresh callable
//! of signature `[Namespace] → [Namespace]` once per stage invocation. The
//! executor enforces the contract around every callable invocation; the
//! schema propagator consumes the same queries at construction time to
//! prove stage compatibility before anything runs.
//!
//! ## Declaration Strategies
//!
//! Two strategies produce the same query surface:
//!
//! - **Static declarations** (the default): implement
//!   [`Operation::contract`] and let the `declared_*` defaults serve the
//!   pre-registered field table regardless of the prefix schema.
//! - **Dynamic declarations**: override the `declared_*` queries to compute
//!   the schema from the prefix (a field-rename operation preserves the
//!   source field's declared type this way). Queries must be pure and
//!   idempotent; the propagator may evaluate them more than once.
//!
//! ## Error Handling and Shape
//!
//! Each operation carries an [`ErrorPolicy`] consulted by the executor when
//! the callable fails, an optional timeout, and an `allows_count_change`
//! flag. Operations without the flag must return exactly as many
//! namespaces as they received.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::entities::ModelRecord;
use crate::error::PipelineError;
use crate::value_objects::{field, FieldName, ModelCapability, Namespace, TypeDescriptor, Value};

/// One contract entry: the declared type (`None` means any value is
/// accepted) and whether the field may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldContract {
    pub descriptor: Option<TypeDescriptor>,
    pub optional: bool,
}

impl FieldContract {
    /// Required entry with a declared type
    pub fn typed(descriptor: TypeDescriptor) -> Self {
        Self {
            descriptor: Some(descriptor),
            optional: false,
        }
    }

    /// Required entry accepting any value
    pub fn any() -> Self {
        Self {
            descriptor: None,
            optional: false,
        }
    }

    /// Optional entry with or without a declared type
    pub fn optional(descriptor: Option<TypeDescriptor>) -> Self {
        Self {
            descriptor,
            optional: true,
        }
    }

    /// Parallel type-consistency check: `None` is a wildcard that matches
    /// anything, otherwise the declared types must be identical.
    pub fn type_consistent_with(&self, other: &FieldContract) -> bool {
        match (&self.descriptor, &other.descriptor) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

/// The accumulated knowledge, at a stage boundary, of which fields are
/// guaranteed present and their declared types.
///
/// Built left-to-right by the schema propagator and handed to the
/// `declared_*` queries so dynamic declarations can resolve against it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixSchema {
    entries: BTreeMap<FieldName, FieldContract>,
}

impl PrefixSchema {
    /// Creates an empty prefix
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a prefix from contract entries
    pub fn from_entries(entries: BTreeMap<FieldName, FieldContract>) -> Self {
        Self { entries }
    }

    /// Gets the entry for a field, if known
    pub fn get(&self, name: &FieldName) -> Option<&FieldContract> {
        self.entries.get(name)
    }

    /// Checks whether a field is known to the prefix
    pub fn contains(&self, name: &FieldName) -> bool {
        self.entries.contains_key(name)
    }

    /// Gets the declared type of a field, if the prefix knows one
    pub fn descriptor_of(&self, name: &FieldName) -> Option<&TypeDescriptor> {
        self.entries.get(name).and_then(|entry| entry.descriptor.as_ref())
    }

    /// Inserts or replaces an entry
    pub fn insert(&mut self, name: FieldName, contract: FieldContract) {
        self.entries.insert(name, contract);
    }

    /// Removes an entry if present
    pub fn remove(&mut self, name: &FieldName) {
        self.entries.remove(name);
    }

    /// Iterates over entries in canonical key order
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &FieldContract)> {
        self.entries.iter()
    }

    /// Gets the underlying entry map
    pub fn entries(&self) -> &BTreeMap<FieldName, FieldContract> {
        &self.entries
    }

    /// Gets the number of known fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks whether the prefix is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Static declaration table of an operation: reads, sets, and deletes.
///
/// Built fluently; the chained methods take literal field names.
///
/// # Examples
///
/// ```
/// use dataflow_pipeline_domain::services::operation::OperationContract;
/// use dataflow_pipeline_domain::value_objects::TypeDescriptor;
///
/// let contract = OperationContract::new()
///     .reads("body", TypeDescriptor::text())
///     .reads_optional("style", Some(TypeDescriptor::text()))
///     .sets("summary", TypeDescriptor::text())
///     .deletes("scratch");
///
/// assert_eq!(contract.reads.len(), 2);
/// assert_eq!(contract.deletes.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct OperationContract {
    pub reads: BTreeMap<FieldName, FieldContract>,
    pub sets: BTreeMap<FieldName, FieldContract>,
    pub deletes: Vec<FieldName>,
}

impl OperationContract {
    /// Creates an empty contract
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a required typed read
    pub fn reads(mut self, name: &str, descriptor: TypeDescriptor) -> Self {
        self.reads.insert(field(name), FieldContract::typed(descriptor));
        self
    }

    /// Declares a required read accepting any value
    pub fn reads_any(mut self, name: &str) -> Self {
        self.reads.insert(field(name), FieldContract::any());
        self
    }

    /// Declares an optional read
    pub fn reads_optional(mut self, name: &str, descriptor: Option<TypeDescriptor>) -> Self {
        self.reads.insert(field(name), FieldContract::optional(descriptor));
        self
    }

    /// Declares a required typed set
    pub fn sets(mut self, name: &str, descriptor: TypeDescriptor) -> Self {
        self.sets.insert(field(name), FieldContract::typed(descriptor));
        self
    }

    /// Declares a required set accepting any value
    pub fn sets_any(mut self, name: &str) -> Self {
        self.sets.insert(field(name), FieldContract::any());
        self
    }

    /// Declares an optional set
    pub fn sets_optional(mut self, name: &str, descriptor: Option<TypeDescriptor>) -> Self {
        self.sets.insert(field(name), FieldContract::optional(descriptor));
        self
    }

    /// Declares a deleted field
    pub fn deletes(mut self, name: &str) -> Self {
        self.deletes.push(field(name));
        self
    }
}

/// Policy consulted by the executor when an operation callable fails.
///
/// A suppressed failure turns into an empty output list and the operation
/// reports as completed. Timeouts are never suppressible.
#[derive(Clone, Default)]
pub enum ErrorPolicy {
    /// Re-raise the failure (the default)
    #[default]
    Propagate,
    /// Suppress every failure
    Ignore,
    /// Suppress failures the predicate approves
    IgnoreIf(Arc<dyn Fn(&PipelineError) -> bool + Send + Sync>),
}

impl ErrorPolicy {
    /// Checks whether the policy suppresses the given failure
    pub fn suppresses(&self, error: &PipelineError) -> bool {
        match self {
            ErrorPolicy::Propagate => false,
            ErrorPolicy::Ignore => true,
            ErrorPolicy::IgnoreIf(predicate) => predicate(error),
        }
    }
}

impl std::fmt::Debug for ErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorPolicy::Propagate => write!(f, "Propagate"),
            ErrorPolicy::Ignore => write!(f, "Ignore"),
            ErrorPolicy::IgnoreIf(_) => write!(f, "IgnoreIf(<predicate>)"),
        }
    }
}

/// Future returned by one callable invocation.
pub type OperationFuture = BoxFuture<'static, Result<Vec<Namespace>, PipelineError>>;

/// A fresh callable produced by [`Operation::create`] for one stage
/// invocation. The scheduler may invoke it several times within that
/// invocation (once per element in fan-out mode), so it must be reentrant.
pub type OperationCallable = Arc<dyn Fn(Vec<Namespace>) -> OperationFuture + Send + Sync>;

/// Display name used for operations that never declare one.
pub const ANONYMOUS_OPERATION: &str = "Anonymous Operation";

/// The unified operation trait.
///
/// See the module documentation for the two declaration strategies. The
/// `declared_*` defaults serve [`Operation::contract`]; dynamic operations
/// override them and may ignore `contract` entirely.
pub trait Operation: Send + Sync {
    /// Display name used in events and error messages
    fn name(&self) -> &str {
        ANONYMOUS_OPERATION
    }

    /// Static declaration table (the default strategy)
    fn contract(&self) -> OperationContract {
        OperationContract::default()
    }

    /// Fields the operation reads, resolved against the prefix
    fn declared_reads(&self, _prefix: &PrefixSchema) -> BTreeMap<FieldName, FieldContract> {
        self.contract().reads
    }

    /// Fields the operation sets, resolved against the prefix
    fn declared_sets(&self, _prefix: &PrefixSchema) -> BTreeMap<FieldName, FieldContract> {
        self.contract().sets
    }

    /// Fields the operation deletes, resolved against the prefix
    fn declared_deletes(&self, _prefix: &PrefixSchema) -> Vec<FieldName> {
        self.contract().deletes
    }

    /// Model capability the operation requires, if any
    fn required_capability(&self) -> Option<ModelCapability> {
        None
    }

    /// Model record assigned to the operation, if any
    fn assigned_model(&self) -> Option<&ModelRecord> {
        None
    }

    /// Failure policy consulted by the executor
    fn error_policy(&self) -> ErrorPolicy {
        ErrorPolicy::Propagate
    }

    /// Per-invocation timeout, if any
    fn timeout(&self) -> Option<Duration> {
        None
    }

    /// Whether the output list may differ in length from the input list
    fn allows_count_change(&self) -> bool {
        false
    }

    /// Produces a fresh callable for one stage invocation
    fn create(&self) -> Result<OperationCallable, PipelineError>;
}

type MapFn = Arc<dyn Fn(&Namespace) -> Result<BTreeMap<FieldName, Value>, PipelineError> + Send + Sync>;
type ApplyFn = Arc<dyn Fn(Vec<Namespace>) -> OperationFuture + Send + Sync>;

enum InlineBody {
    Map(MapFn),
    Apply(ApplyFn),
}

/// Closure-backed operation with statically declared contracts.
///
/// `InlineOperation` is the block-style declaration surface: the common
/// case wraps a per-namespace closure whose returned field delta is merged
/// onto the input and whose declared deletes are applied afterwards.
/// `apply` gives full asynchronous control over the whole
/// `[Namespace] → [Namespace]` signature instead.
///
/// # Examples
///
/// ```
/// use dataflow_pipeline_domain::services::operation::{InlineOperation, Operation};
/// use dataflow_pipeline_domain::value_objects::{field, Namespace, TypeDescriptor, Value};
///
/// let upcase = InlineOperation::builder("upcase")
///     .reads("text", TypeDescriptor::text())
///     .sets("shout", TypeDescriptor::text())
///     .map(|ns| {
///         let text = ns.get(&field("text")).and_then(|v| v.as_text()).unwrap_or_default();
///         Ok([(field("shout"), Value::text(text.to_uppercase()))].into())
///     });
///
/// let callable = upcase.create().unwrap();
/// let input = Namespace::from_pairs([("text", Value::text("hi"))]);
/// let output = futures::executor::block_on(callable(vec![input])).unwrap();
/// assert_eq!(output[0].get(&field("shout")), Some(&Value::text("HI")));
/// ```
pub struct InlineOperation {
    name: String,
    contract: OperationContract,
    allows_count_change: bool,
    error_policy: ErrorPolicy,
    timeout: Option<Duration>,
    required_capability: Option<ModelCapability>,
    model: Option<ModelRecord>,
    body: InlineBody,
}

impl InlineOperation {
    /// Starts a builder for a named inline operation
    pub fn builder(name: impl Into<String>) -> InlineOperationBuilder {
        InlineOperationBuilder {
            name: name.into(),
            contract: OperationContract::default(),
            allows_count_change: false,
            error_policy: ErrorPolicy::Propagate,
            timeout: None,
            required_capability: None,
            model: None,
        }
    }
}

impl Operation for InlineOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn contract(&self) -> OperationContract {
        self.contract.clone()
    }

    fn required_capability(&self) -> Option<ModelCapability> {
        self.required_capability
    }

    fn assigned_model(&self) -> Option<&ModelRecord> {
        self.model.as_ref()
    }

    fn error_policy(&self) -> ErrorPolicy {
        self.error_policy.clone()
    }

    fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn allows_count_change(&self) -> bool {
        self.allows_count_change
    }

    fn create(&self) -> Result<OperationCallable, PipelineError> {
        match &self.body {
            InlineBody::Map(map_fn) => {
                let map_fn = Arc::clone(map_fn);
                let deletes = self.contract.deletes.clone();
                Ok(Arc::new(move |inputs: Vec<Namespace>| {
                    let map_fn = Arc::clone(&map_fn);
                    let deletes = deletes.clone();
                    Box::pin(async move {
                        let mut outputs = Vec::with_capacity(inputs.len());
                        for ns in &inputs {
                            let delta = map_fn(ns)?;
                            outputs.push(ns.merge(delta).delete(deletes.iter()));
                        }
                        Ok(outputs)
                    }) as OperationFuture
                }))
            }
            InlineBody::Apply(apply_fn) => {
                let apply_fn = Arc::clone(apply_fn);
                Ok(Arc::new(move |inputs| apply_fn(inputs)))
            }
        }
    }
}

impl std::fmt::Debug for InlineOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InlineOperation")
            .field("name", &self.name)
            .field("contract", &self.contract)
            .field("allows_count_change", &self.allows_count_change)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Fluent builder for [`InlineOperation`]; finished by
/// [`InlineOperationBuilder::map`] or [`InlineOperationBuilder::apply`].
pub struct InlineOperationBuilder {
    name: String,
    contract: OperationContract,
    allows_count_change: bool,
    error_policy: ErrorPolicy,
    timeout: Option<Duration>,
    required_capability: Option<ModelCapability>,
    model: Option<ModelRecord>,
}

impl InlineOperationBuilder {
    /// Declares a required typed read
    pub fn reads(mut self, name: &str, descriptor: TypeDescriptor) -> Self {
        self.contract = self.contract.reads(name, descriptor);
        self
    }

    /// Declares a required read accepting any value
    pub fn reads_any(mut self, name: &str) -> Self {
        self.contract = self.contract.reads_any(name);
        self
    }

    /// Declares an optional read
    pub fn reads_optional(mut self, name: &str, descriptor: Option<TypeDescriptor>) -> Self {
        self.contract = self.contract.reads_optional(name, descriptor);
        self
    }

    /// Declares a required typed set
    pub fn sets(mut self, name: &str, descriptor: TypeDescriptor) -> Self {
        self.contract = self.contract.sets(name, descriptor);
        self
    }

    /// Declares a required set accepting any value
    pub fn sets_any(mut self, name: &str) -> Self {
        self.contract = self.contract.sets_any(name);
        self
    }

    /// Declares an optional set
    pub fn sets_optional(mut self, name: &str, descriptor: Option<TypeDescriptor>) -> Self {
        self.contract = self.contract.sets_optional(name, descriptor);
        self
    }

    /// Declares a deleted field
    pub fn deletes(mut self, name: &str) -> Self {
        self.contract = self.contract.deletes(name);
        self
    }

    /// Permits output length to differ from input length
    pub fn allows_count_change(mut self) -> Self {
        self.allows_count_change = true;
        self
    }

    /// Sets the failure policy
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Sets the per-invocation timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Declares a required model capability
    pub fn requires_capability(mut self, capability: ModelCapability) -> Self {
        self.required_capability = Some(capability);
        self
    }

    /// Assigns a model record
    pub fn model(mut self, model: ModelRecord) -> Self {
        self.model = Some(model);
        self
    }

    /// Finishes with a per-namespace delta closure.
    ///
    /// The returned delta is merged onto the input namespace and the
    /// declared deletes are applied to the result.
    pub fn map<F>(self, map_fn: F) -> InlineOperation
    where
        F: Fn(&Namespace) -> Result<BTreeMap<FieldName, Value>, PipelineError> + Send + Sync + 'static,
    {
        InlineOperation {
            name: self.name,
            contract: self.contract,
            allows_count_change: self.allows_count_change,
            error_policy: self.error_policy,
            timeout: self.timeout,
            required_capability: self.required_capability,
            model: self.model,
            body: InlineBody::Map(Arc::new(map_fn)),
        }
    }

    /// Finishes with full control over the callable signature
    pub fn apply<F>(self, apply_fn: F) -> InlineOperation
    where
        F: Fn(Vec<Namespace>) -> OperationFuture + Send + Sync + 'static,
    {
        InlineOperation {
            name: self.name,
            contract: self.contract,
            allows_count_change: self.allows_count_change,
            error_policy: self.error_policy,
            timeout: self.timeout,
            required_capability: self.required_capability,
            model: self.model,
            body: InlineBody::Apply(Arc::new(apply_fn)),
        }
    }
}
