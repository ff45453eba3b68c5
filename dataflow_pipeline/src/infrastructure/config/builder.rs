// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Pipe Builder
//!
//! Turns parsed configuration documents into validated [`Pipe`]s. The
//! builder owns three explicit context objects — an operation registry, a
//! model registry, and an optional secret resolver — and never discovers
//! anything implicitly: every operation id must be registered, every model
//! name must resolve, every capability must check out, or construction
//! fails with the specific configuration error.
//!
//! The [`OperationRegistry`] maps operation ids to factories. The built-in
//! dataflow shapes (`link`, `filter`, `collapse`, `explode`, `log`) ship
//! pre-registered via [`OperationRegistry::with_builtins`]; embedders add
//! their own ids next to them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use dataflow_pipeline_domain::{
    FieldName, ModelRecord, ModelRegistry, Operation, Pipe, PipelineError, Stage, Value,
};

use crate::infrastructure::config::document::{timeout_duration, GlobalDocument, PipeDocument};
use crate::infrastructure::config::secrets::{resolve_options, SecretResolver};
use crate::infrastructure::services::{
    CollapseMode, CollapseOperation, ExplodeOperation, FilterOperation, LinkOperation, LogOperation,
};

/// Everything a factory gets to build one operation instance.
pub struct OperationSpec<'a> {
    /// The operation id from the document
    pub operation_type: &'a str,
    /// Operation-specific options
    pub options: &'a BTreeMap<String, Value>,
    /// Resolved model record, when the document names one
    pub model: Option<&'a ModelRecord>,
    /// Operation timeout from the document
    pub timeout: Option<Duration>,
}

/// Builds operation instances from document specs.
pub trait OperationFactory: Send + Sync {
    fn build(&self, spec: &OperationSpec<'_>) -> Result<Arc<dyn Operation>, PipelineError>;
}

impl<F> OperationFactory for F
where
    F: Fn(&OperationSpec<'_>) -> Result<Arc<dyn Operation>, PipelineError> + Send + Sync,
{
    fn build(&self, spec: &OperationSpec<'_>) -> Result<Arc<dyn Operation>, PipelineError> {
        self(spec)
    }
}

/// Registry mapping operation ids to factories.
#[derive(Default)]
pub struct OperationRegistry {
    factories: HashMap<String, Arc<dyn OperationFactory>>,
}

impl OperationRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in dataflow operations
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("link", build_link);
        registry.register("filter", build_filter);
        registry.register("collapse", build_collapse);
        registry.register("explode", build_explode);
        registry.register("log", build_log);
        registry
    }

    /// Registers a factory under an operation id
    pub fn register(&mut self, operation_type: &str, factory: impl OperationFactory + 'static) {
        self.factories.insert(operation_type.to_string(), Arc::new(factory));
    }

    /// Resolves a factory by operation id.
    ///
    /// # Errors
    ///
    /// Returns `MissingOperation` naming the known ids.
    pub fn get(&self, operation_type: &str) -> Result<Arc<dyn OperationFactory>, PipelineError> {
        self.factories.get(operation_type).cloned().ok_or_else(|| {
            let mut known: Vec<&str> = self.factories.keys().map(String::as_str).collect();
            known.sort_unstable();
            PipelineError::MissingOperation(format!(
                "No operation registered under id '{}'. Known operations: {:?}",
                operation_type, known
            ))
        })
    }

    /// Checks whether an operation id is registered
    pub fn contains(&self, operation_type: &str) -> bool {
        self.factories.contains_key(operation_type)
    }
}

/// Builds validated pipes from documents.
pub struct PipeBuilder {
    operations: OperationRegistry,
    models: ModelRegistry,
    resolver: Option<Arc<dyn SecretResolver>>,
}

impl PipeBuilder {
    /// Creates a builder over an operation registry
    pub fn new(operations: OperationRegistry) -> Self {
        Self {
            operations,
            models: ModelRegistry::new(),
            resolver: None,
        }
    }

    /// Replaces the model registry
    pub fn with_models(mut self, models: ModelRegistry) -> Self {
        self.models = models;
        self
    }

    /// Installs a secret resolver for `secret://` tokens
    pub fn with_secret_resolver(mut self, resolver: Arc<dyn SecretResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Gets the model registry
    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    /// Loads model records from a global document, resolving secret tokens
    /// in their options.
    pub fn load_models(&mut self, global: &GlobalDocument) -> Result<(), PipelineError> {
        for (name, model_doc) in &global.models {
            let capabilities = model_doc
                .capabilities
                .iter()
                .map(|capability| capability.parse())
                .collect::<Result<Vec<_>, PipelineError>>()?;
            let options = resolve_options(&model_doc.options, self.resolver.as_deref())?;
            let record = ModelRecord::new(name, &model_doc.provider, &model_doc.model, capabilities, options)?;
            debug!(model = %name, provider = %model_doc.provider, "model registered");
            self.models.register(record);
        }
        Ok(())
    }

    /// Builds a validated pipe from a pipe document.
    pub fn build(&self, document: &PipeDocument) -> Result<Pipe, PipelineError> {
        let mut stages = Vec::with_capacity(document.stages.len());
        for stage_doc in &document.stages {
            let stage_timeout = timeout_duration(stage_doc.timeout, &format!("stage '{}'", stage_doc.name))?;

            let mut operations: Vec<Arc<dyn Operation>> = Vec::with_capacity(stage_doc.operations.len());
            for op_doc in &stage_doc.operations {
                let model = match &op_doc.model {
                    Some(model_name) => Some(self.models.get(model_name)?.clone()),
                    None => None,
                };
                let timeout = timeout_duration(
                    op_doc.timeout,
                    &format!("operation '{}' in stage '{}'", op_doc.operation_type, stage_doc.name),
                )?;
                let factory = self.operations.get(&op_doc.operation_type)?;
                let spec = OperationSpec {
                    operation_type: &op_doc.operation_type,
                    options: &op_doc.options,
                    model: model.as_ref(),
                    timeout,
                };
                operations.push(factory.build(&spec)?);
            }

            let mut stage = Stage::new(&stage_doc.name, stage_doc.mode, operations, stage_doc.merge_strategy)?;
            if let Some(timeout) = stage_timeout {
                stage = stage.with_timeout(timeout);
            }
            stages.push(stage);
        }

        let mut pipe = Pipe::new(&document.name, stages)?;
        if let Some(timeout) = timeout_duration(document.timeout, &format!("pipe '{}'", document.name))? {
            pipe = pipe.with_timeout(timeout);
        }
        debug!(pipe = %document.name, stages = document.stages.len(), "pipe built");
        Ok(pipe)
    }
}

/// Name-keyed collection of built pipes.
#[derive(Default)]
pub struct PipeCatalog {
    pipes: BTreeMap<String, Arc<Pipe>>,
}

impl PipeCatalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a pipe under its own name
    pub fn insert(&mut self, pipe: Pipe) {
        self.pipes.insert(pipe.name().to_string(), Arc::new(pipe));
    }

    /// Resolves a pipe by name.
    ///
    /// # Errors
    ///
    /// Returns `MissingPipe` naming the known pipes.
    pub fn get(&self, name: &str) -> Result<Arc<Pipe>, PipelineError> {
        self.pipes.get(name).cloned().ok_or_else(|| {
            PipelineError::MissingPipe(format!(
                "No pipe named '{}' is loaded. Known pipes: {:?}",
                name,
                self.pipes.keys().collect::<Vec<_>>()
            ))
        })
    }

    /// Iterates over pipe names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.pipes.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Built-in operation factories
// ---------------------------------------------------------------------------

// Field-name options accept plain and symbolic spellings.
fn as_field_text(value: &Value) -> Option<&str> {
    match value {
        Value::Text(text) => Some(text),
        Value::Symbol(symbol) => Some(symbol),
        _ => None,
    }
}

fn require_field_option(spec: &OperationSpec<'_>, key: &str) -> Result<FieldName, PipelineError> {
    let value = spec.options.get(key).ok_or_else(|| {
        PipelineError::InvalidDocument(format!(
            "Operation '{}' requires the '{}' option",
            spec.operation_type, key
        ))
    })?;
    let text = as_field_text(value).ok_or_else(|| {
        PipelineError::InvalidDocument(format!(
            "Operation '{}' option '{}' must be a field name, got {}",
            spec.operation_type,
            key,
            value.describe()
        ))
    })?;
    FieldName::new(text)
}

fn optional_field_option(spec: &OperationSpec<'_>, key: &str) -> Result<Option<FieldName>, PipelineError> {
    match spec.options.get(key) {
        None => Ok(None),
        Some(_) => Ok(Some(require_field_option(spec, key)?)),
    }
}

// `copy` / `move` accept one endpoint map or a list of endpoint maps.
fn link_endpoints(spec: &OperationSpec<'_>, key: &str) -> Result<Vec<(FieldName, FieldName)>, PipelineError> {
    let Some(value) = spec.options.get(key) else {
        return Ok(Vec::new());
    };
    let entries: Vec<&Value> = match value {
        Value::List(items) => items.iter().collect(),
        single => vec![single],
    };

    let mut endpoints = Vec::with_capacity(entries.len());
    for entry in entries {
        let map = entry.as_map().ok_or_else(|| {
            PipelineError::InvalidDocument(format!(
                "Operation 'link' option '{}' entries must be maps with 'from' and 'to', got {}",
                key,
                entry.describe()
            ))
        })?;
        let endpoint = |end: &str| -> Result<FieldName, PipelineError> {
            let raw = map.get(end).and_then(as_field_text).ok_or_else(|| {
                PipelineError::InvalidDocument(format!(
                    "Operation 'link' option '{}' entries need a '{}' field name",
                    key, end
                ))
            })?;
            FieldName::new(raw)
        };
        endpoints.push((endpoint("from")?, endpoint("to")?));
    }
    Ok(endpoints)
}

fn build_link(spec: &OperationSpec<'_>) -> Result<Arc<dyn Operation>, PipelineError> {
    let mut link = LinkOperation::new("link");
    for (from, to) in link_endpoints(spec, "copy")? {
        link = link.copy(from, to);
    }
    for (from, to) in link_endpoints(spec, "move")? {
        link = link.rename(from, to);
    }
    if let Some(assignments) = spec.options.get("set") {
        let map = assignments.as_map().ok_or_else(|| {
            PipelineError::InvalidDocument(format!(
                "Operation 'link' option 'set' must be a map of field to value, got {}",
                assignments.describe()
            ))
        })?;
        for (field_name, value) in map {
            link = link.assign(FieldName::new(field_name)?, value.clone());
        }
    }
    if let Some(removals) = spec.options.get("delete") {
        let names: Vec<&Value> = match removals {
            Value::List(items) => items.iter().collect(),
            single => vec![single],
        };
        for name in names {
            let text = as_field_text(name).ok_or_else(|| {
                PipelineError::InvalidDocument(format!(
                    "Operation 'link' option 'delete' entries must be field names, got {}",
                    name.describe()
                ))
            })?;
            link = link.remove(FieldName::new(text)?);
        }
    }
    if link.is_empty() {
        return Err(PipelineError::InvalidDocument(
            "Operation 'link' needs at least one of 'copy', 'move', 'set', or 'delete'".to_string(),
        ));
    }
    Ok(Arc::new(link.with_timeout(spec.timeout)))
}

fn build_filter(spec: &OperationSpec<'_>) -> Result<Arc<dyn Operation>, PipelineError> {
    let field_name = require_field_option(spec, "field")?;
    let filter = if let Some(expected) = spec.options.get("equals") {
        FilterOperation::field_equals("filter", field_name, expected.clone())
    } else {
        let exists = match spec.options.get("exists") {
            None => true,
            Some(value) => value.as_bool().ok_or_else(|| {
                PipelineError::InvalidDocument(format!(
                    "Operation 'filter' option 'exists' must be a boolean, got {}",
                    value.describe()
                ))
            })?,
        };
        if exists {
            FilterOperation::field_exists("filter", field_name)
        } else {
            FilterOperation::field_missing("filter", field_name)
        }
    };
    Ok(Arc::new(filter.with_timeout(spec.timeout)))
}

fn build_collapse(spec: &OperationSpec<'_>) -> Result<Arc<dyn Operation>, PipelineError> {
    let source = require_field_option(spec, "source")?;
    let target = optional_field_option(spec, "target")?.unwrap_or_else(|| source.clone());
    let mode = match spec.options.get("strategy") {
        None => CollapseMode::Collect,
        Some(value) => {
            let text = as_field_text(value).ok_or_else(|| {
                PipelineError::InvalidDocument(format!(
                    "Operation 'collapse' option 'strategy' must be a string, got {}",
                    value.describe()
                ))
            })?;
            text.parse()?
        }
    };
    Ok(Arc::new(
        CollapseOperation::new("collapse", source, target, mode).with_timeout(spec.timeout),
    ))
}

fn build_explode(spec: &OperationSpec<'_>) -> Result<Arc<dyn Operation>, PipelineError> {
    let source = require_field_option(spec, "source")?;
    let target = require_field_option(spec, "target")?;
    Ok(Arc::new(
        ExplodeOperation::new("explode", source, target).with_timeout(spec.timeout),
    ))
}

fn build_log(spec: &OperationSpec<'_>) -> Result<Arc<dyn Operation>, PipelineError> {
    let mut log = LogOperation::new("log");
    if let Some(label) = spec.options.get("label") {
        let text = as_field_text(label).ok_or_else(|| {
            PipelineError::InvalidDocument(format!(
                "Operation 'log' option 'label' must be a string, got {}",
                label.describe()
            ))
        })?;
        log = log.with_label(text);
    }
    if let Some(fields) = spec.options.get("fields") {
        let items = fields.as_list().ok_or_else(|| {
            PipelineError::InvalidDocument(format!(
                "Operation 'log' option 'fields' must be a list of field names, got {}",
                fields.describe()
            ))
        })?;
        let mut names = Vec::with_capacity(items.len());
        for item in items {
            let text = as_field_text(item).ok_or_else(|| {
                PipelineError::InvalidDocument(format!(
                    "Operation 'log' option 'fields' entries must be field names, got {}",
                    item.describe()
                ))
            })?;
            names.push(FieldName::new(text)?);
        }
        log = log.with_fields(names);
    }
    Ok(Arc::new(log.with_timeout(spec.timeout)))
}
