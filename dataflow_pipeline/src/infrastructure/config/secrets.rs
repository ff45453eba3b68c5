// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Secret Token Resolution
//!
//! Model options in the global document may carry two whole-string token
//! forms instead of literal values:
//!
//! - `${ENV_VAR}` resolves from the process environment
//! - `secret://REF` resolves through an injectable [`SecretResolver`]
//!
//! Anything else is literal. A missing environment variable, an
//! unresolvable reference, or a `secret://` token with no resolver
//! configured is a configuration error at load time — never a silent
//! empty string handed to a provider at call time.
//!
//! The environment is injected as a lookup function so tests never mutate
//! process state.

use std::collections::BTreeMap;

use dataflow_pipeline_domain::{PipelineError, Value};

/// Resolves `secret://` references to secret values.
pub trait SecretResolver: Send + Sync {
    /// Resolves a reference, `None` when unknown
    fn resolve(&self, reference: &str) -> Option<String>;
}

impl<F> SecretResolver for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn resolve(&self, reference: &str) -> Option<String> {
        self(reference)
    }
}

/// Resolves one string that may be a secret token.
pub fn resolve_token(
    text: &str,
    env: &dyn Fn(&str) -> Option<String>,
    resolver: Option<&dyn SecretResolver>,
) -> Result<String, PipelineError> {
    if let Some(var) = text.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        return env(var).ok_or_else(|| {
            PipelineError::InvalidConfiguration(format!("Environment variable '{}' is not set", var))
        });
    }
    if let Some(reference) = text.strip_prefix("secret://") {
        let resolver = resolver.ok_or_else(|| {
            PipelineError::InvalidConfiguration(format!(
                "Secret reference '{}' used but no secret resolver is configured",
                reference
            ))
        })?;
        return resolver.resolve(reference).ok_or_else(|| {
            PipelineError::InvalidConfiguration(format!("Secret reference '{}' could not be resolved", reference))
        });
    }
    Ok(text.to_string())
}

/// Resolves secret tokens inside a value tree.
///
/// Text leaves go through [`resolve_token`]; lists and maps recurse;
/// every other value passes through untouched.
pub fn resolve_value(
    value: &Value,
    env: &dyn Fn(&str) -> Option<String>,
    resolver: Option<&dyn SecretResolver>,
) -> Result<Value, PipelineError> {
    match value {
        Value::Text(text) => Ok(Value::Text(resolve_token(text, env, resolver)?)),
        Value::List(items) => {
            let resolved = items
                .iter()
                .map(|item| resolve_value(item, env, resolver))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::List(resolved))
        }
        Value::Map(entries) => {
            let resolved = entries
                .iter()
                .map(|(key, entry)| Ok((key.clone(), resolve_value(entry, env, resolver)?)))
                .collect::<Result<BTreeMap<_, _>, PipelineError>>()?;
            Ok(Value::Map(resolved))
        }
        other => Ok(other.clone()),
    }
}

/// Resolves an options map against the process environment.
pub fn resolve_options(
    options: &BTreeMap<String, Value>,
    resolver: Option<&dyn SecretResolver>,
) -> Result<BTreeMap<String, Value>, PipelineError> {
    let env = |name: &str| std::env::var(name).ok();
    options
        .iter()
        .map(|(key, value)| Ok((key.clone(), resolve_value(value, &env, resolver)?)))
        .collect()
}
