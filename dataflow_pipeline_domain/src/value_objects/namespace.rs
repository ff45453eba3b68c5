// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Namespace Value Object
//!
//! The immutable keyed record that flows between operations. A namespace is
//! the unit of dataflow: every operation callable takes a list of
//! namespaces and returns a list of namespaces, and every stage boundary is
//! a list of namespaces.
//!
//! ## Immutability
//!
//! The underlying map is never mutated after construction. `merge` and
//! `delete` build and return new instances; a caller holding a namespace
//! reference can never observe state changes caused by any other caller.
//! The map is shared behind `Arc`, so cloning a namespace — which the
//! scheduler does once per parallel worker — is a pointer copy, not a deep
//! copy.
//!
//! ## Merge Semantics
//!
//! `merge` is right-biased: incoming keys overwrite existing ones. `delete`
//! removes keys if present and is a no-op for absent keys. Both laws are
//! property-tested.
//!
//! # Examples
//!
//! ```
//! use dataflow_pipeline_domain::value_objects::{field, Namespace, Value};
//!
//! let ns = Namespace::from_pairs([("title", Value::text("draft"))]);
//! let revised = ns.merge([(field("title"), Value::text("final"))]);
//!
//! assert_eq!(ns.get(&field("title")), Some(&Value::text("draft")));
//! assert_eq!(revised.get(&field("title")), Some(&Value::text("final")));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::value_objects::{field, FieldName, Value};

/// Immutable mapping from canonical field name to value.
///
/// Equality and hashing are by key/value pair set. See the module
/// documentation for the immutability and merge contracts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Namespace {
    fields: Arc<BTreeMap<FieldName, Value>>,
}

impl Namespace {
    /// Creates an empty namespace
    pub fn empty() -> Self {
        Self {
            fields: Arc::new(BTreeMap::new()),
        }
    }

    /// Creates a namespace from field/value pairs with literal names.
    ///
    /// Convenience for tests and inline construction; names must be valid
    /// literals (see [`field`]).
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        pairs
            .into_iter()
            .map(|(name, value)| (field(name), value))
            .collect()
    }

    /// Gets the value of a field, if present
    pub fn get(&self, name: &FieldName) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Checks whether a field is present
    pub fn has(&self, name: &FieldName) -> bool {
        self.fields.contains_key(name)
    }

    /// Returns a new namespace with the given entries merged in.
    ///
    /// Right-biased: incoming keys overwrite existing keys. The receiver is
    /// unchanged.
    pub fn merge(&self, entries: impl IntoIterator<Item = (FieldName, Value)>) -> Namespace {
        let mut fields = (*self.fields).clone();
        for (name, value) in entries {
            fields.insert(name, value);
        }
        Namespace {
            fields: Arc::new(fields),
        }
    }

    /// Returns a new namespace without the given fields.
    ///
    /// Absent keys are ignored. The receiver is unchanged.
    pub fn delete<'a>(&self, names: impl IntoIterator<Item = &'a FieldName>) -> Namespace {
        let mut fields = (*self.fields).clone();
        for name in names {
            fields.remove(name);
        }
        Namespace {
            fields: Arc::new(fields),
        }
    }

    /// Folds a list of namespaces into one by right-biased merge.
    ///
    /// Later namespaces win on key conflicts. An empty list folds to the
    /// empty namespace.
    pub fn merge_all<'a>(namespaces: impl IntoIterator<Item = &'a Namespace>) -> Namespace {
        let mut iter = namespaces.into_iter();
        let first = match iter.next() {
            Some(ns) => ns.clone(),
            None => return Namespace::empty(),
        };
        iter.fold(first, |acc, ns| {
            acc.merge(ns.iter().map(|(k, v)| (k.clone(), v.clone())))
        })
    }

    /// Gets a snapshot of the contents as an owned mapping
    pub fn to_mapping(&self) -> BTreeMap<FieldName, Value> {
        (*self.fields).clone()
    }

    /// Iterates over the field names in canonical order
    pub fn keys(&self) -> impl Iterator<Item = &FieldName> {
        self.fields.keys()
    }

    /// Iterates over field/value pairs in canonical key order
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &Value)> {
        self.fields.iter()
    }

    /// Gets the number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Checks whether the namespace has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Renders a fixed-length preview for trace output.
    ///
    /// The rendering is `{k: v, …}` in key order, truncated to `max_len`
    /// characters with an ellipsis marker.
    pub fn preview(&self, max_len: usize) -> String {
        let mut rendered = String::from("{");
        for (idx, (name, value)) in self.fields.iter().enumerate() {
            if idx > 0 {
                rendered.push_str(", ");
            }
            rendered.push_str(name.as_str());
            rendered.push_str(": ");
            rendered.push_str(&value.describe());
            if rendered.chars().count() > max_len {
                break;
            }
        }
        rendered.push('}');
        if rendered.chars().count() > max_len {
            let truncated: String = rendered.chars().take(max_len.saturating_sub(2)).collect();
            format!("{}…}}", truncated)
        } else {
            rendered
        }
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Namespace::empty()
    }
}

impl FromIterator<(FieldName, Value)> for Namespace {
    fn from_iter<T: IntoIterator<Item = (FieldName, Value)>>(iter: T) -> Self {
        Namespace {
            fields: Arc::new(iter.into_iter().collect()),
        }
    }
}

impl From<BTreeMap<FieldName, Value>> for Namespace {
    fn from(fields: BTreeMap<FieldName, Value>) -> Self {
        Namespace {
            fields: Arc::new(fields),
        }
    }
}
