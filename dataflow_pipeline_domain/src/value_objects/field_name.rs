// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Field Name Value Object
//!
//! Canonical symbolic key for namespace fields and contract entries.
//!
//! Field names arrive from several surfaces (configuration documents,
//! operation declarations, literal test mappings) and are canonicalized to
//! a single symbolic form so that `":title"`, `" title"`, and `"title"` all
//! address the same field. Canonicalization strips a single leading colon
//! and surrounding whitespace; the remainder must be non-empty.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PipelineError;

/// Canonical symbolic name of a namespace field.
///
/// `FieldName` is an immutable value object; equality and ordering are by
/// the canonical string. Construction canonicalizes, so two names built
/// from different spellings of the same symbol compare equal.
///
/// # Examples
///
/// ```
/// use dataflow_pipeline_domain::value_objects::FieldName;
///
/// let plain = FieldName::new("title").unwrap();
/// let symbolic = FieldName::new(":title").unwrap();
/// assert_eq!(plain, symbolic);
/// assert_eq!(symbolic.as_str(), "title");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct FieldName(String);

// Deserialization canonicalizes like every other construction path.
impl<'de> Deserialize<'de> for FieldName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FieldName::new(raw).map_err(serde::de::Error::custom)
    }
}

impl FieldName {
    /// Creates a canonical field name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when the canonical form is empty.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, PipelineError> {
        let canonical = raw.as_ref().trim().trim_start_matches(':').trim();
        if canonical.is_empty() {
            return Err(PipelineError::InvalidConfiguration(
                "Field name cannot be empty".to_string(),
            ));
        }
        Ok(FieldName(canonical.to_string()))
    }

    /// Gets the canonical name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for FieldName {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldName::new(s)
    }
}

impl TryFrom<&str> for FieldName {
    type Error = PipelineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        FieldName::new(value)
    }
}

/// Infallible convenience used pervasively by declarations and tests where
/// the name is a known-good literal. Panics only on an empty canonical
/// form, which a literal never produces.
pub fn field(name: &str) -> FieldName {
    FieldName::new(name).expect("literal field name")
}
