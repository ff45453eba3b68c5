// /////////////////////////////////////////////////////////////////////////////
// Dataflow Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Dynamic Value Sum
//!
//! This module provides the closed dynamic value type that namespaces carry
//! between operations. The set of variants is exhaustive and intentionally
//! small:
//!
//! - **Null**: explicit absence (distinct from a missing field)
//! - **Bool / Int / Float / Text / Symbol**: the primitive vocabulary the
//!   type system validates against
//! - **List / Map**: the two structural containers
//! - **Media**: an opaque byte payload with an optional MIME tag; the core
//!   never interprets media content, it only moves it
//!
//! ## Equality and Hashing
//!
//! Namespaces must be `Eq + Hash`, so `Value` is too. Floats compare and
//! hash by their raw bit pattern: two NaNs with identical bits are equal,
//! `0.0` and `-0.0` are not. That trade keeps the equality relation total
//! without pulling ordering semantics into the domain.
//!
//! ## Serialization
//!
//! Serde support is hand-written. Scalars map onto the obvious
//! serde data-model forms; a string with a leading colon deserializes as a
//! `Symbol`, matching the symbolic-key convention used throughout the
//! configuration surface. Media serializes as a tagged map and is never
//! produced by configuration documents.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque media payload with an optional MIME tag.
///
/// The byte buffer is shared; cloning a media value never copies the
/// payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaValue {
    bytes: Arc<Vec<u8>>,
    mime: Option<String>,
}

impl MediaValue {
    /// Creates a media value from raw bytes and an optional MIME tag
    pub fn new(bytes: Vec<u8>, mime: Option<String>) -> Self {
        Self {
            bytes: Arc::new(bytes),
            mime,
        }
    }

    /// Gets the raw payload
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Gets the MIME tag, if any
    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }
}

/// Dynamic value carried by namespace fields.
///
/// See the module documentation for the variant vocabulary and the
/// equality rules.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Symbol(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Media(MediaValue),
}

impl Value {
    /// Creates a text value
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Creates a symbol value
    pub fn symbol(s: impl Into<String>) -> Self {
        Value::Symbol(s.into())
    }

    /// Creates an integer value
    pub fn int(i: i64) -> Self {
        Value::Int(i)
    }

    /// Creates a float value
    pub fn float(f: f64) -> Self {
        Value::Float(f)
    }

    /// Creates a boolean value
    pub fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    /// Creates a list value
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    /// Checks for the explicit null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Gets the text payload when the value is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Gets the integer payload when the value is an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Gets the boolean payload when the value is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Gets the list payload when the value is a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Gets the map payload when the value is a map
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Human-readable kind label used by validator error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "array",
            Value::Map(_) => "mapping",
            Value::Media(_) => "media",
        }
    }

    /// Compact descriptor for error messages and trace previews.
    ///
    /// Long strings are truncated to a prefix plus a length marker so
    /// contract errors stay readable regardless of payload size.
    pub fn describe(&self) -> String {
        const TEXT_PREVIEW: usize = 32;
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => format!("{} (boolean)", b),
            Value::Int(i) => format!("{} (integer)", i),
            Value::Float(f) => format!("{} (float)", f),
            Value::Symbol(s) => format!(":{} (symbol)", s),
            Value::Text(s) => {
                if s.chars().count() > TEXT_PREVIEW {
                    let prefix: String = s.chars().take(TEXT_PREVIEW).collect();
                    format!("\"{}…\" (string, {} chars)", prefix, s.chars().count())
                } else {
                    format!("\"{}\" (string)", s)
                }
            }
            Value::List(items) => format!("array of {} elements", items.len()),
            Value::Map(entries) => format!("mapping of {} entries", entries.len()),
            Value::Media(m) => match m.mime() {
                Some(mime) => format!("media ({}, {} bytes)", mime, m.bytes().len()),
                None => format!("media ({} bytes)", m.bytes().len()),
            },
        }
    }

    /// Converts from a `serde_json::Value`.
    ///
    /// Strings with a leading colon become symbols; numbers outside the
    /// `i64` range become floats.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::from_string_form(s),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Converts to a `serde_json::Value`. Symbols render with their leading
    /// colon; media renders as a tagged object without the payload.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Symbol(s) => serde_json::Value::String(format!(":{}", s)),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => serde_json::Value::Object(
                entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Media(m) => serde_json::json!({
                "$media": { "mime": m.mime(), "bytes": m.bytes().len() }
            }),
        }
    }

    fn from_string_form(s: &str) -> Value {
        match s.strip_prefix(':') {
            Some(symbol) if !symbol.is_empty() => Value::Symbol(symbol.to_string()),
            _ => Value::Text(s.to_string()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Media(a), Value::Media(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Symbol(s) => s.hash(state),
            Value::List(items) => items.hash(state),
            Value::Map(entries) => entries.hash(state),
            Value::Media(m) => m.hash(state),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Symbol(s) => serializer.serialize_str(&format!(":{}", s)),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Media(m) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("$media_mime", &m.mime())?;
                map.serialize_entry("$media_bytes", m.bytes())?;
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("a scalar, sequence, or mapping value")
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }

    fn visit_bool<E: serde::de::Error>(self, b: bool) -> Result<Value, E> {
        Ok(Value::Bool(b))
    }

    fn visit_i64<E: serde::de::Error>(self, i: i64) -> Result<Value, E> {
        Ok(Value::Int(i))
    }

    fn visit_u64<E: serde::de::Error>(self, u: u64) -> Result<Value, E> {
        if let Ok(i) = i64::try_from(u) {
            Ok(Value::Int(i))
        } else {
            Ok(Value::Float(u as f64))
        }
    }

    fn visit_f64<E: serde::de::Error>(self, f: f64) -> Result<Value, E> {
        Ok(Value::Float(f))
    }

    fn visit_str<E: serde::de::Error>(self, s: &str) -> Result<Value, E> {
        Ok(Value::from_string_form(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        let mut entries = BTreeMap::new();
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            entries.insert(key, value);
        }
        Ok(Value::Map(entries))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}
