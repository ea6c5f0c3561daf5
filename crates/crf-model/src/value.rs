use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The closed set of field value kinds a report form can hold.
///
/// Comparisons between values are tagged: two values of different present
/// kinds never compare equal silently, they are a type error at the rule
/// evaluation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Bool,
    Number,
    /// Selection from a fixed option list (radio/select inputs).
    Choice,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Bool => "bool",
            FieldKind::Number => "number",
            FieldKind::Choice => "choice",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single field value.
///
/// `Absent` is the distinguished sentinel for a key that has no value.
/// Looking up a missing key in a [`ValueMap`] yields `Absent`; it equals
/// only an explicit `Absent` literal in a rule condition, never any other
/// literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Number(f64),
    Choice(String),
    Absent,
}

impl FieldValue {
    /// The kind tag for a present value, `None` for `Absent`.
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            FieldValue::Text(_) => Some(FieldKind::Text),
            FieldValue::Bool(_) => Some(FieldKind::Bool),
            FieldValue::Number(_) => Some(FieldKind::Number),
            FieldValue::Choice(_) => Some(FieldKind::Choice),
            FieldValue::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    /// Returns true if the value counts as empty for required-field checks:
    /// `Absent`, or a text/choice value that is blank after trimming.
    pub fn is_empty_for_required(&self) -> bool {
        match self {
            FieldValue::Absent => true,
            FieldValue::Text(s) | FieldValue::Choice(s) => s.trim().is_empty(),
            FieldValue::Bool(_) | FieldValue::Number(_) => false,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn choice(value: impl Into<String>) -> Self {
        FieldValue::Choice(value.into())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => write!(f, "{s}"),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Absent => write!(f, ""),
        }
    }
}

/// The value set of a report, keyed by field key.
///
/// A `BTreeMap` so iteration order is deterministic; canonical
/// serialization for checksums depends on this.
pub type ValueMap = BTreeMap<String, FieldValue>;

/// Look up a field, treating a missing key as [`FieldValue::Absent`].
pub fn value_or_absent<'a>(values: &'a ValueMap, key: &str) -> &'a FieldValue {
    values.get(key).unwrap_or(&FieldValue::Absent)
}
