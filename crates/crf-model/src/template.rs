use serde::{Deserialize, Serialize};

use crate::value::{FieldKind, FieldValue};

/// Comparison operator of a visibility rule condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CmpOp {
    Eq,
    Neq,
    In,
}

/// The `when` clause of a visibility rule.
///
/// For `Eq`/`Neq` the first entry of `values` is the literal; for `In` the
/// whole list is the membership set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field_key: String,
    pub op: CmpOp,
    pub values: Vec<FieldValue>,
}

impl Condition {
    pub fn eq(field_key: impl Into<String>, value: FieldValue) -> Self {
        Self {
            field_key: field_key.into(),
            op: CmpOp::Eq,
            values: vec![value],
        }
    }

    pub fn neq(field_key: impl Into<String>, value: FieldValue) -> Self {
        Self {
            field_key: field_key.into(),
            op: CmpOp::Neq,
            values: vec![value],
        }
    }

    pub fn is_in(field_key: impl Into<String>, values: Vec<FieldValue>) -> Self {
        Self {
            field_key: field_key.into(),
            op: CmpOp::In,
            values,
        }
    }
}

/// A declarative rule hiding fields when its condition holds.
///
/// Rules are order-independent: the hidden set is the union over all rules
/// whose condition is true. The `show` list is declared surface with no
/// triggering behavior today; the registry flags templates that use it and
/// the engine ignores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibilityRule {
    pub when: Condition,
    pub hide: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub show: Vec<String>,
}

impl VisibilityRule {
    pub fn hide_when(when: Condition, hide: Vec<String>) -> Self {
        Self {
            when,
            hide,
            show: Vec::new(),
        }
    }
}

/// Layout-only grouping of two symmetric field prefixes (e.g. left/right
/// anatomy). Never affects validation or the hidden set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedGroup {
    pub label: String,
    pub left_prefix: String,
    pub right_prefix: String,
}

/// UI specification attached to a template: visibility rules plus layout
/// hints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiSpec {
    #[serde(default)]
    pub rules: Vec<VisibilityRule>,
    #[serde(default)]
    pub paired_groups: Vec<PairedGroup>,
}

/// One field of a template schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub key: String,
    pub label: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
    /// Allowed options for `Choice` fields.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl FieldDef {
    pub fn new(key: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            kind,
            required: false,
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }
}

/// A report template: field schema plus UI specification.
///
/// Immutable once referenced by any draft; a revised schema is a new
/// template record with a higher `schema_version`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub code: String,
    pub schema_version: u32,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub ui: UiSpec,
}

impl Template {
    pub fn field(&self, key: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.field(key).is_some()
    }
}
