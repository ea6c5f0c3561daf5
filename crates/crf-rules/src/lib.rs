//! Visibility rule evaluation for conditional report forms.
//!
//! The engine is a pure function over `(rules, values)`: it produces the
//! set of field keys that are currently inapplicable. Evaluation is
//! stateless, idempotent, and independent of rule ordering — the hidden
//! set is the union over all rules whose condition holds.
//!
//! Hidden fields keep whatever value they hold; hiding only exempts a
//! field from required-field checks. Paired-group layout hints never
//! influence the hidden set.

use std::collections::{BTreeMap, BTreeSet};

use crf_model::template::{CmpOp, Condition, VisibilityRule};
use crf_model::value::{FieldKind, FieldValue, ValueMap, value_or_absent};
use crf_model::{Template, ValidationFailure};
use thiserror::Error;

/// Rule evaluation error.
///
/// Comparisons are tagged over the closed field value kind set; a rule
/// literal of one kind compared against a present value of another kind is
/// an error, never a silent `false`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error(
        "rule on field '{field_key}' compares a {literal_kind} literal against a {value_kind} value"
    )]
    TypeMismatch {
        field_key: String,
        literal_kind: FieldKind,
        value_kind: FieldKind,
    },

    #[error("rule on field '{field_key}' has no comparison literal")]
    MissingLiteral { field_key: String },
}

/// Evaluate visibility rules against a value map, returning the hidden
/// field keys.
///
/// Missing keys evaluate as [`FieldValue::Absent`]; `Absent` equals only
/// an explicit `Absent` literal. The `show` list is declared surface with
/// no canonical semantics and is ignored here (the template registry flags
/// its use at load time).
///
/// # Errors
///
/// Returns [`RuleError`] when a rule is malformed or compares values of
/// different kinds.
pub fn evaluate(rules: &[VisibilityRule], values: &ValueMap) -> Result<BTreeSet<String>, RuleError> {
    let mut hidden = BTreeSet::new();
    for rule in rules {
        if condition_holds(&rule.when, values)? {
            hidden.extend(rule.hide.iter().cloned());
        }
    }
    Ok(hidden)
}

/// Evaluate a single rule condition against the value map.
pub fn condition_holds(condition: &Condition, values: &ValueMap) -> Result<bool, RuleError> {
    let actual = value_or_absent(values, &condition.field_key);
    match condition.op {
        CmpOp::Eq => {
            let literal = single_literal(condition)?;
            values_equal(&condition.field_key, actual, literal)
        }
        CmpOp::Neq => {
            let literal = single_literal(condition)?;
            Ok(!values_equal(&condition.field_key, actual, literal)?)
        }
        CmpOp::In => {
            for literal in &condition.values {
                if values_equal(&condition.field_key, actual, literal)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}

fn single_literal(condition: &Condition) -> Result<&FieldValue, RuleError> {
    condition.values.first().ok_or_else(|| RuleError::MissingLiteral {
        field_key: condition.field_key.clone(),
    })
}

/// Tagged equality between a current value and a rule literal.
///
/// `Absent` equals only `Absent`. Two present values of different kinds
/// are a type error.
fn values_equal(
    field_key: &str,
    actual: &FieldValue,
    literal: &FieldValue,
) -> Result<bool, RuleError> {
    match (actual.kind(), literal.kind()) {
        (None, None) => Ok(true),
        (None, Some(_)) | (Some(_), None) => Ok(false),
        (Some(value_kind), Some(literal_kind)) => {
            if value_kind != literal_kind {
                return Err(RuleError::TypeMismatch {
                    field_key: field_key.to_string(),
                    literal_kind,
                    value_kind,
                });
            }
            Ok(present_equal(actual, literal))
        }
    }
}

fn present_equal(a: &FieldValue, b: &FieldValue) -> bool {
    match (a, b) {
        (FieldValue::Text(x), FieldValue::Text(y))
        | (FieldValue::Choice(x), FieldValue::Choice(y)) => x == y,
        (FieldValue::Bool(x), FieldValue::Bool(y)) => x == y,
        (FieldValue::Number(x), FieldValue::Number(y)) => x == y,
        _ => false,
    }
}

/// Required-field validation for submit: every required field that is not
/// hidden for the current values must carry a non-empty value.
///
/// Returns `field_key -> message` for each violation; an empty map means
/// the values pass. A field hidden by the rules is exempt regardless of
/// its declared requiredness.
pub fn required_field_errors(
    template: &Template,
    values: &ValueMap,
) -> Result<BTreeMap<String, String>, RuleError> {
    let hidden = evaluate(&template.ui.rules, values)?;
    let mut errors = BTreeMap::new();
    for field in &template.fields {
        if !field.required || hidden.contains(&field.key) {
            continue;
        }
        if value_or_absent(values, &field.key).is_empty_for_required() {
            errors.insert(field.key.clone(), format!("{} is required", field.label));
        }
    }
    Ok(errors)
}

/// Convenience wrapper producing a [`ValidationFailure`] when required
/// fields are missing.
pub fn validate_required(
    template: &Template,
    values: &ValueMap,
) -> Result<Option<ValidationFailure>, RuleError> {
    let errors = required_field_errors(template, values)?;
    if errors.is_empty() {
        Ok(None)
    } else {
        Ok(Some(ValidationFailure::fields(errors)))
    }
}
