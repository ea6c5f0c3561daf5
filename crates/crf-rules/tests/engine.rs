//! Engine determinism and required-field validation tests.

use std::collections::BTreeSet;

use crf_model::template::{Condition, FieldDef, Template, UiSpec, VisibilityRule};
use crf_model::value::{FieldKind, FieldValue, ValueMap};
use crf_rules::{evaluate, required_field_errors, validate_required};
use proptest::prelude::*;

fn doppler_template() -> Template {
    Template {
        code: "doppler_carotid".to_string(),
        schema_version: 1,
        fields: vec![
            FieldDef::new("stenosis", "Stenosis present", FieldKind::Choice)
                .required()
                .with_options(vec!["Yes".to_string(), "No".to_string()]),
            FieldDef::new("stenosis_pct", "Stenosis percentage", FieldKind::Number).required(),
            FieldDef::new("impression", "Impression", FieldKind::Text).required(),
            FieldDef::new("incidental", "Incidental findings", FieldKind::Text),
        ],
        ui: UiSpec {
            rules: vec![VisibilityRule::hide_when(
                Condition::eq("stenosis", FieldValue::choice("No")),
                vec!["stenosis_pct".to_string()],
            )],
            paired_groups: Vec::new(),
        },
    }
}

#[test]
fn required_but_hidden_field_is_exempt() {
    let template = doppler_template();
    let mut values = ValueMap::new();
    values.insert("stenosis".to_string(), FieldValue::choice("No"));
    values.insert("impression".to_string(), FieldValue::text("Normal study."));

    // stenosis_pct is required but hidden while stenosis == "No"
    let errors = required_field_errors(&template, &values).expect("evaluate");
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn visible_required_field_is_enforced() {
    let template = doppler_template();
    let mut values = ValueMap::new();
    values.insert("stenosis".to_string(), FieldValue::choice("Yes"));
    values.insert("impression".to_string(), FieldValue::text("See percent."));

    let errors = required_field_errors(&template, &values).expect("evaluate");
    assert_eq!(errors.len(), 1);
    assert!(errors.contains_key("stenosis_pct"));

    let failure = validate_required(&template, &values)
        .expect("evaluate")
        .expect("failure expected");
    assert!(failure.field_errors.contains_key("stenosis_pct"));
}

#[test]
fn optional_fields_never_produce_errors() {
    let template = doppler_template();
    let mut values = ValueMap::new();
    values.insert("stenosis".to_string(), FieldValue::choice("No"));
    values.insert("impression".to_string(), FieldValue::text("Normal."));
    // incidental left unset; not required

    let errors = required_field_errors(&template, &values).expect("evaluate");
    assert!(errors.is_empty());
}

#[test]
fn hidden_field_keeps_its_value() {
    // Hiding exempts from validation but must not clear anything.
    let template = doppler_template();
    let mut values = ValueMap::new();
    values.insert("stenosis".to_string(), FieldValue::choice("No"));
    values.insert("stenosis_pct".to_string(), FieldValue::Number(70.0));

    let hidden = evaluate(&template.ui.rules, &values).expect("evaluate");
    assert!(hidden.contains("stenosis_pct"));
    assert_eq!(values.get("stenosis_pct"), Some(&FieldValue::Number(70.0)));
}

const KEYS: &[&str] = &["alpha", "beta", "gamma", "delta", "epsilon"];
const OPTIONS: &[&str] = &["Yes", "No", "Unknown"];

fn arb_choice() -> impl Strategy<Value = FieldValue> {
    prop::sample::select(OPTIONS).prop_map(FieldValue::choice)
}

fn arb_condition() -> impl Strategy<Value = Condition> {
    let key = prop::sample::select(KEYS);
    prop_oneof![
        (key.clone(), arb_choice()).prop_map(|(k, v)| Condition::eq(k, v)),
        (key.clone(), arb_choice()).prop_map(|(k, v)| Condition::neq(k, v)),
        (key, prop::collection::vec(arb_choice(), 1..3))
            .prop_map(|(k, vs)| Condition::is_in(k, vs)),
    ]
}

fn arb_rule() -> impl Strategy<Value = VisibilityRule> {
    (
        arb_condition(),
        prop::collection::btree_set(prop::sample::select(KEYS), 1..3),
    )
        .prop_map(|(when, hide)| {
            VisibilityRule::hide_when(when, hide.into_iter().map(String::from).collect())
        })
}

fn arb_values() -> impl Strategy<Value = ValueMap> {
    prop::collection::btree_map(
        prop::sample::select(KEYS).prop_map(String::from),
        arb_choice(),
        0..KEYS.len(),
    )
}

proptest! {
    #[test]
    fn evaluation_is_order_independent(
        rules in prop::collection::vec(arb_rule(), 0..6).prop_shuffle(),
        values in arb_values(),
    ) {
        let mut reversed = rules.clone();
        reversed.reverse();

        let forward = evaluate(&rules, &values).expect("evaluate");
        let backward = evaluate(&reversed, &values).expect("evaluate");
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn evaluation_is_deterministic(
        rules in prop::collection::vec(arb_rule(), 0..6),
        values in arb_values(),
    ) {
        let first = evaluate(&rules, &values).expect("evaluate");
        let second = evaluate(&rules, &values).expect("evaluate");
        prop_assert_eq!(first, second);
    }

    #[test]
    fn hidden_keys_come_from_hide_lists(
        rules in prop::collection::vec(arb_rule(), 0..6),
        values in arb_values(),
    ) {
        let declared: BTreeSet<String> = rules
            .iter()
            .flat_map(|rule| rule.hide.iter().cloned())
            .collect();
        let hidden = evaluate(&rules, &values).expect("evaluate");
        prop_assert!(hidden.is_subset(&declared));
    }
}
