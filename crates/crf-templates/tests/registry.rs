//! Registry construction, validation, and directory loading tests.

use crf_model::template::{Condition, FieldDef, PairedGroup, Template, UiSpec, VisibilityRule};
use crf_model::value::{FieldKind, FieldValue};
use crf_templates::{TemplateError, TemplateRegistry};

fn carotid_template() -> Template {
    Template {
        code: "doppler_carotid".to_string(),
        schema_version: 2,
        fields: vec![
            FieldDef::new("cca_left_psv", "Left CCA PSV", FieldKind::Number).required(),
            FieldDef::new("cca_right_psv", "Right CCA PSV", FieldKind::Number).required(),
            FieldDef::new("stenosis", "Stenosis present", FieldKind::Choice)
                .required()
                .with_options(vec!["Yes".to_string(), "No".to_string()]),
            FieldDef::new("stenosis_pct", "Stenosis percentage", FieldKind::Number),
            FieldDef::new("impression", "Impression", FieldKind::Text).required(),
        ],
        ui: UiSpec {
            rules: vec![VisibilityRule::hide_when(
                Condition::eq("stenosis", FieldValue::choice("No")),
                vec!["stenosis_pct".to_string()],
            )],
            paired_groups: vec![PairedGroup {
                label: "Common carotid".to_string(),
                left_prefix: "cca_left_".to_string(),
                right_prefix: "cca_right_".to_string(),
            }],
        },
    }
}

#[test]
fn registry_resolves_by_code() {
    let registry = TemplateRegistry::new(vec![carotid_template()]).expect("valid registry");
    assert_eq!(registry.len(), 1);
    let template = registry.get("doppler_carotid").expect("template");
    assert_eq!(template.schema_version, 2);
    assert!(registry.get("unknown").is_none());
}

#[test]
fn duplicate_codes_rejected() {
    let result = TemplateRegistry::new(vec![carotid_template(), carotid_template()]);
    assert!(matches!(result, Err(TemplateError::DuplicateCode { code }) if code == "doppler_carotid"));
}

#[test]
fn rule_on_undeclared_field_rejected() {
    let mut template = carotid_template();
    template.ui.rules.push(VisibilityRule::hide_when(
        Condition::eq("no_such_field", FieldValue::choice("x")),
        vec!["impression".to_string()],
    ));
    let result = TemplateRegistry::new(vec![template]);
    assert!(matches!(
        result,
        Err(TemplateError::UnknownConditionField { key, .. }) if key == "no_such_field"
    ));
}

#[test]
fn hide_of_undeclared_field_rejected() {
    let mut template = carotid_template();
    template.ui.rules.push(VisibilityRule::hide_when(
        Condition::eq("stenosis", FieldValue::choice("Yes")),
        vec!["ghost".to_string()],
    ));
    let result = TemplateRegistry::new(vec![template]);
    assert!(matches!(
        result,
        Err(TemplateError::UnknownHiddenField { key, .. }) if key == "ghost"
    ));
}

#[test]
fn dangling_paired_prefix_rejected() {
    let mut template = carotid_template();
    template.ui.paired_groups.push(PairedGroup {
        label: "Vertebral".to_string(),
        left_prefix: "vert_left_".to_string(),
        right_prefix: "vert_right_".to_string(),
    });
    let result = TemplateRegistry::new(vec![template]);
    assert!(matches!(
        result,
        Err(TemplateError::DanglingPairedPrefix { prefix, .. }) if prefix == "vert_left_"
    ));
}

#[test]
fn choice_field_without_options_rejected() {
    let mut template = carotid_template();
    template
        .fields
        .push(FieldDef::new("laterality", "Laterality", FieldKind::Choice));
    let result = TemplateRegistry::new(vec![template]);
    assert!(matches!(
        result,
        Err(TemplateError::ChoiceWithoutOptions { key, .. }) if key == "laterality"
    ));
}

#[test]
fn paired_groups_do_not_affect_hidden_set() {
    let template = carotid_template();
    let values = crf_model::ValueMap::new();
    let hidden = crf_rules::evaluate(&template.ui.rules, &values).expect("evaluate");
    // Rules alone decide hiding; the paired group covering cca_* fields
    // must not contribute anything.
    assert!(hidden.is_empty());
}

#[test]
fn load_dir_reads_json_templates() {
    let dir = tempfile::tempdir().expect("tempdir");
    let template = carotid_template();
    let json = serde_json::to_string_pretty(&template).expect("serialize");
    std::fs::write(dir.path().join("doppler_carotid.json"), json).expect("write");
    std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write");

    let registry = TemplateRegistry::load_dir(dir.path()).expect("load");
    assert_eq!(registry.len(), 1);
    assert!(registry.get("doppler_carotid").is_some());
}

#[test]
fn load_dir_surfaces_parse_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("broken.json"), "{not json").expect("write");

    let result = TemplateRegistry::load_dir(dir.path());
    assert!(matches!(result, Err(TemplateError::Parse { .. })));
}
