//! External collaborator seams: narrative generation and artifact
//! rendering.
//!
//! Both are consumed, not owned, by the lifecycle: production deployments
//! plug in their own implementations. The built-ins here are deliberately
//! plain and exist so the CLI and tests have something end-to-end.

use crf_model::report::{NarrativeDocument, NarrativeSection, PublishedSnapshot};
use crf_model::template::Template;
use crf_model::value::{ValueMap, value_or_absent};

/// Produces the narrative text for a report's values.
pub trait NarrativeGenerator: Send + Sync {
    fn generate(&self, template: &Template, values: &ValueMap) -> NarrativeDocument;
}

/// Renders a published snapshot into the downloadable document bytes.
pub trait ArtifactRenderer: Send + Sync {
    fn render(&self, snapshot: &PublishedSnapshot) -> Vec<u8>;
}

/// Built-in generator: one "Findings" section listing each applicable
/// field as `Label: value` in schema order.
#[derive(Debug, Default, Clone, Copy)]
pub struct SectionNarrative;

impl NarrativeGenerator for SectionNarrative {
    fn generate(&self, template: &Template, values: &ValueMap) -> NarrativeDocument {
        // Values reaching publication already passed rule evaluation at
        // submit, so a failure here cannot occur for well-formed reports.
        let hidden = crf_rules::evaluate(&template.ui.rules, values).unwrap_or_default();

        let mut lines = Vec::new();
        for field in &template.fields {
            if hidden.contains(&field.key) {
                continue;
            }
            let value = value_or_absent(values, &field.key);
            if value.is_absent() {
                continue;
            }
            lines.push(format!("{}: {}", field.label, value));
        }

        NarrativeDocument {
            sections: vec![NarrativeSection {
                title: "Findings".to_string(),
                body: lines.join("\n"),
            }],
        }
    }
}

/// Built-in renderer: a plain-text document with a header and the
/// narrative sections.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextRenderer;

impl ArtifactRenderer for PlainTextRenderer {
    fn render(&self, snapshot: &PublishedSnapshot) -> Vec<u8> {
        let mut out = String::new();
        out.push_str(&format!(
            "Report {} (version {})\nPublished by {} at {}\n",
            snapshot.work_item_id,
            snapshot.version,
            snapshot.published_by,
            snapshot.published_at.to_rfc3339(),
        ));
        if !snapshot.notes.is_empty() {
            out.push_str(&format!("Notes: {}\n", snapshot.notes));
        }
        for section in &snapshot.narrative.sections {
            out.push_str(&format!("\n== {} ==\n{}\n", section.title, section.body));
        }
        out.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crf_model::template::{Condition, FieldDef, UiSpec, VisibilityRule};
    use crf_model::value::{FieldKind, FieldValue};

    fn template() -> Template {
        Template {
            code: "echo".to_string(),
            schema_version: 1,
            fields: vec![
                FieldDef::new("effusion", "Pericardial effusion", FieldKind::Choice)
                    .with_options(vec!["Yes".to_string(), "No".to_string()]),
                FieldDef::new("effusion_size", "Effusion size", FieldKind::Text),
            ],
            ui: UiSpec {
                rules: vec![VisibilityRule::hide_when(
                    Condition::eq("effusion", FieldValue::choice("No")),
                    vec!["effusion_size".to_string()],
                )],
                paired_groups: Vec::new(),
            },
        }
    }

    #[test]
    fn narrative_skips_hidden_and_absent_fields() {
        let template = template();
        let mut values = ValueMap::new();
        values.insert("effusion".to_string(), FieldValue::choice("No"));
        // stale value behind a hidden field must not leak into the narrative
        values.insert("effusion_size".to_string(), FieldValue::text("large"));

        let narrative = SectionNarrative.generate(&template, &values);
        assert_eq!(narrative.sections.len(), 1);
        let body = &narrative.sections[0].body;
        assert!(body.contains("Pericardial effusion: No"));
        assert!(!body.contains("Effusion size"));
    }

    #[test]
    fn renderer_includes_header_and_sections() {
        let template = template();
        let mut values = ValueMap::new();
        values.insert("effusion".to_string(), FieldValue::choice("Yes"));
        values.insert("effusion_size".to_string(), FieldValue::text("trace"));
        let narrative = SectionNarrative.generate(&template, &values);

        let snapshot = PublishedSnapshot {
            work_item_id: "wi-7".to_string(),
            version: 1,
            values,
            narrative,
            schema_version: 1,
            checksum: String::new(),
            published_by: "dr.osei".to_string(),
            published_at: chrono::Utc::now(),
            notes: "initial".to_string(),
        };
        let text = String::from_utf8(PlainTextRenderer.render(&snapshot)).expect("utf8");
        assert!(text.contains("Report wi-7 (version 1)"));
        assert!(text.contains("Notes: initial"));
        assert!(text.contains("Effusion size: trace"));
    }
}
