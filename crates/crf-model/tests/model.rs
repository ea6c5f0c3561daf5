//! Tests for crf-model types.

use crf_model::{
    FieldKind, FieldValue, NarrativeDocument, NarrativeSection, PublishedSnapshot, ReportDraft,
    ReportStatus, SnapshotMeta, ValueMap,
};

#[test]
fn draft_starts_in_draft_status_with_empty_values() {
    let draft = ReportDraft::new("wi-100", "doppler_carotid", 3);
    assert_eq!(draft.status, ReportStatus::Draft);
    assert!(draft.values.is_empty());
    assert!(draft.corrections.is_empty());
    assert_eq!(draft.schema_version, 3);
}

#[test]
fn draft_round_trips_through_json() {
    let mut draft = ReportDraft::new("wi-100", "doppler_carotid", 1);
    draft
        .values
        .insert("stenosis".to_string(), FieldValue::choice("Yes"));
    draft
        .values
        .insert("stenosis_pct".to_string(), FieldValue::Number(42.5));

    let json = serde_json::to_string(&draft).expect("serialize draft");
    let round: ReportDraft = serde_json::from_str(&json).expect("deserialize draft");
    assert_eq!(round, draft);
}

#[test]
fn snapshot_meta_projects_listing_fields() {
    let mut values = ValueMap::new();
    values.insert("impression".to_string(), FieldValue::text("normal study"));
    let snapshot = PublishedSnapshot {
        work_item_id: "wi-100".to_string(),
        version: 2,
        values,
        narrative: NarrativeDocument {
            sections: vec![NarrativeSection {
                title: "Findings".to_string(),
                body: "Normal study.".to_string(),
            }],
        },
        schema_version: 1,
        checksum: "deadbeef".to_string(),
        published_by: "dr.adams".to_string(),
        published_at: chrono::Utc::now(),
        notes: "corrected laterality".to_string(),
    };

    let meta = SnapshotMeta::from(&snapshot);
    assert_eq!(meta.version, 2);
    assert_eq!(meta.published_by, "dr.adams");
    assert_eq!(meta.notes, "corrected laterality");
    assert_eq!(meta.checksum, "deadbeef");
}

#[test]
fn status_serializes_lowercase() {
    assert_eq!(
        serde_json::to_string(&ReportStatus::Submitted).expect("serialize"),
        "\"submitted\""
    );
    assert_eq!(FieldKind::Choice.to_string(), "choice");
}
