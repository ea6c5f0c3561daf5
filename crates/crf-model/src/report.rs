use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::ValueMap;

/// Review status of a report draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Draft,
    Submitted,
    Verified,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Submitted => "submitted",
            ReportStatus::Verified => "verified",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Audit record of a `return_for_correction` transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionEntry {
    pub reason: String,
    pub actor: String,
    pub returned_at: DateTime<Utc>,
    pub from_status: ReportStatus,
}

/// The single mutable value set attached to a work item.
///
/// Values are writable only while `status == Draft`; every other status
/// rejects direct value writes. Exactly one live draft exists per work
/// item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDraft {
    pub work_item_id: String,
    pub template_code: String,
    pub schema_version: u32,
    pub values: ValueMap,
    pub status: ReportStatus,
    pub last_saved_at: DateTime<Utc>,
    #[serde(default)]
    pub corrections: Vec<CorrectionEntry>,
}

impl ReportDraft {
    /// A fresh draft for a work item, created on first access.
    pub fn new(
        work_item_id: impl Into<String>,
        template_code: impl Into<String>,
        schema_version: u32,
    ) -> Self {
        Self {
            work_item_id: work_item_id.into(),
            template_code: template_code.into(),
            schema_version,
            values: ValueMap::new(),
            status: ReportStatus::Draft,
            last_saved_at: Utc::now(),
            corrections: Vec::new(),
        }
    }
}

/// One titled section of a generated narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeSection {
    pub title: String,
    pub body: String,
}

/// Narrative text derived from report values by an external generator.
/// Opaque for snapshot and checksum purposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NarrativeDocument {
    pub sections: Vec<NarrativeSection>,
}

/// An immutable, versioned record of published report content.
///
/// `(work_item_id, version)` is unique; versions start at 1 and are
/// gapless per work item. The checksum is computed once at publish time
/// and only ever recomputed transiently for integrity comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedSnapshot {
    pub work_item_id: String,
    pub version: u32,
    pub values: ValueMap,
    pub narrative: NarrativeDocument,
    pub schema_version: u32,
    pub checksum: String,
    pub published_by: String,
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
}

/// Listing projection of a snapshot, without the content payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub version: u32,
    pub published_by: String,
    pub published_at: DateTime<Utc>,
    pub notes: String,
    pub checksum: String,
}

impl From<&PublishedSnapshot> for SnapshotMeta {
    fn from(snapshot: &PublishedSnapshot) -> Self {
        Self {
            version: snapshot.version,
            published_by: snapshot.published_by.clone(),
            published_at: snapshot.published_at,
            notes: snapshot.notes.clone(),
            checksum: snapshot.checksum.clone(),
        }
    }
}

/// Response shape of the `get_values` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportState {
    pub status: ReportStatus,
    pub values: ValueMap,
    pub is_published: bool,
}
