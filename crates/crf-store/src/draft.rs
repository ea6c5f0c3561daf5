//! Draft store: one mutable value set per work item.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use crf_model::report::{ReportDraft, ReportStatus};
use crf_model::value::ValueMap;
use crf_model::{ReportError, Result};

/// Holds the single live draft per work item.
///
/// Values are writable only while the draft is in `Draft` status; every
/// other status rejects direct value writes. Lifecycle transitions go
/// through [`DraftStore::with_draft_mut`] so read-modify-write is atomic
/// per store.
#[derive(Debug, Default)]
pub struct DraftStore {
    drafts: Mutex<BTreeMap<String, ReportDraft>>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted drafts.
    pub fn from_drafts(drafts: Vec<ReportDraft>) -> Self {
        let map = drafts
            .into_iter()
            .map(|draft| (draft.work_item_id.clone(), draft))
            .collect();
        Self {
            drafts: Mutex::new(map),
        }
    }

    /// Return the draft for a work item, creating it on first access.
    pub fn open_or_create(
        &self,
        work_item_id: &str,
        template_code: &str,
        schema_version: u32,
    ) -> ReportDraft {
        let mut drafts = self.lock();
        drafts
            .entry(work_item_id.to_string())
            .or_insert_with(|| {
                tracing::info!(work_item_id, template_code, "creating draft on first access");
                ReportDraft::new(work_item_id, template_code, schema_version)
            })
            .clone()
    }

    pub fn get(&self, work_item_id: &str) -> Result<ReportDraft> {
        self.lock()
            .get(work_item_id)
            .cloned()
            .ok_or_else(|| ReportError::not_found("report draft", work_item_id))
    }

    /// Overwrite the draft values verbatim (last-write-wins).
    ///
    /// # Errors
    ///
    /// `State` if the draft is not in `Draft` status; `NotFound` if no
    /// draft exists for the work item.
    pub fn save_values(&self, work_item_id: &str, values: ValueMap) -> Result<()> {
        self.with_draft_mut(work_item_id, |draft| {
            if draft.status != ReportStatus::Draft {
                return Err(ReportError::State {
                    action: "save",
                    status: draft.status,
                });
            }
            draft.values = values;
            draft.last_saved_at = Utc::now();
            Ok(())
        })
    }

    /// Run a mutation against the stored draft under the store lock.
    ///
    /// The closure's error aborts the mutation; the draft is only updated
    /// when it returns `Ok`.
    pub fn with_draft_mut<T>(
        &self,
        work_item_id: &str,
        f: impl FnOnce(&mut ReportDraft) -> Result<T>,
    ) -> Result<T> {
        let mut drafts = self.lock();
        let draft = drafts
            .get_mut(work_item_id)
            .ok_or_else(|| ReportError::not_found("report draft", work_item_id))?;
        let mut candidate = draft.clone();
        let outcome = f(&mut candidate)?;
        *draft = candidate;
        Ok(outcome)
    }

    /// All live drafts, for persistence.
    pub fn drafts(&self) -> Vec<ReportDraft> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, ReportDraft>> {
        self.drafts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
