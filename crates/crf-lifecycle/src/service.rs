//! Transport-agnostic report service: the operation contract the client
//! application consumes.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use crf_model::report::{
    CorrectionEntry, PublishedSnapshot, ReportState, ReportStatus, SnapshotMeta,
};
use crf_model::template::Template;
use crf_model::value::ValueMap;
use crf_model::{ReportError, Result, ValidationFailure};
use crf_rules::RuleError;
use crf_store::checksum::{IntegrityReport, snapshot_checksum};
use crf_store::{DraftStore, SnapshotStore, StoreState};
use crf_templates::TemplateRegistry;

use crate::collaborators::{
    ArtifactRenderer, NarrativeGenerator, PlainTextRenderer, SectionNarrative,
};
use crate::transitions::{ReportAction, next_status};

/// The literal confirmation token `publish` requires. Compared exactly;
/// no case folding.
pub const PUBLISH_CONFIRM_TOKEN: &str = "PUBLISH";

/// Clinical report service over the template registry, draft store, and
/// snapshot store.
///
/// All operations are synchronous request/response. `save` is
/// last-write-wins by design (drafts are single-editor by convention);
/// `publish` is the one operation with a real mutual-exclusion guarantee,
/// provided by the snapshot store's version uniqueness.
pub struct ReportService {
    registry: Arc<TemplateRegistry>,
    drafts: DraftStore,
    snapshots: SnapshotStore,
    work_items: Mutex<BTreeMap<String, String>>,
    narrative: Box<dyn NarrativeGenerator>,
    renderer: Box<dyn ArtifactRenderer>,
}

impl ReportService {
    pub fn new(registry: Arc<TemplateRegistry>) -> Self {
        Self {
            registry,
            drafts: DraftStore::new(),
            snapshots: SnapshotStore::new(),
            work_items: Mutex::new(BTreeMap::new()),
            narrative: Box::new(SectionNarrative),
            renderer: Box::new(PlainTextRenderer),
        }
    }

    #[must_use]
    pub fn with_narrative(mut self, narrative: Box<dyn NarrativeGenerator>) -> Self {
        self.narrative = narrative;
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Box<dyn ArtifactRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Rebuild a service from persisted state.
    ///
    /// Registrations pointing at templates the registry no longer carries
    /// are kept but logged; operations on them fail with `NotFound` until
    /// the template returns.
    pub fn from_state(registry: Arc<TemplateRegistry>, state: StoreState) -> Result<Self> {
        for (work_item_id, template_code) in &state.work_items {
            if registry.get(template_code).is_none() {
                tracing::warn!(
                    work_item_id,
                    template_code,
                    "work item references a template missing from the registry"
                );
            }
        }
        Ok(Self {
            registry,
            drafts: DraftStore::from_drafts(state.drafts),
            snapshots: SnapshotStore::from_snapshots(state.snapshots)?,
            work_items: Mutex::new(state.work_items),
            narrative: Box::new(SectionNarrative),
            renderer: Box::new(PlainTextRenderer),
        })
    }

    /// Export everything for persistence.
    pub fn to_state(&self) -> StoreState {
        let mut state = StoreState::new();
        state.work_items = self.lock_work_items().clone();
        state.drafts = self.drafts.drafts();
        state.snapshots = self.snapshots.all();
        state
    }

    /// Associate a work item with a template. Stands in for the
    /// out-of-scope administrative activation process.
    pub fn register_work_item(&self, work_item_id: &str, template_code: &str) -> Result<()> {
        if self.registry.get(template_code).is_none() {
            return Err(ReportError::not_found("template", template_code));
        }
        self.lock_work_items()
            .insert(work_item_id.to_string(), template_code.to_string());
        Ok(())
    }

    /// Resolve the template governing a work item's report.
    pub fn get_schema(&self, work_item_id: &str) -> Result<Template> {
        let template = self.template_for(work_item_id)?;
        // first access creates the draft
        self.drafts
            .open_or_create(work_item_id, &template.code, template.schema_version);
        Ok(template)
    }

    /// Current status, values, and publication flag for a work item.
    pub fn get_values(&self, work_item_id: &str) -> Result<ReportState> {
        let template = self.template_for(work_item_id)?;
        let draft =
            self.drafts
                .open_or_create(work_item_id, &template.code, template.schema_version);
        Ok(ReportState {
            status: draft.status,
            values: draft.values,
            is_published: self.snapshots.is_published(work_item_id),
        })
    }

    /// Persist draft values verbatim. Last-write-wins; only legal while
    /// the report is in `Draft`.
    pub fn save(&self, work_item_id: &str, values: ValueMap) -> Result<()> {
        let template = self.template_for(work_item_id)?;
        self.drafts
            .open_or_create(work_item_id, &template.code, template.schema_version);
        self.drafts.save_values(work_item_id, values)?;
        tracing::debug!(work_item_id, "saved draft values");
        Ok(())
    }

    /// Move a draft into review. Every required field that is not hidden
    /// for the current values must carry a non-empty value; failure
    /// returns the field-keyed error map and leaves the status at `Draft`.
    pub fn submit(&self, work_item_id: &str) -> Result<()> {
        let template = self.template_for(work_item_id)?;
        self.drafts.with_draft_mut(work_item_id, |draft| {
            let target = next_status(draft.status, ReportAction::Submit)?;
            if let Some(failure) = crf_rules::validate_required(&template, &draft.values)
                .map_err(rule_failure)?
            {
                tracing::debug!(
                    work_item_id,
                    fields = failure.field_errors.len(),
                    "submit rejected: required fields missing"
                );
                return Err(ReportError::Validation(failure));
            }
            draft.status = target;
            Ok(())
        })?;
        tracing::info!(work_item_id, "report submitted for review");
        Ok(())
    }

    /// Mark review complete. Does not publish.
    pub fn verify(&self, work_item_id: &str) -> Result<()> {
        self.drafts.with_draft_mut(work_item_id, |draft| {
            draft.status = next_status(draft.status, ReportAction::Verify)?;
            Ok(())
        })?;
        tracing::info!(work_item_id, "report verified");
        Ok(())
    }

    /// Send a submitted or verified report back to `Draft`, recording the
    /// reason for audit. Publication state is untouched.
    pub fn return_for_correction(
        &self,
        work_item_id: &str,
        reason: &str,
        actor: &str,
    ) -> Result<()> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ReportError::validation_message(
                "a correction reason is required",
            ));
        }
        self.drafts.with_draft_mut(work_item_id, |draft| {
            let target = next_status(draft.status, ReportAction::ReturnForCorrection)?;
            draft.corrections.push(CorrectionEntry {
                reason: reason.to_string(),
                actor: actor.to_string(),
                returned_at: Utc::now(),
                from_status: draft.status,
            });
            draft.status = target;
            Ok(())
        })?;
        tracing::info!(work_item_id, reason, "report returned for correction");
        Ok(())
    }

    /// Publish the verified content as the next immutable snapshot.
    ///
    /// Requires the exact confirmation token [`PUBLISH_CONFIRM_TOKEN`].
    /// Version allocation races surface as `Conflict`: the caller reloads
    /// and retries.
    pub fn publish(
        &self,
        work_item_id: &str,
        notes: &str,
        confirm_token: &str,
        actor: &str,
    ) -> Result<u32> {
        if confirm_token != PUBLISH_CONFIRM_TOKEN {
            return Err(ReportError::validation_message(format!(
                "publication requires the exact confirmation token \"{PUBLISH_CONFIRM_TOKEN}\""
            )));
        }

        let template = self.template_for(work_item_id)?;
        let draft = self.drafts.get(work_item_id)?;
        next_status(draft.status, ReportAction::Publish)?;

        let narrative = self.narrative.generate(&template, &draft.values);
        let checksum = snapshot_checksum(&draft.values, &narrative, draft.schema_version)
            .map_err(|e| ReportError::Storage(Box::new(e)))?;

        let version = self.snapshots.next_version(work_item_id);
        let snapshot = PublishedSnapshot {
            work_item_id: work_item_id.to_string(),
            version,
            values: draft.values,
            narrative,
            schema_version: draft.schema_version,
            checksum,
            published_by: actor.to_string(),
            published_at: Utc::now(),
            notes: notes.to_string(),
        };
        self.snapshots.insert(snapshot)?;
        tracing::info!(work_item_id, version, actor, "published report snapshot");
        Ok(version)
    }

    /// Published versions for a work item, oldest first.
    pub fn get_publish_history(&self, work_item_id: &str) -> Result<Vec<SnapshotMeta>> {
        self.template_for(work_item_id)?;
        Ok(self.snapshots.history(work_item_id))
    }

    /// Recompute and compare a stored snapshot's checksum. A mismatch is
    /// advisory and never blocks reading the snapshot.
    pub fn check_integrity(&self, work_item_id: &str, version: u32) -> Result<IntegrityReport> {
        self.snapshots.check_integrity(work_item_id, version)
    }

    /// Render the downloadable document for a published version.
    pub fn get_published_artifact(&self, work_item_id: &str, version: u32) -> Result<Vec<u8>> {
        let snapshot = self.snapshots.get(work_item_id, version)?;
        Ok(self.renderer.render(&snapshot))
    }

    /// Current review status of a work item, if a draft exists.
    pub fn status(&self, work_item_id: &str) -> Result<ReportStatus> {
        Ok(self.drafts.get(work_item_id)?.status)
    }

    fn template_for(&self, work_item_id: &str) -> Result<Template> {
        let code = self
            .lock_work_items()
            .get(work_item_id)
            .cloned()
            .ok_or_else(|| ReportError::not_found("work item", work_item_id))?;
        self.registry
            .get(&code)
            .cloned()
            .ok_or_else(|| ReportError::not_found("template", code))
    }

    fn lock_work_items(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.work_items
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A rule evaluation failure at submit means the stored values and the
/// template disagree on a field's kind; surface it as a field-keyed
/// validation problem the caller can fix.
fn rule_failure(error: RuleError) -> ReportError {
    match &error {
        RuleError::TypeMismatch { field_key, .. } => {
            let mut fields = BTreeMap::new();
            fields.insert(field_key.clone(), error.to_string());
            ReportError::Validation(ValidationFailure::fields(fields))
        }
        RuleError::MissingLiteral { .. } => ReportError::validation_message(error.to_string()),
    }
}
