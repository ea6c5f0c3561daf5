//! Append-only store of published snapshots.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crf_model::report::{PublishedSnapshot, SnapshotMeta};
use crf_model::{ReportError, Result};

use crate::checksum::{IntegrityReport, verify_snapshot};

/// Append-only, versioned store of immutable published records.
///
/// Versions are allocated per work item, start at 1, and are gapless. The
/// uniqueness of `(work_item_id, version)` is the mechanism that rejects a
/// concurrent duplicate allocation: a caller that read a stale
/// `next_version` gets a `Conflict` on insert and must reload and retry.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    // version-ordered because versions are inserted gapless from 1
    snapshots: Mutex<BTreeMap<String, Vec<PublishedSnapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted snapshots.
    ///
    /// # Errors
    ///
    /// `Storage` if the persisted versions of any work item are not a
    /// gapless `1..=n` sequence — that indicates external mutation of the
    /// stored state.
    pub fn from_snapshots(snapshots: Vec<PublishedSnapshot>) -> Result<Self> {
        let mut map: BTreeMap<String, Vec<PublishedSnapshot>> = BTreeMap::new();
        for snapshot in snapshots {
            map.entry(snapshot.work_item_id.clone())
                .or_default()
                .push(snapshot);
        }
        for (work_item_id, versions) in &mut map {
            versions.sort_by_key(|s| s.version);
            for (idx, snapshot) in versions.iter().enumerate() {
                let expected = idx as u32 + 1;
                if snapshot.version != expected {
                    return Err(ReportError::Storage(
                        format!(
                            "work item {work_item_id}: snapshot versions are not gapless \
                             (expected {expected}, found {})",
                            snapshot.version
                        )
                        .into(),
                    ));
                }
            }
        }
        Ok(Self {
            snapshots: Mutex::new(map),
        })
    }

    /// The version the next publish for this work item will receive.
    pub fn next_version(&self, work_item_id: &str) -> u32 {
        let snapshots = self.lock();
        snapshots
            .get(work_item_id)
            .and_then(|versions| versions.last())
            .map_or(1, |snapshot| snapshot.version + 1)
    }

    /// Insert a new snapshot.
    ///
    /// # Errors
    ///
    /// `Conflict` if the snapshot's version is not exactly one past the
    /// stored maximum — either the version already exists (a concurrent
    /// publish won the race) or inserting it would leave a gap.
    pub fn insert(&self, snapshot: PublishedSnapshot) -> Result<()> {
        let mut snapshots = self.lock();
        let versions = snapshots.entry(snapshot.work_item_id.clone()).or_default();
        let expected = versions.last().map_or(1, |s| s.version + 1);
        if snapshot.version != expected {
            return Err(ReportError::Conflict {
                work_item_id: snapshot.work_item_id.clone(),
                version: snapshot.version,
            });
        }
        tracing::info!(
            work_item_id = %snapshot.work_item_id,
            version = snapshot.version,
            "stored published snapshot"
        );
        versions.push(snapshot);
        Ok(())
    }

    pub fn get(&self, work_item_id: &str, version: u32) -> Result<PublishedSnapshot> {
        self.lock()
            .get(work_item_id)
            .and_then(|versions| versions.iter().find(|s| s.version == version))
            .cloned()
            .ok_or_else(|| {
                ReportError::not_found("published snapshot", format!("{work_item_id} v{version}"))
            })
    }

    /// Listing of all published versions for a work item, oldest first.
    pub fn history(&self, work_item_id: &str) -> Vec<SnapshotMeta> {
        self.lock()
            .get(work_item_id)
            .map(|versions| versions.iter().map(SnapshotMeta::from).collect())
            .unwrap_or_default()
    }

    /// True once at least one snapshot exists for the work item.
    pub fn is_published(&self, work_item_id: &str) -> bool {
        self.lock()
            .get(work_item_id)
            .is_some_and(|versions| !versions.is_empty())
    }

    /// Recompute and compare the stored checksum of one snapshot.
    ///
    /// A mismatch is reported, never raised as an error: it must not block
    /// read access to the snapshot.
    pub fn check_integrity(&self, work_item_id: &str, version: u32) -> Result<IntegrityReport> {
        let snapshot = self.get(work_item_id, version)?;
        verify_snapshot(&snapshot).map_err(|e| ReportError::Storage(Box::new(e)))
    }

    /// Every stored snapshot, for persistence.
    pub fn all(&self) -> Vec<PublishedSnapshot> {
        self.lock().values().flatten().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<PublishedSnapshot>>> {
        self.snapshots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::snapshot_checksum;
    use crf_model::report::NarrativeDocument;
    use crf_model::value::{FieldValue, ValueMap};

    fn snapshot(work_item_id: &str, version: u32) -> PublishedSnapshot {
        let mut values = ValueMap::new();
        values.insert("impression".to_string(), FieldValue::text("normal"));
        let narrative = NarrativeDocument::default();
        let checksum = snapshot_checksum(&values, &narrative, 1).expect("checksum");
        PublishedSnapshot {
            work_item_id: work_item_id.to_string(),
            version,
            values,
            narrative,
            schema_version: 1,
            checksum,
            published_by: "dr.adams".to_string(),
            published_at: chrono::Utc::now(),
            notes: String::new(),
        }
    }

    #[test]
    fn versions_allocate_gapless_from_one() {
        let store = SnapshotStore::new();
        assert_eq!(store.next_version("wi-1"), 1);
        store.insert(snapshot("wi-1", 1)).expect("v1");
        assert_eq!(store.next_version("wi-1"), 2);
        store.insert(snapshot("wi-1", 2)).expect("v2");

        let history = store.history("wi-1");
        assert_eq!(
            history.iter().map(|m| m.version).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn duplicate_version_is_a_conflict() {
        let store = SnapshotStore::new();
        store.insert(snapshot("wi-1", 1)).expect("v1");
        let err = store.insert(snapshot("wi-1", 1)).expect_err("duplicate");
        assert!(matches!(err, ReportError::Conflict { version: 1, .. }));
    }

    #[test]
    fn gapped_version_is_a_conflict() {
        let store = SnapshotStore::new();
        store.insert(snapshot("wi-1", 1)).expect("v1");
        let err = store.insert(snapshot("wi-1", 3)).expect_err("gap");
        assert!(matches!(err, ReportError::Conflict { version: 3, .. }));
    }

    #[test]
    fn work_items_version_independently() {
        let store = SnapshotStore::new();
        store.insert(snapshot("wi-1", 1)).expect("v1");
        assert_eq!(store.next_version("wi-2"), 1);
        assert!(store.is_published("wi-1"));
        assert!(!store.is_published("wi-2"));
    }

    #[test]
    fn integrity_check_passes_for_untouched_snapshot() {
        let store = SnapshotStore::new();
        store.insert(snapshot("wi-1", 1)).expect("v1");
        let report = store.check_integrity("wi-1", 1).expect("check");
        assert!(report.matches);
    }

    #[test]
    fn rebuild_rejects_gapped_history() {
        let result = SnapshotStore::from_snapshots(vec![snapshot("wi-1", 1), snapshot("wi-1", 3)]);
        assert!(matches!(result, Err(ReportError::Storage(_))));
    }

    #[test]
    fn missing_snapshot_is_not_found() {
        let store = SnapshotStore::new();
        assert!(matches!(
            store.get("wi-1", 1),
            Err(ReportError::NotFound { .. })
        ));
    }
}
