//! JSON file persistence for the whole store state.
//!
//! Writes are atomic: serialize to a temp file next to the target, fsync,
//! then rename. A schema version field guards loads from files written by
//! a newer build.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crf_model::report::{PublishedSnapshot, ReportDraft};

pub const CURRENT_STATE_VERSION: u32 = 1;

/// Persistence error for the file-backed store.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize store state: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("failed to parse store state {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("store state version {found} is not supported (maximum: {max_supported})")]
    UnsupportedVersion { found: u32, max_supported: u32 },
}

impl StateError {
    fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// Serializable snapshot of everything the report service owns: work item
/// registrations, live drafts, and the published history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreState {
    pub state_version: u32,
    /// `work_item_id -> template_code` registrations.
    #[serde(default)]
    pub work_items: BTreeMap<String, String>,
    #[serde(default)]
    pub drafts: Vec<ReportDraft>,
    #[serde(default)]
    pub snapshots: Vec<PublishedSnapshot>,
}

impl StoreState {
    pub fn new() -> Self {
        Self {
            state_version: CURRENT_STATE_VERSION,
            ..Self::default()
        }
    }
}

/// Write the state to `path` atomically.
pub fn save_state(state: &StoreState, path: &Path) -> Result<(), StateError> {
    let json = serde_json::to_vec_pretty(state).map_err(StateError::Serialize)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| StateError::io("create directory", parent, e))?;
    }

    let temp_path = path.with_extension("json.tmp");
    let mut file =
        File::create(&temp_path).map_err(|e| StateError::io("create", &temp_path, e))?;
    file.write_all(&json)
        .map_err(|e| StateError::io("write", &temp_path, e))?;
    file.sync_all()
        .map_err(|e| StateError::io("sync", &temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| StateError::io("rename", &temp_path, e))?;

    tracing::debug!(path = %path.display(), "saved store state");
    Ok(())
}

/// Load a state file written by [`save_state`].
pub fn load_state(path: &Path) -> Result<StoreState, StateError> {
    let contents = fs::read_to_string(path).map_err(|e| StateError::io("read", path, e))?;
    let state: StoreState = serde_json::from_str(&contents).map_err(|source| StateError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if state.state_version > CURRENT_STATE_VERSION {
        return Err(StateError::UnsupportedVersion {
            found: state.state_version,
            max_supported: CURRENT_STATE_VERSION,
        });
    }
    tracing::debug!(path = %path.display(), "loaded store state");
    Ok(state)
}
