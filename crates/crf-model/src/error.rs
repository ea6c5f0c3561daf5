use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::report::ReportStatus;

/// Field-keyed validation failure, returned by `submit` and by malformed
/// inputs to lifecycle actions. Fully recoverable by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationFailure {
    /// `field_key -> message` for per-field problems.
    pub field_errors: BTreeMap<String, String>,
    /// Top-level message for failures not tied to one field.
    pub message: Option<String>,
}

impl ValidationFailure {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            field_errors: BTreeMap::new(),
            message: Some(message.into()),
        }
    }

    pub fn fields(field_errors: BTreeMap<String, String>) -> Self {
        Self {
            field_errors,
            message: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.field_errors.is_empty() && self.message.is_none()
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.message {
            write!(f, "{message}")?;
            if !self.field_errors.is_empty() {
                write!(f, "; ")?;
            }
        }
        let mut first = true;
        for (key, msg) in &self.field_errors {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {msg}")?;
            first = false;
        }
        Ok(())
    }
}

/// Error taxonomy of the report lifecycle.
///
/// Everything here is returned as a typed result; only `Storage` wraps
/// faults from below the service interface.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Required non-hidden field missing at submit, bad confirmation token,
    /// empty correction reason.
    #[error("validation failed: {0}")]
    Validation(ValidationFailure),

    /// Action invoked from a status that does not permit it. The caller
    /// should refresh its view of the report state.
    #[error("cannot {action} while report is {status}")]
    State {
        action: &'static str,
        status: ReportStatus,
    },

    /// A concurrent publish won the version allocation race. Reload and
    /// retry.
    #[error("publish conflict for work item {work_item_id}: version {version} already exists")]
    Conflict { work_item_id: String, version: u32 },

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Storage-layer failure below the service interface; fatal, bubbles
    /// unmodified.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ReportError {
    pub fn not_found(what: &'static str, id: impl Into<String>) -> Self {
        ReportError::NotFound {
            what,
            id: id.into(),
        }
    }

    pub fn validation_message(message: impl Into<String>) -> Self {
        ReportError::Validation(ValidationFailure::message(message))
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
