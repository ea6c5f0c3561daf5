//! The legal status transition table.

use crf_model::report::ReportStatus;
use crf_model::{ReportError, Result};

/// Lifecycle actions a caller can invoke on a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportAction {
    Save,
    Submit,
    Verify,
    ReturnForCorrection,
    Publish,
}

impl ReportAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportAction::Save => "save",
            ReportAction::Submit => "submit",
            ReportAction::Verify => "verify",
            ReportAction::ReturnForCorrection => "return_for_correction",
            ReportAction::Publish => "publish",
        }
    }
}

/// Resolve the status an action leads to, or a `State` error when the
/// current status does not permit the action.
///
/// Publication is not a status: `Publish` keeps the report `Verified` and
/// the separate `is_published` flag (derived from snapshot existence)
/// records that at least one snapshot exists.
pub fn next_status(status: ReportStatus, action: ReportAction) -> Result<ReportStatus> {
    use ReportStatus::{Draft, Submitted, Verified};
    match (status, action) {
        (Draft, ReportAction::Save) => Ok(Draft),
        (Draft, ReportAction::Submit) => Ok(Submitted),
        (Submitted, ReportAction::Verify) => Ok(Verified),
        (Submitted | Verified, ReportAction::ReturnForCorrection) => Ok(Draft),
        (Verified, ReportAction::Publish) => Ok(Verified),
        (status, action) => Err(ReportError::State {
            action: action.as_str(),
            status,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ReportStatus::{Draft, Submitted, Verified};

    #[test]
    fn legal_transitions() {
        assert_eq!(next_status(Draft, ReportAction::Save).unwrap(), Draft);
        assert_eq!(next_status(Draft, ReportAction::Submit).unwrap(), Submitted);
        assert_eq!(next_status(Submitted, ReportAction::Verify).unwrap(), Verified);
        assert_eq!(
            next_status(Submitted, ReportAction::ReturnForCorrection).unwrap(),
            Draft
        );
        assert_eq!(
            next_status(Verified, ReportAction::ReturnForCorrection).unwrap(),
            Draft
        );
        assert_eq!(next_status(Verified, ReportAction::Publish).unwrap(), Verified);
    }

    #[test]
    fn illegal_transitions_are_state_errors() {
        for (status, action) in [
            (Draft, ReportAction::Verify),
            (Draft, ReportAction::Publish),
            (Draft, ReportAction::ReturnForCorrection),
            (Submitted, ReportAction::Save),
            (Submitted, ReportAction::Submit),
            (Submitted, ReportAction::Publish),
            (Verified, ReportAction::Save),
            (Verified, ReportAction::Submit),
            (Verified, ReportAction::Verify),
        ] {
            let err = next_status(status, action).expect_err("illegal");
            assert!(matches!(err, ReportError::State { .. }), "{status:?} {action:?}");
        }
    }
}
