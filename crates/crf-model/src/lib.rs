pub mod error;
pub mod report;
pub mod template;
pub mod value;

pub use error::{ReportError, Result, ValidationFailure};
pub use report::{
    CorrectionEntry, NarrativeDocument, NarrativeSection, PublishedSnapshot, ReportDraft,
    ReportState, ReportStatus, SnapshotMeta,
};
pub use template::{CmpOp, Condition, FieldDef, PairedGroup, Template, UiSpec, VisibilityRule};
pub use value::{FieldKind, FieldValue, ValueMap, value_or_absent};
