//! Report lifecycle: the draft→submit→verify→publish state machine and
//! the transport-agnostic service facade over the template registry,
//! draft store, and snapshot store.

pub mod collaborators;
pub mod service;
pub mod transitions;

pub use collaborators::{
    ArtifactRenderer, NarrativeGenerator, PlainTextRenderer, SectionNarrative,
};
pub use service::{PUBLISH_CONFIRM_TOKEN, ReportService};
pub use transitions::{ReportAction, next_status};
