//! Template registry: resolves a template code to its field schema and UI
//! specification (visibility rules, paired-layout hints).
//!
//! The registry is read-only after construction. It validates template
//! structure up front so rule evaluation never meets a reference to an
//! undeclared field at runtime.

pub mod error;
pub mod registry;

pub use error::TemplateError;
pub use registry::{TemplateRegistry, validate_template};
