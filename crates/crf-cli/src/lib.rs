//! CLI library components for the report lifecycle tool.

pub mod logging;
