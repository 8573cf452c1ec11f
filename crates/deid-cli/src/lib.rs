//! CLI library components for the anonymization engine.

pub mod logging;
pub mod report;
