//! Core error handling, configuration, and recovery utilities.

pub mod config;
pub mod errors;
pub mod recover;

pub use config::{AnalyzerConfig, ConfigFormat, ConfigLoader, OverlayConfig};
pub use errors::{DermaError, DermaResult, ProcessingStage};
pub use recover::{first_success, Attempt};
