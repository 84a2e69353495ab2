//! primerblast SDK
//!
//! Shared types and errors for the primerblast engine and anything that
//! consumes its reports.

/// Error types and handling
pub mod errors;

/// Search parameter and primer result types
pub mod types;

// Re-export commonly used types
pub use errors::{EngineError, EngineErrorExt};
pub use types::{ParameterSet, Primer, PrimerPair, QualityFlags};
