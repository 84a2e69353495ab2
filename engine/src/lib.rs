//! Primer-BLAST Engine Library
//!
//! This library provides the core functionality of the primerblast engine.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Telemetry and Observability
pub mod telemetry;

/// Global contact pacing module
pub mod rate_limiter;

/// Primer-BLAST client abstraction and NCBI implementation
pub mod blast;

/// Single search attempts
pub mod attempt;

/// Progressive constraint relaxation
pub mod relaxation;

/// Cross-gene worker pool
pub mod dispatch;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
