//! Primer-BLAST client abstraction
//!
//! The relaxation engine never talks HTTP itself. It needs exactly two things
//! from the outside world: a way to submit a search, and a handle on the
//! submitted job that can be polled and then inspected. [`BlastClient`] and
//! [`BlastJob`] are that contract; [`ncbi::NcbiClient`] implements it against
//! NCBI's web service and tests implement it with scripted stubs.
//!
//! A job is either [`JobState::Pending`] or [`JobState::Complete`]. The
//! inspection methods (`check_*`, `parse_primers`) are only meaningful on a
//! complete job and implementations reject them otherwise.

use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::types::{ParameterSet, PrimerPair};

use crate::attempt::Status;

pub mod ncbi;
pub mod page;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Whether a submitted job still needs polling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// The service is still computing; poll again later
    Pending,

    /// Results are available for inspection
    Complete,
}

/// Submits primer searches
#[async_trait]
pub trait BlastClient: Send + Sync {
    /// Returns the name of the client (e.g., "ncbi")
    fn name(&self) -> &str;

    /// Submit a search for `target` with the given constraints
    ///
    /// `status` is the relaxation label the search runs under. Clients may
    /// use it for logging; it is never sent to the service.
    ///
    /// # Errors
    /// * `EngineError::Submission` - malformed parameters or transport failure
    async fn submit(
        &self,
        target: &str,
        parameters: &ParameterSet,
        status: Status,
    ) -> Result<Box<dyn BlastJob>>;
}

/// Handle on one submitted search
#[async_trait]
pub trait BlastJob: Send {
    /// Current state of the job
    fn state(&self) -> JobState;

    /// Refresh the job from the service. Safe to call repeatedly.
    ///
    /// # Errors
    /// * `EngineError::Poll` - transport failure
    async fn poll_results(&mut self) -> Result<()>;

    /// Report whether the template turned out to contain no intron
    fn check_introns(&mut self) -> Result<bool>;

    /// Resolve the service's "similar templates" prompt, if any
    ///
    /// Resolving it starts a secondary computation, leaving the job
    /// `Pending` again.
    async fn check_similar_templates(&mut self) -> Result<()>;

    /// Report whether no primers were found
    fn check_success(&mut self) -> Result<bool>;

    /// Report whether every primer pair has off-target products
    fn check_specificity(&mut self) -> Result<bool>;

    /// Extract the specific primer pairs
    ///
    /// # Errors
    /// * `EngineError::Parse` - no primer pair could be read
    fn parse_primers(&mut self) -> Result<Vec<PrimerPair>>;
}
