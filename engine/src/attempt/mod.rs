//! Single search attempts
//!
//! [`AttemptRunner`] drives one Primer-BLAST search from submission to a
//! resolved [`Attempt`]:
//!
//! 1. submit, then poll every `poll_interval` while the job is pending
//! 2. on completion run the intron and similar-template checks, in that
//!    order, and poll again if the template check restarted the job
//! 3. run the success and specificity checks
//! 4. extract primers only when both verdicts are clean
//!
//! Errors from the client propagate unchanged; nothing here retries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use sdk::types::{ParameterSet, PrimerPair, QualityFlags};

use crate::blast::{BlastClient, BlastJob, JobState, Result};

/// Label of the search stage an attempt ran under, or its final verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "strict")]
    Strict,
    #[serde(rename = "GC1")]
    Gc1,
    #[serde(rename = "GC0")]
    Gc0,
    #[serde(rename = "GC_content")]
    GcContent,
    #[serde(rename = "Low_TM")]
    LowTm,
    #[serde(rename = "Potential_Dimers")]
    PotentialDimers,
    #[serde(rename = "Probable_Dimers")]
    ProbableDimers,
    #[serde(rename = "No_repeat_filter")]
    NoRepeatFilter,

    /// Ladder exhausted and primers still missing
    #[serde(rename = "primer_quality_too_low")]
    PrimerQualityTooLow,

    /// Ladder exhausted and every pair still off-target
    #[serde(rename = "no_specific_primers")]
    NoSpecificPrimers,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Strict => "strict",
            Status::Gc1 => "GC1",
            Status::Gc0 => "GC0",
            Status::GcContent => "GC_content",
            Status::LowTm => "Low_TM",
            Status::PotentialDimers => "Potential_Dimers",
            Status::ProbableDimers => "Probable_Dimers",
            Status::NoRepeatFilter => "No_repeat_filter",
            Status::PrimerQualityTooLow => "primer_quality_too_low",
            Status::NoSpecificPrimers => "no_specific_primers",
        }
    }

    /// True for the two "gave up" classifications
    pub fn is_failure(&self) -> bool {
        matches!(self, Status::PrimerQualityTooLow | Status::NoSpecificPrimers)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One resolved search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    /// Accession the search ran for
    pub target: String,

    /// Constraints the search ran with
    pub parameters: ParameterSet,

    /// Stage label, or the final classification once the ladder is done
    pub status: Status,

    /// Quality verdicts
    pub flags: QualityFlags,

    /// Specific primer pairs; empty unless `flags.is_acceptable()`
    pub primers: Vec<PrimerPair>,
}

/// Runs one search to completion
#[derive(Clone)]
pub struct AttemptRunner {
    client: Arc<dyn BlastClient>,
    poll_interval: Duration,
}

impl AttemptRunner {
    /// Create a new runner
    ///
    /// # Arguments
    /// * `client` - Search backend
    /// * `poll_interval` - Wait between two polls of the same job
    pub fn new(client: Arc<dyn BlastClient>, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    /// Submit a search and wait for its resolved, checked result
    pub async fn run(
        &self,
        target: &str,
        parameters: ParameterSet,
        status: Status,
    ) -> Result<Attempt> {
        debug!("Running Primer-BLAST for {} ({})", target, status);

        let mut job = self.client.submit(target, &parameters, status).await?;
        self.wait(target, job.as_mut()).await?;

        let has_no_intron = job.check_introns()?;
        job.check_similar_templates().await?;
        self.wait(target, job.as_mut()).await?;

        let flags = QualityFlags {
            has_no_intron,
            no_primers_found: job.check_success()?,
            off_targets: job.check_specificity()?,
        };

        let primers = if flags.is_acceptable() {
            job.parse_primers()?
        } else {
            Vec::new()
        };

        debug!(
            "{} ({}): no_intron={}, no_primers={}, off_targets={}, pairs={}",
            target,
            status,
            flags.has_no_intron,
            flags.no_primers_found,
            flags.off_targets,
            primers.len()
        );

        Ok(Attempt {
            target: target.to_string(),
            parameters,
            status,
            flags,
            primers,
        })
    }

    /// Poll until the job leaves the pending state
    ///
    /// Each poll completes before the next sleep starts, so polls of one job
    /// never overlap.
    async fn wait(&self, target: &str, job: &mut dyn BlastJob) -> Result<()> {
        while job.state() == JobState::Pending {
            debug!(
                "{}: waiting {}s for Primer-BLAST",
                target,
                self.poll_interval.as_secs()
            );
            tokio::time::sleep(self.poll_interval).await;
            job.poll_results().await?;
        }
        Ok(())
    }
}
