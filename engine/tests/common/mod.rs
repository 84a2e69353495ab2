//! Deterministic Primer-BLAST stand-in shared by the integration tests
//!
//! The stub decides every verdict from the submitted parameters through an
//! oracle closure, so a scenario is fully described by one function.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use primerblast_engine::attempt::Status;
use primerblast_engine::blast::{BlastClient, BlastJob, JobState, Result};
use sdk::errors::EngineError;
use sdk::types::{ParameterSet, Primer, PrimerPair, QualityFlags};

pub type Oracle = Arc<dyn Fn(&str, &ParameterSet) -> QualityFlags + Send + Sync>;

/// One recorded submission
#[derive(Debug, Clone)]
pub struct Submission {
    pub target: String,
    pub status: Status,
    pub parameters: ParameterSet,
}

pub struct StubClient {
    oracle: Oracle,
    polls_per_job: usize,
    fail_on_submission: Option<usize>,
    submissions: Mutex<Vec<Submission>>,
    live_jobs: Arc<AtomicUsize>,
    peak_jobs: Arc<AtomicUsize>,
}

impl StubClient {
    pub fn new(oracle: impl Fn(&str, &ParameterSet) -> QualityFlags + Send + Sync + 'static) -> Self {
        Self {
            oracle: Arc::new(oracle),
            polls_per_job: 0,
            fail_on_submission: None,
            submissions: Mutex::new(Vec::new()),
            live_jobs: Arc::new(AtomicUsize::new(0)),
            peak_jobs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Keep each job pending for `polls` polls
    pub fn with_polls(mut self, polls: usize) -> Self {
        self.polls_per_job = polls;
        self
    }

    /// Fail the n-th submission (zero-based) with a transport error
    pub fn failing_on(mut self, index: usize) -> Self {
        self.fail_on_submission = Some(index);
        self
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn statuses_for(&self, target: &str) -> Vec<Status> {
        self.submissions()
            .into_iter()
            .filter(|s| s.target == target)
            .map(|s| s.status)
            .collect()
    }

    /// Most jobs alive at the same time
    pub fn peak_jobs(&self) -> usize {
        self.peak_jobs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlastClient for StubClient {
    fn name(&self) -> &str {
        "stub"
    }

    async fn submit(
        &self,
        target: &str,
        parameters: &ParameterSet,
        status: Status,
    ) -> Result<Box<dyn BlastJob>> {
        let index = {
            let mut submissions = self.submissions.lock().unwrap();
            submissions.push(Submission {
                target: target.to_string(),
                status,
                parameters: parameters.clone(),
            });
            submissions.len() - 1
        };

        if self.fail_on_submission == Some(index) {
            return Err(EngineError::Submission("connection refused".into()));
        }

        let live = self.live_jobs.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_jobs.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(StubJob {
            flags: (self.oracle)(target, parameters),
            remaining: self.polls_per_job,
            live_jobs: Arc::clone(&self.live_jobs),
        }))
    }
}

struct StubJob {
    flags: QualityFlags,
    remaining: usize,
    live_jobs: Arc<AtomicUsize>,
}

impl Drop for StubJob {
    fn drop(&mut self) {
        self.live_jobs.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlastJob for StubJob {
    fn state(&self) -> JobState {
        if self.remaining > 0 {
            JobState::Pending
        } else {
            JobState::Complete
        }
    }

    async fn poll_results(&mut self) -> Result<()> {
        self.remaining = self.remaining.saturating_sub(1);
        Ok(())
    }

    fn check_introns(&mut self) -> Result<bool> {
        Ok(self.flags.has_no_intron)
    }

    async fn check_similar_templates(&mut self) -> Result<()> {
        Ok(())
    }

    fn check_success(&mut self) -> Result<bool> {
        Ok(self.flags.no_primers_found)
    }

    fn check_specificity(&mut self) -> Result<bool> {
        Ok(self.flags.off_targets)
    }

    fn parse_primers(&mut self) -> Result<Vec<PrimerPair>> {
        assert!(
            self.flags.is_acceptable(),
            "parse_primers called on a disqualified attempt"
        );
        Ok(vec![pair(1)])
    }
}

pub fn pair(rank: u32) -> PrimerPair {
    let primer = |sequence: &str, strand: &str, start: u32| Primer {
        sequence: sequence.to_string(),
        strand: strand.to_string(),
        length: sequence.len() as u32,
        start,
        stop: start + sequence.len() as u32 - 1,
        tm: 59.9,
        gc_percent: 50.0,
        self_complementarity: 3.0,
        self_3prime_complementarity: 1.0,
    };
    PrimerPair {
        rank,
        forward: primer("ACGTGCTAGCTAGCTAGGCA", "Plus", 101),
        reverse: primer("TTGCAGCTAGGATCGATCGG", "Minus", 211),
        product_length: 130,
    }
}

pub fn flags(has_no_intron: bool, no_primers_found: bool, off_targets: bool) -> QualityFlags {
    QualityFlags {
        has_no_intron,
        no_primers_found,
        off_targets,
    }
}
