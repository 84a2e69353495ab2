//! Cross-gene dispatch
//!
//! Runs one relaxation sequence per target with a bounded number of
//! sequences in flight. The bound comes from NCBI's usage policy: every
//! in-flight job is polled once per `poll_interval` and the whole process may
//! contact the server at most once per `contact_interval`, so more than
//! `poll_interval / contact_interval` concurrent jobs would only queue on the
//! contact limiter.

use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use sdk::errors::EngineError;
use sdk::types::ParameterSet;

use crate::rate_limiter::max_workers;
use crate::relaxation::{RelaxationController, RelaxationReport};

/// Result of one target's sequence
#[derive(Debug, Serialize)]
pub struct TargetOutcome {
    pub target: String,

    #[serde(serialize_with = "serialize_result")]
    pub result: Result<RelaxationReport, EngineError>,
}

fn serialize_result<S>(
    result: &Result<RelaxationReport, EngineError>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(1))?;
    match result {
        Ok(report) => map.serialize_entry("report", report)?,
        Err(e) => map.serialize_entry("error", &e.to_string())?,
    }
    map.end()
}

/// Number of sequences allowed in flight
///
/// `min(targets, max_workers(poll, contact), max_jobs)`, never below one.
pub fn job_count(
    targets: usize,
    poll_interval: Duration,
    contact_interval: Duration,
    max_jobs: Option<usize>,
) -> usize {
    let cap = max_workers(poll_interval, contact_interval);
    let cap = max_jobs.map_or(cap, |jobs| jobs.min(cap));
    targets.min(cap).max(1)
}

/// Fans targets out over relaxation controllers
#[derive(Clone)]
pub struct Dispatcher {
    controller: RelaxationController,
    jobs: usize,
}

impl Dispatcher {
    pub fn new(controller: RelaxationController, jobs: usize) -> Self {
        Self {
            controller,
            jobs: jobs.max(1),
        }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Run every target to a terminal classification
    ///
    /// Outcomes are returned in input order. A failing target is reported in
    /// its outcome and does not stop the others.
    pub async fn run_all(&self, targets: &[String], template: &ParameterSet) -> Vec<TargetOutcome> {
        info!(
            "Dispatching {} target(s) with up to {} concurrent job(s)",
            targets.len(),
            self.jobs
        );

        stream::iter(targets.iter().cloned())
            .map(|target| {
                let controller = self.controller.clone();
                let template = template.clone();
                async move {
                    let result = controller.run_iterative(&target, &template).await;
                    if let Err(e) = &result {
                        warn!(gene = %target, "{}: search failed: {}", target, e);
                    }
                    TargetOutcome { target, result }
                }
            })
            .buffered(self.jobs)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_count_defaults() {
        // 60s poll over 3s contact allows 20 workers
        let poll = Duration::from_secs(60);
        let contact = Duration::from_secs(3);

        assert_eq!(job_count(100, poll, contact, None), 20);
        assert_eq!(job_count(5, poll, contact, None), 5);
        assert_eq!(job_count(100, poll, contact, Some(4)), 4);
        assert_eq!(job_count(100, poll, contact, Some(50)), 20);
    }

    #[test]
    fn test_job_count_never_zero() {
        assert_eq!(
            job_count(0, Duration::from_secs(60), Duration::from_secs(3), None),
            1
        );
        assert_eq!(
            job_count(10, Duration::from_secs(1), Duration::from_secs(3), None),
            1
        );
    }
}
