//! NCBI Primer-BLAST client
//!
//! Implements the [`BlastClient`] contract against the public Primer-BLAST
//! web tool (`primertool.cgi`).
//!
//! Key features:
//! - Form submission of the target accession plus every search constraint
//! - Job-key based polling of the interim "still searching" page
//! - Resubmission of the "similar templates" prompt
//! - Every request paced through the shared [`ContactLimiter`]

use async_trait::async_trait;
use reqwest::Client;
use sdk::errors::EngineError;
use sdk::types::{ParameterSet, PrimerPair};
use std::sync::Arc;
use std::time::Duration;

use super::page::ResultPage;
use super::{BlastClient, BlastJob, JobState, Result};
use crate::attempt::Status;
use crate::config::NcbiConfig;
use crate::rate_limiter::ContactLimiter;

const TOOL_PATH: &str = "primertool.cgi";

/// Primer-BLAST client over HTTP
#[derive(Debug, Clone)]
pub struct NcbiClient {
    /// Base URL of the tool (e.g. https://www.ncbi.nlm.nih.gov/tools/primer-blast)
    base_url: String,

    /// HTTP client for all requests
    http: Client,

    /// Process-wide contact pacing
    limiter: Arc<ContactLimiter>,
}

impl NcbiClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Tool base URL, without `primertool.cgi`
    /// * `timeout` - Per-request timeout
    /// * `limiter` - Contact limiter shared with every other client in the process
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        limiter: Arc<ContactLimiter>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(format!("primerblast/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EngineError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            limiter,
        })
    }

    /// Create a client from the `[ncbi]` config section
    pub fn from_config(config: &NcbiConfig, limiter: Arc<ContactLimiter>) -> Result<Self> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
            limiter,
        )
    }

    fn tool_url(&self) -> String {
        format!("{}/{}", self.base_url, TOOL_PATH)
    }
}

#[async_trait]
impl BlastClient for NcbiClient {
    fn name(&self) -> &str {
        "ncbi"
    }

    async fn submit(
        &self,
        target: &str,
        parameters: &ParameterSet,
        status: Status,
    ) -> Result<Box<dyn BlastJob>> {
        let mut form: Vec<(String, String)> = Vec::with_capacity(parameters.len() + 1);
        form.push(("INPUT_SEQUENCE".to_string(), target.to_string()));
        form.extend(
            parameters
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string())),
        );

        tracing::debug!(
            "Submitting {} to Primer-BLAST ({} constraints, status={})",
            target,
            parameters.len(),
            status
        );

        self.limiter.wait_turn().await;
        let response = self
            .http
            .post(self.tool_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| EngineError::Submission(describe_transport_error(&e, &self.base_url)))?;

        if !response.status().is_success() {
            return Err(EngineError::Submission(format!(
                "Primer-BLAST returned HTTP {} for {}",
                response.status(),
                target
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| EngineError::Submission(format!("Failed to read response: {}", e)))?;

        let job = NcbiJob::from_page(
            self.clone(),
            target,
            ResultPage::new(html),
            None,
        )
        .map_err(|e| match e {
            EngineError::Poll(msg) => EngineError::Submission(msg),
            other => other,
        })?;

        tracing::info!(
            "Submitted {} (status={}, job_key={})",
            target,
            status,
            job.job_key.as_deref().unwrap_or("-")
        );

        Ok(Box::new(job))
    }
}

/// A submitted Primer-BLAST job
#[derive(Debug)]
pub struct NcbiJob {
    client: NcbiClient,
    target: String,
    job_key: Option<String>,
    page: ResultPage,
    state: JobState,
}

impl NcbiJob {
    /// Build the job from the page the service just returned
    fn from_page(
        client: NcbiClient,
        target: &str,
        page: ResultPage,
        previous_key: Option<String>,
    ) -> Result<Self> {
        let job_key = page.job_key().or(previous_key);
        let state = if page.is_running() {
            JobState::Pending
        } else {
            JobState::Complete
        };

        if state == JobState::Pending && job_key.is_none() {
            return Err(EngineError::Poll(format!(
                "Primer-BLAST is still running {} but gave no job key",
                target
            )));
        }

        Ok(Self {
            client,
            target: target.to_string(),
            job_key,
            page,
            state,
        })
    }

    fn replace_page(&mut self, page: ResultPage) -> Result<()> {
        let next = NcbiJob::from_page(
            self.client.clone(),
            &self.target,
            page,
            self.job_key.clone(),
        )?;
        *self = next;
        Ok(())
    }

    fn complete_page(&self) -> Result<&ResultPage> {
        match self.state {
            JobState::Complete => Ok(&self.page),
            JobState::Pending => Err(EngineError::Poll(format!(
                "Job for {} is still running",
                self.target
            ))),
        }
    }
}

#[async_trait]
impl BlastJob for NcbiJob {
    fn state(&self) -> JobState {
        self.state
    }

    async fn poll_results(&mut self) -> Result<()> {
        if self.state == JobState::Complete {
            return Ok(());
        }
        let key = self.job_key.clone().ok_or_else(|| {
            EngineError::Poll(format!("No job key to poll for {}", self.target))
        })?;

        self.client.limiter.wait_turn().await;
        let response = self
            .client
            .http
            .get(self.client.tool_url())
            .query(&[("job_key", key.as_str())])
            .send()
            .await
            .map_err(|e| EngineError::Poll(describe_transport_error(&e, &self.client.base_url)))?;

        if !response.status().is_success() {
            return Err(EngineError::Poll(format!(
                "Primer-BLAST returned HTTP {} while polling {}",
                response.status(),
                self.target
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| EngineError::Poll(format!("Failed to read response: {}", e)))?;

        self.replace_page(ResultPage::new(html))
    }

    fn check_introns(&mut self) -> Result<bool> {
        Ok(self.complete_page()?.reports_no_intron())
    }

    async fn check_similar_templates(&mut self) -> Result<()> {
        let Some(fields) = self.complete_page()?.similar_templates_form() else {
            return Ok(());
        };

        tracing::info!(
            "{}: Primer-BLAST found similar templates, resubmitting its selection",
            self.target
        );

        self.client.limiter.wait_turn().await;
        let response = self
            .client
            .http
            .post(self.client.tool_url())
            .form(&fields)
            .send()
            .await
            .map_err(|e| {
                EngineError::Submission(describe_transport_error(&e, &self.client.base_url))
            })?;

        if !response.status().is_success() {
            return Err(EngineError::Submission(format!(
                "Primer-BLAST returned HTTP {} for the template selection of {}",
                response.status(),
                self.target
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| EngineError::Submission(format!("Failed to read response: {}", e)))?;

        self.replace_page(ResultPage::new(html))
    }

    fn check_success(&mut self) -> Result<bool> {
        let page = self.complete_page()?;
        Ok(page.reports_no_primers() || page.primer_pairs().is_empty())
    }

    fn check_specificity(&mut self) -> Result<bool> {
        let pairs = self.complete_page()?.primer_pairs();
        Ok(!pairs.is_empty() && pairs.iter().all(|scanned| !scanned.specific))
    }

    fn parse_primers(&mut self) -> Result<Vec<PrimerPair>> {
        let pairs: Vec<PrimerPair> = self
            .complete_page()?
            .primer_pairs()
            .into_iter()
            .filter(|scanned| scanned.specific)
            .map(|scanned| scanned.pair)
            .collect();

        if pairs.is_empty() {
            return Err(EngineError::Parse(format!(
                "No specific primer pair on the result page for {}",
                self.target
            )));
        }
        Ok(pairs)
    }
}

fn describe_transport_error(e: &reqwest::Error, base_url: &str) -> String {
    if e.is_timeout() {
        "Request to Primer-BLAST timed out".to_string()
    } else if e.is_connect() {
        format!("Cannot connect to Primer-BLAST at {}", base_url)
    } else {
        e.to_string()
    }
}
