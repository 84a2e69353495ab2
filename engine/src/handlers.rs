//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - run: Design primers for a list of accessions
//! - params: Show the strict search template
//! - ladder: Show the relaxation ladder
//! - config path / show: Inspect configuration

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::attempt::AttemptRunner;
use crate::blast::ncbi::NcbiClient;
use crate::config::Config;
use crate::dispatch::{job_count, Dispatcher, TargetOutcome};
use crate::rate_limiter::ContactLimiter;
use crate::relaxation::{steps, RelaxationController, Stage};
use sdk::errors::EngineError;

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Options of the `run` command
#[derive(Debug, Default)]
pub struct RunOptions {
    pub targets: Vec<String>,
    pub file: Option<PathBuf>,
    pub email: Option<String>,
    pub poll_interval: Option<u64>,
    pub jobs: Option<usize>,
    pub output: Option<PathBuf>,
}

/// Design primers for every requested target
///
/// Builds one NCBI client, one contact limiter and one dispatcher for the
/// whole batch, prints each terminal classification and exports all reports
/// as JSON. Fails if any target failed.
pub async fn handle_run(options: RunOptions, config: &Config, format: OutputFormat) -> Result<()> {
    let targets = collect_targets(&options.targets, options.file.as_deref())?;
    if targets.is_empty() {
        bail!("No targets given. Pass accessions as arguments or with --file");
    }

    let config = apply_overrides(config, &options)?;
    config.require_email()?;

    let poll_interval = config.polling.poll_interval();
    let contact_interval = config.polling.contact_interval();
    let jobs = job_count(
        targets.len(),
        poll_interval,
        contact_interval,
        config.polling.max_jobs,
    );

    let limiter = Arc::new(ContactLimiter::new(contact_interval));
    let client = NcbiClient::from_config(&config.ncbi, Arc::clone(&limiter))
        .context("Failed to create Primer-BLAST client")?;
    let runner = AttemptRunner::new(Arc::new(client), poll_interval);
    let dispatcher = Dispatcher::new(RelaxationController::new(runner), jobs);
    tracing::info!(
        "Polling every {}s, one NCBI contact per {}s, {} job(s) in flight",
        poll_interval.as_secs(),
        limiter.min_interval().as_secs(),
        dispatcher.jobs()
    );

    let template = config.strict_parameters();
    let outcomes = dispatcher.run_all(&targets, &template).await;

    print_outcomes(&outcomes, format)?;

    let export_path = match options.output {
        Some(path) => path,
        None => default_export_path(&config),
    };
    export_reports(&outcomes, &export_path)?;
    tracing::info!("Reports written to {}", export_path.display());

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        bail!("{} of {} target(s) failed", failed, outcomes.len());
    }
    Ok(())
}

/// Print the strict template that every search starts from
pub fn handle_params(config: &Config, format: OutputFormat) -> Result<()> {
    let parameters = config.strict_parameters();

    match format {
        OutputFormat::Text => {
            let text = toml::to_string_pretty(&parameters)
                .context("Failed to serialize parameters")?;
            print!("{}", text);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&parameters)?);
        }
    }
    Ok(())
}

/// Print the relaxation ladder in order
pub fn handle_ladder(format: OutputFormat) -> Result<()> {
    let rows: Vec<(Stage, String)> = std::iter::once((Stage::Strict, "none".to_string()))
        .chain(steps().map(|step| (step.stage, step.mutation.to_string())))
        .collect();

    match format {
        OutputFormat::Text => {
            println!("{:<4} {:<18} {:<18} Change", "#", "Stage", "Label");
            for (i, (stage, change)) in rows.iter().enumerate() {
                let label = stage
                    .status()
                    .map_or_else(|| "(unchanged)".to_string(), |s| s.to_string());
                println!("{:<4} {:<18} {:<18} {}", i, stage_name(*stage), label, change);
            }
        }
        OutputFormat::Json => {
            let ladder: Vec<_> = rows
                .iter()
                .map(|(stage, change)| {
                    json!({
                        "stage": stage,
                        "label": stage.status(),
                        "change": change,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&ladder)?);
        }
    }
    Ok(())
}

/// Print where the configuration lives
pub fn handle_config_path(custom: Option<&Path>, format: OutputFormat) -> Result<()> {
    let path = match custom {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };

    match format {
        OutputFormat::Text => println!("{}", path.display()),
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "path": path }))?
            );
        }
    }
    Ok(())
}

/// Print the effective configuration
pub fn handle_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let text = toml::to_string_pretty(config).context("Failed to serialize config")?;
            print!("{}", text);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
    }
    Ok(())
}

/// Merge command-line targets with those read from `file`
///
/// Lines are trimmed; blank lines and `#` comments are skipped. Duplicates
/// are dropped, keeping the first occurrence.
pub fn collect_targets(args: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut candidates: Vec<String> = args.iter().map(|t| t.trim().to_string()).collect();

    if let Some(path) = file {
        let contents = std::fs::read_to_string(path)
            .map_err(EngineError::from)
            .with_context(|| format!("Failed to read targets from {}", path.display()))?;
        candidates.extend(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }

    let mut seen = HashSet::new();
    Ok(candidates
        .into_iter()
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect())
}

/// Apply `run` flags on top of the loaded configuration
fn apply_overrides(config: &Config, options: &RunOptions) -> Result<Config> {
    let mut config = config.clone();

    if let Some(email) = &options.email {
        let email = email.trim();
        if !email.contains('@') {
            bail!("Invalid contact email '{}'", email);
        }
        config.ncbi.email = email.to_string();
    }
    if let Some(secs) = options.poll_interval {
        config.polling.poll_interval_secs = secs;
    }
    if let Some(jobs) = options.jobs {
        config.polling.max_jobs = Some(jobs);
    }

    config.validate_polling()?;
    Ok(config)
}

fn default_export_path(config: &Config) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    config
        .core
        .data_dir
        .join("reports")
        .join(format!("primerblast-{}.json", stamp))
}

/// Write every outcome as pretty JSON
pub fn export_reports(outcomes: &[TargetOutcome], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(EngineError::from)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let json = serde_json::to_string_pretty(outcomes).context("Failed to serialize reports")?;
    std::fs::write(path, json)
        .map_err(EngineError::from)
        .with_context(|| format!("Failed to write reports to {}", path.display()))?;
    Ok(())
}

fn print_outcomes(outcomes: &[TargetOutcome], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for outcome in outcomes {
                match &outcome.result {
                    Ok(report) => {
                        println!(
                            "{:<20} {:<24} {} attempt(s), {} primer pair(s)",
                            outcome.target,
                            report.status(),
                            report.attempts(),
                            report.attempt.primers.len()
                        );
                        if let Some(best) = report.attempt.primers.first() {
                            println!(
                                "{:<20} F {}  R {}  ({} bp)",
                                "", best.forward.sequence, best.reverse.sequence, best.product_length
                            );
                        }
                    }
                    Err(e) => println!("{:<20} error: {}", outcome.target, e),
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(outcomes)?);
        }
    }
    Ok(())
}

fn stage_name(stage: Stage) -> String {
    serde_json::to_value(stage)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("{:?}", stage))
}
