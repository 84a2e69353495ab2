//! Configuration management
//!
//! This module handles loading, validation, and management of the primerblast
//! configuration. Configuration is stored in TOML format at
//! ~/.primerblast/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **ncbi**: Primer-BLAST endpoint and the contact identity NCBI asks for
//! - **polling**: Poll cadence and global contact pacing
//! - **parameters**: The strict search template every relaxation starts from
//!
//! # Examples
//!
//! ```no_run
//! use primerblast_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Endpoint: {}", config.ncbi.base_url);
//! println!("Poll every {}s", config.polling.poll_interval_secs);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use sdk::types::ParameterSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Shortest poll interval NCBI tolerates for a single job
pub const NCBI_MIN_POLL_INTERVAL_SECS: u64 = 60;

/// Accepted values for `log_level` and `--log`
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Longest accepted poll or contact interval (one day)
pub const MAX_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Remote service settings
    #[serde(default)]
    pub ncbi: NcbiConfig,

    /// Poll and contact pacing
    #[serde(default)]
    pub polling: PollingConfig,

    /// Strict search template
    #[serde(default = "default_parameters")]
    pub parameters: ParameterSet,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Primer-BLAST service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NcbiConfig {
    /// Base URL of the Primer-BLAST tool (without `primertool.cgi`)
    #[serde(default = "default_ncbi_base_url")]
    pub base_url: String,

    /// Contact email sent with every search. Required before submitting.
    #[serde(default)]
    pub email: String,

    /// Tool name reported to NCBI
    #[serde(default = "default_tool_name")]
    pub tool: String,

    /// Per-request HTTP timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between polls of one job
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Minimum seconds between any two contacts with the server
    #[serde(default = "default_contact_interval")]
    pub contact_interval_secs: u64,

    /// Upper bound on concurrent targets, below the derived safe cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_jobs: Option<usize>,
}

impl PollingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn contact_interval(&self) -> Duration {
        Duration::from_secs(self.contact_interval_secs)
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.primerblast")
}

fn default_ncbi_base_url() -> String {
    "https://www.ncbi.nlm.nih.gov/tools/primer-blast".to_string()
}

fn default_tool_name() -> String {
    "primerblast".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

fn default_poll_interval() -> u64 {
    NCBI_MIN_POLL_INTERVAL_SECS
}

fn default_contact_interval() -> u64 {
    3
}

fn default_parameters() -> ParameterSet {
    strict_parameters()
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for NcbiConfig {
    fn default() -> Self {
        Self {
            base_url: default_ncbi_base_url(),
            email: String::new(),
            tool: default_tool_name(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            contact_interval_secs: default_contact_interval(),
            max_jobs: None,
        }
    }
}

/// The strict Primer-BLAST template every relaxation sequence starts from
///
/// Intron-spanning, GC-clamped, narrow GC band, low self-complementarity and
/// repeat filtering on. The ladder loosens these one step at a time.
pub fn strict_parameters() -> ParameterSet {
    [
        ("PRIMER_PRODUCT_MIN", "70"),
        ("PRIMER_PRODUCT_MAX", "180"),
        ("PRIMER_NUM_RETURN", "10"),
        ("PRIMER_MIN_TM", "55.0"),
        ("PRIMER_OPT_TM", "60.0"),
        ("PRIMER_MAX_TM", "65.0"),
        ("PRIMER_MAX_DIFF_TM", "5"),
        ("MIN_INTRON_SIZE", "0"),
        ("MAX_INTRON_SIZE", "1000000"),
        ("PRIMER_SPECIFICITY_DATABASE", "refseq_mrna"),
        ("EXCLUDE_ENV", "on"),
        ("ORGANISM", "Oryza sativa Japonica Group (taxid:39947)"),
        ("TOTAL_MISMATCH_IGNORE", "7"),
        ("ALLOW_TRANSCRIPT_VARIANTS", "on"),
        ("MAX_CANDIDATE_PRIMER", "1000"),
        ("PRIMER_MIN_GC", "45.0"),
        ("PRIMER_MAX_GC", "55.0"),
        ("GC_CLAMP", "2"),
        ("POLYX", "3"),
        ("SELF_ANY", "3.00"),
        ("SELF_END", "1.00"),
        ("SEARCH_SPECIFIC_PRIMER", "on"),
        ("SHOW_SVIEWER", "on"),
        ("UNGAPPED_BLAST", "on"),
        ("LOW_COMPLEXITY_FILTER", "on"),
        ("SPAN_INTRON", "on"),
    ]
    .into_iter()
    .collect()
}

impl Config {
    /// Load configuration from the default location (~/.primerblast/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();
        config.validate_and_process()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.primerblast/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".primerblast").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            ncbi: NcbiConfig::default(),
            polling: PollingConfig::default(),
            parameters: strict_parameters(),
        }
    }

    /// Strict template with the contact identity merged in
    ///
    /// `EMAIL` and `TOOL` come from the `[ncbi]` section and override any
    /// value left in `[parameters]`.
    pub fn strict_parameters(&self) -> ParameterSet {
        let mut parameters = self.parameters.clone();
        if !self.ncbi.email.is_empty() {
            parameters.insert("EMAIL", self.ncbi.email.clone());
        }
        if !self.ncbi.tool.is_empty() {
            parameters.insert("TOOL", self.ncbi.tool.clone());
        }
        parameters
    }

    /// Fail unless a contact email is configured
    pub fn require_email(&self) -> Result<&str, EngineError> {
        if self.ncbi.email.trim().is_empty() {
            return Err(EngineError::Config(
                "A contact email is required by NCBI. Set [ncbi] email or pass --email"
                    .to_string(),
            ));
        }
        Ok(&self.ncbi.email)
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates the log level, intervals and contact email
    /// - Expands ~ in the data directory and creates it
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        if !LOG_LEVELS.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                LOG_LEVELS.join(", ")
            )));
        }

        self.validate_polling()?;

        let email = self.ncbi.email.trim();
        if !email.is_empty() && !email.contains('@') {
            return Err(EngineError::Config(format!(
                "Invalid contact email '{}'",
                email
            )));
        }

        if self.ncbi.base_url.trim().is_empty() {
            return Err(EngineError::Config("ncbi.base_url must not be empty".to_string()));
        }
        self.ncbi.base_url = self.ncbi.base_url.trim_end_matches('/').to_string();

        self.core.data_dir = expand_path(&self.core.data_dir)?;
        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }

    /// Validate the pacing section
    ///
    /// Also used after CLI overrides are applied.
    pub fn validate_polling(&self) -> Result<(), EngineError> {
        if self.polling.poll_interval_secs == 0 {
            return Err(EngineError::Config(
                "poll_interval_secs must be greater than 0".to_string(),
            ));
        }
        if self.polling.contact_interval_secs == 0 {
            return Err(EngineError::Config(
                "contact_interval_secs must be greater than 0".to_string(),
            ));
        }
        for (name, secs) in [
            ("poll_interval_secs", self.polling.poll_interval_secs),
            ("contact_interval_secs", self.polling.contact_interval_secs),
        ] {
            if secs > MAX_INTERVAL_SECS {
                return Err(EngineError::Config(format!(
                    "{} must be at most {} (got {})",
                    name, MAX_INTERVAL_SECS, secs
                )));
            }
        }
        if self.polling.max_jobs == Some(0) {
            return Err(EngineError::Config(
                "max_jobs must be at least 1".to_string(),
            ));
        }
        if self.polling.poll_interval_secs < NCBI_MIN_POLL_INTERVAL_SECS {
            tracing::warn!(
                "poll_interval_secs = {} is below NCBI's once-a-minute guideline",
                self.polling.poll_interval_secs
            );
        }
        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
