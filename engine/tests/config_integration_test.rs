//! Integration tests for configuration management
//!
//! These tests verify that the Config struct can be properly loaded from
//! disk, validated, and processed with path expansion and overrides.

use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

use primerblast_engine::config::{strict_parameters, Config};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config_from_path() {
    let data_dir = TempDir::new().unwrap();
    let toml_content = format!(
        r#"
[core]
log_level = "debug"
data_dir = "{}"

[ncbi]
base_url = "https://www.ncbi.nlm.nih.gov/tools/primer-blast/"
email = "lab@example.org"
tool = "ricelab"
request_timeout_secs = 30

[polling]
poll_interval_secs = 90
contact_interval_secs = 5
max_jobs = 4

[parameters]
PRIMER_PRODUCT_MIN = "100"
PRIMER_PRODUCT_MAX = "250"
SPAN_INTRON = "on"
"#,
        data_dir.path().join("data").display()
    );
    let file = write_config(&toml_content);

    let config = Config::load_from_path(file.path()).unwrap();

    assert_eq!(config.core.log_level, "debug");
    assert!(config.core.data_dir.exists());
    // Trailing slash is trimmed
    assert_eq!(
        config.ncbi.base_url,
        "https://www.ncbi.nlm.nih.gov/tools/primer-blast"
    );
    assert_eq!(config.polling.poll_interval_secs, 90);
    assert_eq!(config.polling.max_jobs, Some(4));

    let parameters = config.strict_parameters();
    assert_eq!(parameters.get("PRIMER_PRODUCT_MIN"), Some("100"));
    assert_eq!(parameters.get("EMAIL"), Some("lab@example.org"));
    assert_eq!(parameters.get("TOOL"), Some("ricelab"));
    assert_eq!(config.require_email().unwrap(), "lab@example.org");
}

#[test]
fn test_missing_sections_fall_back_to_defaults() {
    let data_dir = TempDir::new().unwrap();
    let file = write_config(&format!(
        "[core]\ndata_dir = \"{}\"\n",
        data_dir.path().display()
    ));

    let config = Config::load_from_path(file.path()).unwrap();

    assert_eq!(config.core.log_level, "info");
    assert_eq!(config.polling.poll_interval_secs, 60);
    assert_eq!(config.polling.contact_interval_secs, 3);
    assert_eq!(config.parameters, strict_parameters());
    assert!(config.require_email().is_err());
}

#[test]
fn test_invalid_values_are_rejected() {
    let cases = [
        "[core]\nlog_level = \"verbose\"\n",
        "[polling]\npoll_interval_secs = 0\n",
        "[polling]\ncontact_interval_secs = 0\n",
        "[polling]\ncontact_interval_secs = 9223372036854775807\n",
        "[polling]\npoll_interval_secs = 86401\n",
        "[polling]\nmax_jobs = 0\n",
        "[ncbi]\nemail = \"nobody\"\n",
        "[ncbi]\nbase_url = \"\"\n",
    ];

    for case in cases {
        let file = write_config(case);
        assert!(
            Config::load_from_path(file.path()).is_err(),
            "should reject: {}",
            case
        );
    }
}

#[test]
fn test_malformed_toml_is_a_config_error() {
    let file = write_config("[core\nlog_level = ");
    let err = Config::load_from_path(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config"));
}

#[test]
fn test_missing_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let err = Config::load_from_path(&dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_default_config_round_trips_through_toml() {
    let config = Config::default_config();
    let text = toml::to_string_pretty(&config).unwrap();
    let parsed: Config = toml::from_str(&text).unwrap();

    assert_eq!(parsed.parameters, config.parameters);
    assert_eq!(parsed.ncbi.base_url, config.ncbi.base_url);
    assert_eq!(
        parsed.polling.poll_interval_secs,
        config.polling.poll_interval_secs
    );
}
