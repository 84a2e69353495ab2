// primerblast: iterative Primer-BLAST primer design
// Main entry point for the primerblast binary

use clap::Parser;
use primerblast_engine::cli::{Cli, Command, ConfigAction};
use primerblast_engine::config::Config;
use primerblast_engine::handlers::{
    handle_config_path, handle_config_show, handle_ladder, handle_params, handle_run,
    OutputFormat, RunOptions,
};
use primerblast_engine::telemetry::init_telemetry_with_level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration (or use custom path if provided)
    let config = if let Some(config_path) = &cli.config {
        Config::load_from_path(config_path)?
    } else {
        Config::load_or_create()?
    };

    // --log wins over the config; RUST_LOG wins over both
    let log_level = cli.log.as_deref().unwrap_or(&config.core.log_level);
    init_telemetry_with_level(log_level);

    let version = env!("CARGO_PKG_VERSION");
    let commit = env!("GIT_COMMIT_HASH");
    let timestamp = env!("BUILD_TIMESTAMP");

    tracing::info!("primerblast v{} ({} - {})", version, commit, timestamp);

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // Handle commands
    match cli.command {
        Command::Run {
            targets,
            file,
            email,
            poll_interval,
            jobs,
            output,
        } => {
            let options = RunOptions {
                targets,
                file,
                email,
                poll_interval,
                jobs,
                output,
            };
            handle_run(options, &config, format).await
        }

        Command::Params => handle_params(&config, format),

        Command::Ladder => handle_ladder(format),

        Command::Config { action } => match action {
            ConfigAction::Path => handle_config_path(cli.config.as_deref(), format),
            ConfigAction::Show => handle_config_show(&config, format),
        },
    }
}
