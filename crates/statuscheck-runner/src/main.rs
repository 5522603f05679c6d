//! statuscheck binary

use clap::Parser;
use common::LogFormat;
use statuscheck_runner::{Config, StatusRunner};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "statuscheck", version, about = "Check HTTP endpoints and render a status report")]
struct Cli {
    #[arg(short, long, help = "Configuration file (default: search standard locations)")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Write the HTML report here instead of the configured path")]
    output: Option<PathBuf>,

    #[arg(long, help = "Exit non-zero when any target is still down after the re-check")]
    fail_on_down: bool,

    #[arg(long, help = "Log format: text or json (overrides the configuration)")]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging settings)
    let config = match Config::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            // Can't use tracing yet - not initialized
            eprintln!("Configuration error: {}", e);
            return Err(e.into());
        }
    };

    let log_format = match cli.log_format {
        Some(format) => format,
        None => config
            .logging
            .format
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default(),
    };
    let log_level = config.logging.level.as_deref().unwrap_or("info");
    common::logging::init_with(log_format, log_level);

    tracing::info!(targets = config.targets.len(), "Configuration loaded successfully");

    // Fails here, before probing, if an HTTP client cannot be built
    let mut runner = StatusRunner::new(&config)?;
    if let Some(output) = cli.output {
        runner.set_report_path(output);
    }

    let summary = runner.run().await?;

    if cli.fail_on_down && summary.failed_count() > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
