//! Tunnel Manager Entry Point

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tunnelmgr::app;
use tunnelmgr::cli::Cli;
use tunnelmgr::config::TunnelMgrConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config is needed before tracing is up, so failures go straight to stderr
    let config = match TunnelMgrConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("tunnelmgr: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter = match app::log_filter(
        cli.log_level.as_deref(),
        config.as_ref().and_then(|c| c.logging.level.as_deref()),
    ) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("tunnelmgr: {}", app::error_report(&e));
            return ExitCode::FAILURE;
        }
    };

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    if config.is_none() {
        tracing::debug!(
            "Config file {} not found, using defaults",
            cli.config.display()
        );
    }
    let config = config.unwrap_or_default();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match app::run(&cli, &config, &mut out).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", app::error_report(&e));
            ExitCode::FAILURE
        }
    }
}
