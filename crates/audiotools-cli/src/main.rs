//! `audiotools` command line entry point.

mod cli;
mod error;
mod logging;

use std::process::ExitCode;

use audiotools_core::{
    ConvertConfig, ExecutionOptions, SyncConfig, convert_playlists, load_service_config, sync,
};
use clap::Parser;
use tracing::{debug, info};

use crate::cli::{Args, Commands};
use crate::error::CliError;
use crate::logging::LoggingConfig;

fn main() -> ExitCode {
    let args = Args::parse();

    let logging_config =
        LoggingConfig::for_verbosity(args.verbose).with_log_directory(args.log_dir.clone());
    let _guard = match logging::init(&logging_config) {
        Ok(guard) => guard,
        Err(e) => return CliError::from(e).report(),
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => e.report(),
    }
}

fn run(args: &Args) -> Result<(), CliError> {
    let options = args.execution_options();
    debug!("Loading configuration from {}", args.config.display());

    match args.command {
        Commands::SyncPlaylist => sync_playlist(args, &options),
        Commands::ConvertPlaylist => convert_playlist(args, &options),
    }
}

fn sync_playlist(args: &Args, options: &ExecutionOptions) -> Result<(), CliError> {
    let config: SyncConfig = load_service_config(&args.config)?;
    let report = sync::run(config, options)?;
    info!("{report}");
    Ok(())
}

fn convert_playlist(args: &Args, options: &ExecutionOptions) -> Result<(), CliError> {
    let config: ConvertConfig = load_service_config(&args.config)?;
    let report = convert_playlists(&config, options)?;
    info!(
        "Converted {} playlist(s) with {} entries",
        report.written.len(),
        report.entries
    );
    if !report.missing.is_empty() {
        info!("{} playlist(s) not found", report.missing.len());
    }
    Ok(())
}
