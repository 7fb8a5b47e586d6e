//! Subcommand implementations
//!
//! Every command returns the process exit code; errors that stop a run are
//! returned and reported as fatal by `main`.

pub mod compare;
pub mod download;
pub mod dump;
pub mod plan;
pub mod profile;
pub mod query;

use std::path::Path;

use anyhow::{Context, Result};
use replayer_backends::{BackendContext, Registry};
use replayer_common::{ReplayConfig, TraceReport};
use replayer_download::Downloader;
use replayer_manifest::Manifest;
use serde::Serialize;
use tracing::debug;

use crate::cli::{Cli, Command};

pub fn run(cli: &Cli) -> Result<i32> {
    let config =
        ReplayConfig::load(cli.config.as_deref()).context("Failed to load replay configuration")?;
    debug!(?config, "Effective configuration");

    match &cli.command {
        Command::Compare(args) => compare::execute(cli, args, &config),
        Command::Profile { target } => profile::execute(cli, target, &config),
        Command::Dump(args) => dump::execute(cli, args, &config),
        Command::Download { file_path } => download::execute(cli, file_path),
        Command::Query(args) => query::execute(cli, args, &config),
        Command::Plan => plan::execute(cli, &config),
    }
}

/// `--device-name`, falling back to the configured device.
pub(crate) fn device_name(cli: &Cli, config: &ReplayConfig) -> Option<String> {
    cli.device_name.clone().or_else(|| config.device_name.clone())
}

pub(crate) fn downloader(cli: &Cli) -> Result<Downloader> {
    let options = cli.download.options()?;
    Downloader::new(&cli.db_path, options).context("Invalid download options")
}

pub(crate) fn registry(config: &ReplayConfig) -> Result<Registry> {
    Registry::with_default_backends(BackendContext::new(config))
        .context("Failed to register replay backends")
}

pub(crate) fn load_manifest(path: &Path) -> Result<Manifest> {
    replayer_manifest::load_file(path)
        .with_context(|| format!("Failed to load traces manifest {}", path.display()))
}

pub(crate) fn print_report<T: Serialize>(report: &TraceReport<T>) -> Result<()> {
    println!("{}", report.piglit_line().context("Failed to serialize results")?);
    Ok(())
}
