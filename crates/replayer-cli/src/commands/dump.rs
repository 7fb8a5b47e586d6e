use anyhow::{Context, Result};
use replayer_common::{ReplayConfig, ReplayStatus};
use tracing::info;

use super::registry;
use crate::cli::{Cli, DumpArgs};
use crate::exit::{EXIT_PASS, exit_code};

/// Snapshots are written next to the trace unless `--output` is given.
pub fn execute(cli: &Cli, args: &DumpArgs, config: &ReplayConfig) -> Result<i32> {
    let registry = registry(config)?;
    let result = registry
        .dump(&args.file_path, cli.output.clone(), args.calls.clone())
        .with_context(|| format!("Cannot dump {}", args.file_path.display()))?;

    if !result.success {
        return Ok(exit_code(ReplayStatus::Crash));
    }
    for image in &result.images {
        println!("{}", image.display());
    }
    info!("Wrote {} snapshots", result.images.len());
    Ok(EXIT_PASS)
}
