use anyhow::{Context, Result};

use super::downloader;
use crate::cli::Cli;
use crate::exit::EXIT_PASS;

pub fn execute(cli: &Cli, file_path: &str) -> Result<i32> {
    let local = downloader(cli)?
        .ensure_file(file_path)
        .with_context(|| format!("Cannot fetch {file_path}"))?;
    println!("{}", local.display());
    Ok(EXIT_PASS)
}
