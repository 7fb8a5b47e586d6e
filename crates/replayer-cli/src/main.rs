//! `replayer` binary

use std::process;

use clap::Parser;
use replayer_cli::cli::Cli;
use replayer_cli::commands;
use replayer_cli::exit::EXIT_FATAL;
use replayer_cli::logging::setup_logging;
use tracing::error;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = setup_logging(&cli.log_level, cli.log_format) {
        eprintln!("{e:#}");
        process::exit(EXIT_FATAL);
    }

    match commands::run(&cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Command failed: {}", e);
            for cause in e.chain().skip(1) {
                error!("  Caused by: {}", cause);
            }
            eprintln!("Error: {e:#}");
            process::exit(EXIT_FATAL);
        }
    }
}
