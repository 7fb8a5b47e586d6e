use anyhow::{Context, Result};
use replayer_common::ReplayConfig;
use replayer_verify::ReplayPlan;

use super::device_name;
use crate::cli::Cli;
use crate::exit::EXIT_PASS;

/// Print the plan as JSON; `--device-name` overrides the configured device.
pub fn execute(cli: &Cli, config: &ReplayConfig) -> Result<i32> {
    let config = ReplayConfig { device_name: device_name(cli, config), ..config.clone() };
    let plan = ReplayPlan::from_config(&config).context("Cannot plan the batch run")?;
    println!("{}", serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?);
    Ok(EXIT_PASS)
}
