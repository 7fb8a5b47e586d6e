use anyhow::{Result, bail};
use replayer_common::ReplayConfig;
use replayer_manifest::{download_url, trace_checksum, traces};

use super::{device_name, load_manifest};
use crate::cli::{Cli, QueryArgs, QueryCommand};
use crate::exit::EXIT_PASS;

pub fn execute(cli: &Cli, args: &QueryArgs, config: &ReplayConfig) -> Result<i32> {
    let manifest = load_manifest(&args.yaml.yaml_file)?;
    let device = device_name(cli, config);

    match &args.query {
        QueryCommand::Traces { trace_extensions, checksum } => {
            for trace in traces(&manifest, trace_extensions.as_deref(), device.as_deref(), *checksum) {
                match &trace.checksum {
                    Some(sum) => println!("{} {sum}", trace.path),
                    None => println!("{}", trace.path),
                }
            }
        }
        QueryCommand::Checksum { file_path } => {
            let Some(device) = device else {
                bail!("--device-name is required to look up a checksum");
            };
            println!("{}", trace_checksum(&manifest, file_path, &device));
        }
        QueryCommand::DownloadUrl => {
            if let Some(url) = download_url(&manifest) {
                println!("{url}");
            }
        }
    }
    Ok(EXIT_PASS)
}
