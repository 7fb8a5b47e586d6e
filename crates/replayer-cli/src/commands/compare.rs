use std::path::PathBuf;

use anyhow::Result;
use replayer_common::ReplayConfig;
use replayer_verify::{Verifier, VerifyOptions};

use super::{device_name, downloader, load_manifest, print_report, registry};
use crate::cli::{Cli, CompareArgs, CompareTarget};
use crate::exit::exit_code;

pub fn execute(cli: &Cli, args: &CompareArgs, config: &ReplayConfig) -> Result<i32> {
    let options = VerifyOptions {
        device_name: device_name(cli, config),
        results_path: cli.output.clone().unwrap_or_else(|| PathBuf::from("./results/")),
        keep_image: args.keep_image,
    };
    let mut verifier = Verifier::new(downloader(cli)?, registry(config)?, options);

    let status = match &args.target {
        CompareTarget::Trace { file_path, checksum } => verifier.trace(file_path, checksum)?,
        CompareTarget::Yaml(yaml) => {
            let manifest = load_manifest(&yaml.yaml_file)?;
            let report = verifier.from_yaml(&manifest)?;
            print_report(&report)?;
            report.result
        }
    };
    Ok(exit_code(status))
}
