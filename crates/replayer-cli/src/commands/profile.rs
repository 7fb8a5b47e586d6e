use anyhow::Result;
use replayer_common::ReplayConfig;
use replayer_verify::FrameTimeProfiler;

use super::{device_name, downloader, load_manifest, print_report, registry};
use crate::cli::{Cli, ProfileTarget};
use crate::exit::exit_code;

pub fn execute(cli: &Cli, target: &ProfileTarget, config: &ReplayConfig) -> Result<i32> {
    let mut profiler =
        FrameTimeProfiler::new(downloader(cli)?, registry(config)?, device_name(cli, config));

    let status = match target {
        ProfileTarget::Trace { file_path } => profiler.trace(file_path)?,
        ProfileTarget::Yaml(yaml) => {
            let manifest = load_manifest(&yaml.yaml_file)?;
            let report = profiler.from_yaml(&manifest)?;
            print_report(&report)?;
            report.result
        }
    };
    Ok(exit_code(status))
}
