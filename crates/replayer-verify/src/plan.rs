//! Batch planning
//!
//! Expands a manifest into one `replayer` invocation per trace, the way an
//! external test scheduler runs them: each run is named
//! `trace/<device>/<trace path>`.

use replayer_common::{ReplayConfig, ReplaySubcommand};
use replayer_manifest::{Manifest, load_file, traces};
use serde::Serialize;

use crate::error::{Result, VerifyError};
use crate::profiler::PROFILED_EXTENSIONS;

/// One scheduled replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedRun {
    pub name: String,
    /// Arguments for the `replayer` binary
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayPlan {
    pub subcommand: ReplaySubcommand,
    pub device_name: String,
    pub runs: Vec<PlannedRun>,
}

impl ReplayPlan {
    /// Plan from `description_file` and `device_name` in `config`, both of
    /// which are required.
    pub fn from_config(config: &ReplayConfig) -> Result<Self> {
        let description_file =
            config.description_file.as_deref().ok_or(VerifyError::MissingSetting("description_file"))?;
        let device_name =
            config.device_name.as_deref().ok_or(VerifyError::MissingSetting("device_name"))?;

        let manifest = load_file(description_file)?;
        Ok(Self::build(config, &manifest, device_name))
    }

    pub fn build(config: &ReplayConfig, manifest: &Manifest, device_name: &str) -> Self {
        let extensions = match config.subcommand {
            ReplaySubcommand::Profile => Some(PROFILED_EXTENSIONS),
            ReplaySubcommand::Compare => None,
        };

        let mut common = vec![
            config.subcommand.name().to_string(),
            "trace".to_string(),
            "--device-name".to_string(),
            device_name.to_string(),
        ];
        if let Some(url) = &manifest.download_url {
            common.extend(["--download-url".to_string(), url.clone()]);
        }
        common.extend(config.extra_args());

        let runs = traces(manifest, extensions, Some(device_name), true)
            .map(|descriptor| {
                let mut args = common.clone();
                args.push(descriptor.path.clone());
                if config.subcommand == ReplaySubcommand::Compare {
                    args.push(descriptor.checksum.unwrap_or_default());
                }
                PlannedRun { name: format!("trace/{device_name}/{}", descriptor.path), args }
            })
            .collect();

        Self { subcommand: config.subcommand, device_name: device_name.to_string(), runs }
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}
