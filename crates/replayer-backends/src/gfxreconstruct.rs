//! GFXReconstruct backend for Vulkan captures (`.gfxr`)

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use image::ImageFormat;
use replayer_common::ToolPaths;
use tracing::{debug, warn};

use crate::backend::{BackendContext, DumpRequest, ReplayBackend};
use crate::error::{BackendError, Result};
use crate::runner::{CommandRunner, StderrMode, run_captured, run_logged};

const VERSION_MARKER: &str = "GFXReconstruct Version";
const TOTAL_FRAMES_MARKER: &str = "Total frames:";

/// Oldest `gfxrecon-replay` with the screenshot flags we rely on.
pub const MIN_VERSION: ToolVersion = ToolVersion { major: 0, minor: 9, patch: 4 };

/// `major.minor.patch` as reported by `gfxrecon-replay --version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ToolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ToolVersion {
    /// Parse the first `GFXReconstruct Version X.Y.Z` line in `output`.
    pub fn from_banner(output: &str) -> Option<Self> {
        output.lines().find_map(|line| {
            let (_, rest) = line.split_once(VERSION_MARKER)?;
            let token = rest.split_whitespace().next()?;
            let mut parts = token.split('.').map(|p| {
                let digits: String = p.chars().take_while(char::is_ascii_digit).collect();
                digits.parse::<u32>().ok()
            });
            Some(Self { major: parts.next()??, minor: parts.next()??, patch: parts.next()?? })
        })
    }
}

impl fmt::Display for ToolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// `Total frames: N` from `gfxrecon-info` output.
fn parse_total_frames(output: &str) -> Option<u64> {
    output.lines().find_map(|line| {
        let (_, rest) = line.split_once(TOTAL_FRAMES_MARKER)?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

pub struct GfxReconstructBackend {
    request: DumpRequest,
    tools: ToolPaths,
    runner: Arc<dyn CommandRunner>,
}

impl GfxReconstructBackend {
    pub const NAME: &'static str = "gfxreconstruct";
    pub const EXTENSIONS: &'static [&'static str] = &[".gfxr"];

    pub fn new(request: DumpRequest, context: &BackendContext) -> Result<Self> {
        if request.extension().as_deref() != Some(".gfxr") {
            return Err(BackendError::InvalidTrace {
                path: request.trace_path,
                backend: "GFXReconstructBackend",
            });
        }
        Ok(Self { request, tools: context.tools.clone(), runner: Arc::clone(&context.runner) })
    }

    fn trace_arg(&self) -> String {
        self.request.trace_path.display().to_string()
    }

    /// Fail unless the replay tool reports at least [`MIN_VERSION`].
    pub fn check_version(&self) -> Result<ToolVersion> {
        let cmd = vec![self.tools.gfxrecon_replay_bin.clone(), "--version".to_string()];
        let output = run_captured(self.runner.as_ref(), &cmd, StderrMode::Inherit)?;
        let stdout = output.stdout_lossy();
        println!("{stdout}");

        let current = ToolVersion::from_banner(&stdout).ok_or(BackendError::VersionUnknown)?;
        if current < MIN_VERSION {
            return Err(BackendError::VersionTooOld {
                current: current.to_string(),
                minimum: MIN_VERSION.to_string(),
            });
        }
        debug!("gfxrecon-replay version {current}");
        Ok(current)
    }

    /// Frame count reported by `gfxrecon-info`, or -1 if it reports none.
    pub fn last_frame_call(&self) -> Result<i64> {
        let cmd = vec![self.tools.gfxrecon_info_bin.clone(), self.trace_arg()];
        let output = run_captured(self.runner.as_ref(), &cmd, StderrMode::Inherit)?;
        let stdout = output.stdout_lossy();
        println!("{stdout}");

        Ok(parse_total_frames(&stdout).and_then(|n| i64::try_from(n).ok()).unwrap_or(-1))
    }

    /// Turn `screenshot_frame_<call>.bmp` into `<basename>-<call>.png`.
    fn convert_screenshot(&self, call: &str) -> Result<PathBuf> {
        let output_dir = self.request.output_dir();
        let bmp = output_dir.join(format!("screenshot_frame_{call}.bmp"));
        let png = PathBuf::from(format!("{}-{call}.png", self.request.output_prefix().display()));

        if !bmp.is_file() {
            return Err(BackendError::MissingArtifact(bmp));
        }
        println!("Writing: {} to {}", bmp.display(), png.display());

        let decoded =
            image::open(&bmp).map_err(|source| BackendError::Image { path: bmp.clone(), source })?;
        decoded
            .save_with_format(&png, ImageFormat::Png)
            .map_err(|source| BackendError::Image { path: png.clone(), source })?;
        fs::remove_file(&bmp).map_err(|source| BackendError::Io { path: bmp.clone(), source })?;
        Ok(png)
    }
}

impl ReplayBackend for GfxReconstructBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run_dump(&mut self) -> Result<Vec<PathBuf>> {
        self.check_version()?;

        if self.request.calls.is_empty() {
            let last = self.last_frame_call()?;
            if last < 0 {
                return Err(BackendError::LastCallUnknown(self.request.trace_path.clone()));
            }
            self.request.calls = vec![last.to_string()];
        }

        let output_dir = self.request.output_dir();
        let mut cmd = vec![self.tools.gfxrecon_replay_bin.clone()];
        cmd.extend(self.tools.gfxrecon_replay_extra_args());
        cmd.extend([
            "--screenshots".to_string(),
            self.request.calls.join(","),
            "--screenshot-dir".to_string(),
            output_dir.display().to_string(),
            self.trace_arg(),
        ]);

        if let Err(e) = run_logged(self.runner.as_ref(), "dump_trace_images", &cmd, StderrMode::Inherit) {
            warn!("Replay of {} failed, screenshots left unconverted", self.trace_arg());
            return Err(e);
        }

        self.request.calls.iter().map(|call| self.convert_screenshot(call)).collect()
    }
}

impl fmt::Debug for GfxReconstructBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GfxReconstructBackend").field("request", &self.request).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_banner_is_parsed() {
        let banner = "gfxrecon-replay\n  GFXReconstruct Version 0.9.4 (v0.9.4:3738dec)\n  Vulkan Header Version 1.2.162\n";
        assert_eq!(
            ToolVersion::from_banner(banner),
            Some(ToolVersion { major: 0, minor: 9, patch: 4 })
        );
    }

    #[test]
    fn unparsable_banner_has_no_version() {
        assert_eq!(ToolVersion::from_banner("gfxrecon-replay\n  Version unknown\n"), None);
        assert_eq!(ToolVersion::from_banner("GFXReconstruct Version x.y"), None);
    }

    #[test]
    fn versions_compare_numerically() {
        let v093 = ToolVersion::from_banner("GFXReconstruct Version 0.9.3").unwrap();
        let v0910 = ToolVersion::from_banner("GFXReconstruct Version 0.9.10").unwrap();
        assert!(v093 < MIN_VERSION);
        assert!(v0910 > MIN_VERSION);
        assert_eq!(MIN_VERSION.to_string(), "0.9.4");
    }

    #[test]
    fn total_frames_is_read_from_info_output() {
        let info = "File info:\n\tCompression format: LZ4\n\tTotal frames: 2\n\nApplication info:\n";
        assert_eq!(parse_total_frames(info), Some(2));
        assert_eq!(parse_total_frames("Application info:\n"), None);
    }
}
