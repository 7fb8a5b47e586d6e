//! apitrace backend
//!
//! OpenGL/GLES traces (`.trace`) are replayed with `eglretrace`. DXGI traces
//! (`.trace-dxgi`) are replayed with `d3dretrace` under Wine, and the
//! Windows `apitrace` build is used for last-call discovery. Every binary
//! path is configurable, so the Wine wrapper can be dropped if needed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use replayer_common::ToolPaths;
use tracing::debug;

use crate::backend::{BackendContext, DumpRequest, ReplayBackend};
use crate::error::{BackendError, Result};
use crate::runner::{CommandRunner, StderrMode, command_line, run_captured, run_logged};

const NATIVE_EXTENSION: &str = ".trace";
const DXGI_EXTENSION: &str = ".trace-dxgi";

/// Which retrace tool a trace is replayed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flavor {
    Egl,
    WineD3d,
}

pub struct ApiTraceBackend {
    request: DumpRequest,
    flavor: Flavor,
    tools: ToolPaths,
    loop_times: usize,
    runner: Arc<dyn CommandRunner>,
}

impl ApiTraceBackend {
    pub const NAME: &'static str = "apitrace";
    pub const EXTENSIONS: &'static [&'static str] = &[NATIVE_EXTENSION, DXGI_EXTENSION];

    pub fn new(request: DumpRequest, context: &BackendContext) -> Result<Self> {
        let flavor = match request.extension().as_deref() {
            Some(NATIVE_EXTENSION) => Flavor::Egl,
            Some(DXGI_EXTENSION) => Flavor::WineD3d,
            _ => {
                return Err(BackendError::InvalidTrace {
                    path: request.trace_path,
                    backend: "APITraceBackend",
                });
            }
        };

        Ok(Self {
            request,
            flavor,
            tools: context.tools.clone(),
            loop_times: context.loop_times,
            runner: Arc::clone(&context.runner),
        })
    }

    fn trace_arg(&self) -> String {
        self.request.trace_path.display().to_string()
    }

    /// The replay command prefix, wrapper included.
    fn retrace_cmd(&self) -> Vec<String> {
        match self.flavor {
            Flavor::Egl => vec![self.tools.eglretrace_bin.clone()],
            Flavor::WineD3d => {
                vec![self.tools.wine_bin.clone(), self.tools.wine_d3dretrace_bin.clone()]
            }
        }
    }

    /// Index of the last frame-ending call, or -1 when the dump lists none.
    pub fn last_frame_call(&self) -> Result<i64> {
        let mut cmd = match self.flavor {
            Flavor::Egl => vec![self.tools.apitrace_bin.clone()],
            Flavor::WineD3d => {
                vec![self.tools.wine_bin.clone(), self.tools.wine_apitrace_bin.clone()]
            }
        };
        cmd.extend(["dump".to_string(), "--calls=frame".to_string(), self.trace_arg()]);

        let output = run_captured(self.runner.as_ref(), &cmd, StderrMode::Inherit)?;
        let stdout = output.stdout_lossy();
        println!("[dump_trace_images] Running: {}\n{}", command_line(&cmd), stdout);

        Ok(parse_last_call(&stdout))
    }

    fn snapshot_path(&self, call: &str) -> Option<PathBuf> {
        let number: u64 = call.trim().parse().ok()?;
        Some(self.request.output_dir().join(snapshot_file_name(&self.request.trace_path, number)))
    }
}

/// First numeric leading token, scanning from the end; -1 if there is none.
fn parse_last_call(dump: &str) -> i64 {
    dump.lines()
        .rev()
        .filter_map(|line| line.split_whitespace().next())
        .find_map(|token| token.parse::<u64>().ok())
        .and_then(|call| i64::try_from(call).ok())
        .unwrap_or(-1)
}

/// Parse `frame\t<ns>` lines from a `--pframes` run and keep the trailing
/// `keep` samples.
pub fn collect_frame_times(stream: &str, keep: usize) -> Result<Vec<u64>> {
    if stream.is_empty() {
        return Err(BackendError::EmptyProfile);
    }

    let mut frame_times = Vec::new();
    for line in stream.lines() {
        if !line.starts_with("frame") {
            continue;
        }
        let value = line
            .trim_end_matches(['\r', '\n'])
            .split('\t')
            .nth(1)
            .and_then(|field| field.trim().parse::<u64>().ok())
            .ok_or_else(|| BackendError::InvalidFrameTime(line.to_string()))?;
        frame_times.push(value);
    }

    let skip = frame_times.len().saturating_sub(keep);
    Ok(frame_times.split_off(skip))
}

impl ReplayBackend for ApiTraceBackend {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run_dump(&mut self) -> Result<Vec<PathBuf>> {
        if self.request.calls.is_empty() {
            let last = self.last_frame_call()?;
            if last < 0 {
                return Err(BackendError::LastCallUnknown(self.request.trace_path.clone()));
            }
            self.request.calls = vec![last.to_string()];
        }

        let prefix = format!("{}-", self.request.output_prefix().display());
        let mut cmd = self.retrace_cmd();
        cmd.extend([
            "--headless".to_string(),
            format!("--snapshot={}", self.request.calls.join(",")),
            format!("--snapshot-prefix={prefix}"),
            self.trace_arg(),
        ]);
        run_logged(self.runner.as_ref(), "dump_trace_images", &cmd, StderrMode::Inherit)?;

        let mut images = Vec::new();
        for call in &self.request.calls {
            let Some(path) = self.snapshot_path(call) else {
                debug!("Call {call:?} is not numeric, not checking its snapshot");
                continue;
            };
            if !path.is_file() {
                return Err(BackendError::MissingArtifact(path));
            }
            images.push(path);
        }
        Ok(images)
    }

    fn profile(&mut self) -> Result<Vec<u64>> {
        // --singlethread: the threaded retrace queries the GL context after
        // the replay thread has destroyed it
        let mut cmd = self.retrace_cmd();
        cmd.extend([
            "--headless".to_string(),
            "--benchmark".to_string(),
            "--singlethread".to_string(),
            format!("--loop={}", self.loop_times),
            "--pframes".to_string(),
            "opengl:GPU Duration".to_string(),
            self.trace_arg(),
        ]);

        let output = run_logged(self.runner.as_ref(), "profile_trace", &cmd, StderrMode::Discard)?;
        collect_frame_times(&output.stdout_lossy(), self.loop_times)
    }
}

impl std::fmt::Debug for ApiTraceBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiTraceBackend")
            .field("request", &self.request)
            .field("flavor", &self.flavor)
            .finish_non_exhaustive()
    }
}

/// File name of the snapshot apitrace writes for `call`; call numbers are
/// zero-padded to ten digits.
pub fn snapshot_file_name(trace_path: &Path, call: u64) -> String {
    let basename = trace_path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    format!("{basename}-{call:010}.png")
}
