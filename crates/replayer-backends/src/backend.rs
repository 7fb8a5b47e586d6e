//! The replay backend capability and its inputs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use replayer_common::{ReplayConfig, ToolPaths};
use tracing::error;

use crate::error::{BackendError, Result};
use crate::runner::{CommandRunner, SystemRunner};

/// What to replay and where to put the snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpRequest {
    pub trace_path: PathBuf,
    /// Defaults to the trace's own directory
    pub output_dir: Option<PathBuf>,
    /// Calls or frames to snapshot; empty means "the last one"
    pub calls: Vec<String>,
}

impl DumpRequest {
    pub fn new(trace_path: impl Into<PathBuf>) -> Self {
        Self { trace_path: trace_path.into(), output_dir: None, calls: Vec::new() }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(output_dir.into());
        self
    }

    pub fn with_calls<I, S>(mut self, calls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.calls = calls.into_iter().map(Into::into).collect();
        self
    }

    /// Extension including the leading dot, e.g. `.trace-dxgi`.
    pub fn extension(&self) -> Option<String> {
        trace_extension(&self.trace_path)
    }

    pub fn output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => match self.trace_path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }

    pub fn trace_basename(&self) -> String {
        self.trace_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// `<output_dir>/<trace_basename>`, the stem every snapshot name starts
    /// with.
    pub fn output_prefix(&self) -> PathBuf {
        self.output_dir().join(self.trace_basename())
    }
}

pub(crate) fn trace_extension(path: &Path) -> Option<String> {
    path.extension().map(|ext| format!(".{}", ext.to_string_lossy()))
}

/// Shared settings handed to every backend the registry builds.
#[derive(Clone)]
pub struct BackendContext {
    pub tools: ToolPaths,
    pub loop_times: usize,
    pub runner: Arc<dyn CommandRunner>,
}

impl BackendContext {
    pub fn new(config: &ReplayConfig) -> Self {
        Self::with_runner(config, Arc::new(SystemRunner))
    }

    pub fn with_runner(config: &ReplayConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self { tools: config.tools.clone(), loop_times: config.loop_times, runner }
    }
}

impl std::fmt::Debug for BackendContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendContext")
            .field("tools", &self.tools)
            .field("loop_times", &self.loop_times)
            .finish_non_exhaustive()
    }
}

/// Outcome of one replay-and-snapshot run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpResult {
    pub success: bool,
    /// Snapshots written, empty on failure
    pub images: Vec<PathBuf>,
}

/// A replay tool wrapper for one trace format.
pub trait ReplayBackend: Send {
    fn name(&self) -> &'static str;

    /// Replay the trace and write the requested snapshots, returning their
    /// paths.
    fn run_dump(&mut self) -> Result<Vec<PathBuf>>;

    /// Per-frame GPU durations in nanoseconds, trailing `loop_times` samples.
    fn profile(&mut self) -> Result<Vec<u64>> {
        Err(BackendError::ProfilingUnsupported(self.name()))
    }

    /// [`run_dump`](Self::run_dump) with failures reported instead of
    /// returned.
    fn dump_result(&mut self) -> DumpResult {
        match self.run_dump() {
            Ok(images) => DumpResult { success: true, images },
            Err(e) => {
                error!(backend = self.name(), "dump failed: {e}");
                eprintln!("[dump_trace_images] Failed: {e}");
                DumpResult::default()
            }
        }
    }

    fn dump(&mut self) -> bool {
        self.dump_result().success
    }
}
