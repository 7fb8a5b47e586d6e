//! Structured result records
//!
//! Each replayed trace produces one record; the single-trace commands print
//! it wrapped in a [`TraceReport`] as a `PIGLIT: {json}` line, which is the
//! unit consumed by the result backends.

use serde::{Deserialize, Serialize};

use crate::status::ReplayStatus;

/// Prefix of the machine-readable result line.
pub const PIGLIT_PREFIX: &str = "PIGLIT: ";

/// Checksum comparison details for one trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageComparison {
    /// Trace path relative to the db path
    pub image_desc: String,
    /// Expected checksum from the manifest or command line
    pub checksum_ref: String,
    /// Checksum of the rendered snapshot, `None` when nothing was rendered
    pub checksum_render: Option<String>,
    /// Reference image name (`<checksum_ref>.png`)
    pub image_ref: String,
    /// Rendered image name, or the path it was moved to for inspection
    pub image_render: Option<String>,
}

impl ImageComparison {
    /// Record for a trace that has not rendered anything (yet).
    pub fn unrendered(trace_path: &str, expected_checksum: &str) -> Self {
        Self {
            image_desc: trace_path.to_string(),
            checksum_ref: expected_checksum.to_string(),
            checksum_render: None,
            image_ref: format!("{expected_checksum}.png"),
            image_render: None,
        }
    }

    pub fn set_rendered(&mut self, checksum: &str) {
        self.checksum_render = Some(checksum.to_string());
        self.image_render = Some(format!("{checksum}.png"));
    }
}

/// Frame-time samples for one profiled trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameTimesRecord {
    pub image_desc: String,
    /// GPU durations in nanoseconds, `None` when profiling crashed
    pub frame_times: Option<Vec<u64>>,
}

/// The object printed after the `PIGLIT: ` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceReport<T> {
    pub images: Vec<T>,
    pub result: ReplayStatus,
}

impl<T: Serialize> TraceReport<T> {
    pub fn single(record: T, result: ReplayStatus) -> Self {
        Self { images: vec![record], result }
    }

    /// Render the full `PIGLIT: {...}` line.
    pub fn piglit_line(&self) -> serde_json::Result<String> {
        Ok(format!("{PIGLIT_PREFIX}{}", serde_json::to_string(self)?))
    }
}
