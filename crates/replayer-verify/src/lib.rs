//! Replay verification
//!
//! Ties the download, backend and manifest layers together: the
//! [`Verifier`] replays a trace and compares the checksum of its last frame
//! with a reference, the [`FrameTimeProfiler`] collects per-frame GPU
//! durations, and [`ReplayPlan`] expands a manifest into per-trace runs.

pub mod checksum;
pub mod error;
pub mod plan;
pub mod profiler;
pub mod verifier;

pub use checksum::hexdigest_from_image;
pub use error::{Result, VerifyError};
pub use plan::{PlannedRun, ReplayPlan};
pub use profiler::{FrameTimeProfiler, PROFILED_EXTENSIONS};
pub use verifier::{VerifyOptions, Verifier, dumped_images, with_checksum_suffix};
