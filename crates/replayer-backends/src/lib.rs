//! Replay backends
//!
//! A [`Registry`] maps trace extensions to [`ReplayBackend`]s. Each backend
//! drives an external replay tool through a [`CommandRunner`] to write
//! snapshot images (`<output_dir>/<trace_basename>-<call>.png`) or to
//! collect per-frame GPU durations.

pub mod apitrace;
pub mod backend;
pub mod error;
pub mod gfxreconstruct;
pub mod registry;
pub mod runner;

pub use apitrace::{ApiTraceBackend, collect_frame_times};
pub use backend::{BackendContext, DumpRequest, DumpResult, ReplayBackend};
pub use error::{BackendError, Result};
pub use gfxreconstruct::{GfxReconstructBackend, MIN_VERSION, ToolVersion};
pub use registry::{BackendFactory, BackendRegistration, Registry};
pub use runner::{CommandOutput, CommandRunner, StderrMode, SystemRunner};
