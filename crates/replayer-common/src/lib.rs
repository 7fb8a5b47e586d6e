//! Common types for the trace replayer
//!
//! This crate provides the foundational types shared across the replayer
//! workspace: the per-trace verdict, the structured result records emitted on
//! the `PIGLIT:` line, and the tool configuration layer.

pub mod config;
pub mod report;
pub mod status;

pub use config::{ConfigError, ReplayConfig, ReplaySubcommand, ToolPaths};
pub use report::{FrameTimesRecord, ImageComparison, TraceReport};
pub use status::ReplayStatus;
