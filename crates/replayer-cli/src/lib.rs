//! Trace replayer CLI library
//!
//! Exposes the argument definitions and commands for testing.

pub mod cli;
pub mod commands;
pub mod exit;
pub mod logging;
