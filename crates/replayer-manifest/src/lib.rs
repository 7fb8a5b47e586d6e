//! Trace manifest query layer
//!
//! Parses the YAML document describing which traces to replay, with their
//! expected checksums and labels per device, and selects the traces that
//! apply to a run.

pub mod error;
pub mod manifest;
pub mod query;

pub use error::{ManifestError, Result};
pub use manifest::{DeviceExpectation, Manifest, TraceEntry, load_file, load_yaml};
pub use query::{
    EXCLUDED_LABELS, TraceDescriptor, download_url, is_excluded, trace_checksum, trace_extension,
    traces,
};
