//! Frame-time collection

use replayer_backends::{DumpRequest, Registry};
use replayer_common::{FrameTimesRecord, ReplayStatus, TraceReport};
use replayer_download::Downloader;
use replayer_manifest::{Manifest, traces};
use tracing::info;

use crate::error::Result;
use crate::verifier::print_report;

/// Only apitrace traces can be profiled.
pub const PROFILED_EXTENSIONS: &str = ".trace";

pub struct FrameTimeProfiler {
    downloader: Downloader,
    registry: Registry,
    device_name: Option<String>,
}

impl FrameTimeProfiler {
    pub fn new(downloader: Downloader, registry: Registry, device_name: Option<String>) -> Self {
        Self { downloader, registry, device_name }
    }

    /// Profile one trace and print its `PIGLIT:` line.
    pub fn trace(&self, trace_path: &str) -> Result<ReplayStatus> {
        let (result, record) = self.run_trace(trace_path)?;
        print_report(&TraceReport::single(record, result));
        Ok(result)
    }

    /// Profile the manifest's apitrace traces for the configured device.
    pub fn from_yaml(&mut self, manifest: &Manifest) -> Result<TraceReport<FrameTimesRecord>> {
        self.downloader.set_download_url(manifest.download_url.clone())?;

        let device = self.device_name.clone();
        let mut report = TraceReport { images: Vec::new(), result: ReplayStatus::Pass };
        for descriptor in traces(manifest, Some(PROFILED_EXTENSIONS), device.as_deref(), false) {
            let (result, record) = self.run_trace(&descriptor.path)?;
            report.result = report.result.merge(result);
            report.images.push(record);
        }

        info!("Profiled {} traces: {}", report.images.len(), report.result);
        Ok(report)
    }

    /// Download and profile one trace. Any replay failure is a `Crash` with
    /// no samples.
    pub fn run_trace(&self, trace_path: &str) -> Result<(ReplayStatus, FrameTimesRecord)> {
        let mut record = FrameTimesRecord { image_desc: trace_path.to_string(), frame_times: None };

        if let Err(e) = self.downloader.ensure_file(trace_path) {
            if e.is_fatal() {
                return Err(e.into());
            }
            println!("{e}");
            println!("[frame_times] error");
            return Ok((ReplayStatus::Crash, record));
        }

        record.frame_times = self.replay(trace_path);
        match &record.frame_times {
            Some(samples) => println!("[frame_times] {}", samples.len()),
            None => println!("[frame_times] error"),
        }

        let result = if record.frame_times.is_some() { ReplayStatus::Pass } else { ReplayStatus::Crash };
        Ok((result, record))
    }

    fn replay(&self, trace_path: &str) -> Option<Vec<u64>> {
        let local = self.downloader.local_path(trace_path);
        let profiled = self
            .registry
            .dispatch(DumpRequest::new(&local))
            .and_then(|mut backend| backend.profile());

        match profiled {
            Ok(samples) => Some(samples),
            Err(e) => {
                println!("{e}");
                println!(
                    "[frame_times] Trace {} couldn't be replayed. See above logs for more information.",
                    local.display()
                );
                None
            }
        }
    }
}
