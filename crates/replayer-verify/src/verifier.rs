//! Checksum verification of replayed traces

use std::fs;
use std::path::{Path, PathBuf};

use replayer_backends::Registry;
use replayer_common::{ImageComparison, ReplayStatus, TraceReport};
use replayer_download::Downloader;
use replayer_manifest::{Manifest, traces};
use tracing::{info, warn};

use crate::checksum::hexdigest_from_image;
use crate::error::{Result, VerifyError};

/// Where results go and what is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOptions {
    pub device_name: Option<String>,
    pub results_path: PathBuf,
    /// Keep the rendered image of a matching trace (renamed to embed its
    /// checksum)
    pub keep_image: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self { device_name: None, results_path: PathBuf::from("./results/"), keep_image: false }
    }
}

impl VerifyOptions {
    /// `<results>/trace/<device>/<trace dir>`
    pub fn results_dir_for(&self, trace_path: &str) -> PathBuf {
        let trace_dir = Path::new(trace_path).parent().unwrap_or(Path::new(""));
        self.results_path
            .join("trace")
            .join(self.device_name.as_deref().unwrap_or(""))
            .join(trace_dir)
    }
}

/// Replays traces and compares their last frame against a reference
/// checksum.
pub struct Verifier {
    downloader: Downloader,
    registry: Registry,
    options: VerifyOptions,
}

impl Verifier {
    pub fn new(downloader: Downloader, registry: Registry, options: VerifyOptions) -> Self {
        Self { downloader, registry, options }
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Verify one trace and print its `PIGLIT:` line.
    pub fn trace(&self, trace_path: &str, expected_checksum: &str) -> Result<ReplayStatus> {
        let (result, record) = self.check_trace(trace_path, expected_checksum)?;
        print_report(&TraceReport::single(record, result));
        Ok(result)
    }

    /// Verify every trace the manifest lists for the configured device.
    ///
    /// The manifest's download URL replaces the configured one. The returned
    /// report holds every record and the aggregate result.
    pub fn from_yaml(&mut self, manifest: &Manifest) -> Result<TraceReport<ImageComparison>> {
        self.downloader.set_download_url(manifest.download_url.clone())?;

        let device = self.options.device_name.clone();
        let mut report = TraceReport { images: Vec::new(), result: ReplayStatus::Pass };
        for descriptor in traces(manifest, None, device.as_deref(), true) {
            let expected = descriptor.checksum.unwrap_or_default();
            let (result, record) = self.check_trace(&descriptor.path, &expected)?;
            report.result = report.result.merge(result);
            report.images.push(record);
        }

        info!("Verified {} traces: {}", report.images.len(), report.result);
        Ok(report)
    }

    /// Download, replay and compare one trace.
    ///
    /// Only configuration problems are errors; anything that stops a
    /// checksum from being computed is a `Crash`.
    pub fn check_trace(
        &self,
        trace_path: &str,
        expected_checksum: &str,
    ) -> Result<(ReplayStatus, ImageComparison)> {
        let mut record = ImageComparison::unrendered(trace_path, expected_checksum);

        if let Err(e) = self.downloader.ensure_file(trace_path) {
            if e.is_fatal() {
                return Err(e.into());
            }
            println!("{e}");
            println!("[check_image] Trace {trace_path} couldn't be downloaded.");
            return Ok((ReplayStatus::Crash, record));
        }

        let results_dir = self.options.results_dir_for(trace_path);
        fs::create_dir_all(&results_dir).map_err(|e| VerifyError::io(&results_dir, e))?;

        let rendered = self.replay(&self.downloader.local_path(trace_path), &results_dir);
        println!(
            "[check_image]\n    actual: {}\n  expected: {}",
            rendered.as_ref().map_or("error", |(checksum, _)| checksum.as_str()),
            expected_checksum
        );

        let Some((checksum, image_file)) = rendered else {
            return Ok((ReplayStatus::Crash, record));
        };
        record.set_rendered(&checksum);

        let result = if checksum == expected_checksum {
            if !self.options.keep_image {
                fs::remove_file(&image_file).map_err(|e| VerifyError::io(&image_file, e))?;
            }
            println!("[check_image] Images match for:\n  {trace_path}\n");
            ReplayStatus::Pass
        } else {
            println!("[check_image] Images differ for:\n  {trace_path}");
            println!(
                "[check_image] For more information see \
                 https://gitlab.freedesktop.org/mesa/piglit/blob/master/replayer/README.md\n"
            );
            ReplayStatus::Fail
        };

        if result != ReplayStatus::Pass || self.options.keep_image {
            let destination = with_checksum_suffix(&image_file, &checksum);
            fs::rename(&image_file, &destination).map_err(|e| VerifyError::io(&image_file, e))?;
            record.image_render = Some(destination.display().to_string());
        }

        Ok((result, record))
    }

    /// Replay into `results_dir`, returning the checksum and path of the
    /// first snapshot this replay wrote. Images left over from earlier runs
    /// are ignored.
    fn replay(&self, trace: &Path, results_dir: &Path) -> Option<(String, PathBuf)> {
        let written = match self.registry.dump(trace, Some(results_dir.to_path_buf()), Vec::new()) {
            Ok(result) if result.success => Some(result.images),
            Ok(_) => None,
            Err(e) => {
                println!("{e}");
                None
            }
        };
        let Some(written) = written else {
            println!(
                "[check_image] Trace {} couldn't be replayed. See above logs for more information.",
                trace.display()
            );
            return None;
        };

        let basename = trace.file_name()?.to_string_lossy().into_owned();
        let Some(image_file) = first_written(dumped_images(results_dir, &basename), &written) else {
            println!(
                "[check_image] No dumped files found in the results path \"{}\". \
                 See above logs for more information.",
                results_dir.display()
            );
            return None;
        };

        match hexdigest_from_image(&image_file) {
            Ok(checksum) => Some((checksum, image_file)),
            Err(e) => {
                warn!("{e}");
                println!("[check_image] {e}");
                None
            }
        }
    }
}

/// `<basename>-*.png` in `dir`, sorted.
pub fn dumped_images(dir: &Path, basename: &str) -> Vec<PathBuf> {
    let pattern = format!(
        "{}/{}-*.png",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(basename)
    );
    let Ok(paths) = glob::glob(&pattern) else {
        warn!("Invalid snapshot pattern {pattern}");
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
    found.sort();
    found
}

/// First of `found` that is also in `written`, matched by file name.
fn first_written(found: Vec<PathBuf>, written: &[PathBuf]) -> Option<PathBuf> {
    found
        .into_iter()
        .find(|path| written.iter().any(|w| w.file_name().is_some() && w.file_name() == path.file_name()))
}

/// `dir/name.png` becomes `dir/name-<checksum>.png`.
pub fn with_checksum_suffix(image_file: &Path, checksum: &str) -> PathBuf {
    let stem = image_file.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let name = match image_file.extension() {
        Some(ext) => format!("{stem}-{checksum}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{checksum}"),
    };
    image_file.with_file_name(name)
}

pub(crate) fn print_report<T: serde::Serialize>(report: &TraceReport<T>) {
    match report.piglit_line() {
        Ok(line) => println!("{line}"),
        Err(e) => warn!("failed to serialize result line: {e}"),
    }
}
