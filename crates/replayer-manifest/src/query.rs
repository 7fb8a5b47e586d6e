//! Trace selection by extension, device and label

use std::collections::BTreeSet;

use serde::Serialize;

use crate::manifest::{DeviceExpectation, Manifest, TraceEntry};

/// Labels that keep a trace out of every run.
pub const EXCLUDED_LABELS: [&str; 5] = ["skip", "hang", "crash", "fail", "unsupported"];

/// One trace to replay for one device.
///
/// A list-layout entry without a `path` yields `TraceDescriptor::default()`:
/// an empty path, which downstream replay reports as missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraceDescriptor {
    pub path: String,
    pub device: String,
    /// Present only when checksums were requested; `""` when the manifest
    /// has none for the device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub labels: BTreeSet<String>,
}

impl TraceDescriptor {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

pub fn is_excluded(labels: &BTreeSet<String>) -> bool {
    EXCLUDED_LABELS.iter().any(|l| labels.contains(*l))
}

/// Extension after the last dot of the final path component, dot included,
/// or `""`.
pub fn trace_extension(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    let name = &path[name_start..];
    match name.rfind('.') {
        Some(dot) if dot > 0 && !name[..dot].chars().all(|c| c == '.') => &name[dot..],
        _ => "",
    }
}

/// Traces relevant to a run.
///
/// * `extensions`: comma-separated list such as `".trace,.gfxr"`; entries
///   whose extension is not listed are dropped.
/// * `device`: keep only entries with an expectation for this device. With
///   no device each trace is yielded once, for its first usable device, and
///   a requested checksum is `""`.
/// * labelled `skip`, `hang`, `crash`, `fail` or `unsupported` expectations
///   are never yielded.
pub fn traces<'a>(
    manifest: &'a Manifest,
    extensions: Option<&'a str>,
    device: Option<&'a str>,
    include_checksum: bool,
) -> impl Iterator<Item = TraceDescriptor> + 'a {
    let extensions: Option<Vec<&str>> = extensions.map(|list| list.split(',').collect());

    manifest.traces.iter().filter_map(move |entry| {
        if let Some(extensions) = &extensions {
            let path = entry.path.as_deref()?;
            if !extensions.contains(&trace_extension(path)) {
                return None;
            }
        }
        select(entry, device, include_checksum)
    })
}

fn select(entry: &TraceEntry, device: Option<&str>, include_checksum: bool) -> Option<TraceDescriptor> {
    let chosen: Option<&DeviceExpectation> = match device {
        Some(device) => Some(entry.expectation(device)?),
        None if entry.expectations.is_empty() => None,
        None => Some(entry.expectations.iter().find(|e| !is_excluded(&e.labels))?),
    };
    if chosen.is_some_and(|e| is_excluded(&e.labels)) {
        return None;
    }

    let Some(path) = entry.path.clone() else {
        return Some(TraceDescriptor::default());
    };

    let checksum = include_checksum.then(|| match (device, chosen) {
        (Some(_), Some(e)) => e.checksum.clone().unwrap_or_default(),
        _ => String::new(),
    });

    Some(TraceDescriptor {
        path,
        device: device.map(str::to_string).unwrap_or_else(|| {
            chosen.map(|e| e.device.clone()).unwrap_or_default()
        }),
        checksum,
        labels: chosen.map(|e| e.labels.clone()).unwrap_or_default(),
    })
}

/// Expected checksum of `path` on `device`, or `""` when there is none.
pub fn trace_checksum(manifest: &Manifest, path: &str, device: &str) -> String {
    manifest
        .entry(path)
        .and_then(|entry| entry.expectation(device))
        .and_then(|e| e.checksum.clone())
        .unwrap_or_default()
}

/// `traces-db.download-url`, if set.
pub fn download_url(manifest: &Manifest) -> Option<&str> {
    manifest.download_url.as_deref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_follows_the_last_dot() {
        assert_eq!(trace_extension("glxgears/glxgears-2.trace"), ".trace");
        assert_eq!(trace_extension("d3d/game.trace-dxgi"), ".trace-dxgi");
        assert_eq!(trace_extension("a.b/c"), "");
        assert_eq!(trace_extension("dir/.hidden"), "");
        assert_eq!(
            trace_extension("glmark2/desktop-blur-radius=5:effect=blur:passes=1:separable=true:windows=4.rdc"),
            ".rdc"
        );
    }

    #[test]
    fn excluded_labels_are_detected() {
        let labels: BTreeSet<String> = ["flaky".to_string(), "hang".to_string()].into();
        assert!(is_excluded(&labels));
        assert!(!is_excluded(&BTreeSet::from(["flaky".to_string()])));
    }
}
