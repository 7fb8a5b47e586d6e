//! Manifest document model
//!
//! Two layouts are accepted for the `traces` key. The mapping layout:
//!
//! ```yaml
//! traces-db:
//!   download-url: https://example.com/traces-db/
//! traces:
//!   glxgears/glxgears-2.trace:
//!     gl-vmware-llvmpipe:
//!       checksum: f8eba0fec6e3e0af9cb09844bc73bdc7
//!       label: [skip]
//! ```
//!
//! and the older list layout:
//!
//! ```yaml
//! traces:
//!   - path: glxgears/glxgears-2.trace
//!     expectations:
//!       - device: gl-vmware-llvmpipe
//!         checksum: f8eba0fec6e3e0af9cb09844bc73bdc7
//! ```
//!
//! A document that is valid YAML but has neither shape parses to an empty
//! manifest.

use std::collections::BTreeSet;
use std::path::Path;

use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use crate::error::{ManifestError, Result};

/// One device's expectation for a trace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceExpectation {
    pub device: String,
    pub checksum: Option<String>,
    pub labels: BTreeSet<String>,
}

/// A trace and its per-device expectations, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceEntry {
    /// `None` for list entries without a usable `path`
    pub path: Option<String>,
    pub expectations: Vec<DeviceExpectation>,
}

impl TraceEntry {
    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.expectations.iter().map(|e| e.device.as_str())
    }

    pub fn expectation(&self, device: &str) -> Option<&DeviceExpectation> {
        self.expectations.iter().find(|e| e.device == device)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub download_url: Option<String>,
    pub traces: Vec<TraceEntry>,
}

impl Manifest {
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn entry(&self, path: &str) -> Option<&TraceEntry> {
        self.traces.iter().find(|t| t.path.as_deref() == Some(path))
    }
}

/// Parse a manifest. Only invalid YAML is an error.
pub fn load_yaml(text: &str) -> Result<Manifest> {
    let document: Value = serde_yaml::from_str(text).map_err(ManifestError::Parse)?;
    Ok(from_value(&document))
}

pub fn load_file(path: impl AsRef<Path>) -> Result<Manifest> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|source| ManifestError::Read { path: path.to_path_buf(), source })?;
    load_yaml(&text)
}

fn from_value(document: &Value) -> Manifest {
    if document.is_null() {
        return Manifest::default();
    }
    let Some(root) = document.as_mapping() else {
        warn!("Manifest top level is not a mapping, treating it as empty");
        return Manifest::default();
    };

    let traces = match root.get("traces") {
        Some(Value::Mapping(map)) => traces_from_mapping(map),
        Some(Value::Sequence(list)) => list.iter().filter_map(trace_from_list_item).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => {
            warn!("Unexpected `traces` value {:?}, ignoring it", other);
            Vec::new()
        }
    };

    let manifest = Manifest { download_url: download_url_of(root), traces };
    debug!("Loaded manifest with {} traces", manifest.len());
    manifest
}

fn download_url_of(root: &Mapping) -> Option<String> {
    root.get("traces-db")?.as_mapping()?.get("download-url")?.as_str().map(str::to_string)
}

fn traces_from_mapping(map: &Mapping) -> Vec<TraceEntry> {
    map.iter()
        .filter_map(|(path, devices)| {
            let path = scalar_string(path)?;
            let expectations = match devices.as_mapping() {
                Some(devices) => devices
                    .iter()
                    .filter_map(|(device, props)| {
                        Some(expectation(scalar_string(device)?, props))
                    })
                    .collect(),
                None => Vec::new(),
            };
            Some(TraceEntry { path: Some(path), expectations })
        })
        .collect()
}

fn trace_from_list_item(item: &Value) -> Option<TraceEntry> {
    let Some(item) = item.as_mapping() else {
        warn!("Skipping trace list item that is not a mapping: {:?}", item);
        return None;
    };

    let path = item.get("path").and_then(Value::as_str).map(str::to_string);
    let expectations = item
        .get("expectations")
        .and_then(Value::as_sequence)
        .map(|list| {
            list.iter()
                .filter_map(|e| {
                    let device = e.get("device").and_then(scalar_string)?;
                    Some(expectation(device, e))
                })
                .collect()
        })
        .unwrap_or_default();

    Some(TraceEntry { path, expectations })
}

fn expectation(device: String, props: &Value) -> DeviceExpectation {
    DeviceExpectation {
        device,
        checksum: props.get("checksum").and_then(scalar_string),
        labels: props.get("label").map(labels).unwrap_or_default(),
    }
}

/// `label` may be a single string or a list of strings.
fn labels(value: &Value) -> BTreeSet<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar_string).collect(),
        other => scalar_string(other).into_iter().collect(),
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_yaml_is_an_error() {
        let err = load_yaml("*** this is not YAML ***").unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
        assert_eq!(err.to_string(), "Cannot use the provided stream. Is it YAML?");
    }

    #[test]
    fn empty_and_foreign_documents_are_empty_manifests() {
        for text in ["", "- First\n- Second\n", "a: 1\nb:\n  c: 2\n", "traces: one\n"] {
            let manifest = load_yaml(text).unwrap();
            assert!(manifest.is_empty(), "{text:?}");
            assert_eq!(manifest.download_url, None);
        }
    }

    #[test]
    fn download_url_is_read_from_traces_db() {
        let manifest =
            load_yaml("traces-db:\n  one: 1\n  download-url: an url\n").unwrap();
        assert_eq!(manifest.download_url.as_deref(), Some("an url"));

        let manifest = load_yaml("traces-db:\n  one: 1\n").unwrap();
        assert_eq!(manifest.download_url, None);

        let manifest = load_yaml("traces-db: one\n").unwrap();
        assert_eq!(manifest.download_url, None);
    }

    #[test]
    fn mapping_layout_keeps_document_order() {
        let manifest = load_yaml(
            "traces:\n\
             \x20 b.trace:\n\
             \x20   dev-1: {checksum: bbb}\n\
             \x20 a.trace:\n\
             \x20   dev-2: {checksum: aaa, label: [skip, hang]}\n\
             \x20   dev-1: {}\n",
        )
        .unwrap();

        let paths: Vec<_> = manifest.traces.iter().map(|t| t.path.as_deref().unwrap()).collect();
        assert_eq!(paths, ["b.trace", "a.trace"]);

        let a = manifest.entry("a.trace").unwrap();
        assert_eq!(a.devices().collect::<Vec<_>>(), ["dev-2", "dev-1"]);
        assert_eq!(
            a.expectation("dev-2").unwrap().labels,
            BTreeSet::from(["hang".to_string(), "skip".to_string()])
        );
        assert_eq!(a.expectation("dev-1").unwrap().checksum, None);
    }

    #[test]
    fn list_layout_is_accepted() {
        let manifest = load_yaml(
            "traces:\n\
             \x20 - path: glmark2/jellyfish.rdc\n\
             \x20   expectations:\n\
             \x20     - device: gl-vmware-llvmpipe\n\
             \x20       checksum: 58359ea4caf6ad44c6b65526881c0f53\n\
             \x20       label: crash\n\
             \x20 - expectations: []\n",
        )
        .unwrap();

        assert_eq!(manifest.len(), 2);
        let first = &manifest.traces[0];
        assert_eq!(first.path.as_deref(), Some("glmark2/jellyfish.rdc"));
        assert_eq!(
            first.expectations[0].labels,
            BTreeSet::from(["crash".to_string()])
        );
        assert_eq!(manifest.traces[1].path, None);
    }

    #[test]
    fn manifest_is_loaded_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("traces.yml");
        std::fs::write(&path, "traces:\n  a.trace:\n    dev: {checksum: c}\n").unwrap();

        assert_eq!(load_file(&path).unwrap().len(), 1);
        assert!(matches!(
            load_file(dir.path().join("missing.yml")),
            Err(ManifestError::Read { .. })
        ));
    }
}
