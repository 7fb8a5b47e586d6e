//! Trace queries against a realistic manifest.

use replayer_manifest::{Manifest, TraceDescriptor, download_url, load_yaml, trace_checksum, traces};

const TRACES: &str = r#"
traces-db:
  download-url: https://minio.example.com/mesa-tracie-public/
traces:
  "glmark2/desktop-blur-radius=5:effect=blur:passes=1:separable=true:windows=4.rdc":
    gl-vmware-llvmpipe:
      checksum: 8867f3a41f180626d0d4b7661ff5c0f4
  glxgears/glxgears-2.trace:
    gl-vmware-llvmpipe:
      checksum: f8eba0fec6e3e0af9cb09844bc73bdc7
    gl-virgl:
      checksum: f8eba0fec6e3e0af9cb09844bc73bdc7
  pathfinder/demo.trace:
    gl-vmware-llvmpipe:
      checksum: e624d76c70cc3c532f4f54439e13659a
  KhronosGroup-Vulkan-Tools/amd/polaris10/vkcube.gfxr:
    vk-amd-polaris10:
      checksum: 917cbbf4f09dd62ea26d247a1c70c16e
  unity/heavy.trace:
    gl-vmware-llvmpipe:
      checksum: 0d2c9b4f7e3a41b8a8f6c1e2d3b4a5c6
      label: [hang]
    gl-virgl:
      checksum: 6e1f0a5b2c3d4e5f60718293a4b5c6d7
"#;

fn manifest() -> Manifest {
    load_yaml(TRACES).unwrap()
}

fn paths(found: impl Iterator<Item = TraceDescriptor>) -> Vec<String> {
    found.map(|t| t.path).collect()
}

#[test]
fn empty_manifests_yield_nothing() {
    for text in ["{}", "traces: {}"] {
        let manifest = load_yaml(text).unwrap();
        assert_eq!(traces(&manifest, Some(".trace"), Some("gl-vmware-llvmpipe"), true).count(), 0);
    }
}

#[test]
fn extension_filter_applies_before_device() {
    let m = manifest();
    assert!(paths(traces(&m, Some(""), Some("gl-virgl"), false)).is_empty());
    assert!(paths(traces(&m, Some(".rdc"), Some("gl-virgl"), false)).is_empty());
    assert_eq!(
        paths(traces(&m, Some(".trace"), Some("gl-virgl"), false)),
        ["glxgears/glxgears-2.trace", "unity/heavy.trace"]
    );
}

#[test]
fn several_extensions_are_comma_separated() {
    let m = manifest();
    assert_eq!(
        paths(traces(&m, Some(".rdc,.trace"), Some("gl-vmware-llvmpipe"), false)),
        [
            "glmark2/desktop-blur-radius=5:effect=blur:passes=1:separable=true:windows=4.rdc",
            "glxgears/glxgears-2.trace",
            "pathfinder/demo.trace",
        ]
    );
}

#[test]
fn labelled_expectations_are_excluded() {
    let m = manifest();
    let on_llvmpipe = paths(traces(&m, None, Some("gl-vmware-llvmpipe"), false));
    assert!(!on_llvmpipe.contains(&"unity/heavy.trace".to_string()));
}

#[test]
fn without_device_each_trace_is_yielded_once() {
    let m = manifest();
    let found: Vec<_> = traces(&m, Some(".trace"), None, false).collect();
    assert_eq!(
        found.iter().map(|t| t.path.as_str()).collect::<Vec<_>>(),
        ["glxgears/glxgears-2.trace", "pathfinder/demo.trace", "unity/heavy.trace"]
    );
    // the hang-labelled llvmpipe block is passed over
    assert_eq!(found[2].device, "gl-virgl");
}

#[test]
fn checksums_are_included_on_request() {
    let m = manifest();
    let found: Vec<_> = traces(&m, Some(".gfxr"), Some("vk-amd-polaris10"), true).collect();
    assert_eq!(
        found,
        [TraceDescriptor {
            path: "KhronosGroup-Vulkan-Tools/amd/polaris10/vkcube.gfxr".to_string(),
            device: "vk-amd-polaris10".to_string(),
            checksum: Some("917cbbf4f09dd62ea26d247a1c70c16e".to_string()),
            labels: Default::default(),
        }]
    );
}

#[test]
fn checksum_without_device_is_the_empty_sentinel() {
    let m = manifest();
    let found: Vec<_> = traces(&m, Some(".gfxr"), None, true).collect();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].checksum.as_deref(), Some(""));
}

#[test]
fn missing_checksum_degrades_to_empty_string() {
    let m = load_yaml("traces:\n  a.trace:\n    dev: {}\n").unwrap();
    let found: Vec<_> = traces(&m, None, Some("dev"), true).collect();
    assert_eq!(found[0].checksum.as_deref(), Some(""));
    assert_eq!(trace_checksum(&m, "a.trace", "dev"), "");
}

#[test]
fn list_entry_without_path_yields_empty_descriptor() {
    let m = load_yaml(
        "traces:\n  - expectations:\n      - device: dev\n        checksum: abc\n",
    )
    .unwrap();
    let found: Vec<_> = traces(&m, None, Some("dev"), true).collect();
    assert_eq!(found.len(), 1);
    assert!(found[0].is_empty());

    // an extension filter cannot match a missing path
    assert_eq!(traces(&m, Some(".trace"), Some("dev"), true).count(), 0);
}

#[test]
fn trace_checksum_looks_up_one_device() {
    let m = manifest();
    assert_eq!(
        trace_checksum(&m, "glxgears/glxgears-2.trace", "gl-virgl"),
        "f8eba0fec6e3e0af9cb09844bc73bdc7"
    );
    assert_eq!(trace_checksum(&m, "glxgears/glxgears-2.trace", "vk-intel-anv"), "");
    assert_eq!(trace_checksum(&m, "nope.trace", "gl-virgl"), "");
}

#[test]
fn download_url_comes_from_traces_db() {
    assert_eq!(
        download_url(&manifest()),
        Some("https://minio.example.com/mesa-tracie-public/")
    );
}
