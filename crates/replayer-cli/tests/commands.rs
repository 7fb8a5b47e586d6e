//! Command execution without external replay tools
//!
//! Only paths that never spawn a tool are exercised: manifest queries,
//! planning, and traces no backend claims.

use std::fs;

use anyhow::Result;
use clap::Parser;
use replayer_cli::cli::Cli;
use replayer_cli::commands;
use replayer_cli::exit::{EXIT_CRASH, EXIT_PASS};
use serial_test::serial;

const REPLAY_ENV: [&str; 9] = [
    "PIGLIT_REPLAY_CONFIG",
    "PIGLIT_REPLAY_DEVICE_NAME",
    "PIGLIT_REPLAY_DESCRIPTION_FILE",
    "PIGLIT_REPLAY_SUBCOMMAND",
    "PIGLIT_REPLAY_EXTRA_ARGS",
    "PIGLIT_REPLAY_LOOP_TIMES",
    "PIGLIT_REPLAY_DOWNLOAD_URL",
    "PIGLIT_REPLAY_CACHING_PROXY_URL",
    "PIGLIT_REPLAY_MINIO_HOST",
];

const MANIFEST: &str = "\
traces-db:
  download-url: https://example.com/db/
traces:
  glxgears/glxgears-2.trace:
    gl-virgl: {checksum: f8eba0fec6e3e0af9cb09844bc73bdc7}
  capture.rdc:
    gl-virgl: {checksum: 0123abcd}
";

fn run(args: &[&str]) -> Result<i32> {
    temp_env::with_vars_unset(REPLAY_ENV, || -> Result<i32> {
        let cli = Cli::try_parse_from(args)?;
        commands::run(&cli)
    })
}

#[test]
#[serial]
fn unsupported_trace_is_a_crash() -> Result<()> {
    let db = tempfile::tempdir()?;
    let results = tempfile::tempdir()?;
    fs::write(db.path().join("capture.rdc"), b"rdc")?;

    let code = run(&[
        "replayer",
        "compare",
        "trace",
        "-d",
        "gl-virgl",
        "-p",
        &db.path().to_string_lossy(),
        "-o",
        &results.path().to_string_lossy(),
        "capture.rdc",
        "0123abcd",
    ])?;
    assert_eq!(code, EXIT_CRASH);
    Ok(())
}

#[test]
#[serial]
fn missing_trace_without_download_url_is_fatal() -> Result<()> {
    let db = tempfile::tempdir()?;
    let result = run(&["replayer", "download", "-p", &db.path().to_string_lossy(), "absent.trace"]);
    assert!(result.is_err());
    Ok(())
}

#[test]
#[serial]
fn present_trace_needs_no_download() -> Result<()> {
    let db = tempfile::tempdir()?;
    fs::write(db.path().join("a.trace"), b"trace")?;
    let code = run(&["replayer", "download", "-p", &db.path().to_string_lossy(), "a.trace"])?;
    assert_eq!(code, EXIT_PASS);
    Ok(())
}

#[test]
#[serial]
fn dumping_an_unsupported_trace_is_fatal() {
    assert!(run(&["replayer", "dump", "capture.rdc"]).is_err());
}

#[test]
#[serial]
fn queries_succeed_on_a_valid_manifest() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let manifest = dir.path().join("traces.yml");
    fs::write(&manifest, MANIFEST)?;
    let manifest = manifest.to_string_lossy().into_owned();

    assert_eq!(run(&["replayer", "query", "-y", &manifest, "download-url"])?, EXIT_PASS);
    assert_eq!(
        run(&["replayer", "query", "-y", &manifest, "traces", "-d", "gl-virgl", "--checksum"])?,
        EXIT_PASS
    );
    assert_eq!(
        run(&["replayer", "query", "-y", &manifest, "checksum", "-d", "gl-virgl", "capture.rdc"])?,
        EXIT_PASS
    );
    Ok(())
}

#[test]
#[serial]
fn checksum_query_requires_a_device() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let manifest = dir.path().join("traces.yml");
    fs::write(&manifest, MANIFEST)?;

    let result = run(&["replayer", "query", "-y", &manifest.to_string_lossy(), "checksum", "capture.rdc"]);
    assert!(result.is_err());
    Ok(())
}

#[test]
#[serial]
fn invalid_manifest_is_fatal() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let manifest = dir.path().join("traces.yml");
    fs::write(&manifest, "traces: [unclosed")?;

    assert!(run(&["replayer", "query", "-y", &manifest.to_string_lossy(), "download-url"]).is_err());
    Ok(())
}

#[test]
#[serial]
fn plan_needs_a_description_file() {
    assert!(run(&["replayer", "plan", "-d", "gl-virgl"]).is_err());
}

#[test]
#[serial]
fn plan_reads_the_configured_manifest() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let manifest = dir.path().join("traces.yml");
    fs::write(&manifest, MANIFEST)?;
    let config = dir.path().join("replayer.toml");
    fs::write(
        &config,
        format!("[replay]\ndescription_file = {:?}\ndevice_name = \"gl-virgl\"\n", manifest.to_string_lossy()),
    )?;

    assert_eq!(run(&["replayer", "--config", &config.to_string_lossy(), "plan"])?, EXIT_PASS);
    Ok(())
}
