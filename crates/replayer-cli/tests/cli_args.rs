//! Argument parsing tests
//!
//! Download options can also come from `PIGLIT_REPLAY_*` variables, so every
//! test runs serially with those variables cleared.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use replayer_cli::cli::{Cli, Command, CompareTarget, ProfileTarget, QueryCommand};
use replayer_cli::logging::LogFormat;
use serial_test::serial;

const DOWNLOAD_ENV: [&str; 6] = [
    "PIGLIT_REPLAY_DOWNLOAD_URL",
    "PIGLIT_REPLAY_CACHING_PROXY_URL",
    "PIGLIT_REPLAY_MINIO_HOST",
    "PIGLIT_REPLAY_MINIO_BUCKET",
    "PIGLIT_REPLAY_ROLE_SESSION_NAME",
    "PIGLIT_REPLAY_JWT",
];

fn parse(args: &[&str]) -> Result<Cli> {
    temp_env::with_vars_unset(DOWNLOAD_ENV, || -> Result<Cli> { Ok(Cli::try_parse_from(args)?) })
}

#[test]
#[serial]
fn compare_trace_with_defaults() -> Result<()> {
    let cli = parse(&["replayer", "compare", "trace", "glxgears.trace", "abc123"])?;

    assert_eq!(cli.db_path, PathBuf::from("./replayer-db/"));
    assert_eq!(cli.output, None);
    assert_eq!(cli.log_level, "warn");
    assert_eq!(cli.log_format, LogFormat::Pretty);
    assert_eq!(cli.download.download_url, None);
    assert!(!cli.download.force_download);

    let Command::Compare(args) = cli.command else { panic!("expected compare") };
    assert!(!args.keep_image);
    let CompareTarget::Trace { file_path, checksum } = args.target else { panic!("expected trace") };
    assert_eq!(file_path, "glxgears.trace");
    assert_eq!(checksum, "abc123");
    Ok(())
}

#[test]
#[serial]
fn shared_options_are_accepted_after_the_subcommand() -> Result<()> {
    let cli = parse(&[
        "replayer",
        "compare",
        "trace",
        "--device-name",
        "gl-virgl",
        "--download-url",
        "https://example.com/db/",
        "--keep-image",
        "-w",
        "-p",
        "/tmp/db",
        "-o",
        "/tmp/out",
        "a.trace",
        "abc",
    ])?;

    assert_eq!(cli.device_name.as_deref(), Some("gl-virgl"));
    assert_eq!(cli.download.download_url.as_deref(), Some("https://example.com/db/"));
    assert!(cli.download.force_download);
    assert_eq!(cli.db_path, PathBuf::from("/tmp/db"));
    assert_eq!(cli.output, Some(PathBuf::from("/tmp/out")));
    let Command::Compare(args) = cli.command else { panic!("expected compare") };
    assert!(args.keep_image);
    Ok(())
}

#[test]
#[serial]
fn minio_options_accept_both_spellings() -> Result<()> {
    let cli = parse(&[
        "replayer",
        "--minio_host",
        "minio.example.com",
        "--minio-bucket",
        "traces",
        "-r",
        "session",
        "-j",
        "token",
        "download",
        "a.trace",
    ])?;

    let options = cli.download.options()?;
    assert_eq!(options.minio_host.as_deref(), Some("minio.example.com"));
    assert_eq!(options.minio_bucket.as_deref(), Some("traces"));
    assert_eq!(options.role_session_name.as_deref(), Some("session"));
    assert_eq!(options.jwt.as_deref(), Some("token"));
    Ok(())
}

#[test]
#[serial]
fn jwt_file_content_is_trimmed_and_preferred() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let jwt_file = dir.path().join("jwt");
    std::fs::write(&jwt_file, "from-file\n")?;
    let jwt_file = jwt_file.to_string_lossy().into_owned();

    let cli = parse(&["replayer", "-j", "inline", "--jwt-file", &jwt_file, "download", "a.trace"])?;
    assert_eq!(cli.download.options()?.jwt.as_deref(), Some("from-file"));
    Ok(())
}

#[test]
#[serial]
fn download_options_fall_back_to_the_environment() -> Result<()> {
    let cli = temp_env::with_vars(
        [
            ("PIGLIT_REPLAY_DOWNLOAD_URL", Some("https://env.example.com/")),
            ("PIGLIT_REPLAY_CACHING_PROXY_URL", None),
        ],
        || Cli::try_parse_from(["replayer", "download", "a.trace"]),
    )?;
    assert_eq!(cli.download.download_url.as_deref(), Some("https://env.example.com/"));
    Ok(())
}

#[test]
#[serial]
fn yaml_targets_require_a_manifest() {
    assert!(parse(&["replayer", "compare", "yaml"]).is_err());
    assert!(parse(&["replayer", "profile", "yaml"]).is_err());
}

#[test]
#[serial]
fn profile_and_query_subcommands() -> Result<()> {
    let cli = parse(&["replayer", "profile", "yaml", "-y", "traces.yml", "-d", "gl-virgl"])?;
    let Command::Profile { target: ProfileTarget::Yaml(yaml) } = cli.command else {
        panic!("expected profile yaml")
    };
    assert_eq!(yaml.yaml_file, PathBuf::from("traces.yml"));

    let cli = parse(&["replayer", "query", "-y", "traces.yml", "traces", "-t", ".trace,.gfxr", "--checksum"])?;
    let Command::Query(args) = cli.command else { panic!("expected query") };
    let QueryCommand::Traces { trace_extensions, checksum } = args.query else {
        panic!("expected traces query")
    };
    assert_eq!(trace_extensions.as_deref(), Some(".trace,.gfxr"));
    assert!(checksum);
    Ok(())
}

#[test]
#[serial]
fn dump_calls_are_comma_separated() -> Result<()> {
    let cli = parse(&["replayer", "dump", "a.trace", "--calls", "12,40"])?;
    let Command::Dump(args) = cli.command else { panic!("expected dump") };
    assert_eq!(args.file_path, PathBuf::from("a.trace"));
    assert_eq!(args.calls, ["12", "40"]);
    Ok(())
}

#[test]
#[serial]
fn log_format_is_validated() {
    assert!(parse(&["replayer", "--log-format", "json", "plan"]).is_ok());
    assert!(parse(&["replayer", "--log-format", "xml", "plan"]).is_err());
}
