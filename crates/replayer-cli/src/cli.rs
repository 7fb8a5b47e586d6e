//! Command-line surface

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use replayer_download::DownloadOptions;

use crate::logging::LogFormat;

/// Trace replayer - replay GPU traces and verify their rendering
#[derive(Debug, Parser)]
#[command(name = "replayer")]
#[command(version)]
#[command(long_about = r#"
Replays recorded GPU API traces (apitrace, GFXReconstruct), checksums the
last rendered frame and compares it against a reference, or profiles the
per-frame GPU time of a replay.

Examples:
  # Compare one trace against its reference checksum
  replayer compare trace -d gl-virgl glxgears/glxgears-2.trace f8eba0fec6e3e0af9cb09844bc73bdc7

  # Compare every trace a manifest lists for a device
  replayer compare yaml -d gl-virgl -y traces.yml

  # Profile frame times
  replayer profile trace -u https://example.com/db/ glxgears/glxgears-2.trace

Each compare or profile run ends with a `PIGLIT: {json}` line on stdout.
Exit status is 0 for pass, 1 for fail, 2 for crash and 3 for fatal errors.
"#)]
pub struct Cli {
    /// Configuration file path
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, value_name = "LEVEL", global = true, default_value = "warn")]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, global = true, default_value = "pretty")]
    pub log_format: LogFormat,

    /// The name of the graphics device used to replay traces
    #[arg(short = 'd', long, value_name = "NAME", global = true)]
    pub device_name: Option<String>,

    /// The path to the objects db or where it will be created
    #[arg(short = 'p', long, value_name = "PATH", global = true, default_value = "./replayer-db/")]
    pub db_path: PathBuf,

    /// The path in which to place the results [compare default: ./results/]
    #[arg(short = 'o', long, value_name = "PATH", global = true)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub download: DownloadArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Where traces come from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Args)]
pub struct DownloadArgs {
    /// The URL from which to download the files
    #[arg(short = 'u', long, value_name = "URL", global = true, env = "PIGLIT_REPLAY_DOWNLOAD_URL")]
    pub download_url: Option<String>,

    /// Caching proxy URL, used as a prefix of the download URL
    #[arg(
        short = 'c',
        long,
        value_name = "URL",
        global = true,
        env = "PIGLIT_REPLAY_CACHING_PROXY_URL"
    )]
    pub download_caching_proxy_url: Option<String>,

    /// Download even if the destination file already exists
    #[arg(short = 'w', long, global = true)]
    pub force_download: bool,

    /// Name of the MinIO server from which to download traces
    #[arg(
        short = 'm',
        long,
        alias = "minio_host",
        value_name = "HOST",
        global = true,
        env = "PIGLIT_REPLAY_MINIO_HOST"
    )]
    pub minio_host: Option<String>,

    /// Bucket in the MinIO server containing the traces
    #[arg(
        short = 'b',
        long,
        alias = "minio_bucket",
        value_name = "BUCKET",
        global = true,
        env = "PIGLIT_REPLAY_MINIO_BUCKET"
    )]
    pub minio_bucket: Option<String>,

    /// Role session name for authentication with MinIO
    #[arg(
        short = 'r',
        long,
        value_name = "NAME",
        global = true,
        env = "PIGLIT_REPLAY_ROLE_SESSION_NAME"
    )]
    pub role_session_name: Option<String>,

    /// JWT for authentication with MinIO
    #[arg(short = 'j', long, value_name = "TOKEN", global = true, env = "PIGLIT_REPLAY_JWT")]
    pub jwt: Option<String>,

    /// File containing the JWT; wins over --jwt
    #[arg(long, value_name = "PATH", global = true)]
    pub jwt_file: Option<PathBuf>,
}

impl DownloadArgs {
    pub fn options(&self) -> Result<DownloadOptions> {
        let jwt = match &self.jwt_file {
            Some(path) => Some(
                fs::read_to_string(path)
                    .with_context(|| format!("Failed to read JWT file {}", path.display()))?
                    .trim()
                    .to_string(),
            ),
            None => self.jwt.clone(),
        };

        Ok(DownloadOptions {
            url: self.download_url.clone(),
            caching_proxy_url: self.download_caching_proxy_url.clone(),
            force: self.force_download,
            minio_host: self.minio_host.clone(),
            minio_bucket: self.minio_bucket.clone(),
            role_session_name: self.role_session_name.clone(),
            jwt,
            ..DownloadOptions::default()
        })
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay traces and compare the last frame against reference checksums
    Compare(CompareArgs),

    /// Replay apitrace traces and collect per-frame GPU times
    Profile {
        #[command(subcommand)]
        target: ProfileTarget,
    },

    /// Replay one trace and write its snapshots
    Dump(DumpArgs),

    /// Make sure a trace is present in the db
    Download {
        /// Trace path relative to the db and the download URL
        file_path: String,
    },

    /// Inspect a traces manifest
    Query(QueryArgs),

    /// Print the per-trace invocations of a batch run
    Plan,
}

#[derive(Debug, Args)]
pub struct CompareArgs {
    /// Keep the rendered image even when it matches
    #[arg(short = 'k', long, global = true)]
    pub keep_image: bool,

    #[command(subcommand)]
    pub target: CompareTarget,
}

#[derive(Debug, Subcommand)]
pub enum CompareTarget {
    /// Compare a single trace
    Trace {
        /// Trace path relative to the db
        file_path: String,
        /// Expected checksum of the last frame
        checksum: String,
    },
    /// Compare every trace a manifest lists for the device
    Yaml(YamlArgs),
}

#[derive(Debug, Subcommand)]
pub enum ProfileTarget {
    /// Profile a single trace
    Trace {
        /// Trace path relative to the db
        file_path: String,
    },
    /// Profile every apitrace trace a manifest lists for the device
    Yaml(YamlArgs),
}

#[derive(Debug, Clone, Args)]
pub struct YamlArgs {
    /// Traces manifest listing traces and their checksums per device
    #[arg(short = 'y', long, value_name = "PATH")]
    pub yaml_file: PathBuf,
}

#[derive(Debug, Args)]
pub struct DumpArgs {
    /// Trace file to replay
    pub file_path: PathBuf,

    /// Comma-separated calls (apitrace) or frames (GFXReconstruct) to snapshot;
    /// the last frame when omitted
    #[arg(long, value_name = "CALLS", value_delimiter = ',')]
    pub calls: Vec<String>,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[command(flatten)]
    pub yaml: YamlArgs,

    #[command(subcommand)]
    pub query: QueryCommand,
}

#[derive(Debug, Subcommand)]
pub enum QueryCommand {
    /// List trace paths, optionally with their checksum for the device
    Traces {
        /// Comma-separated extensions to keep, e.g. ".trace,.gfxr"
        #[arg(short = 't', long, value_name = "EXTS")]
        trace_extensions: Option<String>,

        /// Print the device's checksum after each path
        #[arg(long)]
        checksum: bool,
    },
    /// Print the device's checksum of one trace
    Checksum {
        file_path: String,
    },
    /// Print the manifest's download URL
    DownloadUrl,
}
