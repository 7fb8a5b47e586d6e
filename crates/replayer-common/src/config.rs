//! Replayer configuration
//!
//! Tool locations and replay tunables come from three layers, highest
//! precedence first: `PIGLIT_REPLAY_*` environment variables, the `[replay]`
//! table of an optional TOML file, and built-in defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Environment variable naming an optional TOML configuration file.
pub const CONFIG_PATH_ENV: &str = "PIGLIT_REPLAY_CONFIG";

const DEFAULT_LOOP_TIMES: usize = 150;

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue { key: &'static str, value: String, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which pipeline a batch run drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplaySubcommand {
    #[default]
    Compare,
    Profile,
}

impl ReplaySubcommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Compare => "compare",
            Self::Profile => "profile",
        }
    }
}

impl fmt::Display for ReplaySubcommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReplaySubcommand {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "compare" => Ok(Self::Compare),
            "profile" => Ok(Self::Profile),
            other => Err(ConfigError::InvalidValue {
                key: "subcommand",
                value: other.to_string(),
                reason: "expected \"compare\" or \"profile\"".to_string(),
            }),
        }
    }
}

/// Paths of the external replay executables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub apitrace_bin: String,
    pub eglretrace_bin: String,
    pub wine_bin: String,
    pub wine_apitrace_bin: String,
    pub wine_d3dretrace_bin: String,
    #[serde(rename = "gfxrecon-info_bin")]
    pub gfxrecon_info_bin: String,
    #[serde(rename = "gfxrecon-replay_bin")]
    pub gfxrecon_replay_bin: String,
    /// Whitespace-separated arguments inserted before the mandatory
    /// gfxrecon-replay flags
    #[serde(rename = "gfxrecon-replay_extra_args")]
    pub gfxrecon_replay_extra_args: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            apitrace_bin: "apitrace".to_string(),
            eglretrace_bin: "eglretrace".to_string(),
            wine_bin: "wine".to_string(),
            wine_apitrace_bin: "apitrace".to_string(),
            wine_d3dretrace_bin: "d3dretrace".to_string(),
            gfxrecon_info_bin: "gfxrecon-info".to_string(),
            gfxrecon_replay_bin: "gfxrecon-replay".to_string(),
            gfxrecon_replay_extra_args: String::new(),
        }
    }
}

impl ToolPaths {
    pub fn gfxrecon_replay_extra_args(&self) -> Vec<String> {
        split_args(&self.gfxrecon_replay_extra_args)
    }
}

/// Complete replayer configuration (`[replay]` table).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    #[serde(flatten)]
    pub tools: ToolPaths,
    /// How many times the last frame is looped when profiling; also the
    /// number of trailing samples kept
    pub loop_times: usize,
    pub subcommand: ReplaySubcommand,
    pub description_file: Option<PathBuf>,
    pub device_name: Option<String>,
    /// Whitespace-separated arguments appended to every planned invocation
    pub extra_args: String,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            tools: ToolPaths::default(),
            loop_times: DEFAULT_LOOP_TIMES,
            subcommand: ReplaySubcommand::default(),
            description_file: None,
            device_name: None,
            extra_args: String::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    replay: ReplayConfig,
}

impl ReplayConfig {
    /// Load configuration from a TOML file without applying the environment.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let file: ConfigFile = toml::from_str(&content)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
        Ok(file.replay)
    }

    /// Load the effective configuration: optional file, then environment,
    /// then validation.
    ///
    /// When `path` is `None`, `PIGLIT_REPLAY_CONFIG` is consulted.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(from_env) {
            Some(path) => {
                debug!("Loading replay configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay `PIGLIT_REPLAY_*` environment variables onto this config.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        let tools = &mut self.tools;
        let string_overrides: [(&str, &mut String); 9] = [
            ("PIGLIT_REPLAY_APITRACE_BINARY", &mut tools.apitrace_bin),
            ("PIGLIT_REPLAY_EGLRETRACE_BINARY", &mut tools.eglretrace_bin),
            ("PIGLIT_REPLAY_WINE_BINARY", &mut tools.wine_bin),
            ("PIGLIT_REPLAY_WINE_APITRACE_BINARY", &mut tools.wine_apitrace_bin),
            ("PIGLIT_REPLAY_WINE_D3DRETRACE_BINARY", &mut tools.wine_d3dretrace_bin),
            ("PIGLIT_REPLAY_GFXRECON_INFO_BINARY", &mut tools.gfxrecon_info_bin),
            ("PIGLIT_REPLAY_GFXRECON_REPLAY_BINARY", &mut tools.gfxrecon_replay_bin),
            ("PIGLIT_REPLAY_GFXRECON_REPLAY_EXTRA_ARGS", &mut tools.gfxrecon_replay_extra_args),
            ("PIGLIT_REPLAY_EXTRA_ARGS", &mut self.extra_args),
        ];
        for (key, slot) in string_overrides {
            if let Ok(value) = env::var(key) {
                debug!("{key} overrides configured value");
                *slot = value;
            }
        }

        if let Ok(value) = env::var("PIGLIT_REPLAY_LOOP_TIMES") {
            self.loop_times =
                value.trim().parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::InvalidValue {
                        key: "loop_times",
                        value: value.clone(),
                        reason: e.to_string(),
                    }
                })?;
        }
        if let Ok(value) = env::var("PIGLIT_REPLAY_SUBCOMMAND") {
            self.subcommand = value.parse()?;
        }
        if let Ok(value) = env::var("PIGLIT_REPLAY_DESCRIPTION_FILE") {
            self.description_file = Some(PathBuf::from(value));
        }
        if let Ok(value) = env::var("PIGLIT_REPLAY_DEVICE_NAME") {
            self.device_name = Some(value);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.loop_times == 0 {
            return Err(ConfigError::InvalidValue {
                key: "loop_times",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let binaries = [
            ("apitrace_bin", &self.tools.apitrace_bin),
            ("eglretrace_bin", &self.tools.eglretrace_bin),
            ("wine_bin", &self.tools.wine_bin),
            ("wine_apitrace_bin", &self.tools.wine_apitrace_bin),
            ("wine_d3dretrace_bin", &self.tools.wine_d3dretrace_bin),
            ("gfxrecon-info_bin", &self.tools.gfxrecon_info_bin),
            ("gfxrecon-replay_bin", &self.tools.gfxrecon_replay_bin),
        ];
        for (key, value) in binaries {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: value.clone(),
                    reason: "binary path must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn extra_args(&self) -> Vec<String> {
        split_args(&self.extra_args)
    }
}

fn split_args(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
