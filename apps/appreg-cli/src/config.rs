//! Configuration resolution for the appreg CLI
//!
//! Settings come from three layers, strongest first: command-line flags,
//! `APPREG_*` environment variables (wired through clap), and the config
//! file. The token is never read from the config file.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{CliError, CliResult};
use crate::GlobalArgs;

/// Configuration paths for the appreg CLI
///
/// Paths:
/// - Linux: ~/.config/appreg/
/// - macOS: ~/Library/Application Support/appreg/
/// - Windows: %APPDATA%\appreg\
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Base configuration directory
    pub config_dir: PathBuf,
    /// Path to config.json
    pub config_file: PathBuf,
}

impl ConfigPaths {
    /// Get configuration paths for the current platform
    pub fn new() -> CliResult<Self> {
        let config_dir = Self::config_dir()?;
        Ok(Self::in_dir(config_dir))
    }

    fn in_dir(config_dir: PathBuf) -> Self {
        Self {
            config_file: config_dir.join("config.json"),
            config_dir,
        }
    }

    /// Get the configuration directory, respecting APPREG_CONFIG_DIR
    fn config_dir() -> CliResult<PathBuf> {
        if let Ok(dir) = std::env::var("APPREG_CONFIG_DIR") {
            return Ok(PathBuf::from(dir));
        }

        let base_dir = dirs::config_dir().ok_or_else(|| {
            CliError::Config("could not determine the configuration directory".to_string())
        })?;

        Ok(base_dir.join("appreg"))
    }
}

/// On-disk configuration. Every field is optional; flags and environment
/// variables win over it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileConfig {
    graph_url: Option<String>,
}

impl FileConfig {
    /// A missing config file is the common case and reads as defaults.
    fn load(paths: &ConfigPaths) -> CliResult<Self> {
        if !paths.config_file.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(&paths.config_file)?;
        serde_json::from_str(&raw).map_err(|e| {
            CliError::Config(format!(
                "could not parse {}: {e}",
                paths.config_file.display()
            ))
        })
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub graph_url: String,
    pub token: Option<String>,
    pub offline: bool,
}

impl Settings {
    pub fn resolve(args: &GlobalArgs) -> CliResult<Self> {
        let file = FileConfig::load(&ConfigPaths::new()?)?;
        Ok(Self::merge(args, file))
    }

    fn merge(args: &GlobalArgs, file: FileConfig) -> Self {
        let graph_url = args
            .graph_url
            .clone()
            .or(file.graph_url)
            .unwrap_or_else(|| appreg_graph::DEFAULT_GRAPH_BASE_URL.to_string());

        Self {
            graph_url,
            token: args.token.clone(),
            offline: args.offline,
        }
    }
}
