use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::platform;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Path or bare name of the `clamdscan` client.
    #[serde(default = "default_clamdscan_path")]
    pub clamdscan_path: String,
    /// Flags passed to every engine invocation, ahead of the scan target.
    #[serde(default = "default_clamdscan_args")]
    pub clamdscan_args: Vec<String>,
    #[serde(default = "default_quarantine_dir")]
    pub quarantine_dir: String,
    #[serde(default = "default_lock_file")]
    pub lock_file: String,
    /// Glob patterns excluded from full-scan enumeration.
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

fn default_clamdscan_path() -> String {
    "clamdscan".to_string()
}

fn default_clamdscan_args() -> Vec<String> {
    ["--multiscan", "--infected", "--no-summary", "--fdpass"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_quarantine_dir() -> String {
    "~/quarantined".to_string()
}

fn default_lock_file() -> String {
    "~/.avsweep.lock".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            clamdscan_path: default_clamdscan_path(),
            clamdscan_args: default_clamdscan_args(),
            quarantine_dir: default_quarantine_dir(),
            lock_file: default_lock_file(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn quarantine_root(&self) -> PathBuf {
        platform::expand_home(&self.quarantine_dir)
    }

    pub fn lock_path(&self) -> PathBuf {
        platform::expand_home(&self.lock_file)
    }

    /// Command-line override for the engine client.
    pub fn with_clamdscan_path(mut self, path: Option<String>) -> Self {
        if let Some(path) = path {
            self.clamdscan_path = path;
        }
        self
    }
}

/// Load `Config.toml` (or `path`, when given) layered under `AVSWEEP_*` environment variables.
pub fn load_configuration(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let file_source = match path {
        Some(path) => ConfigFile::from(path).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };

    let builder = Config::builder()
        .add_source(file_source)
        .add_source(
            Environment::with_prefix("AVSWEEP")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("clamdscan_args")
                .with_list_parse_key("exclude_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Remove directories that are subdirectories of other directories in the list.
/// Order of first appearance is kept.
pub fn non_overlapping_directories(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for dir in dirs {
        if result.iter().any(|res_dir| dir.starts_with(res_dir)) {
            continue;
        }

        result.retain(|res_dir| !res_dir.starts_with(&dir));
        result.push(dir);
    }

    result
}
