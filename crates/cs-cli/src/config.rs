//! File loading and GitHub credentials for the CLI.

use std::fs;
use std::path::{Path, PathBuf};

use cs_core::SettingsSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

/// Settings from `path`, or the defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> Result<SettingsSnapshot, ConfigError> {
    match path {
        Some(path) => read_json(path),
        None => Ok(SettingsSnapshot::default()),
    }
}

/// Where and as whom to write. Missing pieces surface as `NotConfigured`
/// upload errors rather than startup failures.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct GithubArgs {
    /// GitHub token with contents write access
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Repository owner
    #[arg(long, env = "CODESYNC_GITHUB_OWNER")]
    pub owner: Option<String>,

    /// Repository name
    #[arg(long, env = "CODESYNC_GITHUB_REPO")]
    pub repo: Option<String>,

    /// Branch to commit to (repository default when unset)
    #[arg(long, env = "CODESYNC_GITHUB_BRANCH")]
    pub branch: Option<String>,

    /// API base URL
    #[arg(long, env = "CODESYNC_GITHUB_API", default_value = "https://api.github.com")]
    pub api_url: String,
}
