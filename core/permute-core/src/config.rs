//! App preferences, persisted as `config.json` under [`StorageConfig::root`].
//!
//! Loading never fails: a missing or malformed file yields defaults. Saving
//! is atomic (temp file + rename).

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs_err as fs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{PermuteError, Result};
use crate::storage::StorageConfig;

pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    /// Last project opened; used when no `--project` is given.
    #[serde(default)]
    pub project_root: Option<PathBuf>,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default = "default_timeout")]
    pub command_timeout_secs: u64,
}

fn default_branch() -> String {
    crate::DEFAULT_BRANCH.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            project_root: None,
            default_branch: default_branch(),
            command_timeout_secs: default_timeout(),
        }
    }
}

impl AppConfig {
    pub fn load(storage: &StorageConfig) -> Self {
        let path = storage.config_file();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Self::default(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Unreadable config, using defaults");
                return Self::default();
            }
        };
        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config.sanitized(),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Malformed config, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, storage: &StorageConfig) -> Result<()> {
        let path = storage.config_file();
        let content = serde_json::to_string_pretty(self).map_err(|source| PermuteError::Json {
            context: "serialize app config".to_string(),
            source,
        })?;

        let dir = storage.root();
        fs::create_dir_all(dir).map_err(|e| PermuteError::io("create app directory", e))?;
        let mut temp_file =
            NamedTempFile::new_in(dir).map_err(|e| PermuteError::io("create temp config", e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| PermuteError::io("write temp config", e))?;
        temp_file
            .persist(&path)
            .map_err(|e| PermuteError::io("replace config", e.error))?;

        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Project to operate on: the explicit one, else the last-used one.
    pub fn resolve_project(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| self.project_root.clone())
            .ok_or(PermuteError::NoProject)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    fn sanitized(mut self) -> Self {
        if self.default_branch.trim().is_empty() {
            self.default_branch = default_branch();
        }
        if self.command_timeout_secs == 0 {
            self.command_timeout_secs = default_timeout();
        }
        self
    }
}
