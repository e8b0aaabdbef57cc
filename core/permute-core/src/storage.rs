//! Storage paths for Permute's own data.
//!
//! Project data lives in the project folder (see [`crate::session`]). Everything
//! else the app writes goes under one root:
//!
//! ```text
//! ~/.permute/
//! ├── config.json    # AppConfig
//! ├── logs/          # daily-rolled log files
//! └── crash/         # panic reports
//! ```
//!
//! Tests use [`StorageConfig::with_root`] with a temp directory.

use std::path::{Path, PathBuf};

use crate::error::{PermuteError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    root: PathBuf,
}

impl StorageConfig {
    /// `~/.permute`.
    pub fn from_home() -> Result<Self> {
        let home = dirs::home_dir().ok_or(PermuteError::HomeDirNotFound)?;
        Ok(Self::with_root(home.join(".permute")))
    }

    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path to config.json (app preferences and last-used project).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Directories
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn crash_dir(&self) -> PathBuf {
        self.root.join("crash")
    }

    /// Creates the root and its subdirectories if missing.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.root.clone(), self.logs_dir(), self.crash_dir()] {
            fs_err::create_dir_all(&dir)
                .map_err(|e| PermuteError::io(format!("creating {}", dir.display()), e))?;
        }
        Ok(())
    }
}
