//! File-backed session record persistence.
//!
//! # Defensive Design
//!
//! The record is advisory, so reading it never fails:
//! - Missing file → empty record
//! - Empty or corrupt JSON → empty record, and the stale file is removed
//!
//! # Atomic Writes
//!
//! Uses temp file + rename so a reader never sees a half-written record.

use std::io::Write;
use std::path::{Path, PathBuf};

use fs_err as fs;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::types::SessionRecord;
use super::{SESSION_FILE_NAME, SESSION_META_DIR};
use crate::error::{PermuteError, Result};

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// The store for a project folder (`<root>/.manager_meta/session.json`).
    pub fn for_project(project_root: &Path) -> Self {
        Self::at(project_root.join(SESSION_META_DIR).join(SESSION_FILE_NAME))
    }

    pub fn at(path: PathBuf) -> Self {
        SessionStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> SessionRecord {
        if !self.path.exists() {
            return SessionRecord::default();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Unreadable session file, treating as absent");
                self.clear();
                return SessionRecord::default();
            }
        };

        if content.trim().is_empty() {
            warn!(path = %self.path.display(), "Empty session file, treating as absent");
            self.clear();
            return SessionRecord::default();
        }

        match serde_json::from_str::<SessionRecord>(&content) {
            Ok(record) => record,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Corrupt session file, treating as absent");
                self.clear();
                SessionRecord::default()
            }
        }
    }

    pub fn save(&self, record: &SessionRecord) -> Result<()> {
        let content = serde_json::to_string_pretty(record).map_err(|source| PermuteError::Json {
            context: "serialize session record".to_string(),
            source,
        })?;

        let parent_dir = self.path.parent().ok_or_else(|| {
            PermuteError::io(
                "session file path has no parent directory",
                std::io::Error::from(std::io::ErrorKind::InvalidInput),
            )
        })?;
        fs::create_dir_all(parent_dir)
            .map_err(|e| PermuteError::io("create session directory", e))?;

        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .map_err(|e| PermuteError::io("create temp session file", e))?;
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| PermuteError::io("write temp session file", e))?;
        temp_file
            .flush()
            .map_err(|e| PermuteError::io("flush temp session file", e))?;
        temp_file
            .persist(&self.path)
            .map_err(|e| PermuteError::io("replace session file", e.error))?;

        debug!(path = %self.path.display(), "Session record saved");
        Ok(())
    }

    /// Best effort: a missing or locked file is logged, never raised.
    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Session record cleared"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to clear session record")
            }
        }
    }
}
