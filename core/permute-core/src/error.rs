//! Error types for permute-core operations.
//!
//! Backend failures keep the command line and git's own message so the
//! front end can show them verbatim.

use std::path::PathBuf;

use crate::naming::BranchNameError;

/// All errors that can occur in permute-core operations.
#[derive(Debug, thiserror::Error)]
pub enum PermuteError {
    // ─────────────────────────────────────────────────────────────────────
    // Backend Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Command failed:\n`{command}`\n\nError Details:\n{details}")]
    CommandFailed { command: String, details: String },

    #[error("Command timed out after {secs}s:\n`{command}`")]
    CommandTimedOut { command: String, secs: u64 },

    #[error("Git command not found. Is Git installed?")]
    GitNotFound,

    #[error("Project root does not exist: {0}")]
    ProjectNotFound(PathBuf),

    // ─────────────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Could not determine the home directory")]
    HomeDirNotFound,

    #[error("No project selected. Run `permute open <PATH>` first.")]
    NoProject,

    // ─────────────────────────────────────────────────────────────────────
    // User Input Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("Invalid experiment name: {0}")]
    InvalidBranchName(#[from] BranchNameError),

    #[error("Please provide a description for this snapshot.")]
    EmptyDescription,

    // ─────────────────────────────────────────────────────────────────────
    // Policy Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("'{0}' experiment cannot be deleted.")]
    ProtectedBranch(String),

    #[error("Cannot delete the active experiment '{0}'. Switch to another first.")]
    ActiveBranch(String),

    #[error("Experiment not found: {0}")]
    BranchNotFound(String),

    #[error("Version {hash} is not part of the history of '{branch}'")]
    SnapshotNotFound { branch: String, hash: String },

    #[error("'{hash}' matches more than one version ({}); use more characters", .matches.join(", "))]
    AmbiguousSnapshot { hash: String, matches: Vec<String> },

    #[error("Not currently viewing a past version")]
    NotDetached,

    #[error("There are no unsaved changes to save")]
    NothingToSave,

    #[error("You are viewing a past version. Create a new experiment from it to save changes.")]
    DetachedSave,

    #[error("This version is already the latest on '{0}'")]
    AlreadyLatest(String),

    #[error("Return to the present before force restoring a version")]
    ForceResetWhileDetached,

    // ─────────────────────────────────────────────────────────────────────
    // I/O Errors
    // ─────────────────────────────────────────────────────────────────────
    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PermuteError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PermuteError::Io {
            context: context.into(),
            source,
        }
    }

    /// True for failures reported by the repository backend itself.
    pub fn is_backend_failure(&self) -> bool {
        matches!(
            self,
            PermuteError::CommandFailed { .. }
                | PermuteError::CommandTimedOut { .. }
                | PermuteError::GitNotFound
        )
    }
}

/// Convenience type alias for Results using PermuteError.
pub type Result<T> = std::result::Result<T, PermuteError>;
