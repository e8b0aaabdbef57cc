//! Decides which mode the UI is in.
//!
//! The repository is the source of truth for *whether* HEAD is detached; the
//! session record is the source of truth for *why*. When they disagree:
//!
//! | HEAD     | session record      | result                              |
//! |----------|---------------------|-------------------------------------|
//! | attached | absent              | `Attached`                          |
//! | attached | present (stale)     | `Attached`, record cleared          |
//! | detached | complete            | `Detached`                          |
//! | detached | absent / partial    | `InconsistentDetached` (recovery)   |

use tracing::{debug, warn};

use crate::backend::{HeadState, RepositoryBackend, Snapshot};
use crate::error::Result;
use crate::session::{SessionStore, SnapshotInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Attached {
        branch: String,
    },
    Detached {
        from_branch: String,
        snapshot: SnapshotInfo,
        is_latest: bool,
    },
    /// HEAD is detached but nothing explains why; run recovery.
    InconsistentDetached,
}

impl Classification {
    pub fn attached_branch(&self) -> Option<&str> {
        match self {
            Classification::Attached { branch } => Some(branch),
            _ => None,
        }
    }

    /// The branch whose history the UI shows: the attached branch, or the
    /// branch a detached view started from.
    pub fn history_branch(&self) -> Option<&str> {
        match self {
            Classification::Attached { branch } => Some(branch),
            Classification::Detached { from_branch, .. } => Some(from_branch),
            Classification::InconsistentDetached => None,
        }
    }

    pub fn needs_recovery(&self) -> bool {
        matches!(self, Classification::InconsistentDetached)
    }
}

pub fn classify<B: RepositoryBackend + ?Sized>(
    backend: &B,
    sessions: &SessionStore,
) -> Result<Classification> {
    match backend.current_state()? {
        HeadState::Attached(branch) => {
            if sessions.exists() {
                warn!(branch = %branch, "Attached to a branch but a session record exists; clearing it");
                sessions.clear();
            }
            debug!(branch = %branch, "Classified as attached");
            Ok(Classification::Attached { branch })
        }
        HeadState::Detached => {
            let record = sessions.load();
            match (record.detached_from_branch, record.detached_snapshot) {
                (Some(from_branch), Some(snapshot)) if !from_branch.is_empty() => {
                    debug!(from_branch = %from_branch, hash = %snapshot.hash, "Classified as detached");
                    Ok(Classification::Detached {
                        from_branch,
                        snapshot,
                        is_latest: record.is_viewing_latest,
                    })
                }
                _ => {
                    warn!("Detached without a session record; recovery required");
                    Ok(Classification::InconsistentDetached)
                }
            }
        }
    }
}

/// One row of the experiments list. `name` is the identity; never parse labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchEntry {
    pub name: String,
    pub is_default: bool,
    /// The attached branch, or the origin of a detached view.
    pub is_active: bool,
}

impl BranchEntry {
    pub fn label(&self) -> String {
        match (self.is_active, self.is_default) {
            (true, _) => format!("{} (active)", self.name),
            (false, true) => format!("{} (default)", self.name),
            (false, false) => self.name.clone(),
        }
    }
}

/// Everything a front end renders after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: Classification,
    pub branches: Vec<BranchEntry>,
    pub history: Vec<Snapshot>,
    pub dirty: bool,
}

impl AppState {
    pub fn branch(&self, name: &str) -> Option<&BranchEntry> {
        self.branches.iter().find(|b| b.name == name)
    }
}

pub fn build_app_state<B: RepositoryBackend + ?Sized>(
    backend: &B,
    sessions: &SessionStore,
    default_branch: &str,
) -> Result<AppState> {
    let mode = classify(backend, sessions)?;
    let active = mode.history_branch().map(str::to_string);

    let branches = backend
        .list_branches()?
        .into_iter()
        .map(|name| BranchEntry {
            is_default: name == default_branch,
            is_active: active.as_deref() == Some(name.as_str()),
            name,
        })
        .collect();

    let history = match active.as_deref() {
        Some(branch) => backend.history(branch)?,
        None => Vec::new(),
    };

    Ok(AppState {
        mode,
        branches,
        history,
        dirty: backend.has_uncommitted_changes()?,
    })
}
