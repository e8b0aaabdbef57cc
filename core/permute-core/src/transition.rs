//! User-facing operations over experiments and snapshots.
//!
//! Every operation that moves HEAD first resolves unsaved work through
//! [`TransitionController::resolve_conflict`], so changes are only ever lost
//! after the user picked "discard". The two exceptions confirm instead:
//! force reset (its whole purpose is to discard) and branch deletion.
//!
//! Session record ordering:
//! - written *before* any checkout that detaches HEAD
//! - cleared *after* any checkout that re-attaches HEAD
//!
//! so an interruption at any point leaves either a consistent pair or a
//! detached HEAD without a record, which recovery handles.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::backend::{GitBackend, GitOptions, HeadState, RepositoryBackend, Snapshot};
use crate::classifier::{build_app_state, classify, AppState, Classification};
use crate::config::AppConfig;
use crate::error::{PermuteError, Result};
use crate::naming::{ask_branch_name, check_branch_name};
use crate::prompt::{AttachedConflictChoice, DetachedConflictChoice, UserPrompt};
use crate::recovery::{run_recovery, RecoveryReport};
use crate::session::{SessionRecord, SessionStore, SnapshotInfo};

/// Shortest hash prefix accepted when looking up a snapshot.
const MIN_HASH_PREFIX: usize = 4;

/// How the unsaved-work question was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictOutcome {
    /// Nothing to resolve.
    Clean,
    Saved,
    Discarded,
    /// A branch was created from the detached view instead; the detached
    /// session is over, so the calling operation must not continue.
    BranchCreated,
    Cancelled,
}

impl ConflictOutcome {
    pub fn proceeds(self) -> bool {
        matches!(
            self,
            ConflictOutcome::Clean | ConflictOutcome::Saved | ConflictOutcome::Discarded
        )
    }

    fn halted(self) -> OpStatus {
        match self {
            ConflictOutcome::BranchCreated => OpStatus::Superseded,
            _ => OpStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpStatus {
    Done,
    /// Branch created, but the user chose not to commit their changes onto it.
    DoneWithUnsavedChanges,
    NoChange,
    Cancelled,
    /// Ended by creating a branch from the detached view instead.
    Superseded,
}

/// Result of [`TransitionController::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    /// `None` when the operation failed (the error was already shown).
    pub status: Option<OpStatus>,
    pub state: AppState,
}

pub struct TransitionController<B> {
    backend: B,
    sessions: SessionStore,
    default_branch: String,
}

impl TransitionController<GitBackend> {
    /// Opens (initialising if needed) a project folder with the git backend.
    pub fn open_git(project_root: &Path, config: &AppConfig) -> Result<Self> {
        let options = GitOptions {
            default_branch: config.default_branch.clone(),
            timeout: config.command_timeout(),
        };
        let backend = GitBackend::open_or_init(project_root, options)?;
        Ok(Self::new(
            backend,
            SessionStore::for_project(project_root),
            config.default_branch.clone(),
        ))
    }
}

impl<B: RepositoryBackend> TransitionController<B> {
    pub fn new(backend: B, sessions: SessionStore, default_branch: impl Into<String>) -> Self {
        TransitionController {
            backend,
            sessions,
            default_branch: default_branch.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub(crate) fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    pub fn classify(&self) -> Result<Classification> {
        classify(&self.backend, &self.sessions)
    }

    pub fn refresh(&self) -> Result<AppState> {
        build_app_state(&self.backend, &self.sessions, &self.default_branch)
    }

    pub fn recover<P: UserPrompt + ?Sized>(&mut self, prompt: &mut P) -> Result<RecoveryReport> {
        run_recovery(
            &mut self.backend,
            &self.sessions,
            &self.default_branch,
            prompt,
        )
    }

    /// Runs one operation, shows any failure verbatim, then re-classifies.
    pub fn execute<P, F>(&mut self, prompt: &mut P, op: F) -> Result<Executed>
    where
        P: UserPrompt + ?Sized,
        F: FnOnce(&mut Self, &mut P) -> Result<OpStatus>,
    {
        let status = match op(self, prompt) {
            Ok(status) => {
                debug!(?status, "Operation finished");
                Some(status)
            }
            Err(err) => {
                warn!(error = %err, backend = err.is_backend_failure(), "Operation failed");
                prompt.show_error(&err.to_string());
                None
            }
        };
        Ok(Executed {
            status,
            state: self.refresh()?,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Unsaved work
    // ─────────────────────────────────────────────────────────────────────────

    pub fn resolve_conflict<P: UserPrompt + ?Sized>(
        &mut self,
        prompt: &mut P,
    ) -> Result<ConflictOutcome> {
        if !self.backend.has_uncommitted_changes()? {
            return Ok(ConflictOutcome::Clean);
        }

        match self.backend.current_state()? {
            HeadState::Attached(branch) => match prompt.choose_attached_conflict(&branch) {
                AttachedConflictChoice::SaveSnapshot => {
                    let description = prompt.ask_text(
                        "Save Snapshot",
                        &format!("Describe the changes to save on '{branch}':"),
                    );
                    match description.as_deref().map(str::trim) {
                        Some(text) if !text.is_empty() => {
                            self.backend.commit(text)?;
                            info!(branch = %branch, "Saved unsaved changes before transition");
                            Ok(ConflictOutcome::Saved)
                        }
                        _ => Ok(ConflictOutcome::Cancelled),
                    }
                }
                AttachedConflictChoice::Discard => {
                    self.backend.discard_changes()?;
                    warn!(branch = %branch, "Discarded unsaved changes");
                    Ok(ConflictOutcome::Discarded)
                }
                AttachedConflictChoice::Cancel => Ok(ConflictOutcome::Cancelled),
            },
            HeadState::Detached => {
                let hash = self.backend.current_snapshot_hash()?;
                let snapshot = match self.sessions.load().detached_snapshot {
                    Some(snapshot) => snapshot,
                    None => self.head_snapshot(&hash)?,
                };
                match prompt.choose_detached_conflict(&snapshot) {
                    DetachedConflictChoice::CreateBranch => {
                        match self.create_branch_from(&hash, None, prompt)? {
                            OpStatus::Cancelled => Ok(ConflictOutcome::Cancelled),
                            _ => Ok(ConflictOutcome::BranchCreated),
                        }
                    }
                    DetachedConflictChoice::Discard => {
                        self.backend.discard_changes()?;
                        warn!(hash = %hash, "Discarded unsaved changes on past version");
                        Ok(ConflictOutcome::Discarded)
                    }
                    DetachedConflictChoice::Cancel => Ok(ConflictOutcome::Cancelled),
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Moving between experiments and versions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn switch_branch<P: UserPrompt + ?Sized>(
        &mut self,
        target: &str,
        prompt: &mut P,
    ) -> Result<OpStatus> {
        if self.backend.current_state()?.branch() == Some(target) {
            return Ok(OpStatus::NoChange);
        }
        self.require_branch(target)?;

        let conflict = self.resolve_conflict(prompt)?;
        if !conflict.proceeds() {
            return Ok(conflict.halted());
        }

        self.backend.checkout(target)?;
        self.sessions.clear();
        info!(branch = %target, "Switched experiment");
        Ok(OpStatus::Done)
    }

    /// Detaches HEAD at a past snapshot of `branch`.
    ///
    /// The origin branch is kept across repeated jumps, so returning to the
    /// present always lands where the user started.
    pub fn load_snapshot<P: UserPrompt + ?Sized>(
        &mut self,
        branch: &str,
        hash: &str,
        prompt: &mut P,
    ) -> Result<OpStatus> {
        self.require_branch(branch)?;
        find_snapshot(&self.backend.history(branch)?, branch, hash)?;

        let conflict = self.resolve_conflict(prompt)?;
        if !conflict.proceeds() {
            return Ok(conflict.halted());
        }

        // Saving a snapshot above may have moved the tip; read history again.
        let history = self.backend.history(branch)?;
        let (position, snapshot) = find_snapshot(&history, branch, hash)?;

        let previous = self.sessions.load();
        let from_branch = match self.backend.current_state()? {
            HeadState::Attached(name) => name,
            HeadState::Detached => previous
                .detached_from_branch
                .clone()
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| branch.to_string()),
        };

        let record = SessionRecord::new(&from_branch, SnapshotInfo::from(snapshot), position == 0);
        self.sessions.save(&record)?;

        if let Err(err) = self.backend.checkout(&snapshot.hash) {
            warn!(hash = %snapshot.hash, error = %err, "Checkout of past version failed");
            if previous.is_complete() {
                if let Err(save_err) = self.sessions.save(&previous) {
                    warn!(error = %save_err, "Failed to restore previous session record");
                    self.sessions.clear();
                }
            } else {
                self.sessions.clear();
            }
            return Err(err);
        }

        info!(
            from_branch = %from_branch,
            hash = %snapshot.hash,
            is_latest = position == 0,
            "Viewing past version"
        );
        Ok(OpStatus::Done)
    }

    pub fn return_to_present<P: UserPrompt + ?Sized>(&mut self, prompt: &mut P) -> Result<OpStatus> {
        let from_branch = self.detached_origin()?;
        self.require_branch(&from_branch)?;

        let conflict = self.resolve_conflict(prompt)?;
        if !conflict.proceeds() {
            return Ok(conflict.halted());
        }

        self.backend.checkout(&from_branch)?;
        self.sessions.clear();
        info!(branch = %from_branch, "Returned to present");
        Ok(OpStatus::Done)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Creating history
    // ─────────────────────────────────────────────────────────────────────────

    /// Creates a new experiment at `start_point` (branch name or hash) and switches to it.
    ///
    /// A `name` given up front is validated once and rejected with
    /// `InvalidBranchName`; otherwise the user is asked until a valid one is given.
    pub fn create_branch_from<P: UserPrompt + ?Sized>(
        &mut self,
        start_point: &str,
        name: Option<&str>,
        prompt: &mut P,
    ) -> Result<OpStatus> {
        let name = match name {
            Some(name) => check_branch_name(&self.backend, name)?,
            None => match ask_branch_name(
                &self.backend,
                prompt,
                "New Experiment",
                "Enter a name for the new experiment:",
            )? {
                Some(name) => name,
                None => return Ok(OpStatus::Cancelled),
            },
        };

        let was_detached = self.backend.current_state()?.is_detached();
        let dirty = self.backend.has_uncommitted_changes()?;

        self.backend.create_branch(&name, start_point)?;
        if was_detached {
            self.sessions.clear();
        }
        info!(branch = %name, start_point = %start_point, "Created experiment");

        if !dirty {
            return Ok(OpStatus::Done);
        }

        let description = prompt.ask_text(
            "Save Changes",
            &format!(
                "You have unsaved changes. Describe them to save them as the first snapshot \
                 on '{name}', or leave empty to keep them unsaved:"
            ),
        );
        match description.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                self.backend.commit(text)?;
                Ok(OpStatus::Done)
            }
            _ => {
                prompt.notify(&format!(
                    "Warning: your changes were NOT saved. They are still unsaved on '{name}'."
                ));
                Ok(OpStatus::DoneWithUnsavedChanges)
            }
        }
    }

    /// New experiment from the current branch tip, or from the viewed version when detached.
    pub fn branch_from_current<P: UserPrompt + ?Sized>(
        &mut self,
        name: Option<&str>,
        prompt: &mut P,
    ) -> Result<OpStatus> {
        let start_point = match self.backend.current_state()? {
            HeadState::Attached(branch) => branch,
            HeadState::Detached => self.backend.current_snapshot_hash()?,
        };
        self.create_branch_from(&start_point, name, prompt)
    }

    pub fn save_snapshot(&mut self, description: &str) -> Result<OpStatus> {
        let description = description.trim();
        if description.is_empty() {
            return Err(PermuteError::EmptyDescription);
        }
        let HeadState::Attached(branch) = self.backend.current_state()? else {
            return Err(PermuteError::DetachedSave);
        };
        if !self.backend.has_uncommitted_changes()? {
            return Err(PermuteError::NothingToSave);
        }
        self.backend.commit(description)?;
        info!(branch = %branch, "Saved snapshot");
        Ok(OpStatus::Done)
    }

    /// Makes the viewed past version the newest snapshot of its origin branch.
    pub fn restore_as_snapshot<P: UserPrompt + ?Sized>(&mut self, prompt: &mut P) -> Result<OpStatus> {
        let Classification::Detached {
            from_branch,
            snapshot,
            is_latest,
        } = self.classify()?
        else {
            return Err(PermuteError::NotDetached);
        };
        if is_latest {
            return Err(PermuteError::AlreadyLatest(from_branch));
        }

        let confirmed = prompt.confirm(
            "Restore Version",
            &format!(
                "Make the version '{}' from {} the newest snapshot on '{from_branch}'?\n\n\
                 This adds a new snapshot to the history of '{from_branch}' and cannot be undone. \
                 Existing snapshots are kept.",
                snapshot.subject,
                snapshot.display_date()
            ),
        );
        if !confirmed {
            return Ok(OpStatus::Cancelled);
        }

        let conflict = self.resolve_conflict(prompt)?;
        if !conflict.proceeds() {
            return Ok(conflict.halted());
        }

        match self.apply_restore(&from_branch, &snapshot, prompt) {
            Ok(status) => {
                self.sessions.clear();
                info!(branch = %from_branch, hash = %snapshot.hash, "Restored past version as new snapshot");
                Ok(status)
            }
            Err(err) => {
                warn!(error = %err, "Restore failed; returning to present");
                self.fall_back_to_present(&from_branch);
                Err(err)
            }
        }
    }

    fn apply_restore<P: UserPrompt + ?Sized>(
        &mut self,
        from_branch: &str,
        snapshot: &SnapshotInfo,
        prompt: &mut P,
    ) -> Result<OpStatus> {
        self.backend.checkout(from_branch)?;
        self.backend.overlay_snapshot(&snapshot.hash)?;
        if !self.backend.has_uncommitted_changes()? {
            prompt.notify(&format!(
                "'{from_branch}' already matches that version; no new snapshot was needed."
            ));
            return Ok(OpStatus::NoChange);
        }
        self.backend.commit(&restore_message(snapshot))?;
        Ok(OpStatus::Done)
    }

    /// Leaves a failed restore attached to `from_branch` with a clean tree if possible.
    fn fall_back_to_present(&mut self, from_branch: &str) {
        match self.backend.current_state() {
            Ok(HeadState::Attached(branch)) => {
                if branch == from_branch {
                    if let Err(err) = self.backend.discard_changes() {
                        warn!(error = %err, "Failed to discard partial restore");
                    }
                }
                self.sessions.clear();
            }
            Ok(HeadState::Detached) => match self.backend.checkout(from_branch) {
                Ok(()) => self.sessions.clear(),
                Err(err) => warn!(error = %err, "Still viewing past version after failed restore"),
            },
            Err(err) => warn!(error = %err, "Could not read repository state after failed restore"),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Destructive operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Moves the active branch back to `hash`, deleting newer snapshots and unsaved work.
    pub fn force_reset<P: UserPrompt + ?Sized>(&mut self, hash: &str, prompt: &mut P) -> Result<OpStatus> {
        let HeadState::Attached(branch) = self.backend.current_state()? else {
            return Err(PermuteError::ForceResetWhileDetached);
        };
        let history = self.backend.history(&branch)?;
        let (newer, target) = find_snapshot(&history, &branch, hash)?;

        let message = format!(
            "You are about to force restore the experiment '{branch}' to the version:\n\n\
             '{}'\n\n\
             WARNING: This will permanently delete {newer} newer snapshot(s) on this experiment. \
             It will also discard any unsaved changes you have.\n\n\
             This action CANNOT BE UNDONE.\n\n\
             Are you absolutely sure you want to proceed?",
            target.subject
        );
        if !prompt.confirm("Confirm Destructive Action", &message) {
            return Ok(OpStatus::Cancelled);
        }

        self.backend.hard_reset_branch(&branch, &target.hash)?;
        warn!(branch = %branch, hash = %target.hash, removed = newer, "Force reset experiment");
        Ok(OpStatus::Done)
    }

    pub fn delete_branch<P: UserPrompt + ?Sized>(&mut self, name: &str, prompt: &mut P) -> Result<OpStatus> {
        if name == self.default_branch {
            return Err(PermuteError::ProtectedBranch(name.to_string()));
        }
        let active = match self.backend.current_state()? {
            HeadState::Attached(branch) => Some(branch),
            HeadState::Detached => self.sessions.load().detached_from_branch,
        };
        if active.as_deref() == Some(name) {
            return Err(PermuteError::ActiveBranch(name.to_string()));
        }

        let branches = self.backend.list_branches()?;
        if !branches.iter().any(|b| b == name) {
            return Err(PermuteError::BranchNotFound(name.to_string()));
        }

        let mut contained_in = None;
        for other in branches.iter().filter(|b| b.as_str() != name) {
            if self.backend.is_ancestor_of(name, other)? {
                contained_in = Some(other.clone());
                break;
            }
        }

        let message = match &contained_in {
            Some(other) => format!(
                "Permanently delete the experiment '{name}'?\n\n\
                 All of its snapshots are also part of '{other}'."
            ),
            None => format!(
                "Permanently delete the experiment '{name}'?\n\n\
                 WARNING: '{name}' has snapshots that exist in no other experiment. \
                 Deleting it will most likely lose them for good."
            ),
        };
        if !prompt.confirm("Confirm Deletion", &message) {
            return Ok(OpStatus::Cancelled);
        }

        self.backend.delete_branch(name)?;
        info!(branch = %name, contained = contained_in.is_some(), "Deleted experiment");
        Ok(OpStatus::Done)
    }

    /// The history entry for the detached `hash`, used when no record describes it.
    fn head_snapshot(&self, hash: &str) -> Result<SnapshotInfo> {
        self.backend
            .history(hash)?
            .first()
            .map(SnapshotInfo::from)
            .ok_or_else(|| PermuteError::SnapshotNotFound {
                branch: "HEAD".to_string(),
                hash: hash.to_string(),
            })
    }

    /// Fails with `BranchNotFound` unless `name` is a local branch.
    fn require_branch(&self, name: &str) -> Result<()> {
        if self.backend.list_branches()?.iter().any(|b| b == name) {
            Ok(())
        } else {
            Err(PermuteError::BranchNotFound(name.to_string()))
        }
    }

    fn detached_origin(&self) -> Result<String> {
        if !self.backend.current_state()?.is_detached() {
            return Err(PermuteError::NotDetached);
        }
        self.sessions
            .load()
            .detached_from_branch
            .filter(|b| !b.is_empty())
            .ok_or(PermuteError::NotDetached)
    }
}

/// Finds `hash` in `history` by full hash or by a prefix naming exactly one snapshot.
fn find_snapshot<'a>(
    history: &'a [Snapshot],
    branch: &str,
    hash: &str,
) -> Result<(usize, &'a Snapshot)> {
    if let Some(found) = history.iter().enumerate().find(|(_, s)| s.hash == hash) {
        return Ok(found);
    }
    let matches: Vec<(usize, &Snapshot)> = if hash.len() >= MIN_HASH_PREFIX {
        history
            .iter()
            .enumerate()
            .filter(|(_, s)| s.hash.starts_with(hash))
            .collect()
    } else {
        Vec::new()
    };
    match matches.as_slice() {
        [] => Err(PermuteError::SnapshotNotFound {
            branch: branch.to_string(),
            hash: hash.to_string(),
        }),
        [found] => Ok(*found),
        _ => Err(PermuteError::AmbiguousSnapshot {
            hash: hash.to_string(),
            matches: matches.iter().map(|(_, s)| s.hash.clone()).collect(),
        }),
    }
}

fn restore_message(snapshot: &SnapshotInfo) -> String {
    format!(
        "Restored version from {}: {}",
        snapshot.display_date(),
        snapshot.subject
    )
}
