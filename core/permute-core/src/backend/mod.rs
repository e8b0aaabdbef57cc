//! Repository backend interface.
//!
//! The reconciliation core never shells out or parses command output itself;
//! it depends only on [`RepositoryBackend`]. [`GitBackend`] is the production
//! implementation. Tests use the in-memory backend in `memory`.

mod git;
#[cfg(test)]
pub(crate) mod memory;

pub use git::{GitBackend, GitOptions};

use chrono::{DateTime, Local, Utc};

use crate::error::Result;

/// Where HEAD currently points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadState {
    Attached(String),
    Detached,
}

impl HeadState {
    pub fn branch(&self) -> Option<&str> {
        match self {
            HeadState::Attached(name) => Some(name),
            HeadState::Detached => None,
        }
    }

    pub fn is_detached(&self) -> bool {
        matches!(self, HeadState::Detached)
    }
}

/// One entry of a branch's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub hash: String,
    pub date: DateTime<Utc>,
    pub subject: String,
}

impl Snapshot {
    pub fn display_date(&self) -> String {
        display_date(self.date)
    }
}

/// Timestamp in the local timezone, formatted for list rows and prompts.
pub(crate) fn display_date(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local)
        .format("%Y-%m-%d %I:%M %p")
        .to_string()
}

/// Atomic operations over a content-addressed history.
///
/// Mutating calls either succeed completely or fail with a
/// [`PermuteError::CommandFailed`](crate::PermuteError::CommandFailed) carrying
/// the backend's own message.
pub trait RepositoryBackend {
    fn current_state(&self) -> Result<HeadState>;

    fn current_snapshot_hash(&self) -> Result<String>;

    /// All local branch names, sorted.
    fn list_branches(&self) -> Result<Vec<String>>;

    /// Snapshots reachable from `branch` (or any revision), newest first.
    fn history(&self, branch: &str) -> Result<Vec<Snapshot>>;

    fn has_uncommitted_changes(&self) -> Result<bool>;

    /// Checks out a branch name (attaching HEAD) or a hash (detaching HEAD).
    fn checkout(&mut self, target: &str) -> Result<()>;

    /// Creates `name` at `start_point` and checks it out.
    ///
    /// Uncommitted changes are carried onto the new branch.
    fn create_branch(&mut self, name: &str, start_point: &str) -> Result<()>;

    fn delete_branch(&mut self, name: &str) -> Result<()>;

    /// Stages every working change, then commits.
    fn commit(&mut self, message: &str) -> Result<()>;

    /// Resets tracked files and removes untracked ones.
    fn discard_changes(&mut self) -> Result<()>;

    /// Moves `branch` to `hash`, discarding newer history and working changes.
    fn hard_reset_branch(&mut self, branch: &str, hash: &str) -> Result<()>;

    /// Replaces working files with the content of `hash` without moving HEAD.
    fn overlay_snapshot(&mut self, hash: &str) -> Result<()>;

    /// True if every snapshot of `branch` is reachable from `other`.
    fn is_ancestor_of(&self, branch: &str, other: &str) -> Result<bool>;
}
