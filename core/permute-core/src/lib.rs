//! # permute-core
//!
//! Experiment and snapshot management over a git repository, for people who
//! never see git: experiments are branches, snapshots are commits, and
//! "viewing a past version" is a detached HEAD.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. Every backend call blocks until git returns.
//! - **Repository is the truth**: The session record only explains a detached
//!   HEAD; it never overrides what git reports.
//! - **No silent loss**: Work is discarded only after an explicit user choice.
//! - **Front-end agnostic**: Dialogs go through [`UserPrompt`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use permute_core::{AppConfig, StorageConfig, TransitionController};
//!
//! let storage = StorageConfig::from_home()?;
//! let config = AppConfig::load(&storage);
//! let mut controller = TransitionController::open_git(&project, &config)?;
//! controller.recover(&mut prompt)?;
//! let state = controller.refresh()?;
//! ```

pub mod backend;
pub mod classifier;
pub mod config;
pub mod error;
pub mod naming;
pub mod prompt;
pub mod recovery;
pub mod session;
pub mod storage;
pub mod transition;


pub use backend::{GitBackend, GitOptions, HeadState, RepositoryBackend, Snapshot};
pub use classifier::{build_app_state, classify, AppState, BranchEntry, Classification};
pub use config::{AppConfig, DEFAULT_COMMAND_TIMEOUT_SECS};
pub use error::{PermuteError, Result};
pub use naming::{ask_branch_name, check_branch_name, validate_branch_name, BranchNameError};
pub use prompt::{
    AttachedConflictChoice, DetachedConflictChoice, RecoveryFallbackChoice, UserPrompt,
};
pub use recovery::{run_recovery, RecoveryOutcome, RecoveryReport, RECOVERY_COMMIT_MESSAGE};
pub use session::{SessionRecord, SessionStore, SnapshotInfo};
pub use storage::StorageConfig;
pub use transition::{ConflictOutcome, Executed, OpStatus, TransitionController};

/// Branch created for new projects; cannot be deleted.
pub const DEFAULT_BRANCH: &str = "main";
