//! Recovery from a detached HEAD that nothing explains.
//!
//! This happens when the app went down between detaching and writing (or
//! after clearing) the session record. The flow never loses work silently:
//!
//! 1. Clean tree: reattach to the default branch and tell the user.
//! 2. Dirty tree: ask for a recovery branch name and commit the work there.
//! 3. Name refused: ask once more whether to discard everything or abort.
//!    Only an explicit "discard" here throws work away.
//!
//! Backend failures are returned as-is; nothing is retried.

use tracing::{info, warn};

use crate::backend::RepositoryBackend;
use crate::classifier::{classify, Classification};
use crate::error::Result;
use crate::naming::ask_branch_name;
use crate::prompt::{RecoveryFallbackChoice, UserPrompt};
use crate::session::SessionStore;

pub const RECOVERY_COMMIT_MESSAGE: &str = "Recovered unsaved work from unexpected shutdown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// The state was consistent; nothing was done.
    NotNeeded,
    /// Clean tree, reattached to the default branch.
    Reattached { branch: String },
    /// Unsaved work committed onto a new branch.
    Recovered { branch: String },
    /// The user chose to throw the work away.
    Discarded { branch: String },
    /// The user refused both saving and discarding; the caller must stop.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub outcome: RecoveryOutcome,
    pub mode: Classification,
}

pub fn run_recovery<B, P>(
    backend: &mut B,
    sessions: &SessionStore,
    default_branch: &str,
    prompt: &mut P,
) -> Result<RecoveryReport>
where
    B: RepositoryBackend + ?Sized,
    P: UserPrompt + ?Sized,
{
    let mode = classify(&*backend, sessions)?;
    if !mode.needs_recovery() {
        return Ok(RecoveryReport {
            outcome: RecoveryOutcome::NotNeeded,
            mode,
        });
    }

    let outcome = if backend.has_uncommitted_changes()? {
        recover_dirty(backend, sessions, default_branch, prompt)?
    } else {
        info!(branch = %default_branch, "Recovery: clean tree, reattaching to default branch");
        backend.checkout(default_branch)?;
        sessions.clear();
        prompt.notify(&format!(
            "The project was left viewing a past version after an unexpected shutdown. \
             There were no unsaved changes, so it has been returned to '{default_branch}'."
        ));
        RecoveryOutcome::Reattached {
            branch: default_branch.to_string(),
        }
    };

    let mode = classify(&*backend, sessions)?;
    Ok(RecoveryReport { outcome, mode })
}

fn recover_dirty<B, P>(
    backend: &mut B,
    sessions: &SessionStore,
    default_branch: &str,
    prompt: &mut P,
) -> Result<RecoveryOutcome>
where
    B: RepositoryBackend + ?Sized,
    P: UserPrompt + ?Sized,
{
    let name = ask_branch_name(
        &*backend,
        prompt,
        "Recover Unsaved Work",
        "The app closed unexpectedly while you were viewing a past version, and there are \
         unsaved changes. Enter a name for a new experiment to keep them:",
    )?;

    if let Some(name) = name {
        let hash = backend.current_snapshot_hash()?;
        info!(branch = %name, hash = %hash, "Recovery: saving unsaved work to new branch");
        backend.create_branch(&name, &hash)?;
        backend.commit(RECOVERY_COMMIT_MESSAGE)?;
        sessions.clear();
        prompt.notify(&format!("Your unsaved work was saved to the new experiment '{name}'."));
        return Ok(RecoveryOutcome::Recovered { branch: name });
    }

    match prompt.choose_recovery_fallback(default_branch) {
        RecoveryFallbackChoice::DiscardAndReturn => {
            warn!(branch = %default_branch, "Recovery: user chose to discard unsaved work");
            backend.discard_changes()?;
            backend.checkout(default_branch)?;
            sessions.clear();
            Ok(RecoveryOutcome::Discarded {
                branch: default_branch.to_string(),
            })
        }
        RecoveryFallbackChoice::Abort => {
            warn!("Recovery: user aborted; leaving repository untouched");
            Ok(RecoveryOutcome::Aborted)
        }
    }
}
