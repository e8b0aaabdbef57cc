//! The "ask user" seam.
//!
//! The core never draws dialogs. Every decision that could lose work goes
//! through a [`UserPrompt`], which a front end implements with whatever
//! widgets it has (the `permute` CLI uses stdin).

use crate::session::SnapshotInfo;

/// Answer to "you have unsaved changes" while on a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachedConflictChoice {
    SaveSnapshot,
    Discard,
    Cancel,
}

/// Answer to "you have unsaved changes" while viewing a past version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachedConflictChoice {
    CreateBranch,
    Discard,
    Cancel,
}

/// Last-resort answer when recovery could not save unsaved work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryFallbackChoice {
    DiscardAndReturn,
    Abort,
}

pub trait UserPrompt {
    /// Yes/no question; `false` means no or dismissed.
    fn confirm(&mut self, title: &str, message: &str) -> bool;

    /// Free-text question; `None` means the user cancelled.
    fn ask_text(&mut self, title: &str, message: &str) -> Option<String>;

    fn choose_attached_conflict(&mut self, branch: &str) -> AttachedConflictChoice;

    fn choose_detached_conflict(&mut self, snapshot: &SnapshotInfo) -> DetachedConflictChoice;

    fn choose_recovery_fallback(&mut self, default_branch: &str) -> RecoveryFallbackChoice;

    /// Non-blocking notice.
    fn notify(&mut self, message: &str);

    fn show_error(&mut self, message: &str);
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use std::collections::VecDeque;

    /// One queued answer for [`ScriptedPrompt`].
    #[derive(Debug, Clone, PartialEq)]
    pub enum Reply {
        Confirm(bool),
        Text(Option<String>),
        Attached(AttachedConflictChoice),
        Detached(DetachedConflictChoice),
        Fallback(RecoveryFallbackChoice),
    }

    impl Reply {
        pub fn text(value: &str) -> Self {
            Reply::Text(Some(value.to_string()))
        }
    }

    /// Answers prompts from a queue and records everything shown to the user.
    ///
    /// Panics if asked a question it has no (or the wrong kind of) reply for,
    /// so a test fails loudly when a flow asks more than expected.
    #[derive(Default)]
    pub struct ScriptedPrompt {
        replies: VecDeque<Reply>,
        pub asked: Vec<String>,
        pub notices: Vec<String>,
        pub errors: Vec<String>,
        /// Snapshots passed to the detached-conflict dialog.
        pub shown_snapshots: Vec<SnapshotInfo>,
    }

    impl ScriptedPrompt {
        pub fn new(replies: Vec<Reply>) -> Self {
            ScriptedPrompt {
                replies: replies.into(),
                ..Default::default()
            }
        }

        pub fn remaining(&self) -> usize {
            self.replies.len()
        }

        fn next(&mut self, question: &str) -> Reply {
            self.asked.push(question.to_string());
            self.replies
                .pop_front()
                .unwrap_or_else(|| panic!("no scripted reply for: {question}"))
        }
    }

    impl UserPrompt for ScriptedPrompt {
        fn confirm(&mut self, title: &str, _message: &str) -> bool {
            match self.next(title) {
                Reply::Confirm(answer) => answer,
                other => panic!("expected Confirm for '{title}', got {other:?}"),
            }
        }

        fn ask_text(&mut self, title: &str, _message: &str) -> Option<String> {
            match self.next(title) {
                Reply::Text(answer) => answer,
                other => panic!("expected Text for '{title}', got {other:?}"),
            }
        }

        fn choose_attached_conflict(&mut self, _branch: &str) -> AttachedConflictChoice {
            match self.next("attached conflict") {
                Reply::Attached(choice) => choice,
                other => panic!("expected Attached, got {other:?}"),
            }
        }

        fn choose_detached_conflict(&mut self, snapshot: &SnapshotInfo) -> DetachedConflictChoice {
            self.shown_snapshots.push(snapshot.clone());
            match self.next("detached conflict") {
                Reply::Detached(choice) => choice,
                other => panic!("expected Detached, got {other:?}"),
            }
        }

        fn choose_recovery_fallback(&mut self, _default_branch: &str) -> RecoveryFallbackChoice {
            match self.next("recovery fallback") {
                Reply::Fallback(choice) => choice,
                other => panic!("expected Fallback, got {other:?}"),
            }
        }

        fn notify(&mut self, message: &str) {
            self.notices.push(message.to_string());
        }

        fn show_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }
    }
}
