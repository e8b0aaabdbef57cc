//! Plain-text views of [`AppState`].

use std::fmt::Write;

use permute_core::{AppState, Classification, Snapshot};

const SHORT_HASH_LEN: usize = 8;

pub fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(SHORT_HASH_LEN)]
}

pub fn status(state: &AppState) -> String {
    let mut out = String::new();
    match &state.mode {
        Classification::Attached { branch } => {
            let _ = writeln!(out, "On experiment '{branch}'");
        }
        Classification::Detached {
            from_branch,
            snapshot,
            is_latest,
        } => {
            let latest = if *is_latest { " (latest)" } else { "" };
            let _ = writeln!(
                out,
                "Viewing past version {} \"{}\" from {}{latest}",
                short_hash(&snapshot.hash),
                snapshot.subject,
                snapshot.display_date()
            );
            let _ = writeln!(out, "Started from experiment '{from_branch}'");
        }
        Classification::InconsistentDetached => {
            let _ = writeln!(out, "Viewing an unknown past version (recovery needed)");
        }
    }
    let _ = writeln!(
        out,
        "{}",
        if state.dirty {
            "Unsaved changes: yes"
        } else {
            "Unsaved changes: none"
        }
    );
    out
}

pub fn branches(state: &AppState) -> String {
    let mut out = String::new();
    for entry in &state.branches {
        let marker = if entry.is_active { '*' } else { ' ' };
        let _ = writeln!(out, "{marker} {}", entry.label());
    }
    out
}

/// History rows, newest first; `viewing` marks the detached snapshot.
pub fn history(history: &[Snapshot], viewing: Option<&str>) -> String {
    let mut out = String::new();
    for snapshot in history {
        let marker = if viewing == Some(snapshot.hash.as_str()) {
            '>'
        } else {
            ' '
        };
        let _ = writeln!(
            out,
            "{marker} {}  {}  {}",
            short_hash(&snapshot.hash),
            snapshot.display_date(),
            snapshot.subject
        );
    }
    out
}

pub fn viewing_hash(state: &AppState) -> Option<&str> {
    match &state.mode {
        Classification::Detached { snapshot, .. } => Some(snapshot.hash.as_str()),
        _ => None,
    }
}
