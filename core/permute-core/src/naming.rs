//! Experiment (branch) name validation.
//!
//! Names must be usable as git refs and as folder-safe labels, and must not
//! collide with an existing experiment.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::backend::RepositoryBackend;
use crate::error::Result;
use crate::prompt::UserPrompt;

/// Whitespace, control characters and the characters git refuses in ref names.
static FORBIDDEN_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\x00-\x1f\x7f~^:?*\[\\]").expect("valid regex"));

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BranchNameError {
    #[error("name cannot be empty")]
    Empty,

    #[error("name cannot contain spaces")]
    Whitespace,

    #[error("name cannot contain '{0}'")]
    ForbiddenCharacter(char),

    #[error("name cannot start or end with '/'")]
    EdgeSeparator,

    #[error("name cannot contain '..'")]
    ParentMarker,

    #[error("name cannot contain '//' or '@{{'")]
    ReservedSequence,

    #[error("name cannot start with '-' or '.', or end with '.' or '.lock'")]
    ReservedAffix,

    #[error("an experiment named '{0}' already exists")]
    AlreadyExists(String),
}

/// Checks a proposed experiment name against ref-name rules and the existing set.
///
/// The name is validated as given; callers trim user input first.
pub fn validate_branch_name<S: AsRef<str>>(
    name: &str,
    existing: &[S],
) -> std::result::Result<(), BranchNameError> {
    if name.is_empty() {
        return Err(BranchNameError::Empty);
    }
    if name.chars().any(char::is_whitespace) {
        return Err(BranchNameError::Whitespace);
    }
    if let Some(found) = FORBIDDEN_CHARS.find(name) {
        let c = found.as_str().chars().next().unwrap_or('?');
        return Err(BranchNameError::ForbiddenCharacter(c));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(BranchNameError::EdgeSeparator);
    }
    if name.contains("..") {
        return Err(BranchNameError::ParentMarker);
    }
    if name.contains("//") || name.contains("@{") || name == "@" {
        return Err(BranchNameError::ReservedSequence);
    }
    let has_reserved_component = name
        .split('/')
        .any(|component| component.starts_with('.') || component.ends_with(".lock"));
    if name.starts_with('-') || name.ends_with('.') || has_reserved_component || name == "HEAD" {
        return Err(BranchNameError::ReservedAffix);
    }
    if existing.iter().any(|b| b.as_ref() == name) {
        return Err(BranchNameError::AlreadyExists(name.to_string()));
    }
    Ok(())
}

/// Validates a name supplied without a prompt, returning it trimmed.
pub fn check_branch_name<B>(backend: &B, name: &str) -> Result<String>
where
    B: RepositoryBackend + ?Sized,
{
    let name = name.trim();
    validate_branch_name(name, &backend.list_branches()?)?;
    Ok(name.to_string())
}

/// Asks for a new experiment name until a valid one is given.
///
/// Invalid input is reported through the prompt and asked again. Returns
/// `None` when the user cancels.
pub fn ask_branch_name<B, P>(
    backend: &B,
    prompt: &mut P,
    title: &str,
    message: &str,
) -> Result<Option<String>>
where
    B: RepositoryBackend + ?Sized,
    P: UserPrompt + ?Sized,
{
    let existing = backend.list_branches()?;
    loop {
        let Some(input) = prompt.ask_text(title, message) else {
            return Ok(None);
        };
        let name = input.trim();
        match validate_branch_name(name, &existing) {
            Ok(()) => return Ok(Some(name.to_string())),
            Err(err) => prompt.show_error(&format!("Invalid name: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn test_accepts_simple_names() {
        assert!(validate_branch_name("dark-mode", &NONE).is_ok());
        assert!(validate_branch_name("feature/login_v2", &NONE).is_ok());
        assert!(validate_branch_name("recovered-1", &["main"]).is_ok());
    }

    #[test]
    fn test_rejects_empty_and_whitespace() {
        assert_eq!(validate_branch_name("", &NONE), Err(BranchNameError::Empty));
        assert_eq!(
            validate_branch_name("my idea", &NONE),
            Err(BranchNameError::Whitespace)
        );
        assert_eq!(
            validate_branch_name("tab\there", &NONE),
            Err(BranchNameError::Whitespace)
        );
    }

    #[test]
    fn test_rejects_git_reserved_characters() {
        let cases = [
            ("a~b", '~'),
            ("a^b", '^'),
            ("a:b", ':'),
            ("a?b", '?'),
            ("a*b", '*'),
            ("a[b", '['),
            ("a\\b", '\\'),
        ];
        for (name, c) in cases {
            assert_eq!(
                validate_branch_name(name, &NONE),
                Err(BranchNameError::ForbiddenCharacter(c)),
                "{name}"
            );
        }
    }

    #[test]
    fn test_rejects_path_edges_and_parent_markers() {
        assert_eq!(
            validate_branch_name("/leading", &NONE),
            Err(BranchNameError::EdgeSeparator)
        );
        assert_eq!(
            validate_branch_name("trailing/", &NONE),
            Err(BranchNameError::EdgeSeparator)
        );
        assert_eq!(
            validate_branch_name("up..there", &NONE),
            Err(BranchNameError::ParentMarker)
        );
        assert_eq!(
            validate_branch_name("a//b", &NONE),
            Err(BranchNameError::ReservedSequence)
        );
    }

    #[test]
    fn test_rejects_reserved_affixes() {
        for name in ["-flag", "ends.", "x.lock", "HEAD", "a/.hidden"] {
            assert_eq!(
                validate_branch_name(name, &NONE),
                Err(BranchNameError::ReservedAffix),
                "{name}"
            );
        }
    }

    #[test]
    fn test_ask_branch_name_reprompts_until_valid() {
        use crate::backend::memory::MemoryBackend;
        use crate::prompt::test_utils::{Reply, ScriptedPrompt};

        let backend = MemoryBackend::with_history("main", &[("a1", "first")]);
        let mut prompt = ScriptedPrompt::new(vec![
            Reply::text("has space"),
            Reply::text("main"),
            Reply::text("  tidy-up  "),
        ]);
        let name = ask_branch_name(&backend, &mut prompt, "New Experiment", "Name:").unwrap();
        assert_eq!(name.as_deref(), Some("tidy-up"));
        assert_eq!(prompt.errors.len(), 2);
    }

    #[test]
    fn test_ask_branch_name_cancel_returns_none() {
        use crate::backend::memory::MemoryBackend;
        use crate::prompt::test_utils::{Reply, ScriptedPrompt};

        let backend = MemoryBackend::with_history("main", &[("a1", "first")]);
        let mut prompt = ScriptedPrompt::new(vec![Reply::text(""), Reply::Text(None)]);
        let name = ask_branch_name(&backend, &mut prompt, "New Experiment", "Name:").unwrap();
        assert!(name.is_none());
        assert_eq!(prompt.errors.len(), 1);
    }

    #[test]
    fn test_check_branch_name_wraps_rule_failures() {
        use crate::backend::memory::MemoryBackend;
        use crate::error::PermuteError;

        let backend = MemoryBackend::with_history("main", &[("a1", "first")]);
        assert_eq!(check_branch_name(&backend, " idea ").unwrap(), "idea");
        assert!(matches!(
            check_branch_name(&backend, "main"),
            Err(PermuteError::InvalidBranchName(BranchNameError::AlreadyExists(_)))
        ));
        assert!(matches!(
            check_branch_name(&backend, "two words"),
            Err(PermuteError::InvalidBranchName(BranchNameError::Whitespace))
        ));
    }

    #[test]
    fn test_rejects_duplicates() {
        let existing = vec!["main".to_string(), "dark-mode".to_string()];
        assert_eq!(
            validate_branch_name("dark-mode", &existing),
            Err(BranchNameError::AlreadyExists("dark-mode".to_string()))
        );
    }
}
