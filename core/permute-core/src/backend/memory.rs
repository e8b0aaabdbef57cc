//! In-memory backend for unit tests.
//!
//! Models just enough of git for the reconciliation core: content-addressed
//! commits with parents, branch pointers, HEAD, and a working file map.
//! Checkout refuses to move a dirty tree to a different commit, like git does
//! when local changes would be overwritten.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{TimeZone, Utc};

use super::{HeadState, RepositoryBackend, Snapshot};
use crate::error::{PermuteError, Result};

type Files = BTreeMap<String, String>;

#[derive(Debug, Clone)]
struct MemCommit {
    parent: Option<String>,
    files: Files,
    snapshot: Snapshot,
}

#[derive(Debug, Clone, PartialEq)]
enum MemHead {
    Branch(String),
    Detached(String),
}

pub struct MemoryBackend {
    commits: HashMap<String, MemCommit>,
    branches: BTreeMap<String, String>,
    head: MemHead,
    working: Files,
    next_id: u32,
    failures: HashMap<&'static str, String>,
    calls: RefCell<Vec<String>>,
}

impl MemoryBackend {
    /// A repository whose `branch` holds the given `(hash, subject)` snapshots, oldest first.
    ///
    /// Each snapshot writes `state.txt` with its own hash so content is traceable.
    pub fn with_history(branch: &str, snapshots: &[(&str, &str)]) -> Self {
        let mut backend = MemoryBackend {
            commits: HashMap::new(),
            branches: BTreeMap::new(),
            head: MemHead::Branch(branch.to_string()),
            working: Files::new(),
            next_id: 0,
            failures: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        };
        let mut parent: Option<String> = None;
        for (hash, subject) in snapshots {
            let mut files = parent
                .as_ref()
                .map(|p| backend.commits[p].files.clone())
                .unwrap_or_default();
            files.insert("state.txt".to_string(), hash.to_string());
            backend.insert_commit(hash, parent.clone(), files, subject);
            parent = Some(hash.to_string());
        }
        let tip = parent.expect("at least one snapshot");
        backend.working = backend.commits[&tip].files.clone();
        backend.branches.insert(branch.to_string(), tip);
        backend
    }

    /// Adds `branch` whose history continues from `base` with extra snapshots.
    pub fn add_branch(&mut self, branch: &str, base: &str, snapshots: &[(&str, &str)]) {
        let mut parent = base.to_string();
        for (hash, subject) in snapshots {
            let mut files = self.commits[&parent].files.clone();
            files.insert("state.txt".to_string(), hash.to_string());
            self.insert_commit(hash, Some(parent.clone()), files, subject);
            parent = hash.to_string();
        }
        self.branches.insert(branch.to_string(), parent);
    }

    /// Puts HEAD on `hash` directly, as an interrupted checkout would leave it.
    pub fn force_detach(&mut self, hash: &str) {
        self.head = MemHead::Detached(hash.to_string());
        self.working = self.commits[hash].files.clone();
    }

    pub fn write_file(&mut self, path: &str, content: &str) {
        self.working.insert(path.to_string(), content.to_string());
    }

    pub fn working_file(&self, path: &str) -> Option<&str> {
        self.working.get(path).map(String::as_str)
    }

    pub fn files_at(&self, hash: &str) -> Files {
        self.commits[hash].files.clone()
    }

    pub fn branch_tip(&self, branch: &str) -> Option<&str> {
        self.branches.get(branch).map(String::as_str)
    }

    /// Makes the next call to `op` fail with `details`.
    pub fn fail_on(&mut self, op: &'static str, details: &str) {
        self.failures.insert(op, details.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn mutating_calls(&self) -> Vec<String> {
        const READS: [&str; 6] = [
            "current_state",
            "current_snapshot_hash",
            "list_branches",
            "history",
            "has_uncommitted_changes",
            "is_ancestor_of",
        ];
        self.calls()
            .into_iter()
            .filter(|c| !READS.iter().any(|r| c.starts_with(r)))
            .collect()
    }

    fn insert_commit(&mut self, hash: &str, parent: Option<String>, files: Files, subject: &str) {
        let date = Utc
            .timestamp_opt(1_700_000_000 + i64::from(self.next_id) * 60, 0)
            .single()
            .expect("valid timestamp");
        self.next_id += 1;
        self.commits.insert(
            hash.to_string(),
            MemCommit {
                parent,
                files,
                snapshot: Snapshot {
                    hash: hash.to_string(),
                    date,
                    subject: subject.to_string(),
                },
            },
        );
    }

    fn record(&mut self, call: String, op: &'static str) -> Result<()> {
        self.calls.borrow_mut().push(call.clone());
        match self.failures.remove(op) {
            Some(details) => Err(PermuteError::CommandFailed {
                command: call,
                details,
            }),
            None => Ok(()),
        }
    }

    fn note(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }

    fn head_commit(&self) -> &str {
        match &self.head {
            MemHead::Branch(name) => &self.branches[name],
            MemHead::Detached(hash) => hash,
        }
    }

    fn is_dirty(&self) -> bool {
        self.working != self.commits[self.head_commit()].files
    }

    fn resolve(&self, target: &str) -> Option<String> {
        self.branches
            .get(target)
            .cloned()
            .or_else(|| self.commits.contains_key(target).then(|| target.to_string()))
    }

    fn ancestors(&self, tip: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut cursor = Some(tip.to_string());
        while let Some(hash) = cursor {
            cursor = self.commits[&hash].parent.clone();
            out.push(hash);
        }
        out
    }

    fn failed(command: String, details: &str) -> PermuteError {
        PermuteError::CommandFailed {
            command,
            details: details.to_string(),
        }
    }

    fn guard_overwrite(&self, call: &str, target_commit: &str) -> Result<()> {
        if self.is_dirty() && target_commit != self.head_commit() {
            return Err(Self::failed(
                call.to_string(),
                "Your local changes to the following files would be overwritten",
            ));
        }
        Ok(())
    }
}

impl RepositoryBackend for MemoryBackend {
    fn current_state(&self) -> Result<HeadState> {
        self.note("current_state".to_string());
        Ok(match &self.head {
            MemHead::Branch(name) => HeadState::Attached(name.clone()),
            MemHead::Detached(_) => HeadState::Detached,
        })
    }

    fn current_snapshot_hash(&self) -> Result<String> {
        self.note("current_snapshot_hash".to_string());
        Ok(self.head_commit().to_string())
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        self.note("list_branches".to_string());
        Ok(self.branches.keys().cloned().collect())
    }

    fn history(&self, branch: &str) -> Result<Vec<Snapshot>> {
        self.note(format!("history {branch}"));
        let tip = self
            .resolve(branch)
            .ok_or_else(|| Self::failed(format!("history {branch}"), "unknown revision"))?;
        Ok(self
            .ancestors(&tip)
            .iter()
            .map(|h| self.commits[h].snapshot.clone())
            .collect())
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        self.note("has_uncommitted_changes".to_string());
        Ok(self.is_dirty())
    }

    fn checkout(&mut self, target: &str) -> Result<()> {
        let call = format!("checkout {target}");
        self.record(call.clone(), "checkout")?;
        let commit = self
            .resolve(target)
            .ok_or_else(|| Self::failed(call.clone(), "pathspec did not match"))?;
        self.guard_overwrite(&call, &commit)?;
        if !self.is_dirty() {
            self.working = self.commits[&commit].files.clone();
        }
        self.head = if self.branches.contains_key(target) {
            MemHead::Branch(target.to_string())
        } else {
            MemHead::Detached(commit)
        };
        Ok(())
    }

    fn create_branch(&mut self, name: &str, start_point: &str) -> Result<()> {
        let call = format!("create_branch {name} {start_point}");
        self.record(call.clone(), "create_branch")?;
        if self.branches.contains_key(name) {
            return Err(Self::failed(call, "a branch with that name already exists"));
        }
        let commit = self
            .resolve(start_point)
            .ok_or_else(|| Self::failed(call.clone(), "not a valid object name"))?;
        self.guard_overwrite(&call, &commit)?;
        if !self.is_dirty() {
            self.working = self.commits[&commit].files.clone();
        }
        self.branches.insert(name.to_string(), commit);
        self.head = MemHead::Branch(name.to_string());
        Ok(())
    }

    fn delete_branch(&mut self, name: &str) -> Result<()> {
        let call = format!("delete_branch {name}");
        self.record(call.clone(), "delete_branch")?;
        if self.head == MemHead::Branch(name.to_string()) {
            return Err(Self::failed(call, "cannot delete the checked out branch"));
        }
        self.branches
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Self::failed(call, "branch not found"))
    }

    fn commit(&mut self, message: &str) -> Result<()> {
        let call = format!("commit {message}");
        self.record(call.clone(), "commit")?;
        if !self.is_dirty() {
            return Err(Self::failed(call, "nothing to commit, working tree clean"));
        }
        let hash = format!("m{}", self.next_id);
        let parent = self.head_commit().to_string();
        let files = self.working.clone();
        self.insert_commit(&hash, Some(parent), files, message);
        if let MemHead::Branch(name) = self.head.clone() {
            self.branches.insert(name, hash);
        } else {
            self.head = MemHead::Detached(hash);
        }
        Ok(())
    }

    fn discard_changes(&mut self) -> Result<()> {
        self.record("discard_changes".to_string(), "discard_changes")?;
        self.working = self.commits[self.head_commit()].files.clone();
        Ok(())
    }

    fn hard_reset_branch(&mut self, branch: &str, hash: &str) -> Result<()> {
        let call = format!("hard_reset_branch {branch} {hash}");
        self.record(call.clone(), "hard_reset_branch")?;
        if !self.commits.contains_key(hash) {
            return Err(Self::failed(call, "unknown revision"));
        }
        self.branches.insert(branch.to_string(), hash.to_string());
        if self.head == MemHead::Branch(branch.to_string()) {
            self.working = self.commits[hash].files.clone();
        }
        Ok(())
    }

    fn overlay_snapshot(&mut self, hash: &str) -> Result<()> {
        let call = format!("overlay_snapshot {hash}");
        self.record(call.clone(), "overlay_snapshot")?;
        let commit = self
            .commits
            .get(hash)
            .ok_or_else(|| Self::failed(call, "unknown revision"))?;
        self.working = commit.files.clone();
        Ok(())
    }

    fn is_ancestor_of(&self, branch: &str, other: &str) -> Result<bool> {
        self.note(format!("is_ancestor_of {branch} {other}"));
        let (Some(tip), Some(other_tip)) = (self.resolve(branch), self.resolve(other)) else {
            return Err(Self::failed(
                format!("is_ancestor_of {branch} {other}"),
                "unknown revision",
            ));
        };
        let reachable: HashSet<String> = self.ancestors(&other_tip).into_iter().collect();
        Ok(reachable.contains(&tip))
    }
}
