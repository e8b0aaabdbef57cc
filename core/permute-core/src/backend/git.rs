//! Git subprocess backend.
//!
//! Every call runs `git` in the project root with a bounded wait. Output is
//! drained on helper threads so a chatty command cannot block on a full pipe
//! while we poll for exit.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use fs_err as fs;
use tracing::{debug, info, warn};

use super::{HeadState, RepositoryBackend, Snapshot};
use crate::error::{PermuteError, Result};
use crate::session::SESSION_META_DIR;

const POLL_INTERVAL_MS: u64 = 10;
const FIELD_SEP: char = '\u{1f}';
const INITIAL_COMMIT_MESSAGE: &str = "Initial Commit";
const COMMITTER_NAME: &str = "Permute";
const COMMITTER_EMAIL: &str = "permute@localhost";

#[derive(Debug, Clone)]
pub struct GitOptions {
    pub default_branch: String,
    pub timeout: Duration,
}

impl Default for GitOptions {
    fn default() -> Self {
        Self {
            default_branch: crate::DEFAULT_BRANCH.to_string(),
            timeout: Duration::from_secs(crate::config::DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }
}

struct CommandOutput {
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

impl CommandOutput {
    fn success(&self) -> bool {
        self.code == Some(0)
    }
}

pub struct GitBackend {
    root: PathBuf,
    options: GitOptions,
}

impl GitBackend {
    /// Opens an existing project folder without touching its repository.
    pub fn open(root: &Path, options: GitOptions) -> Result<Self> {
        if !root.is_dir() {
            return Err(PermuteError::ProjectNotFound(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
            options,
        })
    }

    /// Opens a project folder, creating and configuring its repository if needed.
    ///
    /// - New folders get `git init`, a local committer identity, and an
    ///   initial commit of whatever is already there.
    /// - Existing repositories only get the `.gitignore` entry for session files.
    pub fn open_or_init(root: &Path, options: GitOptions) -> Result<Self> {
        let backend = Self::open(root, options)?;
        let is_new_repo = !root.join(".git").exists();

        if is_new_repo {
            info!(root = %root.display(), "Initializing new repository");
            backend.run(&["init", "--quiet"])?;
            let head_ref = format!("refs/heads/{}", backend.options.default_branch);
            backend.run(&["symbolic-ref", "HEAD", &head_ref])?;
            backend.run(&["config", "user.name", COMMITTER_NAME])?;
            backend.run(&["config", "user.email", COMMITTER_EMAIL])?;
        }

        backend.ensure_gitignore()?;

        if is_new_repo {
            backend.run(&["add", "-A"])?;
            if let Err(err) = backend.run(&["commit", "--quiet", "-m", INITIAL_COMMIT_MESSAGE]) {
                // Empty folders have nothing to commit.
                debug!(error = %err, "Initial commit failed, retrying as empty commit");
                backend.run(&[
                    "commit",
                    "--quiet",
                    "--allow-empty",
                    "-m",
                    INITIAL_COMMIT_MESSAGE,
                ])?;
            }
        }

        Ok(backend)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn default_branch(&self) -> &str {
        &self.options.default_branch
    }

    fn ensure_gitignore(&self) -> Result<()> {
        let path = self.root.join(".gitignore");
        let entry = format!("{SESSION_META_DIR}/");

        let existing = if path.exists() {
            fs::read_to_string(&path).map_err(|e| PermuteError::io("read .gitignore", e))?
        } else {
            String::new()
        };

        if existing.lines().any(|line| line.trim() == entry) {
            return Ok(());
        }

        let mut content = existing;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str("# Permute session files\n");
        content.push_str(&entry);
        content.push('\n');

        fs::write(&path, content).map_err(|e| PermuteError::io("write .gitignore", e))?;
        debug!(path = %path.display(), "Added session directory to .gitignore");
        Ok(())
    }

    fn exec(&self, args: &[&str]) -> Result<CommandOutput> {
        let command = format!("git {}", args.join(" "));
        debug!(command = %command, "Running backend command");

        let mut child = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PermuteError::GitNotFound
                } else {
                    PermuteError::io(format!("spawn `{command}`"), e)
                }
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() >= self.options.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        warn!(command = %command, "Backend command timed out");
                        return Err(PermuteError::CommandTimedOut {
                            command,
                            secs: self.options.timeout.as_secs(),
                        });
                    }
                    thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
                }
                Err(e) => return Err(PermuteError::io(format!("wait for `{command}`"), e)),
            }
        };

        Ok(CommandOutput {
            code: status.code(),
            stdout: stdout.join().unwrap_or_default(),
            stderr: stderr.join().unwrap_or_default(),
        })
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.exec(args)?;
        if output.success() {
            return Ok(output.stdout.trim().to_string());
        }
        let details = if output.stderr.trim().is_empty() {
            output.stdout.trim().to_string()
        } else {
            output.stderr.trim().to_string()
        };
        Err(PermuteError::CommandFailed {
            command: format!("git {}", args.join(" ")),
            details,
        })
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn parse_history_line(line: &str) -> Option<Snapshot> {
    let mut parts = line.splitn(3, FIELD_SEP);
    let hash = parts.next()?.trim();
    let date = parts.next()?;
    let subject = parts.next()?;
    if hash.is_empty() {
        return None;
    }
    let date = DateTime::parse_from_rfc3339(date.trim()).ok()?;
    Some(Snapshot {
        hash: hash.to_string(),
        date: date.with_timezone(&Utc),
        subject: subject.to_string(),
    })
}

impl RepositoryBackend for GitBackend {
    fn current_state(&self) -> Result<HeadState> {
        let current_ref = self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        if current_ref == "HEAD" {
            Ok(HeadState::Detached)
        } else {
            Ok(HeadState::Attached(current_ref))
        }
    }

    fn current_snapshot_hash(&self) -> Result<String> {
        self.run(&["rev-parse", "HEAD"])
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        let output = self.run(&["branch", "--format=%(refname:short)"])?;
        let mut branches: Vec<String> = output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        branches.sort();
        Ok(branches)
    }

    fn history(&self, branch: &str) -> Result<Vec<Snapshot>> {
        let format = format!("--pretty=format:%H{FIELD_SEP}%aI{FIELD_SEP}%s");
        let output = self.run(&["log", branch, &format, "--"])?;
        let mut history = Vec::new();
        for line in output.lines() {
            match parse_history_line(line) {
                Some(snapshot) => history.push(snapshot),
                None => warn!(line = %line, "Skipping unparseable history line"),
            }
        }
        Ok(history)
    }

    fn has_uncommitted_changes(&self) -> Result<bool> {
        Ok(!self.run(&["status", "--porcelain"])?.is_empty())
    }

    fn checkout(&mut self, target: &str) -> Result<()> {
        self.run(&["checkout", "--quiet", target]).map(|_| ())
    }

    fn create_branch(&mut self, name: &str, start_point: &str) -> Result<()> {
        self.run(&["checkout", "--quiet", "-b", name, start_point])
            .map(|_| ())
    }

    fn delete_branch(&mut self, name: &str) -> Result<()> {
        self.run(&["branch", "-D", name]).map(|_| ())
    }

    fn commit(&mut self, message: &str) -> Result<()> {
        self.run(&["add", "-A"])?;
        self.run(&["commit", "--quiet", "-m", message]).map(|_| ())
    }

    fn discard_changes(&mut self) -> Result<()> {
        self.run(&["reset", "--quiet", "--hard", "HEAD"])?;
        self.run(&["clean", "-fd"]).map(|_| ())
    }

    fn hard_reset_branch(&mut self, branch: &str, hash: &str) -> Result<()> {
        if self.current_state()?.branch() == Some(branch) {
            self.run(&["reset", "--quiet", "--hard", hash])?;
            self.run(&["clean", "-fd"]).map(|_| ())
        } else {
            self.run(&["branch", "-f", branch, hash]).map(|_| ())
        }
    }

    fn overlay_snapshot(&mut self, hash: &str) -> Result<()> {
        // Rewrites index and working tree to the snapshot's tree; HEAD stays put.
        self.run(&["read-tree", "-u", "--reset", hash]).map(|_| ())
    }

    fn is_ancestor_of(&self, branch: &str, other: &str) -> Result<bool> {
        let args = ["merge-base", "--is-ancestor", branch, other];
        let output = self.exec(&args)?;
        match output.code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(PermuteError::CommandFailed {
                command: format!("git {}", args.join(" ")),
                details: output.stderr.trim().to_string(),
            }),
        }
    }
}
