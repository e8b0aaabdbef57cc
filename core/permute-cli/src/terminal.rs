//! Line-based dialogs over stdin/stdout.
//!
//! End of input answers every question with its safest choice: no, cancel,
//! or abort. Piping `/dev/null` into `permute` can therefore never discard work.

use std::io::{self, BufRead, Write};

use permute_core::{
    AttachedConflictChoice, DetachedConflictChoice, RecoveryFallbackChoice, SnapshotInfo,
    UserPrompt,
};

pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stderr> {
    /// Questions go to stderr so stdout stays clean for listings.
    pub fn stdio() -> Self {
        TerminalPrompt::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        TerminalPrompt { input, output }
    }

    fn say(&mut self, text: &str) {
        let _ = writeln!(self.output, "{text}");
        let _ = self.output.flush();
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }

    /// Numbered menu; returns the chosen index or `None` at end of input.
    fn menu(&mut self, title: &str, message: &str, options: &[&str]) -> Option<usize> {
        self.say(&format!("\n== {title} ==\n{message}"));
        for (i, option) in options.iter().enumerate() {
            self.say(&format!("  {}) {option}", i + 1));
        }
        loop {
            let _ = write!(self.output, "Choose 1-{}: ", options.len());
            let _ = self.output.flush();
            let line = self.read_line()?;
            match line.trim().parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Some(n - 1),
                _ => self.say("Please enter one of the numbers above."),
            }
        }
    }
}

impl<R: BufRead, W: Write> UserPrompt for TerminalPrompt<R, W> {
    fn confirm(&mut self, title: &str, message: &str) -> bool {
        self.say(&format!("\n== {title} ==\n{message}"));
        loop {
            let _ = write!(self.output, "[y/N]: ");
            let _ = self.output.flush();
            let Some(line) = self.read_line() else {
                return false;
            };
            match line.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return true,
                "" | "n" | "no" => return false,
                _ => self.say("Please answer y or n."),
            }
        }
    }

    fn ask_text(&mut self, title: &str, message: &str) -> Option<String> {
        self.say(&format!("\n== {title} ==\n{message}"));
        let _ = write!(self.output, "> ");
        let _ = self.output.flush();
        self.read_line()
    }

    fn choose_attached_conflict(&mut self, branch: &str) -> AttachedConflictChoice {
        let choice = self.menu(
            "Unsaved Changes",
            &format!("You have unsaved changes on '{branch}'."),
            &["Save them as a snapshot", "Discard them", "Cancel"],
        );
        match choice {
            Some(0) => AttachedConflictChoice::SaveSnapshot,
            Some(1) => AttachedConflictChoice::Discard,
            _ => AttachedConflictChoice::Cancel,
        }
    }

    fn choose_detached_conflict(&mut self, snapshot: &SnapshotInfo) -> DetachedConflictChoice {
        let choice = self.menu(
            "Unsaved Changes",
            &format!(
                "You changed files while viewing the past version '{}' from {}.",
                snapshot.subject,
                snapshot.display_date()
            ),
            &[
                "Keep them in a new experiment",
                "Discard them",
                "Cancel",
            ],
        );
        match choice {
            Some(0) => DetachedConflictChoice::CreateBranch,
            Some(1) => DetachedConflictChoice::Discard,
            _ => DetachedConflictChoice::Cancel,
        }
    }

    fn choose_recovery_fallback(&mut self, default_branch: &str) -> RecoveryFallbackChoice {
        let discard = format!("Discard the unsaved work and return to '{default_branch}'");
        let choice = self.menu(
            "Unsaved Work Not Recovered",
            "No experiment name was given, so your unsaved work has not been saved.",
            &[discard.as_str(), "Stop and leave everything as it is"],
        );
        match choice {
            Some(0) => RecoveryFallbackChoice::DiscardAndReturn,
            _ => RecoveryFallbackChoice::Abort,
        }
    }

    fn notify(&mut self, message: &str) {
        self.say(message);
    }

    fn show_error(&mut self, message: &str) {
        self.say(&format!("Error: {message}"));
    }
}
