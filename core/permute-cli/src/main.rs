//! permute: manage experiments and snapshots of a project folder.
//!
//! Every invocation:
//! 1. opens the project (`--project`, else the last one opened)
//! 2. reconciles the session record with the repository, running recovery if needed
//! 3. runs one command and prints the resulting state
//!
//! ## Exit codes
//!
//! - `0`: success, or the user cancelled
//! - `1`: the command failed
//! - `2`: recovery was aborted; nothing else ran

mod crash;
mod logging;
mod render;
mod terminal;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use fs_err as fs;
use tracing::{error, info};

use permute_core::{
    AppConfig, AppState, GitBackend, OpStatus, PermuteError, RecoveryOutcome, RepositoryBackend,
    StorageConfig, TransitionController,
};
use terminal::TerminalPrompt;

const EXIT_FAILED: i32 = 1;
const EXIT_RECOVERY_ABORTED: i32 = 2;

#[derive(Parser)]
#[command(name = "permute")]
#[command(about = "Experiments and snapshots for a project folder")]
#[command(version)]
struct Cli {
    /// Project folder (defaults to the last one opened)
    #[arg(long, global = true, value_name = "PATH")]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a project folder, creating its history if needed, and remember it
    Open {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Show the current experiment or viewed version
    Status,

    /// List experiments
    Branches,

    /// List snapshots, newest first
    History {
        /// Experiment to list (defaults to the one being shown)
        #[arg(value_name = "BRANCH")]
        branch: Option<String>,
    },

    /// Switch to another experiment
    Switch {
        #[arg(value_name = "BRANCH")]
        branch: String,
    },

    /// Start a new experiment from the current point
    New {
        /// Name of the new experiment (asked for when omitted)
        #[arg(long)]
        name: Option<String>,
    },

    /// Start a new experiment from a past snapshot
    BranchFrom {
        #[arg(value_name = "HASH")]
        hash: String,

        /// Name of the new experiment (asked for when omitted)
        #[arg(long)]
        name: Option<String>,
    },

    /// View a past snapshot
    View {
        #[arg(value_name = "HASH")]
        hash: String,

        /// Experiment whose history contains the snapshot
        #[arg(long)]
        branch: Option<String>,
    },

    /// Stop viewing a past version and return to the experiment
    Return,

    /// Make the viewed past version the newest snapshot
    Restore,

    /// Permanently move the current experiment back to a snapshot
    Reset {
        #[arg(value_name = "HASH")]
        hash: String,
    },

    /// Delete an experiment
    Delete {
        #[arg(value_name = "BRANCH")]
        branch: String,
    },

    /// Save all changes as a new snapshot
    Save {
        #[arg(value_name = "DESCRIPTION")]
        description: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let storage = match StorageConfig::from_home() {
        Ok(storage) => storage,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(EXIT_FAILED);
        }
    };
    let logging_guard = logging::init(&storage);
    crash::install(&storage);

    let code = match run(cli, &storage) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "permute failed");
            eprintln!("Error: {err}");
            EXIT_FAILED
        }
    };

    drop(logging_guard);
    std::process::exit(code);
}

fn run(cli: Cli, storage: &StorageConfig) -> Result<i32, PermuteError> {
    let mut config = AppConfig::load(storage);

    let project = match &cli.command {
        Commands::Open { path } => absolute(path)?,
        _ => config.resolve_project(cli.project.as_deref())?,
    };

    let mut controller = TransitionController::open_git(&project, &config)?;
    let mut prompt = TerminalPrompt::stdio();

    let report = controller.recover(&mut prompt)?;
    match &report.outcome {
        RecoveryOutcome::NotNeeded => {}
        RecoveryOutcome::Aborted => {
            eprintln!("Recovery was stopped. Nothing else was done.");
            return Ok(EXIT_RECOVERY_ABORTED);
        }
        outcome => info!(?outcome, "Start-up recovery finished"),
    }

    let status = match cli.command {
        Commands::Open { .. } => {
            config.project_root = Some(project.clone());
            config.save(storage)?;
            println!("Opened {}", project.display());
            print_state(&controller.refresh()?);
            return Ok(0);
        }
        Commands::Status => {
            print_state(&controller.refresh()?);
            return Ok(0);
        }
        Commands::Branches => {
            print!("{}", render::branches(&controller.refresh()?));
            return Ok(0);
        }
        Commands::History { branch } => {
            let state = controller.refresh()?;
            match branch {
                Some(branch) => {
                    let history = controller.backend().history(&branch)?;
                    print!("{}", render::history(&history, render::viewing_hash(&state)));
                }
                None => print!(
                    "{}",
                    render::history(&state.history, render::viewing_hash(&state))
                ),
            }
            return Ok(0);
        }
        Commands::Switch { branch } => {
            controller.execute(&mut prompt, |c, p| c.switch_branch(&branch, p))?
        }
        Commands::New { name } => {
            controller.execute(&mut prompt, |c, p| c.branch_from_current(name.as_deref(), p))?
        }
        Commands::BranchFrom { hash, name } => controller.execute(&mut prompt, |c, p| {
            c.create_branch_from(&hash, name.as_deref(), p)
        })?,
        Commands::View { hash, branch } => {
            let branch = match branch {
                Some(branch) => branch,
                None => shown_branch(&controller)?,
            };
            controller.execute(&mut prompt, |c, p| c.load_snapshot(&branch, &hash, p))?
        }
        Commands::Return => controller.execute(&mut prompt, |c, p| c.return_to_present(p))?,
        Commands::Restore => controller.execute(&mut prompt, |c, p| c.restore_as_snapshot(p))?,
        Commands::Reset { hash } => {
            controller.execute(&mut prompt, |c, p| c.force_reset(&hash, p))?
        }
        Commands::Delete { branch } => {
            controller.execute(&mut prompt, |c, p| c.delete_branch(&branch, p))?
        }
        Commands::Save { description } => {
            controller.execute(&mut prompt, |c, _| c.save_snapshot(&description))?
        }
    };

    print_state(&status.state);
    Ok(match status.status {
        Some(OpStatus::Cancelled) => {
            eprintln!("Cancelled.");
            0
        }
        Some(_) => 0,
        None => EXIT_FAILED,
    })
}

fn print_state(state: &AppState) {
    print!("{}", render::status(state));
}

/// The experiment whose history is on screen, falling back to the default.
fn shown_branch(controller: &TransitionController<GitBackend>) -> Result<String, PermuteError> {
    let state = controller.refresh()?;
    Ok(state
        .mode
        .history_branch()
        .unwrap_or(controller.default_branch())
        .to_string())
}

fn absolute(path: &Path) -> Result<PathBuf, PermuteError> {
    if !path.is_dir() {
        return Err(PermuteError::ProjectNotFound(path.to_path_buf()));
    }
    fs::canonicalize(path).map_err(|e| PermuteError::Io {
        context: format!("resolve {}", path.display()),
        source: e,
    })
}
