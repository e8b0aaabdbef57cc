//! Panic hook that leaves a report in `~/.permute/crash/`.

use std::backtrace::Backtrace;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs_err as fs;
use permute_core::StorageConfig;

/// Chains onto the existing hook, so the default panic message still prints.
pub fn install(storage: &StorageConfig) {
    let crash_dir = storage.crash_dir();
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let report = format!(
            "Permute {} crashed at {}\n\n{info}\n\nBacktrace:\n{}",
            env!("CARGO_PKG_VERSION"),
            Utc::now().to_rfc3339(),
            Backtrace::force_capture()
        );
        match write_report(&crash_dir, &report) {
            Ok(path) => {
                tracing::error!(path = %path.display(), panic = %info, "Crashed");
                eprintln!(
                    "\nPermute stopped unexpectedly. A crash report was saved to:\n  {}\n",
                    path.display()
                );
            }
            Err(err) => {
                tracing::error!(error = %err, panic = %info, "Crashed; could not write report");
            }
        }
        previous(info);
    }));
}

fn write_report(dir: &Path, report: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "crash-{}.log",
        Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
    ));
    fs::write(&path, report)?;
    Ok(path)
}
