//! Timestamped, human-readable log lines.
//!
//! The daemon's user-visible record is a plain text file of
//! `[YYYY-MM-DD HH:MM:SS] <message>` lines. Update cycles additionally
//! mirror every line to stdout. Write failures must never abort a cycle,
//! so they are downgraded to tracing warnings.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

/// Appender for the `[timestamp] message` log format.
#[derive(Debug)]
pub struct CycleLog {
    file: Option<PathBuf>,
    mirror_stdout: bool,
}

impl CycleLog {
    pub fn new(file: Option<PathBuf>, mirror_stdout: bool) -> Self {
        Self {
            file,
            mirror_stdout,
        }
    }

    /// Append one timestamped line.
    pub fn line(&self, message: &str) {
        let stamped = format!(
            "[{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            message
        );
        if self.mirror_stdout {
            println!("{stamped}");
        }
        if let Some(path) = &self.file {
            if let Err(err) = append_line(path, &stamped) {
                tracing::warn!("Failed to write log line to {}: {err}", path.display());
            }
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}
