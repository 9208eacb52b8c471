use colored::Colorize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::changes::FileChange;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write output file: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Failed to serialize changes: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Pretty JSON array of changes, the same shape the model was asked for.
pub fn render_json(changes: &[FileChange]) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(changes)?)
}

/// Emit validated changes to stdout (default) or to `output_path`.
#[instrument(skip(changes), fields(changes = changes.len()))]
pub fn output(changes: &[FileChange], output_path: Option<&Path>) -> Result<(), ReportError> {
    let json = render_json(changes)?;
    match output_path {
        None => {
            debug!("writing changes to stdout");
            println!("{json}");
        }
        Some(path) => {
            debug!(path = %path.display(), "writing changes to file");
            std::fs::write(path, format!("{json}\n"))?;
        }
    }
    Ok(())
}

/// Terminal summary after `--apply`.
pub fn print_applied(changes: &[FileChange], written: &[PathBuf]) {
    println!();
    print!("{}", format_applied(changes, written));
    println!();
}

fn format_applied(changes: &[FileChange], written: &[PathBuf]) -> String {
    let mut summary = format!(
        "{}\n",
        format!("Applied {} file change(s):", written.len()).as_str().bold()
    );
    for (change, path) in changes.iter().zip(written) {
        let marker = if change.content.is_empty() {
            "~".yellow()
        } else {
            "+".green()
        };
        summary.push_str(&format!(
            "  {} {} ({} bytes)\n",
            marker,
            path.display(),
            change.content.len()
        ));
    }
    summary
}
