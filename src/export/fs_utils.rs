// src/export/fs_utils.rs

use crate::errors::{AppError, AppResult};
use crate::ui::messages::{info, warning};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::Path;

/// Verifica se un file può essere creato o sovrascritto.
///
/// - missing file, or `force` → Ok
/// - existing file on an interactive terminal → ask
/// - existing file otherwise → refuse
pub(crate) fn ensure_writable(path: &Path, force: bool) -> AppResult<()> {
    if !path.exists() || force {
        return Ok(());
    }

    warning(format!("The file '{}' already exists.", path.display()));

    let stdin = io::stdin();
    if !stdin.is_terminal() {
        return Err(AppError::Export(format!(
            "{} exists; use --force to overwrite",
            path.display()
        )));
    }

    print!("Overwrite? [y/N]: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    stdin.lock().read_line(&mut answer)?;

    if matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
        info("Existing file will be overwritten.");
        Ok(())
    } else {
        Err(AppError::Export(
            "export cancelled: existing file not overwritten".into(),
        ))
    }
}
