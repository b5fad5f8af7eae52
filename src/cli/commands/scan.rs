use crate::cli::commands::{open_pool, runtime};
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::{IngestOutcome, IngestSettings, Ingestor};
use crate::db::SqliteStore;
use crate::errors::AppResult;
use crate::ui::messages::{info, success, warning};
use crate::utils::path::expand_tilde;
use crate::utils::table::Table;
use crate::watcher::WatcherSettings;
use crate::watcher::list_candidate_files;
use std::sync::Arc;

/// Handle the `scan` command: one batch over the folder, then exit.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Scan { dir } = cmd else {
        return Ok(());
    };

    let dir = expand_tilde(dir.as_deref().unwrap_or(&cfg.watch_dir));
    let ignore = WatcherSettings::from_config(cfg)?.ignore;
    let files = list_candidate_files(&dir, &ignore)?;

    if files.is_empty() {
        warning(format!("No files in {}", dir.display()));
        return Ok(());
    }
    info(format!("Scanning {} file(s) in {}", files.len(), dir.display()));

    let pool = open_pool(cfg)?;
    let ingestor = Arc::new(Ingestor::new(
        Arc::new(SqliteStore::new(pool)),
        IngestSettings::from(cfg),
    ));

    let report = runtime()?.block_on(ingestor.ingest_batch(files));

    let mut table = Table::new(["File", "Result", "Record", "Detail"]);
    for o in &report.outcomes {
        let (result, detail) = match o {
            IngestOutcome::Created { .. } => ("created", String::new()),
            IngestOutcome::Updated { .. } => ("updated", String::new()),
            IngestOutcome::Unchanged { .. } => ("unchanged", String::new()),
            IngestOutcome::Rejected { reason, .. } => ("rejected", reason.clone()),
            IngestOutcome::Failed { error, .. } => ("failed", error.clone()),
        };
        table.add_row(vec![
            o.file().to_string(),
            result.to_string(),
            o.record_id().map(|id| id.to_string()).unwrap_or_default(),
            detail,
        ]);
    }
    print!("{}", table.render());

    let summary = format!(
        "{} file(s): {} created, {} updated, {} unchanged, {} rejected, {} failed",
        report.total, report.created, report.updated, report.unchanged, report.rejected, report.failed
    );
    if report.failed > 0 {
        warning(summary);
    } else {
        success(summary);
    }
    Ok(())
}
