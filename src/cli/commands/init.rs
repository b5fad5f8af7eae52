use crate::cli::commands::open_pool;
use crate::cli::parser::Cli;
use crate::config::Config;
use crate::db::log;
use crate::errors::AppResult;
use crate::ui::messages::{info, success, warning};
use std::path::Path;

/// Handle the `init` command
///
/// This initializes:
///  - the configuration file (skipped in test mode)
///  - the watched folder and the uploads folder
///  - the SQLite database and all pending migrations
pub fn handle(cli: &Cli, cfg: &Config, config_path: &Path) -> AppResult<()> {
    info("Initializing rPhotoPunch…");

    // 1️⃣ config + folders
    let created = cfg.init_all(config_path, cli.test)?;
    for p in &created {
        info(format!("  {}", p.display()));
    }

    // 2️⃣ DB (tabelle + migrazioni)
    let pool = open_pool(cfg)?;

    // 3️⃣ log interno (non bloccante)
    if let Err(e) = pool.with_conn(|conn| {
        log::ttlog(
            conn,
            "init",
            "database",
            &format!("Database initialized at {}", cfg.database),
        )
    }) {
        warning(format!("Failed to write internal log: {e}"));
    }

    success(format!("Database initialized at {}", cfg.database));
    success(format!("Watching folder: {}", cfg.watch_dir));
    Ok(())
}
