use crate::cli::commands::open_pool;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::errors::AppResult;
use crate::export::ExportLogic;

/// Handle `export` and `report`.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    match cmd {
        Commands::Export {
            format,
            file,
            range,
            force,
        } => {
            let pool = open_pool(cfg)?;
            ExportLogic::export(&pool, *format, file, range.as_deref(), *force)?;
        }
        Commands::Report {
            project,
            file,
            force,
        } => {
            let pool = open_pool(cfg)?;
            ExportLogic::project_report(&pool, *project, file, *force)?;
        }
        _ => {}
    }
    Ok(())
}
