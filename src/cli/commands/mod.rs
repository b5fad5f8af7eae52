pub mod config;
pub mod export;
pub mod init;
pub mod list;
pub mod log;
pub mod project;
pub mod scan;
pub mod serve;

use crate::config::Config;
use crate::db::DbPool;
use crate::errors::AppResult;
use crate::utils::path::expand_tilde;

/// Open the configured database (creating and migrating it if needed).
pub(crate) fn open_pool(cfg: &Config) -> AppResult<DbPool> {
    DbPool::open(&expand_tilde(&cfg.database).to_string_lossy())
}

/// Multi-threaded runtime for the async commands (serve, scan).
pub(crate) fn runtime() -> AppResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}
