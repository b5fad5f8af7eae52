//! HTTP surface and service wiring.
//!
//! `run` owns the whole service lifetime: database, ingestor, directory
//! watcher, the dispatcher between watcher and ingestor, and the axum server.
//! Ctrl-C stops the server first, then the watcher, then drains the
//! dispatcher.

pub mod error;
pub mod routes;

use crate::config::Config;
use crate::core::{BatchReport, IngestSettings, Ingestor};
use crate::db::{DbPool, SqliteStore};
use crate::errors::{AppError, AppResult};
use crate::utils::path::expand_tilde;
use crate::watcher::{DirectoryWatcher, WatchEvent, WatcherSettings, list_candidate_files};
use axum::Router;
use axum::routing::{get, post, put};
use error::ApiError;
use regex::Regex;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub ingestor: Arc<Ingestor>,
    pub config: Arc<Config>,
    pub watch_dir: PathBuf,
    pub uploads_dir: PathBuf,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        let store = Arc::new(SqliteStore::new(pool.clone()));
        let ingestor = Arc::new(Ingestor::new(store, IngestSettings::from(&config)));
        Self {
            watch_dir: expand_tilde(&config.watch_dir),
            uploads_dir: expand_tilde(&config.uploads_dir),
            pool,
            ingestor,
            config: Arc::new(config),
        }
    }
}

/// Run `f` against the shared connection on the blocking pool.
pub(crate) async fn blocking<T, F>(pool: &DbPool, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut Connection) -> AppResult<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || pool.with_conn(f))
        .await
        .map_err(|e| AppError::Other(format!("database task aborted: {e}")))?
        .map_err(ApiError::from)
}

/// Ingest every candidate file currently in the watch directory.
pub(crate) async fn rescan(state: &AppState) -> AppResult<BatchReport> {
    let ignore = state
        .config
        .ignore_patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect::<Vec<_>>();

    let dir = state.watch_dir.clone();
    let files = tokio::task::spawn_blocking(move || list_candidate_files(&dir, &ignore))
        .await
        .map_err(|e| AppError::Other(format!("scan task aborted: {e}")))??;

    info!(dir = %state.watch_dir.display(), files = files.len(), "rescan");
    Ok(state.ingestor.ingest_batch(files).await)
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/attendance", get(routes::list_attendance))
        .route("/api/attendance/rescan", post(routes::rescan_attendance))
        .route("/api/activities", post(routes::create_activity))
        .route("/api/activities/register", post(routes::register_activity))
        .route("/api/activities/project/:id", get(routes::activities_for_project))
        .route("/api/activities/:id/attachments", get(routes::activity_attachments))
        .route("/api/projects", get(routes::projects_list).post(routes::projects_create))
        .route("/api/projects/:id", put(routes::projects_update_status))
        .route("/api/projects/:id/observation", get(routes::project_observation))
        .route("/api/reports/projects/:id/pdf", get(routes::project_report_pdf))
        .route("/files/photos/*path", get(routes::photo_file))
        .route("/files/uploads/*path", get(routes::upload_file))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Feed watcher events to the ingestor until the channel closes.
async fn dispatch(ingestor: Arc<Ingestor>, mut rx: mpsc::Receiver<WatchEvent>) {
    let mut inflight = JoinSet::new();

    while let Some(ev) = rx.recv().await {
        match ev {
            WatchEvent::Stabilized(path) => {
                let ing = Arc::clone(&ingestor);
                inflight.spawn(async move {
                    ing.ingest_path(&path).await;
                });
            }
            WatchEvent::Backlog(paths) => {
                let ing = Arc::clone(&ingestor);
                inflight.spawn(async move {
                    ing.ingest_batch(paths).await;
                });
            }
        }

        // reap finished tasks so the set does not grow forever
        while let Some(res) = inflight.try_join_next() {
            if let Err(e) = res {
                error!(error = %e, "ingest task aborted");
            }
        }
    }

    while let Some(res) = inflight.join_next().await {
        if let Err(e) = res {
            error!(error = %e, "ingest task aborted");
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// Start watcher, dispatcher and HTTP server; return after a clean shutdown.
pub async fn run(config: Config) -> AppResult<()> {
    config.validate()?;

    let db_path = expand_tilde(&config.database).to_string_lossy().to_string();
    let pool = tokio::task::spawn_blocking(move || DbPool::open(&db_path))
        .await
        .map_err(|e| AppError::Other(format!("database open aborted: {e}")))??;

    let watcher_settings = WatcherSettings::from_config(&config)?;
    let bind = config.bind.clone();
    let state = AppState::new(pool, config);

    let (tx, rx) = mpsc::channel::<WatchEvent>(256);
    let watcher = DirectoryWatcher::start(watcher_settings, tx);
    let dispatcher = tokio::spawn(dispatch(Arc::clone(&state.ingestor), rx));

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(bind = %bind, "HTTP server listening");

    let served = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    watcher.stop().await;
    if let Err(e) = dispatcher.await {
        error!(error = %e, "dispatcher ended abnormally");
    }

    served?;
    info!("service stopped");
    Ok(())
}
