//! Directory watcher for the photo drop folder.
//!
//! Files are reported once they stopped changing: size and mtime must stay
//! the same for the whole quiescence window before a
//! [`WatchEvent::Stabilized`] is sent. Files already present when the
//! watcher first attaches are sent together as one [`WatchEvent::Backlog`],
//! and so are the files found after every reattach: nothing written while
//! the directory was unwatched is lost.
//!
//! The watcher never gives up on its own:
//! - errors from the notification backend are logged and the loop goes on
//! - a missing or unreachable directory is retried every `reattach_interval`
//! - it stops only through [`WatcherHandle::stop`]

use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::utils::path::expand_tilde;
use notify::{EventKind, PollWatcher, RecursiveMode, Watcher};
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A file finished being written.
    Stabilized(PathBuf),
    /// Files found in the directory at startup or after a reattach, sorted
    /// by name.
    Backlog(Vec<PathBuf>),
}

#[derive(Debug, Clone)]
pub struct WatcherSettings {
    pub dir: PathBuf,
    pub quiescence: Duration,
    pub poll_interval: Duration,
    pub use_polling: bool,
    pub reattach_interval: Duration,
    pub ignore: Vec<Regex>,
    pub emit_backlog: bool,
}

impl WatcherSettings {
    pub fn from_config(cfg: &Config) -> AppResult<Self> {
        let ignore = cfg
            .ignore_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| AppError::Config(format!("invalid ignore pattern '{p}': {e}")))
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            dir: expand_tilde(&cfg.watch_dir),
            quiescence: Duration::from_millis(cfg.quiescence_ms),
            poll_interval: Duration::from_millis(cfg.poll_interval_ms.max(1)),
            use_polling: cfg.use_polling,
            reattach_interval: Duration::from_millis(cfg.reattach_interval_ms.max(1)),
            ignore,
            emit_backlog: cfg.process_backlog,
        })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        is_ignored(path, &self.ignore)
    }
}

fn is_ignored(path: &Path, ignore: &[Regex]) -> bool {
    let full = path.to_string_lossy();
    ignore.iter().any(|re| re.is_match(&full))
}

/// Regular files directly inside `dir` not matching `ignore`, sorted by name.
pub fn list_candidate_files(dir: &Path, ignore: &[Regex]) -> AppResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && !is_ignored(&path, ignore) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

pub struct DirectoryWatcher;

/// Running watcher. Dropping it without `stop` leaves the task running
/// until the receiving side of the channel goes away.
pub struct WatcherHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Stop watching and wait for the background task (pending
    /// stabilizations are abandoned).
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            error!(error = %e, "watcher task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl DirectoryWatcher {
    /// Spawn the watcher on the current tokio runtime.
    pub fn start(settings: WatcherSettings, tx: mpsc::Sender<WatchEvent>) -> WatcherHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(settings, tx, cancel.clone()));
        WatcherHandle { cancel, task }
    }
}

type Backend = Box<dyn Watcher + Send>;

fn attach(settings: &WatcherSettings, raw_tx: mpsc::UnboundedSender<PathBuf>) -> AppResult<Backend> {
    if !settings.dir.is_dir() {
        return Err(AppError::NotFound(format!(
            "watch directory {}",
            settings.dir.display()
        )));
    }

    let handler = move |res: notify::Result<notify::Event>| match res {
        Ok(event) => {
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            for path in event.paths {
                // receiver gone means the watcher is shutting down
                let _ = raw_tx.send(path);
            }
        }
        Err(e) => error!(error = %e, "watch backend error"),
    };

    let mut backend: Backend = if settings.use_polling {
        let cfg = notify::Config::default().with_poll_interval(settings.quiescence / 2);
        Box::new(PollWatcher::new(handler, cfg)?)
    } else {
        Box::new(notify::recommended_watcher(handler)?)
    };

    backend.watch(&settings.dir, RecursiveMode::NonRecursive)?;
    Ok(backend)
}

async fn run(settings: WatcherSettings, tx: mpsc::Sender<WatchEvent>, cancel: CancellationToken) {
    let settings = Arc::new(settings);
    let pending: Arc<Mutex<HashSet<PathBuf>>> = Arc::default();
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<PathBuf>();
    let mut backlog_pending = settings.emit_backlog;
    let mut reattaching = false;

    'attach: loop {
        // 1️⃣ attach (or wait and retry)
        let backend = match attach(&settings, raw_tx.clone()) {
            Ok(b) => b,
            Err(e) => {
                // whatever lands there before we attach has no notification
                backlog_pending = true;
                reattaching = true;
                warn!(
                    dir = %settings.dir.display(),
                    error = %e,
                    retry_ms = settings.reattach_interval.as_millis() as u64,
                    "cannot watch directory, will retry"
                );
                tokio::select! {
                    _ = cancel.cancelled() => break 'attach,
                    _ = tokio::time::sleep(settings.reattach_interval) => continue 'attach,
                }
            }
        };
        info!(dir = %settings.dir.display(), polling = settings.use_polling, "watching directory");

        // 2️⃣ backlog: at startup if enabled, after every reattach
        if backlog_pending {
            match list_candidate_files(&settings.dir, &settings.ignore) {
                Ok(files) => {
                    info!(files = files.len(), reattach = reattaching, "directory backlog");
                    if !(reattaching && files.is_empty())
                        && tx.send(WatchEvent::Backlog(files)).await.is_err()
                    {
                        break 'attach;
                    }
                    backlog_pending = false;
                }
                Err(e) => warn!(error = %e, "cannot list directory backlog"),
            }
        }

        // 3️⃣ event loop; leave it when the directory goes away
        let mut health = tokio::time::interval(settings.reattach_interval);
        health.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break 'attach,

                Some(path) = raw_rx.recv() => {
                    if settings.is_ignored(&path) {
                        debug!(file = %path.display(), "ignored");
                        continue;
                    }
                    track(&settings, &pending, &tx, &cancel, path);
                }

                _ = health.tick() => {
                    if !settings.dir.is_dir() {
                        warn!(dir = %settings.dir.display(), "watched directory disappeared, reattaching");
                        drop(backend);
                        backlog_pending = true;
                        reattaching = true;
                        continue 'attach;
                    }
                }
            }
        }
    }

    debug!("watcher stopped");
}

/// Start stabilizing `path` unless it is already being tracked.
fn track(
    settings: &Arc<WatcherSettings>,
    pending: &Arc<Mutex<HashSet<PathBuf>>>,
    tx: &mpsc::Sender<WatchEvent>,
    cancel: &CancellationToken,
    path: PathBuf,
) {
    {
        let mut set = pending.lock().unwrap_or_else(|p| p.into_inner());
        if !set.insert(path.clone()) {
            return;
        }
    }

    let settings = Arc::clone(settings);
    let pending = Arc::clone(pending);
    let tx = tx.clone();
    let cancel = cancel.child_token();

    tokio::spawn(async move {
        let stable = wait_until_stable(&path, settings.quiescence, settings.poll_interval, &cancel).await;

        pending
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .remove(&path);

        if stable {
            debug!(file = %path.display(), "file stabilized");
            if tx.send(WatchEvent::Stabilized(path)).await.is_err() {
                debug!("watch channel closed");
            }
        }
    });
}

async fn snapshot(path: &Path) -> Option<(u64, Option<SystemTime>)> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    if !meta.is_file() {
        return None;
    }
    Some((meta.len(), meta.modified().ok()))
}

/// True once size and mtime stayed unchanged for `quiescence`. False if the
/// file disappears or the watcher is stopped first.
async fn wait_until_stable(
    path: &Path,
    quiescence: Duration,
    poll: Duration,
    cancel: &CancellationToken,
) -> bool {
    let Some(mut last) = snapshot(path).await else {
        return false;
    };
    let mut since = Instant::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return false,
            _ = tokio::time::sleep(poll) => {}
        }

        match snapshot(path).await {
            None => return false,
            Some(now) if now == last => {
                if since.elapsed() >= quiescence {
                    return true;
                }
            }
            Some(now) => {
                last = now;
                since = Instant::now();
            }
        }
    }
}
