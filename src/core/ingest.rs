//! Ingestion pipeline: parsed events → reconciled records.
//!
//! - one event at a time per key (see `core::keylock`)
//! - blocking store calls run on the blocking pool
//! - transient store errors are retried with a linear backoff
//! - batches fan out per key, bounded by `max_parallel_keys`

use crate::config::Config;
use crate::core::keylock::KeyLocks;
use crate::core::parser::parse_path;
use crate::core::reconcile::Applied;
use crate::db::AttendanceStore;
use crate::errors::{AppError, AppResult};
use crate::models::{AttendanceEvent, RecordKey};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub attachment_limit: usize,
    pub retry: RetryPolicy,
    pub max_parallel_keys: usize,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            attachment_limit: 500,
            retry: RetryPolicy::default(),
            max_parallel_keys: 8,
        }
    }
}

impl From<&Config> for IngestSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            attachment_limit: cfg.attachment_limit,
            retry: RetryPolicy {
                max_retries: cfg.max_retries,
                backoff: Duration::from_millis(cfg.retry_backoff_ms),
            },
            max_parallel_keys: cfg.max_parallel_keys.max(1),
        }
    }
}

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IngestOutcome {
    Created { file: String, record_id: i64 },
    Updated { file: String, record_id: i64 },
    /// The record already reflected this file.
    Unchanged { file: String, record_id: i64 },
    /// Bad filename or attachment list overflow. Nothing was written.
    Rejected { file: String, reason: String },
    /// Store error (permanent, or transient past the retry bound).
    Failed { file: String, error: String },
}

impl IngestOutcome {
    pub fn file(&self) -> &str {
        match self {
            IngestOutcome::Created { file, .. }
            | IngestOutcome::Updated { file, .. }
            | IngestOutcome::Unchanged { file, .. }
            | IngestOutcome::Rejected { file, .. }
            | IngestOutcome::Failed { file, .. } => file,
        }
    }

    pub fn record_id(&self) -> Option<i64> {
        match self {
            IngestOutcome::Created { record_id, .. }
            | IngestOutcome::Updated { record_id, .. }
            | IngestOutcome::Unchanged { record_id, .. } => Some(*record_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub rejected: usize,
    pub failed: usize,
    pub outcomes: Vec<IngestOutcome>,
}

impl BatchReport {
    pub fn from_outcomes(mut outcomes: Vec<IngestOutcome>) -> Self {
        outcomes.sort_by(|a, b| a.file().cmp(b.file()));

        let mut report = BatchReport {
            total: outcomes.len(),
            ..Default::default()
        };
        for o in &outcomes {
            match o {
                IngestOutcome::Created { .. } => report.created += 1,
                IngestOutcome::Updated { .. } => report.updated += 1,
                IngestOutcome::Unchanged { .. } => report.unchanged += 1,
                IngestOutcome::Rejected { .. } => report.rejected += 1,
                IngestOutcome::Failed { .. } => report.failed += 1,
            }
        }
        report.outcomes = outcomes;
        report
    }
}

pub struct Ingestor {
    store: Arc<dyn AttendanceStore>,
    locks: KeyLocks,
    settings: IngestSettings,
}

impl Ingestor {
    pub fn new(store: Arc<dyn AttendanceStore>, settings: IngestSettings) -> Self {
        Self {
            store,
            locks: KeyLocks::new(),
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn AttendanceStore> {
        &self.store
    }

    /// Parse the file name of `path` and ingest it.
    pub async fn ingest_path(&self, path: &Path) -> IngestOutcome {
        match parse_path(path) {
            Ok(event) => self.ingest_event(event).await,
            Err(rejection) => {
                let file = display_name(path);
                warn!(file = %file, reason = %rejection, "filename rejected");
                IngestOutcome::Rejected {
                    file,
                    reason: rejection.to_string(),
                }
            }
        }
    }

    /// Reconcile one event against the store, holding its key for the whole
    /// read → decide → write sequence. The key lock covers this process only;
    /// the store's `reconcile_event` keeps other processes out.
    pub async fn ingest_event(&self, event: AttendanceEvent) -> IngestOutcome {
        let key = event.key();
        let _guard = self.locks.lock(&key).await;

        let policy = self.settings.retry;
        let mut attempt = 0;

        loop {
            match self.apply_once(&event).await {
                Ok(outcome) => return outcome,
                Err(e) if e.is_transient() && attempt < policy.max_retries => {
                    attempt += 1;
                    let delay = policy.delay(attempt);
                    warn!(
                        file = %event.attachment_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient store error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(file = %event.attachment_name, key = %key, error = %e, "ingest failed");
                    return IngestOutcome::Failed {
                        file: event.attachment_name.clone(),
                        error: e.to_string(),
                    };
                }
            }
        }
    }

    async fn apply_once(&self, event: &AttendanceEvent) -> AppResult<IngestOutcome> {
        let store = Arc::clone(&self.store);
        let event = event.clone();
        let limit = self.settings.attachment_limit;

        tokio::task::spawn_blocking(move || apply_blocking(store.as_ref(), &event, limit))
            .await
            .map_err(|e| AppError::Other(format!("ingest task aborted: {e}")))?
    }

    /// Ingest many files at once (startup backlog, rescan).
    ///
    /// Files are parsed first; events are grouped by key, keys run in
    /// parallel, and within a key events are applied in (time, file name)
    /// order. Every input path ends up in the report exactly once.
    pub async fn ingest_batch(self: &Arc<Self>, paths: Vec<PathBuf>) -> BatchReport {
        let mut outcomes = Vec::with_capacity(paths.len());
        let mut groups: BTreeMap<RecordKey, Vec<AttendanceEvent>> = BTreeMap::new();

        for path in &paths {
            match parse_path(path) {
                Ok(ev) => groups.entry(ev.key()).or_default().push(ev),
                Err(rejection) => {
                    let file = display_name(path);
                    warn!(file = %file, reason = %rejection, "filename rejected");
                    outcomes.push(IngestOutcome::Rejected {
                        file,
                        reason: rejection.to_string(),
                    });
                }
            }
        }

        info!(files = paths.len(), keys = groups.len(), "batch started");

        let permits = Arc::new(Semaphore::new(self.settings.max_parallel_keys.max(1)));
        let mut tasks = JoinSet::new();

        for (key, mut events) in groups {
            events.sort_by(|a, b| {
                a.time
                    .cmp(&b.time)
                    .then_with(|| a.attachment_name.cmp(&b.attachment_name))
            });

            let this = Arc::clone(self);
            let permits = Arc::clone(&permits);

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await;
                debug!(key = %key, events = events.len(), "processing key");

                let mut done = Vec::with_capacity(events.len());
                for ev in events {
                    done.push(this.ingest_event(ev).await);
                }
                done
            });
        }

        while let Some(res) = tasks.join_next().await {
            match res {
                Ok(done) => outcomes.extend(done),
                Err(e) => error!(error = %e, "batch task aborted"),
            }
        }

        let report = BatchReport::from_outcomes(outcomes);
        info!(
            total = report.total,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            rejected = report.rejected,
            failed = report.failed,
            "batch finished"
        );
        report
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Best-effort line in the operation log.
fn audit(store: &dyn AttendanceStore, operation: &str, target: &str, message: &str) {
    if let Err(e) = store.audit(operation, target, message) {
        warn!(operation, target, error = %e, "could not write operation log");
    }
}

/// One read → decide → write pass. Runs on the blocking pool.
fn apply_blocking(
    store: &dyn AttendanceStore,
    event: &AttendanceEvent,
    limit: usize,
) -> AppResult<IngestOutcome> {
    let file = event.attachment_name.clone();
    let key = event.key();

    match store.reconcile_event(event, limit)? {
        Applied::Created(rec) => {
            info!(file = %file, record_id = rec.id, key = %key, "attendance record created");
            audit(
                store,
                "ingest_create",
                &rec.id.to_string(),
                &format!("{key} {} from {file}", event.time_str()),
            );
            Ok(IngestOutcome::Created {
                file,
                record_id: rec.id,
            })
        }

        Applied::Unchanged(upd) => {
            debug!(file = %file, record_id = upd.id, "record already up to date");
            Ok(IngestOutcome::Unchanged {
                file,
                record_id: upd.id,
            })
        }

        Applied::Updated(upd) => {
            if !upd.conflicting_ids.is_empty() {
                warn!(
                    key = %key,
                    target = upd.id,
                    others = ?upd.conflicting_ids,
                    "several records share one key, updated the oldest"
                );
            }
            info!(
                file = %file,
                record_id = upd.id,
                start = %upd.start_time,
                end = %upd.end_time,
                "attendance record updated"
            );
            audit(
                store,
                "ingest_update",
                &upd.id.to_string(),
                &format!(
                    "{key} {}-{} from {file}",
                    upd.start_time.format("%H:%M:%S"),
                    upd.end_time.format("%H:%M:%S")
                ),
            );
            Ok(IngestOutcome::Updated {
                file,
                record_id: upd.id,
            })
        }

        Applied::Rejected(rejection) => {
            warn!(file = %file, key = %key, reason = %rejection, "merge rejected");
            audit(store, "ingest_rejected", &file, &rejection.to_string());
            Ok(IngestOutcome::Rejected {
                file,
                reason: rejection.to_string(),
            })
        }
    }
}
