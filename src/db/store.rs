//! Persistence gateway used by the ingestion pipeline and activity
//! registration.
//!
//! The trait is synchronous: callers on the async side wrap each call in
//! `spawn_blocking`. Implementations must be safe to share between tasks.

use crate::core::reconcile::{Applied, reconcile_and_write};
use crate::db::activities::register_in_tx;
use crate::db::log::ttlog;
use crate::db::pool::DbPool;
use crate::db::projects::find_project_id_by_name;
use crate::db::queries::{self, RecordFilter};
use crate::errors::AppResult;
use crate::models::activity::{ActivityRegistration, RegistrationOutcome};
use crate::models::{
    AttendanceEvent, AttendanceRecord, NewAttendanceRecord, RecordKey, RecordUpdate,
};
use rusqlite::TransactionBehavior;

pub trait AttendanceStore: Send + Sync {
    /// Every record stored under `key`, lowest id first.
    fn find_by_key(&self, key: &RecordKey) -> AppResult<Vec<AttendanceRecord>>;

    fn create_record(&self, rec: &NewAttendanceRecord) -> AppResult<AttendanceRecord>;

    fn update_record(&self, upd: &RecordUpdate) -> AppResult<()>;

    /// Read the records of the event's key, reconcile and write.
    ///
    /// Stores shared between processes override this so the read and the
    /// write happen under one lock.
    fn reconcile_event(&self, event: &AttendanceEvent, limit: usize) -> AppResult<Applied> {
        let existing = self.find_by_key(&event.key())?;
        reconcile_and_write(
            event,
            &existing,
            limit,
            |new| self.create_record(new),
            |upd| self.update_record(upd),
        )
    }

    /// Case-insensitive project lookup.
    fn find_project_by_name(&self, name: &str) -> AppResult<Option<i64>>;

    fn list_records(&self, filter: &RecordFilter) -> AppResult<Vec<AttendanceRecord>>;

    /// Project lookup, activity match and write, all in one transaction.
    fn register_activity(&self, reg: &ActivityRegistration) -> AppResult<RegistrationOutcome>;

    /// Append a line to the operation log. Stores without one ignore it.
    fn audit(&self, _operation: &str, _target: &str, _message: &str) -> AppResult<()> {
        Ok(())
    }
}

/// SQLite-backed store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AttendanceStore for SqliteStore {
    fn find_by_key(&self, key: &RecordKey) -> AppResult<Vec<AttendanceRecord>> {
        self.pool.with_conn(|conn| queries::find_by_key(conn, key))
    }

    fn create_record(&self, rec: &NewAttendanceRecord) -> AppResult<AttendanceRecord> {
        self.pool.with_conn(|conn| queries::insert_record(conn, rec))
    }

    fn update_record(&self, upd: &RecordUpdate) -> AppResult<()> {
        self.pool.with_conn(|conn| queries::update_record(conn, upd))
    }

    fn reconcile_event(&self, event: &AttendanceEvent, limit: usize) -> AppResult<Applied> {
        self.pool.with_conn(|conn| {
            // write lock first: another process on the same file waits here
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let existing = queries::find_by_key(&tx, &event.key())?;
            let applied = reconcile_and_write(
                event,
                &existing,
                limit,
                |new| queries::insert_record(&tx, new),
                |upd| queries::update_record(&tx, upd),
            )?;
            tx.commit()?;
            Ok(applied)
        })
    }

    fn find_project_by_name(&self, name: &str) -> AppResult<Option<i64>> {
        self.pool
            .with_conn(|conn| find_project_id_by_name(conn, name))
    }

    fn list_records(&self, filter: &RecordFilter) -> AppResult<Vec<AttendanceRecord>> {
        self.pool.with_conn(|conn| queries::list_records(conn, filter))
    }

    fn register_activity(&self, reg: &ActivityRegistration) -> AppResult<RegistrationOutcome> {
        self.pool.with_conn(|conn| {
            let tx = conn.transaction()?;
            let outcome = register_in_tx(&tx, reg)?;
            tx.commit()?;
            Ok(outcome)
        })
    }

    fn audit(&self, operation: &str, target: &str, message: &str) -> AppResult<()> {
        self.pool
            .with_conn(|conn| ttlog(conn, operation, target, message))
    }
}
