use crate::errors::{AppError, AppResult};
use crate::models::attendance::{DATE_FMT, TIME_FMT};
use crate::models::{
    AttachmentList, AttendanceRecord, NewAttendanceRecord, RecordKey, RecordUpdate,
};
use chrono::{Local, NaiveDate, NaiveTime};
use rusqlite::{Connection, Result, Row, ToSql, params};
use std::collections::HashSet;

const RECORD_COLUMNS: &str = "id, person, project, date, start_time, end_time, attachments";

/// Optional filters for listing attendance records.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub person: Option<String>,
    pub project: Option<String>,
}

fn conversion_error(idx: usize, err: AppError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

pub(crate) fn parse_db_date(idx: usize, s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT)
        .map_err(|_| conversion_error(idx, AppError::InvalidDate(s.to_string())))
}

pub(crate) fn parse_db_time(idx: usize, s: &str) -> Result<NaiveTime> {
    // Older rows may carry HH:MM only
    NaiveTime::parse_from_str(s, TIME_FMT)
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| conversion_error(idx, AppError::InvalidTime(s.to_string())))
}

pub fn map_record_row(row: &Row) -> Result<AttendanceRecord> {
    let date_str: String = row.get("date")?;
    let start_str: String = row.get("start_time")?;
    let end_str: String = row.get("end_time")?;
    let attachments: String = row.get("attachments")?;

    Ok(AttendanceRecord {
        id: row.get("id")?,
        person: row.get("person")?,
        project: row.get("project")?,
        date: parse_db_date(3, &date_str)?,
        start_time: parse_db_time(4, &start_str)?,
        end_time: parse_db_time(5, &end_str)?,
        attachments: AttachmentList::parse(&attachments),
    })
}

/// Records stored under `key`, lowest id first.
/// Person and project use SQLite's default BINARY collation (case-sensitive).
pub fn find_by_key(conn: &Connection, key: &RecordKey) -> AppResult<Vec<AttendanceRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM attendance_records
         WHERE person = ?1 AND project = ?2 AND date = ?3
         ORDER BY id ASC"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(
        params![key.person, key.project, key.date.format(DATE_FMT).to_string()],
        map_record_row,
    )?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn get_record(conn: &Connection, id: i64) -> AppResult<Option<AttendanceRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM attendance_records WHERE id = ?1");
    let mut stmt = conn.prepare_cached(&sql)?;
    let mut rows = stmt.query_map([id], map_record_row)?;
    match rows.next() {
        Some(r) => Ok(Some(r?)),
        None => Ok(None),
    }
}

pub fn insert_record(conn: &Connection, rec: &NewAttendanceRecord) -> AppResult<AttendanceRecord> {
    let now = Local::now().to_rfc3339();
    conn.execute(
        "INSERT INTO attendance_records
            (person, project, date, start_time, end_time, attachments, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            rec.person,
            rec.project,
            rec.date.format(DATE_FMT).to_string(),
            rec.start_time.format(TIME_FMT).to_string(),
            rec.end_time.format(TIME_FMT).to_string(),
            rec.attachments.serialized(),
            now,
        ],
    )?;

    Ok(AttendanceRecord {
        id: conn.last_insert_rowid(),
        person: rec.person.clone(),
        project: rec.project.clone(),
        date: rec.date,
        start_time: rec.start_time,
        end_time: rec.end_time,
        attachments: rec.attachments.clone(),
    })
}

pub fn update_record(conn: &Connection, upd: &RecordUpdate) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE attendance_records
         SET start_time = ?1, end_time = ?2, attachments = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            upd.start_time.format(TIME_FMT).to_string(),
            upd.end_time.format(TIME_FMT).to_string(),
            upd.attachments.serialized(),
            Local::now().to_rfc3339(),
            upd.id,
        ],
    )?;

    if changed == 0 {
        return Err(AppError::NotFound(format!("attendance record {}", upd.id)));
    }
    Ok(())
}

/// Records matching `filter`, ordered by date, person, project.
pub fn list_records(conn: &Connection, filter: &RecordFilter) -> AppResult<Vec<AttendanceRecord>> {
    let mut clauses: Vec<&str> = Vec::new();
    let mut values: Vec<String> = Vec::new();

    if let Some(from) = filter.from {
        clauses.push("date >= ?");
        values.push(from.format(DATE_FMT).to_string());
    }
    if let Some(to) = filter.to {
        clauses.push("date <= ?");
        values.push(to.format(DATE_FMT).to_string());
    }
    if let Some(p) = &filter.person {
        clauses.push("person = ?");
        values.push(p.clone());
    }
    if let Some(p) = &filter.project {
        clauses.push("project = ?");
        values.push(p.clone());
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM attendance_records {where_sql}
         ORDER BY date ASC, person ASC, project ASC, id ASC"
    );

    let params: Vec<&dyn ToSql> = values.iter().map(|s| s as &dyn ToSql).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(params), map_record_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Ids of the records whose project names a known project.
///
/// Same `LOWER` comparison as `projects::find_project_id_by_name`, so a
/// record flagged here is one registration will accept (ASCII folding only).
pub fn records_with_known_project(conn: &Connection) -> AppResult<HashSet<i64>> {
    let mut stmt = conn.prepare(
        "SELECT r.id FROM attendance_records r
         WHERE EXISTS (SELECT 1 FROM projects p WHERE LOWER(p.name) = LOWER(r.project))",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;

    let mut out = HashSet::new();
    for r in rows {
        out.insert(r?);
    }
    Ok(out)
}
