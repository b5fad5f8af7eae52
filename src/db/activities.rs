use crate::db::projects::find_project_id_by_name;
use crate::db::queries::{parse_db_date, parse_db_time};
use crate::errors::{AppError, AppResult};
use crate::models::AttachmentList;
use crate::models::activity::{ActivityDraft, ActivityLog, ActivityRegistration, RegistrationOutcome};
use crate::models::attendance::{DATE_FMT, TIME_FMT};
use chrono::{Local, NaiveTime};
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

const ACTIVITY_COLUMNS: &str = "id, description, activity_date, people_count, start_time, end_time, owner, project_id, attachments, created_at";

fn opt_time(idx: usize, raw: Option<String>) -> Result<Option<NaiveTime>> {
    match raw.as_deref() {
        Some(s) if !s.is_empty() => Ok(Some(parse_db_time(idx, s)?)),
        _ => Ok(None),
    }
}

fn map_activity_row(row: &Row) -> Result<ActivityLog> {
    let date_str: String = row.get("activity_date")?;
    let attachments: String = row.get("attachments")?;

    Ok(ActivityLog {
        id: row.get("id")?,
        description: row.get("description")?,
        activity_date: parse_db_date(2, &date_str)?,
        people_count: row.get("people_count")?,
        start_time: opt_time(4, row.get("start_time")?)?,
        end_time: opt_time(5, row.get("end_time")?)?,
        owner: row.get("owner")?,
        project_id: row.get("project_id")?,
        attachments: AttachmentList::parse(&attachments),
        created_at: row.get("created_at")?,
    })
}

fn fmt_time(t: Option<NaiveTime>) -> Option<String> {
    t.map(|t| t.format(TIME_FMT).to_string())
}

pub fn insert_activity(conn: &Connection, a: &ActivityDraft) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO activity_logs
            (description, activity_date, people_count, start_time, end_time, owner, project_id, attachments, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            a.description,
            a.activity_date.format(DATE_FMT).to_string(),
            a.people_count,
            fmt_time(a.start_time),
            fmt_time(a.end_time),
            a.owner,
            a.project_id,
            a.attachments.serialized(),
            Local::now().to_rfc3339(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_activity(conn: &Connection, id: i64) -> AppResult<Option<ActivityLog>> {
    let sql = format!("SELECT {ACTIVITY_COLUMNS} FROM activity_logs WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_activity_row).optional()?)
}

/// Activities whose own id or project id equals `id`.
pub fn list_activities_for_project(conn: &Connection, id: i64) -> AppResult<Vec<ActivityLog>> {
    let sql = format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activity_logs
         WHERE id = ?1 OR project_id = ?1
         ORDER BY activity_date ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([id], map_activity_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Activities of one project only (no id match), for reports.
pub fn activities_of_project(conn: &Connection, project_id: i64) -> AppResult<Vec<ActivityLog>> {
    let sql = format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activity_logs
         WHERE project_id = ?1
         ORDER BY activity_date ASC, start_time ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([project_id], map_activity_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

/// Body of the "register activity" transaction. Must run inside a
/// transaction owned by the caller: any error leaves nothing behind once the
/// caller drops it without committing.
///
/// 1. resolve the project (case-insensitive) or fail with `ProjectNotFound`
/// 2. look for an activity of the same person (case-insensitive), date and project
/// 3. widen its interval / merge attachments, or insert a new row
pub fn register_in_tx(conn: &Connection, reg: &ActivityRegistration) -> AppResult<RegistrationOutcome> {
    let project_id = find_project_id_by_name(conn, &reg.project)?
        .ok_or_else(|| AppError::ProjectNotFound(reg.project.clone()))?;

    let sql = format!(
        "SELECT {ACTIVITY_COLUMNS} FROM activity_logs
         WHERE LOWER(owner) = LOWER(?1) AND activity_date = ?2 AND project_id = ?3
         ORDER BY id ASC"
    );
    let existing: Vec<ActivityLog> = {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![reg.person, reg.date.format(DATE_FMT).to_string(), project_id],
            map_activity_row,
        )?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        out
    };

    let Some(target) = existing.first() else {
        let id = insert_activity(
            conn,
            &ActivityDraft {
                description: format!("Attendance = {}", reg.person),
                activity_date: reg.date,
                people_count: Some(1),
                start_time: Some(reg.start_time),
                end_time: Some(reg.end_time),
                owner: reg.person.clone(),
                project_id: Some(project_id),
                attachments: reg.attachments.clone(),
            },
        )?;
        return Ok(RegistrationOutcome::Created(id));
    };

    let (start, end) = existing
        .iter()
        .flat_map(|a| [a.start_time, a.end_time])
        .flatten()
        .fold((reg.start_time, reg.end_time), |(lo, hi), t| {
            (lo.min(t), hi.max(t))
        });
    let attachments = target.attachments.union(&reg.attachments);

    if target.start_time == Some(start)
        && target.end_time == Some(end)
        && target.attachments == attachments
    {
        return Ok(RegistrationOutcome::Unchanged(target.id));
    }

    conn.execute(
        "UPDATE activity_logs SET start_time = ?1, end_time = ?2, attachments = ?3 WHERE id = ?4",
        params![
            start.format(TIME_FMT).to_string(),
            end.format(TIME_FMT).to_string(),
            attachments.serialized(),
            target.id,
        ],
    )?;

    Ok(RegistrationOutcome::Updated(target.id))
}
