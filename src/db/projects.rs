use crate::db::queries::parse_db_date;
use crate::errors::{AppError, AppResult};
use crate::models::attendance::DATE_FMT;
use crate::models::project::{NewProject, Project, ProjectStatusUpdate};
use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

const PROJECT_COLUMNS: &str =
    "id, name, company, owner, deadline, estimated_hours, layout, status, observation, created_at";

fn map_project_row(row: &Row) -> Result<Project> {
    let deadline: Option<String> = row.get("deadline")?;
    let deadline = match deadline.as_deref() {
        Some(s) if !s.is_empty() => Some(parse_db_date(4, s)?),
        _ => None,
    };

    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        company: row.get("company")?,
        owner: row.get("owner")?,
        deadline,
        estimated_hours: row.get("estimated_hours")?,
        layout: row.get("layout")?,
        status: row.get("status")?,
        observation: row.get("observation")?,
        created_at: row.get("created_at")?,
    })
}

/// "120h", "120 horas" → 120. Empty or digit-less input gives None.
fn digits_only(raw: &str) -> Option<i64> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

pub fn insert_project(conn: &Connection, p: &NewProject) -> AppResult<i64> {
    let name = p.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("project name is required".into()));
    }

    let deadline = match p.deadline.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Some(
            NaiveDate::parse_from_str(s, DATE_FMT)
                .map_err(|_| AppError::InvalidDate(s.to_string()))?,
        ),
        _ => None,
    };

    conn.execute(
        "INSERT INTO projects (name, company, owner, deadline, estimated_hours, layout, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            name,
            p.company,
            p.owner,
            deadline.map(|d| d.format(DATE_FMT).to_string()),
            p.estimated_hours.as_deref().and_then(digits_only),
            p.layout,
            Local::now().to_rfc3339(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

pub fn list_projects(conn: &Connection) -> AppResult<Vec<Project>> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id ASC");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], map_project_row)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn get_project(conn: &Connection, id: i64) -> AppResult<Option<Project>> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], map_project_row).optional()?)
}

/// Case-insensitive lookup by name. The lowest id wins on duplicates.
pub fn find_project_id_by_name(conn: &Connection, name: &str) -> AppResult<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM projects WHERE LOWER(name) = LOWER(?1) ORDER BY id ASC LIMIT 1",
            [name],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn update_project_status(
    conn: &Connection,
    id: i64,
    upd: &ProjectStatusUpdate,
) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE projects SET status = ?1, observation = ?2 WHERE id = ?3",
        params![upd.status, upd.observation, id],
    )?;

    if changed == 0 {
        return Err(AppError::NotFound(format!("project {id}")));
    }
    Ok(())
}
