use crate::core::activity::{register, validate_new_activity};
use crate::core::BatchReport;
use crate::db::activities::{activities_of_project, get_activity, insert_activity, list_activities_for_project};
use crate::db::projects::{get_project, insert_project, list_projects, update_project_status};
use crate::db::queries::{RecordFilter, list_records, records_with_known_project};
use crate::errors::AppError;
use crate::export::render_project_report;
use crate::models::activity::{ActivityLog, NewActivity, RegisterActivityRequest, RegistrationOutcome};
use crate::models::attendance::TIME_FMT;
use crate::models::project::{NewProject, Project, ProjectStatusUpdate};
use crate::models::AttachmentList;
use crate::server::error::{ApiError, ApiResult};
use crate::server::{AppState, blocking, rescan};
use crate::utils::date::format_display_date;
use crate::utils::path::activity_file_url;
use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::{Component, PathBuf};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

// ---------------------------
// Attendance
// ---------------------------

#[derive(Debug, Serialize)]
pub struct AttendanceView {
    pub id: i64,
    pub person: String,
    pub project: String,
    /// DD-MM-YYYY
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub attachments: AttachmentList,
    /// The project name matches a known project, compared the way
    /// registration looks it up.
    pub project_valid: bool,
}

pub async fn list_attendance(State(state): State<AppState>) -> ApiResult<Json<Vec<AttendanceView>>> {
    let (records, known) = blocking(&state.pool, |conn| {
        let records = list_records(conn, &RecordFilter::default())?;
        let known = records_with_known_project(conn)?;
        Ok((records, known))
    })
    .await?;

    let views = records
        .into_iter()
        .map(|r| AttendanceView {
            project_valid: known.contains(&r.id),
            id: r.id,
            date: format_display_date(r.date),
            start_time: r.start_time.format(TIME_FMT).to_string(),
            end_time: r.end_time.format(TIME_FMT).to_string(),
            person: r.person,
            project: r.project,
            attachments: r.attachments,
        })
        .collect();

    Ok(Json(views))
}

pub async fn rescan_attendance(State(state): State<AppState>) -> ApiResult<Json<BatchReport>> {
    Ok(Json(rescan(&state).await?))
}

// ---------------------------
// Activities
// ---------------------------

pub async fn register_activity(
    State(state): State<AppState>,
    Json(req): Json<RegisterActivityRequest>,
) -> ApiResult<(StatusCode, Json<RegistrationOutcome>)> {
    let outcome = register(state.ingestor.store().clone(), req).await?;
    let status = match outcome {
        RegistrationOutcome::Created(_) => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}

pub async fn create_activity(
    State(state): State<AppState>,
    Json(body): Json<NewActivity>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let draft = validate_new_activity(&body)?;
    let id = blocking(&state.pool, move |conn| insert_activity(conn, &draft)).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[derive(Debug, Serialize)]
pub struct ActivityWithFiles {
    #[serde(flatten)]
    pub activity: ActivityLog,
    pub file_urls: Vec<String>,
}

fn with_files(base: &str, activity: ActivityLog) -> ActivityWithFiles {
    let file_urls = activity
        .attachments
        .iter()
        .map(|f| activity_file_url(base, activity.activity_date, f))
        .collect();
    ActivityWithFiles { activity, file_urls }
}

pub async fn activities_for_project(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<ActivityWithFiles>>> {
    let activities = blocking(&state.pool, move |conn| list_activities_for_project(conn, id)).await?;
    if activities.is_empty() {
        return Err(AppError::NotFound(format!("activities for project or id {id}")).into());
    }

    let base = state.config.public_base_url.clone();
    Ok(Json(activities.into_iter().map(|a| with_files(&base, a)).collect()))
}

#[derive(Debug, Serialize)]
pub struct AttachmentLink {
    pub name: String,
    pub url: String,
}

pub async fn activity_attachments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let activity = blocking(&state.pool, move |conn| get_activity(conn, id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("activity {id}")))?;

    let base = &state.config.public_base_url;
    let links: Vec<AttachmentLink> = activity
        .attachments
        .iter()
        .map(|name| AttachmentLink {
            name: name.to_string(),
            url: activity_file_url(base, activity.activity_date, name),
        })
        .collect();

    Ok(Json(json!({
        "id": activity.id,
        "description": activity.description,
        "activity_date": activity.activity_date,
        "attachments": links,
    })))
}

// ---------------------------
// Projects
// ---------------------------

pub async fn projects_list(State(state): State<AppState>) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(blocking(&state.pool, |conn| list_projects(conn)).await?))
}

pub async fn projects_create(
    State(state): State<AppState>,
    Json(body): Json<NewProject>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let id = blocking(&state.pool, move |conn| insert_project(conn, &body)).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

pub async fn projects_update_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ProjectStatusUpdate>,
) -> ApiResult<Json<Value>> {
    blocking(&state.pool, move |conn| update_project_status(conn, id, &body)).await?;
    Ok(Json(json!({ "id": id, "updated": true })))
}

pub async fn project_observation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let project = blocking(&state.pool, move |conn| get_project(conn, id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("project {id}")))?;

    Ok(Json(json!({
        "id": project.id,
        "status": project.status,
        "observation": project.observation,
    })))
}

pub async fn project_report_pdf(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Response> {
    let (project, activities) = blocking(&state.pool, move |conn| {
        let project = get_project(conn, id)?.ok_or_else(|| AppError::NotFound(format!("project {id}")))?;
        let activities = activities_of_project(conn, id)?;
        Ok((project, activities))
    })
    .await?;

    let bytes = tokio::task::spawn_blocking(move || render_project_report(&project, &activities))
        .await
        .map_err(|e| AppError::Export(format!("report task aborted: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"project-{id}.pdf\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

// ---------------------------
// Files
// ---------------------------

pub fn content_type_for(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        "dwg" => "application/vnd.dwg",
        _ => "application/octet-stream",
    }
}

/// `rel` joined to `root`, refusing anything that could leave `root`.
fn resolve_under(root: &std::path::Path, rel: &str) -> Option<PathBuf> {
    let rel = std::path::Path::new(rel);
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return None;
    }
    Some(root.join(rel))
}

async fn serve_file(root: PathBuf, rel: String) -> ApiResult<Response> {
    let path = resolve_under(&root, &rel)
        .ok_or_else(|| ApiError(AppError::Validation(format!("invalid file path '{rel}'"))))?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("file {rel}")).into());
        }
        Err(e) => return Err(AppError::from(e).into()),
    };

    Ok(Response::builder()
        .header(header::CONTENT_TYPE, content_type_for(&path))
        .body(Body::from(bytes))
        .map_err(|e| AppError::Other(e.to_string()))?)
}

pub async fn photo_file(State(state): State<AppState>, Path(rel): Path<String>) -> ApiResult<Response> {
    serve_file(state.watch_dir.clone(), rel).await
}

pub async fn upload_file(State(state): State<AppState>, Path(rel): Path<String>) -> ApiResult<Response> {
    serve_file(state.uploads_dir.clone(), rel).await
}
