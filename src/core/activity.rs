//! "Register activity" flow and plain activity creation.

use crate::db::AttendanceStore;
use crate::errors::{AppError, AppResult};
use crate::models::AttachmentList;
use crate::models::activity::{
    ActivityDraft, ActivityRegistration, NewActivity, RegisterActivityRequest, RegistrationOutcome,
};
use crate::models::attendance::DATE_FMT;
use crate::utils::date::{parse_clock, parse_display_date};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

fn required<'a>(value: &'a Option<String>, field: &str) -> AppResult<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::Validation(format!("{field} is required"))),
    }
}

/// Check a registration request. Nothing is read from or written to the
/// store here.
pub fn validate_registration(req: &RegisterActivityRequest) -> AppResult<ActivityRegistration> {
    let person = required(&req.person, "person")?;
    let date_raw = required(&req.date, "date")?;
    let start_raw = required(&req.start_time, "start_time")?;
    let end_raw = required(&req.end_time, "end_time")?;
    let project = required(&req.project, "project")?;
    let attachments_raw = required(&req.attachments, "attachments")?;

    match req.project_valid {
        None => return Err(AppError::Validation("project_valid is required".into())),
        Some(false) => {
            return Err(AppError::Validation(format!(
                "project '{project}' is not a valid project"
            )));
        }
        Some(true) => {}
    }

    let date = parse_display_date(date_raw)
        .map_err(|_| AppError::Validation(format!("date '{date_raw}' is not DD-MM-YYYY")))?;
    let start_time = parse_clock(start_raw)
        .map_err(|_| AppError::Validation(format!("start_time '{start_raw}' is not a time")))?;
    let end_time = parse_clock(end_raw)
        .map_err(|_| AppError::Validation(format!("end_time '{end_raw}' is not a time")))?;

    if start_time > end_time {
        return Err(AppError::Validation(format!(
            "start_time {start_time} is after end_time {end_time}"
        )));
    }

    let attachments = AttachmentList::parse(attachments_raw);
    if attachments.is_empty() {
        return Err(AppError::Validation("attachments is required".into()));
    }

    Ok(ActivityRegistration {
        person: person.to_string(),
        date,
        start_time,
        end_time,
        project: project.to_string(),
        attachments,
    })
}

/// Validate `req`, then run the registration transaction on the blocking pool.
pub async fn register(
    store: Arc<dyn AttendanceStore>,
    req: RegisterActivityRequest,
) -> AppResult<RegistrationOutcome> {
    let reg = match validate_registration(&req) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "activity registration refused");
            return Err(e);
        }
    };

    let outcome = tokio::task::spawn_blocking(move || {
        let outcome = store.register_activity(&reg)?;
        if let Err(e) = store.audit(
            "activity_register",
            &reg.project,
            &format!("{} {} {:?}", reg.person, reg.date.format(DATE_FMT), outcome),
        ) {
            warn!(error = %e, "could not write operation log");
        }
        Ok::<_, AppError>(outcome)
    })
    .await
    .map_err(|e| AppError::Other(format!("registration task aborted: {e}")))??;

    info!(?outcome, "activity registered");
    Ok(outcome)
}

/// Check a plain activity payload and turn it into an insertable row.
pub fn validate_new_activity(a: &NewActivity) -> AppResult<ActivityDraft> {
    let description = a.description.trim();
    if description.is_empty() {
        return Err(AppError::Validation("description is required".into()));
    }
    let owner = a.owner.trim();
    if owner.is_empty() {
        return Err(AppError::Validation("owner is required".into()));
    }

    // ISO first, UI format as fallback
    let raw_date = a.activity_date.trim();
    let activity_date = NaiveDate::parse_from_str(raw_date, DATE_FMT)
        .or_else(|_| parse_display_date(raw_date))
        .map_err(|_| AppError::Validation(format!("activity_date '{raw_date}' is not a date")))?;

    let clock = |v: &Option<String>, field: &str| -> AppResult<Option<chrono::NaiveTime>> {
        match v.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => parse_clock(s)
                .map(Some)
                .map_err(|_| AppError::Validation(format!("{field} '{s}' is not a time"))),
            _ => Ok(None),
        }
    };
    let start_time = clock(&a.start_time, "start_time")?;
    let end_time = clock(&a.end_time, "end_time")?;

    if let (Some(s), Some(e)) = (start_time, end_time)
        && s > e
    {
        return Err(AppError::Validation(format!(
            "start_time {s} is after end_time {e}"
        )));
    }

    if let Some(n) = a.people_count
        && n < 0
    {
        return Err(AppError::Validation("people_count cannot be negative".into()));
    }

    Ok(ActivityDraft {
        description: description.to_string(),
        activity_date,
        people_count: a.people_count,
        start_time,
        end_time,
        owner: owner.to_string(),
        project_id: a.project_id,
        attachments: AttachmentList::from_names(&a.attachments),
    })
}
