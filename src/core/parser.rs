//! Filename parser: turns a photo name produced by the face-recognition
//! terminal into an [`AttendanceEvent`].
//!
//! Shape: `<given>_<surname[_more]>_<project>_YYYY.MM.DD.HH.mm.ss.jpg`

use crate::models::AttendanceEvent;
use crate::models::attachments::ATTACHMENT_SEPARATOR;
use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)_(.+?)_(\d{4})\.(\d{2})\.(\d{2})\.(\d{2})\.(\d{2})\.(\d{2})\.jpg$")
        .expect("filename pattern is a valid regex")
});

/// Why a filename was not turned into an event. Never fatal for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseRejection {
    #[error("file name is not valid UTF-8: {0}")]
    NotUtf8(String),

    #[error("file name does not match Name_Surname_Project_YYYY.MM.DD.HH.mm.ss.jpg: {0}")]
    PatternMismatch(String),

    #[error("empty name or project segment in {0}")]
    EmptySegment(String),

    #[error("file name contains the attachment separator ',': {0}")]
    ReservedCharacter(String),

    #[error("invalid calendar date {0}")]
    InvalidDate(String),

    #[error("invalid time of day {0}")]
    InvalidTime(String),
}

/// Parse a bare file name (no directory part).
pub fn parse_filename(name: &str) -> Result<AttendanceEvent, ParseRejection> {
    let caps = FILENAME_RE
        .captures(name)
        .ok_or_else(|| ParseRejection::PatternMismatch(name.to_string()))?;

    if name.contains(ATTACHMENT_SEPARATOR) {
        return Err(ParseRejection::ReservedCharacter(name.to_string()));
    }

    let given = &caps[1];
    let rest = &caps[2];

    // L'ultimo underscore separa il cognome (eventualmente composto) dal progetto
    let (person, project) = match rest.rfind('_') {
        Some(idx) => {
            let surname = &rest[..idx];
            if surname.split('_').any(str::is_empty) {
                return Err(ParseRejection::EmptySegment(name.to_string()));
            }
            (
                format!("{} {}", given, surname.replace('_', " ")),
                rest[idx + 1..].to_string(),
            )
        }
        None => (given.to_string(), rest.to_string()),
    };

    if project.is_empty() || person.trim().is_empty() {
        return Err(ParseRejection::EmptySegment(name.to_string()));
    }

    let num = |i: usize| caps[i].parse::<u32>().unwrap_or(u32::MAX);

    let date = caps[3]
        .parse::<i32>()
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, num(4), num(5)))
        .ok_or_else(|| {
            ParseRejection::InvalidDate(format!("{}.{}.{}", &caps[3], &caps[4], &caps[5]))
        })?;

    let time = NaiveTime::from_hms_opt(num(6), num(7), num(8)).ok_or_else(|| {
        ParseRejection::InvalidTime(format!("{}.{}.{}", &caps[6], &caps[7], &caps[8]))
    })?;

    Ok(AttendanceEvent {
        person,
        project,
        date,
        time,
        attachment_name: name.to_string(),
    })
}

/// Parse the last component of `path`.
pub fn parse_path(path: &Path) -> Result<AttendanceEvent, ParseRejection> {
    let file_name = path
        .file_name()
        .ok_or_else(|| ParseRejection::PatternMismatch(path.display().to_string()))?;

    let name = file_name
        .to_str()
        .ok_or_else(|| ParseRejection::NotUtf8(file_name.to_string_lossy().into_owned()))?;

    parse_filename(name)
}
