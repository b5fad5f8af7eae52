use super::attachments::AttachmentList;
use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use std::fmt;

/// Storage format for dates (`attendance_records.date`, TEXT).
pub const DATE_FMT: &str = "%Y-%m-%d";
/// Storage format for times (`start_time` / `end_time`, TEXT).
pub const TIME_FMT: &str = "%H:%M:%S";

/// One photo, decoded from its filename. Never persisted as such.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceEvent {
    pub person: String,
    pub project: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    /// Name of the source file (unique per photo).
    pub attachment_name: String,
}

impl AttendanceEvent {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            person: self.person.clone(),
            project: self.project.clone(),
            date: self.date,
        }
    }

    pub fn date_str(&self) -> String {
        self.date.format(DATE_FMT).to_string()
    }

    pub fn time_str(&self) -> String {
        self.time.format(TIME_FMT).to_string()
    }
}

/// Identity of a daily attendance record. Person and project compare
/// case-sensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RecordKey {
    pub person: String,
    pub project: String,
    pub date: NaiveDate,
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} / {} / {}",
            self.person,
            self.project,
            self.date.format(DATE_FMT)
        )
    }
}

/// Row of `attendance_records`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub person: String,
    pub project: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub attachments: AttachmentList,
}

impl AttendanceRecord {
    pub fn key(&self) -> RecordKey {
        RecordKey {
            person: self.person.clone(),
            project: self.project.clone(),
            date: self.date,
        }
    }
}

/// Fields of a record about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttendanceRecord {
    pub person: String,
    pub project: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub attachments: AttachmentList,
}

/// New state for an existing record, as decided by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordUpdate {
    pub id: i64,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub attachments: AttachmentList,
    /// Other records sharing the same key (data anomaly), left as they are.
    pub conflicting_ids: Vec<i64>,
}

impl RecordUpdate {
    /// True when applying this update would not change `current`.
    pub fn is_noop(&self, current: &AttendanceRecord) -> bool {
        current.id == self.id
            && current.start_time == self.start_time
            && current.end_time == self.end_time
            && current.attachments == self.attachments
    }
}
