// src/export/model.rs

use crate::models::AttendanceRecord;
use crate::models::attendance::{DATE_FMT, TIME_FMT};
use serde::Serialize;

/// Flat row used by every export format.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RecordExport {
    pub id: i64,
    pub person: String,
    pub project: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub photos: usize,
    pub attachments: String,
}

impl From<&AttendanceRecord> for RecordExport {
    fn from(r: &AttendanceRecord) -> Self {
        Self {
            id: r.id,
            person: r.person.clone(),
            project: r.project.clone(),
            date: r.date.format(DATE_FMT).to_string(),
            start_time: r.start_time.format(TIME_FMT).to_string(),
            end_time: r.end_time.format(TIME_FMT).to_string(),
            photos: r.attachments.len(),
            attachments: r.attachments.serialized(),
        }
    }
}

/// Header per il PDF (CSV/JSON use the serde field names).
pub(crate) const PDF_HEADERS: [&str; 7] = ["id", "person", "project", "date", "start", "end", "photos"];

pub(crate) fn to_pdf_row(e: &RecordExport) -> Vec<String> {
    vec![
        e.id.to_string(),
        e.person.clone(),
        e.project.clone(),
        e.date.clone(),
        e.start_time.clone(),
        e.end_time.clone(),
        e.photos.to_string(),
    ]
}
