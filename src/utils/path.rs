//! Path utilities: expand ~, build attachment URLs.

use chrono::{Datelike, NaiveDate};
use std::path::PathBuf;

pub fn expand_tilde(path: &str) -> PathBuf {
    if path.starts_with("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(path.trim_start_matches("~/"));
    }
    PathBuf::from(path)
}

/// Public URL of an activity attachment:
/// `{base}/files/uploads/activities/YYYY/MM/DD/{file}`.
pub fn activity_file_url(base: &str, date: NaiveDate, file: &str) -> String {
    format!(
        "{}/files/uploads/activities/{:04}/{:02}/{:02}/{}",
        base.trim_end_matches('/'),
        date.year(),
        date.month(),
        date.day(),
        file
    )
}
