//! Project report: project details followed by its activities.

use crate::export::pdf::PdfManager;
use crate::models::activity::ActivityLog;
use crate::models::project::Project;
use crate::utils::date::format_display_date;
use chrono::NaiveTime;

const HEADERS: [&str; 7] = ["#", "Date", "Activity", "Owner", "People", "Start", "End"];

fn clock(t: Option<NaiveTime>) -> String {
    t.map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string())
}

pub fn project_details(project: &Project) -> Vec<(String, String)> {
    let or_dash = |v: Option<&str>| match v {
        Some(s) if !s.trim().is_empty() => s.to_string(),
        _ => "-".to_string(),
    };

    vec![
        ("Project".into(), project.name.clone()),
        ("Company".into(), or_dash(Some(&project.company))),
        ("Owner".into(), or_dash(Some(&project.owner))),
        (
            "Deadline".into(),
            project
                .deadline
                .map(format_display_date)
                .unwrap_or_else(|| "-".into()),
        ),
        (
            "Estimated hours".into(),
            project
                .estimated_hours
                .map(|h| format!("{h}h"))
                .unwrap_or_else(|| "-".into()),
        ),
        ("Layout".into(), or_dash(project.layout.as_deref())),
        ("Status".into(), or_dash(project.status.as_deref())),
        ("Observation".into(), or_dash(project.observation.as_deref())),
    ]
}

pub fn activity_rows(activities: &[ActivityLog]) -> Vec<Vec<String>> {
    activities
        .iter()
        .enumerate()
        .map(|(i, a)| {
            vec![
                (i + 1).to_string(),
                format_display_date(a.activity_date),
                a.description.clone(),
                a.owner.clone(),
                a.people_count.map(|n| n.to_string()).unwrap_or_default(),
                clock(a.start_time),
                clock(a.end_time),
            ]
        })
        .collect()
}

/// Landscape A4 PDF, returned as bytes.
pub fn render_project_report(project: &Project, activities: &[ActivityLog]) -> Vec<u8> {
    let mut pdf = PdfManager::landscape();
    pdf.write_report(
        &format!("Project report - {}", project.name),
        &project_details(project),
        &HEADERS,
        &activity_rows(activities),
    );
    pdf.finish()
}
