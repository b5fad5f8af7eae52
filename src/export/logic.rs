// src/export/logic.rs

use crate::db::activities::activities_of_project;
use crate::db::pool::DbPool;
use crate::db::projects::get_project;
use crate::db::queries::{RecordFilter, list_records};
use crate::errors::{AppError, AppResult};
use crate::export::fs_utils::ensure_writable;
use crate::export::json_csv::{export_csv, export_json};
use crate::export::model::{PDF_HEADERS, RecordExport, to_pdf_row};
use crate::export::pdf::PdfManager;
use crate::export::report::render_project_report;
use crate::export::{ExportFormat, notify_export_success};
use crate::ui::messages::{info, warning};
use crate::utils::date::parse_range;
use std::path::Path;

/// Logica di alto livello per l'export.
pub struct ExportLogic;

impl ExportLogic {
    /// Export attendance records.
    ///
    /// - `file`: absolute path of the output file
    /// - `range`: `None`, `"all"`, or a period accepted by `parse_range`
    ///
    /// Returns the number of exported records.
    pub fn export(
        pool: &DbPool,
        format: ExportFormat,
        file: &str,
        range: Option<&str>,
        force: bool,
    ) -> AppResult<usize> {
        let path = Path::new(file);

        if !path.is_absolute() {
            return Err(AppError::Export(format!(
                "Output file path must be absolute: {file}"
            )));
        }

        let mut filter = RecordFilter::default();
        if let Some(r) = range.filter(|r| !r.eq_ignore_ascii_case("all")) {
            let (from, to) = parse_range(r)?;
            filter.from = Some(from);
            filter.to = Some(to);
        }

        let rows: Vec<RecordExport> = pool
            .with_conn(|conn| list_records(conn, &filter))?
            .iter()
            .map(RecordExport::from)
            .collect();

        if rows.is_empty() {
            warning("No attendance records found for the selected range.");
            return Ok(0);
        }

        ensure_writable(path, force)?;
        info(format!("Exporting to {}: {}", format.as_str().to_uppercase(), path.display()));

        match format {
            ExportFormat::Csv => export_csv(&rows, path)?,
            ExportFormat::Json => export_json(&rows, path)?,
            ExportFormat::Pdf => {
                let table: Vec<Vec<String>> = rows.iter().map(to_pdf_row).collect();
                let mut pdf = PdfManager::landscape();
                pdf.write_report(&pdf_title(range), &[], &PDF_HEADERS, &table);
                pdf.save(path)?;
            }
        }

        notify_export_success(format.as_str(), path);
        Ok(rows.len())
    }
}

/// Costruisce il titolo del PDF in base al periodo selezionato.
fn pdf_title(range: Option<&str>) -> String {
    match range {
        None => "Attendance records".to_string(),
        Some(r) if r.eq_ignore_ascii_case("all") => "Attendance records".to_string(),
        Some(r) => match r.split_once(':') {
            Some((from, to)) => format!("Attendance records from {from} to {to}"),
            None => format!("Attendance records for {r}"),
        },
    }
}

impl ExportLogic {
    /// Write the PDF report of project `project_id` to `file`.
    pub fn project_report(pool: &DbPool, project_id: i64, file: &str, force: bool) -> AppResult<()> {
        let path = Path::new(file);

        let (project, activities) = pool.with_conn(|conn| {
            let project = get_project(conn, project_id)?
                .ok_or_else(|| AppError::NotFound(format!("project {project_id}")))?;
            let activities = activities_of_project(conn, project_id)?;
            Ok((project, activities))
        })?;

        ensure_writable(path, force)?;
        info(format!(
            "Writing report for '{}' ({} activities): {}",
            project.name,
            activities.len(),
            path.display()
        ));

        std::fs::write(path, render_project_report(&project, &activities))?;
        notify_export_success("pdf", path);
        Ok(())
    }
}
