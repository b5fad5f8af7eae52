use crate::cli::commands::open_pool;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::queries::{RecordFilter, list_records};
use crate::errors::{AppError, AppResult};
use crate::models::attendance::{DATE_FMT, TIME_FMT};
use crate::ui::messages::warning;
use crate::utils::date::parse_range;
use crate::utils::table::Table;
use chrono::NaiveDate;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::List {
        date,
        person,
        project,
        range,
    } = cmd
    else {
        return Ok(());
    };

    let mut filter = RecordFilter {
        person: person.clone(),
        project: project.clone(),
        ..Default::default()
    };

    if let Some(d) = date {
        let d = NaiveDate::parse_from_str(d, DATE_FMT).map_err(|_| AppError::InvalidDate(d.clone()))?;
        filter.from = Some(d);
        filter.to = Some(d);
    } else if let Some(r) = range.as_deref().filter(|r| !r.eq_ignore_ascii_case("all")) {
        let (from, to) = parse_range(r)?;
        filter.from = Some(from);
        filter.to = Some(to);
    }

    let pool = open_pool(cfg)?;
    let records = pool.with_conn(|conn| list_records(conn, &filter))?;

    if records.is_empty() {
        warning("No attendance records found.");
        return Ok(());
    }

    let mut table = Table::new(["ID", "Date", "Person", "Project", "Start", "End", "Photos"]);
    for r in &records {
        table.add_row(vec![
            r.id.to_string(),
            r.date.format(DATE_FMT).to_string(),
            r.person.clone(),
            r.project.clone(),
            r.start_time.format(TIME_FMT).to_string(),
            r.end_time.format(TIME_FMT).to_string(),
            r.attachments.len().to_string(),
        ]);
    }
    print!("{}", table.render());
    println!("{} record(s)", records.len());
    Ok(())
}
