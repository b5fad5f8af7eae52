use crate::cli::commands::open_pool;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::log::load_log;
use crate::errors::AppResult;
use crate::utils::table::Table;

/// Longer messages are cut in the table view.
const MAX_MESSAGE: usize = 80;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if !matches!(cmd, Commands::Log { print: true }) {
        return Ok(());
    }

    let pool = open_pool(cfg)?;
    let entries = pool.with_conn(|conn| load_log(conn))?;

    let mut table = Table::new(["ID", "Date", "Operation", "Message"]);
    for e in &entries {
        let date = chrono::DateTime::parse_from_rfc3339(&e.date)
            .map(|dt| dt.format("%F %T").to_string())
            .unwrap_or_else(|_| e.date.clone());

        let op = if e.target.is_empty() {
            e.operation.clone()
        } else {
            format!("{} ({})", e.operation, e.target)
        };

        let mut msg: String = e.message.chars().take(MAX_MESSAGE).collect();
        if e.message.chars().count() > MAX_MESSAGE {
            msg.push('…');
        }

        table.add_row(vec![e.id.to_string(), date, op, msg]);
    }
    print!("{}", table.render());
    Ok(())
}
