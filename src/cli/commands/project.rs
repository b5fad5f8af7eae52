use crate::cli::commands::open_pool;
use crate::cli::parser::{Commands, ProjectAction};
use crate::config::Config;
use crate::db::log::ttlog;
use crate::db::projects::{insert_project, list_projects};
use crate::errors::AppResult;
use crate::models::attendance::DATE_FMT;
use crate::models::project::NewProject;
use crate::ui::messages::{success, warning};
use crate::utils::table::Table;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Project { action } = cmd else {
        return Ok(());
    };
    let pool = open_pool(cfg)?;

    match action {
        ProjectAction::Add {
            name,
            company,
            owner,
            deadline,
            estimated_hours,
            layout,
        } => {
            let new = NewProject {
                name: name.clone(),
                company: company.clone(),
                owner: owner.clone(),
                deadline: deadline.clone(),
                estimated_hours: estimated_hours.clone(),
                layout: layout.clone(),
            };
            let id = pool.with_conn(|conn| {
                let id = insert_project(conn, &new)?;
                ttlog(conn, "project_add", &id.to_string(), &new.name)?;
                Ok(id)
            })?;
            success(format!("Project '{}' created with id {id}", new.name.trim()));
        }

        ProjectAction::List => {
            let projects = pool.with_conn(|conn| list_projects(conn))?;
            if projects.is_empty() {
                warning("No projects found.");
                return Ok(());
            }

            let mut table = Table::new(["ID", "Name", "Company", "Owner", "Deadline", "Hours", "Status"]);
            for p in &projects {
                table.add_row(vec![
                    p.id.to_string(),
                    p.name.clone(),
                    p.company.clone(),
                    p.owner.clone(),
                    p.deadline.map(|d| d.format(DATE_FMT).to_string()).unwrap_or_default(),
                    p.estimated_hours.map(|h| h.to_string()).unwrap_or_default(),
                    p.status.clone().unwrap_or_default(),
                ]);
            }
            print!("{}", table.render());
        }
    }
    Ok(())
}
