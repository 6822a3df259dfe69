use crate::cli::parser::{Commands, ProjectAction};
use crate::config::Config;
use crate::db::queries;
use crate::errors::AppResult;
use crate::ui::messages::{info, success};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Project { action } = cmd else {
        return Ok(());
    };

    let engine = super::open_engine(cfg)?;

    match action {
        ProjectAction::Add { name, color } => {
            let project = engine.create_project(name, color.as_deref())?;
            success(format!("Project '{}' created (id {})", project.name, project.id));
        }
        ProjectAction::List => {
            let projects = engine.pool().with_conn(|conn| queries::list_projects(conn))?;
            if projects.is_empty() {
                info("No projects yet.");
            }
            for p in projects {
                let sync_mark = if p.is_synced() { "synced" } else { "local" };
                let archived = if p.archived { ", archived" } else { "" };
                println!("{:>4}  {}  ({}{})", p.id, p.name, sync_mark, archived);
            }
        }
        ProjectAction::Archive { id } => {
            engine
                .pool()
                .with_conn(|conn| queries::set_project_archived(conn, *id, true))?;
            success(format!("Project {id} archived"));
        }
    }

    engine.flush();
    Ok(())
}
