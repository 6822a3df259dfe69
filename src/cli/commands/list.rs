use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::queries;
use crate::errors::AppResult;
use crate::ui::messages::info;
use crate::utils::time::{format_duration_ms, format_ms_local};
use std::collections::HashMap;

/// List recorded sessions or travel entries.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::List { travel, project } = cmd else {
        return Ok(());
    };

    let engine = super::open_engine(cfg)?;

    let filter_id = match project {
        Some(name) => Some(super::project_by_name(&engine, name)?.id),
        None => None,
    };

    let names: HashMap<i64, String> = engine
        .pool()
        .with_conn(|conn| queries::list_projects(conn))?
        .into_iter()
        .map(|p| (p.id, p.name))
        .collect();
    let name_of = |id: i64| names.get(&id).cloned().unwrap_or_else(|| format!("#{id}"));

    if *travel {
        let entries = engine.pool().with_conn(|conn| queries::list_travel(conn))?;
        let entries: Vec<_> = entries
            .into_iter()
            .filter(|t| filter_id.is_none_or(|id| t.project_id == id))
            .collect();
        if entries.is_empty() {
            info("No travel entries recorded.");
            return Ok(());
        }
        for t in entries {
            let sync_mark = if t.remote_id.is_some() { "" } else { "  (unsynced)" };
            println!(
                "{:>4}  {}  {:>7.1} km  {}{}",
                t.id,
                format_ms_local(t.start_ms),
                t.distance_km,
                name_of(t.project_id),
                sync_mark
            );
        }
    } else {
        let sessions = engine.pool().with_conn(|conn| match filter_id {
            Some(id) => queries::sessions_by_project(conn, id),
            None => queries::list_sessions(conn),
        })?;
        if sessions.is_empty() {
            info("No sessions recorded.");
            return Ok(());
        }
        for s in sessions {
            let sync_mark = if s.remote_id.is_some() { "" } else { "  (unsynced)" };
            println!(
                "{:>4}  {}  {:>9}  {}{}",
                s.id,
                format_ms_local(s.start_ms),
                format_duration_ms(s.duration_ms.unwrap_or(0)),
                name_of(s.project_id),
                sync_mark
            );
        }
    }

    Ok(())
}
