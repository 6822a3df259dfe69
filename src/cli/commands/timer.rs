use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::timer::Timer;
use crate::db::{queries, running};
use crate::errors::{AppError, AppResult};
use crate::models::project::Project;
use crate::sync::engine::SyncEngine;
use crate::ui::messages::{info, kv, success, timer, warning};
use crate::utils::time::{format_duration_ms, format_ms_local};

/// Resolve the project to start on: an explicit name, else the default
/// project stored in settings.
fn start_project(engine: &SyncEngine, name: Option<&str>) -> AppResult<Project> {
    match name {
        Some(name) => super::project_by_name(engine, name),
        None => {
            let settings = engine.pool().with_conn(|conn| running::get_settings(conn))?;
            let id = settings.default_project_id.ok_or_else(|| {
                AppError::UnknownProject(
                    "none given and no default project configured".into(),
                )
            })?;
            engine
                .pool()
                .with_conn(|conn| queries::get_project(conn, id))?
                .ok_or_else(|| AppError::UnknownProject(id.to_string()))
        }
    }
}

/// Running-timer commands: start, pause, resume, status, stop, discard,
/// continue.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let engine = super::open_engine(cfg)?;

    match cmd {
        Commands::Start { project, note } => {
            let p = start_project(&engine, project.as_deref())?;
            let rs = Timer::start(&engine, p.id, note.clone())?;
            success(format!(
                "Timer started for '{}' at {}",
                p.name,
                format_ms_local(rs.start_ms)
            ));
        }

        Commands::Pause => {
            Timer::pause(&engine)?;
            success("Timer paused.");
        }

        Commands::Resume => {
            Timer::resume(&engine)?;
            success("Timer resumed.");
        }

        Commands::Status => {
            match Timer::current(&engine)? {
                Some(rs) => {
                    let elapsed = Timer::elapsed(&engine)?;
                    let state = if rs.is_paused { "paused" } else { "running" };
                    timer(format!(
                        "{}, {} elapsed",
                        state,
                        format_duration_ms(elapsed)
                    ));
                    kv("started", format_ms_local(rs.start_ms));
                    if let Some(note) = &rs.note {
                        kv("note", note);
                    }
                    if let Some(id) = rs.continued_from_id {
                        kv("continued", format!("from entry {id}"));
                    }
                }
                None => info("No timer running."),
            }

            let (p, s, t) = engine.unsynced_counts()?;
            if p + s + t > 0 {
                warning(format!(
                    "{} record(s) awaiting sync ({} projects, {} sessions, {} travel)",
                    p + s + t,
                    p,
                    s,
                    t
                ));
            }
        }

        Commands::Stop => {
            let session = Timer::stop(&engine)?;
            success(format!(
                "Session {} recorded: {}",
                session.id,
                format_duration_ms(session.duration_ms.unwrap_or(0))
            ));
        }

        Commands::Discard => {
            Timer::discard(&engine)?;
            success("Timer discarded.");
        }

        Commands::Continue { id } => {
            let rs = Timer::continue_from(&engine, *id)?;
            success(format!(
                "Continuing from entry {} ({} already on the clock)",
                id,
                format_duration_ms(rs.base_duration_ms)
            ));
        }

        _ => {}
    }

    engine.flush();
    Ok(())
}
