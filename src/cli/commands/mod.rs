pub mod backup;
pub mod config;
pub mod init;
pub mod list;
pub mod log;
pub mod note;
pub mod project;
pub mod sync;
pub mod timer;
pub mod travel;

use crate::db::initialize::init_db;
use crate::db::pool::DbPool;
use crate::errors::{AppError, AppResult};
use crate::models::project::Project;
use crate::sync::engine::SyncEngine;

/// Open the configured database and build a local-only engine.
/// Migrations are idempotent, so running them on every open keeps older
/// databases usable without a separate upgrade step.
pub fn open_engine(cfg: &crate::config::Config) -> AppResult<SyncEngine> {
    let pool = DbPool::new(&cfg.database)?;
    pool.with_conn(|conn| init_db(conn))?;
    Ok(SyncEngine::new_local_only(pool))
}

/// Look up a project by name, with a friendly error when missing.
pub fn project_by_name(engine: &SyncEngine, name: &str) -> AppResult<Project> {
    engine
        .pool()
        .with_conn(|conn| crate::db::queries::find_project_by_name(conn, name))?
        .ok_or_else(|| {
            AppError::UnknownProject(format!("'{name}' (create it with: project add {name})"))
        })
}
