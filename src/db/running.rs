//! Persistence for the single-row running_session table, plus the
//! settings singleton and predefined notes.

use crate::errors::AppResult;
use crate::models::running_session::RunningSession;
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

fn map_running(row: &Row) -> Result<RunningSession> {
    Ok(RunningSession {
        project_id: row.get("project_id")?,
        start_ms: row.get("start_ms")?,
        base_duration_ms: row.get("base_duration_ms")?,
        is_paused: row.get::<_, i64>("is_paused")? != 0,
        pause_start_ms: row.get("pause_start_ms")?,
        total_paused_ms: row.get("total_paused_ms")?,
        continued_from_id: row.get("continued_from_id")?,
        note: row.get("note")?,
        created_at: row.get("created_at")?,
    })
}

pub fn get_running_session(conn: &Connection) -> AppResult<Option<RunningSession>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM running_session WHERE id = 1")?;
    Ok(stmt.query_row([], map_running).optional()?)
}

/// Replace whatever is in the single-row table with `rs`.
/// Any prior row is cleared first; the state machine's precondition should
/// already guarantee emptiness.
pub fn replace_running_session(conn: &Connection, rs: &RunningSession) -> AppResult<()> {
    conn.execute("DELETE FROM running_session", [])?;
    conn.execute(
        "INSERT INTO running_session
            (id, project_id, start_ms, base_duration_ms, is_paused,
             pause_start_ms, total_paused_ms, continued_from_id, note, created_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            rs.project_id,
            rs.start_ms,
            rs.base_duration_ms,
            rs.is_paused as i64,
            rs.pause_start_ms,
            rs.total_paused_ms,
            rs.continued_from_id,
            rs.note,
            rs.created_at,
        ],
    )?;
    Ok(())
}

/// Update only the pause bookkeeping fields.
pub fn update_running_pause(
    conn: &Connection,
    is_paused: bool,
    pause_start_ms: Option<i64>,
    total_paused_ms: i64,
) -> AppResult<()> {
    conn.execute(
        "UPDATE running_session
         SET is_paused = ?1, pause_start_ms = ?2, total_paused_ms = ?3
         WHERE id = 1",
        params![is_paused as i64, pause_start_ms, total_paused_ms],
    )?;
    Ok(())
}

/// Returns true when a row was actually removed.
pub fn clear_running_session(conn: &Connection) -> AppResult<bool> {
    let n = conn.execute("DELETE FROM running_session", [])?;
    Ok(n > 0)
}

// ---------------------------------------------------------------------------
// Settings singleton
// ---------------------------------------------------------------------------

pub struct Settings {
    pub default_project_id: Option<i64>,
    pub long_running_threshold_min: i64,
}

pub fn get_settings(conn: &Connection) -> AppResult<Settings> {
    let mut stmt = conn.prepare_cached(
        "SELECT default_project_id, long_running_threshold_min FROM settings WHERE id = 1",
    )?;
    let settings = stmt.query_row([], |row| {
        Ok(Settings {
            default_project_id: row.get(0)?,
            long_running_threshold_min: row.get(1)?,
        })
    })?;
    Ok(settings)
}

pub fn set_default_project(conn: &Connection, project_id: Option<i64>) -> AppResult<()> {
    conn.execute(
        "UPDATE settings SET default_project_id = ?1 WHERE id = 1",
        params![project_id],
    )?;
    Ok(())
}

pub fn set_long_running_threshold(conn: &Connection, minutes: i64) -> AppResult<()> {
    conn.execute(
        "UPDATE settings SET long_running_threshold_min = ?1 WHERE id = 1",
        params![minutes],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Predefined notes
// ---------------------------------------------------------------------------

pub fn insert_predefined_note(conn: &Connection, text: &str) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO predefined_notes (text, created_at) VALUES (?1, ?2)",
        params![text, crate::utils::time::created_at_now()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_predefined_notes(conn: &Connection) -> AppResult<Vec<(i64, String)>> {
    let mut stmt =
        conn.prepare("SELECT id, text FROM predefined_notes ORDER BY text ASC")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}
