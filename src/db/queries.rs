//! Row CRUD for projects, sessions and travel entries.
//! All functions take a plain `&Connection` so they compose inside the
//! per-batch transactions opened by the sync engine.

use crate::errors::{AppError, AppResult};
use crate::models::project::Project;
use crate::models::record::{NewSession, NewTravelEntry, Session, TravelEntry};
use crate::utils::time::created_at_now;
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

pub fn map_project(row: &Row) -> Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        remote_id: row.get("remote_id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        archived: row.get::<_, i64>("archived")? != 0,
        created_at: row.get("created_at")?,
    })
}

pub fn map_session(row: &Row) -> Result<Session> {
    Ok(Session {
        id: row.get("id")?,
        remote_id: row.get("remote_id")?,
        project_id: row.get("project_id")?,
        start_ms: row.get("start_ms")?,
        stop_ms: row.get("stop_ms")?,
        duration_ms: row.get("duration_ms")?,
        note: row.get("note")?,
        created_at: row.get("created_at")?,
    })
}

pub fn map_travel(row: &Row) -> Result<TravelEntry> {
    Ok(TravelEntry {
        id: row.get("id")?,
        remote_id: row.get("remote_id")?,
        project_id: row.get("project_id")?,
        start_ms: row.get("start_ms")?,
        distance_km: row.get("distance_km")?,
        note: row.get("note")?,
        created_at: row.get("created_at")?,
    })
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

pub fn insert_project(conn: &Connection, name: &str, color: &str) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO projects (name, color, archived, created_at)
         VALUES (?1, ?2, 0, ?3)",
        params![name, color, created_at_now()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert a project row that already carries a remote identity (it arrived
/// through the subscription).
pub fn insert_project_from_remote(
    conn: &Connection,
    remote_id: &str,
    name: &str,
    color: &str,
    archived: bool,
    created_at: &str,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO projects (remote_id, name, color, archived, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![remote_id, name, color, archived as i64, created_at],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_project(conn: &Connection, id: i64) -> AppResult<Option<Project>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM projects WHERE id = ?1")?;
    Ok(stmt.query_row([id], map_project).optional()?)
}

pub fn find_project_by_name(conn: &Connection, name: &str) -> AppResult<Option<Project>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM projects WHERE name = ?1")?;
    Ok(stmt.query_row([name], map_project).optional()?)
}

pub fn find_project_by_remote_id(
    conn: &Connection,
    remote_id: &str,
) -> AppResult<Option<Project>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM projects WHERE remote_id = ?1")?;
    Ok(stmt.query_row([remote_id], map_project).optional()?)
}

/// Resolve a local project id to its remote id, if mirrored yet.
pub fn project_remote_id(conn: &Connection, id: i64) -> AppResult<Option<String>> {
    let mut stmt = conn.prepare_cached("SELECT remote_id FROM projects WHERE id = ?1")?;
    let found: Option<Option<String>> = stmt.query_row([id], |row| row.get(0)).optional()?;
    Ok(found.flatten())
}

pub fn set_project_remote_id(conn: &Connection, id: i64, remote_id: &str) -> AppResult<()> {
    conn.execute(
        "UPDATE projects SET remote_id = ?1 WHERE id = ?2",
        params![remote_id, id],
    )?;
    Ok(())
}

pub fn update_project_from_remote(
    conn: &Connection,
    id: i64,
    name: &str,
    color: &str,
    archived: bool,
) -> AppResult<()> {
    conn.execute(
        "UPDATE projects SET name = ?1, color = ?2, archived = ?3 WHERE id = ?4",
        params![name, color, archived as i64, id],
    )?;
    Ok(())
}

pub fn set_project_archived(conn: &Connection, id: i64, archived: bool) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE projects SET archived = ?1 WHERE id = ?2",
        params![archived as i64, id],
    )?;
    if changed == 0 {
        return Err(AppError::UnknownProject(id.to_string()));
    }
    Ok(())
}

pub fn delete_project(conn: &Connection, id: i64) -> AppResult<()> {
    conn.execute("DELETE FROM projects WHERE id = ?1", [id])?;
    Ok(())
}

pub fn list_projects(conn: &Connection) -> AppResult<Vec<Project>> {
    let mut stmt = conn.prepare("SELECT * FROM projects ORDER BY name ASC")?;
    let rows = stmt.query_map([], map_project)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn unsynced_projects(conn: &Connection) -> AppResult<Vec<Project>> {
    let mut stmt =
        conn.prepare("SELECT * FROM projects WHERE remote_id IS NULL ORDER BY id ASC")?;
    let rows = stmt.query_map([], map_project)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub fn insert_session(conn: &Connection, new: &NewSession) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO sessions (project_id, start_ms, stop_ms, duration_ms, note, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            new.project_id,
            new.start_ms,
            new.stop_ms,
            new.duration_ms,
            new.note,
            created_at_now(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_session_from_remote(
    conn: &Connection,
    remote_id: &str,
    new: &NewSession,
    created_at: &str,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO sessions (remote_id, project_id, start_ms, stop_ms, duration_ms, note, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            remote_id,
            new.project_id,
            new.start_ms,
            new.stop_ms,
            new.duration_ms,
            new.note,
            created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_session(conn: &Connection, id: i64) -> AppResult<Option<Session>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM sessions WHERE id = ?1")?;
    Ok(stmt.query_row([id], map_session).optional()?)
}

pub fn find_session_by_remote_id(
    conn: &Connection,
    remote_id: &str,
) -> AppResult<Option<Session>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM sessions WHERE remote_id = ?1")?;
    Ok(stmt.query_row([remote_id], map_session).optional()?)
}

/// Logical-duplicate lookup: an unsynced session created by the same owner
/// at the same start instant. Heuristic match, see DESIGN.md.
pub fn find_unsynced_session_match(
    conn: &Connection,
    project_id: i64,
    start_ms: i64,
) -> AppResult<Option<i64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id FROM sessions
         WHERE remote_id IS NULL AND project_id = ?1 AND start_ms = ?2
         LIMIT 1",
    )?;
    Ok(stmt
        .query_row(params![project_id, start_ms], |row| row.get(0))
        .optional()?)
}

pub fn update_session(conn: &Connection, s: &Session) -> AppResult<()> {
    conn.execute(
        "UPDATE sessions
         SET project_id = ?1, start_ms = ?2, stop_ms = ?3,
             duration_ms = ?4, note = ?5
         WHERE id = ?6",
        params![
            s.project_id,
            s.start_ms,
            s.stop_ms,
            s.duration_ms,
            s.note,
            s.id,
        ],
    )?;
    Ok(())
}

pub fn set_session_remote_id(conn: &Connection, id: i64, remote_id: &str) -> AppResult<()> {
    conn.execute(
        "UPDATE sessions SET remote_id = ?1 WHERE id = ?2",
        params![remote_id, id],
    )?;
    Ok(())
}

pub fn delete_session(conn: &Connection, id: i64) -> AppResult<bool> {
    let n = conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
    Ok(n > 0)
}

pub fn delete_session_by_remote_id(conn: &Connection, remote_id: &str) -> AppResult<bool> {
    let n = conn.execute("DELETE FROM sessions WHERE remote_id = ?1", [remote_id])?;
    Ok(n > 0)
}

pub fn sessions_in_range(
    conn: &Connection,
    from_ms: i64,
    to_ms: i64,
) -> AppResult<Vec<Session>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM sessions
         WHERE start_ms >= ?1 AND start_ms < ?2
         ORDER BY start_ms ASC",
    )?;
    let rows = stmt.query_map(params![from_ms, to_ms], map_session)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn sessions_by_project(conn: &Connection, project_id: i64) -> AppResult<Vec<Session>> {
    let mut stmt = conn.prepare_cached(
        "SELECT * FROM sessions WHERE project_id = ?1 ORDER BY start_ms ASC",
    )?;
    let rows = stmt.query_map([project_id], map_session)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn list_sessions(conn: &Connection) -> AppResult<Vec<Session>> {
    let mut stmt = conn.prepare("SELECT * FROM sessions ORDER BY start_ms ASC")?;
    let rows = stmt.query_map([], map_session)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn unsynced_sessions(conn: &Connection) -> AppResult<Vec<Session>> {
    let mut stmt =
        conn.prepare("SELECT * FROM sessions WHERE remote_id IS NULL ORDER BY id ASC")?;
    let rows = stmt.query_map([], map_session)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn count_sessions(conn: &Connection) -> AppResult<i64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))?;
    Ok(n)
}

// ---------------------------------------------------------------------------
// Travel entries
// ---------------------------------------------------------------------------

pub fn insert_travel(conn: &Connection, new: &NewTravelEntry) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO travel_entries (project_id, start_ms, distance_km, note, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            new.project_id,
            new.start_ms,
            new.distance_km,
            new.note,
            created_at_now(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_travel_from_remote(
    conn: &Connection,
    remote_id: &str,
    new: &NewTravelEntry,
    created_at: &str,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO travel_entries (remote_id, project_id, start_ms, distance_km, note, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            remote_id,
            new.project_id,
            new.start_ms,
            new.distance_km,
            new.note,
            created_at,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_travel(conn: &Connection, id: i64) -> AppResult<Option<TravelEntry>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM travel_entries WHERE id = ?1")?;
    Ok(stmt.query_row([id], map_travel).optional()?)
}

pub fn find_travel_by_remote_id(
    conn: &Connection,
    remote_id: &str,
) -> AppResult<Option<TravelEntry>> {
    let mut stmt = conn.prepare_cached("SELECT * FROM travel_entries WHERE remote_id = ?1")?;
    Ok(stmt.query_row([remote_id], map_travel).optional()?)
}

/// Logical-duplicate lookup for travel entries: owner + start + distance.
pub fn find_unsynced_travel_match(
    conn: &Connection,
    project_id: i64,
    start_ms: i64,
    distance_km: f64,
) -> AppResult<Option<i64>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id FROM travel_entries
         WHERE remote_id IS NULL AND project_id = ?1 AND start_ms = ?2 AND distance_km = ?3
         LIMIT 1",
    )?;
    Ok(stmt
        .query_row(params![project_id, start_ms, distance_km], |row| row.get(0))
        .optional()?)
}

pub fn update_travel(conn: &Connection, t: &TravelEntry) -> AppResult<()> {
    conn.execute(
        "UPDATE travel_entries
         SET project_id = ?1, start_ms = ?2, distance_km = ?3, note = ?4
         WHERE id = ?5",
        params![t.project_id, t.start_ms, t.distance_km, t.note, t.id],
    )?;
    Ok(())
}

pub fn set_travel_remote_id(conn: &Connection, id: i64, remote_id: &str) -> AppResult<()> {
    conn.execute(
        "UPDATE travel_entries SET remote_id = ?1 WHERE id = ?2",
        params![remote_id, id],
    )?;
    Ok(())
}

pub fn delete_travel(conn: &Connection, id: i64) -> AppResult<bool> {
    let n = conn.execute("DELETE FROM travel_entries WHERE id = ?1", [id])?;
    Ok(n > 0)
}

pub fn delete_travel_by_remote_id(conn: &Connection, remote_id: &str) -> AppResult<bool> {
    let n = conn.execute("DELETE FROM travel_entries WHERE remote_id = ?1", [remote_id])?;
    Ok(n > 0)
}

pub fn list_travel(conn: &Connection) -> AppResult<Vec<TravelEntry>> {
    let mut stmt = conn.prepare("SELECT * FROM travel_entries ORDER BY start_ms ASC")?;
    let rows = stmt.query_map([], map_travel)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn unsynced_travel(conn: &Connection) -> AppResult<Vec<TravelEntry>> {
    let mut stmt =
        conn.prepare("SELECT * FROM travel_entries WHERE remote_id IS NULL ORDER BY id ASC")?;
    let rows = stmt.query_map([], map_travel)?;

    let mut out = Vec::new();
    for r in rows {
        out.push(r?);
    }
    Ok(out)
}

pub fn count_travel(conn: &Connection) -> AppResult<i64> {
    let n: i64 = conn.query_row("SELECT COUNT(*) FROM travel_entries", [], |row| row.get(0))?;
    Ok(n)
}
