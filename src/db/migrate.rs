use crate::ui::messages::success;
use rusqlite::{Connection, OptionalExtension, Result};

/// Ensure that the `log` table exists. It doubles as the migration ledger:
/// applied migrations are recorded as `migration_applied` rows.
fn ensure_log_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            id        INTEGER PRIMARY KEY AUTOINCREMENT,
            date      TEXT NOT NULL,
            operation TEXT NOT NULL,
            target    TEXT DEFAULT '',
            message   TEXT NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")?;
    let exists: Option<String> = stmt.query_row([name], |row| row.get(0)).optional()?;
    Ok(exists.is_some())
}

fn migration_applied(conn: &Connection, version: &str) -> Result<bool> {
    let mut chk = conn.prepare(
        "SELECT 1 FROM log
         WHERE operation = 'migration_applied' AND target = ?1
         LIMIT 1",
    )?;
    Ok(chk.query_row([version], |_| Ok(())).optional()?.is_some())
}

fn mark_migration(conn: &Connection, version: &str, message: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO log (date, operation, target, message)
         VALUES (datetime('now'), 'migration_applied', ?1, ?2)",
        [version, message],
    )?;
    Ok(())
}

/// Create every table of the modern schema. Each syncable table carries an
/// optional `remote_id` column; the UNIQUE index enforces that at most one
/// local row maps to a given remote document.
fn create_base_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            remote_id   TEXT UNIQUE,
            name        TEXT NOT NULL,
            color       TEXT NOT NULL DEFAULT '#4a90d9',
            archived    INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            remote_id   TEXT UNIQUE,
            project_id  INTEGER NOT NULL REFERENCES projects(id),
            start_ms    INTEGER NOT NULL,
            stop_ms     INTEGER,
            duration_ms INTEGER,
            note        TEXT,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_start ON sessions(start_ms);
        CREATE INDEX IF NOT EXISTS idx_sessions_project ON sessions(project_id);

        CREATE TABLE IF NOT EXISTS travel_entries (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            remote_id   TEXT UNIQUE,
            project_id  INTEGER NOT NULL REFERENCES projects(id),
            start_ms    INTEGER NOT NULL,
            distance_km REAL NOT NULL,
            note        TEXT,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_travel_start ON travel_entries(start_ms);

        CREATE TABLE IF NOT EXISTS running_session (
            id                INTEGER PRIMARY KEY CHECK (id = 1),
            project_id        INTEGER NOT NULL,
            start_ms          INTEGER NOT NULL,
            base_duration_ms  INTEGER NOT NULL DEFAULT 0,
            is_paused         INTEGER NOT NULL DEFAULT 0,
            pause_start_ms    INTEGER,
            total_paused_ms   INTEGER NOT NULL DEFAULT 0,
            continued_from_id INTEGER,
            note              TEXT,
            created_at        TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS settings (
            id                         INTEGER PRIMARY KEY CHECK (id = 1),
            default_project_id         INTEGER,
            long_running_threshold_min INTEGER NOT NULL DEFAULT 480
        );

        CREATE TABLE IF NOT EXISTS predefined_notes (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            remote_id  TEXT UNIQUE,
            text       TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        INSERT OR IGNORE INTO settings (id) VALUES (1);
        "#,
    )?;
    Ok(())
}

/// Older databases predate continue-from and lack the back-reference column.
fn migrate_add_continued_from(conn: &Connection) -> Result<()> {
    let version = "20250420_0007_add_continued_from";

    if migration_applied(conn, version)? {
        return Ok(());
    }

    let mut stmt = conn.prepare("PRAGMA table_info('running_session')")?;
    let cols = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut has_column = false;
    for c in cols {
        if c? == "continued_from_id" {
            has_column = true;
            break;
        }
    }

    if !has_column {
        conn.execute(
            "ALTER TABLE running_session ADD COLUMN continued_from_id INTEGER;",
            [],
        )?;
        success("Added 'continued_from_id' column to running_session.");
    }

    mark_migration(conn, version, "Added continued_from_id to running_session")?;
    Ok(())
}

/// Public entry point: run all pending migrations.
///
/// Invoked from db::initialize::init_db().
pub fn run_pending_migrations(conn: &Connection) -> Result<()> {
    ensure_log_table(conn)?;

    let fresh = !table_exists(conn, "sessions")?;

    create_base_schema(conn)?;

    if fresh {
        mark_migration(conn, "20250301_0001_base_schema", "Created base schema")?;
    } else {
        migrate_add_continued_from(conn)?;
    }

    Ok(())
}
