//! Running-timer state machine.
//!
//! States: Idle (no row) -> Running <-> Paused -> Idle again via stop
//! (producing a completed session) or discard (producing nothing). The
//! single running_session row persists only timestamps; elapsed time is
//! derived from the wall clock on every query, which keeps it correct
//! across process restarts.
//!
//! Every public operation has an `*_at(now_ms)` twin so the arithmetic is
//! testable against a fixed clock.

use crate::db::log::ttlog;
use crate::db::running;
use crate::errors::{AppError, AppResult};
use crate::models::record::{NewRecord, NewSession, Record, RecordKind, Session};
use crate::models::running_session::RunningSession;
use crate::sync::engine::SyncEngine;
use crate::utils::time::{created_at_now, format_ms_local, now_ms};

pub struct Timer;

impl Timer {
    // -----------------------------------------------------------------------
    // start
    // -----------------------------------------------------------------------

    pub fn start(
        engine: &SyncEngine,
        project_id: i64,
        note: Option<String>,
    ) -> AppResult<RunningSession> {
        Self::start_at(engine, project_id, note, now_ms())
    }

    pub fn start_at(
        engine: &SyncEngine,
        project_id: i64,
        note: Option<String>,
        now: i64,
    ) -> AppResult<RunningSession> {
        let project = engine
            .pool()
            .with_conn(|conn| crate::db::queries::get_project(conn, project_id))?
            .ok_or_else(|| AppError::UnknownProject(project_id.to_string()))?;

        let rs = RunningSession {
            project_id,
            start_ms: now,
            base_duration_ms: 0,
            is_paused: false,
            pause_start_ms: None,
            total_paused_ms: 0,
            continued_from_id: None,
            note,
            created_at: created_at_now(),
        };

        engine.pool().with_conn(|conn| {
            if let Some(existing) = running::get_running_session(conn)? {
                return Err(AppError::AlreadyRunning(format_ms_local(existing.start_ms)));
            }
            running::replace_running_session(conn, &rs)?;
            ttlog(conn, "timer_start", &project.name, "Timer started")
        })?;

        engine.publish_running_status(rs.start_ms, &project.name, rs.note.as_deref());
        Ok(rs)
    }

    // -----------------------------------------------------------------------
    // pause / resume
    // -----------------------------------------------------------------------

    pub fn pause(engine: &SyncEngine) -> AppResult<()> {
        Self::pause_at(engine, now_ms())
    }

    pub fn pause_at(engine: &SyncEngine, now: i64) -> AppResult<()> {
        engine.pool().with_conn(|conn| {
            let rs = running::get_running_session(conn)?.ok_or(AppError::NotRunning)?;
            if rs.is_paused {
                // Pausing a paused timer is a no-op, not an error.
                return Ok(());
            }
            running::update_running_pause(conn, true, Some(now), rs.total_paused_ms)
        })
    }

    pub fn resume(engine: &SyncEngine) -> AppResult<()> {
        Self::resume_at(engine, now_ms())
    }

    pub fn resume_at(engine: &SyncEngine, now: i64) -> AppResult<()> {
        engine.pool().with_conn(|conn| {
            let rs = running::get_running_session(conn)?.ok_or(AppError::NotRunning)?;
            let Some(pause_start) = rs.pause_start_ms.filter(|_| rs.is_paused) else {
                return Err(AppError::NotRunning);
            };
            let total = rs.total_paused_ms + (now - pause_start);
            running::update_running_pause(conn, false, None, total)
        })
    }

    // -----------------------------------------------------------------------
    // queries
    // -----------------------------------------------------------------------

    pub fn current(engine: &SyncEngine) -> AppResult<Option<RunningSession>> {
        engine
            .pool()
            .with_conn(|conn| running::get_running_session(conn))
    }

    /// Elapsed working time of the in-flight timer. Always recomputed from
    /// the persisted timestamps, never cached.
    pub fn elapsed(engine: &SyncEngine) -> AppResult<i64> {
        Self::elapsed_at(engine, now_ms())
    }

    pub fn elapsed_at(engine: &SyncEngine, now: i64) -> AppResult<i64> {
        let rs = Self::current(engine)?.ok_or(AppError::NotRunning)?;
        Ok(rs.elapsed_at(now))
    }

    // -----------------------------------------------------------------------
    // stop / discard
    // -----------------------------------------------------------------------

    /// Convert the running timer into a completed session record.
    pub fn stop(engine: &SyncEngine) -> AppResult<Session> {
        Self::stop_at(engine, now_ms())
    }

    pub fn stop_at(engine: &SyncEngine, now: i64) -> AppResult<Session> {
        let rs = Self::current(engine)?.ok_or(AppError::NotRunning)?;
        let duration = rs.elapsed_at(now);

        let record = engine.create_record(NewRecord::Session(NewSession {
            project_id: rs.project_id,
            start_ms: rs.start_ms,
            stop_ms: Some(now),
            duration_ms: Some(duration),
            note: rs.note.clone(),
        }))?;

        engine.pool().with_conn(|conn| {
            running::clear_running_session(conn)?;
            ttlog(
                conn,
                "timer_stop",
                &record.local_id().to_string(),
                "Timer stopped",
            )
        })?;
        engine.clear_running_status();

        match record {
            Record::Session(s) => Ok(s),
            Record::Travel(_) => Err(AppError::Other("stop produced a non-session".into())),
        }
    }

    /// Drop the running timer without producing any record. Irreversible.
    pub fn discard(engine: &SyncEngine) -> AppResult<()> {
        let cleared = engine.pool().with_conn(|conn| {
            let cleared = running::clear_running_session(conn)?;
            if cleared {
                ttlog(conn, "timer_discard", "", "Timer discarded")?;
            }
            Ok(cleared)
        })?;

        if !cleared {
            return Err(AppError::NotRunning);
        }
        engine.clear_running_status();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // continue-from
    // -----------------------------------------------------------------------

    /// Re-open a completed session: delete it and start a timer that
    /// inherits its start timestamp and accumulated duration.
    pub fn continue_from(engine: &SyncEngine, local_id: i64) -> AppResult<RunningSession> {
        Self::continue_from_at(engine, local_id, now_ms())
    }

    pub fn continue_from_at(
        engine: &SyncEngine,
        local_id: i64,
        now: i64,
    ) -> AppResult<RunningSession> {
        if let Some(existing) = Self::current(engine)? {
            return Err(AppError::AlreadyRunning(format_ms_local(existing.start_ms)));
        }

        let session = engine
            .pool()
            .with_conn(|conn| crate::db::queries::get_session(conn, local_id))?
            .ok_or(AppError::RecordNotFound(local_id))?;

        let project = engine
            .pool()
            .with_conn(|conn| crate::db::queries::get_project(conn, session.project_id))?
            .ok_or_else(|| AppError::UnknownProject(session.project_id.to_string()))?;

        let rs = RunningSession {
            project_id: session.project_id,
            // The logical work period began when the original entry did.
            start_ms: session.start_ms,
            base_duration_ms: session.duration_ms.unwrap_or(0),
            is_paused: false,
            pause_start_ms: None,
            // The span between the original start and now is already fully
            // accounted for by base_duration_ms; booking it as paused time
            // makes elapsed() resume exactly at the inherited duration.
            total_paused_ms: (now - session.start_ms).max(0),
            continued_from_id: Some(session.id),
            note: session.note.clone(),
            created_at: created_at_now(),
        };

        // Two steps that must act as one logical unit: if the deletion
        // succeeds but the insert fails we are left with neither the old
        // record nor a timer, and that partial state is surfaced loudly.
        engine.delete_record(RecordKind::Session, local_id)?;

        engine
            .pool()
            .with_conn(|conn| {
                running::replace_running_session(conn, &rs)?;
                ttlog(
                    conn,
                    "timer_continue",
                    &local_id.to_string(),
                    "Continued from entry",
                )
            })
            .map_err(|e| {
                AppError::LostEntry(format!(
                    "session {local_id} was deleted but the timer could not start: {e}"
                ))
            })?;

        engine.publish_running_status(rs.start_ms, &project.name, rs.note.as_deref());
        Ok(rs)
    }
}
