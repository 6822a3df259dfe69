//! Reconciliation sweep: push every not-yet-mirrored local row to the
//! replica. Runs on reconnect or on demand. Idempotent, because a record's
//! remote id is linked as soon as its first push succeeds, so a second
//! sweep scans nothing new.

use crate::db::log::ttlog;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::record::RecordKind;
use crate::sync::engine::{SyncEngine, mirror_create_project, mirror_create_record};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Documents created on the replica by this sweep.
    pub pushed: usize,
    /// Records left unsynced: owner still unresolved, or the push failed.
    pub skipped: usize,
}

impl SyncEngine {
    /// Scan for records with no remote id and mirror them, owners first so
    /// that record owner references resolve within the same sweep.
    /// Per-record failures are isolated: logged, never aborting the sweep.
    pub fn reconcile_unsynced(&self) -> AppResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        let Some((replica, owner)) = self.remote_parts() else {
            // Local-only mode: everything stays pending.
            let (p, s, t) = self.unsynced_counts()?;
            report.skipped = p + s + t;
            return Ok(report);
        };
        let replica = replica.clone();
        let owner = owner.clone();

        for project in self
            .pool()
            .with_conn(|conn| queries::unsynced_projects(conn))?
        {
            match mirror_create_project(
                self.pool(),
                replica.as_ref(),
                &owner,
                self.echo(),
                project.id,
            ) {
                Ok(true) => report.pushed += 1,
                Ok(false) => {}
                Err(e) => {
                    report.skipped += 1;
                    self.log_sweep_failure(&format!("project/{}", project.id), &e)?;
                }
            }
        }

        for session in self
            .pool()
            .with_conn(|conn| queries::unsynced_sessions(conn))?
        {
            match mirror_create_record(
                self.pool(),
                replica.as_ref(),
                &owner,
                self.echo(),
                RecordKind::Session,
                session.id,
            ) {
                Ok(true) => report.pushed += 1,
                Ok(false) => {}
                Err(AppError::UnresolvedReference(_)) => report.skipped += 1,
                Err(e) => {
                    report.skipped += 1;
                    self.log_sweep_failure(&format!("sessions/{}", session.id), &e)?;
                }
            }
        }

        for travel in self
            .pool()
            .with_conn(|conn| queries::unsynced_travel(conn))?
        {
            match mirror_create_record(
                self.pool(),
                replica.as_ref(),
                &owner,
                self.echo(),
                RecordKind::Travel,
                travel.id,
            ) {
                Ok(true) => report.pushed += 1,
                Ok(false) => {}
                Err(AppError::UnresolvedReference(_)) => report.skipped += 1,
                Err(e) => {
                    report.skipped += 1;
                    self.log_sweep_failure(&format!("travelEntries/{}", travel.id), &e)?;
                }
            }
        }

        self.pool().with_conn(|conn| {
            ttlog(
                conn,
                "reconcile",
                "",
                &format!("pushed {} / skipped {}", report.pushed, report.skipped),
            )
        })?;

        Ok(report)
    }

    fn log_sweep_failure(&self, target: &str, err: &AppError) -> AppResult<()> {
        self.pool()
            .with_conn(|conn| ttlog(conn, "sync_error", target, &err.to_string()))
    }
}
