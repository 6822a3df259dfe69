//! The reconciliation engine.
//!
//! Local-first: every operation commits to SQLite before anything touches
//! the network. Remote mirroring runs on a background worker thread, so
//! callers are never blocked on network latency; a failed mirror leaves the
//! record unsynced and eligible for the reconciliation sweep. A subscription
//! listener feeds replica changes back into the local store, filtered
//! through echo suppression and identity linking.

use crate::db::log::ttlog;
use crate::db::pool::DbPool;
use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::project::Project;
use crate::models::record::{NewRecord, NewSession, NewTravelEntry, Record, RecordKind, RecordPatch};
use crate::remote::doc;
use crate::remote::replica::{
    ChangeBatch, ChangeKind, Collection, OwnerScope, RemoteChange, RemoteReplica,
};
use crate::sync::echo::EchoSuppressor;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, channel};
use std::thread::JoinHandle;
use std::time::Duration;

const DEFAULT_PROJECT_COLOR: &str = "#4a90d9";

impl RecordKind {
    pub fn collection(&self) -> Collection {
        match self {
            RecordKind::Session => Collection::Sessions,
            RecordKind::Travel => Collection::TravelEntries,
        }
    }
}

/// Work items for the mirror worker.
enum MirrorJob {
    CreateProject { local_id: i64 },
    Create { kind: RecordKind, local_id: i64 },
    Update { kind: RecordKind, local_id: i64 },
    Delete { collection: Collection, remote_id: String },
    SetStatus { doc: Value },
    ClearStatus,
    Flush(Sender<()>),
}

impl MirrorJob {
    fn target(&self) -> String {
        match self {
            MirrorJob::CreateProject { local_id } => format!("project/{local_id}"),
            MirrorJob::Create { kind, local_id } | MirrorJob::Update { kind, local_id } => {
                format!("{}/{local_id}", kind.collection().as_str())
            }
            MirrorJob::Delete {
                collection,
                remote_id,
            } => format!("{}/{remote_id}", collection.as_str()),
            MirrorJob::SetStatus { .. } | MirrorJob::ClearStatus => "status".into(),
            MirrorJob::Flush(_) => "flush".into(),
        }
    }
}

struct RemoteWiring {
    replica: Arc<dyn RemoteReplica>,
    owner: OwnerScope,
}

/// Handle of the running subscription listener. Per-engine state: multiple
/// engines (one per test, say) never collide through shared process state.
struct SyncHandle {
    stop: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

pub struct SyncEngine {
    pool: DbPool,
    remote: Option<RemoteWiring>,
    echo: Arc<EchoSuppressor>,
    mirror_tx: Option<Sender<MirrorJob>>,
    mirror_join: Option<JoinHandle<()>>,
    sub: Option<SyncHandle>,
}

impl SyncEngine {
    /// Engine without a remote backend: every operation works against the
    /// local store, remote mirroring is skipped.
    pub fn new_local_only(pool: DbPool) -> Self {
        Self {
            pool,
            remote: None,
            echo: Arc::new(EchoSuppressor::new()),
            mirror_tx: None,
            mirror_join: None,
            sub: None,
        }
    }

    pub fn new(pool: DbPool, replica: Arc<dyn RemoteReplica>, owner: OwnerScope) -> Self {
        let echo = Arc::new(EchoSuppressor::new());
        let (tx, rx) = channel();

        let worker_pool = pool.clone();
        let worker_replica = replica.clone();
        let worker_owner = owner.clone();
        let worker_echo = echo.clone();
        let join = std::thread::spawn(move || {
            mirror_worker(worker_pool, worker_replica, worker_owner, worker_echo, rx)
        });

        Self {
            pool,
            remote: Some(RemoteWiring { replica, owner }),
            echo,
            mirror_tx: Some(tx),
            mirror_join: Some(join),
            sub: None,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn is_remote_wired(&self) -> bool {
        self.remote.is_some()
    }

    pub(crate) fn echo(&self) -> &Arc<EchoSuppressor> {
        &self.echo
    }

    pub(crate) fn remote_parts(&self) -> Option<(&Arc<dyn RemoteReplica>, &OwnerScope)> {
        self.remote.as_ref().map(|w| (&w.replica, &w.owner))
    }

    fn enqueue(&self, job: MirrorJob) {
        if let Some(tx) = &self.mirror_tx {
            let _ = tx.send(job);
        }
    }

    // -----------------------------------------------------------------------
    // Projects
    // -----------------------------------------------------------------------

    pub fn create_project(&self, name: &str, color: Option<&str>) -> AppResult<Project> {
        let color = color.unwrap_or(DEFAULT_PROJECT_COLOR).to_string();
        let name = name.to_string();

        let project = self.pool.with_conn(|conn| {
            if queries::find_project_by_name(conn, &name)?.is_some() {
                return Err(AppError::Other(format!("project '{name}' already exists")));
            }
            let id = queries::insert_project(conn, &name, &color)?;
            queries::get_project(conn, id)?
                .ok_or_else(|| AppError::Other("inserted project vanished".into()))
        })?;

        self.enqueue(MirrorJob::CreateProject {
            local_id: project.id,
        });
        Ok(project)
    }

    // -----------------------------------------------------------------------
    // Records
    // -----------------------------------------------------------------------

    /// Create a record. The local insert must succeed and be visible before
    /// this returns; mirroring to the replica is a best-effort follow-up on
    /// the worker thread.
    pub fn create_record(&self, new: NewRecord) -> AppResult<Record> {
        let record = self.pool.with_conn(|conn| {
            if queries::get_project(conn, new.project_id())?.is_none() {
                return Err(AppError::UnknownProject(new.project_id().to_string()));
            }
            match &new {
                NewRecord::Session(s) => {
                    let id = queries::insert_session(conn, s)?;
                    queries::get_session(conn, id).map(|r| r.map(Record::Session))
                }
                NewRecord::Travel(t) => {
                    let id = queries::insert_travel(conn, t)?;
                    queries::get_travel(conn, id).map(|r| r.map(Record::Travel))
                }
            }
        })?;

        let record =
            record.ok_or_else(|| AppError::Other("inserted record vanished".into()))?;

        self.enqueue(MirrorJob::Create {
            kind: record.kind(),
            local_id: record.local_id(),
        });
        Ok(record)
    }

    /// Apply a patch locally, then mirror when the record is already known
    /// to the replica. The local update always stands even when mirroring
    /// fails.
    pub fn update_record(
        &self,
        kind: RecordKind,
        local_id: i64,
        patch: &RecordPatch,
    ) -> AppResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let remote_id = self.pool.with_conn(|conn| match kind {
            RecordKind::Session => {
                let mut s = queries::get_session(conn, local_id)?
                    .ok_or(AppError::RecordNotFound(local_id))?;
                patch.apply_to_session(&mut s);
                queries::update_session(conn, &s)?;
                Ok(s.remote_id)
            }
            RecordKind::Travel => {
                let mut t = queries::get_travel(conn, local_id)?
                    .ok_or(AppError::RecordNotFound(local_id))?;
                patch.apply_to_travel(&mut t);
                queries::update_travel(conn, &t)?;
                Ok(t.remote_id)
            }
        })?;

        if remote_id.is_some() {
            self.enqueue(MirrorJob::Update { kind, local_id });
        }
        Ok(())
    }

    /// Delete locally first; the remote deletion is fire-and-forget and can
    /// never block or roll back the local one.
    pub fn delete_record(&self, kind: RecordKind, local_id: i64) -> AppResult<()> {
        let remote_id = self.pool.with_conn(|conn| match kind {
            RecordKind::Session => {
                let s = queries::get_session(conn, local_id)?
                    .ok_or(AppError::RecordNotFound(local_id))?;
                queries::delete_session(conn, local_id)?;
                Ok(s.remote_id)
            }
            RecordKind::Travel => {
                let t = queries::get_travel(conn, local_id)?
                    .ok_or(AppError::RecordNotFound(local_id))?;
                queries::delete_travel(conn, local_id)?;
                Ok(t.remote_id)
            }
        })?;

        if let Some(remote_id) = remote_id {
            self.enqueue(MirrorJob::Delete {
                collection: kind.collection(),
                remote_id,
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Running-session status document
    // -----------------------------------------------------------------------

    pub fn publish_running_status(
        &self,
        start_ms: i64,
        project_name: &str,
        note: Option<&str>,
    ) {
        self.enqueue(MirrorJob::SetStatus {
            doc: doc::encode_running_status(start_ms, project_name, note),
        });
    }

    pub fn clear_running_status(&self) {
        self.enqueue(MirrorJob::ClearStatus);
    }

    // -----------------------------------------------------------------------
    // Subscription lifecycle
    // -----------------------------------------------------------------------

    /// Open the replica subscription. No-op when already started or in
    /// local-only mode.
    pub fn start_sync(&mut self) -> AppResult<()> {
        let Some(wiring) = &self.remote else {
            return Ok(());
        };
        if self.sub.is_some() {
            return Ok(());
        }

        let stream = wiring.replica.subscribe(&wiring.owner)?;
        let stop = Arc::new(AtomicBool::new(false));
        let pool = self.pool.clone();
        let echo = self.echo.clone();
        let stop_flag = stop.clone();
        let join = std::thread::spawn(move || listener_loop(pool, echo, stream, stop_flag));

        self.sub = Some(SyncHandle { stop, join });
        Ok(())
    }

    /// Close the subscription and join the listener, so no change is applied
    /// afterwards. No-op when not started.
    pub fn stop_sync(&mut self) {
        if let Some(handle) = self.sub.take() {
            handle.stop.store(true, Ordering::Relaxed);
            let _ = handle.join.join();
        }
    }

    /// Wait for every queued mirror job to finish. Used by tests and before
    /// process exit.
    pub fn flush(&self) {
        if let Some(tx) = &self.mirror_tx {
            let (ack_tx, ack_rx) = channel();
            if tx.send(MirrorJob::Flush(ack_tx)).is_ok() {
                let _ = ack_rx.recv();
            }
        }
    }

    /// Records still awaiting a remote identity: (projects, sessions, travel).
    pub fn unsynced_counts(&self) -> AppResult<(usize, usize, usize)> {
        self.pool.with_conn(|conn| {
            Ok((
                queries::unsynced_projects(conn)?.len(),
                queries::unsynced_sessions(conn)?.len(),
                queries::unsynced_travel(conn)?.len(),
            ))
        })
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.stop_sync();
        self.mirror_tx.take();
        if let Some(join) = self.mirror_join.take() {
            let _ = join.join();
        }
    }
}

// ---------------------------------------------------------------------------
// Mirror worker
// ---------------------------------------------------------------------------

fn mirror_worker(
    pool: DbPool,
    replica: Arc<dyn RemoteReplica>,
    owner: OwnerScope,
    echo: Arc<EchoSuppressor>,
    rx: Receiver<MirrorJob>,
) {
    while let Ok(job) = rx.recv() {
        if let MirrorJob::Flush(ack) = job {
            let _ = ack.send(());
            continue;
        }

        let target = job.target();
        if let Err(e) = run_mirror_job(&pool, replica.as_ref(), &owner, &echo, job) {
            // Recoverable failures leave the record unsynced for the sweep;
            // anything else is a genuine error.
            let op = if e.is_recoverable() {
                "sync_deferred"
            } else {
                "sync_error"
            };
            let _ = pool.with_conn(|conn| ttlog(conn, op, &target, &e.to_string()));
        }
    }
}

fn run_mirror_job(
    pool: &DbPool,
    replica: &dyn RemoteReplica,
    owner: &OwnerScope,
    echo: &EchoSuppressor,
    job: MirrorJob,
) -> AppResult<()> {
    match job {
        MirrorJob::CreateProject { local_id } => {
            mirror_create_project(pool, replica, owner, echo, local_id)?;
            Ok(())
        }
        MirrorJob::Create { kind, local_id } => {
            mirror_create_record(pool, replica, owner, echo, kind, local_id)?;
            Ok(())
        }
        MirrorJob::Update { kind, local_id } => {
            mirror_update_record(pool, replica, owner, kind, local_id)
        }
        MirrorJob::Delete {
            collection,
            remote_id,
        } => replica.delete(owner, collection, &remote_id),
        MirrorJob::SetStatus { doc } => replica.set_running_status(owner, &doc),
        MirrorJob::ClearStatus => replica.clear_running_status(owner),
        MirrorJob::Flush(_) => Ok(()),
    }
}

/// Push a local project to the replica and link the returned id.
/// Returns false when there is nothing to do (row gone or already synced).
pub(crate) fn mirror_create_project(
    pool: &DbPool,
    replica: &dyn RemoteReplica,
    owner: &OwnerScope,
    echo: &EchoSuppressor,
    local_id: i64,
) -> AppResult<bool> {
    let Some(project) = pool.with_conn(|conn| queries::get_project(conn, local_id))? else {
        return Ok(false);
    };
    if project.remote_id.is_some() {
        return Ok(false);
    }

    let value = doc::encode_project(&project);
    let remote_id = replica.create(owner, Collection::Projects, &value)?;
    echo.mark_pending(&remote_id);
    pool.with_conn(|conn| queries::set_project_remote_id(conn, local_id, &remote_id))?;
    Ok(true)
}

/// Push a local record to the replica and link the returned id.
/// The owner reference must already be mirrored; otherwise the record stays
/// unsynced and the caller decides whether that is a skip or an error.
pub(crate) fn mirror_create_record(
    pool: &DbPool,
    replica: &dyn RemoteReplica,
    owner: &OwnerScope,
    echo: &EchoSuppressor,
    kind: RecordKind,
    local_id: i64,
) -> AppResult<bool> {
    match kind {
        RecordKind::Session => {
            let Some(session) = pool.with_conn(|conn| queries::get_session(conn, local_id))?
            else {
                return Ok(false);
            };
            if session.remote_id.is_some() {
                return Ok(false);
            }

            let project_remote =
                pool.with_conn(|conn| queries::project_remote_id(conn, session.project_id))?;
            let Some(project_remote) = project_remote else {
                return Err(AppError::UnresolvedReference(format!(
                    "project {}",
                    session.project_id
                )));
            };

            let value = doc::encode_session(&session, &project_remote);
            let remote_id = replica.create(owner, Collection::Sessions, &value)?;
            echo.mark_pending(&remote_id);
            pool.with_conn(|conn| queries::set_session_remote_id(conn, local_id, &remote_id))?;
            Ok(true)
        }
        RecordKind::Travel => {
            let Some(travel) = pool.with_conn(|conn| queries::get_travel(conn, local_id))?
            else {
                return Ok(false);
            };
            if travel.remote_id.is_some() {
                return Ok(false);
            }

            let project_remote =
                pool.with_conn(|conn| queries::project_remote_id(conn, travel.project_id))?;
            let Some(project_remote) = project_remote else {
                return Err(AppError::UnresolvedReference(format!(
                    "project {}",
                    travel.project_id
                )));
            };

            let value = doc::encode_travel(&travel, &project_remote);
            let remote_id = replica.create(owner, Collection::TravelEntries, &value)?;
            echo.mark_pending(&remote_id);
            pool.with_conn(|conn| queries::set_travel_remote_id(conn, local_id, &remote_id))?;
            Ok(true)
        }
    }
}

fn mirror_update_record(
    pool: &DbPool,
    replica: &dyn RemoteReplica,
    owner: &OwnerScope,
    kind: RecordKind,
    local_id: i64,
) -> AppResult<()> {
    match kind {
        RecordKind::Session => {
            let Some(session) = pool.with_conn(|conn| queries::get_session(conn, local_id))?
            else {
                return Ok(());
            };
            let Some(remote_id) = session.remote_id.clone() else {
                // Not mirrored yet; the reconciliation sweep will push the
                // current state when it creates the document.
                return Ok(());
            };

            let project_remote =
                pool.with_conn(|conn| queries::project_remote_id(conn, session.project_id))?;
            let Some(project_remote) = project_remote else {
                return Err(AppError::UnresolvedReference(format!(
                    "project {}",
                    session.project_id
                )));
            };

            let value = doc::encode_session(&session, &project_remote);
            replica.update(owner, Collection::Sessions, &remote_id, &value)
        }
        RecordKind::Travel => {
            let Some(travel) = pool.with_conn(|conn| queries::get_travel(conn, local_id))?
            else {
                return Ok(());
            };
            let Some(remote_id) = travel.remote_id.clone() else {
                return Ok(());
            };

            let project_remote =
                pool.with_conn(|conn| queries::project_remote_id(conn, travel.project_id))?;
            let Some(project_remote) = project_remote else {
                return Err(AppError::UnresolvedReference(format!(
                    "project {}",
                    travel.project_id
                )));
            };

            let value = doc::encode_travel(&travel, &project_remote);
            replica.update(owner, Collection::TravelEntries, &remote_id, &value)
        }
    }
}

// ---------------------------------------------------------------------------
// Subscription listener
// ---------------------------------------------------------------------------

fn listener_loop(
    pool: DbPool,
    echo: Arc<EchoSuppressor>,
    stream: std::sync::mpsc::Receiver<ChangeBatch>,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::Relaxed) {
        match stream.recv_timeout(Duration::from_millis(50)) {
            Ok(batch) => {
                if let Err(e) = apply_batch(&pool, &echo, &batch) {
                    let _ = pool.with_conn(|conn| {
                        ttlog(conn, "sync_error", "apply_batch", &e.to_string())
                    });
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Apply one change batch as a single local transaction, in arrival order.
/// Malformed or unresolvable documents are skipped and logged; only storage
/// failures abort (and roll back) the batch.
pub fn apply_batch(pool: &DbPool, echo: &EchoSuppressor, batch: &ChangeBatch) -> AppResult<()> {
    pool.with_conn(|conn| {
        let tx = conn.transaction()?;
        for change in &batch.changes {
            apply_change(&tx, echo, change)?;
        }
        tx.commit()?;
        Ok(())
    })
}

fn apply_change(
    conn: &rusqlite::Connection,
    echo: &EchoSuppressor,
    change: &RemoteChange,
) -> AppResult<()> {
    match change.collection {
        Collection::Projects => apply_project_change(conn, echo, change),
        Collection::Sessions => apply_session_change(conn, echo, change),
        Collection::TravelEntries => apply_travel_change(conn, echo, change),
    }
}

fn skip(conn: &rusqlite::Connection, change: &RemoteChange, reason: &str) -> AppResult<()> {
    ttlog(
        conn,
        "sync_skip",
        &format!("{}/{}", change.collection.as_str(), change.remote_id),
        reason,
    )
}

fn apply_project_change(
    conn: &rusqlite::Connection,
    echo: &EchoSuppressor,
    change: &RemoteChange,
) -> AppResult<()> {
    match change.kind {
        ChangeKind::Added => {
            if echo.consume_if_pending(&change.remote_id) {
                return Ok(());
            }
            let Some(value) = &change.doc else {
                return skip(conn, change, "added event without document");
            };
            let decoded = match doc::decode_project(value) {
                Ok(d) => d,
                Err(e) => return skip(conn, change, &e.to_string()),
            };

            if queries::find_project_by_remote_id(conn, &change.remote_id)?.is_some() {
                return Ok(());
            }

            // A project created offline has no remote id yet; link it by
            // name instead of inserting a second copy.
            match queries::find_project_by_name(conn, &decoded.name)? {
                Some(local) if local.remote_id.is_none() => {
                    queries::set_project_remote_id(conn, local.id, &change.remote_id)?;
                    queries::update_project_from_remote(
                        conn,
                        local.id,
                        &decoded.name,
                        &decoded.color,
                        decoded.archived,
                    )
                }
                _ => {
                    queries::insert_project_from_remote(
                        conn,
                        &change.remote_id,
                        &decoded.name,
                        &decoded.color,
                        decoded.archived,
                        &decoded.created_at,
                    )?;
                    Ok(())
                }
            }
        }
        ChangeKind::Modified => {
            let Some(value) = &change.doc else {
                return skip(conn, change, "modified event without document");
            };
            let decoded = match doc::decode_project(value) {
                Ok(d) => d,
                Err(e) => return skip(conn, change, &e.to_string()),
            };
            match queries::find_project_by_remote_id(conn, &change.remote_id)? {
                Some(local) => queries::update_project_from_remote(
                    conn,
                    local.id,
                    &decoded.name,
                    &decoded.color,
                    decoded.archived,
                ),
                None => skip(conn, change, "modified unknown project"),
            }
        }
        ChangeKind::Removed => {
            match queries::find_project_by_remote_id(conn, &change.remote_id)? {
                Some(local) => queries::delete_project(conn, local.id),
                None => Ok(()),
            }
        }
    }
}

fn apply_session_change(
    conn: &rusqlite::Connection,
    echo: &EchoSuppressor,
    change: &RemoteChange,
) -> AppResult<()> {
    match change.kind {
        ChangeKind::Added => {
            if echo.consume_if_pending(&change.remote_id) {
                return Ok(());
            }
            let Some(value) = &change.doc else {
                return skip(conn, change, "added event without document");
            };
            let decoded = match doc::decode_session(value) {
                Ok(d) => d,
                Err(e) => return skip(conn, change, &e.to_string()),
            };

            if queries::find_session_by_remote_id(conn, &change.remote_id)?.is_some() {
                return Ok(());
            }

            let Some(project) =
                queries::find_project_by_remote_id(conn, &decoded.project_remote_id)?
            else {
                return skip(conn, change, "owner project not known locally yet");
            };

            // Logical duplicate: a record created offline, pushed by the
            // sweep, and now echoed back late. Link, never duplicate.
            match queries::find_unsynced_session_match(conn, project.id, decoded.start_ms)? {
                Some(local_id) => {
                    queries::set_session_remote_id(conn, local_id, &change.remote_id)
                }
                None => {
                    queries::insert_session_from_remote(
                        conn,
                        &change.remote_id,
                        &NewSession {
                            project_id: project.id,
                            start_ms: decoded.start_ms,
                            stop_ms: decoded.stop_ms,
                            duration_ms: decoded.duration_ms,
                            note: decoded.note,
                        },
                        &decoded.created_at,
                    )?;
                    Ok(())
                }
            }
        }
        ChangeKind::Modified => {
            let Some(value) = &change.doc else {
                return skip(conn, change, "modified event without document");
            };
            let decoded = match doc::decode_session(value) {
                Ok(d) => d,
                Err(e) => return skip(conn, change, &e.to_string()),
            };
            let Some(mut local) = queries::find_session_by_remote_id(conn, &change.remote_id)?
            else {
                return skip(conn, change, "modified unknown session");
            };

            match queries::find_project_by_remote_id(conn, &decoded.project_remote_id)? {
                Some(project) => local.project_id = project.id,
                // Owner doc not seen yet: keep the existing local reference.
                None => skip(conn, change, "owner project not known locally, kept local ref")?,
            }
            local.start_ms = decoded.start_ms;
            local.stop_ms = decoded.stop_ms;
            local.duration_ms = decoded.duration_ms;
            local.note = decoded.note;
            queries::update_session(conn, &local)
        }
        ChangeKind::Removed => {
            queries::delete_session_by_remote_id(conn, &change.remote_id)?;
            Ok(())
        }
    }
}

fn apply_travel_change(
    conn: &rusqlite::Connection,
    echo: &EchoSuppressor,
    change: &RemoteChange,
) -> AppResult<()> {
    match change.kind {
        ChangeKind::Added => {
            if echo.consume_if_pending(&change.remote_id) {
                return Ok(());
            }
            let Some(value) = &change.doc else {
                return skip(conn, change, "added event without document");
            };
            let decoded = match doc::decode_travel(value) {
                Ok(d) => d,
                Err(e) => return skip(conn, change, &e.to_string()),
            };

            if queries::find_travel_by_remote_id(conn, &change.remote_id)?.is_some() {
                return Ok(());
            }

            let Some(project) =
                queries::find_project_by_remote_id(conn, &decoded.project_remote_id)?
            else {
                return skip(conn, change, "owner project not known locally yet");
            };

            match queries::find_unsynced_travel_match(
                conn,
                project.id,
                decoded.start_ms,
                decoded.distance_km,
            )? {
                Some(local_id) => {
                    queries::set_travel_remote_id(conn, local_id, &change.remote_id)
                }
                None => {
                    queries::insert_travel_from_remote(
                        conn,
                        &change.remote_id,
                        &NewTravelEntry {
                            project_id: project.id,
                            start_ms: decoded.start_ms,
                            distance_km: decoded.distance_km,
                            note: decoded.note,
                        },
                        &decoded.created_at,
                    )?;
                    Ok(())
                }
            }
        }
        ChangeKind::Modified => {
            let Some(value) = &change.doc else {
                return skip(conn, change, "modified event without document");
            };
            let decoded = match doc::decode_travel(value) {
                Ok(d) => d,
                Err(e) => return skip(conn, change, &e.to_string()),
            };
            let Some(mut local) = queries::find_travel_by_remote_id(conn, &change.remote_id)?
            else {
                return skip(conn, change, "modified unknown travel entry");
            };

            match queries::find_project_by_remote_id(conn, &decoded.project_remote_id)? {
                Some(project) => local.project_id = project.id,
                None => skip(conn, change, "owner project not known locally, kept local ref")?,
            }
            local.start_ms = decoded.start_ms;
            local.distance_km = decoded.distance_km;
            local.note = decoded.note;
            queries::update_travel(conn, &local)
        }
        ChangeKind::Removed => {
            queries::delete_travel_by_remote_id(conn, &change.remote_id)?;
            Ok(())
        }
    }
}
