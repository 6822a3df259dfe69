//! Reconciliation engine: offline creation, sweep idempotence, echo
//! suppression, logical-duplicate linking and remote-change merging.

mod common;

use std::sync::Arc;
use std::time::Duration;
use tempolog::db::queries;
use tempolog::models::record::{NewRecord, NewSession, NewTravelEntry, RecordKind, RecordPatch};
use tempolog::remote::memory::MemoryReplica;
use tempolog::remote::replica::{ChangeBatch, ChangeKind, Collection, OwnerScope, RemoteChange};
use tempolog::sync::echo::EchoSuppressor;
use tempolog::sync::engine::{SyncEngine, apply_batch};

fn new_session(project_id: i64, start_ms: i64) -> NewRecord {
    NewRecord::Session(NewSession {
        project_id,
        start_ms,
        stop_ms: Some(start_ms + 60_000),
        duration_ms: Some(60_000),
        note: None,
    })
}

fn session_doc(project_remote_id: &str, start_ms: i64) -> serde_json::Value {
    serde_json::json!({
        "projectId": project_remote_id,
        "start": start_ms,
        "stop": start_ms + 60_000,
        "duration": 60_000,
        "note": "from another device",
        "createdAt": "2025-08-04T10:00:00+00:00",
    })
}

/// Poll until `f` returns true or the deadline passes.
fn wait_until<F: Fn() -> bool>(timeout: Duration, f: F) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    loop {
        if f() {
            return true;
        }
        if std::time::Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

// ---------------------------------------------------------------------------
// Offline creation and the reconciliation sweep
// ---------------------------------------------------------------------------

#[test]
fn offline_records_sync_exactly_once_after_reconnect() {
    let (engine, replica, owner) = common::engine_with_replica();
    replica.set_online(false);

    let project = engine.create_project("acme", None).unwrap();
    engine.create_record(new_session(project.id, 1_000)).unwrap();
    engine
        .create_record(NewRecord::Travel(NewTravelEntry {
            project_id: project.id,
            start_ms: 2_000,
            distance_km: 42.5,
            note: None,
        }))
        .unwrap();
    engine.flush();

    // nothing reached the replica, everything is a reconciliation candidate
    assert_eq!(replica.count(&owner, Collection::Projects), 0);
    assert_eq!(replica.count(&owner, Collection::Sessions), 0);
    assert_eq!(engine.unsynced_counts().unwrap(), (1, 1, 1));

    replica.set_online(true);
    let report = engine.reconcile_unsynced().unwrap();
    assert_eq!(report.pushed, 3);
    assert_eq!(report.skipped, 0);

    assert_eq!(replica.count(&owner, Collection::Projects), 1);
    assert_eq!(replica.count(&owner, Collection::Sessions), 1);
    assert_eq!(replica.count(&owner, Collection::TravelEntries), 1);
    assert_eq!(engine.unsynced_counts().unwrap(), (0, 0, 0));

    // every local row carries exactly one remote id now
    let sessions = engine
        .pool()
        .with_conn(|conn| queries::list_sessions(conn))
        .unwrap();
    assert!(sessions.iter().all(|s| s.remote_id.is_some()));
}

#[test]
fn double_reconcile_creates_no_duplicates() {
    let (engine, replica, owner) = common::engine_with_replica();
    replica.set_online(false);

    let project = engine.create_project("acme", None).unwrap();
    engine.create_record(new_session(project.id, 1_000)).unwrap();
    engine.flush();

    replica.set_online(true);
    let first = engine.reconcile_unsynced().unwrap();
    let second = engine.reconcile_unsynced().unwrap();

    assert_eq!(first.pushed, 2);
    assert_eq!(second.pushed, 0);
    assert_eq!(replica.count(&owner, Collection::Projects), 1);
    assert_eq!(replica.count(&owner, Collection::Sessions), 1);
}

#[test]
fn offline_update_is_pushed_by_the_sweep() {
    let (engine, replica, owner) = common::engine_with_replica();
    replica.set_online(false);

    let project = engine.create_project("acme", None).unwrap();
    let record = engine.create_record(new_session(project.id, 1_000)).unwrap();
    let patch = RecordPatch {
        stop_ms: Some(31_000),
        note: Some("edited offline".into()),
        ..Default::default()
    };
    engine
        .update_record(RecordKind::Session, record.local_id(), &patch)
        .unwrap();
    engine.flush();

    replica.set_online(true);
    engine.reconcile_unsynced().unwrap();

    // the document created by the sweep carries the post-update state
    let session = engine
        .pool()
        .with_conn(|conn| queries::get_session(conn, record.local_id()))
        .unwrap()
        .unwrap();
    let doc = replica
        .get_doc(&owner, Collection::Sessions, session.remote_id.as_ref().unwrap())
        .unwrap();
    assert_eq!(doc["duration"], 30_000);
    assert_eq!(doc["note"], "edited offline");
}

#[test]
fn reconcile_while_offline_skips_without_erroring() {
    let (engine, replica, _owner) = common::engine_with_replica();
    replica.set_online(false);

    let project = engine.create_project("acme", None).unwrap();
    engine.create_record(new_session(project.id, 1_000)).unwrap();
    engine.flush();

    let report = engine.reconcile_unsynced().unwrap();
    assert_eq!(report.pushed, 0);
    assert!(report.skipped >= 1);
    assert_eq!(engine.unsynced_counts().unwrap(), (1, 1, 0));
}

// ---------------------------------------------------------------------------
// Optimistic mirroring
// ---------------------------------------------------------------------------

#[test]
fn create_mirrors_in_the_background_when_online() {
    let (engine, replica, owner) = common::engine_with_replica();

    let project = engine.create_project("acme", None).unwrap();
    let record = engine.create_record(new_session(project.id, 5_000)).unwrap();

    // the local insert is visible immediately, before any mirroring
    assert!(record.remote_id().is_none());

    engine.flush();
    let session = engine
        .pool()
        .with_conn(|conn| queries::get_session(conn, record.local_id()))
        .unwrap()
        .unwrap();
    let remote_id = session.remote_id.expect("linked after mirror");

    let doc = replica
        .get_doc(&owner, Collection::Sessions, &remote_id)
        .expect("document exists");
    assert_eq!(doc["start"], 5_000);

    // the owner reference was translated to the project's remote id
    let project_remote = engine
        .pool()
        .with_conn(|conn| queries::project_remote_id(conn, project.id))
        .unwrap()
        .unwrap();
    assert_eq!(doc["projectId"], serde_json::Value::String(project_remote));
}

#[test]
fn update_recomputes_duration_and_mirrors() {
    let (engine, replica, owner) = common::engine_with_replica();
    let project = engine.create_project("acme", None).unwrap();
    let record = engine.create_record(new_session(project.id, 1_000)).unwrap();
    engine.flush();

    // moving the stop timestamp recomputes duration as stop - start
    let patch = RecordPatch {
        stop_ms: Some(91_000),
        ..Default::default()
    };
    engine
        .update_record(RecordKind::Session, record.local_id(), &patch)
        .unwrap();
    engine.flush();

    let session = engine
        .pool()
        .with_conn(|conn| queries::get_session(conn, record.local_id()))
        .unwrap()
        .unwrap();
    assert_eq!(session.duration_ms, Some(90_000));

    let doc = replica
        .get_doc(&owner, Collection::Sessions, session.remote_id.as_ref().unwrap())
        .unwrap();
    assert_eq!(doc["duration"], 90_000);
}

#[test]
fn delete_removes_local_first_and_survives_remote_failure() {
    let (engine, replica, owner) = common::engine_with_replica();
    let project = engine.create_project("acme", None).unwrap();
    let record = engine.create_record(new_session(project.id, 1_000)).unwrap();
    engine.flush();

    replica.set_online(false);
    engine
        .delete_record(RecordKind::Session, record.local_id())
        .unwrap();
    engine.flush();

    // local row gone even though the remote delete failed
    let count = engine
        .pool()
        .with_conn(|conn| queries::count_sessions(conn))
        .unwrap();
    assert_eq!(count, 0);
    assert_eq!(replica.count(&owner, Collection::Sessions), 1);

    replica.set_online(true);
    let other = engine.create_record(new_session(project.id, 9_000)).unwrap();
    engine.flush();
    engine
        .delete_record(RecordKind::Session, other.local_id())
        .unwrap();
    engine.flush();
    assert_eq!(replica.count(&owner, Collection::Sessions), 1);
}

// ---------------------------------------------------------------------------
// Echo suppression
// ---------------------------------------------------------------------------

#[test]
fn echo_suppressor_consumes_exactly_once() {
    let echo = EchoSuppressor::new();
    echo.mark_pending("sessions-000001");

    assert!(echo.consume_if_pending("sessions-000001"));
    assert!(!echo.consume_if_pending("sessions-000001"));
    assert!(!echo.consume_if_pending("sessions-000002"));
}

#[test]
fn expired_marks_fail_open() {
    let echo = EchoSuppressor::with_window(Duration::from_millis(0));
    echo.mark_pending("sessions-000001");
    std::thread::sleep(Duration::from_millis(5));

    assert!(!echo.consume_if_pending("sessions-000001"));
}

#[test]
fn pending_echo_is_discarded_instead_of_reinserted() {
    let (engine, replica, owner) = common::engine_with_replica();
    let project = engine.create_project("acme", None).unwrap();
    engine.create_record(new_session(project.id, 1_000)).unwrap();
    engine.flush();

    let project_remote = engine
        .pool()
        .with_conn(|conn| queries::project_remote_id(conn, project.id))
        .unwrap()
        .unwrap();

    // replay the replica's state as the subscription would on connect
    let echo = EchoSuppressor::new();
    echo.mark_pending("sessions-replayed");
    let batch = ChangeBatch {
        changes: vec![RemoteChange {
            kind: ChangeKind::Added,
            collection: Collection::Sessions,
            remote_id: "sessions-replayed".into(),
            doc: Some(session_doc(&project_remote, 1_000)),
        }],
    };
    apply_batch(engine.pool(), &echo, &batch).unwrap();

    let count = engine
        .pool()
        .with_conn(|conn| queries::count_sessions(conn))
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(replica.count(&owner, Collection::Sessions), 1);
}

#[test]
fn late_echo_for_a_linked_record_is_idempotent() {
    let (engine, _replica, _owner) = common::engine_with_replica();
    let project = engine.create_project("acme", None).unwrap();
    let record = engine.create_record(new_session(project.id, 1_000)).unwrap();
    engine.flush();

    let session = engine
        .pool()
        .with_conn(|conn| queries::get_session(conn, record.local_id()))
        .unwrap()
        .unwrap();
    let remote_id = session.remote_id.unwrap();
    let project_remote = engine
        .pool()
        .with_conn(|conn| queries::project_remote_id(conn, project.id))
        .unwrap()
        .unwrap();

    // echo arrives past the suppression window: the record already carries
    // this remote id, so the change is a no-op
    let echo = EchoSuppressor::with_window(Duration::from_millis(0));
    let batch = ChangeBatch {
        changes: vec![RemoteChange {
            kind: ChangeKind::Added,
            collection: Collection::Sessions,
            remote_id: remote_id.clone(),
            doc: Some(session_doc(&project_remote, 1_000)),
        }],
    };
    apply_batch(engine.pool(), &echo, &batch).unwrap();

    let count = engine
        .pool()
        .with_conn(|conn| queries::count_sessions(conn))
        .unwrap();
    assert_eq!(count, 1);
}

// ---------------------------------------------------------------------------
// Remote-change merging
// ---------------------------------------------------------------------------

#[test]
fn added_links_logical_duplicate_instead_of_inserting() {
    let (engine, replica, _owner) = common::engine_with_replica();
    let project = engine.create_project("acme", None).unwrap();
    engine.flush();
    let project_remote = engine
        .pool()
        .with_conn(|conn| queries::project_remote_id(conn, project.id))
        .unwrap()
        .unwrap();

    // a session created offline: no remote id yet
    replica.set_online(false);
    let record = engine.create_record(new_session(project.id, 7_000)).unwrap();
    engine.flush();

    // the same document shows up through the subscription (pushed by this
    // device's sweep from a previous run, echoed back now)
    let echo = EchoSuppressor::new();
    let batch = ChangeBatch {
        changes: vec![RemoteChange {
            kind: ChangeKind::Added,
            collection: Collection::Sessions,
            remote_id: "sessions-foreign".into(),
            doc: Some(session_doc(&project_remote, 7_000)),
        }],
    };
    apply_batch(engine.pool(), &echo, &batch).unwrap();

    let session = engine
        .pool()
        .with_conn(|conn| queries::get_session(conn, record.local_id()))
        .unwrap()
        .unwrap();
    assert_eq!(session.remote_id.as_deref(), Some("sessions-foreign"));
    let count = engine
        .pool()
        .with_conn(|conn| queries::count_sessions(conn))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn travel_duplicate_match_requires_same_distance() {
    let (engine, replica, _owner) = common::engine_with_replica();
    let project = engine.create_project("acme", None).unwrap();
    engine.flush();
    let project_remote = engine
        .pool()
        .with_conn(|conn| queries::project_remote_id(conn, project.id))
        .unwrap()
        .unwrap();

    replica.set_online(false);
    let record = engine
        .create_record(NewRecord::Travel(NewTravelEntry {
            project_id: project.id,
            start_ms: 3_000,
            distance_km: 12.0,
            note: None,
        }))
        .unwrap();
    engine.flush();

    // same owner and start but a different distance: a genuine new entry
    let echo = EchoSuppressor::new();
    let other = serde_json::json!({
        "projectId": project_remote,
        "start": 3_000,
        "distanceKm": 99.0,
        "createdAt": "2025-08-04T10:00:00+00:00",
    });
    let batch = ChangeBatch {
        changes: vec![RemoteChange {
            kind: ChangeKind::Added,
            collection: Collection::TravelEntries,
            remote_id: "travelEntries-foreign".into(),
            doc: Some(other),
        }],
    };
    apply_batch(engine.pool(), &echo, &batch).unwrap();

    let count = engine
        .pool()
        .with_conn(|conn| queries::count_travel(conn))
        .unwrap();
    assert_eq!(count, 2);
    let local = engine
        .pool()
        .with_conn(|conn| queries::get_travel(conn, record.local_id()))
        .unwrap()
        .unwrap();
    assert!(local.remote_id.is_none(), "distinct entry must not be linked");
}

#[test]
fn foreign_added_inserts_a_new_local_record() {
    let (engine, _replica, _owner) = common::engine_with_replica();
    let project = engine.create_project("acme", None).unwrap();
    engine.flush();
    let project_remote = engine
        .pool()
        .with_conn(|conn| queries::project_remote_id(conn, project.id))
        .unwrap()
        .unwrap();

    let echo = EchoSuppressor::new();
    let batch = ChangeBatch {
        changes: vec![RemoteChange {
            kind: ChangeKind::Added,
            collection: Collection::Sessions,
            remote_id: "sessions-foreign".into(),
            doc: Some(session_doc(&project_remote, 11_000)),
        }],
    };
    apply_batch(engine.pool(), &echo, &batch).unwrap();

    let session = engine
        .pool()
        .with_conn(|conn| queries::find_session_by_remote_id(conn, "sessions-foreign"))
        .unwrap()
        .expect("inserted from remote");
    assert_eq!(session.project_id, project.id);
    assert_eq!(session.start_ms, 11_000);
}

#[test]
fn added_with_unknown_owner_is_skipped() {
    let (engine, _replica, _owner) = common::engine_with_replica();

    let echo = EchoSuppressor::new();
    let batch = ChangeBatch {
        changes: vec![RemoteChange {
            kind: ChangeKind::Added,
            collection: Collection::Sessions,
            remote_id: "sessions-orphan".into(),
            doc: Some(session_doc("projects-nowhere", 1_000)),
        }],
    };
    apply_batch(engine.pool(), &echo, &batch).unwrap();

    let count = engine
        .pool()
        .with_conn(|conn| queries::count_sessions(conn))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn malformed_document_is_rejected_not_coerced() {
    let (engine, _replica, _owner) = common::engine_with_replica();
    engine.create_project("acme", None).unwrap();
    engine.flush();

    // missing the required start field
    let echo = EchoSuppressor::new();
    let batch = ChangeBatch {
        changes: vec![RemoteChange {
            kind: ChangeKind::Added,
            collection: Collection::Sessions,
            remote_id: "sessions-bad".into(),
            doc: Some(serde_json::json!({
                "projectId": "projects-000001",
                "createdAt": "2025-08-04T10:00:00+00:00",
            })),
        }],
    };
    apply_batch(engine.pool(), &echo, &batch).unwrap();

    let count = engine
        .pool()
        .with_conn(|conn| queries::count_sessions(conn))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn modified_overwrites_and_removed_deletes() {
    let (engine, _replica, _owner) = common::engine_with_replica();
    let project = engine.create_project("acme", None).unwrap();
    let record = engine.create_record(new_session(project.id, 1_000)).unwrap();
    engine.flush();

    let session = engine
        .pool()
        .with_conn(|conn| queries::get_session(conn, record.local_id()))
        .unwrap()
        .unwrap();
    let remote_id = session.remote_id.unwrap();
    let project_remote = engine
        .pool()
        .with_conn(|conn| queries::project_remote_id(conn, project.id))
        .unwrap()
        .unwrap();

    let echo = EchoSuppressor::new();
    let mut doc = session_doc(&project_remote, 1_000);
    doc["note"] = serde_json::json!("edited elsewhere");
    doc["duration"] = serde_json::json!(120_000);
    apply_batch(
        engine.pool(),
        &echo,
        &ChangeBatch {
            changes: vec![RemoteChange {
                kind: ChangeKind::Modified,
                collection: Collection::Sessions,
                remote_id: remote_id.clone(),
                doc: Some(doc),
            }],
        },
    )
    .unwrap();

    let merged = engine
        .pool()
        .with_conn(|conn| queries::get_session(conn, record.local_id()))
        .unwrap()
        .unwrap();
    assert_eq!(merged.note.as_deref(), Some("edited elsewhere"));
    assert_eq!(merged.duration_ms, Some(120_000));

    apply_batch(
        engine.pool(),
        &echo,
        &ChangeBatch {
            changes: vec![RemoteChange {
                kind: ChangeKind::Removed,
                collection: Collection::Sessions,
                remote_id,
                doc: None,
            }],
        },
    )
    .unwrap();

    let count = engine
        .pool()
        .with_conn(|conn| queries::count_sessions(conn))
        .unwrap();
    assert_eq!(count, 0);
}

// ---------------------------------------------------------------------------
// Subscription lifecycle
// ---------------------------------------------------------------------------

#[test]
fn subscribe_replays_full_state_into_an_empty_store() {
    let replica = Arc::new(MemoryReplica::new());
    let owner = OwnerScope::new("owner-1");

    // another device already owns a project and two sessions
    let project_remote = replica.seed(
        &owner,
        Collection::Projects,
        serde_json::json!({
            "name": "acme",
            "color": "#cc6644",
            "archived": false,
            "createdAt": "2025-08-04T09:00:00+00:00",
        }),
    );
    replica.seed(&owner, Collection::Sessions, session_doc(&project_remote, 1_000));
    replica.seed(&owner, Collection::Sessions, session_doc(&project_remote, 2_000));

    let pool = common::mem_pool();
    let mut engine = SyncEngine::new(pool, replica, owner);
    engine.start_sync().unwrap();

    let synced = wait_until(Duration::from_secs(2), || {
        engine
            .pool()
            .with_conn(|conn| queries::count_sessions(conn))
            .unwrap()
            == 2
    });
    assert!(synced, "replayed state never arrived");

    engine.stop_sync();

    let sessions = engine
        .pool()
        .with_conn(|conn| queries::list_sessions(conn))
        .unwrap();
    assert!(sessions.iter().all(|s| s.remote_id.is_some()));
    let project = engine
        .pool()
        .with_conn(|conn| queries::find_project_by_remote_id(conn, &project_remote))
        .unwrap();
    assert!(project.is_some());
}

#[test]
fn own_writes_echo_back_without_duplicating() {
    let (mut engine, _replica, _owner) = common::engine_with_replica();
    engine.start_sync().unwrap();

    let project = engine.create_project("acme", None).unwrap();
    engine.create_record(new_session(project.id, 1_000)).unwrap();
    engine.flush();

    // give the listener time to process the echoes
    std::thread::sleep(Duration::from_millis(200));

    let (sessions, projects) = engine
        .pool()
        .with_conn(|conn| {
            Ok((
                queries::count_sessions(conn)?,
                queries::list_projects(conn)?.len(),
            ))
        })
        .unwrap();
    assert_eq!(sessions, 1);
    assert_eq!(projects, 1);

    engine.stop_sync();
}

#[test]
fn foreign_edits_flow_through_a_live_subscription() {
    let replica = Arc::new(MemoryReplica::new());
    let owner = OwnerScope::new("owner-1");
    let pool = common::mem_pool();
    let mut engine = SyncEngine::new(pool, replica.clone(), owner.clone());
    engine.start_sync().unwrap();

    let project_remote = replica.seed(
        &owner,
        Collection::Projects,
        serde_json::json!({
            "name": "acme",
            "color": "#cc6644",
            "archived": false,
            "createdAt": "2025-08-04T09:00:00+00:00",
        }),
    );
    let session_remote = replica.seed(
        &owner,
        Collection::Sessions,
        session_doc(&project_remote, 1_000),
    );

    let arrived = wait_until(Duration::from_secs(2), || {
        engine
            .pool()
            .with_conn(|conn| queries::count_sessions(conn))
            .unwrap()
            == 1
    });
    assert!(arrived, "seeded session never arrived");

    let mut edited = session_doc(&project_remote, 1_000);
    edited["note"] = serde_json::json!("renamed on another device");
    replica.seed_update(&owner, Collection::Sessions, &session_remote, edited);

    let merged = wait_until(Duration::from_secs(2), || {
        engine
            .pool()
            .with_conn(|conn| queries::find_session_by_remote_id(conn, &session_remote))
            .unwrap()
            .and_then(|s| s.note)
            .as_deref()
            == Some("renamed on another device")
    });
    assert!(merged, "foreign edit never merged");

    replica.seed_delete(&owner, Collection::Sessions, &session_remote);
    let removed = wait_until(Duration::from_secs(2), || {
        engine
            .pool()
            .with_conn(|conn| queries::count_sessions(conn))
            .unwrap()
            == 0
    });
    assert!(removed, "foreign delete never applied");

    engine.stop_sync();
}

#[test]
fn start_and_stop_sync_are_idempotent() {
    let replica = Arc::new(MemoryReplica::new());
    let owner = OwnerScope::new("owner-1");
    let pool = common::mem_pool();
    let mut engine = SyncEngine::new(pool, replica.clone(), owner.clone());

    engine.start_sync().unwrap();
    engine.start_sync().unwrap();
    engine.stop_sync();
    engine.stop_sync();

    // no dangling callbacks: a change after stop_sync is never applied
    replica.seed(&owner, Collection::Projects, serde_json::json!({
        "name": "late",
        "color": "#000000",
        "archived": false,
        "createdAt": "2025-08-04T09:00:00+00:00",
    }));
    std::thread::sleep(Duration::from_millis(100));

    let projects = engine
        .pool()
        .with_conn(|conn| queries::list_projects(conn))
        .unwrap();
    assert!(projects.is_empty());
}

#[test]
fn range_query_scans_by_start_timestamp() {
    let engine = common::local_engine();
    let project = engine.create_project("acme", None).unwrap();
    for start in [1_000, 5_000, 9_000] {
        engine.create_record(new_session(project.id, start)).unwrap();
    }

    // [from, to) over the start timestamps
    let hits = engine
        .pool()
        .with_conn(|conn| queries::sessions_in_range(conn, 1_000, 9_000))
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|s| s.start_ms < 9_000));
}

#[test]
fn local_only_engine_never_mirrors() {
    let engine = common::local_engine();
    let project = engine.create_project("acme", None).unwrap();
    engine.create_record(new_session(project.id, 1_000)).unwrap();
    engine.flush();

    let report = engine.reconcile_unsynced().unwrap();
    assert_eq!(report.pushed, 0);
    assert_eq!(engine.unsynced_counts().unwrap(), (1, 1, 0));
}
