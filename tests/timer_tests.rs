//! Running-timer state machine: elapsed accounting across pause/resume,
//! stop, discard and continue-from, against a fixed clock.

mod common;

use tempolog::core::timer::Timer;
use tempolog::db::queries;
use tempolog::errors::AppError;
use tempolog::sync::engine::SyncEngine;

fn engine_with_project() -> (SyncEngine, i64) {
    let engine = common::local_engine();
    let project = engine.create_project("acme", None).expect("create project");
    (engine, project.id)
}

#[test]
fn pause_resume_stop_scenario() {
    let (engine, pid) = engine_with_project();

    // start at t=0, pause at 10s, resume at 15s, stop at 25s
    Timer::start_at(&engine, pid, None, 0).unwrap();
    Timer::pause_at(&engine, 10_000).unwrap();
    Timer::resume_at(&engine, 15_000).unwrap();
    let session = Timer::stop_at(&engine, 25_000).unwrap();

    assert_eq!(session.duration_ms, Some(20_000));
    assert_eq!(session.start_ms, 0);
    assert_eq!(session.stop_ms, Some(25_000));
}

#[test]
fn elapsed_is_monotonic_while_running() {
    let (engine, pid) = engine_with_project();
    Timer::start_at(&engine, pid, None, 0).unwrap();

    let mut prev = 0;
    for now in [1_000, 2_500, 7_000, 60_000, 3_600_000] {
        let elapsed = Timer::elapsed_at(&engine, now).unwrap();
        assert!(elapsed >= prev, "elapsed went backwards at t={now}");
        prev = elapsed;
    }
}

#[test]
fn elapsed_is_constant_while_paused() {
    let (engine, pid) = engine_with_project();
    Timer::start_at(&engine, pid, None, 0).unwrap();
    Timer::pause_at(&engine, 10_000).unwrap();

    assert_eq!(Timer::elapsed_at(&engine, 10_000).unwrap(), 10_000);
    assert_eq!(Timer::elapsed_at(&engine, 12_000).unwrap(), 10_000);
    assert_eq!(Timer::elapsed_at(&engine, 500_000).unwrap(), 10_000);
}

#[test]
fn n_pause_resume_cycles_subtract_exactly() {
    let (engine, pid) = engine_with_project();
    Timer::start_at(&engine, pid, None, 0).unwrap();

    let pauses = [(10_000, 12_000), (20_000, 25_000), (30_000, 36_000)];
    let mut paused_total = 0;
    for (p, r) in pauses {
        Timer::pause_at(&engine, p).unwrap();
        Timer::resume_at(&engine, r).unwrap();
        paused_total += r - p;
    }

    let session = Timer::stop_at(&engine, 50_000).unwrap();
    assert_eq!(session.duration_ms, Some(50_000 - paused_total));
}

#[test]
fn stop_while_paused_excludes_open_pause() {
    let (engine, pid) = engine_with_project();
    Timer::start_at(&engine, pid, None, 0).unwrap();
    Timer::pause_at(&engine, 10_000).unwrap();

    let session = Timer::stop_at(&engine, 30_000).unwrap();
    assert_eq!(session.duration_ms, Some(10_000));
    assert_eq!(session.stop_ms, Some(30_000));
}

#[test]
fn start_while_running_is_an_error() {
    let (engine, pid) = engine_with_project();
    Timer::start_at(&engine, pid, None, 0).unwrap();

    let err = Timer::start_at(&engine, pid, None, 1_000).unwrap_err();
    assert!(matches!(err, AppError::AlreadyRunning(_)));

    // the original timer is untouched
    assert_eq!(Timer::elapsed_at(&engine, 5_000).unwrap(), 5_000);
}

#[test]
fn pause_twice_is_a_noop() {
    let (engine, pid) = engine_with_project();
    Timer::start_at(&engine, pid, None, 0).unwrap();
    Timer::pause_at(&engine, 10_000).unwrap();
    // second pause keeps the first pause_start
    Timer::pause_at(&engine, 14_000).unwrap();
    Timer::resume_at(&engine, 20_000).unwrap();

    let session = Timer::stop_at(&engine, 30_000).unwrap();
    assert_eq!(session.duration_ms, Some(20_000));
}

#[test]
fn preconditions_surface_as_errors() {
    let (engine, pid) = engine_with_project();

    assert!(matches!(
        Timer::pause_at(&engine, 0).unwrap_err(),
        AppError::NotRunning
    ));
    assert!(matches!(
        Timer::stop_at(&engine, 0).unwrap_err(),
        AppError::NotRunning
    ));
    assert!(matches!(
        Timer::discard(&engine).unwrap_err(),
        AppError::NotRunning
    ));

    Timer::start_at(&engine, pid, None, 0).unwrap();
    // resume only applies to a paused timer
    assert!(matches!(
        Timer::resume_at(&engine, 5_000).unwrap_err(),
        AppError::NotRunning
    ));
}

#[test]
fn discard_produces_no_record() {
    let (engine, pid) = engine_with_project();
    Timer::start_at(&engine, pid, None, 0).unwrap();
    Timer::discard(&engine).unwrap();

    assert!(Timer::current(&engine).unwrap().is_none());
    let count = engine
        .pool()
        .with_conn(|conn| queries::count_sessions(conn))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn continue_then_immediate_stop_preserves_entry() {
    let (engine, pid) = engine_with_project();
    Timer::start_at(&engine, pid, None, 0).unwrap();
    let original = Timer::stop_at(&engine, 20_000).unwrap();
    assert_eq!(original.duration_ms, Some(20_000));

    // continue an hour later, stop immediately: same duration, same start
    let rs = Timer::continue_from_at(&engine, original.id, 3_600_000).unwrap();
    assert_eq!(rs.continued_from_id, Some(original.id));

    let reopened = Timer::stop_at(&engine, 3_600_000).unwrap();
    assert_eq!(reopened.duration_ms, Some(20_000));
    assert_eq!(reopened.start_ms, 0);

    // the old record is gone: exactly one session remains
    let count = engine
        .pool()
        .with_conn(|conn| queries::count_sessions(conn))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn continue_accrues_new_time_on_top() {
    let (engine, pid) = engine_with_project();
    Timer::start_at(&engine, pid, None, 0).unwrap();
    let original = Timer::stop_at(&engine, 20_000).unwrap();

    Timer::continue_from_at(&engine, original.id, 60_000).unwrap();
    assert_eq!(Timer::elapsed_at(&engine, 75_000).unwrap(), 35_000);

    let reopened = Timer::stop_at(&engine, 75_000).unwrap();
    assert_eq!(reopened.duration_ms, Some(35_000));
}

#[test]
fn continue_requires_idle() {
    let (engine, pid) = engine_with_project();
    Timer::start_at(&engine, pid, None, 0).unwrap();
    let original = Timer::stop_at(&engine, 10_000).unwrap();

    Timer::start_at(&engine, pid, None, 20_000).unwrap();
    let err = Timer::continue_from_at(&engine, original.id, 25_000).unwrap_err();
    assert!(matches!(err, AppError::AlreadyRunning(_)));
}

#[test]
fn elapsed_survives_a_restart() {
    let pool = common::mem_pool();

    {
        let engine = SyncEngine::new_local_only(pool.clone());
        let project = engine.create_project("acme", None).unwrap();
        Timer::start_at(&engine, project.id, None, 0).unwrap();
        Timer::pause_at(&engine, 10_000).unwrap();
        Timer::resume_at(&engine, 15_000).unwrap();
    }

    // a fresh engine over the same store: only timestamps were persisted
    let engine = SyncEngine::new_local_only(pool);
    assert_eq!(Timer::elapsed_at(&engine, 25_000).unwrap(), 20_000);
    let session = Timer::stop_at(&engine, 25_000).unwrap();
    assert_eq!(session.duration_ms, Some(20_000));
}
