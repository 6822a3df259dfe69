#![allow(dead_code)]
use assert_cmd::{Command, cargo_bin_cmd};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempolog::db::initialize::init_db;
use tempolog::db::pool::DbPool;
use tempolog::remote::memory::MemoryReplica;
use tempolog::remote::replica::OwnerScope;
use tempolog::sync::engine::SyncEngine;

pub fn tlg() -> Command {
    cargo_bin_cmd!("tempolog")
}

/// Create a unique test DB path inside the system temp dir and remove any existing file
pub fn setup_test_db(name: &str) -> String {
    let mut path: PathBuf = env::temp_dir();
    path.push(format!("{}_tempolog.sqlite", name));
    let db_path = path.to_string_lossy().to_string();
    fs::remove_file(&db_path).ok();
    db_path
}

/// In-memory pool with the full schema applied.
pub fn mem_pool() -> DbPool {
    let pool = DbPool::open_in_memory().expect("open in-memory db");
    pool.with_conn(|conn| init_db(conn)).expect("init db");
    pool
}

/// Engine without any remote backend.
pub fn local_engine() -> SyncEngine {
    SyncEngine::new_local_only(mem_pool())
}

/// Engine wired to an in-process replica, plus handles for inspection.
pub fn engine_with_replica() -> (SyncEngine, Arc<MemoryReplica>, OwnerScope) {
    let pool = mem_pool();
    let replica = Arc::new(MemoryReplica::new());
    let owner = OwnerScope::new("owner-1");
    let engine = SyncEngine::new(pool, replica.clone(), owner.clone());
    (engine, replica, owner)
}
