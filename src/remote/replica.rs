//! The remote document store seam.
//!
//! A replica holds per-owner collections of JSON documents plus one
//! singleton "current running session" status document per owner. Writes
//! fail fast when the backend is unreachable; queuing for later is the sync
//! engine's job, never the replica's.

use crate::errors::AppResult;
use serde_json::Value;
use std::sync::mpsc::Receiver;

/// Account scope: all documents live under `owners/{owner_id}/...`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerScope(pub String);

impl OwnerScope {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Projects,
    Sessions,
    TravelEntries,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Projects => "projects",
            Collection::Sessions => "sessions",
            Collection::TravelEntries => "travelEntries",
        }
    }

    /// Replay / apply order: owner documents first so that record owner
    /// references resolve in a single pass.
    pub const ORDERED: [Collection; 3] = [
        Collection::Projects,
        Collection::Sessions,
        Collection::TravelEntries,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One document change delivered by the subscription.
#[derive(Debug, Clone)]
pub struct RemoteChange {
    pub kind: ChangeKind,
    pub collection: Collection,
    pub remote_id: String,
    /// Present for Added/Modified, absent for Removed.
    pub doc: Option<Value>,
}

/// Changes are delivered in batches; the engine applies each batch as one
/// local transaction.
#[derive(Debug, Clone)]
pub struct ChangeBatch {
    pub changes: Vec<RemoteChange>,
}

pub type ChangeStream = Receiver<ChangeBatch>;

pub trait RemoteReplica: Send + Sync {
    /// Store a new document, returning the replica-assigned id.
    fn create(&self, owner: &OwnerScope, collection: Collection, doc: &Value)
    -> AppResult<String>;

    fn update(
        &self,
        owner: &OwnerScope,
        collection: Collection,
        remote_id: &str,
        doc: &Value,
    ) -> AppResult<()>;

    fn delete(&self, owner: &OwnerScope, collection: Collection, remote_id: &str)
    -> AppResult<()>;

    /// Open a long-lived change stream for an owner. The full current state
    /// is re-delivered as Added events first, then incremental changes.
    fn subscribe(&self, owner: &OwnerScope) -> AppResult<ChangeStream>;

    /// Publish the singleton `status/runningSession` document, read by the
    /// external long-running-timer scanner.
    fn set_running_status(&self, owner: &OwnerScope, doc: &Value) -> AppResult<()>;

    fn clear_running_status(&self, owner: &OwnerScope) -> AppResult<()>;
}
