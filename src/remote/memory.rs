//! In-process replica backend.
//!
//! Holds per-owner, per-collection document maps and delivers change
//! batches over plain mpsc channels. The `online` toggle injects the
//! fail-fast network behavior: while offline, every write returns a
//! network error immediately. Subscriptions replay the full current state
//! as Added events, projects first, then stream live changes.

use crate::errors::{AppError, AppResult};
use crate::remote::replica::{
    ChangeBatch, ChangeKind, ChangeStream, Collection, OwnerScope, RemoteChange, RemoteReplica,
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::mpsc::{Sender, channel};

#[derive(Default)]
struct Inner {
    online: bool,
    next_id: u64,
    docs: HashMap<(String, Collection), BTreeMap<String, Value>>,
    status: HashMap<String, Value>,
    subscribers: HashMap<String, Vec<Sender<ChangeBatch>>>,
}

pub struct MemoryReplica {
    inner: Mutex<Inner>,
}

impl Default for MemoryReplica {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryReplica {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                online: true,
                ..Default::default()
            }),
        }
    }

    /// Toggle reachability. While offline, create/update/delete fail fast.
    pub fn set_online(&self, online: bool) {
        self.inner.lock().unwrap().online = online;
    }

    pub fn is_online(&self) -> bool {
        self.inner.lock().unwrap().online
    }

    /// Number of documents in a collection (test inspection).
    pub fn count(&self, owner: &OwnerScope, collection: Collection) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .docs
            .get(&(owner.0.clone(), collection))
            .map_or(0, BTreeMap::len)
    }

    pub fn get_doc(
        &self,
        owner: &OwnerScope,
        collection: Collection,
        remote_id: &str,
    ) -> Option<Value> {
        let inner = self.inner.lock().unwrap();
        inner
            .docs
            .get(&(owner.0.clone(), collection))
            .and_then(|m| m.get(remote_id))
            .cloned()
    }

    pub fn running_status(&self, owner: &OwnerScope) -> Option<Value> {
        self.inner.lock().unwrap().status.get(&owner.0).cloned()
    }

    /// Insert a document as if another device had written it, broadcasting
    /// the change to subscribers. Returns the assigned id.
    pub fn seed(&self, owner: &OwnerScope, collection: Collection, doc: Value) -> String {
        let mut inner = self.inner.lock().unwrap();
        let remote_id = Inner::gen_id(&mut inner, collection);
        inner
            .docs
            .entry((owner.0.clone(), collection))
            .or_default()
            .insert(remote_id.clone(), doc.clone());
        Inner::broadcast(
            &mut inner,
            &owner.0,
            RemoteChange {
                kind: ChangeKind::Added,
                collection,
                remote_id: remote_id.clone(),
                doc: Some(doc),
            },
        );
        remote_id
    }

    /// Overwrite a document as a foreign device would.
    pub fn seed_update(
        &self,
        owner: &OwnerScope,
        collection: Collection,
        remote_id: &str,
        doc: Value,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .docs
            .entry((owner.0.clone(), collection))
            .or_default()
            .insert(remote_id.to_string(), doc.clone());
        Inner::broadcast(
            &mut inner,
            &owner.0,
            RemoteChange {
                kind: ChangeKind::Modified,
                collection,
                remote_id: remote_id.to_string(),
                doc: Some(doc),
            },
        );
    }

    /// Remove a document as a foreign device would.
    pub fn seed_delete(&self, owner: &OwnerScope, collection: Collection, remote_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(m) = inner.docs.get_mut(&(owner.0.clone(), collection)) {
            m.remove(remote_id);
        }
        Inner::broadcast(
            &mut inner,
            &owner.0,
            RemoteChange {
                kind: ChangeKind::Removed,
                collection,
                remote_id: remote_id.to_string(),
                doc: None,
            },
        );
    }
}

impl Inner {
    fn gen_id(inner: &mut Inner, collection: Collection) -> String {
        inner.next_id += 1;
        format!("{}-{:06}", collection.as_str(), inner.next_id)
    }

    fn check_online(&self) -> AppResult<()> {
        if self.online {
            Ok(())
        } else {
            Err(AppError::Network("replica unreachable".into()))
        }
    }

    fn broadcast(inner: &mut Inner, owner: &str, change: RemoteChange) {
        let Some(senders) = inner.subscribers.get_mut(owner) else {
            return;
        };
        let batch = ChangeBatch {
            changes: vec![change],
        };
        // Drop subscribers whose receiving end is gone.
        senders.retain(|tx| tx.send(batch.clone()).is_ok());
    }
}

impl RemoteReplica for MemoryReplica {
    fn create(
        &self,
        owner: &OwnerScope,
        collection: Collection,
        doc: &Value,
    ) -> AppResult<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_online()?;

        let remote_id = Inner::gen_id(&mut inner, collection);
        inner
            .docs
            .entry((owner.0.clone(), collection))
            .or_default()
            .insert(remote_id.clone(), doc.clone());

        // The replica echoes its own writes back through the subscription,
        // exactly like a real document store does.
        Inner::broadcast(
            &mut inner,
            &owner.0,
            RemoteChange {
                kind: ChangeKind::Added,
                collection,
                remote_id: remote_id.clone(),
                doc: Some(doc.clone()),
            },
        );

        Ok(remote_id)
    }

    fn update(
        &self,
        owner: &OwnerScope,
        collection: Collection,
        remote_id: &str,
        doc: &Value,
    ) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_online()?;

        let entry = inner
            .docs
            .entry((owner.0.clone(), collection))
            .or_default();
        if !entry.contains_key(remote_id) {
            return Err(AppError::Network(format!(
                "no such document: {}/{}",
                collection.as_str(),
                remote_id
            )));
        }
        entry.insert(remote_id.to_string(), doc.clone());

        Inner::broadcast(
            &mut inner,
            &owner.0,
            RemoteChange {
                kind: ChangeKind::Modified,
                collection,
                remote_id: remote_id.to_string(),
                doc: Some(doc.clone()),
            },
        );

        Ok(())
    }

    fn delete(
        &self,
        owner: &OwnerScope,
        collection: Collection,
        remote_id: &str,
    ) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_online()?;

        let removed = inner
            .docs
            .get_mut(&(owner.0.clone(), collection))
            .and_then(|m| m.remove(remote_id))
            .is_some();

        if removed {
            Inner::broadcast(
                &mut inner,
                &owner.0,
                RemoteChange {
                    kind: ChangeKind::Removed,
                    collection,
                    remote_id: remote_id.to_string(),
                    doc: None,
                },
            );
        }

        Ok(())
    }

    fn subscribe(&self, owner: &OwnerScope) -> AppResult<ChangeStream> {
        let mut inner = self.inner.lock().unwrap();
        let (tx, rx) = channel();

        // Full-state replay, owner documents first.
        let mut replay = Vec::new();
        for collection in Collection::ORDERED {
            if let Some(m) = inner.docs.get(&(owner.0.clone(), collection)) {
                for (remote_id, doc) in m {
                    replay.push(RemoteChange {
                        kind: ChangeKind::Added,
                        collection,
                        remote_id: remote_id.clone(),
                        doc: Some(doc.clone()),
                    });
                }
            }
        }
        if !replay.is_empty() {
            let _ = tx.send(ChangeBatch { changes: replay });
        }

        inner
            .subscribers
            .entry(owner.0.clone())
            .or_default()
            .push(tx);

        Ok(rx)
    }

    fn set_running_status(&self, owner: &OwnerScope, doc: &Value) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_online()?;
        inner.status.insert(owner.0.clone(), doc.clone());
        Ok(())
    }

    fn clear_running_status(&self, owner: &OwnerScope) -> AppResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.check_online()?;
        inner.status.remove(&owner.0);
        Ok(())
    }
}
