//! Short-lived memory of remote ids just created by this process.
//!
//! After the engine creates a remote document, the subscription echoes the
//! same document back as an Added event. Marking the id pending lets the
//! listener discard that echo instead of reprocessing it as a foreign
//! insert. Marks expire: a late echo past the window is handled by the
//! idempotent identity-linking path instead (fail open).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Long enough to cover the round trip between a create call and its echo
/// arriving on the subscription.
pub const ECHO_WINDOW: Duration = Duration::from_secs(5);

pub struct EchoSuppressor {
    window: Duration,
    pending: Mutex<HashMap<String, Instant>>,
}

impl Default for EchoSuppressor {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoSuppressor {
    pub fn new() -> Self {
        Self::with_window(ECHO_WINDOW)
    }

    /// Custom expiry window, used by tests.
    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn mark_pending(&self, remote_id: &str) {
        let mut pending = self.pending.lock().unwrap();
        pending.insert(remote_id.to_string(), Instant::now());
    }

    /// True exactly once for an id marked within the window. Expired marks
    /// are dropped on the way.
    pub fn consume_if_pending(&self, remote_id: &str) -> bool {
        let mut pending = self.pending.lock().unwrap();
        let now = Instant::now();
        pending.retain(|_, marked| now.duration_since(*marked) <= self.window);
        pending.remove(remote_id).is_some()
    }
}
