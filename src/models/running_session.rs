//! The single in-flight timer. At most one row exists; its timestamps are
//! the only persisted state, so elapsed time is always derived from the
//! wall clock and stays correct across process restarts.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RunningSession {
    pub project_id: i64,
    /// Clock time the logical work period began. Preserved across
    /// continue-from, so it can predate this row's creation.
    pub start_ms: i64,
    /// Duration inherited from a continued-from entry, else 0.
    pub base_duration_ms: i64,
    pub is_paused: bool,
    pub pause_start_ms: Option<i64>,
    /// Cumulative milliseconds spent paused, excluding a pause still open.
    pub total_paused_ms: i64,
    /// Back-reference to the record replaced by continue-from.
    pub continued_from_id: Option<i64>,
    pub note: Option<String>,
    pub created_at: String,
}

impl RunningSession {
    /// Elapsed working time at `now_ms`. Never cached: recomputed from the
    /// persisted timestamps on every call.
    pub fn elapsed_at(&self, now_ms: i64) -> i64 {
        let open_pause = match (self.is_paused, self.pause_start_ms) {
            (true, Some(p)) => now_ms - p,
            _ => 0,
        };
        self.base_duration_ms + (now_ms - self.start_ms) - self.total_paused_ms - open_pause
    }
}
