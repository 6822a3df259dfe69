//! Tracked records: work sessions and travel distance entries.
//!
//! Both kinds carry a local rowid (assigned by SQLite, never reused) and an
//! optional remote id (assigned by the replica once mirrored). A record
//! without a remote id is "unsynced" and eligible for the reconciliation
//! sweep.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Session,
    Travel,
}

/// A completed work session. While a timer runs its duration is derived
/// live from the RunningSession row; only finished sessions land here.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: i64,
    pub remote_id: Option<String>,
    pub project_id: i64,
    pub start_ms: i64,
    pub stop_ms: Option<i64>,
    pub duration_ms: Option<i64>,
    pub note: Option<String>,
    pub created_at: String,
}

/// A travel distance entry attached to a project.
#[derive(Debug, Clone, Serialize)]
pub struct TravelEntry {
    pub id: i64,
    pub remote_id: Option<String>,
    pub project_id: i64,
    pub start_ms: i64,
    pub distance_km: f64,
    pub note: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub enum Record {
    Session(Session),
    Travel(TravelEntry),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Session(_) => RecordKind::Session,
            Record::Travel(_) => RecordKind::Travel,
        }
    }

    pub fn local_id(&self) -> i64 {
        match self {
            Record::Session(s) => s.id,
            Record::Travel(t) => t.id,
        }
    }

    pub fn remote_id(&self) -> Option<&str> {
        match self {
            Record::Session(s) => s.remote_id.as_deref(),
            Record::Travel(t) => t.remote_id.as_deref(),
        }
    }

}

/// Creation payloads. Local id, remote id and created_at are assigned by
/// the store / engine, never by the caller.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub project_id: i64,
    pub start_ms: i64,
    pub stop_ms: Option<i64>,
    pub duration_ms: Option<i64>,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewTravelEntry {
    pub project_id: i64,
    pub start_ms: i64,
    pub distance_km: f64,
    pub note: Option<String>,
}

#[derive(Debug, Clone)]
pub enum NewRecord {
    Session(NewSession),
    Travel(NewTravelEntry),
}

impl NewRecord {
    pub fn project_id(&self) -> i64 {
        match self {
            NewRecord::Session(s) => s.project_id,
            NewRecord::Travel(t) => t.project_id,
        }
    }
}

/// Field-wise update of a record. Only the named fields change; duration is
/// recomputed as stop - start whenever a timestamp changes and no explicit
/// duration override is given.
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    pub project_id: Option<i64>,
    pub start_ms: Option<i64>,
    pub stop_ms: Option<i64>,
    pub duration_ms: Option<i64>,
    pub note: Option<String>,
    pub distance_km: Option<f64>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.project_id.is_none()
            && self.start_ms.is_none()
            && self.stop_ms.is_none()
            && self.duration_ms.is_none()
            && self.note.is_none()
            && self.distance_km.is_none()
    }

    /// Apply to a session, enforcing the duration invariant.
    pub fn apply_to_session(&self, s: &mut Session) {
        let timestamps_changed = self.start_ms.is_some() || self.stop_ms.is_some();

        if let Some(p) = self.project_id {
            s.project_id = p;
        }
        if let Some(start) = self.start_ms {
            s.start_ms = start;
        }
        if let Some(stop) = self.stop_ms {
            s.stop_ms = Some(stop);
        }
        if let Some(note) = &self.note {
            s.note = Some(note.clone());
        }

        if let Some(d) = self.duration_ms {
            s.duration_ms = Some(d);
        } else if timestamps_changed
            && let Some(stop) = s.stop_ms
        {
            s.duration_ms = Some(stop - s.start_ms);
        }
    }

    pub fn apply_to_travel(&self, t: &mut TravelEntry) {
        if let Some(p) = self.project_id {
            t.project_id = p;
        }
        if let Some(start) = self.start_ms {
            t.start_ms = start;
        }
        if let Some(km) = self.distance_km {
            t.distance_km = km;
        }
        if let Some(note) = &self.note {
            t.note = Some(note.clone());
        }
    }
}
