use serde::Serialize;

/// A project is the owner reference of every tracked record.
/// Dual-identified: the local rowid is authoritative on this device, the
/// remote id exists only once the project has been mirrored.
#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub id: i64,
    pub remote_id: Option<String>,
    pub name: String,
    pub color: String,
    pub archived: bool,
    pub created_at: String, // ISO 8601
}

impl Project {
    pub fn is_synced(&self) -> bool {
        self.remote_id.is_some()
    }
}
