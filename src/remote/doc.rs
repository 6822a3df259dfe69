//! Document encode/decode at the replica boundary.
//!
//! Decoding is strict: a document missing a required field is rejected with
//! a typed error instead of being coerced into application state.

use crate::errors::{AppError, AppResult};
use crate::models::project::Project;
use crate::models::record::{Session, TravelEntry};
use serde_json::{Map, Value, json};

fn require_str(doc: &Map<String, Value>, field: &str) -> AppResult<String> {
    doc.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AppError::MalformedDocument(format!("missing string field '{field}'")))
}

fn require_i64(doc: &Map<String, Value>, field: &str) -> AppResult<i64> {
    doc.get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| AppError::MalformedDocument(format!("missing integer field '{field}'")))
}

fn require_f64(doc: &Map<String, Value>, field: &str) -> AppResult<f64> {
    doc.get(field)
        .and_then(Value::as_f64)
        .ok_or_else(|| AppError::MalformedDocument(format!("missing number field '{field}'")))
}

fn opt_str(doc: &Map<String, Value>, field: &str) -> Option<String> {
    doc.get(field).and_then(Value::as_str).map(str::to_string)
}

fn opt_i64(doc: &Map<String, Value>, field: &str) -> Option<i64> {
    doc.get(field).and_then(Value::as_i64)
}

fn as_object(doc: &Value) -> AppResult<&Map<String, Value>> {
    doc.as_object()
        .ok_or_else(|| AppError::MalformedDocument("document is not an object".into()))
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Decoded session document. The owner reference is the project's remote
/// id; resolving it back to a local id happens in the engine.
#[derive(Debug, Clone)]
pub struct SessionDoc {
    pub project_remote_id: String,
    pub start_ms: i64,
    pub stop_ms: Option<i64>,
    pub duration_ms: Option<i64>,
    pub note: Option<String>,
    pub created_at: String,
}

pub fn encode_session(s: &Session, project_remote_id: &str) -> Value {
    json!({
        "projectId": project_remote_id,
        "start": s.start_ms,
        "stop": s.stop_ms,
        "duration": s.duration_ms,
        "note": s.note,
        "createdAt": s.created_at,
    })
}

pub fn decode_session(doc: &Value) -> AppResult<SessionDoc> {
    let obj = as_object(doc)?;
    Ok(SessionDoc {
        project_remote_id: require_str(obj, "projectId")?,
        start_ms: require_i64(obj, "start")?,
        stop_ms: opt_i64(obj, "stop"),
        duration_ms: opt_i64(obj, "duration"),
        note: opt_str(obj, "note"),
        created_at: require_str(obj, "createdAt")?,
    })
}

// ---------------------------------------------------------------------------
// Travel entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TravelDoc {
    pub project_remote_id: String,
    pub start_ms: i64,
    pub distance_km: f64,
    pub note: Option<String>,
    pub created_at: String,
}

pub fn encode_travel(t: &TravelEntry, project_remote_id: &str) -> Value {
    json!({
        "projectId": project_remote_id,
        "start": t.start_ms,
        "distanceKm": t.distance_km,
        "note": t.note,
        "createdAt": t.created_at,
    })
}

pub fn decode_travel(doc: &Value) -> AppResult<TravelDoc> {
    let obj = as_object(doc)?;
    Ok(TravelDoc {
        project_remote_id: require_str(obj, "projectId")?,
        start_ms: require_i64(obj, "start")?,
        distance_km: require_f64(obj, "distanceKm")?,
        note: opt_str(obj, "note"),
        created_at: require_str(obj, "createdAt")?,
    })
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProjectDoc {
    pub name: String,
    pub color: String,
    pub archived: bool,
    pub created_at: String,
}

pub fn encode_project(p: &Project) -> Value {
    json!({
        "name": p.name,
        "color": p.color,
        "archived": p.archived,
        "createdAt": p.created_at,
    })
}

pub fn decode_project(doc: &Value) -> AppResult<ProjectDoc> {
    let obj = as_object(doc)?;
    Ok(ProjectDoc {
        name: require_str(obj, "name")?,
        color: require_str(obj, "color")?,
        archived: obj.get("archived").and_then(Value::as_bool).unwrap_or(false),
        created_at: require_str(obj, "createdAt")?,
    })
}

// ---------------------------------------------------------------------------
// Running-session status document
// ---------------------------------------------------------------------------

/// The scanner job needs the start timestamp and identifying metadata,
/// not pause-accurate elapsed time.
pub fn encode_running_status(start_ms: i64, project_name: &str, note: Option<&str>) -> Value {
    json!({
        "start": start_ms,
        "project": project_name,
        "note": note,
    })
}
