// Single-slot persistence of the latest walk.
//
// The store is a best-effort cache, not a system of record: every failure is
// logged and swallowed, and unreadable data is reported as "no saved walk".

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app_dirs::AppDirs;
use crate::error::{Result, TrackerError};
use crate::geo::GeoPoint;
use crate::route::{Route, RouteSample};
use crate::session::{SessionId, WalkState, WalkingSession};

/// Key of the one and only session slot.
pub const LATEST_SESSION_KEY: &str = "catwalk.latest_session";

/// Current on-disk record version.
pub const RECORD_VERSION: u32 = 1;

/// Client-scoped key-value storage.
pub trait KeyValueBackend {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// In-process backend; contents vanish with the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Backend over a local sqlite file.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open (creating if needed) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[derive(Serialize)]
struct StoredSessionRef<'a> {
    version: u32,
    session: &'a WalkingSession,
}

#[derive(Deserialize)]
struct StoredSession {
    version: u32,
    session: WalkingSession,
}

/// Shape written by earlier releases: camelCase, epoch millis, no version tag.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacySession {
    #[serde(default)]
    id: Option<String>,
    start_time: i64,
    #[serde(default)]
    end_time: Option<i64>,
    #[serde(default, alias = "route", alias = "positions")]
    path: Vec<LegacyPoint>,
    #[serde(default, alias = "totalPausedTime")]
    paused_time: i64,
    #[serde(default)]
    is_paused: bool,
    #[serde(default)]
    is_manual_mode: bool,
}

#[derive(Deserialize)]
struct LegacyPoint {
    #[serde(alias = "latitude")]
    lat: f64,
    #[serde(alias = "longitude", alias = "lon")]
    lng: f64,
    #[serde(default)]
    timestamp: Option<i64>,
}

/// The persisted "latest walk" slot.
pub struct SessionStore {
    backend: Option<Box<dyn KeyValueBackend>>,
}

impl SessionStore {
    pub fn new(backend: Box<dyn KeyValueBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// A store with nowhere to write; every operation is a no-op.
    pub fn unavailable() -> Self {
        Self { backend: None }
    }

    /// sqlite file at `path`, or an unavailable store if it cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        match SqliteBackend::open(&path) {
            Ok(backend) => Self::new(Box::new(backend)),
            Err(e) => {
                warn!(path = %path.as_ref().display(), error = %e, "session storage unavailable");
                Self::unavailable()
            }
        }
    }

    /// Store under the user's state directory.
    pub fn open_default() -> Self {
        match AppDirs::db_path() {
            Some(path) => Self::open(path),
            None => {
                warn!("no state directory; sessions will not be saved");
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    /// Overwrite the slot with `session`. Failures are logged, never returned.
    pub fn save(&mut self, session: &WalkingSession) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };

        let record = StoredSessionRef {
            version: RECORD_VERSION,
            session,
        };
        let result = serde_json::to_string(&record)
            .map_err(TrackerError::from)
            .and_then(|json| backend.set(LATEST_SESSION_KEY, &json));

        match result {
            Ok(()) => debug!(session = %session.id, state = %session.state, "session saved"),
            Err(e) => warn!(session = %session.id, error = %e, "failed to save session"),
        }
    }

    /// The last saved walk, if there is a readable one.
    pub fn load_latest(&self) -> Option<WalkingSession> {
        let backend = self.backend.as_ref()?;
        let raw = match backend.get(LATEST_SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "failed to read saved session");
                return None;
            }
        };

        let session = decode(&raw);
        if session.is_none() {
            warn!("saved session is unreadable; ignoring it");
        }
        session
    }

    pub fn clear(&mut self) {
        if let Some(backend) = self.backend.as_mut() {
            if let Err(e) = backend.remove(LATEST_SESSION_KEY) {
                warn!(error = %e, "failed to clear saved session");
            }
        }
    }
}

fn decode(raw: &str) -> Option<WalkingSession> {
    let value: serde_json::Value = serde_json::from_str(raw).ok()?;

    let session = if value.get("version").is_some() {
        let stored: StoredSession = serde_json::from_value(value).ok()?;
        if stored.version != RECORD_VERSION {
            debug!(version = stored.version, "unsupported session record version");
            return None;
        }
        stored.session
    } else {
        let legacy: LegacySession = serde_json::from_value(value).ok()?;
        migrate_legacy(legacy)?
    };

    if !is_consistent(&session) {
        return None;
    }
    rebuild_route(session)
}

/// Replay the stored samples into a fresh route so the cached total and the
/// frozen flag come from the samples and the state, not from the record.
fn rebuild_route(mut session: WalkingSession) -> Option<WalkingSession> {
    let mut route = Route::new();
    for sample in session.route.samples() {
        if !sample.point.is_valid() {
            return None;
        }
        route.append(*sample).ok()?;
    }
    if session.state == WalkState::Ended {
        route.freeze();
    }
    session.route = route;
    Some(session)
}

fn migrate_legacy(legacy: LegacySession) -> Option<WalkingSession> {
    let start = DateTime::from_timestamp_millis(legacy.start_time)?;

    let mut route = Route::new();
    let mut last_ts = start;
    for p in legacy.path {
        let Ok(point) = GeoPoint::new(p.lat, p.lng) else {
            continue;
        };
        let ts = p
            .timestamp
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or(last_ts);
        // stale points are dropped, same as live ingestion
        if route.append(RouteSample::new(point, ts)).is_ok() {
            last_ts = ts;
        }
    }

    let mut session = WalkingSession::new();
    if let Some(id) = legacy.id.as_deref().and_then(|s| Uuid::parse_str(s).ok()) {
        session.id = SessionId::from(id);
    }
    session.start_time = Some(start);
    session.accumulated_paused_ms = legacy.paused_time.max(0);
    session.is_manual_mode = legacy.is_manual_mode;

    match legacy.end_time.and_then(DateTime::from_timestamp_millis) {
        Some(end) => {
            session.end_time = Some(end);
            session.state = WalkState::Ended;
            route.freeze();
        }
        None if legacy.is_paused => {
            session.state = WalkState::Paused;
            session.pause_began_at = Some(last_ts);
        }
        None => session.state = WalkState::Active,
    }
    session.route = route;

    debug!(session = %session.id, "migrated legacy session record");
    Some(session)
}

fn is_consistent(session: &WalkingSession) -> bool {
    let times_ok = match session.state {
        WalkState::NotStarted => session.start_time.is_none(),
        WalkState::Active => session.start_time.is_some(),
        WalkState::Paused => session.start_time.is_some() && session.pause_began_at.is_some(),
        WalkState::Ended => session.start_time.is_some() && session.end_time.is_some(),
    };

    times_ok && session.accumulated_paused_ms >= 0
}
