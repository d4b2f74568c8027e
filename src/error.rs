use chrono::{DateTime, Utc};

use crate::session::WalkState;

/// Everything that can go wrong while tracking a walk.
///
/// Lifecycle and ordering errors are contract violations at the call site and
/// are never retried. Storage errors only surface from backends; the
/// [`SessionStore`](crate::store::SessionStore) swallows them.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("cannot {action} a walk that is {from}")]
    InvalidTransition { from: WalkState, action: &'static str },

    #[error("sample at {got} is older than the last recorded sample at {last}")]
    OutOfOrderSample {
        last: DateTime<Utc>,
        got: DateTime<Utc>,
    },

    #[error("route is frozen; the walk has already ended")]
    RouteFrozen,

    #[error("cannot {operation} while the walk is {state}")]
    InvalidState {
        state: WalkState,
        operation: &'static str,
    },

    #[error("coordinate out of range: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("storage backend failed: {0}")]
    Storage(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for TrackerError {
    fn from(err: rusqlite::Error) -> Self {
        TrackerError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
