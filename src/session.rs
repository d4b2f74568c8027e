use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::route::{Route, RouteSample};

/// Opaque walk identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SessionId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
pub enum WalkState {
    #[strum(serialize = "not started")]
    NotStarted,
    #[strum(serialize = "active")]
    Active,
    #[strum(serialize = "paused")]
    Paused,
    #[strum(serialize = "ended")]
    Ended,
}

/// One walk from start to finish.
///
/// Transitions take the current instant explicitly so the caller owns the
/// clock. A rejected transition leaves the session untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkingSession {
    pub id: SessionId,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub state: WalkState,
    pub route: Route,
    pub accumulated_paused_ms: i64,
    pub pause_began_at: Option<DateTime<Utc>>,
    pub is_manual_mode: bool,
}

impl Default for WalkingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl WalkingSession {
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            start_time: None,
            end_time: None,
            state: WalkState::NotStarted,
            route: Route::new(),
            accumulated_paused_ms: 0,
            pause_began_at: None,
            is_manual_mode: false,
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.expect_state(&[WalkState::NotStarted], "start")?;
        self.start_time = Some(now);
        self.state = WalkState::Active;
        info!(session = %self.id, "walk started");
        Ok(())
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.expect_state(&[WalkState::Active], "pause")?;
        self.pause_began_at = Some(now);
        self.state = WalkState::Paused;
        debug!(session = %self.id, "walk paused");
        Ok(())
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.expect_state(&[WalkState::Paused], "resume")?;
        self.fold_open_pause(now);
        self.state = WalkState::Active;
        debug!(session = %self.id, paused_ms = self.accumulated_paused_ms, "walk resumed");
        Ok(())
    }

    /// End the walk for good. An open pause is closed at `now` first.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.expect_state(&[WalkState::Active, WalkState::Paused], "finish")?;
        if self.state == WalkState::Paused {
            self.fold_open_pause(now);
        }
        self.end_time = Some(now);
        self.state = WalkState::Ended;
        self.route.freeze();
        info!(
            session = %self.id,
            samples = self.route.len(),
            distance_m = self.route.total_distance(),
            "walk finished"
        );
        Ok(())
    }

    /// Walking time in milliseconds, excluding paused time, never negative.
    ///
    /// While paused, the open pause interval is excluded as well, so the value
    /// stands still until the walk resumes.
    pub fn elapsed_millis(&self, now: DateTime<Utc>) -> Result<i64> {
        let start = match (self.state, self.start_time) {
            (WalkState::NotStarted, _) | (_, None) => {
                return Err(TrackerError::InvalidState {
                    state: self.state,
                    operation: "measure elapsed time",
                })
            }
            (_, Some(start)) => start,
        };

        let reference_end = match self.state {
            WalkState::Ended => self.end_time.unwrap_or(now),
            _ => now,
        };

        let open_pause = match (self.state, self.pause_began_at) {
            (WalkState::Paused, Some(began)) => (now - began).num_milliseconds().max(0),
            _ => 0,
        };

        let elapsed =
            (reference_end - start).num_milliseconds() - self.accumulated_paused_ms - open_pause;
        Ok(elapsed.max(0))
    }

    /// Feed a sample into the route.
    ///
    /// Returns `Ok(true)` when appended, `Ok(false)` when dropped because the
    /// walk is paused.
    pub fn record_sample(&mut self, sample: RouteSample) -> Result<bool> {
        match self.state {
            WalkState::Active => {
                self.route.append(sample)?;
                Ok(true)
            }
            WalkState::Paused => Ok(false),
            state => Err(TrackerError::InvalidState {
                state,
                operation: "record a sample",
            }),
        }
    }

    pub fn set_manual_mode(&mut self, manual: bool) {
        self.is_manual_mode = manual;
    }

    pub fn is_live(&self) -> bool {
        matches!(self.state, WalkState::Active | WalkState::Paused)
    }

    fn fold_open_pause(&mut self, now: DateTime<Utc>) {
        if let Some(began) = self.pause_began_at.take() {
            self.accumulated_paused_ms += (now - began).num_milliseconds().max(0);
        }
    }

    fn expect_state(&self, allowed: &[WalkState], action: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(TrackerError::InvalidTransition {
                from: self.state,
                action,
            })
        }
    }
}
