use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::Config;
use crate::courses::{builtin_courses, nearby, Course};
use crate::discovery::{
    CatCatalog, DiscoveryEvent, DiscoveryTrigger, RarityWeighted, SelectionPolicy,
    UniformSelection,
};
use crate::error::{Result, TrackerError};
use crate::geo::GeoPoint;
use crate::manual::{Direction, ManualInjector};
use crate::route::RouteSample;
use crate::session::{WalkState, WalkingSession};
use crate::store::SessionStore;
use crate::summary::{summarize, SessionSummary};

/// How long a live walk may go between saves while samples keep arriving.
const AUTOSAVE_INTERVAL_SECS: i64 = 5;

/// What a single tick produced.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickOutcome {
    pub sample: Option<RouteSample>,
    pub discovery: Option<DiscoveryEvent>,
}

/// Owns the current walk and everything that feeds it.
///
/// The discovery timer is armed exactly while the walk is active; pausing or
/// finishing disarms it and releases any held manual directions.
pub struct Tracker<C, R> {
    config: Config,
    clock: C,
    session: Option<WalkingSession>,
    manual_mode: bool,
    injector: ManualInjector,
    discovery: DiscoveryTrigger<R>,
    catalog: CatCatalog,
    policy: Box<dyn SelectionPolicy>,
    courses: Vec<Course>,
    store: SessionStore,
    last_saved_at: Option<DateTime<Utc>>,
    dirty: bool,
}

impl<C: Clock, R: Rng> Tracker<C, R> {
    pub fn new(config: Config, clock: C, rng: R, store: SessionStore) -> Result<Self> {
        config.validate()?;
        let policy: Box<dyn SelectionPolicy> = if config.rarity_weighted {
            Box::new(RarityWeighted)
        } else {
            Box::new(UniformSelection)
        };

        Ok(Self {
            injector: ManualInjector::new(config.start_point()?, config.manual_step_degrees),
            discovery: DiscoveryTrigger::new(
                config.discovery_interval(),
                config.discovery_threshold,
                rng,
            ),
            catalog: CatCatalog::builtin(),
            policy,
            courses: builtin_courses(),
            session: None,
            manual_mode: false,
            last_saved_at: None,
            dirty: false,
            config,
            clock,
            store,
        })
    }

    pub fn with_catalog(mut self, catalog: CatCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_policy(mut self, policy: Box<dyn SelectionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> Option<&WalkingSession> {
        self.session.as_ref()
    }

    pub fn state(&self) -> WalkState {
        self.session
            .as_ref()
            .map_or(WalkState::NotStarted, |s| s.state)
    }

    pub fn is_manual_mode(&self) -> bool {
        self.manual_mode
    }

    pub fn injector(&self) -> &ManualInjector {
        &self.injector
    }

    pub fn discovery(&self) -> &DiscoveryTrigger<R> {
        &self.discovery
    }

    pub fn catalog(&self) -> &CatCatalog {
        &self.catalog
    }

    /// Pick up the walk saved by a previous run, if any.
    pub fn restore(&mut self) -> Option<&WalkingSession> {
        let session = self.store.load_latest()?;
        let now = self.clock.now();
        info!(session = %session.id, state = %session.state, "restored saved walk");

        self.manual_mode = session.is_manual_mode;
        if let Some(last) = session.route.last() {
            self.injector.reposition(last.point);
        }
        self.discovery.disarm();
        if session.state == WalkState::Active {
            self.discovery.arm(now);
        }
        self.session = Some(session);
        self.session.as_ref()
    }

    /// Begin a fresh walk, replacing any finished one.
    pub fn start(&mut self) -> Result<&WalkingSession> {
        if let Some(current) = &self.session {
            if current.is_live() {
                return Err(TrackerError::InvalidTransition {
                    from: current.state,
                    action: "start",
                });
            }
        }

        let now = self.clock.now();
        let mut session = WalkingSession::new();
        session.start(now)?;
        session.set_manual_mode(self.manual_mode);

        self.injector.release_all();
        self.injector.reposition(self.config.start_point()?);
        self.discovery.arm(now);

        // the new walk takes over the single saved slot straight away
        self.store.save(&session);
        self.last_saved_at = Some(now);
        self.dirty = false;
        Ok(self.session.insert(session))
    }

    pub fn pause(&mut self) -> Result<()> {
        let now = self.clock.now();
        self.live_session_mut("pause")?.pause(now)?;
        self.halt_sources();
        self.persist(now);
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        let now = self.clock.now();
        self.live_session_mut("resume")?.resume(now)?;
        // restart the interval from zero rather than continuing the old one
        self.discovery.arm(now);
        self.persist(now);
        Ok(())
    }

    pub fn toggle_pause(&mut self) -> Result<()> {
        match self.state() {
            WalkState::Paused => self.resume(),
            _ => self.pause(),
        }
    }

    /// End the walk, persist it and report the final numbers.
    pub fn finish(&mut self) -> Result<SessionSummary> {
        let now = self.clock.now();
        let session = self.live_session_mut("finish")?;
        session.finish(now)?;
        let summary = summarize(session)?;
        self.halt_sources();
        self.persist(now);

        info!(
            distance_m = summary.total_distance_meters,
            duration_ms = summary.total_duration_millis,
            "walk summary"
        );
        Ok(summary)
    }

    pub fn summary(&self) -> Result<SessionSummary> {
        match &self.session {
            Some(session) => summarize(session),
            None => Err(TrackerError::InvalidState {
                state: WalkState::NotStarted,
                operation: "summarize",
            }),
        }
    }

    pub fn elapsed_millis(&self) -> Result<i64> {
        match &self.session {
            Some(session) => session.elapsed_millis(self.clock.now()),
            None => Err(TrackerError::InvalidState {
                state: WalkState::NotStarted,
                operation: "measure elapsed time",
            }),
        }
    }

    pub fn total_distance(&self) -> f64 {
        self.session
            .as_ref()
            .map_or(0.0, |s| s.route.total_distance())
    }

    /// Switch between manual and live position sources.
    ///
    /// Entering manual mode continues from the last recorded point.
    pub fn set_manual_mode(&mut self, manual: bool) {
        if manual == self.manual_mode {
            return;
        }
        self.manual_mode = manual;
        self.injector.release_all();

        if manual {
            if let Some(last) = self.session.as_ref().and_then(|s| s.route.last()) {
                self.injector.reposition(last.point);
            }
        }
        if let Some(session) = self.session.as_mut().filter(|s| s.is_live()) {
            session.set_manual_mode(manual);
            self.dirty = true;
        }
        info!(manual, "position source switched");
    }

    pub fn press(&mut self, dir: Direction) {
        if self.manual_mode && self.state() == WalkState::Active {
            self.injector.press(dir);
        }
    }

    pub fn release(&mut self, dir: Direction) {
        self.injector.release(dir);
    }

    pub fn release_all(&mut self) {
        self.injector.release_all();
    }

    /// Sample pushed by a live location source.
    ///
    /// Returns `Ok(false)` if the sample was dropped because manual mode owns
    /// the route or the walk is paused.
    pub fn on_location(&mut self, sample: RouteSample) -> Result<bool> {
        if self.manual_mode {
            debug!("ignoring live sample in manual mode");
            return Ok(false);
        }
        let appended = match self.session.as_mut() {
            Some(session) => session.record_sample(sample)?,
            None => {
                return Err(TrackerError::InvalidState {
                    state: WalkState::NotStarted,
                    operation: "record a sample",
                })
            }
        };
        if appended {
            self.dirty = true;
            self.autosave(self.clock.now());
        }
        Ok(appended)
    }

    /// Advance the manual source and the discovery timer by one tick.
    pub fn on_tick(&mut self) -> TickOutcome {
        let now = self.clock.now();
        let mut outcome = TickOutcome::default();
        if self.state() != WalkState::Active {
            return outcome;
        }

        if self.manual_mode {
            let before = self.injector.position();
            if let Some(sample) = self.injector.tick(now) {
                if let Some(session) = self.session.as_mut() {
                    match session.record_sample(sample) {
                        Ok(true) => {
                            outcome.sample = Some(sample);
                            self.dirty = true;
                        }
                        Ok(false) => self.injector.reposition(before),
                        Err(e) => {
                            warn!(error = %e, "manual sample rejected");
                            self.injector.reposition(before);
                        }
                    }
                }
            }
        }

        outcome.discovery = self
            .discovery
            .poll(now, &self.catalog, self.policy.as_ref());

        self.autosave(now);
        outcome
    }

    /// Where the walker is now, best guess.
    pub fn current_position(&self) -> GeoPoint {
        if self.manual_mode {
            return self.injector.position();
        }
        self.session
            .as_ref()
            .and_then(|s| s.route.last())
            .map(|s| s.point)
            .unwrap_or_else(|| self.injector.position())
    }

    pub fn nearby_courses(&self, k: usize) -> Vec<(&Course, f64)> {
        nearby(self.current_position(), &self.courses, k)
    }

    /// Save whatever has not been saved yet, e.g. before exiting.
    pub fn flush(&mut self) {
        if self.dirty {
            self.persist(self.clock.now());
        }
    }

    /// Drop the saved walk. The in-memory walk, if any, is kept.
    pub fn clear_saved(&mut self) {
        self.store.clear();
    }

    fn live_session_mut(&mut self, action: &'static str) -> Result<&mut WalkingSession> {
        match self.session.as_mut() {
            Some(session) => Ok(session),
            None => Err(TrackerError::InvalidTransition {
                from: WalkState::NotStarted,
                action,
            }),
        }
    }

    fn halt_sources(&mut self) {
        self.discovery.disarm();
        self.injector.release_all();
    }

    fn autosave(&mut self, now: DateTime<Utc>) {
        let due = self
            .last_saved_at
            .map_or(true, |at| now - at >= Duration::seconds(AUTOSAVE_INTERVAL_SECS));
        if self.dirty && due {
            self.persist(now);
        }
    }

    fn persist(&mut self, now: DateTime<Utc>) {
        if let Some(session) = &self.session {
            self.store.save(session);
            self.last_saved_at = Some(now);
            self.dirty = false;
        }
    }
}
