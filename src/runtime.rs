use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::route::{Route, RouteSample};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum TrackerEvent {
    Key(KeyEvent),
    /// Position pushed by a live location source
    Location(RouteSample),
    Resize,
    Tick,
}

/// Source of events (keyboard, resize, location fixes)
pub trait TrackerEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<TrackerEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<TrackerEvent>,
    rx: Receiver<TrackerEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let keys = tx.clone();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if keys.send(TrackerEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if keys.send(TrackerEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(_) => break,
            }
        });

        Self { tx, rx }
    }

    /// Handle for other producers (e.g. a location feed) to post events.
    pub fn sender(&self) -> Sender<TrackerEvent> {
        self.tx.clone()
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TrackerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Replay a recorded route as a live location feed.
///
/// Gaps between samples are kept (divided by `speedup`) and timestamps are
/// re-based onto the current wall clock.
pub fn spawn_route_replay(route: Route, speedup: f64, tx: Sender<TrackerEvent>) {
    let speedup = if speedup > 0.0 { speedup } else { 1.0 };
    std::thread::spawn(move || {
        let mut prev: Option<DateTime<Utc>> = None;
        for sample in route.samples() {
            if let Some(prev) = prev {
                let gap = (sample.timestamp - prev).to_std().unwrap_or_default();
                std::thread::sleep(gap.div_f64(speedup));
            }
            prev = Some(sample.timestamp);

            let live = RouteSample::new(sample.point, Utc::now());
            if tx.send(TrackerEvent::Location(live)).is_err() {
                break;
            }
        }
    });
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<TrackerEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<TrackerEvent>) -> Self {
        Self { rx }
    }
}

impl TrackerEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TrackerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: TrackerEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: TrackerEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> TrackerEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                TrackerEvent::Tick
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use chrono::DateTime;
    use std::sync::mpsc;

    #[test]
    fn step_returns_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let es = TestEventSource::new(rx);
        let ticker = FixedTicker::new(Duration::from_millis(1));
        let runner = Runner::new(es, ticker);

        // With no events available, step should yield Tick
        match runner.step() {
            TrackerEvent::Tick => {}
            other => panic!("expected Tick on timeout, got {other:?}"),
        }
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(TrackerEvent::Resize).unwrap();
        let es = TestEventSource::new(rx);
        let runner = Runner::new(es, FixedTicker::new(Duration::from_millis(10)));

        match runner.step() {
            TrackerEvent::Resize => {}
            other => panic!("expected Resize event, got {other:?}"),
        }
    }

    #[test]
    fn replay_delivers_samples_in_order() {
        let mut route = Route::new();
        for (i, lat) in [37.0, 37.001, 37.002].into_iter().enumerate() {
            let p = GeoPoint::new(lat, 127.0).unwrap();
            let ts = DateTime::from_timestamp_millis(i as i64 * 10).unwrap();
            route.append(RouteSample::new(p, ts)).unwrap();
        }

        let (tx, rx) = mpsc::channel();
        spawn_route_replay(route, 10.0, tx);
        let runner = Runner::new(
            TestEventSource::new(rx),
            FixedTicker::new(Duration::from_secs(2)),
        );

        let mut lats = Vec::new();
        let mut last_ts = None;
        for _ in 0..3 {
            match runner.step() {
                TrackerEvent::Location(sample) => {
                    if let Some(prev) = last_ts {
                        assert!(sample.timestamp >= prev);
                    }
                    last_ts = Some(sample.timestamp);
                    lats.push(sample.point.latitude);
                }
                other => panic!("expected Location, got {other:?}"),
            }
        }
        assert_eq!(lats, vec![37.0, 37.001, 37.002]);
    }
}
