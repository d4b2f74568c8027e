use std::sync::mpsc;
use std::time::Duration;

use catwalk::clock::{Clock, ManualClock};
use catwalk::config::Config;
use catwalk::geo::GeoPoint;
use catwalk::manual::Direction;
use catwalk::route::RouteSample;
use catwalk::runtime::{FixedTicker, Runner, TestEventSource, TrackerEvent};
use catwalk::session::WalkState;
use catwalk::store::{MemoryBackend, SessionStore};
use catwalk::tracker::Tracker;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn tracker(config: Config) -> (Tracker<ManualClock, StdRng>, ManualClock) {
    let clock = ManualClock::at_millis(1_700_000_000_000);
    let store = SessionStore::new(Box::new(MemoryBackend::new()));
    let tracker = Tracker::new(config, clock.clone(), StdRng::seed_from_u64(11), store).unwrap();
    (tracker, clock)
}

// Drives a live walk through the Runner without a TTY: location fixes arrive
// on the channel and timeouts become ticks.
#[test]
fn headless_live_walk_completes() {
    let (mut tracker, clock) = tracker(Config::default());
    tracker.start().unwrap();

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    for i in 0..10 {
        let at = clock.now() + chrono::Duration::seconds(i * 6);
        let point = GeoPoint::new(37.5663 + i as f64 * 0.0004, 126.9779).unwrap();
        tx.send(TrackerEvent::Location(RouteSample::new(point, at)))
            .unwrap();
    }

    let mut fixes = 0;
    for _ in 0..20u32 {
        match runner.step() {
            TrackerEvent::Location(sample) => {
                clock.set(sample.timestamp);
                assert!(tracker.on_location(sample).unwrap());
                fixes += 1;
            }
            TrackerEvent::Tick => {
                tracker.on_tick();
            }
            TrackerEvent::Key(_) | TrackerEvent::Resize => {}
        }
        if fixes == 10 {
            break;
        }
    }

    let summary = tracker.finish().unwrap();
    assert_eq!(tracker.state(), WalkState::Ended);
    assert_eq!(summary.total_duration_millis, 54_000);
    // nine hops of 0.0004 degrees of latitude, ~44.5 m each
    assert!(summary.total_distance_meters > 390.0 && summary.total_distance_meters < 410.0);
    let pace = summary.average_pace_sec_per_km.unwrap();
    assert!(pace > 130.0 && pace < 140.0);
}

#[test]
fn headless_manual_walk_moves_on_ticks() {
    let (mut tracker, clock) = tracker(Config::default());
    tracker.set_manual_mode(true);
    tracker.start().unwrap();

    let (_tx, rx) = mpsc::channel::<TrackerEvent>();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(1)),
    );

    tracker.press(Direction::East);
    for _ in 0..5 {
        if let TrackerEvent::Tick = runner.step() {
            clock.advance(chrono::Duration::milliseconds(100));
            assert!(tracker.on_tick().sample.is_some());
        }
    }
    tracker.release(Direction::East);
    clock.advance(chrono::Duration::milliseconds(100));
    assert!(tracker.on_tick().sample.is_none());

    let session = tracker.session().unwrap();
    assert_eq!(session.route.len(), 5);
    let last = session.route.last().unwrap().point;
    assert!((last.longitude - 126.9784).abs() < 1e-9);
    assert!((last.latitude - 37.5663).abs() < 1e-9);
}

#[test]
fn headless_encounters_only_while_walking() {
    let config = Config {
        discovery_interval_secs: 10,
        discovery_threshold: 0.0,
        ..Config::default()
    };
    let (mut tracker, clock) = tracker(config);

    clock.advance(chrono::Duration::seconds(60));
    assert!(tracker.on_tick().discovery.is_none());

    tracker.start().unwrap();
    let mut met = 0;
    for _ in 0..60 {
        clock.advance(chrono::Duration::seconds(1));
        if tracker.on_tick().discovery.is_some() {
            met += 1;
        }
    }
    assert_eq!(met, 6);

    tracker.pause().unwrap();
    for _ in 0..60 {
        clock.advance(chrono::Duration::seconds(1));
        assert!(tracker.on_tick().discovery.is_none());
    }
}
