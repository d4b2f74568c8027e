use std::fs::File;

use catwalk::clock::{Clock, ManualClock};
use catwalk::config::Config;
use catwalk::export::read_route_csv;
use catwalk::geo::GeoPoint;
use catwalk::route::RouteSample;
use catwalk::session::WalkState;
use catwalk::store::SessionStore;
use catwalk::tracker::Tracker;
use chrono::Duration;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

fn open(dir: &TempDir, clock: &ManualClock) -> Tracker<ManualClock, StdRng> {
    let store = SessionStore::open(dir.path().join("state.db"));
    assert!(store.is_available());
    Tracker::new(
        Config::default(),
        clock.clone(),
        StdRng::seed_from_u64(5),
        store,
    )
    .unwrap()
}

fn walk_north(tracker: &mut Tracker<ManualClock, StdRng>, clock: &ManualClock, steps: i32) {
    for i in 0..steps {
        clock.advance(Duration::seconds(2));
        let point = GeoPoint::new(37.5663 + f64::from(i) * 0.0003, 126.9779).unwrap();
        tracker
            .on_location(RouteSample::new(point, clock.now()))
            .unwrap();
    }
}

#[test]
fn live_walk_survives_restart() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at_millis(1_700_000_000_000);

    let (id, distance) = {
        let mut tracker = open(&dir, &clock);
        assert!(tracker.restore().is_none());
        tracker.start().unwrap();
        walk_north(&mut tracker, &clock, 4);
        tracker.flush();
        let session = tracker.session().unwrap();
        (session.id, session.route.total_distance())
    };

    clock.advance(Duration::minutes(5));
    let mut tracker = open(&dir, &clock);
    let restored = tracker.restore().unwrap();
    assert_eq!(restored.id, id);
    assert_eq!(restored.state, WalkState::Active);
    assert_eq!(restored.route.len(), 4);
    assert!((restored.route.total_distance() - distance).abs() < 1e-9);

    // discovery restarts from the restore instant
    assert_eq!(
        tracker.discovery().next_check_at(),
        Some(clock.now() + Duration::seconds(30))
    );

    // the walk carries on where it stopped
    walk_north(&mut tracker, &clock, 2);
    assert_eq!(tracker.session().unwrap().route.len(), 6);
}

#[test]
fn paused_walk_restores_paused() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at_millis(1_700_000_000_000);
    {
        let mut tracker = open(&dir, &clock);
        tracker.start().unwrap();
        clock.advance(Duration::seconds(40));
        tracker.pause().unwrap();
    }

    clock.advance(Duration::seconds(100));
    let mut tracker = open(&dir, &clock);
    assert_eq!(tracker.restore().unwrap().state, WalkState::Paused);
    assert!(!tracker.discovery().is_armed());
    assert_eq!(tracker.elapsed_millis().unwrap(), 40_000);

    tracker.resume().unwrap();
    clock.advance(Duration::seconds(20));
    let summary = tracker.finish().unwrap();
    assert_eq!(summary.total_duration_millis, 60_000);
}

#[test]
fn finished_walk_is_kept_until_replaced() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at_millis(1_700_000_000_000);
    let first = {
        let mut tracker = open(&dir, &clock);
        tracker.start().unwrap();
        walk_north(&mut tracker, &clock, 3);
        tracker.finish().unwrap();
        tracker.session().unwrap().id
    };

    let mut tracker = open(&dir, &clock);
    let restored = tracker.restore().unwrap();
    assert_eq!(restored.id, first);
    assert_eq!(restored.state, WalkState::Ended);
    assert!(restored.route.is_frozen());

    let second = tracker.start().unwrap().id;
    drop(tracker);

    let mut tracker = open(&dir, &clock);
    assert_eq!(tracker.restore().unwrap().id, second);

    tracker.clear_saved();
    drop(tracker);
    let mut tracker = open(&dir, &clock);
    assert!(tracker.restore().is_none());
}

#[test]
fn exported_route_reads_back() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::at_millis(1_700_000_000_000);
    let mut tracker = open(&dir, &clock);
    tracker.start().unwrap();
    walk_north(&mut tracker, &clock, 5);
    tracker.finish().unwrap();

    let path = dir.path().join("route.csv");
    let route = &tracker.session().unwrap().route;
    catwalk::export::write_route_csv(route, File::create(&path).unwrap()).unwrap();

    let back = read_route_csv(File::open(&path).unwrap()).unwrap();
    assert_eq!(back.samples(), route.samples());
    assert!((back.total_distance() - route.total_distance()).abs() < 1e-9);
}
