use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackerError};
use crate::session::{WalkState, WalkingSession};

/// Final numbers for a finished walk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub total_distance_meters: f64,
    pub total_duration_millis: i64,
    /// `None` when no distance was covered.
    pub average_pace_sec_per_km: Option<f64>,
}

pub fn summarize(session: &WalkingSession) -> Result<SessionSummary> {
    if session.state != WalkState::Ended {
        return Err(TrackerError::InvalidState {
            state: session.state,
            operation: "summarize",
        });
    }

    let total_distance_meters = session.route.total_distance();
    let end = session.end_time.or(session.start_time).unwrap_or_default();
    let total_duration_millis = session.elapsed_millis(end)?;

    let average_pace_sec_per_km = if total_distance_meters > 0.0 {
        Some((total_duration_millis as f64 / 1000.0) / (total_distance_meters / 1000.0))
    } else {
        None
    };

    Ok(SessionSummary {
        total_distance_meters,
        total_duration_millis,
        average_pace_sec_per_km,
    })
}

/// "850 m" below a kilometer, "1.42 km" above.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{} m", meters.round())
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}

/// "HH:MM:SS"
pub fn format_duration(millis: i64) -> String {
    let secs = millis.max(0) / 1000;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Minutes and seconds per kilometer, e.g. `12'05"/km`, or `--` when undefined.
pub fn format_pace(sec_per_km: Option<f64>) -> String {
    match sec_per_km {
        Some(pace) if pace.is_finite() && pace >= 0.0 => {
            let secs = pace.round() as u64;
            format!("{}'{:02}\"/km", secs / 60, secs % 60)
        }
        _ => "--".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::route::RouteSample;
    use assert_matches::assert_matches;
    use chrono::{DateTime, Utc};

    fn t(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample(secs: i64, lat: f64) -> RouteSample {
        RouteSample::new(GeoPoint::new(lat, 127.0).unwrap(), t(secs))
    }

    #[test]
    fn test_summarize_requires_ended() {
        let mut s = WalkingSession::new();
        assert_matches!(
            summarize(&s),
            Err(TrackerError::InvalidState {
                state: WalkState::NotStarted,
                ..
            })
        );
        s.start(t(0)).unwrap();
        assert_matches!(summarize(&s), Err(TrackerError::InvalidState { .. }));
        s.pause(t(1)).unwrap();
        assert_matches!(summarize(&s), Err(TrackerError::InvalidState { .. }));
    }

    #[test]
    fn test_summary_numbers() {
        let mut s = WalkingSession::new();
        s.start(t(0)).unwrap();
        s.record_sample(sample(0, 37.0)).unwrap();
        s.record_sample(sample(300, 37.009)).unwrap();
        s.pause(t(300)).unwrap();
        s.resume(t(400)).unwrap();
        s.finish(t(700)).unwrap();

        let summary = summarize(&s).unwrap();
        assert_eq!(summary.total_duration_millis, 600_000);
        assert_eq!(summary.total_distance_meters, s.route.total_distance());

        let expected_pace = 600.0 / (summary.total_distance_meters / 1000.0);
        let pace = summary.average_pace_sec_per_km.unwrap();
        assert!((pace - expected_pace).abs() < 1e-9);
    }

    #[test]
    fn test_zero_distance_has_no_pace() {
        let mut s = WalkingSession::new();
        s.start(t(0)).unwrap();
        s.record_sample(sample(1, 37.0)).unwrap();
        s.finish(t(60)).unwrap();

        let summary = summarize(&s).unwrap();
        assert_eq!(summary.total_distance_meters, 0.0);
        assert_eq!(summary.total_duration_millis, 60_000);
        assert!(summary.average_pace_sec_per_km.is_none());
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(849.6), "850 m");
        assert_eq!(format_distance(1_423.0), "1.42 km");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(20_000), "00:00:20");
        assert_eq!(format_duration(3_725_999), "01:02:05");
        assert_eq!(format_duration(-5), "00:00:00");
    }

    #[test]
    fn test_format_pace() {
        assert_eq!(format_pace(Some(725.0)), "12'05\"/km");
        assert_eq!(format_pace(Some(59.6)), "1'00\"/km");
        assert_eq!(format_pace(None), "--");
        assert_eq!(format_pace(Some(f64::INFINITY)), "--");
    }
}
