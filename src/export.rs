// CSV import/export of recorded routes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::error::Result;
use crate::geo::GeoPoint;
use crate::route::{Route, RouteSample};

#[derive(Debug, Serialize, Deserialize)]
struct Row {
    timestamp: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
}

/// Write `timestamp,latitude,longitude` rows, one per sample.
pub fn write_route_csv<W: Write>(route: &Route, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for sample in route.samples() {
        wtr.serialize(Row {
            timestamp: sample.timestamp,
            latitude: sample.point.latitude,
            longitude: sample.point.longitude,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Rebuild a route from CSV. Rows are re-appended, so ordering and
/// coordinates are validated again.
pub fn read_route_csv<R: Read>(reader: R) -> Result<Route> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut route = Route::new();
    for row in rdr.deserialize::<Row>() {
        let row = row?;
        let point = GeoPoint::new(row.latitude, row.longitude)?;
        route.append(RouteSample::new(point, row.timestamp))?;
    }
    Ok(route)
}
