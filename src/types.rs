use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use geo::Point;

/// Timestamp pattern accepted on input and written on output (UTC, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A single positioned sample (GPX trkpt or positioned TCX Trackpoint).
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    pub lon: f64,
    pub lat: f64,
    pub ele: f64,
    pub time: DateTime<Utc>,
    /// Cumulative distance reported by the device (TCX only).
    pub reported_distance: Option<f64>,
}

impl Fix {
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// A GPX track (<trk>); points of all segments, in document order.
#[derive(Debug, Default)]
pub struct GpxTrack {
    pub name: String,
    /// Children of the Garmin TrackStatsExtension, keyed by local name.
    pub stats: BTreeMap<String, i64>,
    pub points: Vec<Fix>,
}

/// Summary fields of a TCX <Lap>.
#[derive(Debug, Clone, PartialEq)]
pub struct LapSummary {
    pub total_time_seconds: f64,
    pub distance_meters: f64,
    pub maximum_speed: f64,
    pub calories: i64,
    pub intensity: String,
    pub trigger_method: String,
}

/// A TCX <Lap> with its positioned trackpoints.
#[derive(Debug)]
pub struct TcxLap {
    /// 1-based index of the enclosing <Activity>.
    pub activity: usize,
    pub summary: LapSummary,
    pub points: Vec<Fix>,
    /// Trackpoints dropped for lack of a <Position>.
    pub skipped: usize,
}

#[derive(Debug)]
pub enum ActivityDocument {
    Gpx(Vec<GpxTrack>),
    Tcx(Vec<TcxLap>),
}
