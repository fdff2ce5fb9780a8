use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::assembler::{Feature, FeatureCollection, TrackPoint};
use crate::motion::MotionTracker;
use crate::options::ConvertOptions;
use crate::types::{ActivityDocument, GpxTrack, TcxLap};

/// Convert a parsed document to a FeatureCollection: one Feature per GPX
/// track or per TCX lap, in document order.
pub fn to_feature_collection(doc: &ActivityDocument, opts: &ConvertOptions) -> FeatureCollection {
    let features: Vec<Feature> = match doc {
        ActivityDocument::Gpx(tracks) => tracks
            .iter()
            .map(|trk| track_to_feature(trk, opts))
            .collect(),
        ActivityDocument::Tcx(laps) => laps.iter().map(|lap| lap_to_feature(lap, opts)).collect(),
    };

    FeatureCollection::new(features)
}

/// Cumulative distance is the running sum of geodesic deltas.
fn track_to_feature(trk: &GpxTrack, opts: &ConvertOptions) -> Feature {
    let mut tracker = MotionTracker::new();
    let coordinates: Vec<TrackPoint> = trk
        .points
        .iter()
        .map(|fix| {
            let step = tracker.advance(fix);
            TrackPoint::new(fix, tracker.travelled_m(), step.velocity_mps)
        })
        .collect();

    let mut props = Map::new();
    if opts.include_properties {
        props.insert("name".to_string(), JsonValue::String(trk.name.clone()));
        for (key, value) in &trk.stats {
            props.insert(key.clone(), JsonValue::from(*value));
        }
    }

    debug!(
        name = %trk.name,
        points = coordinates.len(),
        distance_m = tracker.travelled_m(),
        "converted track"
    );
    Feature::new(props, coordinates)
}

/// Cumulative distance comes from the device's DistanceMeters, re-based to the
/// lap's first reported value. Points without one fall back to the geodesic
/// delta. The result never decreases.
fn lap_to_feature(lap: &TcxLap, opts: &ConvertOptions) -> Feature {
    let mut tracker = MotionTracker::new();
    let mut origin: Option<f64> = None;
    let mut cumulative = 0.0;
    let mut coordinates = Vec::with_capacity(lap.points.len());

    for fix in &lap.points {
        let step = tracker.advance(fix);
        let estimate = cumulative + step.delta_m;
        let candidate = match fix.reported_distance {
            Some(reported) => reported - *origin.get_or_insert(reported - estimate),
            None => estimate,
        };
        cumulative = candidate.max(cumulative);
        coordinates.push(TrackPoint::new(fix, cumulative, step.velocity_mps));
    }

    let mut props = Map::new();
    if opts.include_properties {
        let summary = &lap.summary;
        props.insert(
            "TotalTimeSeconds".to_string(),
            JsonValue::from(summary.total_time_seconds),
        );
        props.insert(
            "DistanceMeters".to_string(),
            JsonValue::from(summary.distance_meters),
        );
        props.insert(
            "MaximumSpeed".to_string(),
            JsonValue::from(summary.maximum_speed),
        );
        props.insert("Calories".to_string(), JsonValue::from(summary.calories));
        props.insert(
            "Intensity".to_string(),
            JsonValue::String(summary.intensity.clone()),
        );
        props.insert(
            "TriggerMethod".to_string(),
            JsonValue::String(summary.trigger_method.clone()),
        );
    }

    debug!(
        activity = lap.activity,
        points = coordinates.len(),
        skipped = lap.skipped,
        distance_m = cumulative,
        "converted lap"
    );
    Feature::new(props, coordinates)
}
