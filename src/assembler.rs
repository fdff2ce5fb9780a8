//! GeoJSON output: the FeatureCollection model and its two renderings.

use chrono::{DateTime, Utc};
use geojson::{Geometry, Value};
use serde::Serialize;
use serde::ser::{SerializeTuple, Serializer};
use serde_json::{Map, Value as JsonValue};

use crate::options::CoordinateLayout;
use crate::types::{Fix, TIMESTAMP_FORMAT};

/// One output position with its motion metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub lon: f64,
    pub lat: f64,
    pub ele: f64,
    pub time: DateTime<Utc>,
    /// Meters since the first point of the track or lap.
    pub distance_m: f64,
    /// Meters per second since the previous point.
    pub velocity_mps: f64,
}

impl TrackPoint {
    pub fn new(fix: &Fix, distance_m: f64, velocity_mps: f64) -> Self {
        Self {
            lon: fix.lon,
            lat: fix.lat,
            ele: fix.ele,
            time: fix.time,
            distance_m,
            velocity_mps,
        }
    }

    pub fn timestamp(&self) -> String {
        self.time.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Serialized as `[lon, lat, ele, time, cumulative_distance, velocity]`.
impl Serialize for TrackPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(6)?;
        tuple.serialize_element(&self.lon)?;
        tuple.serialize_element(&self.lat)?;
        tuple.serialize_element(&self.ele)?;
        tuple.serialize_element(&self.timestamp())?;
        tuple.serialize_element(&self.distance_m)?;
        tuple.serialize_element(&self.velocity_mps)?;
        tuple.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LineString {
    #[serde(rename = "type")]
    kind: &'static str,
    pub coordinates: Vec<TrackPoint>,
}

impl LineString {
    pub fn new(coordinates: Vec<TrackPoint>) -> Self {
        Self {
            kind: "LineString",
            coordinates,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub properties: Map<String, JsonValue>,
    pub geometry: LineString,
}

impl Feature {
    pub fn new(properties: Map<String, JsonValue>, coordinates: Vec<TrackPoint>) -> Self {
        Self {
            kind: "Feature",
            properties,
            geometry: LineString::new(coordinates),
        }
    }

    pub fn coordinates(&self) -> &[TrackPoint] {
        &self.geometry.coordinates
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
        }
    }
}

/// Render the collection as a JSON value in the requested layout.
/// Objects come out with sorted keys.
pub fn render(
    collection: &FeatureCollection,
    layout: CoordinateLayout,
) -> serde_json::Result<JsonValue> {
    match layout {
        CoordinateLayout::Extended => serde_json::to_value(collection),
        CoordinateLayout::Standard => serde_json::to_value(to_geojson(collection)),
    }
}

/// Convert to a strict GeoJSON FeatureCollection with `[lon, lat, ele]` positions.
pub fn to_geojson(collection: &FeatureCollection) -> geojson::FeatureCollection {
    geojson::FeatureCollection {
        bbox: None,
        features: collection.features.iter().map(standard_feature).collect(),
        foreign_members: None,
    }
}

fn standard_feature(feature: &Feature) -> geojson::Feature {
    let coords: Vec<Vec<f64>> = feature
        .coordinates()
        .iter()
        .map(|pt| vec![pt.lon, pt.lat, pt.ele])
        .collect();

    let mut props = feature.properties.clone();
    insert_coordinate_properties(&mut props, feature.coordinates());

    geojson::Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(coords))),
        id: None,
        properties: Some(props),
        foreign_members: None,
    }
}

fn insert_coordinate_properties(props: &mut Map<String, JsonValue>, points: &[TrackPoint]) {
    let times = points.iter().map(|pt| JsonValue::String(pt.timestamp()));
    let distances = points.iter().map(|pt| JsonValue::from(pt.distance_m));
    let velocities = points.iter().map(|pt| JsonValue::from(pt.velocity_mps));

    let mut coord_props = Map::new();
    coord_props.insert("times".to_string(), JsonValue::Array(times.collect()));
    coord_props.insert("distances".to_string(), JsonValue::Array(distances.collect()));
    coord_props.insert("velocities".to_string(), JsonValue::Array(velocities.collect()));
    props.insert(
        "coordinateProperties".to_string(),
        JsonValue::Object(coord_props),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn point(lon: f64, lat: f64, seconds: i64, distance_m: f64, velocity_mps: f64) -> TrackPoint {
        TrackPoint {
            lon,
            lat,
            ele: 100.0,
            time: Utc.timestamp_opt(1_577_836_800 + seconds, 0).unwrap(),
            distance_m,
            velocity_mps,
        }
    }

    fn sample() -> FeatureCollection {
        let mut props = Map::new();
        props.insert("name".to_string(), json!("Run"));
        FeatureCollection::new(vec![Feature::new(
            props,
            vec![point(8.0, 47.0, 0, 0.0, 0.0), point(8.0, 47.001, 60, 111.0, 1.85)],
        )])
    }

    #[test]
    fn test_extended_layout() {
        let value = render(&sample(), CoordinateLayout::Extended).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": {"name": "Run"},
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [
                            [8.0, 47.0, 100.0, "2020-01-01T00:00:00Z", 0.0, 0.0],
                            [8.0, 47.001, 100.0, "2020-01-01T00:01:00Z", 111.0, 1.85]
                        ]
                    }
                }]
            })
        );
    }

    #[test]
    fn test_standard_layout() {
        let value = render(&sample(), CoordinateLayout::Standard).unwrap();
        let feature = &value["features"][0];
        assert_eq!(feature["geometry"]["type"], "LineString");
        assert_eq!(
            feature["geometry"]["coordinates"],
            json!([[8.0, 47.0, 100.0], [8.0, 47.001, 100.0]])
        );
        assert_eq!(feature["properties"]["name"], "Run");
        let coord_props = &feature["properties"]["coordinateProperties"];
        assert_eq!(
            coord_props["times"],
            json!(["2020-01-01T00:00:00Z", "2020-01-01T00:01:00Z"])
        );
        assert_eq!(coord_props["distances"], json!([0.0, 111.0]));
        assert_eq!(coord_props["velocities"], json!([0.0, 1.85]));
    }

    #[test]
    fn test_standard_layout_parses_as_geojson() {
        let value = render(&sample(), CoordinateLayout::Standard).unwrap();
        let parsed: geojson::GeoJson = value.to_string().parse().unwrap();
        match parsed {
            geojson::GeoJson::FeatureCollection(fc) => {
                assert_eq!(fc.features.len(), 1);
                let geom = fc.features[0].geometry.as_ref().unwrap();
                assert!(matches!(&geom.value, Value::LineString(coords) if coords.len() == 2));
            }
            _ => panic!("Expected FeatureCollection"),
        }
    }

    #[test]
    fn test_keys_sorted() {
        let value = render(&sample(), CoordinateLayout::Extended).unwrap();
        let keys: Vec<&String> = value["features"][0].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["geometry", "properties", "type"]);
    }

    #[test]
    fn test_empty_collection() {
        let value = render(&FeatureCollection::new(Vec::new()), CoordinateLayout::Extended).unwrap();
        assert_eq!(value, json!({"type": "FeatureCollection", "features": []}));
    }
}
