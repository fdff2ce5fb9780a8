#![cfg(target_arch = "wasm32")]

use garmin2geojson::{garmin_to_geojson, garmin_to_geojson_string};
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

const GPX: &str = r#"<?xml version="1.0"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1">
  <trk>
    <name>Run</name>
    <trkseg>
      <trkpt lat="47.0" lon="8.0"><ele>400</ele><time>2020-01-01T00:00:00Z</time></trkpt>
      <trkpt lat="47.001" lon="8.0"><ele>401</ele><time>2020-01-01T00:01:00Z</time></trkpt>
    </trkseg>
  </trk>
</gpx>"#;

#[wasm_bindgen_test]
fn test_string_output_with_default_options() {
    let json = garmin_to_geojson_string(GPX, JsValue::UNDEFINED).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["features"][0]["properties"]["name"], "Run");
    assert_eq!(
        value["features"][0]["geometry"]["coordinates"][0]
            .as_array()
            .unwrap()
            .len(),
        6
    );
}

#[wasm_bindgen_test]
fn test_object_output() {
    let value = garmin_to_geojson(GPX, JsValue::NULL).unwrap();
    assert!(value.is_object());
}

#[wasm_bindgen_test]
fn test_error_surfaces_as_js_value() {
    let err = garmin_to_geojson_string("<kml/>", JsValue::UNDEFINED).unwrap_err();
    assert!(err.as_string().unwrap().contains("unsupported format"));
}
