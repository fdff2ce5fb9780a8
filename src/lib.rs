//! Convert Garmin GPX 1.1 and TCX v2 activity recordings to GeoJSON, adding
//! cumulative distance and velocity to every position.

pub mod assembler;
pub mod converter;
pub mod error;
pub mod format;
pub mod motion;
pub mod options;
pub mod parser;
pub mod types;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use crate::error::{ConvertError, Location};
pub use crate::format::DocumentFormat;
pub use crate::options::{ConvertOptions, CoordinateLayout};

/// Convert a GPX or TCX document to a GeoJSON FeatureCollection value.
pub fn convert(xml: &str, opts: &ConvertOptions) -> Result<serde_json::Value, ConvertError> {
    let document = parser::parse_document(xml)?;
    let collection = converter::to_feature_collection(&document, opts);
    Ok(assembler::render(&collection, opts.layout)?)
}

/// Convert GPX/TCX string to GeoJSON, returned as a JS object.
#[wasm_bindgen(js_name = garminToGeoJson)]
pub fn garmin_to_geojson(xml: &str, options: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let value = convert(xml, &opts)?;
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Convert GPX/TCX string to GeoJSON, returned as a JSON string.
#[wasm_bindgen(js_name = garminToGeoJsonString)]
pub fn garmin_to_geojson_string(xml: &str, options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let value = convert(xml, &opts)?;
    serde_json::to_string(&value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn parse_options(options: JsValue) -> Result<ConvertOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(ConvertOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
