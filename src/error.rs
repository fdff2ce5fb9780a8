use std::fmt;

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Where in the source document an error was found. Indices are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Document,
    Track { track: usize },
    TrackPoint { track: usize, point: usize },
    Lap { activity: usize, lap: usize },
    Trackpoint { activity: usize, lap: usize, point: usize },
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Track { track } => write!(f, "track {track}"),
            Self::TrackPoint { track, point } => write!(f, "track {track}, point {point}"),
            Self::Lap { activity, lap } => write!(f, "activity {activity}, lap {lap}"),
            Self::Trackpoint {
                activity,
                lap,
                point,
            } => write!(f, "activity {activity}, lap {lap}, trackpoint {point}"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("unsupported format: root element <{root}> is neither GPX 1.1 nor TCX v2")]
    UnsupportedFormat { root: String },

    #[error("missing required field '{field}' in {location}")]
    MissingField {
        field: &'static str,
        location: Location,
    },

    #[error("malformed timestamp '{value}' in {location}, expected YYYY-MM-DDTHH:MM:SSZ")]
    MalformedTimestamp { value: String, location: Location },

    #[error("malformed numeric value '{value}' for '{field}' in {location}")]
    MalformedNumericField {
        field: String,
        value: String,
        location: Location,
    },

    #[error("unrecognized entity reference '&{0};'")]
    UnknownEntity(String),

    #[error("unexpected {0} after the root element")]
    TrailingContent(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ConvertError> for JsValue {
    fn from(e: ConvertError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}
