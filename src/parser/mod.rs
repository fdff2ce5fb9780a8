//! Streaming readers for the two supported activity formats.
//!
//! Both readers walk the document with a namespace-aware [`NsReader`] and
//! only descend into elements whose namespace and local name they expect;
//! any other subtree is skipped wholesale.

pub mod gpx;
pub mod tcx;

use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::NsReader;
use quick_xml::errors::IllFormedError;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use crate::error::{ConvertError, Location};
use crate::format::{DocumentFormat, detect_format};
use crate::types::{ActivityDocument, TIMESTAMP_FORMAT};

pub use gpx::parse_gpx;
pub use tcx::parse_tcx;

type Result<T> = std::result::Result<T, ConvertError>;

/// Detect the document format and parse it with the matching reader.
pub fn parse_document(xml: &str) -> Result<ActivityDocument> {
    let format = detect_format(xml)?;
    debug!(?format, "detected document format");

    match format {
        DocumentFormat::Gpx => parse_gpx(xml).map(ActivityDocument::Gpx),
        DocumentFormat::Tcx => parse_tcx(xml).map(ActivityDocument::Tcx),
    }
}

/// Read text content of an element as an owned String.
/// Handles regular text, CDATA sections, and entity references (Event::GeneralRef).
fn read_text_owned(reader: &mut NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<String> {
    let end_name = start.name().as_ref().to_vec();
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Text(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::CData(e) => text.push_str(&String::from_utf8_lossy(e.as_ref())),
            Event::GeneralRef(e) => match e.resolve_char_ref() {
                Ok(Some(ch)) => text.push(ch),
                _ => {
                    // Predefined XML entities: amp, lt, gt, quot, apos
                    let name = String::from_utf8_lossy(e.as_ref());
                    let ch = match &*name {
                        "amp" => '&',
                        "lt" => '<',
                        "gt" => '>',
                        "quot" => '"',
                        "apos" => '\'',
                        _ => return Err(ConvertError::UnknownEntity(name.into_owned())),
                    };
                    text.push(ch);
                }
            },
            Event::End(e) if e.name().as_ref() == end_name.as_slice() => break,
            Event::Eof => return Err(unclosed(&end_name)),
            _ => {}
        }
    }

    Ok(text)
}

/// The document ended while `name` was still open.
fn unclosed(name: &[u8]) -> ConvertError {
    ConvertError::Xml(quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(
        String::from_utf8_lossy(name).into_owned(),
    )))
}

/// Nesting seen by a top-level reader loop. Rejects a root element that is
/// never closed and any markup or text after it.
#[derive(Debug, Default)]
struct Outline {
    root: Option<Vec<u8>>,
    depth: usize,
    closed: bool,
}

impl Outline {
    fn observe(&mut self, event: &Event<'_>) -> Result<()> {
        match event {
            Event::Start(e) | Event::Empty(e) if self.closed => Err(ConvertError::TrailingContent(
                format!("<{}>", String::from_utf8_lossy(e.name().as_ref())),
            )),
            Event::Text(e) if self.closed && !e.iter().all(u8::is_ascii_whitespace) => {
                Err(ConvertError::TrailingContent("text".to_string()))
            }
            Event::CData(_) | Event::GeneralRef(_) if self.closed => {
                Err(ConvertError::TrailingContent("text".to_string()))
            }
            Event::Start(e) => {
                self.root.get_or_insert_with(|| e.name().as_ref().to_vec());
                self.depth += 1;
                Ok(())
            }
            Event::Empty(_) if self.depth == 0 => {
                self.closed = true;
                Ok(())
            }
            Event::End(_) => {
                self.leave();
                Ok(())
            }
            Event::Eof if !self.closed => Err(unclosed(self.root.as_deref().unwrap_or_default())),
            _ => Ok(()),
        }
    }

    /// Account for an element whose end tag was consumed by a nested reader.
    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.closed = self.depth == 0;
    }
}

fn require<T>(value: Option<T>, field: &'static str, location: Location) -> Result<T> {
    value.ok_or(ConvertError::MissingField { field, location })
}

fn parse_float(text: &str, field: &str, location: Location) -> Result<f64> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ConvertError::MalformedNumericField {
            field: field.to_string(),
            value: trimmed.to_string(),
            location,
        }),
    }
}

fn required_float(value: Option<String>, field: &'static str, location: Location) -> Result<f64> {
    parse_float(&require(value, field, location)?, field, location)
}

fn parse_integer(text: &str, field: &str, location: Location) -> Result<i64> {
    let trimmed = text.trim();
    trimmed
        .parse::<i64>()
        .map_err(|_| ConvertError::MalformedNumericField {
            field: field.to_string(),
            value: trimmed.to_string(),
            location,
        })
}

fn parse_timestamp(text: &str, location: Location) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text.trim(), TIMESTAMP_FORMAT)
        .map(|t| t.and_utc())
        .map_err(|_| ConvertError::MalformedTimestamp {
            value: text.trim().to_string(),
            location,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timestamp() {
        let t = parse_timestamp("2020-01-01T10:20:30Z", Location::Document).unwrap();
        assert_eq!(t.timestamp(), 1_577_874_030);
    }

    #[test]
    fn test_timestamp_without_markers_rejected() {
        let err = parse_timestamp("2020-01-01 00:00:00", Location::Document).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedTimestamp { .. }));
    }

    #[test]
    fn test_fractional_seconds_rejected() {
        assert!(parse_timestamp("2020-01-01T00:00:00.000Z", Location::Document).is_err());
    }

    #[test]
    fn test_offset_timestamp_rejected() {
        assert!(parse_timestamp("2020-01-01T00:00:00+02:00", Location::Document).is_err());
    }

    #[test]
    fn test_parse_float_trims_and_rejects_non_finite() {
        assert_eq!(parse_float(" 12.5\n", "ele", Location::Document).unwrap(), 12.5);
        assert!(parse_float("NaN", "ele", Location::Document).is_err());
        assert!(parse_float("abc", "ele", Location::Document).is_err());
    }

    #[test]
    fn test_required_float() {
        let location = Location::Track { track: 1 };
        assert_eq!(required_float(Some("2.5".into()), "ele", location).unwrap(), 2.5);
        assert!(matches!(
            required_float(None, "ele", location),
            Err(ConvertError::MissingField { field: "ele", .. })
        ));
        assert!(matches!(
            required_float(Some("high".into()), "ele", location),
            Err(ConvertError::MalformedNumericField { .. })
        ));
    }

    fn outline_of(xml: &str) -> Result<()> {
        let mut reader = NsReader::from_str(xml);
        let mut outline = Outline::default();
        loop {
            let event = reader.read_event()?;
            outline.observe(&event)?;
            if matches!(event, Event::Eof) {
                return Ok(());
            }
        }
    }

    #[test]
    fn test_outline_accepts_complete_document() {
        assert!(outline_of("<?xml version=\"1.0\"?>\n<a><b/><c>x</c></a>\n<!-- done -->\n").is_ok());
        assert!(outline_of("<a/>").is_ok());
    }

    #[test]
    fn test_outline_rejects_unclosed_root() {
        match outline_of("<a><b></b>") {
            Err(ConvertError::Xml(quick_xml::Error::IllFormed(IllFormedError::MissingEndTag(
                name,
            )))) => assert_eq!(name, "a"),
            other => panic!("Expected MissingEndTag, got {other:?}"),
        }
    }

    #[test]
    fn test_outline_rejects_content_after_root() {
        assert!(matches!(
            outline_of("<a></a><junk/>"),
            Err(ConvertError::TrailingContent(found)) if found == "<junk>"
        ));
        assert!(matches!(
            outline_of("<a></a>trailing"),
            Err(ConvertError::TrailingContent(_))
        ));
    }

    #[test]
    fn test_unclosed_text_element() {
        let mut reader = NsReader::from_str("<name>Half");
        let Event::Start(start) = reader.read_event().unwrap() else {
            panic!("Expected start tag");
        };
        let start = start.into_owned();
        assert!(matches!(
            read_text_owned(&mut reader, &start),
            Err(ConvertError::Xml(quick_xml::Error::IllFormed(
                IllFormedError::MissingEndTag(_)
            )))
        ));
    }

    #[test]
    fn test_parse_integer_rejects_float() {
        assert_eq!(parse_integer("42", "Calories", Location::Document).unwrap(), 42);
        match parse_integer("4.2", "Calories", Location::Document) {
            Err(ConvertError::MalformedNumericField { field, value, .. }) => {
                assert_eq!(field, "Calories");
                assert_eq!(value, "4.2");
            }
            other => panic!("Expected MalformedNumericField, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_document_dispatches() {
        let gpx = r#"<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1"></gpx>"#;
        assert!(matches!(
            parse_document(gpx).unwrap(),
            ActivityDocument::Gpx(tracks) if tracks.is_empty()
        ));

        let tcx = r#"<TrainingCenterDatabase xmlns="http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2">
  <Activities/>
</TrainingCenterDatabase>"#;
        assert!(matches!(
            parse_document(tcx).unwrap(),
            ActivityDocument::Tcx(laps) if laps.is_empty()
        ));
    }
}
