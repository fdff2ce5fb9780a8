use quick_xml::NsReader;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};

use crate::error::ConvertError;

pub const GPX_NAMESPACE: &[u8] = b"http://www.topografix.com/GPX/1/1";
pub const TRACK_STATS_NAMESPACE: &[u8] =
    b"http://www.garmin.com/xmlschemas/TrackStatsExtension/v1";
pub const TCX_NAMESPACE: &[u8] = b"http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2";

/// Namespaces the converters understand, resolved from an element's bound URI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnownNamespace {
    Gpx,
    TrackStats,
    Tcx,
    Other,
}

impl From<ResolveResult<'_>> for KnownNamespace {
    fn from(result: ResolveResult<'_>) -> Self {
        match result {
            ResolveResult::Bound(Namespace(GPX_NAMESPACE)) => Self::Gpx,
            ResolveResult::Bound(Namespace(TRACK_STATS_NAMESPACE)) => Self::TrackStats,
            ResolveResult::Bound(Namespace(TCX_NAMESPACE)) => Self::Tcx,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Gpx,
    Tcx,
}

/// Pick the converter from the namespace and local name of the root element.
pub fn detect_format(xml: &str) -> Result<DocumentFormat, ConvertError> {
    let mut reader = NsReader::from_str(xml);

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        let ns = KnownNamespace::from(resolved);
        match event {
            Event::Start(e) | Event::Empty(e) => {
                return match (ns, e.local_name().as_ref()) {
                    (KnownNamespace::Gpx, b"gpx") => Ok(DocumentFormat::Gpx),
                    (KnownNamespace::Tcx, b"TrainingCenterDatabase") => Ok(DocumentFormat::Tcx),
                    _ => Err(ConvertError::UnsupportedFormat {
                        root: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    }),
                };
            }
            Event::Eof => {
                return Err(ConvertError::UnsupportedFormat {
                    root: String::new(),
                });
            }
            _ => {}
        }
    }
}
