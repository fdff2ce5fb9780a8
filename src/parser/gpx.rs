use std::collections::BTreeMap;

use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use super::{
    Outline, Result, parse_float, parse_integer, parse_timestamp, read_text_owned, require,
    required_float, unclosed,
};
use crate::error::{ConvertError, Location};
use crate::format::KnownNamespace;
use crate::types::{Fix, GpxTrack};

/// Parse every <trk> of a GPX 1.1 document.
pub fn parse_gpx(xml: &str) -> Result<Vec<GpxTrack>> {
    let mut reader = NsReader::from_str(xml);
    let mut tracks = Vec::new();
    let mut outline = Outline::default();

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        outline.observe(&event)?;
        match (KnownNamespace::from(resolved), event) {
            (KnownNamespace::Gpx, Event::Start(e)) if e.local_name().as_ref() == b"trk" => {
                let track = parse_track(&mut reader, tracks.len() + 1)?;
                tracks.push(track);
                outline.leave();
            }
            (KnownNamespace::Gpx, Event::Empty(e)) if e.local_name().as_ref() == b"trk" => {
                return Err(ConvertError::MissingField {
                    field: "name",
                    location: Location::Track {
                        track: tracks.len() + 1,
                    },
                });
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }

    Ok(tracks)
}

/// Parse a <trk> element. Called after its start tag.
fn parse_track(reader: &mut NsReader<&[u8]>, index: usize) -> Result<GpxTrack> {
    let location = Location::Track { track: index };
    let mut track = GpxTrack::default();
    let mut name: Option<String> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        match (KnownNamespace::from(resolved), event) {
            (KnownNamespace::Gpx, Event::Start(e)) => match e.local_name().as_ref() {
                b"name" => name = Some(read_text_owned(reader, &e)?),
                b"extensions" => parse_extensions(reader, &mut track.stats, location)?,
                b"trkseg" => parse_segment(reader, index, &mut track.points)?,
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            (_, Event::Start(e)) => {
                reader.read_to_end(e.name())?;
            }
            (_, Event::End(e)) if e.local_name().as_ref() == b"trk" => break,
            (_, Event::Eof) => return Err(unclosed(b"trk")),
            _ => {}
        }
    }

    track.name = require(name, "name", location)?;
    debug!(
        track = index,
        name = %track.name,
        points = track.points.len(),
        stats = track.stats.len(),
        "parsed GPX track"
    );

    Ok(track)
}

/// Parse a track's <extensions>, collecting TrackStatsExtension values.
fn parse_extensions(
    reader: &mut NsReader<&[u8]>,
    stats: &mut BTreeMap<String, i64>,
    location: Location,
) -> Result<()> {
    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        match (KnownNamespace::from(resolved), event) {
            (KnownNamespace::TrackStats, Event::Start(e))
                if e.local_name().as_ref() == b"TrackStatsExtension" =>
            {
                parse_track_stats(reader, stats, location)?;
            }
            (_, Event::Start(e)) => {
                reader.read_to_end(e.name())?;
            }
            (_, Event::End(e)) if e.local_name().as_ref() == b"extensions" => break,
            (_, Event::Eof) => return Err(unclosed(b"extensions")),
            _ => {}
        }
    }

    Ok(())
}

/// Every TrackStats child of <TrackStatsExtension> becomes an integer stat keyed
/// by its local name. Children in other namespaces are skipped.
fn parse_track_stats(
    reader: &mut NsReader<&[u8]>,
    stats: &mut BTreeMap<String, i64>,
    location: Location,
) -> Result<()> {
    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        match (KnownNamespace::from(resolved), event) {
            (KnownNamespace::TrackStats, Event::Start(e)) => {
                let key = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let text = read_text_owned(reader, &e)?;
                let value = parse_integer(&text, &key, location)?;
                stats.insert(key, value);
            }
            (KnownNamespace::TrackStats, Event::Empty(e)) => {
                return Err(ConvertError::MalformedNumericField {
                    field: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    value: String::new(),
                    location,
                });
            }
            (_, Event::Start(e)) => {
                reader.read_to_end(e.name())?;
            }
            (_, Event::End(e)) if e.local_name().as_ref() == b"TrackStatsExtension" => break,
            (_, Event::Eof) => return Err(unclosed(b"TrackStatsExtension")),
            _ => {}
        }
    }

    Ok(())
}

/// Parse a <trkseg> element, appending its points to the track.
fn parse_segment(reader: &mut NsReader<&[u8]>, track: usize, points: &mut Vec<Fix>) -> Result<()> {
    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        match (KnownNamespace::from(resolved), event) {
            (KnownNamespace::Gpx, Event::Start(e)) if e.local_name().as_ref() == b"trkpt" => {
                let location = Location::TrackPoint {
                    track,
                    point: points.len() + 1,
                };
                points.push(parse_point(reader, &e, location)?);
            }
            (KnownNamespace::Gpx, Event::Empty(e)) if e.local_name().as_ref() == b"trkpt" => {
                let location = Location::TrackPoint {
                    track,
                    point: points.len() + 1,
                };
                parse_lat_lon(&e, location)?;
                return Err(ConvertError::MissingField {
                    field: "ele",
                    location,
                });
            }
            (_, Event::Start(e)) => {
                reader.read_to_end(e.name())?;
            }
            (_, Event::End(e)) if e.local_name().as_ref() == b"trkseg" => break,
            (_, Event::Eof) => return Err(unclosed(b"trkseg")),
            _ => {}
        }
    }

    Ok(())
}

/// Parse lat/lon attributes from a <trkpt> start tag.
fn parse_lat_lon(e: &BytesStart<'_>, location: Location) -> Result<(f64, f64)> {
    let mut lat: Option<f64> = None;
    let mut lon: Option<f64> = None;

    for attr_result in e.attributes() {
        let attr = attr_result.map_err(quick_xml::Error::from)?;
        let val = String::from_utf8_lossy(&attr.value);
        match attr.key.local_name().as_ref() {
            b"lat" => lat = Some(parse_float(&val, "lat", location)?),
            b"lon" => lon = Some(parse_float(&val, "lon", location)?),
            _ => {}
        }
    }

    Ok((
        require(lat, "lat", location)?,
        require(lon, "lon", location)?,
    ))
}

/// Parse a <trkpt> element and its children.
/// Called after receiving Event::Start for the point element.
fn parse_point(
    reader: &mut NsReader<&[u8]>,
    start: &BytesStart<'_>,
    location: Location,
) -> Result<Fix> {
    let (lat, lon) = parse_lat_lon(start, location)?;
    let end_name = start.name().as_ref().to_vec();
    let mut ele: Option<String> = None;
    let mut time: Option<String> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        match (KnownNamespace::from(resolved), event) {
            (KnownNamespace::Gpx, Event::Start(e)) if e.local_name().as_ref() == b"ele" => {
                ele = Some(read_text_owned(reader, &e)?);
            }
            (KnownNamespace::Gpx, Event::Start(e)) if e.local_name().as_ref() == b"time" => {
                time = Some(read_text_owned(reader, &e)?);
            }
            (_, Event::Start(e)) => {
                // Skip unknown/extensions elements
                reader.read_to_end(e.name())?;
            }
            (_, Event::End(e)) if e.name().as_ref() == end_name.as_slice() => break,
            (_, Event::Eof) => return Err(unclosed(&end_name)),
            _ => {}
        }
    }

    let ele = required_float(ele, "ele", location)?;
    let time = parse_timestamp(&require(time, "time", location)?, location)?;

    Ok(Fix {
        lon,
        lat,
        ele,
        time,
        reported_distance: None,
    })
}
