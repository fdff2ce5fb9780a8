use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use tracing::debug;

use super::{
    Outline, Result, parse_float, parse_integer, parse_timestamp, read_text_owned, require,
    required_float, unclosed,
};
use crate::error::{ConvertError, Location};
use crate::format::KnownNamespace;
use crate::types::{Fix, LapSummary, TcxLap};

/// Raw text of the lap-level summary elements, validated once the lap closes.
#[derive(Default)]
struct LapFields {
    total_time_seconds: Option<String>,
    distance_meters: Option<String>,
    maximum_speed: Option<String>,
    calories: Option<String>,
    intensity: Option<String>,
    trigger_method: Option<String>,
}

impl LapFields {
    fn into_summary(self, location: Location) -> Result<LapSummary> {
        Ok(LapSummary {
            total_time_seconds: required_float(
                self.total_time_seconds,
                "TotalTimeSeconds",
                location,
            )?,
            distance_meters: required_float(self.distance_meters, "DistanceMeters", location)?,
            maximum_speed: required_float(self.maximum_speed, "MaximumSpeed", location)?,
            calories: parse_integer(
                &require(self.calories, "Calories", location)?,
                "Calories",
                location,
            )?,
            intensity: require(self.intensity, "Intensity", location)?.trim().to_string(),
            trigger_method: require(self.trigger_method, "TriggerMethod", location)?
                .trim()
                .to_string(),
        })
    }
}

/// Parse every <Lap> of every <Activity> in a TCX v2 document.
pub fn parse_tcx(xml: &str) -> Result<Vec<TcxLap>> {
    let mut reader = NsReader::from_str(xml);
    let mut laps = Vec::new();
    let mut activity = 0;
    let mut outline = Outline::default();

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        outline.observe(&event)?;
        match (KnownNamespace::from(resolved), event) {
            (KnownNamespace::Tcx, Event::Start(e)) if e.local_name().as_ref() == b"Activity" => {
                activity += 1;
                parse_activity(&mut reader, activity, &mut laps)?;
                outline.leave();
            }
            (KnownNamespace::Tcx, Event::Empty(e)) if e.local_name().as_ref() == b"Activity" => {
                activity += 1;
            }
            (_, Event::Eof) => break,
            _ => {}
        }
    }

    Ok(laps)
}

/// Parse an <Activity> element. Called after its start tag.
fn parse_activity(
    reader: &mut NsReader<&[u8]>,
    activity: usize,
    laps: &mut Vec<TcxLap>,
) -> Result<()> {
    let mut lap = 0;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        match (KnownNamespace::from(resolved), event) {
            (KnownNamespace::Tcx, Event::Start(e)) if e.local_name().as_ref() == b"Lap" => {
                lap += 1;
                laps.push(parse_lap(reader, activity, lap)?);
            }
            (KnownNamespace::Tcx, Event::Empty(e)) if e.local_name().as_ref() == b"Lap" => {
                lap += 1;
                return Err(ConvertError::MissingField {
                    field: "TotalTimeSeconds",
                    location: Location::Lap { activity, lap },
                });
            }
            (_, Event::Start(e)) => {
                reader.read_to_end(e.name())?;
            }
            (_, Event::End(e)) if e.local_name().as_ref() == b"Activity" => break,
            (_, Event::Eof) => return Err(unclosed(b"Activity")),
            _ => {}
        }
    }

    Ok(())
}

/// Parse a <Lap> element: its summary fields and all of its <Track> children.
fn parse_lap(reader: &mut NsReader<&[u8]>, activity: usize, lap: usize) -> Result<TcxLap> {
    let location = Location::Lap { activity, lap };
    let mut fields = LapFields::default();
    let mut points = Vec::new();
    let mut seen = 0;
    let mut skipped = 0;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        match (KnownNamespace::from(resolved), event) {
            (KnownNamespace::Tcx, Event::Start(e)) => match e.local_name().as_ref() {
                b"TotalTimeSeconds" => {
                    fields.total_time_seconds = Some(read_text_owned(reader, &e)?)
                }
                b"DistanceMeters" => fields.distance_meters = Some(read_text_owned(reader, &e)?),
                b"MaximumSpeed" => fields.maximum_speed = Some(read_text_owned(reader, &e)?),
                b"Calories" => fields.calories = Some(read_text_owned(reader, &e)?),
                b"Intensity" => fields.intensity = Some(read_text_owned(reader, &e)?),
                b"TriggerMethod" => fields.trigger_method = Some(read_text_owned(reader, &e)?),
                b"Track" => {
                    skipped += parse_track(reader, activity, lap, &mut seen, &mut points)?
                }
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            (_, Event::Start(e)) => {
                reader.read_to_end(e.name())?;
            }
            (_, Event::End(e)) if e.local_name().as_ref() == b"Lap" => break,
            (_, Event::Eof) => return Err(unclosed(b"Lap")),
            _ => {}
        }
    }

    let summary = fields.into_summary(location)?;
    debug!(
        activity,
        lap,
        points = points.len(),
        skipped,
        "parsed TCX lap"
    );

    Ok(TcxLap {
        activity,
        summary,
        points,
        skipped,
    })
}

/// Parse a <Track> element, appending positioned trackpoints to the lap.
/// Returns how many trackpoints were skipped; `seen` numbers trackpoints across
/// all tracks of the lap.
fn parse_track(
    reader: &mut NsReader<&[u8]>,
    activity: usize,
    lap: usize,
    seen: &mut usize,
    points: &mut Vec<Fix>,
) -> Result<usize> {
    let mut skipped = 0;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        match (KnownNamespace::from(resolved), event) {
            (KnownNamespace::Tcx, Event::Start(e)) if e.local_name().as_ref() == b"Trackpoint" => {
                *seen += 1;
                let location = Location::Trackpoint {
                    activity,
                    lap,
                    point: *seen,
                };
                match parse_trackpoint(reader, &e, location)? {
                    Some(fix) => points.push(fix),
                    None => skipped += 1,
                }
            }
            (KnownNamespace::Tcx, Event::Empty(e)) if e.local_name().as_ref() == b"Trackpoint" => {
                *seen += 1;
                skipped += 1;
            }
            (_, Event::Start(e)) => {
                reader.read_to_end(e.name())?;
            }
            (_, Event::End(e)) if e.local_name().as_ref() == b"Track" => break,
            (_, Event::Eof) => return Err(unclosed(b"Track")),
            _ => {}
        }
    }

    Ok(skipped)
}

/// Parse a <Trackpoint>. Returns `None` when it carries no usable <Position>;
/// such points are dropped without looking at their other children.
fn parse_trackpoint(
    reader: &mut NsReader<&[u8]>,
    start: &BytesStart<'_>,
    location: Location,
) -> Result<Option<Fix>> {
    let end_name = start.name().as_ref().to_vec();
    let mut time: Option<String> = None;
    let mut position: Option<(Option<String>, Option<String>)> = None;
    let mut altitude: Option<String> = None;
    let mut distance: Option<String> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        match (KnownNamespace::from(resolved), event) {
            (KnownNamespace::Tcx, Event::Start(e)) => match e.local_name().as_ref() {
                b"Time" => time = Some(read_text_owned(reader, &e)?),
                b"Position" => position = Some(parse_position(reader)?),
                b"AltitudeMeters" => altitude = Some(read_text_owned(reader, &e)?),
                b"DistanceMeters" => distance = Some(read_text_owned(reader, &e)?),
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            (_, Event::Start(e)) => {
                reader.read_to_end(e.name())?;
            }
            (_, Event::End(e)) if e.name().as_ref() == end_name.as_slice() => break,
            (_, Event::Eof) => return Err(unclosed(&end_name)),
            _ => {}
        }
    }

    let (lat, lon) = match position {
        None | Some((None, None)) => return Ok(None),
        Some(coords) => coords,
    };

    let lat = required_float(lat, "LatitudeDegrees", location)?;
    let lon = required_float(lon, "LongitudeDegrees", location)?;
    let ele = required_float(altitude, "AltitudeMeters", location)?;
    let time = parse_timestamp(&require(time, "Time", location)?, location)?;
    let reported_distance = distance
        .map(|d| parse_float(&d, "DistanceMeters", location))
        .transpose()?;

    Ok(Some(Fix {
        lon,
        lat,
        ele,
        time,
        reported_distance,
    }))
}

/// Parse a <Position> element into raw latitude/longitude text.
fn parse_position(reader: &mut NsReader<&[u8]>) -> Result<(Option<String>, Option<String>)> {
    let mut lat: Option<String> = None;
    let mut lon: Option<String> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        match (KnownNamespace::from(resolved), event) {
            (KnownNamespace::Tcx, Event::Start(e)) => match e.local_name().as_ref() {
                b"LatitudeDegrees" => lat = Some(read_text_owned(reader, &e)?),
                b"LongitudeDegrees" => lon = Some(read_text_owned(reader, &e)?),
                _ => {
                    reader.read_to_end(e.name())?;
                }
            },
            (_, Event::Start(e)) => {
                reader.read_to_end(e.name())?;
            }
            (_, Event::End(e)) if e.local_name().as_ref() == b"Position" => break,
            (_, Event::Eof) => return Err(unclosed(b"Position")),
            _ => {}
        }
    }

    Ok((lat, lon))
}
