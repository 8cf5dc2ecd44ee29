//! Decoders from TCX-shaped XML elements to the activity model
//!
//! Each decoder is a pure function of its element and the namespace
//! configuration. Errors are tagged with the index of the failing child on the
//! way up, so the caller sees e.g. `activity 0, lap 2, point 7`.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::DecodeError;
use crate::models::{Activity, Lap, Point};
use crate::xml::{Element, Tag};

/// Garmin Training Center Database v2
pub const TRAINING_CENTER_NS: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2";

/// Garmin Activity Extension v2, home of `TPX` and `RunCadence`
pub const ACTIVITY_EXTENSION_NS: &str = "http://www.garmin.com/xmlschemas/ActivityExtension/v2";

/// Trackpoint timestamps, e.g. `2017-11-25T09:02:42.001000Z`. The fraction is optional.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Namespace URIs used to locate TCX elements by logical name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespaces {
    /// Namespace of the core schema elements (`Activity`, `Lap`, `Trackpoint`, ...)
    pub training_center: String,

    /// Namespace of the `TPX` extension element
    pub activity_extension: String,
}

impl Namespaces {
    pub fn garmin() -> Self {
        Self {
            training_center: TRAINING_CENTER_NS.to_string(),
            activity_extension: ACTIVITY_EXTENSION_NS.to_string(),
        }
    }

    pub(crate) fn tcx<'a>(&'a self, local: &'a str) -> Tag<'a> {
        Tag::new(&self.training_center, local)
    }

    pub(crate) fn extension<'a>(&'a self, local: &'a str) -> Tag<'a> {
        Tag::new(&self.activity_extension, local)
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self::garmin()
    }
}

/// Decode the `Activity` children of an `Activities` element, in document order
pub fn decode_activities(activities: &Element, ns: &Namespaces) -> Result<Vec<Activity>, DecodeError> {
    let nodes = activities.entry(ns.tcx("Activity")).into_sequence();
    if nodes.is_empty() {
        return Err(DecodeError::MissingStructure {
            path: "TrainingCenterDatabase.Activities.Activity".to_string(),
        });
    }

    nodes
        .into_iter()
        .enumerate()
        .map(|(index, node)| decode_activity(node, ns).map_err(|e| e.at_activity(index)))
        .collect()
}

/// Decode one `Activity` element
pub fn decode_activity(node: &Element, ns: &Namespaces) -> Result<Activity, DecodeError> {
    let laps = node
        .entry(ns.tcx("Lap"))
        .into_sequence()
        .into_iter()
        .enumerate()
        .map(|(index, lap)| decode_lap(lap, ns).map_err(|e| e.at_lap(index)))
        .collect::<Result<Vec<_>, _>>()?;

    let name = node
        .child(ns.tcx("Notes"))
        .and_then(Element::text)
        .ok_or_else(|| DecodeError::missing_field("Notes"))?;

    let sport = node
        .attribute("Sport")
        .ok_or_else(|| DecodeError::missing_field("Sport"))?;

    trace!(sport, laps = laps.len(), "decoded activity");

    Activity::new(name, sport, laps).ok_or(DecodeError::EmptyActivity {
        context: Default::default(),
    })
}

/// Decode one `Lap` element. Trackpoints of every `Track` are read in order.
pub fn decode_lap(node: &Element, ns: &Namespaces) -> Result<Lap, DecodeError> {
    let trackpoints: Vec<&Element> = node
        .entry(ns.tcx("Track"))
        .into_sequence()
        .into_iter()
        .flat_map(|track| track.entry(ns.tcx("Trackpoint")).into_sequence())
        .collect();

    let points = trackpoints
        .into_iter()
        .enumerate()
        .map(|(index, trackpoint)| decode_point(trackpoint, ns).map_err(|e| e.at_point(index)))
        .collect::<Result<Vec<_>, _>>()?;

    trace!(points = points.len(), "decoded lap");

    Lap::new(points).ok_or(DecodeError::EmptyLap {
        context: Default::default(),
    })
}

/// Decode one `Trackpoint` element
pub fn decode_point(node: &Element, ns: &Namespaces) -> Result<Point, DecodeError> {
    let time = required_text(node, &[ns.tcx("Time")], "Time").and_then(parse_time)?;

    let latitude = required_float(
        node,
        &[ns.tcx("Position"), ns.tcx("LatitudeDegrees")],
        "LatitudeDegrees",
    )?;
    let longitude = required_float(
        node,
        &[ns.tcx("Position"), ns.tcx("LongitudeDegrees")],
        "LongitudeDegrees",
    )?;
    let altitude = required_float(node, &[ns.tcx("AltitudeMeters")], "AltitudeMeters")?;

    // The only optional field: a missing element or value means no reading.
    let heart_rate = match node.descend(&[ns.tcx("HeartRateBpm"), ns.tcx("Value")]) {
        Some(value) => match value.text() {
            Some(text) => Some(parse_float(text, "HeartRateBpm")?),
            None => None,
        },
        None => None,
    };

    let cadence = required_float(
        node,
        &[ns.tcx("Extensions"), ns.extension("TPX"), ns.extension("RunCadence")],
        "RunCadence",
    )?;

    Ok(Point {
        time,
        latitude,
        longitude,
        altitude,
        heart_rate,
        cadence,
    })
}

/// Parse a trackpoint timestamp, truncated to microseconds
pub fn parse_time(text: &str) -> Result<DateTime<Utc>, DecodeError> {
    NaiveDateTime::parse_from_str(text, TIME_FORMAT)
        .map(|time| time.and_utc().trunc_subsecs(6))
        .map_err(|e| DecodeError::invalid_field("Time", format!("'{}': {}", text, e)))
}

fn required_text<'a>(node: &'a Element, path: &[Tag<'_>], field: &str) -> Result<&'a str, DecodeError> {
    node.descend(path)
        .and_then(Element::text)
        .ok_or_else(|| DecodeError::missing_field(field))
}

fn required_float(node: &Element, path: &[Tag<'_>], field: &str) -> Result<f64, DecodeError> {
    required_text(node, path, field).and_then(|text| parse_float(text, field))
}

fn parse_float(text: &str, field: &str) -> Result<f64, DecodeError> {
    text.parse::<f64>()
        .map_err(|e| DecodeError::invalid_field(field, format!("'{}': {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeContext;
    use crate::xml::XmlDocument;
    use chrono::NaiveDate;

    fn trackpoint(time: &str, heart_rate: Option<&str>) -> String {
        let heart_rate = heart_rate
            .map(|hr| format!("<HeartRateBpm><Value>{}</Value></HeartRateBpm>", hr))
            .unwrap_or_default();

        format!(
            r#"<Trackpoint>
                <Time>{}</Time>
                <Position>
                  <LatitudeDegrees>53.657005447894335</LatitudeDegrees>
                  <LongitudeDegrees>-2.131700534373522</LongitudeDegrees>
                </Position>
                <AltitudeMeters>241.60000610351562</AltitudeMeters>
                {}
                <Extensions><ns3:TPX><ns3:RunCadence>80</ns3:RunCadence></ns3:TPX></Extensions>
              </Trackpoint>"#,
            time, heart_rate
        )
    }

    fn wrap(body: &str) -> XmlDocument {
        let xml = format!(
            r#"<Wrapper xmlns="{}" xmlns:ns3="{}">{}</Wrapper>"#,
            TRAINING_CENTER_NS, ACTIVITY_EXTENSION_NS, body
        );
        XmlDocument::load(&xml).unwrap()
    }

    fn first_child(doc: &XmlDocument) -> &Element {
        &doc.root().children()[0]
    }

    #[test]
    fn test_point_fields() {
        let doc = wrap(&trackpoint("2017-11-25T09:02:42.001000Z", Some("108")));
        let point = decode_point(first_child(&doc), &Namespaces::garmin()).unwrap();

        let expected = NaiveDate::from_ymd_opt(2017, 11, 25)
            .unwrap()
            .and_hms_micro_opt(9, 2, 42, 1000)
            .unwrap()
            .and_utc();
        assert_eq!(point.time, expected);
        assert_eq!(point.latitude, 53.657005447894335);
        assert_eq!(point.longitude, -2.131700534373522);
        assert_eq!(point.altitude, 241.60000610351562);
        assert_eq!(point.heart_rate, Some(108.0));
        assert_eq!(point.cadence, 80.0);
    }

    #[test]
    fn test_point_without_heart_rate() {
        let doc = wrap(&trackpoint("2017-11-25T09:03:10Z", None));
        let point = decode_point(first_child(&doc), &Namespaces::garmin()).unwrap();
        assert_eq!(point.heart_rate, None);

        let doc = wrap(&trackpoint("2017-11-25T09:03:10Z", Some("")));
        let point = decode_point(first_child(&doc), &Namespaces::garmin()).unwrap();
        assert_eq!(point.heart_rate, None);

        let no_value = trackpoint("2017-11-25T09:03:10Z", Some("120"))
            .replace("<HeartRateBpm><Value>120</Value></HeartRateBpm>", "<HeartRateBpm/>");
        let doc = wrap(&no_value);
        let point = decode_point(first_child(&doc), &Namespaces::garmin()).unwrap();
        assert_eq!(point.heart_rate, None);
        assert_eq!(point.cadence, 80.0);
    }

    #[test]
    fn test_non_numeric_heart_rate_fails() {
        let doc = wrap(&trackpoint("2017-11-25T09:03:10Z", Some("fast")));
        let err = decode_point(first_child(&doc), &Namespaces::garmin()).unwrap_err();
        assert_eq!(err.field(), Some("HeartRateBpm"));
    }

    #[test]
    fn test_missing_required_fields() {
        let ns = Namespaces::garmin();
        let full = trackpoint("2017-11-25T09:03:10Z", Some("120"));
        let cases = [
            ("<Time>2017-11-25T09:03:10Z</Time>", "Time"),
            ("<LatitudeDegrees>53.657005447894335</LatitudeDegrees>", "LatitudeDegrees"),
            ("<LongitudeDegrees>-2.131700534373522</LongitudeDegrees>", "LongitudeDegrees"),
            ("<AltitudeMeters>241.60000610351562</AltitudeMeters>", "AltitudeMeters"),
            ("<ns3:RunCadence>80</ns3:RunCadence>", "RunCadence"),
        ];

        for (element, field) in cases {
            let doc = wrap(&full.replace(element, ""));
            let err = decode_point(first_child(&doc), &ns).unwrap_err();
            assert_eq!(err.field(), Some(field), "removing {}", element);
        }
    }

    #[test]
    fn test_malformed_values() {
        let ns = Namespaces::garmin();
        let full = trackpoint("2017-11-25T09:03:10Z", None);

        let doc = wrap(&full.replace("241.60000610351562", "high"));
        assert_eq!(decode_point(first_child(&doc), &ns).unwrap_err().field(), Some("AltitudeMeters"));

        let doc = wrap(&full.replace("2017-11-25T09:03:10Z", "2017-11-25 09:03:10"));
        assert_eq!(decode_point(first_child(&doc), &ns).unwrap_err().field(), Some("Time"));
    }

    #[test]
    fn test_cadence_in_wrong_namespace_is_missing() {
        let ns = Namespaces::garmin();
        let xml = trackpoint("2017-11-25T09:03:10Z", None).replace(
            "<Extensions>",
            r#"<Extensions xmlns:ns3="urn:somebody-else">"#,
        );
        let doc = wrap(&xml);
        let err = decode_point(first_child(&doc), &ns).unwrap_err();
        assert_eq!(err.field(), Some("RunCadence"));
    }

    #[test]
    fn test_parse_time_formats() {
        let with_fraction = parse_time("2017-11-25T09:02:42.001000Z").unwrap();
        assert_eq!(with_fraction.timestamp_subsec_micros(), 1000);

        let without_fraction = parse_time("2017-11-25T09:03:10Z").unwrap();
        assert_eq!(without_fraction.timestamp_subsec_micros(), 0);

        let truncated = parse_time("2017-11-25T09:03:10.123456789Z").unwrap();
        assert_eq!(truncated.timestamp_subsec_nanos(), 123_456_000);

        assert!(parse_time("2017-11-25T09:03:10+01:00").is_err());
        assert!(parse_time("2017-11-25T09:03:10").is_err());
    }

    #[test]
    fn test_lap_with_single_trackpoint() {
        let doc = wrap(&format!(
            "<Lap><Track>{}</Track></Lap>",
            trackpoint("2017-11-25T09:03:10Z", None)
        ));
        let lap = decode_lap(first_child(&doc), &Namespaces::garmin()).unwrap();
        assert_eq!(lap.points().len(), 1);
        assert_eq!(lap.start(), lap.stop());
    }

    #[test]
    fn test_lap_reads_every_track() {
        let doc = wrap(&format!(
            "<Lap><Track>{}{}</Track><Track>{}</Track></Lap>",
            trackpoint("2017-11-25T09:03:10Z", None),
            trackpoint("2017-11-25T09:03:11Z", None),
            trackpoint("2017-11-25T09:05:00Z", None),
        ));
        let lap = decode_lap(first_child(&doc), &Namespaces::garmin()).unwrap();
        assert_eq!(lap.points().len(), 3);
        assert_eq!(lap.stop(), parse_time("2017-11-25T09:05:00Z").unwrap());
    }

    #[test]
    fn test_empty_lap() {
        let ns = Namespaces::garmin();
        for body in ["<Lap/>", "<Lap><Track/></Lap>"] {
            let doc = wrap(body);
            let err = decode_lap(first_child(&doc), &ns).unwrap_err();
            assert!(matches!(err, DecodeError::EmptyLap { .. }));
        }
    }

    #[test]
    fn test_point_error_is_tagged_with_index() {
        let doc = wrap(&format!(
            "<Lap><Track>{}{}</Track></Lap>",
            trackpoint("2017-11-25T09:03:10Z", None),
            trackpoint("bad", None),
        ));
        let err = decode_lap(first_child(&doc), &Namespaces::garmin()).unwrap_err();
        assert_eq!(err.field(), Some("Time"));
        assert_eq!(err.context().unwrap().point, Some(1));
    }

    #[test]
    fn test_activity_requires_notes_and_sport() {
        let ns = Namespaces::garmin();
        let lap = format!("<Lap><Track>{}</Track></Lap>", trackpoint("2017-11-25T09:03:10Z", None));

        let doc = wrap(&format!(r#"<Activity Sport="Running">{}</Activity>"#, lap));
        assert_eq!(decode_activity(first_child(&doc), &ns).unwrap_err().field(), Some("Notes"));

        let doc = wrap(&format!("<Activity>{}<Notes>Easy</Notes></Activity>", lap));
        assert_eq!(decode_activity(first_child(&doc), &ns).unwrap_err().field(), Some("Sport"));

        let doc = wrap(&format!(r#"<Activity Sport="Running">{}<Notes>Easy</Notes></Activity>"#, lap));
        let activity = decode_activity(first_child(&doc), &ns).unwrap();
        assert_eq!(activity.name(), "Easy");
        assert_eq!(activity.sport(), "Running");
        assert_eq!(activity.laps().len(), 1);
    }

    #[test]
    fn test_activity_without_laps() {
        let doc = wrap(r#"<Activity Sport="Running"><Notes>Nothing</Notes></Activity>"#);
        let err = decode_activity(first_child(&doc), &Namespaces::garmin()).unwrap_err();
        assert_eq!(
            err,
            DecodeError::EmptyActivity {
                context: DecodeContext::default()
            }
        );
    }
}
