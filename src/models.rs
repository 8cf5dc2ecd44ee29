use chrono::{DateTime, Utc};
use serde::Serialize;

/// A single timestamped sample from a trackpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    /// Sample time (UTC, microsecond precision)
    pub time: DateTime<Utc>,

    /// Latitude in degrees
    pub latitude: f64,

    /// Longitude in degrees
    pub longitude: f64,

    /// Altitude in meters
    pub altitude: f64,

    /// Heart rate in beats per minute, `None` when the device recorded none
    pub heart_rate: Option<f64>,

    /// Run cadence from the activity extension
    pub cadence: f64,
}

/// A contiguous recording segment. Always holds at least one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lap {
    points: Vec<Point>,
}

impl Lap {
    /// Build a lap from points in recording order; `None` if there are none
    pub fn new(points: Vec<Point>) -> Option<Self> {
        (!points.is_empty()).then_some(Self { points })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Time of the first recorded point
    pub fn start(&self) -> DateTime<Utc> {
        self.points[0].time
    }

    /// Time of the last recorded point
    pub fn stop(&self) -> DateTime<Utc> {
        self.points[self.points.len() - 1].time
    }
}

/// One recorded workout made of one or more laps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    name: String,
    sport: String,
    laps: Vec<Lap>,
}

impl Activity {
    /// Build an activity from laps in recording order; `None` if there are none
    pub fn new(name: impl Into<String>, sport: impl Into<String>, laps: Vec<Lap>) -> Option<Self> {
        if laps.is_empty() {
            return None;
        }

        Some(Self {
            name: name.into(),
            sport: sport.into(),
            laps,
        })
    }

    /// Free-text label, taken from the activity notes
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sport(&self) -> &str {
        &self.sport
    }

    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    /// Start of the first lap
    pub fn start(&self) -> DateTime<Utc> {
        self.laps[0].start()
    }

    /// Stop of the last lap
    pub fn stop(&self) -> DateTime<Utc> {
        self.laps[self.laps.len() - 1].stop()
    }

    /// Every point of every lap, lap order first, then point order
    pub fn points(&self) -> impl Iterator<Item = &Point> + '_ {
        self.laps.iter().flat_map(|lap| lap.points.iter())
    }

    /// Total number of points across all laps
    pub fn point_count(&self) -> usize {
        self.laps.iter().map(|lap| lap.points.len()).sum()
    }
}
