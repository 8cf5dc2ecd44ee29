//! Rendering decoded activities for people and programs
//!
//! Summaries only count what the decoder produced; no sport metrics are
//! derived here.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::error::Result;
use crate::models::Activity;

/// Per-activity overview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivitySummary {
    pub name: String,
    pub sport: String,
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
    /// `stop - start` in whole seconds
    pub elapsed_seconds: i64,
    pub laps: usize,
    pub points: usize,
    /// Points that carry a heart-rate reading
    pub points_with_heart_rate: usize,
}

impl ActivitySummary {
    pub fn from_activity(activity: &Activity) -> Self {
        Self {
            name: activity.name().to_string(),
            sport: activity.sport().to_string(),
            start: activity.start(),
            stop: activity.stop(),
            elapsed_seconds: (activity.stop() - activity.start()).num_seconds(),
            laps: activity.laps().len(),
            points: activity.point_count(),
            points_with_heart_rate: activity
                .points()
                .filter(|p| p.heart_rate.is_some())
                .count(),
        }
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Sport")]
    sport: String,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Elapsed")]
    elapsed: String,
    #[tabled(rename = "Laps")]
    laps: usize,
    #[tabled(rename = "Points")]
    points: usize,
    #[tabled(rename = "HR points")]
    heart_rate: usize,
}

impl From<&ActivitySummary> for SummaryRow {
    fn from(summary: &ActivitySummary) -> Self {
        Self {
            name: summary.name.clone(),
            sport: summary.sport.clone(),
            start: summary.start.format("%Y-%m-%d %H:%M:%S").to_string(),
            elapsed: format_elapsed(summary.elapsed_seconds),
            laps: summary.laps,
            points: summary.points,
            heart_rate: summary.points_with_heart_rate,
        }
    }
}

/// `h:mm:ss`
pub fn format_elapsed(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Render summaries as a text table
pub fn render_table(summaries: &[ActivitySummary]) -> String {
    let rows: Vec<SummaryRow> = summaries.iter().map(SummaryRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

/// Serialize any exportable value as JSON
pub fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Lap, Point};
    use chrono::TimeZone;

    fn activity() -> Activity {
        let point = |minute: u32, heart_rate: Option<f64>| Point {
            time: Utc.with_ymd_and_hms(2017, 11, 25, 9, minute, 0).unwrap(),
            latitude: 53.6,
            longitude: -2.1,
            altitude: 240.0,
            heart_rate,
            cadence: 80.0,
        };

        let laps = vec![
            Lap::new(vec![point(2, Some(108.0)), point(5, None)]).unwrap(),
            Lap::new(vec![point(9, Some(140.0))]).unwrap(),
        ];
        Activity::new("Evening run", "Running", laps).unwrap()
    }

    #[test]
    fn test_summary_counts() {
        let summary = ActivitySummary::from_activity(&activity());
        assert_eq!(summary.laps, 2);
        assert_eq!(summary.points, 3);
        assert_eq!(summary.points_with_heart_rate, 2);
        assert_eq!(summary.elapsed_seconds, 7 * 60);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "0:00:00");
        assert_eq!(format_elapsed(2009), "0:33:29");
        assert_eq!(format_elapsed(3725), "1:02:05");
        assert_eq!(format_elapsed(-61), "-0:01:01");
    }

    #[test]
    fn test_render_table() {
        let table = render_table(&[ActivitySummary::from_activity(&activity())]);
        assert!(table.contains("Evening run"));
        assert!(table.contains("0:07:00"));
        assert!(table.contains("HR points"));
    }

    #[test]
    fn test_json_export_keeps_missing_heart_rate_as_null() {
        let json = to_json(&[activity()], false).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let points = &value[0]["laps"][0]["points"];
        assert_eq!(points[0]["heart_rate"], serde_json::json!(108.0));
        assert!(points[1]["heart_rate"].is_null());
        assert_eq!(value[0]["name"], "Evening run");
    }
}
