//! CSV fix source and stop sink.
//!
//! Input needs a header row with `timestamp`, `latitude` and `longitude` columns;
//! any other column is ignored and an empty coordinate cell means "missing".
//! Output has one row per stop event:
//! `latitude,longitude,location_name,time_arrival,time_departure,time_diff_str`.

use crate::error::StopError;
use crate::summary::format_duration;
use crate::{Fix, StopEvent};
use chrono::DateTime;
use log::info;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Output header, in `StopRecord` field order.
const STOP_COLUMNS: [&str; 6] = [
    "latitude",
    "longitude",
    "location_name",
    "time_arrival",
    "time_departure",
    "time_diff_str",
];

/// One output row handed to the stop sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopRecord {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: String,
    pub time_arrival: String,
    pub time_departure: String,
    pub time_diff_str: String,
}

impl From<&StopEvent> for StopRecord {
    fn from(event: &StopEvent) -> Self {
        Self {
            latitude: event.departure.latitude,
            longitude: event.departure.longitude,
            location_name: event
                .location_name
                .as_ref()
                .map(|name| name.as_str().to_string())
                .unwrap_or_default(),
            time_arrival: format_timestamp(event.arrival.timestamp),
            time_departure: format_timestamp(event.departure.timestamp),
            time_diff_str: format_duration(event.time_difference),
        }
    }
}

/// Format Unix seconds as a UTC date-time, empty if out of range.
pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format(TIME_FORMAT).to_string())
        .unwrap_or_default()
}

/// Read fixes from a CSV file.
pub fn read_fixes(path: &Path) -> Result<Vec<Fix>, StopError> {
    if !path.is_file() {
        return Err(StopError::MissingInput(path.to_path_buf()));
    }
    info!("The file '{}' exists.", path.display());
    read_fixes_from(File::open(path)?)
}

/// Read fixes from any CSV source.
pub fn read_fixes_from<R: Read>(reader: R) -> Result<Vec<Fix>, StopError> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| StopError::Parse { row: 1, message: format!("missing column '{}'", name) })
    };
    let ts_idx = column("timestamp")?;
    let lat_idx = column("latitude")?;
    let lng_idx = column("longitude")?;

    let mut fixes = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row = record.position().map_or(0, |p| p.line() as usize);

        let timestamp = parse_timestamp(record.get(ts_idx).unwrap_or(""))
            .ok_or_else(|| StopError::Parse { row, message: "invalid timestamp".to_string() })?;
        let latitude = parse_coordinate(record.get(lat_idx), row, "latitude")?;
        let longitude = parse_coordinate(record.get(lng_idx), row, "longitude")?;

        fixes.push(Fix { timestamp, latitude, longitude });
    }

    if fixes.is_empty() {
        return Err(StopError::EmptyInput);
    }
    Ok(fixes)
}

/// Integer seconds, also accepting a float with no fractional part ("1700000000.0").
fn parse_timestamp(field: &str) -> Option<i64> {
    let field = field.trim();
    field.parse::<i64>().ok().or_else(|| {
        field
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

fn parse_coordinate(field: Option<&str>, row: usize, name: &str) -> Result<Option<f64>, StopError> {
    match field.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("nan") => Ok(None),
        Some(value) => value.parse::<f64>().map(Some).map_err(|_| StopError::Parse {
            row,
            message: format!("invalid {} '{}'", name, value),
        }),
    }
}

/// Write stop events to a CSV file.
pub fn write_stops(path: &Path, events: &[StopEvent]) -> Result<(), StopError> {
    write_stops_to(File::create(path)?, events)?;
    info!("Output CSV saved to {}", path.display());
    Ok(())
}

/// Write stop events to any CSV sink.
pub fn write_stops_to<W: Write>(writer: W, events: &[StopEvent]) -> Result<(), StopError> {
    let mut writer = csv::Writer::from_writer(writer);
    // serialize() only emits the header along with the first record
    if events.is_empty() {
        writer.write_record(STOP_COLUMNS)?;
    }
    for event in events {
        writer.serialize(StopRecord::from(event))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MovementStatus;
    use crate::naming::LocationName;
    use pretty_assertions::assert_eq;
    use std::io::Write as _;

    fn stopped_event(name: Option<LocationName>) -> StopEvent {
        StopEvent {
            arrival: Fix::new(1_700_000_000, 51.5, -0.12),
            departure: Fix::new(1_700_004_980, 51.5001, -0.1201),
            time_difference: 4980,
            distance: Some(12.0),
            avg_speed: Some(12.0 / 4980.0),
            status: MovementStatus::Stopped,
            location_name: name,
        }
    }

    #[test]
    fn test_read_fixes_with_extra_columns_and_gaps() {
        let data = "id,timestamp,latitude,longitude,speed\n\
                    1,100,51.5,-0.12,3.0\n\
                    2,800,,,0\n\
                    3,900.0,51.6,-0.13,1\n";
        let fixes = read_fixes_from(data.as_bytes()).unwrap();
        assert_eq!(fixes.len(), 3);
        assert_eq!(fixes[0], Fix::new(100, 51.5, -0.12));
        assert_eq!(fixes[1], Fix::without_position(800));
        assert_eq!(fixes[2].timestamp, 900);
    }

    #[test]
    fn test_read_fixes_bad_timestamp() {
        let data = "timestamp,latitude,longitude\n100,51.5,-0.12\nnoon,51.5,-0.12\n";
        match read_fixes_from(data.as_bytes()) {
            Err(StopError::Parse { row, .. }) => assert_eq!(row, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_read_fixes_missing_column() {
        let data = "timestamp,lat,lng\n100,51.5,-0.12\n";
        assert!(matches!(read_fixes_from(data.as_bytes()), Err(StopError::Parse { .. })));
    }

    #[test]
    fn test_read_fixes_empty() {
        let data = "timestamp,latitude,longitude\n";
        assert!(matches!(read_fixes_from(data.as_bytes()), Err(StopError::EmptyInput)));
    }

    #[test]
    fn test_read_fixes_missing_file() {
        let result = read_fixes(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(StopError::MissingInput(_))));
    }

    #[test]
    fn test_read_fixes_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timestamp,latitude,longitude").unwrap();
        writeln!(file, "0,51.5,-0.12").unwrap();
        writeln!(file, "700,51.5,-0.12").unwrap();
        let fixes = read_fixes(file.path()).unwrap();
        assert_eq!(fixes.len(), 2);
    }

    #[test]
    fn test_stop_record() {
        let record = StopRecord::from(&stopped_event(Some(LocationName::Named("Depot, Leeds".into()))));
        assert_eq!(record.latitude, Some(51.5001));
        assert_eq!(record.location_name, "Depot, Leeds");
        assert_eq!(record.time_arrival, "2023-11-14 22:13:20");
        assert_eq!(record.time_departure, "2023-11-14 23:36:20");
        assert_eq!(record.time_diff_str, "1 hr 23 min");
    }

    #[test]
    fn test_write_stops() {
        let events = vec![
            stopped_event(Some(LocationName::Unknown)),
            StopEvent { status: MovementStatus::DrivingGpsGap, ..stopped_event(None) },
        ];
        let mut out = Vec::new();
        write_stops_to(&mut out, &events).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "latitude,longitude,location_name,time_arrival,time_departure,time_diff_str");
        assert_eq!(lines[1], "51.5001,-0.1201,Unknown,2023-11-14 22:13:20,2023-11-14 23:36:20,1 hr 23 min");
        assert_eq!(lines[2], "51.5001,-0.1201,,2023-11-14 22:13:20,2023-11-14 23:36:20,1 hr 23 min");
        assert_eq!(lines[0], STOP_COLUMNS.join(","));
    }

    #[test]
    fn test_write_no_stops_keeps_header() {
        let mut out = Vec::new();
        write_stops_to(&mut out, &[]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec!["latitude,longitude,location_name,time_arrival,time_departure,time_diff_str"]
        );
    }

    #[test]
    fn test_write_no_stops_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stopped_locations.csv");
        write_stops(&path, &[]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("latitude,longitude"));
        assert_eq!(text.lines().count(), 1);
    }
}
