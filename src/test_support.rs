//! Fixture builders shared by unit tests.

use crate::Fix;

pub const LAT: f64 = 51.5;
pub const LNG: f64 = -0.12;

/// Approximate degrees of latitude spanning `meters`.
pub fn meters_north(meters: f64) -> f64 {
    meters / 111_320.0
}

/// Fix `meters` north of the reference point.
pub fn fix_north(timestamp: i64, meters: f64) -> Fix {
    Fix::new(timestamp, LAT + meters_north(meters), LNG)
}
