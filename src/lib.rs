//! # Stop Detector
//!
//! Turns a raw stream of timestamped GPS fixes into a compact list of stop events.
//!
//! This library provides:
//! - Gap detection on the time-ordered fix stream
//! - Greedy merging of spatially close stop candidates
//! - Movement classification (Normal, Stopped, Driving (GPS gap), GPS Error)
//! - Rate-limited reverse geocoding of stationary stops
//! - Summary statistics over the classified stops
//!
//! ## Features
//!
//! - **`serde`** - Serde derives for configuration and JSON config loading
//! - **`http`** - Nominatim reverse geocoder
//! - **`csv`** - CSV fix source and stop sink
//! - **`cli`** - The `stop-detector` binary
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use stop_detector::{Fix, StopConfig, StopDetector, MovementStatus};
//!
//! let fixes = vec![
//!     Fix::new(0, 51.5074, -0.1278),
//!     Fix::new(700, 51.5074, -0.1278), // 700 s without a fix, same place
//! ];
//!
//! let detector = StopDetector::new(StopConfig::default()).unwrap();
//! let events = detector.detect(fixes).unwrap();
//! assert_eq!(events.len(), 1);
//! assert_eq!(events[0].status, MovementStatus::Stopped);
//! ```

pub mod classify;
pub mod error;
pub mod gaps;
pub mod geo_utils;
pub mod merge;
pub mod naming;
pub mod pipeline;
pub mod summary;

#[cfg(feature = "http")]
pub mod nominatim;

#[cfg(feature = "csv")]
pub mod csv_io;

#[cfg(test)]
mod test_support;

pub use classify::{classify, MovementStatus};
pub use error::{GeocodeError, StopError};
pub use gaps::CandidateBoundary;
pub use merge::MergedStop;
pub use naming::{DispatchRateLimiter, LocationName, ReverseGeocoder};
pub use pipeline::StopDetector;
pub use summary::{format_duration, summarize, StopSummary};

#[cfg(feature = "http")]
pub use nominatim::NominatimGeocoder;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use stop_detector::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A single timestamped GPS observation.
///
/// Either coordinate may be missing; such a fix still counts for gap detection
/// but has no usable position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Fix {
    /// Create a fix with a known position.
    pub fn new(timestamp: i64, latitude: f64, longitude: f64) -> Self {
        Self { timestamp, latitude: Some(latitude), longitude: Some(longitude) }
    }

    /// Create a fix with no position.
    pub fn without_position(timestamp: i64) -> Self {
        Self { timestamp, latitude: None, longitude: None }
    }

    /// Position of this fix, or `None` if a coordinate is missing or out of range.
    pub fn position(&self) -> Option<GpsPoint> {
        let point = GpsPoint::new(self.latitude?, self.longitude?);
        point.is_valid().then_some(point)
    }
}

/// A classified stop: one physical pause (or unobserved gap) in the track.
#[derive(Debug, Clone, PartialEq)]
pub struct StopEvent {
    /// Last known fix before the gap began
    pub arrival: Fix,
    /// Fix at which movement resumed
    pub departure: Fix,
    /// Elapsed seconds from arrival to departure
    pub time_difference: i64,
    /// Meters between the departure fix and the fix observed just before it
    pub distance: Option<f64>,
    /// `distance / time_difference` in m/s
    pub avg_speed: Option<f64>,
    pub status: MovementStatus,
    /// Set only for `Stopped` events once naming has run
    pub location_name: Option<LocationName>,
}

impl StopEvent {
    /// Representative position of the stop (the departure fix).
    pub fn position(&self) -> Option<GpsPoint> {
        self.departure.position()
    }

    pub fn is_stopped(&self) -> bool {
        self.status == MovementStatus::Stopped
    }
}

/// Configuration for stop detection, classification and naming.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StopConfig {
    /// A gap between consecutive fixes must exceed this to become a stop candidate.
    /// Default: 600 seconds
    pub minimum_stop_duration: i64,

    /// Consecutive candidates whose positions are closer than this are merged.
    /// Default: 100.0 meters
    pub merge_dist_threshold: f64,

    /// Gaps up to this long are classified as Normal.
    /// Default: 600 seconds
    pub classify_time_threshold: i64,

    /// Longer gaps with less displacement than this are Stopped.
    /// Default: 250.0 meters
    pub classify_dist_threshold: f64,

    /// Average speed below this is Stopped.
    /// Default: 0.5 m/s
    pub stopped_speed_threshold: f64,

    /// Average speed above this is a GPS Error. Default: 40.0 m/s (~144 km/h)
    pub driving_speed_max: f64,

    /// Minimum delay between reverse geocoding requests.
    /// Default: 1000 ms
    pub reverse_geocode_delay_ms: u64,

    /// User agent sent to the geocoding service.
    pub geocoder_user_agent: String,

    /// Preferred language for place names.
    pub geocoder_language: String,
}

impl Default for StopConfig {
    fn default() -> Self {
        Self {
            minimum_stop_duration: 600,
            merge_dist_threshold: 100.0,
            classify_time_threshold: 600,
            classify_dist_threshold: 250.0,
            stopped_speed_threshold: 0.5,
            driving_speed_max: 40.0,
            reverse_geocode_delay_ms: 1000,
            geocoder_user_agent: "gps_analysis".to_string(),
            geocoder_language: "en".to_string(),
        }
    }
}

impl StopConfig {
    /// Check that every threshold is usable.
    pub fn validate(&self) -> Result<(), StopError> {
        if self.minimum_stop_duration < 0 || self.classify_time_threshold < 0 {
            return Err(StopError::InvalidConfig(
                "time thresholds must not be negative".to_string(),
            ));
        }

        let meters_and_speeds = [
            ("merge_dist_threshold", self.merge_dist_threshold),
            ("classify_dist_threshold", self.classify_dist_threshold),
            ("stopped_speed_threshold", self.stopped_speed_threshold),
            ("driving_speed_max", self.driving_speed_max),
        ];
        for (name, value) in meters_and_speeds {
            if !value.is_finite() || value < 0.0 {
                return Err(StopError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        if self.stopped_speed_threshold > self.driving_speed_max {
            return Err(StopError::InvalidConfig(format!(
                "stopped_speed_threshold ({}) exceeds driving_speed_max ({})",
                self.stopped_speed_threshold, self.driving_speed_max
            )));
        }

        Ok(())
    }

    /// Load a configuration from JSON. Missing keys keep their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, StopError> {
        let config: StopConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
