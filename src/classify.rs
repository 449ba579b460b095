//! Movement classification of merged stops.

use crate::merge::MergedStop;
use crate::{StopConfig, StopEvent};
use log::debug;
use std::fmt;

/// Movement label assigned to every stop event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MovementStatus {
    /// Short gap, ordinary sampling noise
    Normal,
    /// Genuine stationary stop
    Stopped,
    /// Long gap with a plausible driving speed: movement happened while unobserved
    #[cfg_attr(feature = "serde", serde(rename = "Driving (GPS gap)"))]
    DrivingGpsGap,
    /// Long gap implying an impossible speed, or a position that cannot be measured
    #[cfg_attr(feature = "serde", serde(rename = "GPS Error"))]
    GpsError,
}

impl MovementStatus {
    pub const ALL: [MovementStatus; 4] = [
        MovementStatus::Normal,
        MovementStatus::Stopped,
        MovementStatus::DrivingGpsGap,
        MovementStatus::GpsError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementStatus::Normal => "Normal",
            MovementStatus::Stopped => "Stopped",
            MovementStatus::DrivingGpsGap => "Driving (GPS gap)",
            MovementStatus::GpsError => "GPS Error",
        }
    }
}

impl fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a gap by its duration, displacement and implied speed.
///
/// First match wins:
/// 1. `time_difference <= classify_time_threshold` → `Normal`
/// 2. `distance < classify_dist_threshold` → `Stopped`
/// 3. `avg_speed < stopped_speed_threshold` → `Stopped`
/// 4. `avg_speed <= driving_speed_max` → `DrivingGpsGap`
/// 5. otherwise → `GpsError`
///
/// An undefined distance or speed fails every spatial rule, so a long gap whose
/// position cannot be measured ends up as `GpsError`.
pub fn classify(
    time_difference: i64,
    distance: Option<f64>,
    avg_speed: Option<f64>,
    config: &StopConfig,
) -> MovementStatus {
    if time_difference <= config.classify_time_threshold {
        return MovementStatus::Normal;
    }

    if matches!(distance, Some(d) if d < config.classify_dist_threshold) {
        return MovementStatus::Stopped;
    }

    match avg_speed {
        Some(speed) if speed < config.stopped_speed_threshold => MovementStatus::Stopped,
        Some(speed) if speed <= config.driving_speed_max => MovementStatus::DrivingGpsGap,
        _ => MovementStatus::GpsError,
    }
}

/// Label a merged stop, producing an unnamed [`StopEvent`].
pub fn classify_stop(stop: &MergedStop, config: &StopConfig) -> StopEvent {
    let status = classify(stop.time_difference, stop.distance, stop.avg_speed, config);
    debug!(
        "[Classify] {} -> {}: {}s, {:?}m, {:?}m/s => {}",
        stop.arrival.timestamp, stop.departure.timestamp,
        stop.time_difference, stop.distance, stop.avg_speed, status
    );

    StopEvent {
        arrival: stop.arrival,
        departure: stop.departure,
        time_difference: stop.time_difference,
        distance: stop.distance,
        avg_speed: stop.avg_speed,
        status,
        location_name: None,
    }
}
