//! Aggregate statistics over classified stop events.

use crate::classify::MovementStatus;
use crate::StopEvent;
use log::info;
use std::collections::BTreeMap;

/// Summary of a classified (and optionally named) stop list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopSummary {
    /// Occurrences of each movement label. Labels that never occur are absent.
    pub counts: BTreeMap<MovementStatus, usize>,
    /// Sum of `time_difference` over every event, whatever its label
    pub total_time: i64,
    /// Events with a resolved place name
    pub valid_names: usize,
    /// Events whose lookup produced `Unknown` or `Error`
    pub failed_names: usize,
}

impl StopSummary {
    /// Count for a label, zero if it never occurred.
    pub fn count(&self, status: MovementStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn event_count(&self) -> usize {
        self.counts.values().sum()
    }

    /// Write the summary to the log.
    pub fn log(&self) {
        info!("Movement Counts:");
        for (status, count) in &self.counts {
            info!("  {:<18} {}", status.as_str(), count);
        }
        info!("Total stopped time: {}", format_duration(self.total_time));
        if self.valid_names + self.failed_names > 0 {
            info!("Valid location names: {}", self.valid_names);
            info!("Errors or unknowns: {}", self.failed_names);
        }
    }
}

/// Reduce classified events to per-label counts, total elapsed time and naming counts.
pub fn summarize(events: &[StopEvent]) -> StopSummary {
    events.iter().fold(StopSummary::default(), |mut summary, event| {
        *summary.counts.entry(event.status).or_insert(0) += 1;
        summary.total_time += event.time_difference;
        match &event.location_name {
            Some(name) if name.is_resolved() => summary.valid_names += 1,
            Some(_) => summary.failed_names += 1,
            None => {}
        }
        summary
    })
}

/// Format a duration in seconds as `"1 hr 23 min"`, or `"23 min"` under an hour.
///
/// Rounded to the nearest minute, ties to even, before splitting into hours.
pub fn format_duration(seconds: i64) -> String {
    let minutes = (seconds as f64 / 60.0).round_ties_even() as i64;
    let hours = minutes / 60;
    let minutes = minutes % 60;

    if hours > 0 {
        format!("{} hr {} min", hours, minutes)
    } else {
        format!("{} min", minutes)
    }
}
