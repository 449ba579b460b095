//! Stop merging: collapse runs of spatially close candidate boundaries into a
//! single stop.
//!
//! The merger is a greedy single forward pass written as a two-state machine:
//!
//! - `Idle`: nothing accumulated yet.
//! - `Accumulating(run)`: a run of one or more boundaries is open. The next
//!   boundary joins the run if the run's latest resumed position (its last
//!   `current` fix) is within `merge_dist_threshold` of the boundary's
//!   `previous` fix. Otherwise the run is emitted and a new one starts.
//!
//! A decision is never revisited. An undefined distance (missing coordinates)
//! never merges. Comparing against the latest resumed position keeps the merge
//! idempotent: a finished run's departure is exactly the fix that failed the
//! check against the next run's arrival.

use crate::gaps::CandidateBoundary;
use crate::geo_utils::fix_distance;
use crate::Fix;
use log::{debug, info};

/// A finalized run of one or more merged candidate boundaries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedStop {
    /// Last known fix before the first gap of the run
    pub arrival: Fix,
    /// First fix after the last gap of the run
    pub departure: Fix,
    /// `departure.timestamp - arrival.timestamp`: the whole elapsed span, not the sum of gaps
    pub time_difference: i64,
    /// Distance between `departure` and the fix observed immediately before it
    /// (the `previous` fix of the run's last boundary). `None` if either is unusable.
    pub distance: Option<f64>,
    /// `distance / time_difference` in m/s
    pub avg_speed: Option<f64>,
    /// Number of candidate boundaries absorbed into this stop
    pub boundary_count: usize,
}

impl From<&MergedStop> for CandidateBoundary {
    /// Treat a merged stop as a single boundary spanning arrival to departure.
    fn from(stop: &MergedStop) -> Self {
        CandidateBoundary::new(stop.arrival, stop.departure)
    }
}

#[derive(Debug, Clone, Copy)]
struct Run {
    first: CandidateBoundary,
    last: CandidateBoundary,
    count: usize,
}

impl Run {
    fn start(boundary: CandidateBoundary) -> Self {
        Self { first: boundary, last: boundary, count: 1 }
    }

    fn accepts(&self, next: &CandidateBoundary, merge_dist_threshold: f64) -> bool {
        let dist = fix_distance(&self.last.current, &next.previous);
        debug!(
            "[Merge] run ending {} vs next starting {}: {:?}m",
            self.last.current.timestamp, next.previous.timestamp, dist
        );
        matches!(dist, Some(d) if d < merge_dist_threshold)
    }

    fn absorb(&mut self, next: CandidateBoundary) {
        self.last = next;
        self.count += 1;
    }

    fn finish(self) -> MergedStop {
        let arrival = self.first.previous;
        let departure = self.last.current;
        let time_difference = departure.timestamp - arrival.timestamp;
        let distance = fix_distance(&self.last.current, &self.last.previous);
        let avg_speed = match distance {
            Some(d) if time_difference > 0 => Some(d / time_difference as f64),
            _ => None,
        };

        MergedStop {
            arrival,
            departure,
            time_difference,
            distance,
            avg_speed,
            boundary_count: self.count,
        }
    }
}

enum MergeState {
    Idle,
    Accumulating(Run),
}

/// Merge consecutive candidate boundaries whose gap positions lie within
/// `merge_dist_threshold` meters of each other.
///
/// Boundaries must be time-ordered (as produced by
/// [`find_candidate_boundaries`](crate::gaps::find_candidate_boundaries)).
pub fn merge_boundaries(boundaries: &[CandidateBoundary], merge_dist_threshold: f64) -> Vec<MergedStop> {
    let mut merged = Vec::new();
    let mut state = MergeState::Idle;

    for boundary in boundaries {
        state = match state {
            MergeState::Idle => MergeState::Accumulating(Run::start(*boundary)),
            MergeState::Accumulating(mut run) => {
                if run.accepts(boundary, merge_dist_threshold) {
                    run.absorb(*boundary);
                } else {
                    merged.push(run.finish());
                    run = Run::start(*boundary);
                }
                MergeState::Accumulating(run)
            }
        };
    }

    if let MergeState::Accumulating(run) = state {
        merged.push(run.finish());
    }

    info!("[Merge] Number of rows after merge: {}", merged.len());
    merged
}
