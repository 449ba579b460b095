//! Gap detection: find the time gaps between consecutive fixes that are long
//! enough to be stop candidates.

use crate::Fix;
use log::{debug, info};

/// Two chronologically adjacent fixes separated by more than the minimum stop duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateBoundary {
    /// Last fix before the gap
    pub previous: Fix,
    /// First fix after the gap
    pub current: Fix,
    /// `current.timestamp - previous.timestamp`, in seconds
    pub time_difference: i64,
}

impl CandidateBoundary {
    pub fn new(previous: Fix, current: Fix) -> Self {
        Self {
            previous,
            current,
            time_difference: current.timestamp - previous.timestamp,
        }
    }
}

/// Sort fixes ascending by timestamp. Equal timestamps keep their input order.
pub fn sort_fixes(fixes: &mut [Fix]) {
    fixes.sort_by_key(|f| f.timestamp);
}

/// Extract candidate boundaries from a time-ordered fix sequence.
///
/// A boundary is emitted for every pair of adjacent fixes whose gap is strictly
/// greater than `minimum_stop_duration`. Fixes without coordinates still take part;
/// only their distances are undefined later on.
///
/// Fewer than two fixes yields no boundaries.
pub fn find_candidate_boundaries(fixes: &[Fix], minimum_stop_duration: i64) -> Vec<CandidateBoundary> {
    let boundaries: Vec<CandidateBoundary> = fixes
        .windows(2)
        .map(|w| CandidateBoundary::new(w[0], w[1]))
        .filter(|b| b.time_difference > minimum_stop_duration)
        .inspect(|b| {
            debug!(
                "[Gaps] {} -> {} ({}s)",
                b.previous.timestamp, b.current.timestamp, b.time_difference
            )
        })
        .collect();

    info!("[Gaps] Number of rows after filtering: {}", boundaries.len());
    boundaries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_single_fix() {
        assert!(find_candidate_boundaries(&[], 600).is_empty());
        assert!(find_candidate_boundaries(&[Fix::new(0, 51.5, -0.1)], 600).is_empty());
    }

    #[test]
    fn test_gap_must_exceed_threshold() {
        let fixes = vec![
            Fix::new(0, 51.5, -0.1),
            Fix::new(600, 51.5, -0.1),  // exactly 600: not a candidate
            Fix::new(1201, 51.5, -0.1), // 601: candidate
        ];
        let boundaries = find_candidate_boundaries(&fixes, 600);
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].previous.timestamp, 600);
        assert_eq!(boundaries[0].current.timestamp, 1201);
        assert_eq!(boundaries[0].time_difference, 601);
    }

    #[test]
    fn test_missing_coordinates_still_count() {
        let fixes = vec![Fix::new(0, 51.5, -0.1), Fix::without_position(700)];
        let boundaries = find_candidate_boundaries(&fixes, 600);
        assert_eq!(boundaries.len(), 1);
        assert!(boundaries[0].current.position().is_none());
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut fixes = vec![
            Fix::new(700, 1.0, 1.0),
            Fix::new(0, 0.0, 0.0),
            Fix::new(700, 2.0, 2.0),
        ];
        sort_fixes(&mut fixes);
        assert_eq!(fixes[0].timestamp, 0);
        assert_eq!(fixes[1].latitude, Some(1.0));
        assert_eq!(fixes[2].latitude, Some(2.0));
    }

    #[test]
    fn test_duplicate_timestamps_produce_no_gap() {
        let mut fixes = vec![
            Fix::new(0, 51.5, -0.1),
            Fix::new(0, 51.5, -0.1),
            Fix::new(900, 51.5, -0.1),
        ];
        sort_fixes(&mut fixes);
        let boundaries = find_candidate_boundaries(&fixes, 600);
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].time_difference, 900);
    }
}
