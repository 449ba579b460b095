//! End-to-end stop detection: sort → gap detection → merge → classify.

use crate::classify::classify_stop;
use crate::error::StopError;
use crate::gaps::{find_candidate_boundaries, sort_fixes};
use crate::merge::merge_boundaries;
use crate::naming::{mark_lookups_failed, name_stops, DispatchRateLimiter, ProgressCallback, ReverseGeocoder};
use crate::summary::{summarize, StopSummary};
use crate::{Fix, StopConfig, StopEvent};
use log::{info, warn};

/// Batch stop detector bound to one validated configuration.
#[derive(Debug, Clone)]
pub struct StopDetector {
    config: StopConfig,
}

impl StopDetector {
    /// Create a detector, rejecting inconsistent thresholds.
    pub fn new(config: StopConfig) -> Result<Self, StopError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StopConfig {
        &self.config
    }

    /// Turn a fix sequence into classified, unnamed stop events.
    ///
    /// Fixes may arrive in any order. An empty sequence is an input error.
    pub fn detect(&self, mut fixes: Vec<Fix>) -> Result<Vec<StopEvent>, StopError> {
        if fixes.is_empty() {
            return Err(StopError::EmptyInput);
        }
        info!("[StopDetector] Number of rows: {}", fixes.len());

        let unusable = fixes.iter().filter(|f| f.position().is_none()).count();
        if unusable > 0 {
            warn!("[StopDetector] {} fixes without a usable position", unusable);
        }

        sort_fixes(&mut fixes);
        let boundaries = find_candidate_boundaries(&fixes, self.config.minimum_stop_duration);
        let merged = merge_boundaries(&boundaries, self.config.merge_dist_threshold);

        Ok(merged
            .iter()
            .map(|stop| classify_stop(stop, &self.config))
            .collect())
    }

    /// Detect stops, name the stationary ones and summarize the result.
    pub async fn run<G: ReverseGeocoder>(
        &self,
        fixes: Vec<Fix>,
        geocoder: Option<&G>,
        on_progress: Option<ProgressCallback>,
    ) -> Result<(Vec<StopEvent>, StopSummary), StopError> {
        let mut events = self.detect(fixes)?;

        if let Some(geocoder) = geocoder {
            let limiter = DispatchRateLimiter::from_millis(self.config.reverse_geocode_delay_ms);
            name_stops(&mut events, geocoder, &limiter, on_progress).await;
        }

        let summary = summarize(&events);
        summary.log();
        Ok((events, summary))
    }

    /// Like [`run`](Self::run) when the geocoder could not be set up: every
    /// stationary stop is recorded as a failed lookup.
    pub fn run_geocoder_unavailable(
        &self,
        fixes: Vec<Fix>,
    ) -> Result<(Vec<StopEvent>, StopSummary), StopError> {
        let mut events = self.detect(fixes)?;
        mark_lookups_failed(&mut events);

        let summary = summarize(&events);
        summary.log();
        Ok((events, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::MovementStatus;
    use crate::error::GeocodeError;
    use crate::naming::LocationName;
    use crate::GpsPoint;

    struct FixedGeocoder;

    impl ReverseGeocoder for FixedGeocoder {
        async fn reverse(&self, _point: GpsPoint) -> Result<Option<String>, GeocodeError> {
            Ok(Some("Depot".to_string()))
        }
    }

    fn fast_config() -> StopConfig {
        StopConfig { reverse_geocode_delay_ms: 0, ..StopConfig::default() }
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let detector = StopDetector::new(StopConfig::default()).unwrap();
        assert!(matches!(detector.detect(vec![]), Err(StopError::EmptyInput)));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = StopConfig { merge_dist_threshold: -1.0, ..StopConfig::default() };
        assert!(matches!(StopDetector::new(config), Err(StopError::InvalidConfig(_))));
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let detector = StopDetector::new(StopConfig::default()).unwrap();
        let fixes = vec![
            Fix::new(700, 51.5, -0.12),
            Fix::new(0, 51.5, -0.12),
            Fix::new(760, 51.5, -0.12),
        ];
        let events = detector.detect(fixes).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].arrival.timestamp, 0);
        assert_eq!(events[0].departure.timestamp, 700);
    }

    #[test]
    fn test_no_gaps_no_events() {
        let detector = StopDetector::new(StopConfig::default()).unwrap();
        let fixes: Vec<Fix> = (0..10).map(|i| Fix::new(i * 30, 51.5, -0.12)).collect();
        assert!(detector.detect(fixes).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_names_and_summarizes() {
        let detector = StopDetector::new(fast_config()).unwrap();
        let fixes = vec![
            Fix::new(0, 51.5, -0.12),
            Fix::new(700, 51.5, -0.12),
            // Moves off 500 m, then reappears 5 km north after 1000 s: a driving gap
            Fix::new(760, 51.5045, -0.12),
            Fix::new(1760, 51.5495, -0.12),
        ];

        let (events, summary) = detector.run(fixes, Some(&FixedGeocoder), None).await.unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].status, MovementStatus::Stopped);
        assert_eq!(events[0].location_name, Some(LocationName::Named("Depot".into())));
        assert_eq!(events[1].status, MovementStatus::DrivingGpsGap);
        assert!(events[1].location_name.is_none());
        assert_eq!(summary.total_time, 1700);
        assert_eq!(summary.valid_names, 1);
    }

    #[tokio::test]
    async fn test_run_without_geocoder() {
        let detector = StopDetector::new(fast_config()).unwrap();
        let fixes = vec![Fix::new(0, 51.5, -0.12), Fix::new(700, 51.5, -0.12)];
        let (events, summary) = detector
            .run::<FixedGeocoder>(fixes, None, None)
            .await
            .unwrap();
        assert!(events[0].location_name.is_none());
        assert_eq!(summary.count(MovementStatus::Stopped), 1);
        assert_eq!(summary.valid_names + summary.failed_names, 0);
    }

    #[test]
    fn test_unavailable_geocoder_counts_every_stop_as_failed() {
        let detector = StopDetector::new(fast_config()).unwrap();
        let fixes = vec![
            Fix::new(0, 51.5, -0.12),
            Fix::new(700, 51.5, -0.12),
            Fix::new(760, 51.5045, -0.12),
            Fix::new(1760, 51.5495, -0.12),
            Fix::new(1790, 51.5600, -0.12),
            Fix::new(2500, 51.5600, -0.12),
        ];

        let (events, summary) = detector.run_geocoder_unavailable(fixes).unwrap();

        assert_eq!(events.len(), 3);
        assert_eq!(events[1].status, MovementStatus::DrivingGpsGap);
        assert_eq!(summary.count(MovementStatus::Stopped), 2);
        assert_eq!(summary.failed_names, 2);
        assert_eq!(summary.valid_names, 0);
        for e in &events {
            assert_eq!(e.location_name.is_some(), e.status == MovementStatus::Stopped);
        }
    }
}
