//! Naming of stationary stops through a reverse geocoder.
//!
//! Only events classified as [`MovementStatus::Stopped`] are looked up. Lookups run
//! one at a time, spaced out by a [`DispatchRateLimiter`], and a failed or empty
//! lookup is recorded as a sentinel instead of aborting the run.

use crate::classify::MovementStatus;
use crate::error::GeocodeError;
use crate::{GpsPoint, StopEvent};
use log::{debug, info, warn};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Progress callback type: `(completed, total)`
pub type ProgressCallback = Arc<dyn Fn(u32, u32) + Send + Sync>;

/// Place name attached to a stopped event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationName {
    /// Name returned by the geocoder
    Named(String),
    /// The geocoder found nothing at this position
    Unknown,
    /// The lookup failed
    Error,
}

impl LocationName {
    pub fn as_str(&self) -> &str {
        match self {
            LocationName::Named(name) => name,
            LocationName::Unknown => "Unknown",
            LocationName::Error => "Error",
        }
    }

    /// `true` for a real place name, `false` for a sentinel.
    pub fn is_resolved(&self) -> bool {
        matches!(self, LocationName::Named(_))
    }
}

impl fmt::Display for LocationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collaborator that turns a coordinate into a human-readable place name.
///
/// `Ok(None)` means the service answered but has no name for this position.
#[allow(async_fn_in_trait)]
pub trait ReverseGeocoder {
    async fn reverse(&self, point: GpsPoint) -> Result<Option<String>, GeocodeError>;
}

/// Dispatch rate limiter - spaces out when lookups START.
///
/// Each caller reserves the next slot, `interval` after the previous one, and
/// sleeps until it arrives. The first slot is immediate.
pub struct DispatchRateLimiter {
    interval: Duration,
    next_dispatch: Mutex<Instant>,
    dispatched_count: AtomicU32,
}

impl DispatchRateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_dispatch: Mutex::new(Instant::now()),
            dispatched_count: AtomicU32::new(0),
        }
    }

    /// Rate limiter honouring a minimum delay in milliseconds between lookups.
    pub fn from_millis(delay_ms: u64) -> Self {
        Self::new(Duration::from_millis(delay_ms))
    }

    /// Wait for our dispatch slot and return its 1-based sequence number.
    pub async fn wait_for_dispatch_slot(&self) -> u32 {
        let (wait_duration, dispatch_num) = {
            let mut next = self.next_dispatch.lock().await;
            let now = Instant::now();

            let dispatch_at = if *next > now { *next } else { now };
            *next = dispatch_at + self.interval;

            let num = self.dispatched_count.fetch_add(1, Ordering::Relaxed) + 1;
            (dispatch_at - now, num)
        };

        // Wait outside the lock
        if !wait_duration.is_zero() {
            debug!("[Dispatch #{}] Waiting {:?} for slot", dispatch_num, wait_duration);
            tokio::time::sleep(wait_duration).await;
        }

        dispatch_num
    }

    /// Number of slots handed out so far.
    pub fn dispatched(&self) -> u32 {
        self.dispatched_count.load(Ordering::Relaxed)
    }
}

/// Look up a name for one position, converting every failure into a sentinel.
pub async fn lookup_name<G: ReverseGeocoder>(geocoder: &G, point: GpsPoint) -> LocationName {
    match geocoder.reverse(point).await {
        Ok(Some(name)) => LocationName::Named(name),
        Ok(None) => LocationName::Unknown,
        Err(e) => {
            warn!(
                "[Naming] Lookup failed for ({:.6}, {:.6}): {}",
                point.latitude, point.longitude, e
            );
            LocationName::Error
        }
    }
}

/// Attach place names to every `Stopped` event and clear them on all others.
///
/// Lookups are sequential with at most one in flight, each waiting for its
/// slot on `rate_limiter`. Returns the number of lookups performed.
pub async fn name_stops<G: ReverseGeocoder>(
    events: &mut [StopEvent],
    geocoder: &G,
    rate_limiter: &DispatchRateLimiter,
    on_progress: Option<ProgressCallback>,
) -> usize {
    let total = events.len() as u32;
    let mut lookups = 0;

    for (idx, event) in events.iter_mut().enumerate() {
        event.location_name = if event.status == MovementStatus::Stopped {
            match event.position() {
                Some(point) => {
                    rate_limiter.wait_for_dispatch_slot().await;
                    lookups += 1;
                    Some(lookup_name(geocoder, point).await)
                }
                None => Some(LocationName::Unknown),
            }
        } else {
            None
        };

        let done = idx as u32 + 1;
        debug!("Processing location names: {}/{}", done, total);
        if let Some(ref cb) = on_progress {
            cb(done, total);
        }
    }

    info!("[Naming] {} lookups for {} events", lookups, total);
    lookups
}

/// Naming pass for when no geocoder could be set up: every `Stopped` event
/// records a failed lookup and all others are cleared.
///
/// Returns the number of events marked as failed.
pub fn mark_lookups_failed(events: &mut [StopEvent]) -> usize {
    let mut failed = 0;
    for event in events.iter_mut() {
        event.location_name = if event.status == MovementStatus::Stopped {
            failed += 1;
            Some(LocationName::Error)
        } else {
            None
        };
    }

    warn!("[Naming] Geocoder unavailable, {} stopped events left unnamed", failed);
    failed
}
