//! HTTP reverse geocoder backed by an OpenStreetMap Nominatim endpoint.
//!
//! One request per lookup, no retries. Spacing requests out is the caller's job
//! (see [`DispatchRateLimiter`](crate::naming::DispatchRateLimiter)); the public
//! Nominatim usage policy asks for at most one request per second and a
//! meaningful `User-Agent`.

use crate::error::GeocodeError;
use crate::naming::ReverseGeocoder;
use crate::{GpsPoint, StopConfig};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};

/// Public OpenStreetMap Nominatim instance
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Subset of the `/reverse?format=jsonv2` response we care about.
#[derive(Debug, Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    error: Option<String>,
}

/// Reverse geocoder talking to Nominatim.
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
    language: String,
}

impl NominatimGeocoder {
    /// Create a geocoder for `base_url` (e.g. [`DEFAULT_NOMINATIM_URL`]).
    pub fn new(base_url: &str, user_agent: &str, language: &str) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| GeocodeError::Request(format!("Failed to create HTTP client: {}", e)))?;

        info!("[Nominatim] Using {} (user agent '{}')", base_url, user_agent);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            language: language.to_string(),
        })
    }

    /// Create a geocoder using the user agent and language from `config`.
    pub fn from_config(base_url: &str, config: &StopConfig) -> Result<Self, GeocodeError> {
        Self::new(base_url, &config.geocoder_user_agent, &config.geocoder_language)
    }

    fn reverse_url(&self) -> String {
        format!("{}/reverse", self.base_url)
    }
}

/// Decode a `/reverse` body. An `error` field or a missing name means no result.
fn parse_reverse_body(bytes: &[u8]) -> Result<Option<String>, GeocodeError> {
    let data: ReverseResponse =
        serde_json::from_slice(bytes).map_err(|e| GeocodeError::Decode(e.to_string()))?;

    if let Some(err) = data.error {
        debug!("[Nominatim] No result: {}", err);
        return Ok(None);
    }

    Ok(data.display_name.filter(|name| !name.trim().is_empty()))
}

impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse(&self, point: GpsPoint) -> Result<Option<String>, GeocodeError> {
        let req_start = Instant::now();
        let lat = point.latitude.to_string();
        let lon = point.longitude.to_string();

        let resp = self
            .client
            .get(self.reverse_url())
            .query(&[
                ("format", "jsonv2"),
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("accept-language", self.language.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GeocodeError::Request(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| GeocodeError::Request(format!("Body download error: {}", e)))?;

        let name = parse_reverse_body(&bytes)?;
        debug!(
            "[Nominatim] ({}, {}) -> {:?} in {:?}",
            lat, lon, name, req_start.elapsed()
        );
        Ok(name)
    }
}
