//! The external weather service the resolver falls back to on cache misses

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::{
    domain::{Airport, Observation},
    error::{Error, fetch_error},
};

pub const DEFAULT_API_URL: &str = "https://api.darksky.net/forecast";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The answer of the weather service for one location and hour.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    /// The observation at the requested instant
    pub currently: Observation,
    /// All hourly observations of the window around the requested instant
    pub hourly: Vec<Observation>,
}

/// Source of weather observations for a location at a point in time.
pub trait WeatherProvider: Send + Sync {
    /// Fetches the observations around `unix_hour` (seconds since the epoch).
    fn fetch(&self, airport: &Airport, unix_hour: i64) -> Result<Forecast, Error>;
}

/// Blocking client for a Dark Sky compatible "time machine" endpoint.
pub struct DarkSkyClient {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

// Wire shape of the time machine response
#[derive(Deserialize)]
struct TimeMachineResponse {
    currently: Observation,
    #[serde(default)]
    hourly: Option<HourlyBlock>,
}

#[derive(Deserialize)]
struct HourlyBlock {
    #[serde(default)]
    data: Vec<Observation>,
}

impl DarkSkyClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("flight-enricher-rs/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| fetch_error("-", 0, format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

impl WeatherProvider for DarkSkyClient {
    fn fetch(&self, airport: &Airport, unix_hour: i64) -> Result<Forecast, Error> {
        let location = airport.iata();
        // the URL carries the API key: never log it, and strip it from transport errors
        let url = format!(
            "{}/{}/{},{},{}",
            self.base_url,
            self.api_key,
            airport.latitude(),
            airport.longitude(),
            unix_hour
        );
        debug!(location, unix_hour, "requesting weather from provider");

        let response = self
            .client
            .get(&url)
            .query(&[("exclude", "minutely,daily,alerts,flags"), ("units", "us")])
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| fetch_error(location, unix_hour, e.without_url()))?;

        let body: TimeMachineResponse = response
            .json()
            .map_err(|e| fetch_error(location, unix_hour, e.without_url()))?;

        Ok(Forecast {
            currently: body.currently,
            hourly: body.hourly.map(|h| h.data).unwrap_or_default(),
        })
    }
}
