//! Module resolving the weather at an airport for a point in time, through the cache.

mod gate;
mod provider;

use chrono::{DateTime, Utc};
use tracing::{debug, trace, warn};

use crate::{
    cache::{Cache, CacheKey, round_to_hour, round_unix_to_hour},
    domain::{Airport, Observation},
    error::{Error, fetch_error},
};
use gate::{FetchGate, PendingKeys};

pub use provider::{DEFAULT_API_URL, DarkSkyClient, Forecast, WeatherProvider};


/// Resolves observations from the cache and falls back to the provider on a miss.
///
/// Every fetch back-fills the cache with all hourly observations of the response, not only the
/// requested one. Fetches are bounded by a fixed number of slots, and concurrent misses on the
/// same key are collapsed into a single fetch.
pub struct WeatherResolver<'c, P> {
    cache: &'c Cache,
    provider: P,
    fetch_gate: FetchGate,
    pending: PendingKeys,
}

impl<'c, P: WeatherProvider> WeatherResolver<'c, P> {
    pub fn new(cache: &'c Cache, provider: P, max_concurrent_fetches: usize) -> Self {
        Self {
            cache,
            provider,
            fetch_gate: FetchGate::new(max_concurrent_fetches),
            pending: PendingKeys::default(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn cache(&self) -> &Cache {
        self.cache
    }

    /// Returns the observation at `airport` for the hour closest to `instant`.
    ///
    /// Errors are fatal for the caller: either the provider failed, or the cache holds a payload
    /// that does not decode (and, first write winning, can never be replaced).
    pub fn resolve(&self, airport: &Airport, instant: DateTime<Utc>) -> Result<Observation, Error> {
        let hour = round_to_hour(instant);
        let key = CacheKey::new(airport.iata(), hour);

        loop {
            if let Some(observation) = self.cached(&key)? {
                trace!(location = airport.iata(), hour, "weather cache hit");
                return Ok(observation);
            }

            let Some(_claim) = self.pending.claim(key.as_str()) else {
                // another thread fetched this key meanwhile
                continue;
            };
            if let Some(observation) = self.cached(&key)? {
                return Ok(observation);
            }

            debug!(location = airport.iata(), hour, %key, "weather not cached, fetching");
            return self.fetch_and_backfill(airport, hour, &key);
        }
    }

    fn cached(&self, key: &CacheKey) -> Result<Option<Observation>, Error> {
        let Some(payload) = self.cache.get(key.as_str()) else {
            return Ok(None);
        };
        serde_json::from_str(&payload)
            .map(Some)
            .map_err(|source| Error::CacheDecode {
                key: key.to_string(),
                source,
            })
    }

    fn fetch_and_backfill(
        &self,
        airport: &Airport,
        hour: i64,
        key: &CacheKey,
    ) -> Result<Observation, Error> {
        let forecast = {
            let _permit = self.fetch_gate.acquire();
            self.provider
                .fetch(airport, hour)
                .map_err(|e| as_fetch_error(airport, hour, e))?
        };

        let mut requested = None;
        for observation in forecast.hourly {
            let observation_hour = round_unix_to_hour(observation.time());
            self.store(&CacheKey::new(airport.iata(), observation_hour), &observation);
            if observation_hour == hour && requested.is_none() {
                requested = Some(observation);
            }
        }

        match requested {
            Some(observation) => Ok(observation),
            None => {
                // the hourly block did not cover the requested hour
                self.store(key, &forecast.currently);
                Ok(forecast.currently)
            }
        }
    }

    fn store(&self, key: &CacheKey, observation: &Observation) {
        let payload = match serde_json::to_string(observation) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%key, error = %e, "observation not cacheable");
                return;
            }
        };
        // a failed append leaves the entry in memory, so the run can go on
        if let Err(e) = self.cache.set(key.as_str(), &payload) {
            warn!(%key, error = %e, "failed to persist weather observation");
        }
    }
}

/// Provider failures are fatal whatever the provider reports, so they all surface as fetch errors.
fn as_fetch_error(airport: &Airport, hour: i64, error: Error) -> Error {
    match error {
        fetch @ Error::Fetch { .. } => fetch,
        other => fetch_error(airport.iata(), hour, other),
    }
}
