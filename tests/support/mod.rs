//! Shared fixtures of the integration tests: reference data, stub weather providers and input
//! builders.

use std::{
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};

use flight_enricher_rs::{
    Airline, Airport, Cache, Error, Forecast, Observation, Precipitation, ReferenceTables,
    WeatherProvider,
};
use tempfile::TempDir;

pub(crate) const INPUT_HEADER: &str = "FL_DATE,CARRIER,ORIGIN,DEST,CANCELLED,CANCELLATION_CODE,CRS_DEP_TIME,DEP_TIME,DEP_DELAY,DIVERTED";

/// 2020-01-02 13:00 UTC, i.e. 08:00 in New York
pub(crate) const JAN_2_1PM_UTC: i64 = 1_577_970_000;

pub(crate) fn references() -> ReferenceTables {
    ReferenceTables::new(
        [
            Airline::new("AA", "American Airlines"),
            Airline::new("DL", "Delta Air Lines"),
        ],
        [jfk(), lax(), ord()],
    )
}

pub(crate) fn jfk() -> Airport {
    Airport::new("JFK", 40.6398, -73.7789, "America/New_York")
}

pub(crate) fn lax() -> Airport {
    Airport::new("LAX", 33.9425, -118.4081, "America/Los_Angeles")
}

pub(crate) fn ord() -> Airport {
    Airport::new("ORD", 41.9786, -87.9048, "America/Chicago")
}

/// An empty cache in a fresh directory. The directory lives as long as the returned guard.
pub(crate) fn temp_cache() -> (TempDir, Cache) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let cache = Cache::load(cache_path(&dir)).expect("failed to create cache");
    (dir, cache)
}

pub(crate) fn cache_path(dir: &TempDir) -> PathBuf {
    dir.path().join("weather.cache")
}

/// Flight CSV with the standard header and the given rows.
pub(crate) fn flight_csv<S: AsRef<str>>(rows: &[S]) -> String {
    let mut csv = INPUT_HEADER.to_string();
    for row in rows {
        csv.push('\n');
        csv.push_str(row.as_ref());
    }
    csv.push('\n');
    csv
}

/// Answers with `hours` hourly observations starting `hours / 2` hours before the requested one.
/// Temperatures are derived from the observation time; every third hour it rains.
pub(crate) struct WindowProvider {
    hours: i64,
    fetches: AtomicUsize,
}

impl WindowProvider {
    pub(crate) fn new(hours: i64) -> Self {
        Self {
            hours,
            fetches: AtomicUsize::new(0),
        }
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn observation(time: i64) -> Observation {
        let hour = time / 3600;
        let precipitation = (hour % 3 == 0).then(|| Precipitation {
            kind: "rain".to_string(),
            intensity: 0.25,
        });
        Observation::new(time, (hour % 50) as f64 + 0.5, precipitation)
    }
}

impl WeatherProvider for WindowProvider {
    fn fetch(&self, _airport: &Airport, unix_hour: i64) -> Result<Forecast, Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let first = unix_hour - self.hours / 2 * 3600;
        Ok(Forecast {
            currently: Self::observation(unix_hour),
            hourly: (0..self.hours)
                .map(|i| Self::observation(first + i * 3600))
                .collect(),
        })
    }
}

/// Provider that must never be reached
pub(crate) struct UnreachableProvider;

impl WeatherProvider for UnreachableProvider {
    fn fetch(&self, airport: &Airport, unix_hour: i64) -> Result<Forecast, Error> {
        Err(Error::Fetch {
            location: airport.iata().to_string(),
            timestamp: unix_hour,
            message: "provider is offline".to_string(),
        })
    }
}
