//! Derivation of cache keys from a location and an hour

use std::fmt;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

const SECONDS_PER_HOUR: i64 = 3600;

/// Opaque, fixed-width key of a weather observation: the hex-encoded SHA-256 digest of the
/// location code followed by the Unix timestamp of the hour.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// `unix_hour` is expected to be hour-aligned, see [`round_to_hour`].
    pub fn new(location_code: &str, unix_hour: i64) -> Self {
        let digest = Sha256::digest(format!("{location_code}{unix_hour}").as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rounds an instant to the nearest full hour, halfway cases rounding up.
pub fn round_to_hour(instant: DateTime<Utc>) -> i64 {
    round_unix_to_hour(instant.timestamp())
}

pub(crate) fn round_unix_to_hour(unix: i64) -> i64 {
    (unix + SECONDS_PER_HOUR / 2).div_euclid(SECONDS_PER_HOUR) * SECONDS_PER_HOUR
}
