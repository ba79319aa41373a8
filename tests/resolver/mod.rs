//! Integration tests of weather resolution through the persistent cache.

use chrono::{DateTime, Duration, TimeZone, Utc};
use claims::assert_ok;
use flight_enricher_rs::{Cache, CacheKey, WeatherResolver, round_to_hour};
use rstest::rstest;

use crate::support::{
    JAN_2_1PM_UTC, UnreachableProvider, WindowProvider, cache_path, jfk, temp_cache,
};

fn requested() -> DateTime<Utc> {
    Utc.timestamp_opt(JAN_2_1PM_UTC, 0).unwrap() + Duration::minutes(10)
}

#[rstest]
#[case::full_day(24)]
#[case::single_hour(1)]
#[case::two_days(48)]
fn every_returned_hour_is_backfilled(#[case] hours: i64) {
    let (_dir, cache) = temp_cache();
    let resolver = WeatherResolver::new(&cache, WindowProvider::new(hours), 2);

    let observation = assert_ok!(resolver.resolve(&jfk(), requested()));

    assert_eq!(observation, WindowProvider::observation(JAN_2_1PM_UTC));
    assert_eq!(cache.len(), hours as usize);

    // every other hour of the window is now a hit
    let first = JAN_2_1PM_UTC - hours / 2 * 3600;
    for i in 0..hours {
        let hour = Utc.timestamp_opt(first + i * 3600, 0).unwrap();
        resolver.resolve(&jfk(), hour).unwrap();
    }
    assert_eq!(resolver.provider().fetches(), 1);
}

#[test]
fn backfilled_hours_are_served_after_a_restart() {
    let (dir, cache) = temp_cache();
    WeatherResolver::new(&cache, WindowProvider::new(24), 2)
        .resolve(&jfk(), requested())
        .unwrap();
    drop(cache);

    let cache = Cache::load(cache_path(&dir)).unwrap();
    let resolver = WeatherResolver::new(&cache, UnreachableProvider, 2);

    let three_hours_earlier = requested() - Duration::hours(3);
    let observation = assert_ok!(resolver.resolve(&jfk(), three_hours_earlier));
    assert_eq!(
        observation,
        WindowProvider::observation(round_to_hour(three_hours_earlier))
    );
}

#[test]
fn keys_are_per_location_and_hour() {
    let (_dir, cache) = temp_cache();
    let resolver = WeatherResolver::new(&cache, WindowProvider::new(1), 2);

    resolver.resolve(&jfk(), requested()).unwrap();

    assert!(
        cache
            .get(CacheKey::new("JFK", JAN_2_1PM_UTC).as_str())
            .is_some()
    );
    assert!(
        cache
            .get(CacheKey::new("LAX", JAN_2_1PM_UTC).as_str())
            .is_none()
    );
}
