//! Pipeline tests: whole files through `enrich`, with a seeded cache or an in-process provider.

use std::sync::Mutex;

use claims::{assert_err, assert_ok};
use flight_enricher_rs::{
    CacheKey, Error, FlightRecord, HEADER, PipelineOptions, WeatherResolver, enrich,
};
use proptest::prelude::*;

use crate::support::{
    JAN_2_1PM_UTC, UnreachableProvider, WindowProvider, flight_csv, references, temp_cache,
};

const EXAMPLE_ROW: &str = "2020-01-02,AA,JFK,LAX,0.00,,0800,0815,15.00,0.00";

#[test]
fn seeded_weather_is_written_verbatim() {
    let (_dir, cache) = temp_cache();
    cache
        .set(
            CacheKey::new("JFK", JAN_2_1PM_UTC).as_str(),
            r#"{"time":1577970000,"temperature":41.5}"#,
        )
        .unwrap();
    cache
        .set(
            CacheKey::new("LAX", JAN_2_1PM_UTC).as_str(),
            r#"{"time":1577970000,"temperature":55.2,"precipType":"rain","precipIntensity":0.01}"#,
        )
        .unwrap();
    let resolver = WeatherResolver::new(&cache, UnreachableProvider, 1);

    let mut out = Vec::new();
    let report = assert_ok!(enrich(
        flight_csv(&[EXAMPLE_ROW]).as_bytes(),
        &mut out,
        &references(),
        &resolver,
        PipelineOptions::default(),
        |e| panic!("unexpected skip: {e}"),
    ));

    assert_eq!(report.written, 1);
    let output = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], HEADER.join(","));
    assert_eq!(
        lines[1],
        "2020-01-02,2020,January,2,American Airlines,JFK,LAX,0800,0815,15,false,,false,41.5,none,0,55.2,rain,0.01"
    );
}

#[test]
fn fatal_lookup_keeps_rows_written_before_it() {
    let (_dir, cache) = temp_cache();
    // only JFK -> LAX is resolvable, ORD needs the offline provider
    cache
        .set(
            CacheKey::new("JFK", JAN_2_1PM_UTC).as_str(),
            r#"{"time":1577970000,"temperature":41.5}"#,
        )
        .unwrap();
    cache
        .set(
            CacheKey::new("LAX", JAN_2_1PM_UTC).as_str(),
            r#"{"time":1577970000,"temperature":55.2}"#,
        )
        .unwrap();
    let resolver = WeatherResolver::new(&cache, UnreachableProvider, 1);
    let input = flight_csv(&[
        EXAMPLE_ROW,
        "2020-01-02,AA,JFK,ORD,0.00,,0800,0815,15.00,0.00",
    ]);

    let mut out = Vec::new();
    let error = assert_err!(enrich(
        input.as_bytes(),
        &mut out,
        &references(),
        &resolver,
        PipelineOptions {
            workers: 1,
            channel_capacity: 1,
        },
        |_| {},
    ));

    assert!(error.is_fatal());
    let output = String::from_utf8(out).unwrap();
    assert_eq!(output.lines().count(), 2);
}

fn row_for(valid: bool, index: usize) -> String {
    let (origin, destination) = [("JFK", "LAX"), ("LAX", "ORD"), ("ORD", "JFK")][index % 3];
    let carrier = if valid { "AA" } else { "ZZ" };
    let day = index % 28 + 1;
    let clock = 600 + (index % 12) * 100;
    format!("2020-02-{day:02},{carrier},{origin},{destination},0.00,,{clock:04},{clock:04},0.00,0.00")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn every_valid_row_reaches_the_sink(
        validity in prop::collection::vec(any::<bool>(), 0..120),
        workers in 1usize..12,
        channel_capacity in 0usize..8,
    ) {
        let (_dir, cache) = temp_cache();
        let resolver = WeatherResolver::new(&cache, WindowProvider::new(24), 3);
        let rows: Vec<String> = validity
            .iter()
            .enumerate()
            .map(|(i, valid)| row_for(*valid, i))
            .collect();
        let skipped = Mutex::new(0u64);

        let mut out = Vec::new();
        let report = enrich(
            flight_csv(&rows).as_bytes(),
            &mut out,
            &references(),
            &resolver,
            PipelineOptions { workers, channel_capacity },
            |e: Error| {
                assert!(!e.is_fatal());
                *skipped.lock().unwrap() += 1;
            },
        )
        .unwrap();

        let expected_valid = validity.iter().filter(|v| **v).count() as u64;
        prop_assert_eq!(report.rows_read, validity.len() as u64);
        prop_assert_eq!(report.forwarded, expected_valid);
        prop_assert_eq!(report.skipped, validity.len() as u64 - expected_valid);
        prop_assert_eq!(report.abandoned, 0);
        prop_assert_eq!(report.written as u64, expected_valid);
        prop_assert_eq!(*skipped.lock().unwrap(), report.skipped);

        let records: Vec<FlightRecord> = csv::Reader::from_reader(out.as_slice())
            .deserialize()
            .collect::<Result<_, _>>()
            .unwrap();
        prop_assert_eq!(records.len() as u64, expected_valid);
        prop_assert!(records.iter().all(|r| r.airline == "American Airlines"));
    }
}
