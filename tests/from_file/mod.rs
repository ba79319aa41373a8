//! Integration tests running the actual crate binary against files on disk: the full E2E path.

use std::{
    path::{Path, PathBuf},
    process::{Command, Output},
};

use flight_enricher_rs::{Cache, CacheKey};
use tempfile::TempDir;

use crate::support::JAN_2_1PM_UTC;

// nothing listens there, so every fetch fails fast
const OFFLINE_API_URL: &str = "http://127.0.0.1:9";

#[test]
fn seeded_run_enriches_the_input_file() {
    let workspace = TempDir::new().expect("failed to create temp dir");
    let cache_file = workspace.path().join("weather.cache");
    seed_cache(&cache_file);
    let out_dir = workspace.path().join("out");

    let output = run_binary(&fixture_path("flights.csv"), &cache_file, &out_dir, &[]);

    assert!(
        output.status.success(),
        "binary exited with non-zero status.\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let enriched = std::fs::read_to_string(out_dir.join("flights.csv"))
        .expect("enriched file was not written");
    let expected = std::fs::read_to_string(fixture_path("flights_expected.csv"))
        .expect("failed to read expected output fixture");
    assert_eq!(normalize_csv(&enriched), normalize_csv(&expected));
}

#[test]
fn compaction_keeps_every_entry() {
    let workspace = TempDir::new().expect("failed to create temp dir");
    let cache_file = workspace.path().join("weather.cache");
    seed_cache(&cache_file);

    let output = run_binary(
        &fixture_path("flights.csv"),
        &cache_file,
        &workspace.path().join("out"),
        &["--compact"],
    );

    assert!(output.status.success());
    let cache = Cache::load(&cache_file).expect("compacted cache does not load");
    assert_eq!(cache.len(), 2);
}

#[test]
fn unreachable_weather_service_fails_the_run() {
    let workspace = TempDir::new().expect("failed to create temp dir");
    let cache_file = workspace.path().join("weather.cache");
    let out_dir = workspace.path().join("out");

    let output = run_binary(&fixture_path("flights.csv"), &cache_file, &out_dir, &[]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        !stderr.contains("test-key"),
        "credential leaked into the log"
    );
}

#[test]
fn recursive_run_mirrors_the_input_tree() {
    let workspace = TempDir::new().expect("failed to create temp dir");
    let cache_file = workspace.path().join("weather.cache");
    seed_cache(&cache_file);
    let data = workspace.path().join("data");
    for sub in ["a", "b"] {
        std::fs::create_dir_all(data.join(sub)).unwrap();
        std::fs::copy(fixture_path("flights.csv"), data.join(sub).join("x.csv")).unwrap();
    }
    let out_dir = workspace.path().join("out");

    let output = run_binary(&data, &cache_file, &out_dir, &["-r"]);

    assert!(
        output.status.success(),
        "binary exited with non-zero status.\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let expected = std::fs::read_to_string(fixture_path("flights_expected.csv")).unwrap();
    for sub in ["a", "b"] {
        let enriched = std::fs::read_to_string(out_dir.join(sub).join("x.csv"))
            .expect("enriched file was not written");
        assert_eq!(normalize_csv(&enriched), normalize_csv(&expected));
    }
    assert!(!out_dir.join("x.csv").exists());
}

#[test]
fn inputs_sharing_an_output_name_are_rejected() {
    let workspace = TempDir::new().expect("failed to create temp dir");
    let cache_file = workspace.path().join("weather.cache");
    let data = workspace.path().join("data");
    for sub in ["a", "b"] {
        std::fs::create_dir_all(data.join(sub)).unwrap();
        std::fs::copy(fixture_path("flights.csv"), data.join(sub).join("x.csv")).unwrap();
    }
    let out_dir = workspace.path().join("out");

    let output = run_binary(
        &data.join("a"),
        &cache_file,
        &out_dir,
        &["--input", data.join("b").to_str().unwrap()],
    );

    assert!(!output.status.success());
    assert!(!out_dir.join("x.csv").exists());
}

fn seed_cache(path: &Path) {
    let cache = Cache::load(path).expect("failed to create cache");
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
}

fn run_binary(input: &Path, cache: &Path, out_dir: &Path, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flight-enricher-rs"))
        .arg("--input")
        .arg(input)
        .arg("--output")
        .arg(out_dir)
        .arg("--cache")
        .arg(cache)
        .arg("--airlines")
        .arg(fixture_path("airlines.csv"))
        .arg("--airports")
        .arg(fixture_path("airports.csv"))
        .args(["--api-key", "test-key", "--api-url", OFFLINE_API_URL])
        .args(["--workers", "4"])
        .args(extra)
        .env("RUST_LOG", "flight_enricher_rs=debug")
        .output()
        .expect("failed to execute binary")
}

/// Returns the absolute path to a test fixture file in `tests/data/`.
fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Normalizes CSV for comparison, making comparison order-independent.
/// Used only to compare the output with the expected file since the order in our output is non-deterministic)
fn normalize_csv(raw: &str) -> String {
    let mut lines: Vec<String> = raw
        .lines()
        .map(|line| {
            line.split(',')
                .map(|cell| cell.trim())
                .collect::<Vec<_>>()
                .join(",")
        })
        .filter(|line| !line.is_empty())
        .collect();

    if lines.len() <= 1 {
        return lines.join("\n");
    }

    let header = lines.remove(0);
    lines.sort();

    std::iter::once(header)
        .chain(lines)
        .collect::<Vec<_>>()
        .join("\n")
}
