mod cache;
mod config;
mod domain;
mod engine;
mod error;
mod files;
mod input;
mod output;
mod telemetry;
mod weather;

pub use cache::{Cache, CacheKey, round_to_hour};
pub use config::{ApiKey, Config};
pub use domain::{Airline, Airport, Observation, Precipitation, ReferenceData, ReferenceTables};
pub use engine::{PipelineOptions, PipelineReport};
pub use error::Error;
pub use files::{InputFile, discover_inputs};
pub use output::{FlightRecord, HEADER};
pub use telemetry::setup_logging;
pub use weather::{DEFAULT_API_URL, DarkSkyClient, Forecast, WeatherProvider, WeatherResolver};

/// Enriches the flights read from `reader` with weather and writes them to `writer`.
///
/// This is the main entry point of the crate. Rows are parsed and enriched concurrently by
/// `options.workers` threads; every weather lookup goes through `resolver` and therefore through
/// its [`Cache`]. Finished rows are written by a single sink in the order they complete, after
/// the header.
///
/// # Error handling
///
/// Not every row in the input may be valid: codes may be missing from the reference tables, or
/// clock values may be malformed. Such rows are skipped and their errors delivered to `on_skip`,
/// called from a dedicated thread.
///
/// A failing weather lookup on the other hand stops the run. The rows already enriched are still
/// written, then the error is returned (see [`Error::is_fatal`]). An input header that lacks
/// required columns is returned before anything is written.
///
/// # Example
///
/// ```no_run
/// use std::fs::File;
/// use flight_enricher_rs::{
///     Cache, DarkSkyClient, DEFAULT_API_URL, Error, PipelineOptions, ReferenceTables,
///     WeatherResolver, enrich,
/// };
///
/// let references = ReferenceTables::from_paths("airlines.csv".as_ref(), "airports.csv".as_ref()).unwrap();
/// let cache = Cache::load("weather.cache").unwrap();
/// let client = DarkSkyClient::new(DEFAULT_API_URL, "api-key").unwrap();
/// let resolver = WeatherResolver::new(&cache, client, 8);
///
/// let report = enrich(
///     File::open("flights.csv").unwrap(),
///     File::create("enriched.csv").unwrap(),
///     &references,
///     &resolver,
///     PipelineOptions::default(),
///     |e: Error| eprintln!("skipped: {e}"),
/// )
/// .unwrap();
/// println!("{} of {} rows enriched", report.written, report.rows_read);
/// ```
pub fn enrich<R, P>(
    reader: impl std::io::Read,
    writer: impl std::io::Write + Send,
    references: &R,
    resolver: &WeatherResolver<'_, P>,
    options: PipelineOptions,
    on_skip: impl FnMut(Error) + Send,
) -> Result<PipelineReport, Error>
where
    R: ReferenceData + Sync,
    P: WeatherProvider,
{
    engine::run_pipeline(reader, writer, references, resolver, options, on_skip)
}
