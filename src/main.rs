use std::{
    fs::{self, File},
    io::BufWriter,
};

use anyhow::{Context, Result};
use clap::Parser;
use flight_enricher_rs::{
    Cache, Config, DarkSkyClient, Error, InputFile, ReferenceTables, WeatherProvider, WeatherResolver,
    discover_inputs, enrich, setup_logging,
};
use tracing::{error, info, warn};

fn main() -> Result<()> {
    // variables already set in the environment take precedence over .env
    dotenvy::dotenv().ok();
    let config = Config::parse();
    setup_logging(config.log_file.as_deref())?;

    let references = ReferenceTables::from_paths(&config.airlines, &config.airports)
        .context("failed to load reference data")?;
    info!(
        airlines = references.airline_count(),
        airports = references.airport_count(),
        "reference data loaded"
    );

    let cache = Cache::load(&config.cache).context("failed to open the weather cache")?;
    let client = DarkSkyClient::new(config.api_url.as_str(), config.api_key.expose())?;
    let resolver = WeatherResolver::new(&cache, client, config.max_concurrent_fetches);

    let inputs = discover_inputs(&config.inputs, config.recursive)?;
    if inputs.is_empty() {
        warn!(inputs = ?config.inputs, "no input files found");
    }
    fs::create_dir_all(&config.output).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output.display()
        )
    })?;

    let mut failed_files = 0;
    for input in &inputs {
        match process_file(input, &config, &references, &resolver) {
            Ok(()) => {}
            Err(e) if e.is_fatal() => {
                error!(input = %input.path().display(), error = %e, "stopping the run");
                return Err(e.into());
            }
            Err(e) => {
                warn!(input = %input.path().display(), error = %e, "file skipped");
                failed_files += 1;
            }
        }
    }

    if config.compact {
        cache
            .export(cache.path())
            .context("failed to compact the weather cache")?;
    }
    info!(
        files = inputs.len(),
        failed_files,
        cached = cache.len(),
        "run finished"
    );

    Ok(())
}

fn process_file<P: WeatherProvider>(
    input: &InputFile,
    config: &Config,
    references: &ReferenceTables,
    resolver: &WeatherResolver<'_, P>,
) -> Result<(), Error> {
    let output = input.output_path(&config.output);
    info!(input = %input.path().display(), output = %output.display(), "enriching file");

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    let reader = File::open(input.path())?;
    let writer = BufWriter::new(File::create(&output)?);
    let report = enrich(
        reader,
        writer,
        references,
        resolver,
        config.pipeline_options(),
        handle_skipped_row,
    )
    .inspect_err(|e| {
        // a fatal error keeps the partial output, anything else leaves no file behind
        if !e.is_fatal() {
            let _ = fs::remove_file(&output);
        }
    })?;

    info!(
        input = %input.path().display(),
        rows = report.rows_read,
        written = report.written,
        skipped = report.skipped,
        "file enriched"
    );
    Ok(())
}

// Just logs skipped rows here, but can be changed to collect them for a later correction run
fn handle_skipped_row(error: Error) {
    warn!("{error}")
}
