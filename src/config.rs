//! Module defining the command line configuration of the enricher

use std::{fmt, path::PathBuf};

use clap::Parser;

use crate::{PipelineOptions, weather::DEFAULT_API_URL};

#[derive(Parser, Debug, Clone)]
#[command(name = "flight-enricher-rs")]
#[command(about = "Enriches historical flight records with the weather at departure")]
pub struct Config {
    /// Input CSV files or directories containing them
    #[arg(short, long = "input", default_value = "data")]
    pub inputs: Vec<PathBuf>,

    /// Directory the enriched files are written to
    #[arg(short, long, default_value = "out")]
    pub output: PathBuf,

    /// Scan input directories recursively
    #[arg(short, long)]
    pub recursive: bool,

    /// Persistent weather cache file
    #[arg(long, default_value = "weather.cache")]
    pub cache: PathBuf,

    /// Number of enrichment workers
    #[arg(long, default_value = "32")]
    pub workers: usize,

    /// Maximum number of simultaneous requests to the weather service
    #[arg(long, default_value = "8")]
    pub max_concurrent_fetches: usize,

    /// Capacity of the channels between the pipeline stages
    #[arg(long, default_value = "64")]
    pub channel_capacity: usize,

    /// Credential of the weather service
    #[arg(long, env = "DARK_SKY_API_KEY", hide_env_values = true)]
    pub api_key: ApiKey,

    /// Base URL of the time-machine endpoint
    #[arg(long, default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Airline reference table (IATA code, name)
    #[arg(long, default_value = "airlines.csv")]
    pub airlines: PathBuf,

    /// Airport reference table (IATA code, coordinates, time zone)
    #[arg(long, default_value = "airports.csv")]
    pub airports: PathBuf,

    /// Rewrite the cache file as a single compressed block after the run
    #[arg(long)]
    pub compact: bool,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            workers: self.workers,
            channel_capacity: self.channel_capacity,
        }
    }
}

/// Weather service credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl From<String> for ApiKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}
