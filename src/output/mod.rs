//! Module serializing enriched flights into the output table.

use std::{io::Write, sync::mpsc::Receiver};

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Error,
    domain::{Flight, WeatherSummary},
};


/// Column names of the output table, in order.
pub const HEADER: [&str; 19] = [
    "absoluteTime",
    "year",
    "month",
    "day",
    "airline",
    "originAirport",
    "destAirport",
    "scheduledDeparture",
    "actualDeparture",
    "delay",
    "cancelled",
    "cancellationCode",
    "diverted",
    "tempOrigin",
    "precipTypeOrigin",
    "precipIntensityOrigin",
    "tempDest",
    "precipTypeDest",
    "precipIntensityDest",
];

/// One row of the output table.
///
/// Weather values are kept as text in their shortest decimal form (`41.5`, `0`), which is also
/// how they are written.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FlightRecord {
    #[serde(rename = "absoluteTime")]
    pub date: String,
    pub year: i32,
    pub month: String,
    pub day: u32,
    pub airline: String,
    #[serde(rename = "originAirport")]
    pub origin: String,
    #[serde(rename = "destAirport")]
    pub destination: String,
    #[serde(rename = "scheduledDeparture")]
    pub scheduled_departure: String,
    #[serde(rename = "actualDeparture")]
    pub actual_departure: String,
    pub delay: i64,
    pub cancelled: bool,
    #[serde(rename = "cancellationCode")]
    pub cancellation_code: String,
    pub diverted: bool,
    #[serde(rename = "tempOrigin")]
    pub origin_temperature: String,
    #[serde(rename = "precipTypeOrigin")]
    pub origin_precip_type: String,
    #[serde(rename = "precipIntensityOrigin")]
    pub origin_precip_intensity: String,
    #[serde(rename = "tempDest")]
    pub destination_temperature: String,
    #[serde(rename = "precipTypeDest")]
    pub destination_precip_type: String,
    #[serde(rename = "precipIntensityDest")]
    pub destination_precip_intensity: String,
}

impl FlightRecord {
    pub(crate) fn from_domain(flight: &Flight) -> Self {
        let scheduled = flight.scheduled_departure();
        let (origin_temperature, origin_precip_type, origin_precip_intensity) =
            weather_columns(flight.origin_weather());
        let (destination_temperature, destination_precip_type, destination_precip_intensity) =
            weather_columns(flight.destination_weather());

        Self {
            date: flight.date().format("%Y-%m-%d").to_string(),
            year: scheduled.year(),
            month: scheduled.format("%B").to_string(),
            day: scheduled.day(),
            airline: flight.airline().name().to_string(),
            origin: flight.origin().iata().to_string(),
            destination: flight.destination().iata().to_string(),
            scheduled_departure: if flight.has_scheduled_clock() {
                scheduled.format("%H%M").to_string()
            } else {
                String::new()
            },
            actual_departure: flight
                .actual_departure()
                .map(|t| t.format("%H%M").to_string())
                .unwrap_or_default(),
            delay: flight.delay_minutes(),
            cancelled: flight.is_cancelled(),
            cancellation_code: flight.cancellation_code().to_string(),
            diverted: flight.is_diverted(),
            origin_temperature,
            origin_precip_type,
            origin_precip_intensity,
            destination_temperature,
            destination_precip_type,
            destination_precip_intensity,
        }
    }
}

fn weather_columns(weather: Option<&WeatherSummary>) -> (String, String, String) {
    match weather {
        Some(w) => (
            w.temperature.to_string(),
            w.precip_type.clone(),
            w.precip_intensity.to_string(),
        ),
        None => Default::default(),
    }
}

/// Writes the header, then every flight received on `flights` until all senders are gone.
/// Returns the number of data rows written.
pub(crate) fn write_flights(
    writer: impl Write,
    flights: Receiver<Flight>,
) -> Result<usize, Error> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(HEADER)?;

    let mut written = 0;
    for flight in flights {
        wtr.serialize(FlightRecord::from_domain(&flight))?;
        written += 1;
    }

    wtr.flush()?;
    debug!(written, "output flushed");
    Ok(written)
}
