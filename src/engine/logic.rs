//! Module focused on the logic of processing individual rows.

use tracing::error;

use crate::{
    Error,
    domain::{Flight, ReferenceData, WeatherSummary},
    input::{RawRow, parse_flight},
    weather::{WeatherProvider, WeatherResolver},
};

/// Terminal state a worker reaches for one row
#[derive(Debug)]
pub(super) enum RowResult {
    /// Parsed and enriched, ready for the sink
    Forward(Flight),
    /// Rejected; the pipeline continues
    Skip(Error),
    /// The pipeline has to stop
    Fatal(Error),
}

pub(super) fn process_row<P: WeatherProvider>(
    row: &RawRow,
    references: &impl ReferenceData,
    resolver: &WeatherResolver<'_, P>,
) -> RowResult {
    let mut flight = match parse_flight(row, references) {
        Ok(flight) => flight,
        Err(e) => return RowResult::Skip(e),
    };

    // a flight that parsed but cannot be enriched stops the run, whatever the error
    match enrich_flight(&mut flight, resolver) {
        Ok(()) => RowResult::Forward(flight),
        Err(e) => {
            error!(row = row.number, error = %e, "weather resolution failed");
            RowResult::Fatal(e)
        }
    }
}

/// Attaches the weather at the origin, then at the destination, both at the scheduled departure.
fn enrich_flight<P: WeatherProvider>(
    flight: &mut Flight,
    resolver: &WeatherResolver<'_, P>,
) -> Result<(), Error> {
    let instant = flight.weather_instant();

    let origin = resolver.resolve(flight.origin(), instant)?;
    flight.set_origin_weather(WeatherSummary::from(&origin));

    let destination = resolver.resolve(flight.destination(), instant)?;
    flight.set_destination_weather(WeatherSummary::from(&destination));

    Ok(())
}
