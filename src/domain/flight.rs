//! Module defining the flight record flowing through the pipeline

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::domain::{Airline, Airport, WeatherSummary};

/// A flight parsed from one input row.
///
/// Built once by the parser, enriched once with origin and destination weather, then handed to
/// the sink.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Flight {
    date: NaiveDate,
    airline: Airline,
    origin: Airport,
    destination: Airport,
    scheduled_departure: DateTime<Tz>,
    scheduled_clock_known: bool,
    actual_departure: Option<DateTime<Tz>>,
    delay_minutes: i64,
    cancelled: bool,
    cancellation_code: String,
    diverted: bool,

    origin_weather: Option<WeatherSummary>,
    destination_weather: Option<WeatherSummary>,
}

/// Everything the parser knows about a flight
pub(crate) struct FlightDetails {
    pub(crate) date: NaiveDate,
    pub(crate) airline: Airline,
    pub(crate) origin: Airport,
    pub(crate) destination: Airport,
    pub(crate) scheduled_departure: DateTime<Tz>,
    /// False for cancelled flights without a scheduled clock; `scheduled_departure` is then
    /// the start of the flight date
    pub(crate) scheduled_clock_known: bool,
    pub(crate) actual_departure: Option<DateTime<Tz>>,
    pub(crate) delay_minutes: i64,
    pub(crate) cancelled: bool,
    pub(crate) cancellation_code: String,
    pub(crate) diverted: bool,
}

impl Flight {
    pub(crate) fn new(details: FlightDetails) -> Self {
        let FlightDetails {
            date,
            airline,
            origin,
            destination,
            scheduled_departure,
            scheduled_clock_known,
            actual_departure,
            delay_minutes,
            cancelled,
            cancellation_code,
            diverted,
        } = details;
        Self {
            date,
            airline,
            origin,
            destination,
            scheduled_departure,
            scheduled_clock_known,
            actual_departure,
            delay_minutes: delay_minutes.max(0),
            cancelled,
            cancellation_code,
            diverted,
            origin_weather: None,
            destination_weather: None,
        }
    }

    pub(crate) fn set_origin_weather(&mut self, weather: WeatherSummary) {
        debug_assert!(self.origin_weather.is_none(), "origin weather set twice");
        self.origin_weather = Some(weather);
    }

    pub(crate) fn set_destination_weather(&mut self, weather: WeatherSummary) {
        debug_assert!(
            self.destination_weather.is_none(),
            "destination weather set twice"
        );
        self.destination_weather = Some(weather);
    }

    pub(crate) fn date(&self) -> NaiveDate {
        self.date
    }
    pub(crate) fn airline(&self) -> &Airline {
        &self.airline
    }
    pub(crate) fn origin(&self) -> &Airport {
        &self.origin
    }
    pub(crate) fn destination(&self) -> &Airport {
        &self.destination
    }
    pub(crate) fn scheduled_departure(&self) -> DateTime<Tz> {
        self.scheduled_departure
    }
    pub(crate) fn has_scheduled_clock(&self) -> bool {
        self.scheduled_clock_known
    }
    /// The instant weather is resolved for, at both ends of the flight
    pub(crate) fn weather_instant(&self) -> DateTime<Utc> {
        self.scheduled_departure.with_timezone(&Utc)
    }
    pub(crate) fn actual_departure(&self) -> Option<DateTime<Tz>> {
        self.actual_departure
    }
    pub(crate) fn delay_minutes(&self) -> i64 {
        self.delay_minutes
    }
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancelled
    }
    pub(crate) fn cancellation_code(&self) -> &str {
        &self.cancellation_code
    }
    pub(crate) fn is_diverted(&self) -> bool {
        self.diverted
    }
    pub(crate) fn origin_weather(&self) -> Option<&WeatherSummary> {
        self.origin_weather.as_ref()
    }
    pub(crate) fn destination_weather(&self) -> Option<&WeatherSummary> {
        self.destination_weather.as_ref()
    }
}
