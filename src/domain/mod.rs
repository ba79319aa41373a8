//! Module for the types defining the flight and weather domain.

mod flight;
mod reference;
mod weather;

pub(crate) use flight::{Flight, FlightDetails};
pub use reference::{Airline, Airport, ReferenceData, ReferenceTables};
pub(crate) use weather::WeatherSummary;
pub use weather::{Observation, Precipitation};
