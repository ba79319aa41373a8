//! Module defining the airline and airport reference data the parser resolves codes against

use std::{collections::HashMap, fs::File, io::Read, path::Path};

use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::Error;

/// An airline as identified by its IATA code
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Airline {
    iata: String,
    name: String,
}

impl Airline {
    pub fn new(iata: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            iata: iata.into(),
            name: name.into(),
        }
    }

    pub fn iata(&self) -> &str {
        &self.iata
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// An airport: the location weather is resolved for.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Airport {
    iata: String,
    latitude: f64,
    longitude: f64,
    /// IANA time zone name, e.g. `America/New_York`
    tz: String,
}

impl Airport {
    pub fn new(
        iata: impl Into<String>,
        latitude: f64,
        longitude: f64,
        tz: impl Into<String>,
    ) -> Self {
        Self {
            iata: iata.into(),
            latitude,
            longitude,
            tz: tz.into(),
        }
    }

    pub fn iata(&self) -> &str {
        &self.iata
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn tz_name(&self) -> &str {
        &self.tz
    }

    /// Loads the time zone of the airport. Fails for names unknown to the tz database.
    pub fn time_zone(&self) -> Result<Tz, String> {
        self.tz
            .parse::<Tz>()
            .map_err(|_| format!("unknown time zone {:?} for airport {}", self.tz, self.iata))
    }
}

/// Lookup of reference entities by their IATA code.
pub trait ReferenceData {
    fn airline(&self, iata: &str) -> Option<&Airline>;
    fn airport(&self, iata: &str) -> Option<&Airport>;
}

/// In-memory reference tables, usually loaded from two CSV files:
///
/// - airlines: `iata,name`
/// - airports: `iata,latitude,longitude,tz`
#[derive(Debug, Default)]
pub struct ReferenceTables {
    airlines: HashMap<String, Airline>,
    airports: HashMap<String, Airport>,
}

impl ReferenceTables {
    /// Builds the tables from already constructed entities. On duplicate codes the first entry is kept.
    pub fn new(
        airlines: impl IntoIterator<Item = Airline>,
        airports: impl IntoIterator<Item = Airport>,
    ) -> Self {
        let mut tables = Self::default();
        for airline in airlines {
            tables
                .airlines
                .entry(airline.iata.clone())
                .or_insert(airline);
        }
        for airport in airports {
            tables
                .airports
                .entry(airport.iata.clone())
                .or_insert(airport);
        }
        tables
    }

    pub fn from_readers(airlines: impl Read, airports: impl Read) -> Result<Self, Error> {
        let airlines = read_table::<Airline>(airlines)?;
        let airports = read_table::<Airport>(airports)?;
        if airports.is_empty() {
            return Err(Error::Reference("airport table is empty".to_string()));
        }
        Ok(Self::new(airlines, airports))
    }

    pub fn from_paths(airlines: &Path, airports: &Path) -> Result<Self, Error> {
        let open = |path: &Path| {
            File::open(path).map_err(|e| {
                Error::Reference(format!("cannot open {}: {e}", path.display()))
            })
        };
        Self::from_readers(open(airlines)?, open(airports)?)
    }

    pub fn airline_count(&self) -> usize {
        self.airlines.len()
    }

    pub fn airport_count(&self) -> usize {
        self.airports.len()
    }
}

impl ReferenceData for ReferenceTables {
    fn airline(&self, iata: &str) -> Option<&Airline> {
        self.airlines.get(iata)
    }

    fn airport(&self, iata: &str) -> Option<&Airport> {
        self.airports.get(iata)
    }
}

fn read_table<T: for<'de> Deserialize<'de>>(reader: impl Read) -> Result<Vec<T>, Error> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
        .into_deserialize::<T>()
        .map(|row| row.map_err(Error::from))
        .collect()
}
