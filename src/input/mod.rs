//! Module defining the parsing logic used to convert the raw input rows into flights that can be enriched with weather.

use std::{collections::HashMap, io::Read};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::domain::{Airport, Flight, FlightDetails, ReferenceData};
use crate::error::{Error, row_error};


pub(crate) const COL_DATE: &str = "FL_DATE";
pub(crate) const COL_CARRIER: &str = "CARRIER";
pub(crate) const COL_ORIGIN: &str = "ORIGIN";
pub(crate) const COL_DEST: &str = "DEST";
pub(crate) const COL_CANCELLED: &str = "CANCELLED";
pub(crate) const COL_CANCELLATION_CODE: &str = "CANCELLATION_CODE";
pub(crate) const COL_SCHEDULED_DEPARTURE: &str = "CRS_DEP_TIME";
pub(crate) const COL_ACTUAL_DEPARTURE: &str = "DEP_TIME";
pub(crate) const COL_DELAY: &str = "DEP_DELAY";
pub(crate) const COL_DIVERTED: &str = "DIVERTED";

/// Columns without which no row could be parsed. The cancellation code is optional.
pub(crate) const REQUIRED_COLUMNS: [&str; 9] = [
    COL_DATE,
    COL_CARRIER,
    COL_ORIGIN,
    COL_DEST,
    COL_CANCELLED,
    COL_SCHEDULED_DEPARTURE,
    COL_ACTUAL_DEPARTURE,
    COL_DELAY,
    COL_DIVERTED,
];

const DATE_FORMAT: &str = "%Y-%m-%d";
const CLOCK_FORMAT: &str = "%H%M";

/// One input row: column name to raw value, plus its 1-based position among the data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RawRow {
    pub(crate) number: u64,
    pub(crate) fields: HashMap<String, String>,
}

impl RawRow {
    fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }
}

/// Reads the rows of a flight CSV. Creating the reader validates the header.
pub(crate) struct RowReader<R> {
    headers: Vec<String>,
    records: csv::StringRecordsIntoIter<R>,
    next_number: u64,
}

impl<R: Read> RowReader<R> {
    pub(crate) fn new(reader: R) -> Result<Self, Error> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|column| !headers.iter().any(|h| h == *column))
            .map(|column| column.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingColumns(missing));
        }

        Ok(Self {
            headers,
            records: csv_reader.into_records(),
            next_number: 1,
        })
    }
}

impl<R: Read> Iterator for RowReader<R> {
    type Item = Result<RawRow, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        let number = self.next_number;
        self.next_number += 1;

        Some(record.map_err(Error::from).map(|record| RawRow {
            number,
            fields: self
                .headers
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect(),
        }))
    }
}

/// Converts a raw row into a flight, resolving airline and airport codes against `references`.
///
/// Clock values are local times of the origin airport. The provider writes midnight at the end
/// of the day as `2400`, which is read as `2359` of the same date. Cancelled flights may lack
/// clock values altogether; an unreadable scheduled clock then falls back to the start of the
/// flight date.
pub(crate) fn parse_flight(row: &RawRow, references: &impl ReferenceData) -> Result<Flight, Error> {
    let n = row.number;

    let date_raw = row.get(COL_DATE);
    let date = NaiveDate::parse_from_str(date_raw, DATE_FORMAT)
        .map_err(|e| row_error(n, COL_DATE, date_raw, e.to_string()))?;

    let carrier = row.get(COL_CARRIER);
    let airline = references
        .airline(carrier)
        .ok_or_else(|| row_error(n, COL_CARRIER, carrier, "unknown airline code"))?
        .clone();

    let origin = lookup_airport(row, COL_ORIGIN, references)?;
    let destination = lookup_airport(row, COL_DEST, references)?;
    let tz = origin
        .time_zone()
        .map_err(|msg| row_error(n, COL_ORIGIN, origin.iata(), msg))?;

    let cancelled = parse_flag(row.get(COL_CANCELLED));
    let diverted = parse_flag(row.get(COL_DIVERTED));

    let (scheduled_departure, scheduled_clock_known) =
        match parse_local_time(row, COL_SCHEDULED_DEPARTURE, date, tz) {
            Ok(time) => (time, true),
            Err(_) if cancelled => (start_of_day(row, date, tz)?, false),
            Err(e) => return Err(e),
        };
    let (actual_departure, delay_minutes) = if cancelled {
        (None, 0)
    } else {
        let actual = parse_local_time(row, COL_ACTUAL_DEPARTURE, date, tz)?;
        (Some(actual), parse_delay(row)?)
    };

    Ok(Flight::new(FlightDetails {
        date,
        airline,
        origin,
        destination,
        scheduled_departure,
        scheduled_clock_known,
        actual_departure,
        delay_minutes,
        cancelled,
        cancellation_code: row.get(COL_CANCELLATION_CODE).to_string(),
        diverted,
    }))
}

fn lookup_airport(
    row: &RawRow,
    column: &'static str,
    references: &impl ReferenceData,
) -> Result<Airport, Error> {
    let code = row.get(column);
    references
        .airport(code)
        .cloned()
        .ok_or_else(|| row_error(row.number, column, code, "unknown airport code"))
}

// flags are written as decimals, e.g. "1.00" / "0.00"
fn parse_flag(raw: &str) -> bool {
    raw.parse::<f64>().is_ok_and(|value| value != 0.0)
}

fn parse_local_time(
    row: &RawRow,
    column: &'static str,
    date: NaiveDate,
    tz: Tz,
) -> Result<DateTime<Tz>, Error> {
    let raw = row.get(column);
    let clock = match raw {
        "" => return Err(row_error(row.number, column, raw, "missing clock value")),
        "2400" => "2359".to_string(),
        short if short.len() < 4 => format!("{short:0>4}"),
        other => other.to_string(),
    };
    let time = NaiveTime::parse_from_str(&clock, CLOCK_FORMAT)
        .map_err(|e| row_error(row.number, column, raw, e.to_string()))?;

    tz.from_local_datetime(&date.and_time(time))
        .earliest()
        .ok_or_else(|| {
            row_error(
                row.number,
                column,
                raw,
                format!("local time does not exist in {tz}"),
            )
        })
}

fn start_of_day(row: &RawRow, date: NaiveDate, tz: Tz) -> Result<DateTime<Tz>, Error> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .ok_or_else(|| {
            row_error(
                row.number,
                COL_DATE,
                row.get(COL_DATE),
                format!("day has no midnight in {tz}"),
            )
        })
}

fn parse_delay(row: &RawRow) -> Result<i64, Error> {
    let raw = row.get(COL_DELAY);
    if raw.is_empty() {
        return Ok(0);
    }
    let delay = raw
        .parse::<f64>()
        .map_err(|e| row_error(row.number, COL_DELAY, raw, e.to_string()))?;
    if !delay.is_finite() {
        return Err(row_error(row.number, COL_DELAY, raw, "delay is not finite"));
    }
    // whole minutes, early departures count as on time
    Ok(delay.max(0.0) as i64)
}
