//! Module defining the weather observations attached to flights

use serde::{Deserialize, Serialize};

/// Precipitation type written when an observation reports no precipitation
pub(crate) const NO_PRECIPITATION: &str = "none";

/// A point-in-time weather observation.
///
/// Observations are stored in the cache as JSON. The wire format uses the field names of the
/// upstream provider (`time`, `temperature`, `precipType`, `precipIntensity`), so provider
/// responses and cached payloads decode through the same type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ObservationPayload", into = "ObservationPayload")]
pub struct Observation {
    time: i64,
    temperature: f64,
    precipitation: Option<Precipitation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Precipitation {
    pub kind: String,
    pub intensity: f64,
}

impl Observation {
    pub fn new(time: i64, temperature: f64, precipitation: Option<Precipitation>) -> Self {
        Self {
            time,
            temperature,
            precipitation,
        }
    }

    /// Unix timestamp (seconds) the observation belongs to
    pub fn time(&self) -> i64 {
        self.time
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn precipitation(&self) -> Option<&Precipitation> {
        self.precipitation.as_ref()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObservationPayload {
    time: i64,
    #[serde(default)]
    temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    precip_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    precip_intensity: Option<f64>,
}

impl From<ObservationPayload> for Observation {
    fn from(payload: ObservationPayload) -> Self {
        // type and intensity only make sense together
        let precipitation = match (payload.precip_type, payload.precip_intensity) {
            (Some(kind), Some(intensity)) => Some(Precipitation { kind, intensity }),
            _ => None,
        };
        Self {
            time: payload.time,
            temperature: payload.temperature,
            precipitation,
        }
    }
}

impl From<Observation> for ObservationPayload {
    fn from(observation: Observation) -> Self {
        let (precip_type, precip_intensity) = match observation.precipitation {
            Some(Precipitation { kind, intensity }) => (Some(kind), Some(intensity)),
            None => (None, None),
        };
        Self {
            time: observation.time,
            temperature: observation.temperature,
            precip_type,
            precip_intensity,
        }
    }
}

/// The weather fields recorded for one end of a flight
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WeatherSummary {
    pub(crate) temperature: f64,
    pub(crate) precip_type: String,
    pub(crate) precip_intensity: f64,
}

impl From<&Observation> for WeatherSummary {
    fn from(observation: &Observation) -> Self {
        let (precip_type, precip_intensity) = match observation.precipitation() {
            Some(p) if p.intensity > 0.0 => (p.kind.clone(), p.intensity),
            _ => (NO_PRECIPITATION.to_string(), 0.0),
        };
        Self {
            temperature: observation.temperature(),
            precip_type,
            precip_intensity,
        }
    }
}
