use std::collections::HashMap;

use chrono_tz::{Tz, US};

// Built-in airport table: IATA code -> civil time zone of the departure airport.
const BUILTIN_ZONES: &[(&str, Tz)] = &[
    ("ABQ", US::Mountain),
    ("ALB", US::Eastern),
    ("AMA", US::Central),
    ("AUS", US::Central),
    ("BDL", US::Eastern),
    ("BHM", US::Central),
    ("BNA", US::Central),
    ("BOI", US::Mountain),
    ("BUF", US::Eastern),
    ("BUR", US::Pacific),
    ("BWI", US::Eastern),
    ("CLE", US::Eastern),
    ("CMH", US::Eastern),
    ("CRP", US::Central),
    ("DAL", US::Central),
    ("DEN", US::Mountain),
    ("DTW", US::Eastern),
    ("ELP", US::Mountain),
    ("FLL", US::Eastern),
    ("GEG", US::Pacific),
    ("HOU", US::Central),
    ("HRL", US::Central),
    ("IAD", US::Eastern),
    ("IND", US::Eastern),
    ("ISP", US::Eastern),
    ("JAN", US::Central),
    ("JAX", US::Eastern),
    ("LAS", US::Pacific),
    ("LAX", US::Pacific),
    ("LBB", US::Central),
    ("LIT", US::Central),
    ("MAF", US::Central),
    ("MCI", US::Central),
    ("MCO", US::Eastern),
    ("MDW", US::Central),
    ("MHT", US::Eastern),
    ("MSP", US::Central),
    ("MSY", US::Central),
    ("OAK", US::Pacific),
    ("OKC", US::Central),
    ("OMA", US::Central),
    ("ONT", US::Pacific),
    ("ORF", US::Eastern),
    ("PBI", US::Eastern),
    ("PDX", US::Pacific),
    ("PHL", US::Eastern),
    ("PHX", US::Arizona),
    ("PIT", US::Eastern),
    ("PVD", US::Eastern),
    ("RDU", US::Eastern),
    ("RNO", US::Pacific),
    ("RSW", US::Eastern),
    ("SAN", US::Pacific),
    ("SAT", US::Central),
    ("SDF", US::Eastern),
    ("SEA", US::Pacific),
    ("SFO", US::Pacific),
    ("SJC", US::Pacific),
    ("SLC", US::Mountain),
    ("SMF", US::Pacific),
    ("SNA", US::Pacific),
    ("STL", US::Central),
    ("TPA", US::Eastern),
    ("TUL", US::Central),
    ("TUS", US::Arizona),
];

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AirportError {
    #[error("Unknown airport: {0}")]
    UnknownAirport(String),
    #[error("Invalid time zone {zone} for airport {code}")]
    InvalidZone { code: String, zone: String },
}

/// Maps three-letter airport codes to the civil time zone flights depart in.
///
/// The table is fixed at construction: the built-in list, optionally extended or
/// corrected from configuration. There is no fallback zone.
#[derive(Debug, Clone)]
pub struct TimeZoneResolver {
    zones: HashMap<String, Tz>,
}

impl TimeZoneResolver {
    pub fn builtin() -> Self {
        let zones = BUILTIN_ZONES
            .iter()
            .map(|(code, tz)| (code.to_string(), *tz))
            .collect();
        Self { zones }
    }

    /// Built-in table with configured `CODE = "Area/Zone"` entries layered on top.
    pub fn with_overrides<'a, I>(overrides: I) -> Result<Self, AirportError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut resolver = Self::builtin();
        for (code, zone) in overrides {
            let tz: Tz = zone.parse().map_err(|_| AirportError::InvalidZone {
                code: code.to_string(),
                zone: zone.to_string(),
            })?;
            resolver.zones.insert(normalize(code), tz);
        }
        Ok(resolver)
    }

    pub fn resolve(&self, code: &str) -> Result<Tz, AirportError> {
        self.zones
            .get(&normalize(code))
            .copied()
            .ok_or_else(|| AirportError::UnknownAirport(code.to_string()))
    }
}

impl Default for TimeZoneResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}
