//! Reference directory (C1): read-only lookup of airports and airlines by
//! code, built once from bulk tabular sources. The loaders here are a thin
//! convenience for tests and the demo binary — a production deployment's
//! real loader (refreshing from a live airline/airport database) is out of
//! scope here.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Immutable airport record, keyed by four-letter ICAO code.
#[derive(Debug, Clone, PartialEq)]
pub struct AirportRef {
    pub icao: String,
    pub iata: Option<String>,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub country: String,
    pub timezone: String,
}

/// Immutable airline record, keyed by three-letter ICAO code.
#[derive(Debug, Clone, PartialEq)]
pub struct AirlineRef {
    pub icao: String,
    pub iata: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct AirportCsvRow {
    icao: String,
    iata: Option<String>,
    name: String,
    latitude: f64,
    longitude: f64,
    country: String,
    timezone: String,
}

#[derive(Debug, Deserialize)]
struct AirlineCsvRow {
    icao: String,
    iata: String,
    name: String,
}

/// Disambiguation hints for `airline_by_iata` when a two-letter IATA code is
/// shared by multiple ICAOs.
#[derive(Debug, Clone, Default)]
pub struct AirlineHints<'a> {
    pub name: Option<&'a str>,
    pub flight_number: Option<i64>,
}

/// A manual override applied before the IATA lookup runs, enumerated as
/// data rather than as a code branch so new overrides don't require a
/// recompile of the matching logic.
struct AirlineNameOverride {
    iata: &'static str,
    flight_number_range: std::ops::RangeInclusive<i64>,
    name: &'static str,
}

/// Lufthansa's cargo flight numbers share the `LH` IATA code with passenger
/// Lufthansa but resolve to a different display name for disambiguation
/// purposes. See https://de.wikipedia.org/wiki/Lufthansa#Flugnummernsystem
const AIRLINE_OVERRIDES: &[AirlineNameOverride] = &[AirlineNameOverride {
    iata: "LH",
    flight_number_range: 8000..=8515,
    name: "Lufthansa Cargo",
}];

pub struct ReferenceDirectory {
    airports_by_icao: HashMap<String, AirportRef>,
    airports_by_iata: HashMap<String, String>,
    airlines_by_icao: HashMap<String, AirlineRef>,
    airlines_by_iata: HashMap<String, Vec<String>>,
}

impl ReferenceDirectory {
    pub fn new(airports: Vec<AirportRef>, airlines: Vec<AirlineRef>) -> Self {
        let mut airports_by_icao = HashMap::new();
        let mut airports_by_iata = HashMap::new();
        for airport in airports {
            if let Some(iata) = &airport.iata {
                airports_by_iata.insert(iata.clone(), airport.icao.clone());
            }
            airports_by_icao.insert(airport.icao.clone(), airport);
        }

        let mut airlines_by_icao = HashMap::new();
        let mut airlines_by_iata: HashMap<String, Vec<String>> = HashMap::new();
        for airline in airlines {
            if !airline.iata.is_empty() {
                airlines_by_iata
                    .entry(airline.iata.clone())
                    .or_default()
                    .push(airline.icao.clone());
            }
            airlines_by_icao.insert(airline.icao.clone(), airline);
        }

        Self {
            airports_by_icao,
            airports_by_iata,
            airlines_by_icao,
            airlines_by_iata,
        }
    }

    /// Bulk-load airports and airlines from two CSV files with headers
    /// `icao,iata,name,latitude,longitude,country,timezone` and
    /// `icao,iata,name` respectively.
    pub fn load_from_csv(
        airports_csv: impl AsRef<Path>,
        airlines_csv: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        use anyhow::Context;

        let airports_path = airports_csv.as_ref();
        let mut airport_reader = csv::Reader::from_path(airports_path)
            .with_context(|| format!("opening airports CSV {airports_path:?}"))?;
        let mut airports = Vec::new();
        for record in airport_reader.deserialize() {
            let row: AirportCsvRow =
                record.with_context(|| format!("parsing row in {airports_path:?}"))?;
            airports.push(AirportRef {
                icao: row.icao.to_uppercase(),
                iata: row.iata.map(|s| s.to_uppercase()),
                name: row.name,
                latitude: row.latitude,
                longitude: row.longitude,
                country: row.country,
                timezone: row.timezone,
            });
        }

        let airlines_path = airlines_csv.as_ref();
        let mut airline_reader = csv::Reader::from_path(airlines_path)
            .with_context(|| format!("opening airlines CSV {airlines_path:?}"))?;
        let mut airlines = Vec::new();
        for record in airline_reader.deserialize() {
            let row: AirlineCsvRow =
                record.with_context(|| format!("parsing row in {airlines_path:?}"))?;
            airlines.push(AirlineRef {
                icao: row.icao.to_uppercase(),
                iata: row.iata.to_uppercase(),
                name: row.name,
            });
        }

        Ok(Self::new(airports, airlines))
    }

    pub fn airport(&self, icao: &str) -> Option<&AirportRef> {
        self.airports_by_icao.get(&icao.to_uppercase())
    }

    pub fn airport_by_iata(&self, iata: &str) -> Option<&AirportRef> {
        let icao = self.airports_by_iata.get(&iata.to_uppercase())?;
        self.airports_by_icao.get(icao)
    }

    pub fn airline_by_icao(&self, icao: &str) -> Option<&AirlineRef> {
        self.airlines_by_icao.get(&icao.to_uppercase())
    }

    /// Resolve a two-letter airline IATA code to a single airline. When more
    /// than one ICAO shares the IATA code, disambiguates using the highest
    /// name-similarity ratio against `hints.name`; ties, or the absence of a
    /// hint name when more than one candidate remains, resolve to `None`.
    pub fn airline_by_iata(&self, iata: &str, hints: &AirlineHints) -> Option<&AirlineRef> {
        let resolved_name = resolve_override_name(iata, hints);
        let candidates = self.airlines_by_iata.get(&iata.to_uppercase())?;
        match candidates.len() {
            0 => None,
            1 => self.airlines_by_icao.get(&candidates[0]),
            _ => {
                let name = resolved_name.as_deref().or(hints.name)?;
                best_match_by_name(candidates, name, &self.airlines_by_icao)
            }
        }
    }
}

fn resolve_override_name(iata: &str, hints: &AirlineHints) -> Option<String> {
    let flight_number = hints.flight_number?;
    AIRLINE_OVERRIDES
        .iter()
        .find(|o| o.iata.eq_ignore_ascii_case(iata) && o.flight_number_range.contains(&flight_number))
        .map(|o| o.name.to_string())
}

fn best_match_by_name<'a>(
    candidates: &[String],
    name: &str,
    airlines_by_icao: &'a HashMap<String, AirlineRef>,
) -> Option<&'a AirlineRef> {
    let mut scored: Vec<(f64, &String)> = candidates
        .iter()
        .filter_map(|icao| {
            let airline = airlines_by_icao.get(icao)?;
            Some((name_similarity(&airline.name, name), icao))
        })
        .collect();
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());
    let (best_score, best_icao) = scored.last()?;
    // If more than one candidate ties for the top score, it's ambiguous.
    let tie_count = scored.iter().filter(|(score, _)| score == best_score).count();
    if tie_count > 1 {
        return None;
    }
    airlines_by_icao.get(*best_icao)
}

/// Length-normalised ratio of the longest common subsequence of two
/// uppercased strings, rounded to three decimals.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_uppercase();
    let b = b.to_uppercase();
    let lcs_len = longest_common_subsequence_len(a.as_bytes(), b.as_bytes());
    let denom = a.len() + b.len();
    if denom == 0 {
        return 0.0;
    }
    let ratio = (2.0 * lcs_len as f64) / denom as f64;
    (ratio * 1000.0).round() / 1000.0
}

fn longest_common_subsequence_len(a: &[u8], b: &[u8]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_directory() -> ReferenceDirectory {
        let airports = vec![
            AirportRef {
                icao: "EDDF".into(),
                iata: Some("FRA".into()),
                name: "Frankfurt".into(),
                latitude: 50.0333,
                longitude: 8.5706,
                country: "DE".into(),
                timezone: "Europe/Berlin".into(),
            },
            AirportRef {
                icao: "EGLL".into(),
                iata: Some("LHR".into()),
                name: "London Heathrow".into(),
                latitude: 51.4706,
                longitude: -0.4619,
                country: "GB".into(),
                timezone: "Europe/London".into(),
            },
        ];
        let airlines = vec![
            AirlineRef {
                icao: "DLH".into(),
                iata: "LH".into(),
                name: "Lufthansa".into(),
            },
            AirlineRef {
                icao: "GEC".into(),
                iata: "LH".into(),
                name: "Lufthansa Cargo".into(),
            },
            AirlineRef {
                icao: "BAW".into(),
                iata: "BA".into(),
                name: "British Airways".into(),
            },
        ];
        ReferenceDirectory::new(airports, airlines)
    }

    #[test]
    fn airport_lookup_by_icao_and_iata() {
        let dir = sample_directory();
        assert_eq!(dir.airport("eddf").unwrap().iata.as_deref(), Some("FRA"));
        assert_eq!(dir.airport_by_iata("fra").unwrap().icao, "EDDF");
        assert!(dir.airport("ZZZZ").is_none());
    }

    #[test]
    fn airline_single_iata_match_resolves_without_hints() {
        let dir = sample_directory();
        let airline = dir.airline_by_iata("BA", &AirlineHints::default()).unwrap();
        assert_eq!(airline.icao, "BAW");
    }

    #[test]
    fn airline_shared_iata_disambiguated_by_name_hint() {
        let dir = sample_directory();
        let hints = AirlineHints {
            name: Some("Lufthansa Cargo"),
            flight_number: None,
        };
        let airline = dir.airline_by_iata("LH", &hints).unwrap();
        assert_eq!(airline.icao, "GEC");
    }

    #[test]
    fn airline_shared_iata_without_hint_is_ambiguous() {
        let dir = sample_directory();
        assert!(dir.airline_by_iata("LH", &AirlineHints::default()).is_none());
    }

    #[test]
    fn cargo_flight_number_override_resolves_to_cargo_variant() {
        let dir = sample_directory();
        let hints = AirlineHints {
            name: None,
            flight_number: Some(8100),
        };
        let airline = dir.airline_by_iata("LH", &hints).unwrap();
        assert_eq!(airline.icao, "GEC");
    }

    #[test]
    fn passenger_flight_number_outside_cargo_range_stays_ambiguous_without_name() {
        let dir = sample_directory();
        let hints = AirlineHints {
            name: None,
            flight_number: Some(400),
        };
        assert!(dir.airline_by_iata("LH", &hints).is_none());
    }

    #[test]
    fn name_similarity_is_symmetric_and_bounded() {
        let a = name_similarity("Lufthansa", "Lufthansa Cargo");
        let b = name_similarity("Lufthansa Cargo", "Lufthansa");
        assert_eq!(a, b);
        assert!((0.0..=1.0).contains(&a));
    }

    #[test]
    fn load_from_csv_round_trips_sample_data() {
        let dir = tempfile::tempdir().unwrap();
        let airports_path = dir.path().join("airports.csv");
        let airlines_path = dir.path().join("airlines.csv");
        std::fs::write(
            &airports_path,
            "icao,iata,name,latitude,longitude,country,timezone\n\
             EDDF,FRA,Frankfurt,50.0333,8.5706,DE,Europe/Berlin\n",
        )
        .unwrap();
        std::fs::write(&airlines_path, "icao,iata,name\nDLH,LH,Lufthansa\n").unwrap();

        let loaded = ReferenceDirectory::load_from_csv(&airports_path, &airlines_path).unwrap();
        assert_eq!(loaded.airport("EDDF").unwrap().name, "Frankfurt");
        assert_eq!(loaded.airline_by_icao("DLH").unwrap().iata, "LH");
    }
}
