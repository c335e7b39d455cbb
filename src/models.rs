use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// A schedule row as the loaders return it, before labels are derived.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFlightRow {
    pub airline_code: String,
    pub airline_name: Option<String>,
    pub flight_date: NaiveDate,
    pub departure_port_code: String,
    pub departure_airport_name: Option<String>,
    pub arrival_port_code: String,
    pub arrival_airport_name: Option<String>,
    pub total_stops_in_route: u32,
    pub route_path: String,
    pub distance: f64,
    pub elapsed_time: f64,
    pub flight_number: String,
    #[serde(deserialize_with = "seat_count")]
    pub first_class_seats: f64,
    #[serde(deserialize_with = "seat_count")]
    pub business_class_seats: f64,
    #[serde(deserialize_with = "seat_count")]
    pub premium_economy_class_seats: f64,
    #[serde(deserialize_with = "seat_count")]
    pub economy_plus_class_seats: f64,
    #[serde(deserialize_with = "seat_count")]
    pub economy_class_seats: f64,
}

/// Missing seat counts count as zero, the same as the warehouse query.
fn seat_count<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// An enriched schedule row. Never mutated once the dataset is built.
#[derive(Debug, Clone)]
pub struct FlightRecord {
    pub airline_code: String,
    pub airline_name: Option<String>,
    pub airline_label: String,
    pub flight_date: NaiveDate,
    pub departure_port_code: String,
    pub departure_airport_name: Option<String>,
    pub departure_label: String,
    pub arrival_port_code: String,
    pub arrival_airport_name: Option<String>,
    pub arrival_label: String,
    pub total_stops_in_route: u32,
    pub route_path: String,
    pub distance: f64,
    pub elapsed_time: f64,
    pub flight_number: String,
    pub first_class_seats: f64,
    pub business_class_seats: f64,
    pub premium_economy_class_seats: f64,
    pub economy_plus_class_seats: f64,
    pub economy_class_seats: f64,
}

impl FlightRecord {
    pub fn seats(&self, category: SeatCategory) -> f64 {
        match category {
            SeatCategory::First => self.first_class_seats,
            SeatCategory::Business => self.business_class_seats,
            SeatCategory::PremiumEconomy => self.premium_economy_class_seats,
            SeatCategory::EconomyPlus => self.economy_plus_class_seats,
            SeatCategory::Economy => self.economy_class_seats,
        }
    }

    pub fn matches(&self, selection: &ResolvedSelection) -> bool {
        self.airline_code == selection.airline_code
            && self.flight_date == selection.flight_date
            && self.departure_port_code == selection.dep_code
            && self.arrival_port_code == selection.arr_code
    }
}

/// The enriched schedule, shared read-only between interactions.
#[derive(Debug, Clone, Default)]
pub struct FlightDataset {
    records: Vec<FlightRecord>,
}

impl FlightDataset {
    pub fn new(records: Vec<FlightRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[FlightRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// One row of the inflight service description table, kept column by column.
pub type InflightService = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeatCategory {
    First,
    Business,
    PremiumEconomy,
    EconomyPlus,
    Economy,
}

impl SeatCategory {
    pub const ALL: [SeatCategory; 5] = [
        SeatCategory::First,
        SeatCategory::Business,
        SeatCategory::PremiumEconomy,
        SeatCategory::EconomyPlus,
        SeatCategory::Economy,
    ];

    pub fn column(self) -> &'static str {
        match self {
            SeatCategory::First => "first_class_seats",
            SeatCategory::Business => "business_class_seats",
            SeatCategory::PremiumEconomy => "premium_economy_class_seats",
            SeatCategory::EconomyPlus => "economy_plus_class_seats",
            SeatCategory::Economy => "economy_class_seats",
        }
    }
}

impl fmt::Display for SeatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Choices made so far in the airline -> date -> departure -> arrival cascade.
///
/// Airline, departure and arrival hold the composite labels as displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub airline: Option<String>,
    pub flight_date: Option<NaiveDate>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
}

impl SelectionState {
    /// Clears `stage` and every stage after it.
    pub fn reopen(&mut self, stage: Stage) {
        if stage <= Stage::Airline {
            self.airline = None;
        }
        if stage <= Stage::Date {
            self.flight_date = None;
        }
        if stage <= Stage::Departure {
            self.departure = None;
        }
        self.arrival = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Airline,
    Date,
    Departure,
    Arrival,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Airline => "airline",
            Stage::Date => "date",
            Stage::Departure => "departure airport",
            Stage::Arrival => "arrival airport",
        };
        f.write_str(name)
    }
}

/// A fully specified filter tuple, in codes rather than labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelection {
    pub airline_code: String,
    pub flight_date: NaiveDate,
    pub dep_code: String,
    pub arr_code: String,
    pub departure_label: String,
    pub arrival_label: String,
}

impl fmt::Display for ResolvedSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} -> {}",
            self.airline_code, self.flight_date, self.dep_code, self.arr_code
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopSummary {
    pub nonstop: usize,
    pub with_stops: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightLeg {
    pub distance: f64,
    pub duration: f64,
}

/// Rounded seat totals, in category order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatSummary {
    totals: Vec<(SeatCategory, i64)>,
}

impl SeatSummary {
    pub fn new(totals: Vec<(SeatCategory, i64)>) -> Self {
        Self { totals }
    }

    /// Largest total first; ties keep category order.
    pub fn sorted_by_value(&self) -> Vec<(SeatCategory, i64)> {
        let mut sorted = self.totals.clone();
        sorted.sort_by(|a, b| b.1.cmp(&a.1));
        sorted
    }
}

#[cfg(test)]
impl SeatSummary {
    pub fn totals(&self) -> &[(SeatCategory, i64)] {
        &self.totals
    }

    pub fn get(&self, category: SeatCategory) -> Option<i64> {
        self.totals
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, total)| *total)
    }
}

/// Everything rendered for one resolved selection.
#[derive(Debug, Clone)]
pub struct FlightView<'a> {
    pub selection: ResolvedSelection,
    pub flights: Vec<&'a FlightRecord>,
    pub stops: StopSummary,
    pub route: String,
    pub legs: Vec<(String, FlightLeg)>,
    pub seats: SeatSummary,
}
