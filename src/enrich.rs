use tracing::{debug, warn};

use crate::models::{FlightDataset, FlightRecord, RawFlightRow};

/// `code-name`, or just the code when the name is null.
pub fn composite_label(code: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{code}-{name}"),
        None => code.to_string(),
    }
}

/// The code part of a composite label: everything before the first `-`.
/// A label without a separator is all code.
pub fn label_code(label: &str) -> &str {
    match label.split_once('-') {
        Some((code, _)) => code,
        None => {
            debug!(label, "label has no name part, using it as the code");
            label
        }
    }
}

pub fn enrich(rows: Vec<RawFlightRow>) -> FlightDataset {
    let total = rows.len();
    let records: Vec<FlightRecord> = rows.into_iter().filter_map(enrich_row).collect();

    if records.len() < total {
        warn!(
            dropped = total - records.len(),
            "skipped schedule rows without airline or airport codes"
        );
    }

    FlightDataset::new(records)
}

fn enrich_row(row: RawFlightRow) -> Option<FlightRecord> {
    if row.airline_code.is_empty()
        || row.departure_port_code.is_empty()
        || row.arrival_port_code.is_empty()
    {
        return None;
    }

    Some(FlightRecord {
        airline_label: composite_label(&row.airline_code, row.airline_name.as_deref()),
        departure_label: composite_label(
            &row.departure_port_code,
            row.departure_airport_name.as_deref(),
        ),
        arrival_label: composite_label(&row.arrival_port_code, row.arrival_airport_name.as_deref()),
        airline_code: row.airline_code,
        airline_name: row.airline_name,
        flight_date: row.flight_date,
        departure_port_code: row.departure_port_code,
        departure_airport_name: row.departure_airport_name,
        arrival_port_code: row.arrival_port_code,
        arrival_airport_name: row.arrival_airport_name,
        total_stops_in_route: row.total_stops_in_route,
        route_path: row.route_path,
        distance: row.distance,
        elapsed_time: row.elapsed_time,
        flight_number: row.flight_number,
        first_class_seats: row.first_class_seats,
        business_class_seats: row.business_class_seats,
        premium_economy_class_seats: row.premium_economy_class_seats,
        economy_plus_class_seats: row.economy_plus_class_seats,
        economy_class_seats: row.economy_class_seats,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDate;

    pub(crate) fn raw_row(airline: (&str, Option<&str>), dep: &str, arr: &str) -> RawFlightRow {
        RawFlightRow {
            airline_code: airline.0.to_string(),
            airline_name: airline.1.map(str::to_string),
            flight_date: NaiveDate::from_ymd_opt(2022, 4, 1).unwrap(),
            departure_port_code: dep.to_string(),
            departure_airport_name: None,
            arrival_port_code: arr.to_string(),
            arrival_airport_name: None,
            total_stops_in_route: 0,
            route_path: format!("{dep}-{arr}"),
            distance: 740.0,
            elapsed_time: 150.0,
            flight_number: "100".to_string(),
            first_class_seats: 0.0,
            business_class_seats: 0.0,
            premium_economy_class_seats: 0.0,
            economy_plus_class_seats: 0.0,
            economy_class_seats: 0.0,
        }
    }

    #[test]
    fn label_is_code_when_name_is_null() {
        assert_eq!(composite_label("AA", None), "AA");
    }

    #[test]
    fn label_joins_code_and_name() {
        assert_eq!(composite_label("AA", Some("American")), "AA-American");
    }

    #[test]
    fn empty_name_is_not_null() {
        assert_eq!(composite_label("AA", Some("")), "AA-");
    }

    #[test]
    fn label_code_takes_prefix_before_first_separator() {
        assert_eq!(label_code("JFK-John F. Kennedy-Intl"), "JFK");
        assert_eq!(label_code("ORD"), "ORD");
    }

    #[test]
    fn enrich_builds_every_label_pair() {
        let mut row = raw_row(("DL", Some("Delta")), "JFK", "ATL");
        row.departure_airport_name = Some("Kennedy".to_string());
        let dataset = enrich(vec![row]);
        let record = &dataset.records()[0];

        assert_eq!(record.airline_label, "DL-Delta");
        assert_eq!(record.departure_label, "JFK-Kennedy");
        assert_eq!(record.arrival_label, "ATL");
    }

    #[test]
    fn enrich_drops_rows_without_codes() {
        let rows = vec![
            raw_row(("", Some("Nameless")), "JFK", "ATL"),
            raw_row(("AA", None), "JFK", "ATL"),
        ];
        let dataset = enrich(rows);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records()[0].airline_code, "AA");
    }
}
