use tracing::debug;

use crate::error::ExplorerError;
use crate::models::{
    FlightDataset, FlightLeg, FlightRecord, FlightView, ResolvedSelection, SeatCategory,
    SeatSummary, StopSummary,
};

pub fn matching_set<'a>(
    dataset: &'a FlightDataset,
    selection: &ResolvedSelection,
) -> Vec<&'a FlightRecord> {
    dataset
        .records()
        .iter()
        .filter(|record| record.matches(selection))
        .collect()
}

pub fn classify_stops(flights: &[&FlightRecord]) -> StopSummary {
    let nonstop = flights
        .iter()
        .filter(|flight| flight.total_stops_in_route == 0)
        .count();

    StopSummary {
        nonstop,
        with_stops: flights.len() - nonstop,
    }
}

/// Every route path in order, repeats included, joined with commas.
pub fn route_summary(flights: &[&FlightRecord]) -> String {
    flights
        .iter()
        .map(|flight| flight.route_path.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// Keyed by flight number in matching-set order; a repeated flight number
/// keeps its first position but takes the last row's values.
pub fn distance_duration_table(flights: &[&FlightRecord]) -> Vec<(String, FlightLeg)> {
    let mut table: Vec<(String, FlightLeg)> = Vec::new();

    for flight in flights {
        let leg = FlightLeg {
            distance: flight.distance,
            duration: flight.elapsed_time,
        };
        match table
            .iter_mut()
            .find(|(flight_number, _)| *flight_number == flight.flight_number)
        {
            Some(entry) => {
                debug!(
                    flight_number = %flight.flight_number,
                    "duplicate flight number overwrote an earlier row"
                );
                entry.1 = leg;
            }
            None => table.push((flight.flight_number.clone(), leg)),
        }
    }

    table
}

/// Rounded per-category seat totals. The matching set holds a single date,
/// so the date group-by reduces to one sum per category.
pub fn seat_summary(
    flights: &[&FlightRecord],
    selection: &ResolvedSelection,
) -> Result<SeatSummary, ExplorerError> {
    if flights.is_empty() {
        return Err(ExplorerError::EmptySelection {
            selection: selection.clone(),
        });
    }

    let totals = SeatCategory::ALL
        .iter()
        .map(|&category| {
            let sum: f64 = flights.iter().map(|flight| flight.seats(category)).sum();
            (category, sum.round_ties_even() as i64)
        })
        .collect();

    Ok(SeatSummary::new(totals))
}

pub fn aggregate<'a>(
    dataset: &'a FlightDataset,
    selection: &ResolvedSelection,
) -> Result<FlightView<'a>, ExplorerError> {
    let flights = matching_set(dataset, selection);
    if flights.is_empty() {
        return Err(ExplorerError::EmptySelection {
            selection: selection.clone(),
        });
    }

    let seats = seat_summary(&flights, selection)?;
    debug!(matching = flights.len(), %selection, "aggregated selection");

    Ok(FlightView {
        selection: selection.clone(),
        stops: classify_stops(&flights),
        route: route_summary(&flights),
        legs: distance_duration_table(&flights),
        seats,
        flights,
    })
}
