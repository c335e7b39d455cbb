use std::collections::BTreeSet;
use std::fmt::Write;

use crate::models::{FlightView, InflightService, SeatSummary, Stage};

const BAR_WIDTH: usize = 40;

pub fn build_report(view: &FlightView<'_>) -> String {
    let selection = &view.selection;
    let departure = &selection.departure_label;
    let arrival = &selection.arrival_label;
    let date = selection.flight_date;

    let mut output = String::new();

    let _ = writeln!(output, "# Flight Schedule Report");
    let _ = writeln!(
        output,
        "Airline {} on {}, {} to {}",
        selection.airline_code, date, departure, arrival
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Detailed Flight Data");
    let _ = writeln!(
        output,
        "| flight_number | airline_code | airline_name | departure_port_code | departure_airport_name \
         | arrival_port_code | arrival_airport_name | stops | route_path | distance | duration |"
    );
    let _ = writeln!(output, "|{}", "---|".repeat(11));
    for flight in &view.flights {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {} |",
            flight.flight_number,
            flight.airline_code,
            flight.airline_name.as_deref().unwrap_or(""),
            flight.departure_port_code,
            flight.departure_airport_name.as_deref().unwrap_or(""),
            flight.arrival_port_code,
            flight.arrival_airport_name.as_deref().unwrap_or(""),
            flight.total_stops_in_route,
            flight.route_path,
            flight.distance,
            flight.elapsed_time
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Stops Information");
    if view.stops.nonstop != 0 {
        let _ = writeln!(
            output,
            "You have **{} non-stop** flights from **{}** to **{}** on {}.",
            view.stops.nonstop, departure, arrival, date
        );
    }
    if view.stops.with_stops != 0 {
        let _ = writeln!(
            output,
            "You have **{}** flights with stops from **{}** to **{}** on {}.",
            view.stops.with_stops, departure, arrival, date
        );
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "The route of the airline will be: **{}**", view.route);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Distance & Duration (by flight number)");
    let _ = writeln!(output, "| flight_number | distance | duration |");
    let _ = writeln!(output, "|---|---|---|");
    for (flight_number, leg) in &view.legs {
        let _ = writeln!(
            output,
            "| {} | {} | {} |",
            flight_number, leg.distance, leg.duration
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Seats Information");
    let _ = writeln!(output, "Seats info from {} to {}", departure, arrival);
    let _ = writeln!(output, "```");
    output.push_str(&seat_chart(&view.seats));
    let _ = writeln!(output, "```");

    output
}

/// Horizontal bars, largest total first.
pub fn seat_chart(seats: &SeatSummary) -> String {
    let sorted = seats.sorted_by_value();
    let label_width = sorted
        .iter()
        .map(|(category, _)| category.column().len())
        .max()
        .unwrap_or(0);
    let max = sorted.iter().map(|(_, total)| *total).max().unwrap_or(0);

    let mut output = String::new();
    for (category, total) in sorted {
        let bar = if max > 0 {
            (total.max(0) as usize * BAR_WIDTH) / max as usize
        } else {
            0
        };
        let _ = writeln!(
            output,
            "{:<width$} | {} {}",
            category.column(),
            "#".repeat(bar),
            total,
            width = label_width
        );
    }
    output
}

pub fn render_options(stage: Stage, options: &[String]) -> String {
    let mut output = String::new();

    if options.is_empty() {
        let _ = writeln!(output, "No {stage} options for this selection.");
        return output;
    }

    let _ = writeln!(output, "Select the {stage}:");
    for (index, option) in options.iter().enumerate() {
        let _ = writeln!(output, "{:>3}. {}", index + 1, option);
    }
    output
}

/// A markdown table over the union of columns seen in the rows.
pub fn render_services(services: &[InflightService]) -> String {
    let mut output = String::new();

    if services.is_empty() {
        let _ = writeln!(output, "No inflight service descriptions found.");
        return output;
    }

    let columns: BTreeSet<&str> = services
        .iter()
        .flat_map(|service| service.keys().map(String::as_str))
        .collect();

    let _ = writeln!(
        output,
        "| {} |",
        columns.iter().copied().collect::<Vec<_>>().join(" | ")
    );
    let _ = writeln!(output, "|{}", "---|".repeat(columns.len()));
    for service in services {
        let cells: Vec<String> = columns
            .iter()
            .map(|column| match service.get(*column) {
                Some(serde_json::Value::String(text)) => text.clone(),
                Some(serde_json::Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            })
            .collect();
        let _ = writeln!(output, "| {} |", cells.join(" | "));
    }
    output
}
