use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::enrich::label_code;
use crate::error::ExplorerError;
use crate::models::{FlightDataset, ResolvedSelection, SelectionState, Stage};

pub fn airline_options(dataset: &FlightDataset) -> Vec<String> {
    dataset
        .records()
        .iter()
        .map(|r| r.airline_label.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Dates across the whole dataset; the airline choice does not narrow them.
pub fn date_options(dataset: &FlightDataset) -> Vec<NaiveDate> {
    dataset
        .records()
        .iter()
        .map(|r| r.flight_date)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn departure_options(
    dataset: &FlightDataset,
    airline_code: &str,
    flight_date: NaiveDate,
) -> Vec<String> {
    dataset
        .records()
        .iter()
        .filter(|r| r.airline_code == airline_code && r.flight_date == flight_date)
        .map(|r| r.departure_label.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Arrival labels reachable from the raw departure code. The departure
/// airport itself is not excluded.
pub fn arrival_options(
    dataset: &FlightDataset,
    airline_code: &str,
    flight_date: NaiveDate,
    dep_code: &str,
) -> Vec<String> {
    dataset
        .records()
        .iter()
        .filter(|r| {
            r.departure_port_code == dep_code
                && r.airline_code == airline_code
                && r.flight_date == flight_date
        })
        .map(|r| r.arrival_label.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Where a selection stands after re-running the cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeStep {
    /// `stage` needs a choice from `options`. `state` keeps only the still
    /// valid earlier choices; `stale` is set when a previous choice for
    /// `stage` dropped out of the options.
    Choose {
        stage: Stage,
        options: Vec<String>,
        state: SelectionState,
        stale: bool,
    },
    Resolved(ResolvedSelection),
}

/// Recomputes every stage from scratch for the given choices.
pub fn resolve(dataset: &FlightDataset, state: &SelectionState) -> CascadeStep {
    let state = state.clone();

    let airlines = airline_options(dataset);
    let airline = match checked(&state.airline, &airlines) {
        Ok(value) => value,
        Err(stale) => return choose(Stage::Airline, airlines, state, stale),
    };
    let airline_code = label_code(&airline).to_string();

    let dates = date_options(dataset);
    let flight_date = match checked(&state.flight_date, &dates) {
        Ok(value) => value,
        Err(stale) => {
            let options = dates.iter().map(NaiveDate::to_string).collect();
            return choose(Stage::Date, options, state, stale);
        }
    };

    let departures = departure_options(dataset, &airline_code, flight_date);
    let departure = match checked(&state.departure, &departures) {
        Ok(value) => value,
        Err(stale) => return choose(Stage::Departure, departures, state, stale),
    };
    let dep_code = label_code(&departure).to_string();

    let arrivals = arrival_options(dataset, &airline_code, flight_date, &dep_code);
    let arrival = match checked(&state.arrival, &arrivals) {
        Ok(value) => value,
        Err(stale) => return choose(Stage::Arrival, arrivals, state, stale),
    };

    CascadeStep::Resolved(ResolvedSelection {
        airline_code,
        flight_date,
        dep_code,
        arr_code: label_code(&arrival).to_string(),
        departure_label: departure,
        arrival_label: arrival,
    })
}

/// Matches user input against a stage's options, by full label or by code.
pub fn find_option(stage: Stage, options: &[String], input: &str) -> Result<String, ExplorerError> {
    options
        .iter()
        .find(|option| option.as_str() == input)
        .or_else(|| options.iter().find(|option| label_code(option) == input))
        .cloned()
        .ok_or_else(|| ExplorerError::InvalidSelection {
            stage,
            value: input.to_string(),
        })
}

fn checked<T: PartialEq + Clone>(chosen: &Option<T>, options: &[T]) -> Result<T, bool> {
    match chosen {
        Some(value) if options.contains(value) => Ok(value.clone()),
        Some(_) => Err(true),
        None => Err(false),
    }
}

fn choose(stage: Stage, options: Vec<String>, mut state: SelectionState, stale: bool) -> CascadeStep {
    state.reopen(stage);
    CascadeStep::Choose {
        stage,
        options,
        state,
        stale,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::enrich::{enrich, tests::raw_row};

    pub(crate) fn sample_dataset() -> FlightDataset {
        let day_two = NaiveDate::from_ymd_opt(2022, 4, 2).unwrap();

        let mut rows = vec![
            raw_row(("AA", Some("American")), "JFK", "ORD"),
            raw_row(("AA", Some("American")), "JFK", "LAX"),
            raw_row(("AA", Some("American")), "ORD", "LAX"),
            raw_row(("B6", None), "JFK", "BOS"),
            raw_row(("AA", Some("American")), "CLT", "JFK"),
        ];
        rows[0].departure_airport_name = Some("Kennedy".to_string());
        rows[1].departure_airport_name = Some("Kennedy".to_string());
        rows[3].departure_airport_name = Some("Kennedy".to_string());
        rows[4].flight_date = day_two;
        enrich(rows)
    }

    fn april(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2022, 4, day).unwrap()
    }

    #[test]
    fn airline_options_are_distinct_and_sorted() {
        let dataset = sample_dataset();
        assert_eq!(airline_options(&dataset), vec!["AA-American", "B6"]);
    }

    #[test]
    fn date_options_ignore_airline() {
        let dataset = sample_dataset();
        assert_eq!(date_options(&dataset), vec![april(1), april(2)]);
    }

    #[test]
    fn departure_options_are_backed_by_matching_records() {
        let dataset = sample_dataset();
        let options = departure_options(&dataset, "AA", april(1));
        assert_eq!(options, vec!["JFK-Kennedy", "ORD"]);

        for option in &options {
            assert!(dataset.records().iter().any(|r| {
                r.airline_code == "AA" && r.flight_date == april(1) && &r.departure_label == option
            }));
        }
    }

    #[test]
    fn arrival_options_filter_on_raw_departure_code() {
        let dataset = sample_dataset();
        let options = arrival_options(&dataset, "AA", april(1), "JFK");
        assert_eq!(options, vec!["LAX", "ORD"]);
    }

    #[test]
    fn arrival_options_keep_the_departure_airport() {
        let mut rows = vec![
            raw_row(("AA", None), "JFK", "ORD"),
            raw_row(("AA", None), "JFK", "JFK"),
        ];
        rows[1].route_path = "JFK-BOS-JFK".to_string();
        let dataset = enrich(rows);

        let options = arrival_options(&dataset, "AA", april(1), "JFK");
        assert_eq!(options, vec!["JFK", "ORD"]);
    }

    #[test]
    fn empty_step_propagates() {
        let dataset = sample_dataset();
        let departures = departure_options(&dataset, "B6", april(2));
        assert!(departures.is_empty());
        assert!(arrival_options(&dataset, "B6", april(2), "").is_empty());

        let empty = FlightDataset::default();
        let step = resolve(&empty, &SelectionState::default());
        assert!(matches!(
            step,
            CascadeStep::Choose { stage: Stage::Airline, ref options, .. } if options.is_empty()
        ));
    }

    #[test]
    fn resolve_walks_stages_in_order() {
        let dataset = sample_dataset();
        let mut state = SelectionState::default();

        let CascadeStep::Choose { stage, .. } = resolve(&dataset, &state) else {
            panic!("expected airline stage");
        };
        assert_eq!(stage, Stage::Airline);

        state.airline = Some("AA-American".to_string());
        state.flight_date = Some(april(1));
        state.departure = Some("JFK-Kennedy".to_string());
        let CascadeStep::Choose { stage, options, .. } = resolve(&dataset, &state) else {
            panic!("expected arrival stage");
        };
        assert_eq!(stage, Stage::Arrival);
        assert_eq!(options, vec!["LAX", "ORD"]);

        state.arrival = Some("ORD".to_string());
        let CascadeStep::Resolved(selection) = resolve(&dataset, &state) else {
            panic!("expected a resolved selection");
        };
        assert_eq!(selection.airline_code, "AA");
        assert_eq!(selection.dep_code, "JFK");
        assert_eq!(selection.arr_code, "ORD");
    }

    #[test]
    fn stale_choice_invalidates_later_stages() {
        let dataset = sample_dataset();
        let state = SelectionState {
            airline: Some("B6".to_string()),
            flight_date: Some(april(1)),
            departure: Some("ORD".to_string()),
            arrival: Some("LAX".to_string()),
        };

        let CascadeStep::Choose { stage, state, stale, .. } = resolve(&dataset, &state) else {
            panic!("expected departure stage");
        };
        assert_eq!(stage, Stage::Departure);
        assert!(stale);
        assert_eq!(state.departure, None);
        assert_eq!(state.arrival, None);
        assert_eq!(state.airline.as_deref(), Some("B6"));
    }

    #[test]
    fn find_option_accepts_label_or_code() {
        let options = vec!["AA-American".to_string(), "B6".to_string()];
        assert_eq!(find_option(Stage::Airline, &options, "AA").unwrap(), "AA-American");
        assert_eq!(find_option(Stage::Airline, &options, "B6").unwrap(), "B6");
        assert!(matches!(
            find_option(Stage::Airline, &options, "UA"),
            Err(ExplorerError::InvalidSelection { stage: Stage::Airline, .. })
        ));
    }
}
