use std::io::{BufRead, Write};

use anyhow::Context;
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::aggregate::aggregate;
use crate::cascade::{resolve, CascadeStep};
use crate::db::Warehouse;
use crate::error::ExplorerError;
use crate::models::{SelectionState, Stage};
use crate::report;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Pick(usize),
    Back,
    Refresh,
    Quit,
    Unknown,
}

fn parse_input(line: &str) -> Input {
    match line.trim() {
        "q" | "quit" => Input::Quit,
        "b" | "back" => Input::Back,
        "r" | "refresh" => Input::Refresh,
        other => match other.parse::<usize>() {
            Ok(n) if n > 0 => Input::Pick(n - 1),
            _ => Input::Unknown,
        },
    }
}

/// Records option `index` as the choice for `stage`.
fn pick(state: &mut SelectionState, stage: Stage, options: &[String], index: usize) -> bool {
    let Some(option) = options.get(index) else {
        return false;
    };

    state.reopen(stage);
    match stage {
        Stage::Airline => state.airline = Some(option.clone()),
        Stage::Date => match option.parse::<NaiveDate>() {
            Ok(date) => state.flight_date = Some(date),
            Err(_) => return false,
        },
        Stage::Departure => state.departure = Some(option.clone()),
        Stage::Arrival => state.arrival = Some(option.clone()),
    }
    true
}

fn previous(stage: Stage) -> Stage {
    match stage {
        Stage::Airline | Stage::Date => Stage::Airline,
        Stage::Departure => Stage::Date,
        Stage::Arrival => Stage::Departure,
    }
}

pub async fn run<R: BufRead, W: Write>(
    warehouse: &mut Warehouse,
    mut input: R,
    mut out: W,
) -> anyhow::Result<()> {
    let mut state = SelectionState::default();
    let mut line = String::new();

    loop {
        let dataset = warehouse.flights().await?;

        let (stage, options) = match resolve(&dataset, &state) {
            CascadeStep::Choose {
                stage,
                options,
                state: valid,
                stale,
            } => {
                if stale {
                    warn!(%stage, "previous choice is no longer available");
                }
                state = valid;
                (stage, options)
            }
            CascadeStep::Resolved(selection) => {
                match aggregate(&dataset, &selection) {
                    Ok(view) => write!(out, "{}", report::build_report(&view))?,
                    Err(ExplorerError::EmptySelection { .. }) => {
                        writeln!(out, "No flight data for this selection.")?
                    }
                    Err(err) => return Err(err.into()),
                }
                state.reopen(Stage::Arrival);
                continue;
            }
        };

        write!(out, "{}", report::render_options(stage, &options))?;
        write!(out, "[number] choose, [b]ack, [r]efresh, [q]uit > ")?;
        out.flush()?;

        line.clear();
        if input.read_line(&mut line).context("failed to read input")? == 0 {
            break;
        }

        match parse_input(&line) {
            Input::Quit => break,
            Input::Back => state.reopen(previous(stage)),
            Input::Refresh => warehouse.refresh(),
            Input::Pick(index) => {
                if !pick(&mut state, stage, &options, index) {
                    writeln!(out, "No option {} for the {stage}.", index + 1)?;
                }
            }
            Input::Unknown => writeln!(out, "Unrecognized input.")?,
        }
    }

    info!("explore session ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_one_based_numbers() {
        assert_eq!(parse_input("q\n"), Input::Quit);
        assert_eq!(parse_input(" back "), Input::Back);
        assert_eq!(parse_input("r"), Input::Refresh);
        assert_eq!(parse_input("3"), Input::Pick(2));
        assert_eq!(parse_input("0"), Input::Unknown);
        assert_eq!(parse_input("JFK"), Input::Unknown);
    }

    #[test]
    fn picking_a_stage_clears_later_choices() {
        let mut state = SelectionState {
            airline: Some("AA".to_string()),
            flight_date: NaiveDate::from_ymd_opt(2022, 4, 1),
            departure: Some("JFK".to_string()),
            arrival: Some("ORD".to_string()),
        };
        let dates = vec!["2022-04-01".to_string(), "2022-04-02".to_string()];

        assert!(pick(&mut state, Stage::Date, &dates, 1));
        assert_eq!(state.flight_date, NaiveDate::from_ymd_opt(2022, 4, 2));
        assert_eq!(state.departure, None);
        assert_eq!(state.arrival, None);
        assert_eq!(state.airline.as_deref(), Some("AA"));
    }

    #[test]
    fn out_of_range_pick_is_rejected() {
        let mut state = SelectionState::default();
        assert!(!pick(&mut state, Stage::Airline, &["AA".to_string()], 4));
        assert_eq!(state, SelectionState::default());
    }

    #[tokio::test]
    async fn session_returns_to_arrival_and_back_to_departure() {
        use crate::config::{Config, DataSource, ScheduleQuery};
        use crate::db::tests::{write_snapshot, SCHEDULE};

        let dir = write_snapshot("explore", SCHEDULE);
        let config = Config {
            source: DataSource::Snapshot { dir: dir.clone() },
            query: ScheduleQuery::default(),
            cache_ttl: std::time::Duration::from_secs(60),
        };
        let mut warehouse = Warehouse::open(&config).await.unwrap();
        let mut out = Vec::new();

        run(&mut warehouse, "1\n1\n1\n1\nb\n1\n1\nq\n".as_bytes(), &mut out)
            .await
            .unwrap();
        let _ = std::fs::remove_dir_all(dir);

        let output = String::from_utf8(out).unwrap();
        assert_eq!(output.matches("# Flight Schedule Report").count(), 2);
        assert!(output.contains("The route of the airline will be: **JFK-LAX**"));

        let first_report = output.find("# Flight Schedule Report").unwrap();
        let prompts: Vec<&str> = output[first_report..]
            .lines()
            .filter(|line| line.starts_with("Select the"))
            .collect();
        assert_eq!(
            prompts[..3],
            [
                "Select the arrival airport:",
                "Select the departure airport:",
                "Select the arrival airport:",
            ]
        );
    }

    #[test]
    fn back_reopens_the_previous_stage() {
        assert_eq!(previous(Stage::Arrival), Stage::Departure);
        assert_eq!(previous(Stage::Airline), Stage::Airline);
    }
}
