use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod aggregate;
mod cache;
mod cascade;
mod config;
mod db;
mod enrich;
mod error;
mod explore;
mod models;
mod report;

use config::{Config, DataSource, ScheduleQuery};
use db::Warehouse;
use enrich::label_code;
use error::ExplorerError;
use models::{FlightDataset, ResolvedSelection, Stage};

#[derive(Parser)]
#[command(name = "flight-schedule-explorer")]
#[command(about = "Drill into a flight schedule warehouse by airline, date and route", long_about = None)]
struct Cli {
    /// Postgres connection string for the schedule warehouse
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,
    /// Directory with final_schedule_table.csv and inflight_svc_des.csv
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,
    #[arg(long, default_value_t = 5, global = true)]
    max_connections: u32,
    /// How long loaded query results stay fresh
    #[arg(long, env = "EXPLORER_CACHE_TTL_SECS", default_value_t = 600, global = true)]
    cache_ttl_secs: u64,
    #[arg(long, default_value = "US", global = true)]
    country: String,
    #[arg(long = "departure-port", default_values_t = ["JFK".to_string(), "CLT".to_string(), "ORD".to_string()], global = true)]
    departure_ports: Vec<String>,
    #[arg(long, default_value = "Passenger", global = true)]
    service: String,
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn to_config(&self) -> anyhow::Result<Config> {
        let source = match (&self.snapshot, &self.database_url) {
            (Some(dir), _) => DataSource::Snapshot { dir: dir.clone() },
            (None, Some(url)) => DataSource::Postgres {
                url: url.clone(),
                max_connections: self.max_connections,
            },
            (None, None) => anyhow::bail!("DATABASE_URL must be set, or pass --snapshot <dir>"),
        };

        Ok(Config {
            source,
            query: ScheduleQuery {
                country: self.country.clone(),
                departure_ports: self.departure_ports.clone(),
                service: self.service.clone(),
            },
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
        })
    }
}

#[derive(Args)]
struct Route {
    /// Airline label or code
    #[arg(long)]
    airline: String,
    #[arg(long)]
    date: NaiveDate,
}

#[derive(Subcommand)]
enum Commands {
    /// List airlines
    Airlines,
    /// List flight dates
    Dates,
    /// List departure airports for an airline and date
    Departures {
        #[command(flatten)]
        route: Route,
    },
    /// List arrival airports for an airline, date and departure airport
    Arrivals {
        #[command(flatten)]
        route: Route,
        #[arg(long)]
        departure: String,
    },
    /// Show every view for a fully resolved selection
    Show {
        #[command(flatten)]
        route: Route,
        #[arg(long)]
        departure: String,
        #[arg(long)]
        arrival: String,
        /// Write the markdown report here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List inflight service descriptions
    Services,
    /// Walk the selection cascade interactively
    Explore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.to_config()?;
    debug!(query = ?config.query, "schedule filter");

    let mut warehouse = Warehouse::open(&config)
        .await
        .with_context(|| format!("failed to open {}", config.source.name()))?;

    match cli.command {
        Commands::Airlines => {
            let dataset = warehouse.flights().await?;
            print!("{}", report::render_options(Stage::Airline, &cascade::airline_options(&dataset)));
        }
        Commands::Dates => {
            let dataset = warehouse.flights().await?;
            let dates: Vec<String> = cascade::date_options(&dataset)
                .iter()
                .map(NaiveDate::to_string)
                .collect();
            print!("{}", report::render_options(Stage::Date, &dates));
        }
        Commands::Departures { route } => {
            let dataset = warehouse.flights().await?;
            let airline_code = choose_airline(&dataset, &route)?;
            let departures = cascade::departure_options(&dataset, &airline_code, route.date);
            print!("{}", report::render_options(Stage::Departure, &departures));
        }
        Commands::Arrivals { route, departure } => {
            let dataset = warehouse.flights().await?;
            let airline_code = choose_airline(&dataset, &route)?;
            let departures = cascade::departure_options(&dataset, &airline_code, route.date);
            let departure = cascade::find_option(Stage::Departure, &departures, &departure)?;
            let arrivals = cascade::arrival_options(
                &dataset,
                &airline_code,
                route.date,
                label_code(&departure),
            );
            print!("{}", report::render_options(Stage::Arrival, &arrivals));
        }
        Commands::Show {
            route,
            departure,
            arrival,
            out,
        } => {
            let dataset = warehouse.flights().await?;
            let selection = resolve_selection(&dataset, &route, &departure, &arrival)?;

            let view = match aggregate::aggregate(&dataset, &selection) {
                Ok(view) => view,
                Err(ExplorerError::EmptySelection { selection }) => {
                    info!(%selection, "selection matched no flights");
                    println!("No flight data for this selection.");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };

            let report = report::build_report(&view);
            match out {
                Some(path) => {
                    std::fs::write(&path, report)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Report written to {}.", path.display());
                }
                None => print!("{report}"),
            }
        }
        Commands::Services => {
            let services = warehouse.inflight_services().await?;
            print!("{}", report::render_services(&services));
        }
        Commands::Explore => {
            let stdin = std::io::stdin();
            explore::run(&mut warehouse, stdin.lock(), std::io::stdout()).await?;
        }
    }

    Ok(())
}

fn choose_airline(dataset: &FlightDataset, route: &Route) -> Result<String, ExplorerError> {
    let airlines = cascade::airline_options(dataset);
    let airline = cascade::find_option(Stage::Airline, &airlines, &route.airline)?;
    let dates = cascade::date_options(dataset);
    if !dates.contains(&route.date) {
        return Err(ExplorerError::InvalidSelection {
            stage: Stage::Date,
            value: route.date.to_string(),
        });
    }
    Ok(label_code(&airline).to_string())
}

/// Validates CLI values stage by stage, the same way the cascade offers them.
fn resolve_selection(
    dataset: &FlightDataset,
    route: &Route,
    departure: &str,
    arrival: &str,
) -> Result<ResolvedSelection, ExplorerError> {
    let airline_code = choose_airline(dataset, route)?;

    let departures = cascade::departure_options(dataset, &airline_code, route.date);
    let departure = cascade::find_option(Stage::Departure, &departures, departure)?;
    let dep_code = label_code(&departure).to_string();

    let arrivals = cascade::arrival_options(dataset, &airline_code, route.date, &dep_code);
    let arrival = cascade::find_option(Stage::Arrival, &arrivals, arrival)?;

    Ok(ResolvedSelection {
        airline_code,
        flight_date: route.date,
        dep_code,
        arr_code: label_code(&arrival).to_string(),
        departure_label: departure,
        arrival_label: arrival,
    })
}
