use std::path::PathBuf;
use std::time::Duration;

/// Where schedule data comes from.
#[derive(Debug, Clone)]
pub enum DataSource {
    Postgres {
        url: String,
        max_connections: u32,
    },
    /// A directory holding `final_schedule_table.csv` and `inflight_svc_des.csv`.
    Snapshot { dir: PathBuf },
}

impl DataSource {
    pub fn name(&self) -> String {
        match self {
            DataSource::Postgres { .. } => "postgres".to_string(),
            DataSource::Snapshot { dir } => format!("snapshot {}", dir.display()),
        }
    }
}

/// Filter applied by the schedule query. The defaults are the US passenger
/// departures from JFK, CLT and ORD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleQuery {
    pub country: String,
    pub departure_ports: Vec<String>,
    pub service: String,
}

impl Default for ScheduleQuery {
    fn default() -> Self {
        Self {
            country: "US".to_string(),
            departure_ports: vec!["JFK".to_string(), "CLT".to_string(), "ORD".to_string()],
            service: "Passenger".to_string(),
        }
    }
}

impl ScheduleQuery {
    pub const SQL: &'static str = "SELECT airline_code::text AS airline_code, \
         airline_name::text AS airline_name, \
         flight_date::date AS flight_date, \
         departure_port_code::text AS departure_port_code, \
         departure_airport_name::text AS departure_airport_name, \
         arrival_port_code::text AS arrival_port_code, \
         arrival_airport_name::text AS arrival_airport_name, \
         total_stops_in_route::bigint AS total_stops_in_route, \
         route_path::text AS route_path, \
         distance::float8 AS distance, \
         elapsed_time::float8 AS elapsed_time, \
         flight_number::text AS flight_number, \
         COALESCE(first_class_seats, 0)::float8 AS first_class_seats, \
         COALESCE(business_class_seats, 0)::float8 AS business_class_seats, \
         COALESCE(premium_economy_class_seats, 0)::float8 AS premium_economy_class_seats, \
         COALESCE(economy_plus_class_seats, 0)::float8 AS economy_plus_class_seats, \
         COALESCE(economy_class_seats, 0)::float8 AS economy_class_seats \
         FROM final_schedule_table \
         WHERE departure_country_code = $1 \
         AND arrival_country_code = $1 \
         AND departure_port_code = ANY($2) \
         AND service_desc = $3";

    /// Query text plus bound parameters.
    pub fn cache_key(&self) -> String {
        format!(
            "{} [{}; {}; {}]",
            Self::SQL,
            self.country,
            self.departure_ports.join(","),
            self.service
        )
    }

    /// Applies the same filter to snapshot rows, which carry no country or
    /// service columns. Only the departure ports can be checked.
    pub fn admits_departure(&self, port: &str) -> bool {
        self.departure_ports.iter().any(|p| p == port)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source: DataSource,
    pub query: ScheduleQuery,
    pub cache_ttl: Duration,
}
