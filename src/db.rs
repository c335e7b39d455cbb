use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::{info, warn};

use crate::cache::QueryCache;
use crate::config::{Config, DataSource, ScheduleQuery};
use crate::enrich;
use crate::error::ExplorerError;
use crate::models::{FlightDataset, InflightService, RawFlightRow};

const INFLIGHT_SQL: &str = "SELECT row_to_json(t)::text AS row FROM inflight_svc_des t";
const SCHEDULE_FILE: &str = "final_schedule_table.csv";
const INFLIGHT_FILE: &str = "inflight_svc_des.csv";

pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, ExplorerError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(|err| ExplorerError::unavailable("postgres", err))
}

pub async fn fetch_schedule(
    pool: &PgPool,
    query: &ScheduleQuery,
) -> Result<Vec<RawFlightRow>, ExplorerError> {
    let unavailable = |err: sqlx::Error| ExplorerError::unavailable("final_schedule_table", err);

    let records = sqlx::query(ScheduleQuery::SQL)
        .bind(&query.country)
        .bind(query.departure_ports.as_slice())
        .bind(&query.service)
        .fetch_all(pool)
        .await
        .map_err(unavailable)?;

    let mut rows = Vec::with_capacity(records.len());

    for row in records {
        let stops: i64 = row.try_get("total_stops_in_route").map_err(unavailable)?;
        let total_stops_in_route = u32::try_from(stops).map_err(|_| {
            ExplorerError::unavailable(
                "final_schedule_table",
                format!("total_stops_in_route out of range: {stops}"),
            )
        })?;

        rows.push(RawFlightRow {
            airline_code: code(&row, "airline_code").map_err(unavailable)?,
            airline_name: row.try_get("airline_name").map_err(unavailable)?,
            flight_date: row.try_get("flight_date").map_err(unavailable)?,
            departure_port_code: code(&row, "departure_port_code").map_err(unavailable)?,
            departure_airport_name: row.try_get("departure_airport_name").map_err(unavailable)?,
            arrival_port_code: code(&row, "arrival_port_code").map_err(unavailable)?,
            arrival_airport_name: row.try_get("arrival_airport_name").map_err(unavailable)?,
            total_stops_in_route,
            route_path: row.try_get("route_path").map_err(unavailable)?,
            distance: row.try_get("distance").map_err(unavailable)?,
            elapsed_time: row.try_get("elapsed_time").map_err(unavailable)?,
            flight_number: row.try_get("flight_number").map_err(unavailable)?,
            first_class_seats: row.try_get("first_class_seats").map_err(unavailable)?,
            business_class_seats: row.try_get("business_class_seats").map_err(unavailable)?,
            premium_economy_class_seats: row
                .try_get("premium_economy_class_seats")
                .map_err(unavailable)?,
            economy_plus_class_seats: row
                .try_get("economy_plus_class_seats")
                .map_err(unavailable)?,
            economy_class_seats: row.try_get("economy_class_seats").map_err(unavailable)?,
        });
    }

    Ok(rows)
}

/// Null codes decode as empty strings; enrichment drops those rows.
fn code(row: &sqlx::postgres::PgRow, column: &str) -> Result<String, sqlx::Error> {
    let value: Option<String> = row.try_get(column)?;
    Ok(value.unwrap_or_default())
}

pub async fn fetch_inflight_services(pool: &PgPool) -> Result<Vec<InflightService>, ExplorerError> {
    let unavailable = |err: String| ExplorerError::unavailable("inflight_svc_des", err);

    let records = sqlx::query(INFLIGHT_SQL)
        .fetch_all(pool)
        .await
        .map_err(|err| unavailable(err.to_string()))?;

    let mut services = Vec::with_capacity(records.len());
    for row in records {
        let json: String = row.try_get("row").map_err(|err| unavailable(err.to_string()))?;
        let service: InflightService =
            serde_json::from_str(&json).map_err(|err| unavailable(err.to_string()))?;
        services.push(service);
    }

    Ok(services)
}

pub fn read_schedule_csv<R: Read>(reader: R) -> Result<Vec<RawFlightRow>, ExplorerError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for result in reader.deserialize::<RawFlightRow>() {
        rows.push(result.map_err(|err| ExplorerError::unavailable(SCHEDULE_FILE, err))?);
    }

    Ok(rows)
}

/// Every column is kept as text; empty cells become null.
pub fn read_inflight_csv<R: Read>(reader: R) -> Result<Vec<InflightService>, ExplorerError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut services = Vec::new();

    for result in reader.deserialize::<BTreeMap<String, String>>() {
        let record = result.map_err(|err| ExplorerError::unavailable(INFLIGHT_FILE, err))?;
        services.push(
            record
                .into_iter()
                .map(|(column, value)| {
                    let value = if value.is_empty() {
                        serde_json::Value::Null
                    } else {
                        serde_json::Value::String(value)
                    };
                    (column, value)
                })
                .collect(),
        );
    }

    Ok(services)
}

fn open_snapshot_file(dir: &Path, name: &str) -> Result<std::fs::File, ExplorerError> {
    let path = dir.join(name);
    std::fs::File::open(&path)
        .map_err(|err| ExplorerError::unavailable(path.display().to_string(), err))
}

/// Loads and caches the two query results for one data source.
pub struct Warehouse {
    source: DataSource,
    query: ScheduleQuery,
    pool: Option<PgPool>,
    schedule: QueryCache<FlightDataset>,
    services: QueryCache<Vec<InflightService>>,
}

impl Warehouse {
    pub async fn open(config: &Config) -> Result<Self, ExplorerError> {
        let pool = match &config.source {
            DataSource::Postgres {
                url,
                max_connections,
            } => Some(connect(url, *max_connections).await?),
            DataSource::Snapshot { .. } => None,
        };
        info!(source = %config.source.name(), "opened flight data source");

        Ok(Self {
            source: config.source.clone(),
            query: config.query.clone(),
            pool,
            schedule: QueryCache::new(config.cache_ttl),
            services: QueryCache::new(config.cache_ttl),
        })
    }

    /// The enriched schedule, loaded on first use and again once the TTL runs out.
    pub async fn flights(&mut self) -> Result<Arc<FlightDataset>, ExplorerError> {
        let key = self.schedule_key();
        let source = &self.source;
        let query = &self.query;
        let pool = self.pool.as_ref();

        self.schedule
            .get_or_try_load(&key, || async move {
                let rows = match (source, pool) {
                    (DataSource::Postgres { .. }, Some(pool)) => fetch_schedule(pool, query).await?,
                    (DataSource::Snapshot { dir }, _) => {
                        let rows = read_schedule_csv(open_snapshot_file(dir, SCHEDULE_FILE)?)?;
                        rows.into_iter()
                            .filter(|row| query.admits_departure(&row.departure_port_code))
                            .collect()
                    }
                    (DataSource::Postgres { .. }, None) => {
                        return Err(ExplorerError::unavailable("postgres", "not connected"))
                    }
                };
                let dataset = enrich::enrich(rows);
                if dataset.is_empty() {
                    warn!("schedule query returned no flights");
                }
                info!(flights = dataset.len(), "fetched flight schedule");
                Ok::<_, ExplorerError>(dataset)
            })
            .await
    }

    pub async fn inflight_services(&mut self) -> Result<Arc<Vec<InflightService>>, ExplorerError> {
        let key = self.services_key();
        let source = &self.source;
        let pool = self.pool.as_ref();

        self.services
            .get_or_try_load(&key, || async move {
                match (source, pool) {
                    (DataSource::Postgres { .. }, Some(pool)) => fetch_inflight_services(pool).await,
                    (DataSource::Snapshot { dir }, _) => {
                        read_inflight_csv(open_snapshot_file(dir, INFLIGHT_FILE)?)
                    }
                    (DataSource::Postgres { .. }, None) => {
                        Err(ExplorerError::unavailable("postgres", "not connected"))
                    }
                }
            })
            .await
    }

    /// Drops cached results so the next read goes back to the source.
    pub fn refresh(&mut self) {
        let (schedule_key, services_key) = (self.schedule_key(), self.services_key());
        let schedule = self.schedule.invalidate(&schedule_key);
        let services = self.services.invalidate(&services_key);
        info!(schedule, services, "invalidated cached query results");
    }

    fn schedule_key(&self) -> String {
        format!("{} [{}]", self.query.cache_key(), self.source.name())
    }

    fn services_key(&self) -> String {
        format!("{} [{}]", INFLIGHT_SQL, self.source.name())
    }
}
