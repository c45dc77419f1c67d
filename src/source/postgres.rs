//! Postgres-backed clinical source
//!
//! Holds one connection and a current-thread runtime; every call blocks on
//! its query until the complete result set is returned.

use std::str::FromStr;
use std::time::{Duration, Instant};

use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{ConnectOptions, Connection, FromRow, PgConnection, Postgres, QueryBuilder};
use tokio::runtime::{Builder, Runtime};

use crate::config::DatabaseConfig;
use crate::error::{ExtractError, Result};
use crate::source::sql::{SqlIdentifier, StatementBuilder};
use crate::source::{
    ClinicalSource, ObservationRequest, StayObservation, StayOutcome, StayProfile, StaySpan,
};

/// A single read-only connection to a MIMIC-IV Postgres database
///
/// The caller owns the handle and decides when it is released with
/// [`PgSource::close`]; dropping it also closes the connection.
pub struct PgSource {
    // Dropped before the runtime that drives it
    conn: PgConnection,
    runtime: Runtime,
    statements: StatementBuilder,
}

impl PgSource {
    /// Open a connection described by `config`
    pub fn connect(config: &DatabaseConfig) -> Result<Self> {
        // Identifiers are checked before anything touches the network
        let schema = SqlIdentifier::parse(&config.schema)?;
        let ethnicity_column = SqlIdentifier::parse(&config.ethnicity_column)?;

        let options = PgConnectOptions::from_str(&config.url)
            .map_err(ExtractError::Connection)?
            .log_statements(log::LevelFilter::Debug);

        let runtime = Builder::new_current_thread().enable_all().build()?;
        let timeout = Duration::from_secs(config.connect_timeout_secs);

        log::info!("Connecting to database (schema {schema})");
        let start = Instant::now();
        let conn = runtime
            .block_on(async { tokio::time::timeout(timeout, options.connect()).await })
            .map_err(|_| {
                ExtractError::Connection(sqlx::Error::Io(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("no connection after {timeout:?}"),
                )))
            })?
            .map_err(ExtractError::Connection)?;
        log::info!("Connected in {:?}", start.elapsed());

        Ok(Self {
            conn,
            runtime,
            statements: StatementBuilder::new(schema, ethnicity_column),
        })
    }

    /// Release the connection
    pub fn close(self) -> Result<()> {
        let Self { conn, runtime, .. } = self;
        runtime
            .block_on(conn.close())
            .map_err(ExtractError::Connection)
    }

    /// Run a statement and collect every row
    fn fetch<T>(
        &mut self,
        operation: &'static str,
        mut builder: QueryBuilder<'static, Postgres>,
    ) -> Result<Vec<T>>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        log::debug!("{operation}: {}", builder.sql());
        let start = Instant::now();
        let conn = &mut self.conn;
        let rows = self
            .runtime
            .block_on(async { builder.build_query_as::<T>().fetch_all(conn).await })
            .map_err(|e| ExtractError::query(operation, e))?;
        log::debug!("{operation}: {} rows in {:?}", rows.len(), start.elapsed());
        Ok(rows)
    }
}

impl ClinicalSource for PgSource {
    fn stay_profiles(&mut self) -> Result<Vec<StayProfile>> {
        let statement = self.statements.stay_profiles();
        self.fetch("stay_profiles", statement)
    }

    fn observations(&mut self, request: &ObservationRequest) -> Result<Vec<StayObservation>> {
        let statement = self.statements.observations(request);
        self.fetch("observations", statement)
    }

    fn stay_outcomes(&mut self) -> Result<Vec<StayOutcome>> {
        let statement = self.statements.stay_outcomes();
        self.fetch("stay_outcomes", statement)
    }

    fn stay_spans(&mut self) -> Result<Vec<StaySpan>> {
        let statement = self.statements.stay_spans();
        self.fetch("stay_spans", statement)
    }
}
