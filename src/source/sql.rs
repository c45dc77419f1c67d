//! SQL text for the Postgres source
//!
//! Every value that varies between calls (item codes, window hours) is a
//! bound parameter. The only text spliced into a statement is a
//! [`SqlIdentifier`], which has already been checked and is always quoted.

use std::fmt;

use sqlx::{Postgres, QueryBuilder};

use crate::catalog::{ADMIT_WEIGHT_ITEM, HEIGHT_INCHES_ITEM};
use crate::error::{ExtractError, Result};
use crate::source::{EventTable, ObservationRequest};

/// A validated SQL identifier (schema or column name)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlIdentifier(String);

impl SqlIdentifier {
    /// Accept `[A-Za-z_][A-Za-z0-9_]*`
    pub fn parse(name: &str) -> Result<Self> {
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ExtractError::invalid_parameter(format!(
                "'{name}' is not a valid SQL identifier"
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// Double-quoted form for splicing into statements
    #[must_use]
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for SqlIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoted())
    }
}

/// Builds the statements issued by [`crate::source::PgSource`]
#[derive(Debug, Clone)]
pub struct StatementBuilder {
    schema: SqlIdentifier,
    ethnicity_column: SqlIdentifier,
}

impl StatementBuilder {
    /// Statements reading from `schema`
    #[must_use]
    pub fn new(schema: SqlIdentifier, ethnicity_column: SqlIdentifier) -> Self {
        Self {
            schema,
            ethnicity_column,
        }
    }

    fn table(&self, name: &str) -> String {
        format!("{}.{name}", self.schema.quoted())
    }

    /// Per-stay demographics with height, weight and care-unit arrays
    #[must_use]
    pub fn stay_profiles(&self) -> QueryBuilder<'static, Postgres> {
        let chartevents = self.table("chartevents");
        let mut qb = QueryBuilder::new(
            "SELECT ie.subject_id::bigint AS subject_id, ie.hadm_id::bigint AS hadm_id, \
             ie.stay_id::bigint AS stay_id, pat.gender::text AS gender, \
             pat.anchor_age::int AS anchor_age, pat.anchor_year::int AS anchor_year, \
             adm.admittime AS admittime, adm.",
        );
        qb.push(self.ethnicity_column.quoted());
        qb.push("::text AS ethnicity, adm.admission_type::text AS admission_type, ");

        qb.push("ARRAY(SELECT c.valuenum::float8 FROM ");
        qb.push(&chartevents);
        qb.push(" c WHERE c.stay_id = ie.stay_id AND c.itemid = ");
        qb.push_bind(HEIGHT_INCHES_ITEM);
        qb.push(" AND c.valuenum IS NOT NULL AND c.valuenum <> 0 ");
        qb.push("ORDER BY c.charttime) AS height_inches, ");

        qb.push("ARRAY(SELECT c.valuenum::float8 FROM ");
        qb.push(&chartevents);
        qb.push(" c WHERE c.stay_id = ie.stay_id AND c.itemid = ");
        qb.push_bind(ADMIT_WEIGHT_ITEM);
        qb.push(" AND c.valuenum > 0 ORDER BY c.charttime) AS admit_weights, ");

        qb.push("ARRAY(SELECT t.careunit::text FROM ");
        qb.push(self.table("transfers"));
        qb.push(" t WHERE t.hadm_id = ie.hadm_id AND t.careunit IS NOT NULL) AS careunits ");

        qb.push("FROM ");
        qb.push(self.table("icustays"));
        qb.push(" ie LEFT JOIN ");
        qb.push(self.table("admissions"));
        qb.push(" adm ON ie.hadm_id = adm.hadm_id LEFT JOIN ");
        qb.push(self.table("patients"));
        qb.push(" pat ON ie.subject_id = pat.subject_id ORDER BY ie.stay_id");
        qb
    }

    /// Every stay left-joined to windowed events of the requested items
    ///
    /// Rows are returned raw and ranked by the caller, so the whole window is
    /// held in memory. On a full MIMIC-IV load this runs to tens of millions
    /// of chartevents rows; restrict the window or move the ranking into SQL
    /// (`DISTINCT ON`) if that becomes a problem.
    #[must_use]
    pub fn observations(&self, request: &ObservationRequest) -> QueryBuilder<'static, Postgres> {
        let join_key = match request.table {
            EventTable::LabEvents => "ev.hadm_id = icu.hadm_id",
            EventTable::ChartEvents => "ev.stay_id = icu.stay_id",
        };

        let mut qb = QueryBuilder::new(
            "SELECT icu.stay_id::bigint AS stay_id, ev.itemid::int AS item_id, \
             ev.charttime AS charttime, ev.valuenum::float8 AS value FROM ",
        );
        qb.push(self.table("icustays"));
        qb.push(" icu LEFT JOIN ");
        qb.push(self.table(request.table.table_name()));
        qb.push(" ev ON ");
        qb.push(join_key);
        qb.push(" AND ev.charttime >= icu.intime - make_interval(hours => ");
        qb.push_bind(request.window.lookback.as_i32());
        qb.push(") AND ev.charttime <= icu.intime + make_interval(hours => ");
        qb.push_bind(request.window.duration.as_i32());
        qb.push(") AND ev.itemid = ANY(");
        qb.push_bind(request.item_ids.clone());
        qb.push(") AND ev.valuenum IS NOT NULL ORDER BY icu.stay_id, ev.charttime");
        qb
    }

    /// Hospital expiry flag per stay
    #[must_use]
    pub fn stay_outcomes(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(
            "SELECT icu.stay_id::bigint AS stay_id, \
             (adm.hospital_expire_flag = 1) AS hospital_expire_flag FROM ",
        );
        qb.push(self.table("icustays"));
        qb.push(" icu LEFT JOIN ");
        qb.push(self.table("admissions"));
        qb.push(" adm ON adm.hadm_id = icu.hadm_id ORDER BY icu.stay_id");
        qb
    }

    /// Stay timing joined to admission time and patient anchors
    #[must_use]
    pub fn stay_spans(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(
            "SELECT icu.stay_id::bigint AS stay_id, icu.hadm_id::bigint AS hadm_id, \
             icu.intime AS intime, icu.outtime AS outtime, adm.admittime AS admittime, \
             pat.anchor_age::int AS anchor_age, pat.anchor_year::int AS anchor_year FROM ",
        );
        qb.push(self.table("icustays"));
        qb.push(" icu INNER JOIN ");
        qb.push(self.table("admissions"));
        qb.push(" adm ON adm.hadm_id = icu.hadm_id INNER JOIN ");
        qb.push(self.table("patients"));
        qb.push(" pat ON pat.subject_id = adm.subject_id ORDER BY icu.stay_id");
        qb
    }
}
