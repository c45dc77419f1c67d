//! Clinical event sources
//!
//! A [`ClinicalSource`] answers the four read queries the feature builders
//! need. Each method issues exactly one query and blocks until the whole
//! result set is available. The handle is owned by the caller; builders only
//! borrow it for the duration of a call.

pub mod memory;
pub mod postgres;
pub mod sql;

use chrono::NaiveDateTime;

use crate::error::Result;
use crate::params::ObservationWindow;

pub use memory::InMemorySource;
pub use postgres::PgSource;

/// Event table an observation request reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTable {
    /// `labevents`, matched to stays through the hospital admission
    LabEvents,
    /// `chartevents`, matched to stays directly
    ChartEvents,
}

impl EventTable {
    /// Table name in the MIMIC-IV schema
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::LabEvents => "labevents",
            Self::ChartEvents => "chartevents",
        }
    }
}

/// Windowed event request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservationRequest {
    /// Table to read
    pub table: EventTable,
    /// Eligible time range relative to ICU admission
    pub window: ObservationWindow,
    /// Item codes to keep
    pub item_ids: Vec<i32>,
}

/// Per-stay demographics and the raw inputs of the static features
#[derive(Debug, Clone, PartialEq, Default, sqlx::FromRow)]
pub struct StayProfile {
    pub subject_id: i64,
    pub hadm_id: i64,
    pub stay_id: i64,
    pub gender: Option<String>,
    pub anchor_age: Option<i32>,
    pub anchor_year: Option<i32>,
    pub admittime: Option<NaiveDateTime>,
    pub ethnicity: Option<String>,
    pub admission_type: Option<String>,
    /// Non-null, non-zero height readings in inches, oldest first
    pub height_inches: Vec<f64>,
    /// Positive admission weight readings in kilograms, oldest first
    pub admit_weights: Vec<f64>,
    /// Care units visited during the hospital admission
    pub careunits: Vec<String>,
}

/// One row of a stay-to-event left join
///
/// A stay without any matching event appears once with every event field
/// set to `None`.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct StayObservation {
    pub stay_id: i64,
    pub item_id: Option<i32>,
    pub charttime: Option<NaiveDateTime>,
    pub value: Option<f64>,
}

impl StayObservation {
    /// Row for a stay with no matching events
    #[must_use]
    pub const fn unmatched(stay_id: i64) -> Self {
        Self {
            stay_id,
            item_id: None,
            charttime: None,
            value: None,
        }
    }

    /// The event carried by this row, if complete
    #[must_use]
    pub fn event(&self) -> Option<(i32, NaiveDateTime, f64)> {
        Some((self.item_id?, self.charttime?, self.value?))
    }
}

/// Hospital outcome of the admission a stay belongs to
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StayOutcome {
    pub stay_id: i64,
    pub hospital_expire_flag: Option<bool>,
}

/// Timing and anchor data used by the cohort filter
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StaySpan {
    pub stay_id: i64,
    pub hadm_id: i64,
    pub intime: Option<NaiveDateTime>,
    pub outtime: Option<NaiveDateTime>,
    pub admittime: NaiveDateTime,
    pub anchor_age: i32,
    pub anchor_year: i32,
}

/// Read access to a MIMIC-IV style clinical database
pub trait ClinicalSource {
    /// One row per ICU stay with demographics, height/weight readings and care units
    fn stay_profiles(&mut self) -> Result<Vec<StayProfile>>;

    /// Every ICU stay left-joined to the requested events inside the window
    fn observations(&mut self, request: &ObservationRequest) -> Result<Vec<StayObservation>>;

    /// One row per ICU stay with the hospital expiry flag
    fn stay_outcomes(&mut self) -> Result<Vec<StayOutcome>>;

    /// ICU stays with admission timing and patient anchors
    fn stay_spans(&mut self) -> Result<Vec<StaySpan>>;
}

impl<S: ClinicalSource + ?Sized> ClinicalSource for &mut S {
    fn stay_profiles(&mut self) -> Result<Vec<StayProfile>> {
        (**self).stay_profiles()
    }

    fn observations(&mut self, request: &ObservationRequest) -> Result<Vec<StayObservation>> {
        (**self).observations(request)
    }

    fn stay_outcomes(&mut self) -> Result<Vec<StayOutcome>> {
        (**self).stay_outcomes()
    }

    fn stay_spans(&mut self) -> Result<Vec<StaySpan>> {
        (**self).stay_spans()
    }
}
