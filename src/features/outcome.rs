//! Mortality outcome and study cohort selection

use std::sync::Arc;

use arrow::array::Int64Array;
use arrow::datatypes::{DataType, Field, FieldRef, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::error::Result;
use crate::params::Hours;
use crate::source::{StayOutcome, StaySpan};
use crate::units;

/// Minimum age in years, exclusive, for cohort membership
pub const MIN_COHORT_AGE: i64 = 18;

/// One output row of the mortality table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MortalityRow {
    pub stay_id: i64,
    pub hospital_expire_flag: Option<bool>,
}

impl MortalityRow {
    fn fields() -> Vec<FieldRef> {
        vec![
            Arc::new(Field::new("stay_id", DataType::Int64, false)),
            Arc::new(Field::new("hospital_expire_flag", DataType::Boolean, true)),
        ]
    }

    /// One row per stay in ascending stay order
    #[must_use]
    pub fn from_outcomes(outcomes: Vec<StayOutcome>) -> Vec<Self> {
        outcomes
            .into_iter()
            .sorted_by_key(|o| o.stay_id)
            .dedup_by(|a, b| a.stay_id == b.stay_id)
            .map(|o| Self {
                stay_id: o.stay_id,
                hospital_expire_flag: o.hospital_expire_flag,
            })
            .collect()
    }

    /// Convert rows into a record batch
    pub fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        Ok(serde_arrow::to_record_batch(&Self::fields(), &rows)?)
    }
}

/// Why a stay was left out of the cohort
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Exclusion {
    /// A later ICU stay exists for the same admission
    NotLastStay,
    /// The stay ended before the requested duration elapsed
    TooShort,
    /// Age at admission is 18 or less, or cannot be computed
    Age,
}

/// Decide cohort membership for one stay
///
/// `last_intime` is the latest ICU admission time among all stays of the
/// same hospital admission.
pub fn check_stay(
    span: &StaySpan,
    last_intime: Option<NaiveDateTime>,
    duration: Hours,
) -> std::result::Result<(), Exclusion> {
    let Some(intime) = span.intime else {
        return Err(Exclusion::NotLastStay);
    };
    if last_intime != Some(intime) {
        return Err(Exclusion::NotLastStay);
    }
    if span
        .outtime
        .is_none_or(|outtime| outtime < intime + duration.as_duration())
    {
        return Err(Exclusion::TooShort);
    }
    match units::age_at_admission(span.admittime, span.anchor_year, span.anchor_age) {
        Some(age) if age > MIN_COHORT_AGE => Ok(()),
        _ => Err(Exclusion::Age),
    }
}

/// Stays that are the last of their admission, lasted at least `duration`
/// and belong to an adult older than 18
///
/// Every stay sharing the latest intime of an admission is kept.
#[must_use]
pub fn select_cohort(
    spans: &[StaySpan],
    duration: Hours,
) -> (Vec<i64>, FxHashMap<Exclusion, usize>) {
    let mut last_intime: FxHashMap<i64, NaiveDateTime> = FxHashMap::default();
    for span in spans {
        if let Some(intime) = span.intime {
            last_intime
                .entry(span.hadm_id)
                .and_modify(|latest| *latest = (*latest).max(intime))
                .or_insert(intime);
        }
    }

    let mut excluded: FxHashMap<Exclusion, usize> = FxHashMap::default();
    let mut selected = Vec::new();
    for span in spans {
        match check_stay(span, last_intime.get(&span.hadm_id).copied(), duration) {
            Ok(()) => selected.push(span.stay_id),
            Err(reason) => *excluded.entry(reason).or_default() += 1,
        }
    }
    selected.sort_unstable();
    selected.dedup();
    (selected, excluded)
}

/// Single-column `stay_id` table
pub fn cohort_batch(stay_ids: Vec<i64>) -> Result<RecordBatch> {
    let schema = Schema::new(vec![Field::new("stay_id", DataType::Int64, false)]);
    Ok(RecordBatch::try_new(
        Arc::new(schema),
        vec![Arc::new(Int64Array::from(stay_ids))],
    )?)
}
