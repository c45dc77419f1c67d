//! Static per-stay features: demographics, anthropometrics and service flags

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, FieldRef};
use arrow::record_batch::RecordBatch;
use serde::Serialize;

use crate::error::Result;
use crate::source::StayProfile;
use crate::units::{self, EthnicityFlags, ServiceFlags};

/// One output row of the static feature table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticFeatureRow {
    pub subject_id: i64,
    pub hadm_id: i64,
    pub stay_id: i64,
    pub is_male: bool,
    pub age: Option<i64>,
    pub race_white: bool,
    pub race_black: bool,
    pub race_hispanic: bool,
    pub race_asian: bool,
    pub race_other: bool,
    pub emergency_admission: bool,
    pub bmi: Option<f64>,
    /// Most recent height in cm, null when that reading is out of range
    pub height: Option<f64>,
    /// Earliest recorded admission weight in kg
    pub weight: Option<f64>,
    pub service_any_card_surg: bool,
    pub service_any_noncard_surg: bool,
    pub service_trauma: bool,
}

impl StaticFeatureRow {
    /// Derive the features of one stay
    #[must_use]
    pub fn from_profile(profile: &StayProfile) -> Self {
        let height = latest_valid_height(profile);
        let weight = profile.admit_weights.first().copied();
        let age = match (profile.admittime, profile.anchor_year, profile.anchor_age) {
            (Some(admittime), Some(year), Some(anchor_age)) => {
                units::age_at_admission(admittime, year, anchor_age)
            }
            _ => None,
        };
        let ethnicity = EthnicityFlags::from_text(profile.ethnicity.as_deref());
        let services = ServiceFlags::from_careunits(&profile.careunits);

        Self {
            subject_id: profile.subject_id,
            hadm_id: profile.hadm_id,
            stay_id: profile.stay_id,
            is_male: profile.gender.as_deref() == Some("M"),
            age,
            race_white: ethnicity.white,
            race_black: ethnicity.black,
            race_hispanic: ethnicity.hispanic,
            race_asian: ethnicity.asian,
            race_other: ethnicity.other,
            emergency_admission: profile
                .admission_type
                .as_deref()
                .is_some_and(|t| units::contains_ignore_case(t, "emer")),
            bmi: units::bmi(weight, height),
            height,
            weight,
            service_any_card_surg: services.cardiac_surgery,
            service_any_noncard_surg: services.noncardiac_surgery,
            service_trauma: services.trauma,
        }
    }

    /// Arrow fields of the static table, in column order
    #[must_use]
    pub fn fields() -> Vec<FieldRef> {
        let flag = |name: &str| Arc::new(Field::new(name, DataType::Boolean, false));
        let measure = |name: &str| Arc::new(Field::new(name, DataType::Float64, true));
        vec![
            Arc::new(Field::new("subject_id", DataType::Int64, false)),
            Arc::new(Field::new("hadm_id", DataType::Int64, false)),
            Arc::new(Field::new("stay_id", DataType::Int64, false)),
            flag("is_male"),
            Arc::new(Field::new("age", DataType::Int64, true)),
            flag("race_white"),
            flag("race_black"),
            flag("race_hispanic"),
            flag("race_asian"),
            flag("race_other"),
            flag("emergency_admission"),
            measure("bmi"),
            measure("height"),
            measure("weight"),
            flag("service_any_card_surg"),
            flag("service_any_noncard_surg"),
            flag("service_trauma"),
        ]
    }

    /// Convert rows into a record batch
    pub fn to_record_batch(rows: &[Self]) -> Result<RecordBatch> {
        Ok(serde_arrow::to_record_batch(&Self::fields(), &rows)?)
    }
}

/// Only the most recent reading is considered; an invalid one is not replaced by an older one
fn latest_valid_height(profile: &StayProfile) -> Option<f64> {
    let inches = *profile.height_inches.last()?;
    units::valid_height_cm(inches, profile.anchor_age?)
}

/// Whether the stay had a height reading that the validity rule discarded
#[must_use]
pub fn height_discarded(profile: &StayProfile) -> bool {
    !profile.height_inches.is_empty() && latest_valid_height(profile).is_none()
}
