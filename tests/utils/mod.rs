use chrono::{Duration, NaiveDate, NaiveDateTime};

use mimic_features::source::memory::{
    Admission, ChartEvent, IcuStay, LabEvent, Patient, Transfer,
};
use mimic_features::{ExtractorConfig, FeatureExtractor, InMemorySource, RecordBatch, Result};

/// Reference time every fixture offset is measured from
#[must_use]
pub fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2150, 3, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid fixture date")
}

/// Base time shifted by a number of minutes
#[must_use]
pub fn at_minutes(minutes: i64) -> NaiveDateTime {
    base_time() + Duration::minutes(minutes)
}

/// Base time shifted by a number of hours
#[must_use]
pub fn at_hours(hours: i64) -> NaiveDateTime {
    base_time() + Duration::hours(hours)
}

/// Builder for in-memory MIMIC tables
///
/// Stays get a default admission (emergency, white, survived) and a default
/// patient (female, anchor age 60 in 2150) unless overridden.
#[derive(Debug, Default)]
pub struct Fixture {
    source: InMemorySource,
}

impl Fixture {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// ICU stay starting `intime_hours` after the base time and lasting `length_hours`
    #[must_use]
    pub fn stay(
        mut self,
        stay_id: i64,
        hadm_id: i64,
        subject_id: i64,
        intime_hours: i64,
        length_hours: i64,
    ) -> Self {
        let intime = at_hours(intime_hours);
        self.source.icustays.push(IcuStay {
            stay_id,
            hadm_id,
            subject_id,
            intime: Some(intime),
            outtime: Some(intime + Duration::hours(length_hours)),
        });
        if !self.source.admissions.iter().any(|a| a.hadm_id == hadm_id) {
            self.source.admissions.push(Admission {
                hadm_id,
                subject_id,
                admittime: intime - Duration::hours(2),
                ethnicity: Some("WHITE".to_string()),
                admission_type: Some("EW EMER.".to_string()),
                hospital_expire_flag: Some(false),
            });
        }
        if !self.source.patients.iter().any(|p| p.subject_id == subject_id) {
            self.source.patients.push(Patient {
                subject_id,
                gender: Some("F".to_string()),
                anchor_age: 60,
                anchor_year: 2150,
            });
        }
        self
    }

    /// Replace the patient row for `subject_id`
    #[must_use]
    pub fn patient(
        mut self,
        subject_id: i64,
        gender: &str,
        anchor_age: i32,
        anchor_year: i32,
    ) -> Self {
        self.source.patients.retain(|p| p.subject_id != subject_id);
        self.source.patients.push(Patient {
            subject_id,
            gender: Some(gender.to_string()),
            anchor_age,
            anchor_year,
        });
        self
    }

    /// Edit the admission row for `hadm_id`
    #[must_use]
    pub fn admission(mut self, hadm_id: i64, edit: impl FnOnce(&mut Admission)) -> Self {
        if let Some(admission) = self.source.admissions.iter_mut().find(|a| a.hadm_id == hadm_id) {
            edit(admission);
        }
        self
    }

    /// Chart event for a stay, `minutes` after the base time
    #[must_use]
    pub fn chart(mut self, stay_id: i64, item_id: i32, minutes: i64, value: f64) -> Self {
        let subject_id = self.subject_of_stay(stay_id);
        self.source.chartevents.push(ChartEvent {
            subject_id,
            stay_id: Some(stay_id),
            item_id,
            charttime: at_minutes(minutes),
            value: Some(value),
        });
        self
    }

    /// Lab event for an admission, `minutes` after the base time
    #[must_use]
    pub fn lab(mut self, hadm_id: i64, item_id: i32, minutes: i64, value: f64) -> Self {
        let subject_id = self
            .source
            .admissions
            .iter()
            .find(|a| a.hadm_id == hadm_id)
            .map_or(0, |a| a.subject_id);
        self.source.labevents.push(LabEvent {
            subject_id,
            hadm_id: Some(hadm_id),
            item_id,
            charttime: at_minutes(minutes),
            value: Some(value),
        });
        self
    }

    /// Care-unit transfer for an admission
    #[must_use]
    pub fn transfer(mut self, hadm_id: i64, careunit: &str) -> Self {
        self.source.transfers.push(Transfer {
            hadm_id: Some(hadm_id),
            careunit: Some(careunit.to_string()),
        });
        self
    }

    fn subject_of_stay(&self, stay_id: i64) -> i64 {
        self.source
            .icustays
            .iter()
            .find(|s| s.stay_id == stay_id)
            .map_or(0, |s| s.subject_id)
    }

    #[must_use]
    pub fn build(self) -> InMemorySource {
        self.source
    }
}

/// Run one builder against a fixture with default configuration
pub fn extract<F>(source: &mut InMemorySource, build: F) -> Result<RecordBatch>
where
    F: FnOnce(&mut FeatureExtractor<'_, InMemorySource>) -> Result<RecordBatch>,
{
    let config = ExtractorConfig::default();
    let mut extractor = FeatureExtractor::with_config(source, &config);
    build(&mut extractor)
}

/// Assert two floats agree within `1e-6`
pub fn assert_close(actual: Option<f64>, expected: f64) {
    let value = actual.unwrap_or_else(|| panic!("expected {expected}, got null"));
    assert!(
        (value - expected).abs() < 1e-6,
        "expected {expected}, got {value}"
    );
}
