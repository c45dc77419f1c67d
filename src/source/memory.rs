//! In-memory clinical source
//!
//! Holds the six MIMIC-IV tables the extractor reads as plain vectors and
//! answers the [`ClinicalSource`] contract with the same join and ordering
//! rules as the Postgres statements. Useful for fixtures and small
//! pipelines that do not need a database.

use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::catalog::{ADMIT_WEIGHT_ITEM, HEIGHT_INCHES_ITEM};
use crate::error::{ExtractError, Result};
use crate::source::{
    ClinicalSource, EventTable, ObservationRequest, StayObservation, StayOutcome, StayProfile,
    StaySpan,
};

/// Row of `icustays`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IcuStay {
    pub stay_id: i64,
    pub hadm_id: i64,
    pub subject_id: i64,
    pub intime: Option<NaiveDateTime>,
    pub outtime: Option<NaiveDateTime>,
}

/// Row of `admissions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Admission {
    pub hadm_id: i64,
    pub subject_id: i64,
    pub admittime: NaiveDateTime,
    #[serde(default)]
    pub ethnicity: Option<String>,
    #[serde(default)]
    pub admission_type: Option<String>,
    #[serde(default)]
    pub hospital_expire_flag: Option<bool>,
}

/// Row of `patients`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub subject_id: i64,
    pub gender: Option<String>,
    pub anchor_age: i32,
    pub anchor_year: i32,
}

/// Row of `chartevents`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartEvent {
    pub subject_id: i64,
    pub stay_id: Option<i64>,
    pub item_id: i32,
    pub charttime: NaiveDateTime,
    pub value: Option<f64>,
}

/// Row of `labevents`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabEvent {
    pub subject_id: i64,
    pub hadm_id: Option<i64>,
    pub item_id: i32,
    pub charttime: NaiveDateTime,
    pub value: Option<f64>,
}

/// Row of `transfers`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub hadm_id: Option<i64>,
    pub careunit: Option<String>,
}

/// Clinical tables held in memory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemorySource {
    pub icustays: Vec<IcuStay>,
    pub admissions: Vec<Admission>,
    pub patients: Vec<Patient>,
    pub chartevents: Vec<ChartEvent>,
    pub labevents: Vec<LabEvent>,
    pub transfers: Vec<Transfer>,
}

impl InMemorySource {
    /// Create an empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load tables from a JSON document with one array per table
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Load tables from a JSON file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            ExtractError::Config(format!("Failed to open fixture {}: {e}", path.display()))
        })?;
        Self::from_json_reader(std::io::BufReader::new(file))
    }

    fn admissions_by_id(&self) -> FxHashMap<i64, &Admission> {
        self.admissions.iter().map(|a| (a.hadm_id, a)).collect()
    }

    fn patients_by_id(&self) -> FxHashMap<i64, &Patient> {
        self.patients.iter().map(|p| (p.subject_id, p)).collect()
    }

    /// Stays in ascending id order; ties keep insertion order
    fn sorted_stays(&self) -> Vec<&IcuStay> {
        self.icustays.iter().sorted_by_key(|s| s.stay_id).collect()
    }

    /// Chart values of one item for one stay, oldest first
    fn chart_values(&self, stay_id: i64, item_id: i32, keep: impl Fn(f64) -> bool) -> Vec<f64> {
        self.chartevents
            .iter()
            .filter(|e| e.stay_id == Some(stay_id) && e.item_id == item_id)
            .filter_map(|e| e.value.filter(|v| keep(*v)).map(|v| (e.charttime, v)))
            .sorted_by_key(|(time, _)| *time)
            .map(|(_, v)| v)
            .collect()
    }

    /// Events eligible for a request, as `(stay key, item, time, value)`
    fn event_rows(&self, table: EventTable) -> Vec<(Option<i64>, i32, NaiveDateTime, Option<f64>)> {
        match table {
            EventTable::LabEvents => self
                .labevents
                .iter()
                .map(|e| (e.hadm_id, e.item_id, e.charttime, e.value))
                .collect(),
            EventTable::ChartEvents => self
                .chartevents
                .iter()
                .map(|e| (e.stay_id, e.item_id, e.charttime, e.value))
                .collect(),
        }
    }
}

impl ClinicalSource for InMemorySource {
    fn stay_profiles(&mut self) -> Result<Vec<StayProfile>> {
        let admissions = self.admissions_by_id();
        let patients = self.patients_by_id();

        let profiles = self
            .sorted_stays()
            .into_iter()
            .map(|stay| {
                let admission = admissions.get(&stay.hadm_id);
                let patient = patients.get(&stay.subject_id);
                StayProfile {
                    subject_id: stay.subject_id,
                    hadm_id: stay.hadm_id,
                    stay_id: stay.stay_id,
                    gender: patient.and_then(|p| p.gender.clone()),
                    anchor_age: patient.map(|p| p.anchor_age),
                    anchor_year: patient.map(|p| p.anchor_year),
                    admittime: admission.map(|a| a.admittime),
                    ethnicity: admission.and_then(|a| a.ethnicity.clone()),
                    admission_type: admission.and_then(|a| a.admission_type.clone()),
                    height_inches: self.chart_values(stay.stay_id, HEIGHT_INCHES_ITEM, |v| {
                        v != 0.0
                    }),
                    admit_weights: self.chart_values(stay.stay_id, ADMIT_WEIGHT_ITEM, |v| {
                        v > 0.0
                    }),
                    careunits: self
                        .transfers
                        .iter()
                        .filter(|t| t.hadm_id == Some(stay.hadm_id))
                        .filter_map(|t| t.careunit.clone())
                        .collect(),
                }
            })
            .collect();
        Ok(profiles)
    }

    fn observations(&mut self, request: &ObservationRequest) -> Result<Vec<StayObservation>> {
        let events = self.event_rows(request.table);
        let mut rows = Vec::new();

        for stay in self.sorted_stays() {
            let key = match request.table {
                EventTable::LabEvents => stay.hadm_id,
                EventTable::ChartEvents => stay.stay_id,
            };
            let matched = stay.intime.map_or_else(Vec::new, |intime| {
                events
                    .iter()
                    .filter(|(event_key, item_id, charttime, value)| {
                        *event_key == Some(key)
                            && value.is_some()
                            && request.item_ids.contains(item_id)
                            && request.window.contains(intime, *charttime)
                    })
                    .sorted_by_key(|(_, _, charttime, _)| *charttime)
                    .map(|(_, item_id, charttime, value)| StayObservation {
                        stay_id: stay.stay_id,
                        item_id: Some(*item_id),
                        charttime: Some(*charttime),
                        value: *value,
                    })
                    .collect()
            });

            if matched.is_empty() {
                rows.push(StayObservation::unmatched(stay.stay_id));
            } else {
                rows.extend(matched);
            }
        }
        Ok(rows)
    }

    fn stay_outcomes(&mut self) -> Result<Vec<StayOutcome>> {
        let admissions = self.admissions_by_id();
        Ok(self
            .sorted_stays()
            .into_iter()
            .map(|stay| StayOutcome {
                stay_id: stay.stay_id,
                hospital_expire_flag: admissions
                    .get(&stay.hadm_id)
                    .and_then(|a| a.hospital_expire_flag),
            })
            .collect())
    }

    fn stay_spans(&mut self) -> Result<Vec<StaySpan>> {
        let admissions = self.admissions_by_id();
        let patients = self.patients_by_id();
        Ok(self
            .sorted_stays()
            .into_iter()
            .filter_map(|stay| {
                let admission = admissions.get(&stay.hadm_id)?;
                let patient = patients.get(&admission.subject_id)?;
                Some(StaySpan {
                    stay_id: stay.stay_id,
                    hadm_id: stay.hadm_id,
                    intime: stay.intime,
                    outtime: stay.outtime,
                    admittime: admission.admittime,
                    anchor_age: patient.anchor_age,
                    anchor_year: patient.anchor_year,
                })
            })
            .collect())
    }
}
