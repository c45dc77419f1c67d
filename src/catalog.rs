//! Item-code catalog
//!
//! Maps MIMIC-IV `itemid` codes onto the logical measurement each one
//! represents. Several codes can collapse onto one measurement (blood gas
//! and chemistry analyzers both report potassium, for example); the mapping
//! is many-to-one and carries no ordering of its own, so first/last
//! selection is always decided by event time.

use std::hash::Hash;

use crate::units;

/// Chart item: height recorded in inches
pub const HEIGHT_INCHES_ITEM: i32 = 226_707;
/// Chart item: admission weight in kilograms
pub const ADMIT_WEIGHT_ITEM: i32 = 226_512;
/// Chart item: temperature recorded in Fahrenheit
pub const TEMPERATURE_FAHRENHEIT_ITEM: i32 = 223_761;

/// Unit in which a source item is recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceUnit {
    /// Already in the unit of the output column
    AsRecorded,
    /// Degrees Fahrenheit, converted to Celsius
    Fahrenheit,
}

impl SourceUnit {
    /// Convert a recorded value into the output unit
    #[must_use]
    pub fn normalize(self, value: f64) -> f64 {
        match self {
            Self::AsRecorded => value,
            Self::Fahrenheit => units::fahrenheit_to_celsius(value),
        }
    }
}

/// One row of a catalog table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemMapping<M> {
    /// Source `itemid`
    pub item_id: i32,
    /// Logical measurement the item maps to
    pub measurement: M,
    /// Unit the item is recorded in
    pub unit: SourceUnit,
}

const fn item<M>(item_id: i32, measurement: M) -> ItemMapping<M> {
    ItemMapping {
        item_id,
        measurement,
        unit: SourceUnit::AsRecorded,
    }
}

/// A logical measurement type that becomes one output column
pub trait Measurement: Copy + Eq + Hash + std::fmt::Debug + 'static {
    /// All measurements, in output column order
    const ALL: &'static [Self];

    /// Catalog rows backing the measurements
    fn items() -> &'static [ItemMapping<Self>];

    /// Column name without the mode suffix
    fn column_stem(self) -> &'static str;

    /// Position in [`Measurement::ALL`]
    fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|m| *m == self)
            .unwrap_or_default()
    }

    /// Look up the catalog row for an item code
    fn lookup(item_id: i32) -> Option<&'static ItemMapping<Self>> {
        Self::items().iter().find(|m| m.item_id == item_id)
    }

    /// Every item code that feeds a measurement
    #[must_use]
    fn item_ids() -> Vec<i32> {
        Self::items().iter().map(|m| m.item_id).collect()
    }

    /// Output column name for a given mode suffix
    #[must_use]
    fn column_name(self, suffix: &str) -> String {
        format!("{}_{suffix}", self.column_stem())
    }
}

/// Laboratory measurements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabMeasurement {
    Bun,
    Chloride,
    Creatinine,
    Hemoglobin,
    Platelet,
    Potassium,
    Sodium,
    TotalCo2,
    Wbc,
    Po2,
    Pco2,
    Ph,
    BaseExcess,
    Carboxyhemoglobin,
    Methemoglobin,
    AnionGap,
    Albumin,
    Bands,
    Bicarbonate,
    Bilirubin,
    Glucose,
    Hematocrit,
    Lactate,
    Ptt,
    Inr,
}

static LAB_ITEMS: [ItemMapping<LabMeasurement>; 40] = {
    use LabMeasurement::*;
    [
        item(51_006, Bun),
        item(50_806, Chloride),
        item(50_902, Chloride),
        item(50_912, Creatinine),
        item(50_811, Hemoglobin),
        item(51_222, Hemoglobin),
        item(51_265, Platelet),
        item(50_822, Potassium),
        item(50_971, Potassium),
        item(50_824, Sodium),
        item(50_983, Sodium),
        item(50_803, Bicarbonate),
        item(50_882, Bicarbonate),
        item(50_804, TotalCo2),
        item(50_821, Po2),
        item(52_042, Po2),
        item(50_832, Po2),
        item(50_818, Pco2),
        item(52_040, Pco2),
        item(50_830, Pco2),
        item(50_820, Ph),
        item(52_041, Ph),
        item(50_831, Ph),
        item(51_300, Wbc),
        item(51_301, Wbc),
        item(50_802, BaseExcess),
        item(52_038, BaseExcess),
        item(50_805, Carboxyhemoglobin),
        item(50_814, Methemoglobin),
        item(50_868, AnionGap),
        item(52_500, AnionGap),
        item(50_862, Albumin),
        item(51_144, Bands),
        item(50_885, Bilirubin),
        item(51_478, Glucose),
        item(50_931, Glucose),
        item(51_221, Hematocrit),
        item(50_813, Lactate),
        item(51_275, Ptt),
        item(51_237, Inr),
    ]
};

impl Measurement for LabMeasurement {
    const ALL: &'static [Self] = &[
        Self::Bun,
        Self::Chloride,
        Self::Creatinine,
        Self::Hemoglobin,
        Self::Platelet,
        Self::Potassium,
        Self::Sodium,
        Self::TotalCo2,
        Self::Wbc,
        Self::Po2,
        Self::Pco2,
        Self::Ph,
        Self::BaseExcess,
        Self::Carboxyhemoglobin,
        Self::Methemoglobin,
        Self::AnionGap,
        Self::Albumin,
        Self::Bands,
        Self::Bicarbonate,
        Self::Bilirubin,
        Self::Glucose,
        Self::Hematocrit,
        Self::Lactate,
        Self::Ptt,
        Self::Inr,
    ];

    fn items() -> &'static [ItemMapping<Self>] {
        &LAB_ITEMS
    }

    fn column_stem(self) -> &'static str {
        match self {
            Self::Bun => "bun",
            Self::Chloride => "chloride",
            Self::Creatinine => "creatinine",
            Self::Hemoglobin => "hgb",
            Self::Platelet => "platelet",
            Self::Potassium => "potassium",
            Self::Sodium => "sodium",
            Self::TotalCo2 => "tco2",
            Self::Wbc => "wbc",
            Self::Po2 => "bg_po2",
            Self::Pco2 => "bg_pco2",
            Self::Ph => "bg_ph",
            Self::BaseExcess => "bg_baseexcess",
            Self::Carboxyhemoglobin => "bg_carboxyhemoglobin",
            Self::Methemoglobin => "bg_methemoglobin",
            Self::AnionGap => "aniongap",
            Self::Albumin => "albumin",
            Self::Bands => "bands",
            Self::Bicarbonate => "bicarbonate",
            Self::Bilirubin => "bilirubin",
            Self::Glucose => "glucose",
            Self::Hematocrit => "hematocrit",
            Self::Lactate => "lactate",
            Self::Ptt => "ptt",
            Self::Inr => "inr",
        }
    }
}

/// Vital signs and neurological exam components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VitalMeasurement {
    HeartRate,
    SysBp,
    DiasBp,
    MeanBp,
    RespRate,
    TempC,
    SpO2,
    GcsEye,
    GcsVerbal,
    GcsMotor,
}

static VITAL_ITEMS: [ItemMapping<VitalMeasurement>; 18] = {
    use VitalMeasurement::*;
    [
        item(220_045, HeartRate),
        item(220_050, SysBp),
        item(220_179, SysBp),
        item(220_051, DiasBp),
        item(220_180, DiasBp),
        item(220_052, MeanBp),
        item(220_181, MeanBp),
        item(225_312, MeanBp),
        item(220_210, RespRate),
        item(224_688, RespRate),
        item(224_689, RespRate),
        item(224_690, RespRate),
        ItemMapping {
            item_id: TEMPERATURE_FAHRENHEIT_ITEM,
            measurement: TempC,
            unit: SourceUnit::Fahrenheit,
        },
        item(223_762, TempC),
        item(220_277, SpO2),
        item(220_739, GcsEye),
        item(223_900, GcsVerbal),
        item(223_901, GcsMotor),
    ]
};

impl Measurement for VitalMeasurement {
    const ALL: &'static [Self] = &[
        Self::HeartRate,
        Self::SysBp,
        Self::DiasBp,
        Self::MeanBp,
        Self::RespRate,
        Self::TempC,
        Self::SpO2,
        Self::GcsEye,
        Self::GcsVerbal,
        Self::GcsMotor,
    ];

    fn items() -> &'static [ItemMapping<Self>] {
        &VITAL_ITEMS
    }

    fn column_stem(self) -> &'static str {
        match self {
            Self::HeartRate => "heartrate",
            Self::SysBp => "sysbp",
            Self::DiasBp => "diabp",
            Self::MeanBp => "meanbp",
            Self::RespRate => "resprate",
            Self::TempC => "tempc",
            Self::SpO2 => "spo2",
            Self::GcsEye => "gcseye",
            Self::GcsVerbal => "gcsverbal",
            Self::GcsMotor => "gcsmotor",
        }
    }
}
