//! Feature table builders
//!
//! [`FeatureExtractor`] borrows a [`ClinicalSource`] and turns its rows into
//! one Arrow table per feature family. Every table is keyed by `stay_id`,
//! sorted ascending, with exactly one row per ICU stay. Stays without data
//! for a column get a null rather than being dropped.

pub mod demographics;
pub mod grid;
pub mod outcome;

use std::time::Instant;

use arrow::record_batch::RecordBatch;

use crate::catalog::{LabMeasurement, Measurement, VitalMeasurement};
use crate::config::{ExtractorConfig, WindowDefaults};
use crate::error::Result;
use crate::params::{ExtremumMode, Hours, ObservationWindow, RankMode};
use crate::source::{ClinicalSource, EventTable, ObservationRequest, StayObservation};
use crate::utils::logging::{log_operation_complete, log_operation_start};

pub use demographics::StaticFeatureRow;
pub use grid::{MeasurementGrid, RankedGrid};
pub use outcome::{Exclusion, MortalityRow};

/// Builds feature tables from a borrowed clinical source
pub struct FeatureExtractor<'a, S: ClinicalSource + ?Sized> {
    source: &'a mut S,
    defaults: WindowDefaults,
}

impl<'a, S: ClinicalSource + ?Sized> FeatureExtractor<'a, S> {
    /// Extractor using the built-in window defaults
    pub fn new(source: &'a mut S) -> Self {
        Self {
            source,
            defaults: WindowDefaults::default(),
        }
    }

    /// Extractor using the window defaults of `config`
    pub fn with_config(source: &'a mut S, config: &ExtractorConfig) -> Self {
        Self {
            source,
            defaults: config.defaults,
        }
    }

    /// Window defaults used by the `*_with_defaults` builders
    #[must_use]
    pub fn defaults(&self) -> WindowDefaults {
        self.defaults
    }

    /// Demographics, anthropometrics and service flags per stay
    pub fn static_features(&mut self) -> Result<RecordBatch> {
        const OPERATION: &str = "static features";
        log_operation_start(OPERATION, "all stays");
        let start = Instant::now();

        let profiles = self.source.stay_profiles()?;
        let discarded = profiles
            .iter()
            .filter(|p| demographics::height_discarded(p))
            .count();
        if discarded > 0 {
            log::warn!("Discarded out-of-range heights for {discarded} stays");
        }
        let missing_anchor = profiles.iter().filter(|p| p.anchor_age.is_none()).count();
        if missing_anchor > 0 {
            log::warn!("{missing_anchor} stays have no patient anchor data; age is null");
        }

        let mut rows: Vec<StaticFeatureRow> =
            profiles.iter().map(StaticFeatureRow::from_profile).collect();
        rows.sort_by_key(|r| r.stay_id);
        rows.dedup_by_key(|r| r.stay_id);

        let batch = StaticFeatureRow::to_record_batch(&rows)?;
        log_operation_complete(OPERATION, batch.num_rows(), Some(start.elapsed()));
        Ok(batch)
    }

    /// First or last value of each lab measurement in
    /// `[intime - lookback, intime + duration]`
    ///
    /// Labs are matched through the hospital admission, so values drawn
    /// before ICU admission (in the emergency department, for example) count
    /// when they fall inside the lookback.
    pub fn lab_features(
        &mut self,
        mode: RankMode,
        duration: Hours,
        lookback: Hours,
    ) -> Result<RecordBatch> {
        let window = ObservationWindow::with_lookback(duration, lookback);
        self.ranked_table::<LabMeasurement>("lab features", EventTable::LabEvents, window, mode)
    }

    /// First or last value of each vital sign in `[intime, intime + duration]`
    pub fn vitals_features(&mut self, mode: RankMode, duration: Hours) -> Result<RecordBatch> {
        let window = ObservationWindow::after_admission(duration);
        self.ranked_table::<VitalMeasurement>(
            "vital features",
            EventTable::ChartEvents,
            window,
            mode,
        )
    }

    /// Minimum or maximum of each vital sign in `[intime, intime + duration]`
    pub fn min_max_vitals_features(
        &mut self,
        mode: ExtremumMode,
        duration: Hours,
    ) -> Result<RecordBatch> {
        const OPERATION: &str = "min/max vital features";
        let window = ObservationWindow::after_admission(duration);
        let start = Instant::now();
        let observations = self.fetch_observations::<VitalMeasurement>(
            OPERATION,
            EventTable::ChartEvents,
            window,
        )?;

        let grid = MeasurementGrid::<VitalMeasurement, f64>::extremum(&observations, mode);
        let batch = grid.to_record_batch(mode.suffix())?;
        log_operation_complete(OPERATION, batch.num_rows(), Some(start.elapsed()));
        Ok(batch)
    }

    /// Hospital expiry flag per stay
    pub fn inhospital_mortality(&mut self) -> Result<RecordBatch> {
        const OPERATION: &str = "in-hospital mortality";
        log_operation_start(OPERATION, "all stays");
        let start = Instant::now();

        let rows = MortalityRow::from_outcomes(self.source.stay_outcomes()?);
        let batch = MortalityRow::to_record_batch(&rows)?;
        log_operation_complete(OPERATION, batch.num_rows(), Some(start.elapsed()));
        Ok(batch)
    }

    /// Stay ids of the study cohort for an observation period of `duration`
    pub fn filtered_cohort(&mut self, duration: Hours) -> Result<RecordBatch> {
        const OPERATION: &str = "cohort";
        log_operation_start(OPERATION, &format!("stays lasting at least {duration}"));
        let start = Instant::now();

        let spans = self.source.stay_spans()?;
        let (selected, excluded) = outcome::select_cohort(&spans, duration);
        for (reason, count) in &excluded {
            log::debug!("Excluded {count} stays: {reason:?}");
        }

        let batch = outcome::cohort_batch(selected)?;
        log_operation_complete(OPERATION, batch.num_rows(), Some(start.elapsed()));
        Ok(batch)
    }

    /// [`Self::lab_features`] with the default mode and windows
    pub fn lab_features_with_defaults(&mut self) -> Result<RecordBatch> {
        let WindowDefaults {
            duration_hours,
            lab_lookback_hours,
        } = self.defaults;
        self.lab_features(RankMode::default(), duration_hours, lab_lookback_hours)
    }

    /// [`Self::vitals_features`] with the default mode and window
    pub fn vitals_features_with_defaults(&mut self) -> Result<RecordBatch> {
        let duration = self.defaults.duration_hours;
        self.vitals_features(RankMode::default(), duration)
    }

    /// [`Self::min_max_vitals_features`] with the default mode and window
    pub fn min_max_vitals_features_with_defaults(&mut self) -> Result<RecordBatch> {
        let duration = self.defaults.duration_hours;
        self.min_max_vitals_features(ExtremumMode::default(), duration)
    }

    /// [`Self::filtered_cohort`] with the default window
    pub fn filtered_cohort_with_defaults(&mut self) -> Result<RecordBatch> {
        let duration = self.defaults.duration_hours;
        self.filtered_cohort(duration)
    }

    fn ranked_table<M: Measurement>(
        &mut self,
        operation: &'static str,
        table: EventTable,
        window: ObservationWindow,
        mode: RankMode,
    ) -> Result<RecordBatch> {
        let start = Instant::now();
        let observations = self.fetch_observations::<M>(operation, table, window)?;

        let grid = RankedGrid::<M>::ranked(&observations, mode).into_values();
        let batch = grid.to_record_batch(mode.suffix())?;
        log_operation_complete(operation, batch.num_rows(), Some(start.elapsed()));
        Ok(batch)
    }

    fn fetch_observations<M: Measurement>(
        &mut self,
        operation: &'static str,
        table: EventTable,
        window: ObservationWindow,
    ) -> Result<Vec<StayObservation>> {
        log_operation_start(
            operation,
            &format!(
                "{} window -{} / +{}",
                table.table_name(),
                window.lookback,
                window.duration
            ),
        );
        let request = ObservationRequest {
            table,
            window,
            item_ids: M::item_ids(),
        };
        let observations = self.source.observations(&request)?;
        log::debug!("{operation}: {} source rows", observations.len());
        Ok(observations)
    }
}
