//! Per-stay measurement grids and their pivot into Arrow tables

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDateTime;

use crate::catalog::Measurement;
use crate::error::Result;
use crate::params::{ExtremumMode, RankMode};
use crate::source::StayObservation;

/// One cell per (stay, measurement), kept in ascending stay order
#[derive(Debug, Clone)]
pub struct MeasurementGrid<M: Measurement, C> {
    rows: BTreeMap<i64, Vec<Option<C>>>,
    _measurement: PhantomData<M>,
}

impl<M: Measurement, C: Copy> MeasurementGrid<M, C> {
    fn new() -> Self {
        Self {
            rows: BTreeMap::new(),
            _measurement: PhantomData,
        }
    }

    /// Register a stay, creating an all-null row on first sight
    fn row_mut(&mut self, stay_id: i64) -> &mut Vec<Option<C>> {
        self.rows
            .entry(stay_id)
            .or_insert_with(|| vec![None; M::ALL.len()])
    }

    /// Number of stays in the grid
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the grid has no stays
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell for one stay and measurement
    #[must_use]
    pub fn get(&self, stay_id: i64, measurement: M) -> Option<C> {
        self.rows
            .get(&stay_id)
            .and_then(|row| row[measurement.index()])
    }
}

/// Value picked by event time; the timestamp is kept to compare later candidates
pub type Ranked = (NaiveDateTime, f64);

/// Grid of time-ranked selections
pub type RankedGrid<M> = MeasurementGrid<M, Ranked>;

impl<M: Measurement> MeasurementGrid<M, Ranked> {
    /// Pick the earliest or latest in-window value per stay and measurement
    ///
    /// Candidates with equal timestamps resolve in source order: `first`
    /// keeps the one returned earlier and `last` the one returned later.
    #[must_use]
    pub fn ranked(observations: &[StayObservation], mode: RankMode) -> Self {
        let mut grid = Self::new();
        for observation in observations {
            let row = grid.row_mut(observation.stay_id);
            let Some((item_id, charttime, value)) = observation.event() else {
                continue;
            };
            let Some(mapping) = M::lookup(item_id) else {
                continue;
            };
            let cell = &mut row[mapping.measurement.index()];
            let replace = match (*cell, mode) {
                (None, _) => true,
                (Some((current, _)), RankMode::First) => charttime < current,
                (Some((current, _)), RankMode::Last) => charttime >= current,
            };
            if replace {
                *cell = Some((charttime, mapping.unit.normalize(value)));
            }
        }
        grid
    }

    /// Drop the timestamps, keeping only the selected values
    #[must_use]
    pub fn into_values(self) -> MeasurementGrid<M, f64> {
        MeasurementGrid {
            rows: self
                .rows
                .into_iter()
                .map(|(stay_id, row)| {
                    let values = row.into_iter().map(|cell| cell.map(|(_, v)| v)).collect();
                    (stay_id, values)
                })
                .collect(),
            _measurement: PhantomData,
        }
    }
}

impl<M: Measurement> MeasurementGrid<M, f64> {
    /// Minimum or maximum of every in-window value per stay and measurement
    #[must_use]
    pub fn extremum(observations: &[StayObservation], mode: ExtremumMode) -> Self {
        let mut grid = Self::new();
        for observation in observations {
            let row = grid.row_mut(observation.stay_id);
            let Some((item_id, _, value)) = observation.event() else {
                continue;
            };
            if let Some(mapping) = M::lookup(item_id) {
                let cell = &mut row[mapping.measurement.index()];
                *cell = mode.combine(*cell, mapping.unit.normalize(value));
            }
        }
        grid
    }

    /// Pivot into `stay_id` plus one `<stem>_<suffix>` column per measurement
    pub fn to_record_batch(&self, suffix: &str) -> Result<RecordBatch> {
        let mut fields = Vec::with_capacity(M::ALL.len() + 1);
        fields.push(Field::new("stay_id", DataType::Int64, false));
        fields.extend(
            M::ALL
                .iter()
                .map(|m| Field::new(m.column_name(suffix), DataType::Float64, true)),
        );

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(fields.len());
        columns.push(Arc::new(Int64Array::from_iter_values(
            self.rows.keys().copied(),
        )));
        for measurement in M::ALL {
            let index = measurement.index();
            let values: Float64Array = self.rows.values().map(|row| row[index]).collect();
            columns.push(Arc::new(values));
        }

        Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
    }
}
