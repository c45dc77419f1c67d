//! Helpers for working with feature tables
//!
//! Feature tables are plain Arrow record batches keyed by `stay_id`; these
//! functions cover the operations callers commonly need on them: restricting
//! a table to a cohort, typed column access and a console summary.

use std::fmt;

use arrow::array::{Array, BooleanArray, Float64Array, Int64Array};
use arrow::compute::filter_record_batch;
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashSet;

use crate::error::{ExtractError, Result};

/// Name of the key column shared by every feature table
pub const STAY_ID: &str = "stay_id";

fn typed_column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    name: &str,
    expected: &str,
) -> Result<&'a T> {
    let column = batch
        .column_by_name(name)
        .ok_or_else(|| ExtractError::invalid_parameter(format!("table has no column '{name}'")))?;
    column.as_any().downcast_ref::<T>().ok_or_else(|| {
        ExtractError::invalid_parameter(format!(
            "column '{name}' is {}, expected {expected}",
            column.data_type()
        ))
    })
}

/// The `stay_id` values of a table, in row order
pub fn stay_ids(batch: &RecordBatch) -> Result<Vec<i64>> {
    let column = typed_column::<Int64Array>(batch, STAY_ID, "Int64")?;
    Ok(column.iter().flatten().collect())
}

/// A floating-point column as options, in row order
pub fn float_column(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(typed_column::<Float64Array>(batch, name, "Float64")?
        .iter()
        .collect())
}

/// A boolean column as options, in row order
pub fn bool_column(batch: &RecordBatch, name: &str) -> Result<Vec<Option<bool>>> {
    Ok(typed_column::<BooleanArray>(batch, name, "Boolean")?
        .iter()
        .collect())
}

/// Keep only the rows of `table` whose stay is listed in `cohort`
pub fn restrict_to_cohort(table: &RecordBatch, cohort: &RecordBatch) -> Result<RecordBatch> {
    let members: FxHashSet<i64> = stay_ids(cohort)?.into_iter().collect();
    let keys = typed_column::<Int64Array>(table, STAY_ID, "Int64")?;
    let mask: BooleanArray = keys
        .iter()
        .map(|id| Some(id.is_some_and(|id| members.contains(&id))))
        .collect();
    Ok(filter_record_batch(table, &mask)?)
}

/// Null count of one column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSummary {
    pub name: String,
    pub data_type: String,
    pub null_count: usize,
}

/// Shape and missingness of a feature table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
}

/// Summarize a table
#[must_use]
pub fn summarize(batch: &RecordBatch) -> TableSummary {
    let schema = batch.schema();
    TableSummary {
        rows: batch.num_rows(),
        columns: schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, column)| ColumnSummary {
                name: field.name().clone(),
                data_type: field.data_type().to_string(),
                null_count: column.null_count(),
            })
            .collect(),
    }
}

impl fmt::Display for TableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Rows: {}", self.rows)?;
        writeln!(f, "Columns:")?;
        for column in &self.columns {
            let pct = if self.rows == 0 {
                0.0
            } else {
                column.null_count as f64 * 100.0 / self.rows as f64
            };
            writeln!(
                f,
                "  - {} ({}): {} null ({pct:.1}%)",
                column.name, column.data_type, column.null_count
            )?;
        }
        Ok(())
    }
}
