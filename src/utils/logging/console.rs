//! Console output utilities

use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

/// Print the first `limit` rows of a table, or all rows when `limit` is `None`
pub fn print_table(batch: &RecordBatch, limit: Option<usize>) -> Result<(), ArrowError> {
    let shown = limit.map_or(batch.num_rows(), |n| n.min(batch.num_rows()));
    let head = batch.slice(0, shown);
    println!("{}", pretty_format_batches(&[head])?);
    if shown < batch.num_rows() {
        println!("... {} more rows", batch.num_rows() - shown);
    }
    Ok(())
}
