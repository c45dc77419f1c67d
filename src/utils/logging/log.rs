//! Logging utilities
//!
//! Standard message shapes for feature builders, so every table reports
//! its start, row count and timing the same way.

use std::time::Duration;

/// Log the start of a builder run
///
/// # Arguments
/// * `operation` - Name of the feature table being built
/// * `scope` - Short description of the input (window, stay set)
pub fn log_operation_start(operation: &str, scope: &str) {
    log::info!("Building {operation} ({scope})");
}

/// Log a finished builder run
///
/// # Arguments
/// * `operation` - Name of the feature table that was built
/// * `rows` - Number of stays in the output
/// * `elapsed` - Optional elapsed time
pub fn log_operation_complete(operation: &str, rows: usize, elapsed: Option<Duration>) {
    if let Some(duration) = elapsed {
        log::info!("Successfully built {operation} for {rows} stays in {duration:?}");
    } else {
        log::info!("Successfully built {operation} for {rows} stays");
    }
}
