//! Feature extraction for MIMIC-IV style ICU databases.
//!
//! Reads time-stamped clinical events and reshapes them into Arrow tables
//! with one row per ICU stay: static demographics, first/last labs and
//! vitals, min/max vitals, in-hospital mortality and a study cohort.

pub mod catalog;
pub mod config;
pub mod error;
pub mod features;
pub mod params;
pub mod source;
pub mod table;
pub mod units;
pub mod utils;

// Re-export the most common types for easier use
pub use config::{DatabaseConfig, ExtractorConfig, WindowDefaults};
pub use error::{ExtractError, Result};
pub use features::FeatureExtractor;
pub use params::{ExtremumMode, Hours, ObservationWindow, RankMode};
pub use source::{ClinicalSource, InMemorySource, PgSource};
pub use table::{TableSummary, restrict_to_cohort, summarize};

// Arrow types
pub use arrow::record_batch::RecordBatch;
