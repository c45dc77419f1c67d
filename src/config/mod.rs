//! Configuration for the feature extractor.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::params::{DEFAULT_DURATION, DEFAULT_LAB_LOOKBACK, Hours};
use crate::source::sql::SqlIdentifier;

/// Environment variable holding the connection URL
pub const DATABASE_URL_VAR: &str = "MIMIC_DATABASE_URL";
/// Environment variable overriding the schema name
pub const SCHEMA_VAR: &str = "MIMIC_SCHEMA";
/// Environment variable overriding the ethnicity column
pub const ETHNICITY_COLUMN_VAR: &str = "MIMIC_ETHNICITY_COLUMN";
/// Environment variable overriding the connect timeout
pub const CONNECT_TIMEOUT_VAR: &str = "MIMIC_CONNECT_TIMEOUT_SECS";
/// Environment variable overriding the default window duration
pub const DURATION_VAR: &str = "MIMIC_DURATION_HOURS";
/// Environment variable overriding the default lab lookback
pub const LAB_LOOKBACK_VAR: &str = "MIMIC_LAB_LOOKBACK_HOURS";

/// Connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres connection URL
    pub url: String,
    /// Schema holding the MIMIC-IV tables
    pub schema: String,
    /// Column of `admissions` carrying ethnicity (`race` in newer releases)
    pub ethnicity_column: String,
    /// Seconds to wait for the connection
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://postgres@localhost:5432/mimic4".to_string(),
            schema: "mimiciv".to_string(),
            ethnicity_column: "ethnicity".to_string(),
            connect_timeout_secs: 30,
        }
    }
}

/// Window lengths used when a caller does not pass its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowDefaults {
    /// Hours after ICU admission
    pub duration_hours: Hours,
    /// Hours before ICU admission for labs
    pub lab_lookback_hours: Hours,
}

impl Default for WindowDefaults {
    fn default() -> Self {
        Self {
            duration_hours: DEFAULT_DURATION,
            lab_lookback_hours: DEFAULT_LAB_LOOKBACK,
        }
    }
}

/// Configuration for the feature extractor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Database connection
    pub database: DatabaseConfig,
    /// Default windows
    pub defaults: WindowDefaults,
}

impl ExtractorConfig {
    /// Read a JSON configuration file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExtractError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            ExtractError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `MIMIC_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `MIMIC_*` environment variables on top of this configuration
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any key lookup (environment, test maps)
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(DATABASE_URL_VAR) {
            self.database.url = url;
        }
        if let Some(schema) = lookup(SCHEMA_VAR) {
            self.database.schema = schema;
        }
        if let Some(column) = lookup(ETHNICITY_COLUMN_VAR) {
            self.database.ethnicity_column = column;
        }
        if let Some(secs) = lookup(CONNECT_TIMEOUT_VAR) {
            self.database.connect_timeout_secs = secs.trim().parse().map_err(|_| {
                ExtractError::Config(format!("{CONNECT_TIMEOUT_VAR} must be a number of seconds"))
            })?;
        }
        if let Some(hours) = lookup(DURATION_VAR) {
            self.defaults.duration_hours = hours
                .parse()
                .map_err(|e| ExtractError::Config(format!("{DURATION_VAR}: {e}")))?;
        }
        if let Some(hours) = lookup(LAB_LOOKBACK_VAR) {
            self.defaults.lab_lookback_hours = hours
                .parse()
                .map_err(|e| ExtractError::Config(format!("{LAB_LOOKBACK_VAR}: {e}")))?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check identifiers and connection settings
    pub fn validate(&self) -> Result<()> {
        SqlIdentifier::parse(&self.database.schema)?;
        SqlIdentifier::parse(&self.database.ethnicity_column)?;
        if self.database.url.trim().is_empty() {
            return Err(ExtractError::Config("database URL is empty".to_string()));
        }
        Ok(())
    }
}

impl fmt::Display for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Extractor Configuration:")?;
        writeln!(f, "  Database: {}", redact_password(&self.database.url))?;
        writeln!(f, "  Schema: {}", self.database.schema)?;
        writeln!(f, "  Ethnicity Column: {}", self.database.ethnicity_column)?;
        writeln!(f, "  Connect Timeout: {}s", self.database.connect_timeout_secs)?;
        writeln!(f, "  Default Duration: {}", self.defaults.duration_hours)?;
        writeln!(f, "  Lab Lookback: {}", self.defaults.lab_lookback_hours)?;
        Ok(())
    }
}

/// Hide the password component of a connection URL
fn redact_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
        None => url.to_string(),
    }
}
