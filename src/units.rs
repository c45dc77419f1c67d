//! Unit conversions and derived demographic values
//!
//! Pure functions shared by the feature builders. Invalid measurements are
//! turned into `None` here rather than flagged, so callers never see them.

use chrono::{NaiveDate, NaiveDateTime};

/// Centimeters per inch
pub const CM_PER_INCH: f64 = 2.54;

/// Converted heights for anchor-age-zero patients must be strictly below this
pub const NEONATE_MAX_HEIGHT_CM: f64 = 80.0;
/// Exclusive lower bound for other patients
pub const ADULT_MIN_HEIGHT_CM: f64 = 120.0;
/// Exclusive upper bound for other patients
pub const ADULT_MAX_HEIGHT_CM: f64 = 230.0;

/// Convert inches to centimeters
#[must_use]
pub fn inches_to_cm(inches: f64) -> f64 {
    inches * CM_PER_INCH
}

/// Convert a recorded height in inches to a validated height in centimeters
///
/// Anchor age zero accepts `< 80` cm; any positive anchor age accepts the
/// open interval `(120, 230)` cm. Everything else is discarded.
#[must_use]
pub fn valid_height_cm(inches: f64, anchor_age: i32) -> Option<f64> {
    let cm = inches_to_cm(inches);
    height_in_range(cm, anchor_age).then_some(cm)
}

/// Whether a height in centimeters is plausible for the anchor age
#[must_use]
pub fn height_in_range(cm: f64, anchor_age: i32) -> bool {
    match anchor_age {
        0 => cm < NEONATE_MAX_HEIGHT_CM,
        age if age > 0 => cm > ADULT_MIN_HEIGHT_CM && cm < ADULT_MAX_HEIGHT_CM,
        _ => false,
    }
}

/// Convert degrees Fahrenheit to Celsius
#[must_use]
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) / 1.8
}

/// Body mass index from weight (kg) and height (cm); `None` unless both are known
#[must_use]
pub fn bmi(weight_kg: Option<f64>, height_cm: Option<f64>) -> Option<f64> {
    let (weight, height) = (weight_kg?, height_cm?);
    let meters = height / 100.0;
    Some(weight / (meters * meters))
}

/// Age in whole years at admission, reconstructed from the de-identification anchors
///
/// Whole days elapsed between January 1st of the anchor year and the
/// admission time are divided by 365 and floored, then the anchor age is
/// added. Returns `None` when the anchor year is not a representable date.
#[must_use]
pub fn age_at_admission(
    admittime: NaiveDateTime,
    anchor_year: i32,
    anchor_age: i32,
) -> Option<i64> {
    let anchor = NaiveDate::from_ymd_opt(anchor_year, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let days = (admittime - anchor).num_days();
    let years = (days as f64 / 365.0).floor() as i64;
    Some(years + i64::from(anchor_age))
}

/// Case-insensitive substring test used for free-text categorical fields
#[must_use]
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// One-hot ethnicity flags; matches are independent, so several can be set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EthnicityFlags {
    pub white: bool,
    pub black: bool,
    pub hispanic: bool,
    pub asian: bool,
    pub other: bool,
}

impl EthnicityFlags {
    /// Derive flags from the free-text ethnicity field
    #[must_use]
    pub fn from_text(ethnicity: Option<&str>) -> Self {
        let Some(text) = ethnicity else {
            return Self::default();
        };
        Self {
            white: contains_ignore_case(text, "white"),
            black: contains_ignore_case(text, "black"),
            hispanic: contains_ignore_case(text, "hispanic"),
            asian: contains_ignore_case(text, "asian"),
            other: contains_ignore_case(text, "other"),
        }
    }
}

/// Service-type flags derived from the care units an admission passed through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServiceFlags {
    /// Any cardiac surgery unit
    pub cardiac_surgery: bool,
    /// Any surgical unit that is not cardiac
    pub noncardiac_surgery: bool,
    /// Any trauma unit
    pub trauma: bool,
}

impl ServiceFlags {
    /// Derive flags from care-unit names
    #[must_use]
    pub fn from_careunits<S: AsRef<str>>(careunits: &[S]) -> Self {
        careunits.iter().fold(Self::default(), |flags, unit| {
            let unit = unit.as_ref().to_lowercase();
            let cardiac = unit.contains("card");
            let surgical = unit.contains("surg");
            Self {
                cardiac_surgery: flags.cardiac_surgery || (cardiac && surgical),
                noncardiac_surgery: flags.noncardiac_surgery || (!cardiac && surgical),
                trauma: flags.trauma || unit.contains("trauma"),
            }
        })
    }
}
