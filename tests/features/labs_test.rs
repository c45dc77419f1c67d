use mimic_features::catalog::{LabMeasurement, Measurement};
use mimic_features::table::{float_column, stay_ids};
use mimic_features::{ExtractError, Hours, RankMode};

use crate::utils::{Fixture, extract};

const POTASSIUM_CHEM: i32 = 50_971;
const POTASSIUM_BG: i32 = 50_822;
const SODIUM: i32 = 50_983;
const CREATININE: i32 = 50_912;

/// ICU admission ten hours after the base time
const INTIME_MIN: i64 = 600;

fn fixture() -> Fixture {
    Fixture::new()
        .stay(10, 100, 1, 10, 72)
        // two potassium codes; the later one carries the smaller value
        .lab(100, POTASSIUM_CHEM, INTIME_MIN + 60, 4.5)
        .lab(100, POTASSIUM_BG, INTIME_MIN + 120, 3.8)
        // sodium exactly at the 8 h lookback edge, and one minute before it
        .lab(100, SODIUM, INTIME_MIN - 8 * 60, 140.0)
        .lab(100, SODIUM, INTIME_MIN - 8 * 60 - 1, 150.0)
        // creatinine at the 24 h edge, and one minute after it
        .lab(100, CREATININE, INTIME_MIN + 24 * 60, 1.1)
        .lab(100, CREATININE, INTIME_MIN + 24 * 60 + 1, 2.2)
        // stay without any labs
        .stay(11, 101, 2, 10, 72)
}

fn hours(h: u32) -> Hours {
    Hours::new(h).expect("valid hours")
}

#[test]
fn test_first_and_last_follow_time_not_value() -> mimic_features::Result<()> {
    let mut source = fixture().build();
    let first = extract(&mut source, |e| {
        e.lab_features(RankMode::First, hours(24), hours(8))
    })?;
    let last = extract(&mut source, |e| {
        e.lab_features(RankMode::Last, hours(24), hours(8))
    })?;

    assert_eq!(float_column(&first, "potassium_first")?[0], Some(4.5));
    assert_eq!(float_column(&last, "potassium_last")?[0], Some(3.8));
    Ok(())
}

#[test]
fn test_window_edges_are_inclusive() -> mimic_features::Result<()> {
    let mut source = fixture().build();
    let first = extract(&mut source, |e| {
        e.lab_features(RankMode::First, hours(24), hours(8))
    })?;
    let last = extract(&mut source, |e| {
        e.lab_features(RankMode::Last, hours(24), hours(8))
    })?;

    assert_eq!(float_column(&first, "sodium_first")?[0], Some(140.0));
    assert_eq!(float_column(&last, "creatinine_last")?[0], Some(1.1));
    Ok(())
}

#[test]
fn test_zero_lookback_drops_pre_admission_labs() -> mimic_features::Result<()> {
    let mut source = fixture().build();
    let batch = extract(&mut source, |e| {
        e.lab_features(RankMode::First, hours(24), Hours::ZERO)
    })?;
    assert_eq!(float_column(&batch, "sodium_first")?[0], None);
    assert_eq!(float_column(&batch, "potassium_first")?[0], Some(4.5));
    Ok(())
}

#[test]
fn test_stays_without_labs_keep_a_null_row() -> mimic_features::Result<()> {
    let mut source = fixture().build();
    let batch = extract(&mut source, |e| e.lab_features_with_defaults())?;

    assert_eq!(stay_ids(&batch)?, vec![10, 11]);
    for measurement in LabMeasurement::ALL {
        let column = float_column(&batch, &measurement.column_name("first"))?;
        assert_eq!(column[1], None, "{measurement:?} should be null");
    }
    Ok(())
}

#[test]
fn test_column_layout() -> mimic_features::Result<()> {
    let mut source = fixture().build();
    let batch = extract(&mut source, |e| {
        e.lab_features(RankMode::Last, hours(24), hours(8))
    })?;
    let schema = batch.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();

    assert_eq!(names.len(), 26);
    assert_eq!(names[0], "stay_id");
    assert_eq!(names[1], "bun_last");
    assert!(names.contains(&"bg_methemoglobin_last"));
    assert!(names.contains(&"bilirubin_last"));
    assert_eq!(names[25], "inr_last");
    Ok(())
}

#[test]
fn test_unknown_mode_is_rejected() {
    assert!(matches!(
        "median".parse::<RankMode>(),
        Err(ExtractError::InvalidParameter(_))
    ));
    assert!(matches!(
        Hours::try_from(-8_i64),
        Err(ExtractError::InvalidParameter(_))
    ));
}
