use std::io::Write;

use mimic_features::table::{float_column, stay_ids};
use mimic_features::{
    Hours, InMemorySource, RankMode, Result, restrict_to_cohort, summarize,
};

use crate::utils::{Fixture, extract};

#[test]
fn test_restrict_features_to_cohort() -> Result<()> {
    let mut source = Fixture::new()
        .stay(1, 10, 1, 0, 48)
        .stay(2, 20, 2, 0, 6)
        .stay(3, 30, 3, 0, 48)
        .patient(3, "M", 17, 2150)
        .chart(1, 220_045, 5, 72.0)
        .chart(2, 220_045, 5, 81.0)
        .build();

    let vitals = extract(&mut source, |e| e.vitals_features_with_defaults())?;
    let cohort = extract(&mut source, |e| e.filtered_cohort_with_defaults())?;
    let restricted = restrict_to_cohort(&vitals, &cohort)?;

    assert_eq!(stay_ids(&restricted)?, vec![1]);
    assert_eq!(float_column(&restricted, "heartrate_first")?, vec![Some(72.0)]);
    assert_eq!(restricted.schema(), vitals.schema());
    Ok(())
}

#[test]
fn test_summary_counts_missing_values() -> Result<()> {
    let mut source = Fixture::new()
        .stay(1, 10, 1, 0, 48)
        .stay(2, 20, 2, 0, 48)
        .chart(1, 220_045, 5, 72.0)
        .build();
    let day = Hours::new(24)?;
    let vitals = extract(&mut source, |e| e.vitals_features(RankMode::Last, day))?;
    let summary = summarize(&vitals);

    assert_eq!(summary.rows, 2);
    let heartrate = summary
        .columns
        .iter()
        .find(|c| c.name == "heartrate_last")
        .expect("heartrate column");
    assert_eq!(heartrate.null_count, 1);
    assert!(
        summary
            .to_string()
            .contains("heartrate_last (Float64): 1 null (50.0%)")
    );
    Ok(())
}

#[test]
fn test_features_from_json_fixture_file() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        r#"{{
            "icustays": [
                {{"stay_id": 2, "hadm_id": 20, "subject_id": 1,
                  "intime": "2150-03-01T00:00:00", "outtime": "2150-03-03T00:00:00"}}
            ],
            "admissions": [
                {{"hadm_id": 20, "subject_id": 1, "admittime": "2150-02-28T20:00:00",
                  "ethnicity": "ASIAN", "admission_type": "URGENT", "hospital_expire_flag": false}}
            ],
            "patients": [
                {{"subject_id": 1, "gender": "M", "anchor_age": 40, "anchor_year": 2150}}
            ],
            "chartevents": [
                {{"subject_id": 1, "stay_id": 2, "item_id": 223761,
                  "charttime": "2150-03-01T01:00:00", "value": 100.4}}
            ]
        }}"#
    )
    .expect("write fixture");

    let mut source = InMemorySource::from_json_file(file.path())?;
    let vitals = extract(&mut source, |e| e.vitals_features_with_defaults())?;
    let tempc = float_column(&vitals, "tempc_first")?;
    assert!((tempc[0].unwrap_or_default() - 38.0).abs() < 1e-6);

    let cohort = extract(&mut source, |e| e.filtered_cohort_with_defaults())?;
    assert_eq!(stay_ids(&cohort)?, vec![2]);
    Ok(())
}
