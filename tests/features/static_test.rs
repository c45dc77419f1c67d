use arrow::array::{Array, Int64Array};

use mimic_features::catalog::{ADMIT_WEIGHT_ITEM, HEIGHT_INCHES_ITEM};
use mimic_features::table::{bool_column, float_column, stay_ids};
use mimic_features::units::{
    ADULT_MAX_HEIGHT_CM, ADULT_MIN_HEIGHT_CM, CM_PER_INCH, NEONATE_MAX_HEIGHT_CM,
};

use crate::utils::{Fixture, assert_close, extract};

fn fixture() -> Fixture {
    Fixture::new()
        // adult with two heights and two admission weights
        .stay(1, 10, 1, 0, 48)
        .patient(1, "M", 52, 2150)
        .chart(1, HEIGHT_INCHES_ITEM, 30, 66.0)
        .chart(1, HEIGHT_INCHES_ITEM, 90, 69.0)
        .chart(1, ADMIT_WEIGHT_ITEM, 20, 81.0)
        .chart(1, ADMIT_WEIGHT_ITEM, 80, 79.5)
        .transfer(10, "Cardiac Surgery")
        .transfer(10, "Med/Surg")
        // neonates
        .stay(2, 20, 2, 0, 48)
        .patient(2, "F", 0, 2150)
        .chart(2, HEIGHT_INCHES_ITEM, 10, 33.0)
        .stay(3, 30, 3, 0, 48)
        .patient(3, "F", 0, 2150)
        .chart(3, HEIGHT_INCHES_ITEM, 10, 30.0)
        // adults at the edges of the accepted range
        .stay(4, 40, 4, 0, 48)
        .chart(4, HEIGHT_INCHES_ITEM, 10, 45.0)
        .chart(4, ADMIT_WEIGHT_ITEM, 10, 70.0)
        .stay(5, 50, 5, 0, 48)
        .chart(5, HEIGHT_INCHES_ITEM, 10, 50.0)
        .admission(50, |a| {
            a.ethnicity = Some("HISPANIC/LATINO - PUERTO RICAN".to_string());
            a.admission_type = Some("ELECTIVE".to_string());
        })
        .transfer(50, "Trauma SICU (TSICU)")
        // nothing recorded at all
        .stay(6, 60, 6, 0, 48)
}

#[test]
fn test_one_row_per_stay_in_stay_order() -> mimic_features::Result<()> {
    let mut source = fixture().build();
    let batch = extract(&mut source, |e| e.static_features())?;

    assert_eq!(stay_ids(&batch)?, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(batch.num_columns(), 17);
    Ok(())
}

#[test]
fn test_height_rules() -> mimic_features::Result<()> {
    let mut source = fixture().build();
    let batch = extract(&mut source, |e| e.static_features())?;
    let height = float_column(&batch, "height")?;

    // most recent reading wins
    assert_close(height[0], 175.26);
    // 33 in = 83.82 cm is not below the 80 cm cutoff for anchor age zero
    assert_eq!(height[1], None);
    assert_close(height[2], 76.2);
    // 45 in = 114.3 cm is below the adult range
    assert_eq!(height[3], None);
    assert_close(height[4], 127.0);
    assert_eq!(height[5], None);
    Ok(())
}

#[test]
fn test_heights_on_the_cutoffs_are_discarded() -> mimic_features::Result<()> {
    let mut source = Fixture::new()
        .stay(1, 10, 1, 0, 48)
        .patient(1, "F", 0, 2150)
        .chart(1, HEIGHT_INCHES_ITEM, 10, NEONATE_MAX_HEIGHT_CM / CM_PER_INCH)
        .stay(2, 20, 2, 0, 48)
        .chart(2, HEIGHT_INCHES_ITEM, 10, ADULT_MIN_HEIGHT_CM / CM_PER_INCH)
        .stay(3, 30, 3, 0, 48)
        .chart(3, HEIGHT_INCHES_ITEM, 10, ADULT_MAX_HEIGHT_CM / CM_PER_INCH)
        .stay(4, 40, 4, 0, 48)
        .chart(4, HEIGHT_INCHES_ITEM, 10, 229.9 / CM_PER_INCH)
        .build();
    let batch = extract(&mut source, |e| e.static_features())?;
    let height = float_column(&batch, "height")?;

    assert!(height[..3].iter().all(Option::is_none));
    assert_close(height[3], 229.9);
    Ok(())
}

#[test]
fn test_weight_is_first_admission_weight() -> mimic_features::Result<()> {
    let mut source = fixture().build();
    let batch = extract(&mut source, |e| e.static_features())?;
    let weight = float_column(&batch, "weight")?;

    assert_eq!(weight[0], Some(81.0));
    assert_eq!(weight[3], Some(70.0));
    assert_eq!(weight[5], None);
    Ok(())
}

#[test]
fn test_bmi_requires_height_and_weight() -> mimic_features::Result<()> {
    let mut source = fixture().build();
    let batch = extract(&mut source, |e| e.static_features())?;
    let bmi = float_column(&batch, "bmi")?;

    assert_close(bmi[0], 26.370_563_138);
    // weight without a valid height
    assert_eq!(bmi[3], None);
    // height without a weight
    assert_eq!(bmi[4], None);
    Ok(())
}

#[test]
fn test_bmi_of_reference_adult() -> mimic_features::Result<()> {
    // 68.897... in is 175 cm
    let mut source = Fixture::new()
        .stay(1, 10, 1, 0, 48)
        .chart(1, HEIGHT_INCHES_ITEM, 10, 175.0 / 2.54)
        .chart(1, ADMIT_WEIGHT_ITEM, 10, 70.0)
        .build();
    let batch = extract(&mut source, |e| e.static_features())?;
    let bmi = float_column(&batch, "bmi")?;
    assert!((bmi[0].unwrap_or_default() - 22.86).abs() < 0.01);
    Ok(())
}

#[test]
fn test_demographic_flags() -> mimic_features::Result<()> {
    let mut source = fixture().build();
    let batch = extract(&mut source, |e| e.static_features())?;

    let is_male = bool_column(&batch, "is_male")?;
    assert_eq!(is_male[0], Some(true));
    assert_eq!(is_male[1], Some(false));

    assert_eq!(bool_column(&batch, "race_white")?[0], Some(true));
    assert_eq!(bool_column(&batch, "race_white")?[4], Some(false));
    assert_eq!(bool_column(&batch, "race_hispanic")?[4], Some(true));
    assert_eq!(bool_column(&batch, "emergency_admission")?[0], Some(true));
    assert_eq!(bool_column(&batch, "emergency_admission")?[4], Some(false));

    let card = bool_column(&batch, "service_any_card_surg")?;
    let noncard = bool_column(&batch, "service_any_noncard_surg")?;
    let trauma = bool_column(&batch, "service_trauma")?;
    assert_eq!(
        (card[0], noncard[0], trauma[0]),
        (Some(true), Some(true), Some(false))
    );
    assert_eq!(
        (card[4], noncard[4], trauma[4]),
        (Some(false), Some(false), Some(true))
    );
    assert_eq!(
        (card[5], noncard[5], trauma[5]),
        (Some(false), Some(false), Some(false))
    );
    Ok(())
}

#[test]
fn test_age_at_admission() -> mimic_features::Result<()> {
    let mut source = fixture().build();
    let batch = extract(&mut source, |e| e.static_features())?;
    let age = batch
        .column_by_name("age")
        .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
        .expect("age column");

    assert_eq!(age.value(0), 52);
    assert_eq!(age.value(1), 0);
    assert_eq!(age.value(5), 60);
    assert_eq!(age.null_count(), 0);
    Ok(())
}
