use emigration_forecast::error::ForecastError;
use emigration_forecast::record::YearlyRecord;
use emigration_forecast::sequence::{self, Target};

fn rec(year: i32, values: &[(&str, f64)]) -> YearlyRecord {
    YearlyRecord {
        year,
        values: values
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect(),
    }
}

fn features(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

fn linear_records(n: usize) -> Vec<YearlyRecord> {
    (0..n)
        .map(|i| {
            rec(
                2000 + i as i32,
                &[("male", i as f64), ("female", 100.0 + i as f64)],
            )
        })
        .collect()
}

#[test]
fn sequence_count_matches_record_count_minus_lookback() {
    let records = linear_records(10);
    let all = features(&["male", "female"]);
    let (sequences, targets) =
        sequence::build_sequences(&records, 3, &all, &all).expect("build");
    assert_eq!(sequences.len(), 7);
    assert_eq!(targets.len(), 7);
}

#[test]
fn windows_are_chronological_and_targets_are_next_step() {
    let records = linear_records(6);
    let inputs = features(&["male"]);
    let target_features = features(&["male"]);
    let (sequences, targets) =
        sequence::build_sequences(&records, 2, &inputs, &target_features).expect("build");

    // First window covers years 2000-2001, target is 2002.
    assert_eq!(sequences[0], vec![vec![0.0], vec![1.0]]);
    assert_eq!(targets[0], Target::Scalar(2.0));
    // Last window covers 2003-2004, target is 2005.
    assert_eq!(sequences.last().unwrap(), &vec![vec![3.0], vec![4.0]]);
    assert_eq!(targets.last().unwrap(), &Target::Scalar(5.0));
}

#[test]
fn oversized_lookback_yields_empty_not_error() {
    let records = linear_records(4);
    let all = features(&["male"]);

    let (sequences, targets) =
        sequence::build_sequences(&records, 4, &all, &all).expect("lookback == n");
    assert!(sequences.is_empty());
    assert!(targets.is_empty());

    let (sequences, _) =
        sequence::build_sequences(&records, 10, &all, &all).expect("lookback > n");
    assert!(sequences.is_empty());
}

#[test]
fn multi_target_preserves_feature_order() {
    let records = linear_records(5);
    let inputs = features(&["male", "female"]);
    let target_features = features(&["female", "male"]);
    let (_, targets) =
        sequence::build_sequences(&records, 2, &inputs, &target_features).expect("build");

    // Target vector order follows the requested target feature order.
    assert_eq!(targets[0], Target::Vector(vec![102.0, 2.0]));
}

#[test]
fn missing_target_feature_is_named_in_error() {
    let mut records = linear_records(5);
    // One record in the middle lacks the female feature entirely.
    records[2].values.remove("female");

    let inputs = features(&["male"]);
    let target_features = features(&["male", "female"]);
    let err = sequence::build_sequences(&records, 2, &inputs, &target_features).unwrap_err();
    match err {
        ForecastError::MissingFeature(name) => assert_eq!(name, "female"),
        other => panic!("expected MissingFeature, got {other:?}"),
    }
}

#[test]
fn missing_input_feature_is_named_in_error() {
    let mut records = linear_records(5);
    records[0].values.remove("male");

    let inputs = features(&["male", "female"]);
    let target_features = features(&["female"]);
    let err = sequence::build_sequences(&records, 2, &inputs, &target_features).unwrap_err();
    assert!(matches!(err, ForecastError::MissingFeature(name) if name == "male"));
}

#[test]
fn scalar_target_to_vec_wraps_single_value() {
    assert_eq!(Target::Scalar(7.5).to_vec(), vec![7.5]);
    assert_eq!(Target::Vector(vec![1.0, 2.0]).to_vec(), vec![1.0, 2.0]);
}
