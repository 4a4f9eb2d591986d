use emigration_forecast::error::ForecastError;
use emigration_forecast::normalization;
use emigration_forecast::record::YearlyRecord;

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

#[test]
fn round_trip_restores_original_values() {
    let records = vec![
        rec(2000, &[("male", 1500.0), ("female", 2100.0)]),
        rec(2001, &[("male", 1725.5), ("female", 1980.25)]),
        rec(2002, &[("male", 2050.0), ("female", 2344.75)]),
    ];
    let params = normalization::compute_params(&records, Some(&features(&["male", "female"])))
        .expect("params");
    let normalized = normalization::normalize(&records, &params);

    for (original, scaled) in records.iter().zip(&normalized) {
        for feature in ["male", "female"] {
            let min = params.mins[feature];
            let max = params.maxs[feature];
            let restored = normalization::denormalize(scaled.get(feature).unwrap(), min, max);
            assert!(
                (restored - original.get(feature).unwrap()).abs() < 1e-9,
                "{feature} in {} did not round-trip: {restored}",
                original.year
            );
        }
    }
}

#[test]
fn normalized_values_stay_in_unit_interval() {
    let records = vec![
        rec(2000, &[("male", 10.0)]),
        rec(2001, &[("male", 55.0)]),
        rec(2002, &[("male", 100.0)]),
    ];
    let params = normalization::compute_params(&records, None).expect("params");
    let normalized = normalization::normalize(&records, &params);

    assert_eq!(normalized[0].get("male"), Some(0.0));
    assert_eq!(normalized[2].get("male"), Some(1.0));
    let mid = normalized[1].get("male").unwrap();
    assert!(mid > 0.0 && mid < 1.0);
}

#[test]
fn constant_feature_normalizes_to_zero() {
    let records = vec![
        rec(2000, &[("male", 42.0), ("female", 1.0)]),
        rec(2001, &[("male", 42.0), ("female", 2.0)]),
        rec(2002, &[("male", 42.0), ("female", 3.0)]),
    ];
    let params = normalization::compute_params(&records, None).expect("params");
    let normalized = normalization::normalize(&records, &params);

    for record in &normalized {
        let value = record.get("male").unwrap();
        assert_eq!(value, 0.0, "constant feature must map to exactly 0");
        assert!(value.is_finite());
    }
}

#[test]
fn empty_dataset_is_rejected() {
    let err = normalization::compute_params(&[], None).unwrap_err();
    assert!(matches!(err, ForecastError::EmptyDataset));
}

#[test]
fn feature_absent_from_params_passes_through() {
    let records = vec![
        rec(2000, &[("male", 100.0), ("female", 700.0)]),
        rec(2001, &[("male", 200.0), ("female", 900.0)]),
    ];
    // Params cover male only; female must be left untouched.
    let params =
        normalization::compute_params(&records, Some(&features(&["male"]))).expect("params");
    let normalized = normalization::normalize(&records, &params);

    assert_eq!(normalized[0].get("female"), Some(700.0));
    assert_eq!(normalized[1].get("female"), Some(900.0));
    assert_eq!(normalized[0].year, 2000);
    assert_eq!(normalized[1].year, 2001);
}

#[test]
fn denormalize_vec_is_element_wise() {
    let restored = normalization::denormalize_vec(&[0.0, 0.5, 1.0], &[10.0, 0.0, -5.0], &[20.0, 4.0, 5.0]);
    assert_eq!(restored, vec![10.0, 2.0, 5.0]);
}

#[test]
fn bounds_for_reports_missing_feature() {
    let records = vec![rec(2000, &[("male", 1.0)]), rec(2001, &[("male", 2.0)])];
    let params = normalization::compute_params(&records, None).expect("params");
    let err = normalization::bounds_for(&params, &features(&["female"])).unwrap_err();
    match err {
        ForecastError::MissingFeature(name) => assert_eq!(name, "female"),
        other => panic!("expected MissingFeature, got {other:?}"),
    }
}

#[test]
fn params_serialize_as_parallel_maps() {
    let records = vec![
        rec(2000, &[("male", 5.0)]),
        rec(2001, &[("male", 9.0)]),
    ];
    let params = normalization::compute_params(&records, None).expect("params");
    let json = serde_json::to_value(&params).expect("json");

    assert_eq!(json["mins"]["male"], serde_json::json!(5.0));
    assert_eq!(json["maxs"]["male"], serde_json::json!(9.0));
}
