use emigration_forecast::error::ForecastError;
use emigration_forecast::metrics;

const TOL: f64 = 1e-9;

#[test]
fn perfect_prediction_on_constant_series() {
    let m = metrics::evaluate(&[5.0, 5.0, 5.0], &[5.0, 5.0, 5.0]).expect("evaluate");
    assert_eq!(m.mae, 0.0);
    assert_eq!(m.rmse, 0.0);
    assert_eq!(m.mape, 0.0);
    assert_eq!(m.accuracy, 100.0);
    // SS_tot is zero on a constant series, so r2 is undefined, not 1.0.
    assert_eq!(m.r2, None);
}

#[test]
fn known_error_values() {
    let m = metrics::evaluate(&[10.0, 20.0, 30.0], &[12.0, 18.0, 33.0]).expect("evaluate");
    assert!((m.mae - 7.0 / 3.0).abs() < TOL, "mae was {}", m.mae);
    assert!((m.rmse - (17.0_f64 / 3.0).sqrt()).abs() < TOL, "rmse was {}", m.rmse);
    // (2/10 + 2/20 + 3/30) / 3 * 100
    assert!((m.mape - 40.0 / 3.0).abs() < TOL, "mape was {}", m.mape);
    assert!((m.accuracy - (100.0 - 40.0 / 3.0)).abs() < TOL);
    // mean = 20, SS_tot = 200, SS_res = 17
    let r2 = m.r2.expect("r2 defined");
    assert!((r2 - (1.0 - 17.0 / 200.0)).abs() < TOL, "r2 was {r2}");
}

#[test]
fn zero_actual_terms_contribute_nothing_to_mape() {
    // Known approximation kept for compatibility: a zero actual contributes a
    // zero term while still counting in the denominator, understating MAPE.
    let m = metrics::evaluate(&[0.0, 10.0], &[5.0, 15.0]).expect("evaluate");
    assert!((m.mape - 25.0).abs() < TOL, "mape was {}", m.mape);
    assert!((m.mae - 5.0).abs() < TOL);
}

#[test]
fn accuracy_is_floored_at_zero() {
    let m = metrics::evaluate(&[1.0, 1.0], &[5.0, 5.0]).expect("evaluate");
    assert!((m.mape - 400.0).abs() < TOL);
    assert_eq!(m.accuracy, 0.0);
}

#[test]
fn empty_or_mismatched_inputs_are_rejected() {
    assert!(matches!(
        metrics::evaluate(&[], &[]).unwrap_err(),
        ForecastError::EmptyOrMismatchedInput
    ));
    assert!(matches!(
        metrics::evaluate(&[1.0, 2.0], &[1.0]).unwrap_err(),
        ForecastError::EmptyOrMismatchedInput
    ));
}

#[test]
fn multi_target_report_averages_each_metric() {
    let names = vec!["male".to_string(), "female".to_string()];
    let actual = vec![vec![10.0, 20.0], vec![100.0, 200.0]];
    let predicted = vec![vec![12.0, 22.0], vec![100.0, 200.0]];
    let report = metrics::evaluate_multi(&names, &actual, &predicted).expect("evaluate");

    assert_eq!(report.targets.len(), 2);
    assert!((report.targets["male"].mae - 2.0).abs() < TOL);
    assert_eq!(report.targets["female"].mae, 0.0);
    assert!((report.overall.mae - 1.0).abs() < TOL);
    assert!((report.overall.accuracy
        - (report.targets["male"].accuracy + report.targets["female"].accuracy) / 2.0)
        .abs()
        < TOL);
}

#[test]
fn overall_r2_averages_only_defined_values() {
    let names = vec!["varying".to_string(), "constant".to_string()];
    let actual = vec![vec![10.0, 20.0, 30.0], vec![7.0, 7.0, 7.0]];
    let predicted = vec![vec![12.0, 18.0, 33.0], vec![7.0, 7.0, 7.0]];
    let report = metrics::evaluate_multi(&names, &actual, &predicted).expect("evaluate");

    assert_eq!(report.targets["constant"].r2, None);
    let varying_r2 = report.targets["varying"].r2.expect("defined");
    assert_eq!(report.overall.r2, Some(varying_r2));
}

#[test]
fn mismatched_target_counts_are_rejected() {
    let names = vec!["male".to_string()];
    let err = metrics::evaluate_multi(&names, &[], &[]).unwrap_err();
    assert!(matches!(err, ForecastError::EmptyOrMismatchedInput));
}
