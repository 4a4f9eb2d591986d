use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// Error metrics over parallel actual/predicted series.
///
/// `r2` is `None` when the actual series is constant (`SS_tot == 0`), where
/// the coefficient of determination is undefined; callers get a typed absent
/// value instead of a NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub mae: f64,
    pub rmse: f64,
    pub mape: f64,
    pub r2: Option<f64>,
    pub accuracy: f64,
}

/// Per-target metrics for a training run plus an arithmetic-mean summary
/// across targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub targets: BTreeMap<String, Metrics>,
    pub overall: Metrics,
}

/// Evaluate one actual/predicted pair.
///
/// MAPE terms with a zero actual contribute 0 error while still counting in
/// the denominator. That understates MAPE on sparse series; it is kept as-is
/// for compatibility with the reference behavior.
pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Result<Metrics> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return Err(ForecastError::EmptyOrMismatchedInput);
    }

    let n = actual.len() as f64;
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut pct_sum = 0.0;
    for (&a, &p) in actual.iter().zip(predicted) {
        let error = a - p;
        abs_sum += error.abs();
        sq_sum += error * error;
        if a != 0.0 {
            pct_sum += error.abs() / a;
        }
    }

    let mae = abs_sum / n;
    let rmse = (sq_sum / n).sqrt();
    let mape = 100.0 * pct_sum / n;
    let accuracy = (100.0 - mape).max(0.0);

    let mean = actual.iter().sum::<f64>() / n;
    let ss_tot: f64 = actual.iter().map(|&a| (a - mean) * (a - mean)).sum();
    let r2 = if ss_tot == 0.0 {
        None
    } else {
        Some(1.0 - sq_sum / ss_tot)
    };

    Ok(Metrics {
        mae,
        rmse,
        mape,
        r2,
        accuracy,
    })
}

/// Evaluate a multi-target model: metrics per target plus the arithmetic mean
/// of each metric across targets. The overall `r2` averages only the defined
/// per-target values and is `None` when none are defined.
pub fn evaluate_multi(
    names: &[String],
    actual: &[Vec<f64>],
    predicted: &[Vec<f64>],
) -> Result<TrainingReport> {
    if names.is_empty() || names.len() != actual.len() || names.len() != predicted.len() {
        return Err(ForecastError::EmptyOrMismatchedInput);
    }

    let mut targets = BTreeMap::new();
    for ((name, a), p) in names.iter().zip(actual).zip(predicted) {
        targets.insert(name.clone(), evaluate(a, p)?);
    }

    let count = targets.len() as f64;
    let r2_values: Vec<f64> = targets.values().filter_map(|m| m.r2).collect();
    let overall = Metrics {
        mae: targets.values().map(|m| m.mae).sum::<f64>() / count,
        rmse: targets.values().map(|m| m.rmse).sum::<f64>() / count,
        mape: targets.values().map(|m| m.mape).sum::<f64>() / count,
        r2: if r2_values.is_empty() {
            None
        } else {
            Some(r2_values.iter().sum::<f64>() / r2_values.len() as f64)
        },
        accuracy: targets.values().map(|m| m.accuracy).sum::<f64>() / count,
    };

    Ok(TrainingReport { targets, overall })
}
