use crate::error::{ForecastError, Result};
use crate::record::YearlyRecord;

/// `lookback` consecutive feature-vectors, oldest first.
pub type Sequence = Vec<Vec<f64>>;

/// Supervised target for one sequence: a scalar in single-target mode, a
/// vector (in target-feature order) when predicting several features jointly.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl Target {
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Target::Scalar(value) => vec![*value],
            Target::Vector(values) => values.clone(),
        }
    }
}

/// Slide a `lookback`-wide window over chronologically sorted records,
/// pairing each window with the next record's target value(s).
///
/// Records must already be sorted ascending by year; this function does not
/// sort. A `lookback >= N` dataset yields an empty result, not an error.
/// A record lacking a required feature is a hard error naming that feature;
/// the normalization run and the sequence build must agree on the schema.
pub fn build_sequences(
    records: &[YearlyRecord],
    lookback: usize,
    input_features: &[String],
    target_features: &[String],
) -> Result<(Vec<Sequence>, Vec<Target>)> {
    let n = records.len();
    if lookback == 0 || n <= lookback {
        return Ok((Vec::new(), Vec::new()));
    }

    let mut sequences = Vec::with_capacity(n - lookback);
    let mut targets = Vec::with_capacity(n - lookback);

    for i in lookback..n {
        let mut window = Vec::with_capacity(lookback);
        for record in &records[i - lookback..i] {
            window.push(feature_row(record, input_features)?);
        }
        let target_row = feature_row(&records[i], target_features)?;
        sequences.push(window);
        targets.push(if target_features.len() == 1 {
            Target::Scalar(target_row[0])
        } else {
            Target::Vector(target_row)
        });
    }

    Ok((sequences, targets))
}

pub(crate) fn feature_row(record: &YearlyRecord, features: &[String]) -> Result<Vec<f64>> {
    features
        .iter()
        .map(|feature| {
            record
                .get(feature)
                .ok_or_else(|| ForecastError::MissingFeature(feature.clone()))
        })
        .collect()
}
