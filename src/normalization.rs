use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};
use crate::record::YearlyRecord;

/// Per-feature min/max captured once per training run. Required to scale any
/// future input before inference and to rescale model output back to real
/// units, so it travels with the trained model in its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizationParams {
    pub mins: BTreeMap<String, f64>,
    pub maxs: BTreeMap<String, f64>,
}

/// Scan all records and take per-feature min/max. `features` of `None` means
/// every feature present in the records except `year`.
pub fn compute_params(
    records: &[YearlyRecord],
    features: Option<&[String]>,
) -> Result<NormalizationParams> {
    if records.is_empty() {
        return Err(ForecastError::EmptyDataset);
    }

    let features: Vec<String> = match features {
        Some(list) => list.to_vec(),
        None => records
            .iter()
            .flat_map(|r| r.values.keys().cloned())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect(),
    };

    let mut mins = BTreeMap::new();
    let mut maxs = BTreeMap::new();
    for feature in &features {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for record in records {
            if let Some(value) = record.get(feature) {
                min = min.min(value);
                max = max.max(value);
            }
        }
        if min.is_finite() && max.is_finite() {
            mins.insert(feature.clone(), min);
            maxs.insert(feature.clone(), max);
        }
    }

    Ok(NormalizationParams { mins, maxs })
}

/// Map every feature covered by `params` into [0, 1]. A constant feature
/// (max == min) maps to exactly 0 rather than dividing by zero. `year` and
/// features absent from `params` pass through unchanged.
pub fn normalize(records: &[YearlyRecord], params: &NormalizationParams) -> Vec<YearlyRecord> {
    records
        .iter()
        .map(|record| {
            let values = record
                .values
                .iter()
                .map(|(feature, &value)| {
                    let scaled = match (params.mins.get(feature), params.maxs.get(feature)) {
                        (Some(&min), Some(&max)) => scale(value, min, max),
                        _ => value,
                    };
                    (feature.clone(), scaled)
                })
                .collect();
            YearlyRecord {
                year: record.year,
                values,
            }
        })
        .collect()
}

fn scale(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        0.0
    } else {
        (value - min) / (max - min)
    }
}

/// Inverse of the scaling step for a single value.
pub fn denormalize(value: f64, min: f64, max: f64) -> f64 {
    value * (max - min) + min
}

/// Element-wise inverse scaling for a multi-target prediction vector with
/// parallel bound vectors.
pub fn denormalize_vec(values: &[f64], mins: &[f64], maxs: &[f64]) -> Vec<f64> {
    values
        .iter()
        .zip(mins.iter().zip(maxs))
        .map(|(&value, (&min, &max))| denormalize(value, min, max))
        .collect()
}

/// Gather the bounds of `features` as parallel vectors, in feature order.
/// Fails if a requested feature was never covered by the params.
pub fn bounds_for(params: &NormalizationParams, features: &[String]) -> Result<(Vec<f64>, Vec<f64>)> {
    let mut mins = Vec::with_capacity(features.len());
    let mut maxs = Vec::with_capacity(features.len());
    for feature in features {
        match (params.mins.get(feature), params.maxs.get(feature)) {
            (Some(&min), Some(&max)) => {
                mins.push(min);
                maxs.push(max);
            }
            _ => return Err(ForecastError::MissingFeature(feature.clone())),
        }
    }
    Ok((mins, maxs))
}
