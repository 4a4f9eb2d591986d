use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Loosely-typed row as delivered by the record store. Cleaning is the only
/// place this shape is allowed to cross into the core.
pub type RawRecord = serde_json::Map<String, Value>;

/// One cleaned record per year per dataset category. The feature set varies
/// by category (e.g. {male, female} for the sex dataset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyRecord {
    pub year: i32,
    #[serde(flatten)]
    pub values: BTreeMap<String, f64>,
}

impl YearlyRecord {
    pub fn get(&self, feature: &str) -> Option<f64> {
        self.values.get(feature).copied()
    }
}

/// Dataset categories of the emigration statistics, with their fixed feature
/// schemas. The all-countries dataset is keyed by ISO3 code and has no fixed
/// schema; its feature list is inferred from the data instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetCategory {
    Sex,
    AgeGroup,
    CivilStatus,
    Education,
    Occupation,
    PlaceOfOrigin,
    MajorDestination,
    AllCountries,
}

impl DatasetCategory {
    pub const ALL: [DatasetCategory; 8] = [
        DatasetCategory::Sex,
        DatasetCategory::AgeGroup,
        DatasetCategory::CivilStatus,
        DatasetCategory::Education,
        DatasetCategory::Occupation,
        DatasetCategory::PlaceOfOrigin,
        DatasetCategory::MajorDestination,
        DatasetCategory::AllCountries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetCategory::Sex => "sex",
            DatasetCategory::AgeGroup => "age",
            DatasetCategory::CivilStatus => "civil-status",
            DatasetCategory::Education => "education",
            DatasetCategory::Occupation => "occupation",
            DatasetCategory::PlaceOfOrigin => "place-of-origin",
            DatasetCategory::MajorDestination => "major-destination",
            DatasetCategory::AllCountries => "all-countries",
        }
    }

    /// Fixed feature schema, or `None` for the dynamic all-countries dataset.
    pub fn features(&self) -> Option<&'static [&'static str]> {
        match self {
            DatasetCategory::Sex => Some(&["male", "female"]),
            DatasetCategory::AgeGroup => Some(&[
                "age_0_14", "age_15_19", "age_20_24", "age_25_29", "age_30_34", "age_35_39",
                "age_40_44", "age_45_49", "age_50_54", "age_55_59", "age_60_64", "age_65_over",
            ]),
            DatasetCategory::CivilStatus => Some(&[
                "single", "married", "widowed", "separated", "divorced", "not_reported",
            ]),
            DatasetCategory::Education => Some(&[
                "elementary", "high_school", "vocational", "college", "postgraduate",
                "not_reported",
            ]),
            DatasetCategory::Occupation => Some(&[
                "professional", "managerial", "clerical", "sales", "service", "agriculture",
                "production", "housewife", "student", "minor", "no_occupation",
            ]),
            DatasetCategory::PlaceOfOrigin => Some(&[
                "region_i", "region_ii", "region_iii", "region_iv", "region_v", "region_vi",
                "region_vii", "region_viii", "region_ix", "region_x", "region_xi", "region_xii",
                "region_xiii", "ncr", "car", "armm",
            ]),
            DatasetCategory::MajorDestination => Some(&[
                "usa", "canada", "japan", "australia", "italy", "new_zealand",
                "united_kingdom", "germany", "south_korea", "spain", "others",
            ]),
            DatasetCategory::AllCountries => None,
        }
    }
}

impl FromStr for DatasetCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        DatasetCategory::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown dataset category `{s}`"))
    }
}

/// Coerce every known feature of every raw record to a number, zero-filling
/// anything that fails conversion. Total over arbitrary input; never errors.
/// Training-time feature mismatches are caught later by the sequence builder,
/// which is deliberately intolerant where this function is lenient.
pub fn clean(raw: &[RawRecord], features: &[String]) -> Vec<YearlyRecord> {
    raw.iter()
        .map(|record| {
            let mut values = BTreeMap::new();
            for feature in features {
                values.insert(feature.clone(), coerce_number(record.get(feature)));
            }
            YearlyRecord {
                year: coerce_year(record.get("year")),
                values,
            }
        })
        .collect()
}

/// Sorted union of every key except `year`, for datasets without a fixed
/// schema (all countries by ISO3).
pub fn infer_features(raw: &[RawRecord]) -> Vec<String> {
    let mut keys = BTreeSet::new();
    for record in raw {
        for key in record.keys() {
            if key != "year" {
                keys.insert(key.clone());
            }
        }
    }
    keys.into_iter().collect()
}

fn coerce_number(value: Option<&Value>) -> f64 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if number.is_finite() {
        number
    } else {
        0.0
    }
}

fn coerce_year(value: Option<&Value>) -> i32 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0) as i32,
        Some(Value::String(s)) => s.trim().parse::<i32>().unwrap_or(0),
        _ => 0,
    }
}
