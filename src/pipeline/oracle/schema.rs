//! Fixed per-stage response schemas and lenient value decoding.
//!
//! Schema validation is strict about *keys* (a response missing one is a
//! failed call) and lenient about *shapes* (a number where text was asked
//! for is kept as text, a bare string where a list was asked for becomes a
//! one-item list). Unusable shapes leave the field unset.

use serde_json::{Map, Value};

use crate::models::Metric;

/// Keys a stage's JSON response must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageSchema<'k> {
    pub name: &'static str,
    pub keys: &'k [&'static str],
}

pub const METADATA_SCHEMA: StageSchema<'static> = StageSchema {
    name: "metadata",
    keys: &[
        "title",
        "authors",
        "author_affiliations",
        "publication_date",
        "year",
        "journal",
        "publisher",
        "keywords",
        "doi",
        "abstract",
    ],
};

pub const RELEVANCY_SCHEMA: StageSchema<'static> = StageSchema {
    name: "relevancy",
    keys: &["relevancy"],
};

pub const METHODOLOGY_SCHEMA: StageSchema<'static> = StageSchema {
    name: "methodology",
    keys: &["proposed_model_name", "methodology", "usp", "experimental_methods"],
};

pub const ANALYSIS_SCHEMA: StageSchema<'static> = StageSchema {
    name: "analysis",
    keys: &["problem_statement", "main_findings", "limitations", "future_work"],
};

pub const DATASET_SCHEMA: StageSchema<'static> = StageSchema {
    name: "dataset",
    keys: &[
        "dataset_name",
        "source_type",
        "granularity_scale",
        "dataset_duration",
        "num_data_points",
        "data_description",
    ],
};

pub const EXPERIMENTAL_SETUP_SCHEMA: StageSchema<'static> = StageSchema {
    name: "experimental_setup",
    keys: &[
        "train_test_split",
        "horizon",
        "resolution",
        "features_used",
        "data_preprocessing",
        "metrics",
        "data_availability",
        "code_availability",
    ],
};

impl StageSchema<'_> {
    /// The same schema, requiring only `keys`.
    pub fn narrowed<'n>(&self, keys: &'n [&'static str]) -> StageSchema<'n> {
        StageSchema {
            name: self.name,
            keys,
        }
    }

    pub fn missing_keys(&self, object: &Map<String, Value>) -> Vec<String> {
        self.keys
            .iter()
            .filter(|key| !object.contains_key(**key))
            .map(|key| key.to_string())
            .collect()
    }
}

/// Decode one JSON value from an oracle response into a field type.
pub trait FromOracleValue: Sized {
    fn from_oracle(value: &Value) -> Option<Self>;
}

impl FromOracleValue for String {
    fn from_oracle(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(scalar_text)
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
            Value::Null | Value::Object(_) => None,
        }
    }
}

impl FromOracleValue for i32 {
    fn from_oracle(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

impl FromOracleValue for Vec<String> {
    fn from_oracle(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(items.iter().filter_map(scalar_text).collect()),
            Value::String(s) if s.trim().is_empty() => Some(vec![]),
            Value::String(s) => Some(vec![s.clone()]),
            _ => None,
        }
    }
}

impl FromOracleValue for Vec<Metric> {
    fn from_oracle(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => Some(items.iter().filter_map(metric_from_value).collect()),
            _ => None,
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Accepts `{"name", "value"}`, `{"metric", "value"}`, a single-entry
/// `{"MAPE": "3.2%"}` object, or a bare string naming the metric.
fn metric_from_value(value: &Value) -> Option<Metric> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(Metric {
            name: s.clone(),
            value: None,
        }),
        Value::Object(object) => {
            let name = object
                .get("name")
                .or_else(|| object.get("metric"))
                .and_then(scalar_text);
            match name {
                Some(name) => Some(Metric {
                    name,
                    value: object.get("value").and_then(scalar_text),
                }),
                None if object.len() == 1 => object.iter().next().map(|(k, v)| Metric {
                    name: k.clone(),
                    value: scalar_text(v),
                }),
                None => None,
            }
        }
        _ => None,
    }
}
