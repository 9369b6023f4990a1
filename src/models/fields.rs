use serde::{Deserialize, Serialize};

use crate::db::ColumnCodec;
use crate::pipeline::oracle::schema::FromOracleValue;
use crate::pipeline::reducer::Reduce;

/// One reported evaluation result, e.g. `{"name": "MAPE", "value": "3.2%"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: Option<String>,
}

/// Generates `PaperFields` plus the per-field plumbing (merge, column
/// mapping, oracle decoding) so every field carries the same policies.
macro_rules! paper_fields {
    ($( $(#[$meta:meta])* $field:ident : $ty:ty => $column:literal ),+ $(,)?) => {
        /// Persisted attributes of a paper. Every field starts unset.
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct PaperFields {
            $( $(#[$meta])* pub $field: Option<$ty>, )+
        }

        impl PaperFields {
            /// Column / JSON key of every field, in declaration order.
            pub const COLUMNS: &'static [&'static str] = &[$($column),+];

            /// Apply the reducer to every field, including ones the writer
            /// is not expected to own.
            pub fn merge_from(&mut self, incoming: PaperFields) {
                $( self.$field.reduce(incoming.$field); )+
            }

            /// Unset every field whose column is not listed in `keep`.
            pub fn retain_columns(&mut self, keep: &[&str]) {
                $(
                    if !keep.contains(&$column) {
                        self.$field = None;
                    }
                )+
            }

            /// Columns currently holding a value.
            pub fn set_columns(&self) -> Vec<&'static str> {
                let mut set = Vec::new();
                $(
                    if self.$field.is_some() {
                        set.push($column);
                    }
                )+
                set
            }

            /// Decode an oracle JSON object leniently; keys that are missing,
            /// `null`, or of an unusable shape stay unset.
            pub fn from_oracle_object(object: &serde_json::Map<String, serde_json::Value>) -> Self {
                Self {
                    $( $field: object.get($column).and_then(<$ty as FromOracleValue>::from_oracle), )+
                }
            }

            /// SQL values in `COLUMNS` order; unset fields become `NULL`.
            pub fn to_column_values(&self) -> Vec<rusqlite::types::Value> {
                vec![
                    $(
                        match &self.$field {
                            Some(value) => ColumnCodec::to_column(value),
                            None => rusqlite::types::Value::Null,
                        },
                    )+
                ]
            }

            /// Read every field by column name from a `papers` row.
            pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
                Ok(Self {
                    $( $field: crate::db::decode_column::<$ty>(row, $column)?, )+
                })
            }
        }
    };
}

paper_fields! {
    // Bibliographic metadata
    title: String => "title",
    authors: Vec<String> => "authors",
    author_affiliations: Vec<String> => "author_affiliations",
    year: i32 => "year",
    publication_date: String => "publication_date",
    journal: String => "journal",
    publisher: String => "publisher",
    doi: String => "doi",
    keywords: Vec<String> => "keywords",
    #[serde(rename = "abstract")]
    abstract_text: String => "abstract",

    // Research content
    problem_statement: String => "problem_statement",
    proposed_model_name: String => "proposed_model_name",
    methodology: String => "methodology",
    experimental_methods: Vec<String> => "experimental_methods",
    main_findings: String => "main_findings",

    // Critical analysis
    usp: String => "usp",
    limitations: String => "limitations",
    future_work: String => "future_work",

    // Dataset
    dataset_name: String => "dataset_name",
    source_type: String => "source_type",
    granularity_scale: String => "granularity_scale",
    dataset_duration: String => "dataset_duration",
    resolution: String => "resolution",
    num_data_points: String => "num_data_points",
    data_description: String => "data_description",

    // Experimental setup
    train_test_split: String => "train_test_split",
    horizon: String => "horizon",
    features_used: Vec<String> => "features_used",
    data_preprocessing: Vec<String> => "data_preprocessing",
    metrics: Vec<Metric> => "metrics",

    // Reproducibility
    data_availability: String => "data_availability",
    code_availability: String => "code_availability",
}

/// The bibliographic columns completed from the front matter.
pub const METADATA_COLUMNS: &[&str] = &[
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
];

impl PaperFields {
    /// JSON object naming each unset bibliographic column, all `null`.
    pub fn missing_metadata_view(&self) -> serde_json::Value {
        let view: serde_json::Map<String, serde_json::Value> = self
            .unset_metadata_columns()
            .into_iter()
            .map(|column| (column.to_string(), serde_json::Value::Null))
            .collect();
        serde_json::Value::Object(view)
    }

    /// Bibliographic columns that no stage has filled yet.
    pub fn unset_metadata_columns(&self) -> Vec<&'static str> {
        let set = self.set_columns();
        METADATA_COLUMNS
            .iter()
            .copied()
            .filter(|column| !set.contains(column))
            .collect()
    }
}
