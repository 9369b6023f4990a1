pub mod sqlite;
pub mod repository;
pub mod store;

pub use sqlite::*;
pub use repository::*;
pub use store::*;

use rusqlite::types::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid value for {column}: {value}")]
    InvalidValue { column: String, value: String },

    #[error("Migration failed at version {version}: {reason}")]
    MigrationFailed { version: i64, reason: String },

    #[error("Cannot create database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Mapping between a field type and its SQL column representation.
pub trait ColumnCodec: Sized {
    fn to_column(&self) -> Value;

    fn from_column(value: Value) -> Result<Self, String>;
}

impl ColumnCodec for String {
    fn to_column(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_column(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(format!("expected text, found {:?}", other.data_type())),
        }
    }
}

impl ColumnCodec for i32 {
    fn to_column(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_column(value: Value) -> Result<Self, String> {
        match value {
            Value::Integer(i) => i32::try_from(i).map_err(|e| e.to_string()),
            other => Err(format!("expected integer, found {:?}", other.data_type())),
        }
    }
}

/// Lists are stored as JSON text so `[]` stays distinct from `NULL`.
impl<T: Serialize + DeserializeOwned> ColumnCodec for Vec<T> {
    fn to_column(&self) -> Value {
        match serde_json::to_string(self) {
            Ok(json) => Value::Text(json),
            Err(_) => Value::Null,
        }
    }

    fn from_column(value: Value) -> Result<Self, String> {
        match value {
            Value::Text(json) => serde_json::from_str(&json).map_err(|e| e.to_string()),
            other => Err(format!("expected JSON text, found {:?}", other.data_type())),
        }
    }
}

/// Read an optional column by name; `NULL` is `None`.
pub fn decode_column<T: ColumnCodec>(row: &rusqlite::Row<'_>, name: &str) -> rusqlite::Result<Option<T>> {
    let value: Value = row.get(name)?;
    if value == Value::Null {
        return Ok(None);
    }
    let data_type = value.data_type();
    T::from_column(value).map(Some).map_err(|reason| {
        let index = row.as_ref().column_index(name).unwrap_or_default();
        rusqlite::Error::FromSqlConversionFailure(index, data_type, reason.into())
    })
}
