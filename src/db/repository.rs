use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::DatabaseError;
use crate::models::{DocumentRecord, PaperFields, StoredPaper};

// ═══════════════════════════════════════════
// Paper Repository
// ═══════════════════════════════════════════

/// `INSERT OR REPLACE` over every persisted column, built once from
/// `PaperFields::COLUMNS` so the column list cannot drift from the struct.
static UPSERT_SQL: LazyLock<String> = LazyLock::new(|| {
    let columns: Vec<String> = PaperFields::COLUMNS
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect();
    let placeholders: Vec<String> = (4..4 + columns.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT OR REPLACE INTO papers (path, relevant, processed_at, {}) VALUES (?1, ?2, ?3, {})",
        columns.join(", "),
        placeholders.join(", ")
    )
});

/// Path key stored for a document.
pub fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

pub fn paper_exists(conn: &Connection, path: &Path) -> Result<bool, DatabaseError> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM papers WHERE path = ?1)",
        params![path_key(path)],
        |row| row.get::<_, bool>(0),
    )?;
    Ok(exists)
}

pub fn upsert_paper(
    conn: &Connection,
    record: &DocumentRecord,
    processed_at: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let mut values = vec![
        Value::Text(path_key(record.path())),
        Value::Integer(i64::from(record.is_relevant())),
        Value::Text(processed_at.to_rfc3339()),
    ];
    values.extend(record.fields().to_column_values());

    conn.execute(&UPSERT_SQL, params_from_iter(values))?;
    Ok(())
}

pub fn get_paper(conn: &Connection, path: &Path) -> Result<Option<StoredPaper>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM papers WHERE path = ?1")?;

    let row = stmt
        .query_row(params![path_key(path)], |row| {
            Ok((
                row.get::<_, String>("path")?,
                row.get::<_, bool>("relevant")?,
                row.get::<_, String>("processed_at")?,
                PaperFields::from_row(row)?,
            ))
        })
        .optional()?;

    row.map(|(path, relevant, processed_at, fields)| -> Result<StoredPaper, DatabaseError> {
        Ok(StoredPaper {
            path,
            relevant,
            processed_at: parse_timestamp(&processed_at)?,
            fields,
        })
    })
    .transpose()
}

pub fn list_papers(conn: &Connection) -> Result<Vec<StoredPaper>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT path FROM papers ORDER BY path")?;
    let paths = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut papers = Vec::with_capacity(paths.len());
    for path in paths {
        if let Some(paper) = get_paper(conn, Path::new(&path))? {
            papers.push(paper);
        }
    }
    Ok(papers)
}

pub fn count_papers(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row("SELECT COUNT(*) FROM papers", [], |row| row.get(0))?;
    Ok(count)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::InvalidValue {
            column: "processed_at".into(),
            value: value.into(),
        })
}
