use std::path::Path;

use chrono::Utc;
use rusqlite::Connection;

use super::repository;
use super::sqlite::{open_database, open_memory_database, reset_database};
use super::DatabaseError;
use crate::models::{DocumentRecord, StoredPaper};

/// Persistence boundary used by the document processor.
pub trait PaperStore: Send {
    fn exists(&self, path: &Path) -> Result<bool, DatabaseError>;

    /// Insert or replace the record's row, stamped with the current time.
    fn upsert(&self, record: &DocumentRecord) -> Result<(), DatabaseError>;
}

/// SQLite-backed paper store. One connection, used from one thread.
pub struct SqlitePaperStore {
    conn: Connection,
}

impl SqlitePaperStore {
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: open_database(path)?,
        })
    }

    pub fn in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: open_memory_database()?,
        })
    }

    pub fn get(&self, path: &Path) -> Result<Option<StoredPaper>, DatabaseError> {
        repository::get_paper(&self.conn, path)
    }

    pub fn list(&self) -> Result<Vec<StoredPaper>, DatabaseError> {
        repository::list_papers(&self.conn)
    }

    pub fn count(&self) -> Result<i64, DatabaseError> {
        repository::count_papers(&self.conn)
    }

    /// Drop all stored papers and recreate the schema.
    pub fn reset(&self) -> Result<(), DatabaseError> {
        reset_database(&self.conn)
    }
}

impl PaperStore for SqlitePaperStore {
    fn exists(&self, path: &Path) -> Result<bool, DatabaseError> {
        repository::paper_exists(&self.conn, path)
    }

    fn upsert(&self, record: &DocumentRecord) -> Result<(), DatabaseError> {
        repository::upsert_paper(&self.conn, record, Utc::now())?;
        tracing::debug!(path = %record.path().display(), "Paper stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperFields;

    #[test]
    fn upsert_then_exists_and_get() {
        let store = SqlitePaperStore::in_memory().unwrap();
        let mut record = DocumentRecord::new("a.pdf");
        record.record_relevance(true);
        record.merge_fields(PaperFields {
            title: Some("T".into()),
            ..Default::default()
        });

        assert!(!store.exists(Path::new("a.pdf")).unwrap());
        store.upsert(&record).unwrap();
        assert!(store.exists(Path::new("a.pdf")).unwrap());

        let stored = store.get(Path::new("a.pdf")).unwrap().unwrap();
        assert_eq!(stored.fields.title.as_deref(), Some("T"));
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn reset_empties_the_store() {
        let store = SqlitePaperStore::in_memory().unwrap();
        let mut record = DocumentRecord::new("a.pdf");
        record.record_relevance(true);
        store.upsert(&record).unwrap();

        store.reset().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn on_disk_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("papers.db");
        {
            let store = SqlitePaperStore::open(&db_path).unwrap();
            let mut record = DocumentRecord::new("a.pdf");
            record.record_relevance(true);
            store.upsert(&record).unwrap();
        }
        let reopened = SqlitePaperStore::open(&db_path).unwrap();
        assert!(reopened.exists(Path::new("a.pdf")).unwrap());
    }
}
