//! Directory driver: runs every PDF in a folder through the pipeline and
//! persists the relevant ones.
//!
//! Uses trait-based DI for the engine's collaborators and the store, so the
//! driver stays fully testable with mock implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::config::AppConfig;
use crate::db::{DatabaseError, PaperStore, SqlitePaperStore};
use crate::models::DocumentRecord;
use crate::pipeline::engine::{Collaborators, PipelineEngine, PipelineError};
use crate::pipeline::extraction::{ExtractionError, PdfiumExtractor, VisionOcr};
use crate::pipeline::oracle::{OllamaClient, OracleError};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that stop a batch. Per-document pipeline failures are not here;
/// they are counted in the [`BatchSummary`].
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Cannot read papers directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("PDF backend unavailable: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Oracle client setup failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("Pipeline construction failed: {0}")]
    Pipeline(#[from] PipelineError),
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Already in the store; the pipeline was not run.
    SkippedExisting,
    /// Relevant and written to the store.
    Persisted,
    /// Judged not relevant; nothing written.
    Discarded,
    /// The pipeline aborted on this document.
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentOutcome {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: DocumentStatus,
}

/// Counts for one directory pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub persisted: usize,
    pub discarded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchSummary {
    fn record(&mut self, outcome: DocumentOutcome) {
        self.total += 1;
        match outcome.status {
            DocumentStatus::SkippedExisting => self.skipped += 1,
            DocumentStatus::Persisted => self.persisted += 1,
            DocumentStatus::Discarded => self.discarded += 1,
            DocumentStatus::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }
}

// ---------------------------------------------------------------------------
// Processor
// ---------------------------------------------------------------------------

/// Drives documents through the engine one at a time and persists the
/// relevant records.
pub struct DocumentProcessor {
    engine: PipelineEngine,
    store: Box<dyn PaperStore>,
}

impl DocumentProcessor {
    pub fn new(engine: PipelineEngine, store: Box<dyn PaperStore>) -> Self {
        Self { engine, store }
    }

    /// Process every `*.pdf` in `dir` (not recursive), in path order.
    ///
    /// Unreadable documents are logged and counted; a store failure stops
    /// the batch.
    pub fn process_directory(&self, dir: &Path) -> Result<BatchSummary, ProcessingError> {
        if !dir.is_dir() {
            return Err(ProcessingError::NotADirectory(dir.to_path_buf()));
        }
        let _span = tracing::info_span!("process_directory", dir = %dir.display()).entered();

        let papers = list_pdfs(dir)?;
        tracing::info!(count = papers.len(), "Found PDF files");

        let mut summary = BatchSummary::default();
        for path in papers {
            let outcome = self.process_file(&path)?;
            summary.record(outcome);
        }

        tracing::info!(
            total = summary.total,
            persisted = summary.persisted,
            discarded = summary.discarded,
            skipped = summary.skipped,
            failed = summary.failed,
            "Batch complete"
        );
        Ok(summary)
    }

    /// Process one document: skip if stored, otherwise run the pipeline and
    /// persist it when relevant.
    pub fn process_file(&self, path: &Path) -> Result<DocumentOutcome, ProcessingError> {
        if self.store.exists(path)? {
            tracing::info!(path = %path.display(), "Already processed, skipping");
            return Ok(DocumentOutcome {
                path: path.to_path_buf(),
                status: DocumentStatus::SkippedExisting,
            });
        }

        let status = match self.engine.run(DocumentRecord::new(path)) {
            Ok(record) if record.is_relevant() => {
                self.store.upsert(&record)?;
                tracing::info!(path = %path.display(), "Paper persisted");
                DocumentStatus::Persisted
            }
            Ok(_) => {
                tracing::info!(path = %path.display(), "Paper not relevant, discarded");
                DocumentStatus::Discarded
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Paper processing failed");
                DocumentStatus::Failed {
                    reason: e.to_string(),
                }
            }
        };

        Ok(DocumentOutcome {
            path: path.to_path_buf(),
            status,
        })
    }
}

/// Regular files in `dir` with a `.pdf` extension (any case), sorted.
fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>, ProcessingError> {
    let mut papers = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_pdf = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            papers.push(path);
        }
    }
    papers.sort();
    Ok(papers)
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Build a `DocumentProcessor` with production implementations.
///
/// - Text and page images: `PdfiumExtractor`
/// - OCR: `VisionOcr` over the configured vision model
/// - Oracle: `OllamaClient`
/// - Store: `SqlitePaperStore` at `config.db_path`
pub fn build_processor(config: &AppConfig) -> Result<DocumentProcessor, ProcessingError> {
    let pdfium = Arc::new(PdfiumExtractor::new()?);
    let ollama = Arc::new(OllamaClient::new(
        &config.ollama_url,
        &config.model,
        config.timeout_secs,
    )?);

    match ollama.is_model_available(&config.model) {
        Ok(true) => {}
        Ok(false) => tracing::warn!(model = %config.model, "Model not pulled in Ollama"),
        Err(e) => tracing::warn!(error = %e, "Could not query Ollama models"),
    }
    tracing::info!(
        model = %config.model,
        vision_model = %config.vision_model,
        scope = %config.scope.name,
        "Document processor using Ollama"
    );

    let ocr = Arc::new(VisionOcr::new(ollama.clone(), config.vision_model.clone()));
    let engine = PipelineEngine::standard(
        Collaborators {
            extractor: pdfium.clone(),
            renderer: pdfium,
            ocr,
            oracle: ollama,
        },
        config.scope.clone(),
    )?;
    let store = SqlitePaperStore::open(&config.db_path)?;

    Ok(DocumentProcessor::new(engine, Box::new(store)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::pipeline::extraction::{MockOcrEngine, MockPageRenderer, MockTextExtractor};
    use crate::pipeline::oracle::prompts::{TASK_METADATA, TASK_RELEVANCY};
    use crate::pipeline::oracle::{MockOracle, ResearchScope};

    const PAGE: &str = "Title\nAbstract\nWe forecast load.\nKeywords: load\n1. Introduction\nBody.";

    /// In-memory store that shares its rows with the test.
    #[derive(Clone, Default)]
    struct SharedStore {
        rows: Arc<Mutex<Vec<DocumentRecord>>>,
        fail_upserts: bool,
    }

    impl SharedStore {
        fn paths(&self) -> Vec<PathBuf> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.path().to_path_buf())
                .collect()
        }
    }

    impl PaperStore for SharedStore {
        fn exists(&self, path: &Path) -> Result<bool, DatabaseError> {
            Ok(self.rows.lock().unwrap().iter().any(|r| r.path() == path))
        }

        fn upsert(&self, record: &DocumentRecord) -> Result<(), DatabaseError> {
            if self.fail_upserts {
                return Err(DatabaseError::InvalidValue {
                    column: "path".into(),
                    value: "disk full".into(),
                });
            }
            self.rows.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    fn metadata(abstract_text: &str) -> String {
        format!(
            r#"{{"title": null, "authors": null, "author_affiliations": null,
                "publication_date": null, "year": null, "journal": null, "publisher": null,
                "keywords": null, "doi": null, "abstract": "{abstract_text}"}}"#
        )
    }

    /// Off-topic bodies get an abstract the relevancy rule rejects.
    /// Analysis branches fall through to `{}` and fail their schema.
    fn oracle() -> MockOracle {
        MockOracle::new()
            .respond_when("Unrelated abstract", r#"{"relevancy": false}"#)
            .respond_when(TASK_RELEVANCY, r#"{"relevancy": true}"#)
            .respond_when("An off-topic study", &metadata("Unrelated abstract"))
            .respond_when(TASK_METADATA, &metadata("We forecast load."))
            .with_fallback("{}")
    }

    fn processor(extractor: MockTextExtractor, store: SharedStore) -> DocumentProcessor {
        let engine = PipelineEngine::standard(
            Collaborators {
                extractor: Arc::new(extractor),
                renderer: Arc::new(MockPageRenderer::new()),
                ocr: Arc::new(MockOcrEngine::new("")),
                oracle: Arc::new(oracle()),
            },
            ResearchScope::default(),
        )
        .unwrap();
        DocumentProcessor::new(engine, Box::new(store))
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"%PDF-1.7").unwrap();
        path
    }

    #[test]
    fn directory_pass_counts_every_outcome() {
        let tmp = tempfile::tempdir().unwrap();
        let relevant = touch(tmp.path(), "a.pdf");
        let off_topic = touch(tmp.path(), "b.PDF");
        let corrupt = touch(tmp.path(), "c.pdf");
        touch(tmp.path(), "notes.txt");

        let off_page = PAGE.replace("We forecast load.", "An off-topic study.");
        let extractor = MockTextExtractor::new()
            .with_pages(&relevant, None, &[PAGE])
            .with_pages(&off_topic, None, &[off_page.as_str()]);

        let store = SharedStore::default();
        let summary = processor(extractor, store.clone())
            .process_directory(tmp.path())
            .unwrap();

        assert_eq!(summary.total, 3);
        assert_eq!(summary.persisted, 1);
        assert_eq!(summary.discarded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(store.paths(), vec![relevant]);

        let failed = &summary.outcomes[2];
        assert_eq!(failed.path, corrupt);
        assert!(matches!(failed.status, DocumentStatus::Failed { .. }));
    }

    #[test]
    fn stored_papers_are_skipped_without_running_the_pipeline() {
        let tmp = tempfile::tempdir().unwrap();
        let path = touch(tmp.path(), "a.pdf");

        let store = SharedStore::default();
        store.rows.lock().unwrap().push(DocumentRecord::new(&path));

        let extractor = MockTextExtractor::new().with_pages(&path, None, &[PAGE]);
        let summary = processor(extractor, store.clone())
            .process_directory(tmp.path())
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.outcomes[0].status, DocumentStatus::SkippedExisting);
        assert_eq!(store.paths().len(), 1);
    }

    #[test]
    fn pdfs_are_processed_in_path_order() {
        let tmp = tempfile::tempdir().unwrap();
        let names = ["c.pdf", "a.pdf", "b.pdf"];
        let mut extractor = MockTextExtractor::new();
        for name in names {
            let path = touch(tmp.path(), name);
            extractor = extractor.with_pages(&path, None, &[PAGE]);
        }

        let summary = processor(extractor, SharedStore::default())
            .process_directory(tmp.path())
            .unwrap();
        let order: Vec<_> = summary
            .outcomes
            .iter()
            .map(|o| o.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(order, vec!["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn subdirectories_named_like_pdfs_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("folder.pdf")).unwrap();
        let pdfs = list_pdfs(tmp.path()).unwrap();
        assert!(pdfs.is_empty());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        let err = processor(MockTextExtractor::new(), SharedStore::default())
            .process_directory(&missing)
            .unwrap_err();
        assert!(matches!(err, ProcessingError::NotADirectory(p) if p == missing));
    }

    #[test]
    fn store_failure_stops_the_batch() {
        let tmp = tempfile::tempdir().unwrap();
        let path = touch(tmp.path(), "a.pdf");
        let store = SharedStore {
            fail_upserts: true,
            ..SharedStore::default()
        };
        let extractor = MockTextExtractor::new().with_pages(&path, None, &[PAGE]);

        let err = processor(extractor, store)
            .process_directory(tmp.path())
            .unwrap_err();
        assert!(matches!(err, ProcessingError::Database(_)));
    }

    #[test]
    fn relevant_paper_lands_in_sqlite() {
        let tmp = tempfile::tempdir().unwrap();
        let path = touch(tmp.path(), "a.pdf");
        let db_path = tmp.path().join("db").join("papers.db");

        let engine = PipelineEngine::standard(
            Collaborators {
                extractor: Arc::new(MockTextExtractor::new().with_pages(&path, Some("Seeded"), &[PAGE])),
                renderer: Arc::new(MockPageRenderer::new()),
                ocr: Arc::new(MockOcrEngine::new("")),
                oracle: Arc::new(oracle()),
            },
            ResearchScope::default(),
        )
        .unwrap();
        let processor = DocumentProcessor::new(
            engine,
            Box::new(SqlitePaperStore::open(&db_path).unwrap()),
        );

        let outcome = processor.process_file(&path).unwrap();
        assert_eq!(outcome.status, DocumentStatus::Persisted);

        let store = SqlitePaperStore::open(&db_path).unwrap();
        let stored = store.get(&path).unwrap().unwrap();
        assert!(stored.relevant);
        assert_eq!(stored.fields.title.as_deref(), Some("Seeded"));

        // Second pass skips it
        let again = processor.process_file(&path).unwrap();
        assert_eq!(again.status, DocumentStatus::SkippedExisting);
    }

    #[test]
    fn summary_serializes_with_status_tags() {
        let mut summary = BatchSummary::default();
        summary.record(DocumentOutcome {
            path: "x.pdf".into(),
            status: DocumentStatus::Failed {
                reason: "not a PDF".into(),
            },
        });
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains(r#""status":"failed""#));
        assert!(json.contains("not a PDF"));
        assert_eq!(summary.failed, 1);
    }
}
