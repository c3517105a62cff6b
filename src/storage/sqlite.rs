//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait
//! and of the crawl-state store.

use crate::crawler::{ContentKind, CrawlSummary};
use crate::extract::{ExtractionRecord, Strategy};
use crate::state::CrawlStateStore;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{DocumentListing, RunRecord, RunStatus, StoredResource};
use crate::HarvestError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, \
     pages, documents, extracted, no_text, failures, rejected";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl SqliteStorage {
    /// Opens (creating if needed) the database at `path`
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(RunStatus::Running),
            pages: row.get::<_, i64>(5)? as u64,
            documents: row.get::<_, i64>(6)? as u64,
            extracted: row.get::<_, i64>(7)? as u64,
            no_text: row.get::<_, i64>(8)? as u64,
            failures: row.get::<_, i64>(9)? as u64,
            rejected: row.get::<_, i64>(10)? as u64,
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                Self::run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &CrawlSummary,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2, pages = ?3, documents = ?4,
             extracted = ?5, no_text = ?6, failures = ?7, rejected = ?8 WHERE id = ?9",
            params![
                status.to_db_string(),
                now,
                summary.pages as i64,
                summary.documents as i64,
                summary.extracted as i64,
                summary.no_text as i64,
                summary.failures as i64,
                summary.rejected as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Resources =====

    fn insert_resource(
        &mut self,
        run_id: Option<i64>,
        resource: &StoredResource,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO resources (run_id, origin, source, path, kind, byte_len, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run_id,
                resource.source.origin(),
                resource.source.to_string(),
                resource.path.to_string_lossy().into_owned(),
                resource.kind.to_db_string(),
                resource.byte_len as i64,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_extraction(
        &mut self,
        resource_id: i64,
        record: &ExtractionRecord,
        text_path: Option<&Path>,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        let char_count = record.text().map(|t| t.chars().count()).unwrap_or(0);
        self.conn.execute(
            "INSERT INTO extractions (resource_id, strategy, text_path, char_count, extracted_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                resource_id,
                record.strategy.to_db_string(),
                text_path.map(|p| p.to_string_lossy().into_owned()),
                char_count as i64,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn list_documents(&self) -> StorageResult<Vec<DocumentListing>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.source, r.path, r.kind, r.byte_len, e.strategy, e.text_path
             FROM resources r
             LEFT JOIN extractions e
                ON e.id = (SELECT MAX(x.id) FROM extractions x WHERE x.resource_id = r.id)
             WHERE r.kind IN ('pdf', 'image')
               AND r.id = (SELECT MAX(r2.id) FROM resources r2 WHERE r2.source = r.source)
             ORDER BY r.source",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (resource_id, source, path, kind, byte_len, strategy, text_path) = row?;

            let kind = ContentKind::from_db_string(&kind)
                .ok_or_else(|| StorageError::Corrupt(format!("unknown kind '{}'", kind)))?;
            let strategy = match strategy {
                Some(s) => Some(
                    Strategy::from_db_string(&s)
                        .ok_or_else(|| StorageError::Corrupt(format!("unknown strategy '{}'", s)))?,
                ),
                None => None,
            };

            documents.push(DocumentListing {
                resource_id,
                source,
                path: PathBuf::from(path),
                kind,
                byte_len: byte_len as u64,
                strategy,
                text_path: text_path.map(PathBuf::from),
            });
        }

        Ok(documents)
    }

    fn count_resources(&self, kind: Option<ContentKind>) -> StorageResult<u64> {
        let count: i64 = match kind {
            Some(kind) => self.conn.query_row(
                "SELECT COUNT(*) FROM resources WHERE kind = ?1",
                params![kind.to_db_string()],
                |row| row.get(0),
            )?,
            None => self
                .conn
                .query_row("SELECT COUNT(*) FROM resources", [], |row| row.get(0))?,
        };
        Ok(count as u64)
    }
}

impl CrawlStateStore for SqliteStorage {
    fn load_last_crawl(&self) -> StorageResult<Option<DateTime<Utc>>> {
        let secs: Option<i64> = self
            .conn
            .query_row(
                "SELECT last_crawl_at FROM crawl_state WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        match secs {
            Some(secs) => DateTime::from_timestamp(secs, 0)
                .map(Some)
                .ok_or_else(|| StorageError::Corrupt(format!("bad timestamp {}", secs))),
            None => Ok(None),
        }
    }

    fn record_success(&mut self, at: DateTime<Utc>) -> StorageResult<()> {
        // One statement, so the record is either the old or the new timestamp.
        self.conn.execute(
            "INSERT INTO crawl_state (id, last_crawl_at) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET last_crawl_at = excluded.last_crawl_at",
            params![at.timestamp()],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ResourceSource;
    use crate::url::normalize;
    use chrono::TimeZone;

    fn pdf_resource(raw: &str, path: &str) -> StoredResource {
        StoredResource {
            source: ResourceSource::Crawled(normalize(raw, None).unwrap()),
            path: PathBuf::from(path),
            kind: ContentKind::Pdf,
            byte_len: 42,
        }
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(storage.get_latest_run().unwrap().is_none());

        let run_id = storage.create_run("hash").unwrap();
        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Running);
        assert!(run.finished_at.is_none());

        let summary = CrawlSummary {
            pages: 5,
            documents: 2,
            extracted: 1,
            no_text: 1,
            failures: 3,
            rejected: 4,
            completed: true,
            ..Default::default()
        };
        storage
            .finish_run(run_id, RunStatus::Completed, &summary)
            .unwrap();

        let latest = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(latest.id, run_id);
        assert_eq!(latest.status, RunStatus::Completed);
        assert_eq!(latest.pages, 5);
        assert_eq!(latest.failures, 3);
        assert_eq!(latest.rejected, 4);
        assert!(latest.finished_at.is_some());
    }

    #[test]
    fn test_missing_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(
            storage.finish_run(99, RunStatus::Completed, &CrawlSummary::default()),
            Err(StorageError::RunNotFound(99))
        ));
    }

    #[test]
    fn test_list_documents_latest_version_and_extraction() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("hash").unwrap();

        let first = pdf_resource("https://example.test/a.pdf", "/data/pdfs/a.pdf");
        let old_id = storage.insert_resource(Some(run_id), &first).unwrap();
        let new_id = storage.insert_resource(Some(run_id), &first).unwrap();
        assert!(new_id > old_id);

        let none = ExtractionRecord::no_text(&first);
        storage.insert_extraction(new_id, &none, Some(Path::new("/data/pdf_text/a.txt"))).unwrap();
        let primary = ExtractionRecord::primary(&first, "hello".to_string());
        storage
            .insert_extraction(new_id, &primary, Some(Path::new("/data/pdf_text/a.txt")))
            .unwrap();

        let untouched = pdf_resource("https://example.test/b.pdf", "/data/pdfs/b.pdf");
        storage.insert_resource(Some(run_id), &untouched).unwrap();

        let html = StoredResource {
            kind: ContentKind::Html,
            ..pdf_resource("https://example.test/index.html", "/data/html/index.html")
        };
        storage.insert_resource(Some(run_id), &html).unwrap();

        let docs = storage.list_documents().unwrap();
        assert_eq!(docs.len(), 2);

        assert_eq!(docs[0].source, "https://example.test/a.pdf");
        assert_eq!(docs[0].resource_id, new_id);
        assert_eq!(docs[0].strategy, Some(Strategy::Primary));
        assert_eq!(docs[0].text_path, Some(PathBuf::from("/data/pdf_text/a.txt")));

        assert_eq!(docs[1].source, "https://example.test/b.pdf");
        assert_eq!(docs[1].strategy, None);

        assert_eq!(storage.count_resources(None).unwrap(), 4);
        assert_eq!(storage.count_resources(Some(ContentKind::Pdf)).unwrap(), 3);
        assert_eq!(storage.count_resources(Some(ContentKind::Html)).unwrap(), 1);
    }

    #[test]
    fn test_upload_resource_has_no_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let upload = StoredResource {
            source: ResourceSource::Upload("letter.pdf".to_string()),
            path: PathBuf::from("/data/uploads/letter.pdf"),
            kind: ContentKind::Pdf,
            byte_len: 1,
        };
        storage.insert_resource(None, &upload).unwrap();

        let docs = storage.list_documents().unwrap();
        assert_eq!(docs[0].source, "upload:letter.pdf");
    }

    #[test]
    fn test_crawl_state_roundtrip() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert_eq!(storage.load_last_crawl().unwrap(), None);

        let t0 = Utc.with_ymd_and_hms(2026, 1, 15, 8, 30, 0).unwrap();
        storage.record_success(t0).unwrap();
        assert_eq!(storage.load_last_crawl().unwrap(), Some(t0));

        let t1 = Utc.with_ymd_and_hms(2026, 2, 15, 8, 30, 0).unwrap();
        storage.record_success(t1).unwrap();
        assert_eq!(storage.load_last_crawl().unwrap(), Some(t1));
    }

    #[test]
    fn test_crawl_state_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("nested").join("harvest.db");
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

        {
            let mut storage = SqliteStorage::new(&db).unwrap();
            storage.record_success(t0).unwrap();
        }

        let storage = SqliteStorage::new(&db).unwrap();
        assert_eq!(storage.load_last_crawl().unwrap(), Some(t0));
    }
}
