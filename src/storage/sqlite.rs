//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the TenderStore trait.

use crate::model::{Tender, TenderDocument, TenderHeader, TenderItem};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{StorageError, StorageResult, TenderStore};
use crate::storage::{StoreStats, TenderRecord};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// How long a writer waits for a database lock held by another connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const TENDER_COLUMNS: &str = "id, external_id, url, location, issuing_body, purchasing_unit, \
    modality, legal_basis, tender_type, dispute_mode, price_registry, budget_source, \
    published_at, status, proposals_open, proposals_close, source, object_text, \
    total_estimated_value, captured_at";

/// SQLite tender store
///
/// The connection sits behind a mutex: every call, reads included, holds it for
/// its whole duration.
pub struct SqliteTenderStore {
    conn: Mutex<Connection>,
}

impl SqliteTenderStore {
    /// Opens or creates the database at `path`
    ///
    /// Missing parent directories are created.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_schema(&conn)?;

        tracing::debug!("Opened tender store at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn tender_from_row(row: &Row<'_>) -> rusqlite::Result<TenderRecord> {
    Ok(TenderRecord {
        id: row.get(0)?,
        tender: Tender {
            external_id: row.get(1)?,
            url: row.get(2)?,
            header: TenderHeader {
                location: row.get(3)?,
                issuing_body: row.get(4)?,
                purchasing_unit: row.get(5)?,
                modality: row.get(6)?,
                legal_basis: row.get(7)?,
                tender_type: row.get(8)?,
                dispute_mode: row.get(9)?,
                price_registry: row.get(10)?,
                budget_source: row.get(11)?,
                published_at: row.get(12)?,
                status: row.get(13)?,
                proposals_open: row.get(14)?,
                proposals_close: row.get(15)?,
                source: row.get(16)?,
            },
            object_text: row.get(17)?,
            total_estimated_value: row.get(18)?,
            captured_at: row.get(19)?,
        },
    })
}

fn ensure_tender(conn: &Connection, tender_id: i64) -> StorageResult<()> {
    let exists = conn
        .query_row(
            "SELECT 1 FROM tenders WHERE id = ?1",
            params![tender_id],
            |_| Ok(()),
        )
        .optional()?;
    exists.ok_or(StorageError::TenderNotFound(tender_id))
}

fn count(conn: &Connection, table: &str) -> StorageResult<u64> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    Ok(count as u64)
}

impl TenderStore for SqliteTenderStore {
    fn upsert(&self, tender: &Tender) -> StorageResult<i64> {
        let conn = self.lock()?;
        let header = &tender.header;
        let id = conn.query_row(
            "INSERT INTO tenders (
                external_id, url, location, issuing_body, purchasing_unit, modality,
                legal_basis, tender_type, dispute_mode, price_registry, budget_source,
                published_at, status, proposals_open, proposals_close, source,
                object_text, total_estimated_value, captured_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            ON CONFLICT(external_id) DO UPDATE SET
                url = excluded.url,
                location = excluded.location,
                issuing_body = excluded.issuing_body,
                purchasing_unit = excluded.purchasing_unit,
                modality = excluded.modality,
                legal_basis = excluded.legal_basis,
                tender_type = excluded.tender_type,
                dispute_mode = excluded.dispute_mode,
                price_registry = excluded.price_registry,
                budget_source = excluded.budget_source,
                published_at = excluded.published_at,
                status = excluded.status,
                proposals_open = excluded.proposals_open,
                proposals_close = excluded.proposals_close,
                source = excluded.source,
                object_text = excluded.object_text,
                total_estimated_value = excluded.total_estimated_value,
                captured_at = excluded.captured_at
            RETURNING id",
            params![
                tender.external_id,
                tender.url,
                header.location,
                header.issuing_body,
                header.purchasing_unit,
                header.modality,
                header.legal_basis,
                header.tender_type,
                header.dispute_mode,
                header.price_registry,
                header.budget_source,
                header.published_at,
                header.status,
                header.proposals_open,
                header.proposals_close,
                header.source,
                tender.object_text,
                tender.total_estimated_value,
                tender.captured_at,
            ],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn replace_items(&self, tender_id: i64, items: &[TenderItem]) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        ensure_tender(&tx, tender_id)?;

        tx.execute(
            "DELETE FROM tender_items WHERE tender_id = ?1",
            params![tender_id],
        )?;
        {
            let now = Utc::now();
            let mut stmt = tx.prepare(
                "INSERT INTO tender_items
                    (tender_id, item_number, description, quantity, unit_value, total_value, captured_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for item in items {
                stmt.execute(params![
                    tender_id,
                    item.number,
                    item.description,
                    item.quantity,
                    item.unit_value,
                    item.total_value,
                    now,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn replace_documents(
        &self,
        tender_id: i64,
        documents: &[TenderDocument],
    ) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        ensure_tender(&tx, tender_id)?;

        tx.execute(
            "DELETE FROM tender_documents WHERE tender_id = ?1",
            params![tender_id],
        )?;
        {
            let now = Utc::now();
            let mut stmt = tx.prepare(
                "INSERT INTO tender_documents (tender_id, url, captured_at) VALUES (?1, ?2, ?3)",
            )?;
            for document in documents {
                stmt.execute(params![tender_id, document.url, now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn get_by_external_id(&self, external_id: &str) -> StorageResult<Option<TenderRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {} FROM tenders WHERE external_id = ?1",
                    TENDER_COLUMNS
                ),
                params![external_id],
                tender_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn list_all(&self) -> StorageResult<Vec<TenderRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tenders ORDER BY captured_at DESC, id DESC",
            TENDER_COLUMNS
        ))?;
        let records = stmt
            .query_map([], tender_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn items_for(&self, tender_id: i64) -> StorageResult<Vec<TenderItem>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT item_number, description, quantity, unit_value, total_value
             FROM tender_items WHERE tender_id = ?1 ORDER BY id",
        )?;
        let items = stmt
            .query_map(params![tender_id], |row| {
                Ok(TenderItem {
                    number: row.get(0)?,
                    description: row.get(1)?,
                    quantity: row.get(2)?,
                    unit_value: row.get(3)?,
                    total_value: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn documents_for(&self, tender_id: i64) -> StorageResult<Vec<TenderDocument>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT url FROM tender_documents WHERE tender_id = ?1 ORDER BY id")?;
        let documents = stmt
            .query_map(params![tender_id], |row| Ok(TenderDocument { url: row.get(0)? }))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(documents)
    }

    fn stats(&self) -> StorageResult<StoreStats> {
        let conn = self.lock()?;
        Ok(StoreStats {
            tenders: count(&conn, "tenders")?,
            items: count(&conn, "tender_items")?,
            documents: count(&conn, "tender_documents")?,
        })
    }
}
