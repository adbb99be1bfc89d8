//! Database schema definitions
//!
//! This module contains the SQL schema of the tender database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per tender, keyed by the source system id
CREATE TABLE IF NOT EXISTS tenders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    location TEXT NOT NULL,
    issuing_body TEXT NOT NULL,
    purchasing_unit TEXT NOT NULL,
    modality TEXT NOT NULL,
    legal_basis TEXT NOT NULL,
    tender_type TEXT NOT NULL,
    dispute_mode TEXT NOT NULL,
    price_registry TEXT NOT NULL,
    budget_source TEXT NOT NULL,
    published_at TEXT NOT NULL,
    status TEXT NOT NULL,
    proposals_open TEXT NOT NULL,
    proposals_close TEXT NOT NULL,
    source TEXT NOT NULL,
    object_text TEXT NOT NULL,
    total_estimated_value TEXT NOT NULL,
    captured_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tenders_captured_at ON tenders(captured_at);

-- Line items, fully replaced on every crawl of their tender
CREATE TABLE IF NOT EXISTS tender_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tender_id INTEGER NOT NULL REFERENCES tenders(id) ON DELETE CASCADE,
    item_number TEXT NOT NULL,
    description TEXT NOT NULL,
    quantity TEXT NOT NULL,
    unit_value TEXT NOT NULL,
    total_value TEXT NOT NULL,
    captured_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tender_items_tender ON tender_items(tender_id);

-- Notice documents, fully replaced on every crawl of their tender
CREATE TABLE IF NOT EXISTS tender_documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tender_id INTEGER NOT NULL REFERENCES tenders(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    captured_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tender_documents_tender ON tender_documents(tender_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
