//! Document store schema.
//!
//! Embeddings live in `documents.embedding_json` as a JSON array of floats,
//! which is the text form `vec_f32()` accepts directly. The vector dimension
//! is fixed once in `store_meta` and enforced on every insert by a trigger.

/// Migration v1: documents table plus the singleton metadata row.
pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    category TEXT NOT NULL,
    title TEXT NOT NULL,
    text TEXT NOT NULL,
    embedding_json TEXT NOT NULL,
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    vector_dimension INTEGER CHECK (vector_dimension IS NULL OR vector_dimension > 0),
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, vector_dimension, created_at_us)
VALUES (1, 1, NULL, 0);
"#;

/// Migration v2: category filter index and the insert-time dimension guard.
pub const MIGRATION_V2_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_documents_category
    ON documents(category, id);

CREATE TRIGGER IF NOT EXISTS documents_dimension_guard
BEFORE INSERT ON documents
WHEN json_array_length(NEW.embedding_json)
     <> (SELECT vector_dimension FROM store_meta WHERE id = 1)
BEGIN
    SELECT RAISE(ABORT, 'embedding dimension mismatch');
END;
"#;

/// Indexes the search paths rely on.
pub const REQUIRED_INDEXES: &[&str] = &["idx_documents_category"];
