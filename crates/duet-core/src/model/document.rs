use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted document, including its stored embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// Row id, assigned on insert and strictly increasing.
    pub id: i64,
    pub category: String,
    pub title: String,
    pub text: String,
    pub embedding: Vec<f32>,
    /// Insert time; identical for every row of one bulk insert.
    pub created_at: DateTime<Utc>,
}

/// Loader input: the embedding is computed from `title` and `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub category: String,
    pub title: String,
    pub text: String,
}

impl NewDocument {
    pub fn new(
        category: impl Into<String>,
        title: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            title: title.into(),
            text: text.into(),
        }
    }

    /// Text fed to the embedder: title and body joined by one space.
    #[must_use]
    pub fn embedding_input(&self) -> String {
        format!("{} {}", self.title, self.text)
    }

    /// Attach a computed embedding, producing a store write.
    #[must_use]
    pub fn with_embedding(self, embedding: Vec<f32>) -> DocumentInsert {
        DocumentInsert {
            category: self.category,
            title: self.title,
            text: self.text,
            embedding,
        }
    }
}

/// A row ready to be written by `DocumentStore::bulk_insert`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInsert {
    pub category: String,
    pub title: String,
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A document without its embedding, as read by the lexical pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub text: String,
    pub created_at_us: i64,
}

impl DocumentRow {
    /// Insert time as a UTC timestamp. Out-of-range values clamp to the epoch.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.created_at_us).unwrap_or_default()
    }
}
