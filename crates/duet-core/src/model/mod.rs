//! Document records and their write-side shapes.

pub mod document;

pub use document::{Document, DocumentInsert, DocumentRow, NewDocument};
