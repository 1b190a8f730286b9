//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `sqlite`: SQLite for local storage of patients, screenings and recommendations
//! - `insights`: narrative enrichment providers
//! - `sanitize`: PII filtering for logs

pub mod insights;
pub mod sanitize;
pub mod sqlite;

// Re-export storage error for lib.rs
pub use sqlite::StorageError;
