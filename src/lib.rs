//! # RuralHealth
//!
//! Rule-based cardiovascular and metabolic risk screening for community
//! health workers.
//!
//! This crate provides:
//! - A deterministic risk engine over vitals, labs and lifestyle data
//! - Recommendation derivation from the triggered risk rules
//! - Local persistence of patients, screenings, recommendations and
//!   follow-up appointments
//! - Optional narrative enrichment that never blocks a screening
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types and the risk engine (pure, no I/O)
//! - `ports`: Trait definitions for external collaborators
//! - `adapters`: Concrete implementations (SQLite, insight narratives, log sanitizing)
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Environment-driven runtime configuration

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{Recommendation, RiskAssessment, RiskEngine, RiskLevel, ScreeningInput};

/// Result type for RuralHealth operations
pub type Result<T> = std::result::Result<T, ScreeningError>;

/// Main error type for RuralHealth
#[derive(Debug, thiserror::Error)]
pub enum ScreeningError {
    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Recommendation not found: {0}")]
    RecommendationNotFound(String),

    #[error("Appointment not found: {0}")]
    AppointmentNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
