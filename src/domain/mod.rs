//! Domain layer: Core business types and logic.
//!
//! This module contains pure Rust types with no I/O. The risk engine lives
//! here so it can be called inline from any request path.

mod appointment;
mod ids;
mod patient;
mod recommendation;
mod risk;
mod screening;

pub use appointment::{Appointment, AppointmentRequest, AppointmentStatus, AppointmentUpdate};
pub use ids::new_id;
pub use patient::{Gender, Patient, PatientProfile};
pub use recommendation::{
    derive_recommendations, Category, Priority, Recommendation, RecommendationRecord,
};
pub use risk::{RiskAssessment, RiskEngine, RiskFactor, RiskLevel, NO_RISK_FACTORS_NOTE};
pub use screening::{Screening, ScreeningInput, ScreeningRequest, SmokingStatus};
