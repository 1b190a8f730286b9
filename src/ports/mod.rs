//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the screening use case and the outside world (storage, narrative
//! enrichment). The risk engine itself needs no port: it is pure.

mod insights;
mod storage;

pub use insights::{HealthInsight, InsightError, InsightProvider, InsightRequest};
pub use storage::{
    AppointmentFilter, RecommendationFilter, ScreeningFilter, ScreeningPage, Storage,
};
