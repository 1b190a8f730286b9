//! Storage port: Trait for persistent storage operations.
//!
//! This trait abstracts the storage backend (SQLite) from the application logic.

use chrono::{DateTime, Utc};

use crate::domain::{
    Appointment, AppointmentStatus, Patient, RecommendationRecord, RiskLevel, Screening,
};

/// A page of screenings with pagination metadata.
#[derive(Debug, Clone)]
pub struct ScreeningPage {
    /// Screenings in this page, newest first
    pub items: Vec<Screening>,
    /// Total count of all screenings
    pub total_count: usize,
    /// Current page offset
    pub offset: usize,
    /// Page size limit
    pub limit: usize,
    /// Whether there are more pages
    pub has_more: bool,
}

impl ScreeningPage {
    /// Create a new screening page.
    #[must_use]
    pub fn new(items: Vec<Screening>, total_count: usize, offset: usize, limit: usize) -> Self {
        let has_more = offset.saturating_add(items.len()) < total_count;
        Self {
            items,
            total_count,
            offset,
            limit,
            has_more,
        }
    }

    /// Get the next page offset.
    #[must_use]
    pub fn next_offset(&self) -> Option<usize> {
        if self.has_more {
            Some(self.offset.saturating_add(self.limit))
        } else {
            None
        }
    }

    /// Get the previous page offset.
    #[must_use]
    pub fn prev_offset(&self) -> Option<usize> {
        if self.offset > 0 {
            Some(self.offset.saturating_sub(self.limit))
        } else {
            None
        }
    }
}

/// Which screenings to load.
#[derive(Debug, Clone, Default)]
pub struct ScreeningFilter {
    pub patient_id: Option<String>,
    pub risk_level: Option<RiskLevel>,
    /// Maximum number of rows (`None` for all)
    pub limit: Option<usize>,
}

impl ScreeningFilter {
    #[must_use]
    pub fn for_patient(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: Some(patient_id.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_risk_level(mut self, level: RiskLevel) -> Self {
        self.risk_level = Some(level);
        self
    }
}

/// Which recommendations to load.
#[derive(Debug, Clone, Default)]
pub struct RecommendationFilter {
    pub patient_id: Option<String>,
    pub screening_id: Option<String>,
    /// Only recommendations not yet marked completed
    pub incomplete_only: bool,
}

/// Which appointments to load.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub patient_id: Option<String>,
    pub status: Option<AppointmentStatus>,
    /// Only scheduled appointments at or after this instant
    pub upcoming_from: Option<DateTime<Utc>>,
}

impl AppointmentFilter {
    #[must_use]
    pub fn for_patient(patient_id: impl Into<String>) -> Self {
        Self {
            patient_id: Some(patient_id.into()),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn upcoming_from(mut self, now: DateTime<Utc>) -> Self {
        self.upcoming_from = Some(now);
        self
    }
}

/// Trait for screening storage operations.
pub trait Storage: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save a newly registered patient.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn save_patient(&self, patient: &Patient) -> Result<(), Self::Error>;

    /// Load a patient by ID.
    ///
    /// # Returns
    /// `None` if no such patient exists.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_patient(&self, id: &str) -> Result<Option<Patient>, Self::Error>;

    /// List patients, newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn list_patients(&self, offset: usize, limit: usize) -> Result<Vec<Patient>, Self::Error>;

    /// Overwrite a stored patient's demographics.
    ///
    /// # Errors
    /// Returns a not-found error if no such patient exists.
    fn update_patient(&self, patient: &Patient) -> Result<(), Self::Error>;

    /// Delete a patient together with their screenings, recommendations and appointments.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn delete_patient(&self, id: &str) -> Result<(), Self::Error>;

    /// Save a screening and the recommendations derived from it.
    ///
    /// Both are written atomically: either everything is stored or nothing is.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn save_screening(
        &self,
        screening: &Screening,
        recommendations: &[RecommendationRecord],
    ) -> Result<(), Self::Error>;

    /// Attach an enrichment narrative to a stored screening.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn set_ai_insights(&self, screening_id: &str, insights: &str) -> Result<(), Self::Error>;

    /// Load a screening by ID.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_screening(&self, id: &str) -> Result<Option<Screening>, Self::Error>;

    /// Load screenings matching a filter, newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_screenings(&self, filter: &ScreeningFilter) -> Result<Vec<Screening>, Self::Error>;

    /// Load screenings with pagination.
    ///
    /// # Arguments
    /// * `offset` - Starting position (0-indexed)
    /// * `limit` - Maximum number of items to return
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_screenings_paginated(&self, offset: usize, limit: usize) -> Result<ScreeningPage, Self::Error>;

    /// Get the total count of screenings.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn count_screenings(&self) -> Result<usize, Self::Error>;

    /// Load recommendations matching a filter, in creation order.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_recommendations(
        &self,
        filter: &RecommendationFilter,
    ) -> Result<Vec<RecommendationRecord>, Self::Error>;

    /// Mark a recommendation as completed.
    ///
    /// # Returns
    /// `false` if no recommendation has this ID.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn complete_recommendation(&self, id: &str) -> Result<bool, Self::Error>;

    /// Save a newly booked appointment.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn save_appointment(&self, appointment: &Appointment) -> Result<(), Self::Error>;

    /// Load an appointment by ID.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_appointment(&self, id: &str) -> Result<Option<Appointment>, Self::Error>;

    /// Load appointments matching a filter, latest scheduled date first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, Self::Error>;

    /// Overwrite a stored appointment's date, notes, status and `updated_at`.
    ///
    /// # Errors
    /// Returns a not-found error if no such appointment exists.
    fn update_appointment(&self, appointment: &Appointment) -> Result<(), Self::Error>;

    /// Clear all data.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn clear_all(&self) -> Result<(), Self::Error>;
}
