//! Screening service: registers patients, runs the screening workflow and
//! books follow-up appointments.
//!
//! A screening submission goes through:
//! 1. Input validation
//! 2. Patient lookup
//! 3. Risk scoring and recommendation derivation
//! 4. Atomic persistence of the screening and its recommendations
//! 5. Best-effort narrative enrichment
//!
//! Enrichment runs after the screening is stored. Its failure is logged and
//! never turns a successful screening into an error.

use std::sync::Arc;

use serde::Serialize;

use crate::adapters::StorageError;
use crate::domain::{
    Appointment, AppointmentRequest, AppointmentUpdate, Patient, PatientProfile,
    RecommendationRecord, RiskAssessment, RiskEngine, Screening, ScreeningInput,
};
use crate::ports::{
    AppointmentFilter, InsightError, InsightProvider, InsightRequest, RecommendationFilter,
    ScreeningFilter, ScreeningPage, Storage,
};
use crate::ScreeningError;

/// A stored screening together with the recommendations created for it.
#[derive(Debug, Clone, Serialize)]
pub struct ScreeningOutcome {
    pub screening: Screening,
    /// Individual risk notes, in evaluation order
    pub notes: Vec<String>,
    pub recommendations: Vec<RecommendationRecord>,
}

/// Service for patient registration and screening.
pub struct ScreeningService<S, I>
where
    S: Storage,
    I: InsightProvider,
{
    engine: RiskEngine,
    storage: Arc<S>,
    insights: Arc<I>,
}

impl<S, I> ScreeningService<S, I>
where
    S: Storage,
    I: InsightProvider,
    S::Error: Into<StorageError>,
{
    /// Create a new screening service.
    pub fn new(storage: Arc<S>, insights: Arc<I>) -> Self {
        Self {
            engine: RiskEngine,
            storage,
            insights,
        }
    }

    /// Register a patient.
    ///
    /// `registered_by` is the health worker's ID, or `None` for self-registration.
    ///
    /// # Errors
    /// Returns error if the profile is invalid or storage fails.
    pub fn register_patient(
        &self,
        profile: PatientProfile,
        registered_by: Option<String>,
    ) -> Result<Patient, ScreeningError> {
        profile
            .validate()
            .map_err(|errors| ScreeningError::Validation(errors.join("; ")))?;

        let patient = Patient::new(profile, registered_by);
        self.storage
            .save_patient(&patient)
            .map_err(|e| ScreeningError::Storage(e.into()))?;

        tracing::info!(
            "Registered patient {} (self-registered: {})",
            patient.id,
            patient.is_self_registered()
        );
        Ok(patient)
    }

    /// Load a patient.
    ///
    /// # Errors
    /// Returns `ScreeningError::PatientNotFound` if no such patient exists.
    pub fn patient(&self, patient_id: &str) -> Result<Patient, ScreeningError> {
        self.storage
            .load_patient(patient_id)
            .map_err(|e| ScreeningError::Storage(e.into()))?
            .ok_or_else(|| ScreeningError::PatientNotFound(patient_id.to_string()))
    }

    /// List registered patients, newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn patients(&self, offset: usize, limit: usize) -> Result<Vec<Patient>, ScreeningError> {
        self.storage
            .list_patients(offset, limit)
            .map_err(|e| ScreeningError::Storage(e.into()))
    }

    /// Replace a patient's demographics.
    ///
    /// # Errors
    /// Returns `ScreeningError::Validation` for an invalid profile and
    /// `ScreeningError::PatientNotFound` if no such patient exists.
    pub fn update_patient(
        &self,
        patient_id: &str,
        profile: PatientProfile,
    ) -> Result<Patient, ScreeningError> {
        profile
            .validate()
            .map_err(|errors| ScreeningError::Validation(errors.join("; ")))?;

        let mut patient = self.patient(patient_id)?;
        patient.update(profile);
        self.storage
            .update_patient(&patient)
            .map_err(|e| ScreeningError::Storage(e.into()))?;

        tracing::info!("Updated patient {}", patient.id);
        Ok(patient)
    }

    /// Delete a patient with all their screenings, recommendations and appointments.
    ///
    /// # Errors
    /// Returns `ScreeningError::PatientNotFound` if no such patient exists.
    pub fn delete_patient(&self, patient_id: &str) -> Result<(), ScreeningError> {
        let result: Result<(), StorageError> =
            self.storage.delete_patient(patient_id).map_err(Into::into);
        match result {
            Ok(()) => Ok(()),
            Err(StorageError::NotFound(_)) => {
                Err(ScreeningError::PatientNotFound(patient_id.to_string()))
            }
            Err(e) => Err(ScreeningError::Storage(e)),
        }
    }

    /// Score an input without storing anything (self-screening preview).
    ///
    /// # Errors
    /// Returns `ScreeningError::Validation` if the input is invalid.
    pub fn assess(&self, input: &ScreeningInput) -> Result<RiskAssessment, ScreeningError> {
        validate_input(input)?;
        Ok(self.engine.score(input))
    }

    /// Score, store and enrich a screening for a patient.
    ///
    /// # Errors
    /// Returns error if the input is invalid, the patient does not exist,
    /// or the screening cannot be stored. Enrichment failures are not errors.
    pub fn create_screening(
        &self,
        patient_id: &str,
        input: ScreeningInput,
    ) -> Result<ScreeningOutcome, ScreeningError> {
        validate_input(&input)?;
        let patient = self.patient(patient_id)?;

        let assessment = self.engine.score(&input);
        let mut screening = Screening::new(&patient.id, input, &assessment);
        let recommendations: Vec<RecommendationRecord> = assessment
            .recommendations
            .iter()
            .cloned()
            .map(|r| RecommendationRecord::new(&patient.id, Some(screening.id.clone()), r))
            .collect();

        self.storage
            .save_screening(&screening, &recommendations)
            .map_err(|e| ScreeningError::Storage(e.into()))?;

        tracing::info!(
            "Screening {} stored: score={}, risk={}, recommendations={}",
            screening.id,
            screening.risk_score,
            screening.risk_level,
            recommendations.len()
        );

        screening.ai_insights = self.enrich(&patient, &screening);

        Ok(ScreeningOutcome {
            screening,
            notes: assessment.notes,
            recommendations,
        })
    }

    /// Ask the insight provider for a narrative and attach it to the stored screening.
    fn enrich(&self, patient: &Patient, screening: &Screening) -> Option<String> {
        let request = InsightRequest {
            age: Some(patient.age),
            gender: Some(patient.gender),
            input: screening.input.clone(),
            risk_level: screening.risk_level,
            risk_score: screening.risk_score,
        };

        let insight = match self.insights.analyze(&request) {
            Ok(insight) => insight,
            Err(InsightError::Disabled) => {
                tracing::debug!("Insight enrichment disabled, skipping");
                return None;
            }
            Err(e) => {
                tracing::warn!("Insight enrichment failed for screening {}: {}", screening.id, e);
                return None;
            }
        };

        if let Err(e) = self
            .storage
            .set_ai_insights(&screening.id, &insight.formatted_insights)
        {
            tracing::warn!("Failed to store insights for screening {}: {:?}", screening.id, e);
            return None;
        }

        Some(insight.formatted_insights)
    }

    /// Load a screening by ID.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn screening(&self, screening_id: &str) -> Result<Option<Screening>, ScreeningError> {
        self.storage
            .load_screening(screening_id)
            .map_err(|e| ScreeningError::Storage(e.into()))
    }

    /// Load screenings matching a filter, newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn screenings(&self, filter: &ScreeningFilter) -> Result<Vec<Screening>, ScreeningError> {
        self.storage
            .load_screenings(filter)
            .map_err(|e| ScreeningError::Storage(e.into()))
    }

    /// Load a page of screenings, newest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn screening_page(&self, offset: usize, limit: usize) -> Result<ScreeningPage, ScreeningError> {
        self.storage
            .load_screenings_paginated(offset, limit)
            .map_err(|e| ScreeningError::Storage(e.into()))
    }

    /// Get total screening count.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn screening_count(&self) -> Result<usize, ScreeningError> {
        self.storage
            .count_screenings()
            .map_err(|e| ScreeningError::Storage(e.into()))
    }

    /// Load recommendations matching a filter.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn recommendations(
        &self,
        filter: &RecommendationFilter,
    ) -> Result<Vec<RecommendationRecord>, ScreeningError> {
        self.storage
            .load_recommendations(filter)
            .map_err(|e| ScreeningError::Storage(e.into()))
    }

    /// Mark a recommendation as completed.
    ///
    /// # Errors
    /// Returns `ScreeningError::RecommendationNotFound` if no such recommendation exists.
    pub fn complete_recommendation(&self, recommendation_id: &str) -> Result<(), ScreeningError> {
        let updated = self
            .storage
            .complete_recommendation(recommendation_id)
            .map_err(|e| ScreeningError::Storage(e.into()))?;
        if !updated {
            return Err(ScreeningError::RecommendationNotFound(
                recommendation_id.to_string(),
            ));
        }
        Ok(())
    }

    /// Book a follow-up appointment for an existing patient.
    ///
    /// # Errors
    /// Returns `ScreeningError::Validation` for an invalid booking and
    /// `ScreeningError::PatientNotFound` if the patient does not exist.
    pub fn schedule_appointment(
        &self,
        request: AppointmentRequest,
        health_worker: &str,
    ) -> Result<Appointment, ScreeningError> {
        request
            .validate()
            .map_err(|errors| ScreeningError::Validation(errors.join("; ")))?;
        self.patient(&request.patient_id)?;

        let appointment = Appointment::new(request, health_worker);
        self.storage
            .save_appointment(&appointment)
            .map_err(|e| ScreeningError::Storage(e.into()))?;

        tracing::info!(
            "Scheduled appointment {} for {}",
            appointment.id,
            appointment.scheduled_date
        );
        Ok(appointment)
    }

    /// Load an appointment.
    ///
    /// # Errors
    /// Returns `ScreeningError::AppointmentNotFound` if no such appointment exists.
    pub fn appointment(&self, appointment_id: &str) -> Result<Appointment, ScreeningError> {
        self.storage
            .load_appointment(appointment_id)
            .map_err(|e| ScreeningError::Storage(e.into()))?
            .ok_or_else(|| ScreeningError::AppointmentNotFound(appointment_id.to_string()))
    }

    /// Load appointments matching a filter, latest scheduled date first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn appointments(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, ScreeningError> {
        self.storage
            .load_appointments(filter)
            .map_err(|e| ScreeningError::Storage(e.into()))
    }

    /// Change an appointment's status, date or notes.
    ///
    /// # Errors
    /// Returns `ScreeningError::AppointmentNotFound` if no such appointment exists.
    pub fn update_appointment(
        &self,
        appointment_id: &str,
        update: AppointmentUpdate,
    ) -> Result<Appointment, ScreeningError> {
        let mut appointment = self.appointment(appointment_id)?;
        appointment.apply(update);
        self.storage
            .update_appointment(&appointment)
            .map_err(|e| ScreeningError::Storage(e.into()))?;

        tracing::info!(
            "Appointment {} is now {}",
            appointment.id,
            appointment.status
        );
        Ok(appointment)
    }
}

fn validate_input(input: &ScreeningInput) -> Result<(), ScreeningError> {
    input
        .validate()
        .map_err(|errors| ScreeningError::Validation(errors.join("; ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::insights::{InsightConfig, TemplateInsights};
    use crate::adapters::sqlite::SqliteStorage;
    use crate::domain::{AppointmentStatus, Category, Gender, RiskLevel, SmokingStatus};
    use chrono::{Duration, Utc};
    use crate::ports::HealthInsight;

    struct FailingInsights;

    impl InsightProvider for FailingInsights {
        fn analyze(&self, _request: &InsightRequest) -> Result<HealthInsight, InsightError> {
            Err(InsightError::Unavailable("connection refused".to_string()))
        }
    }

    fn profile() -> PatientProfile {
        PatientProfile {
            full_name: "Meena Kumari".to_string(),
            age: 47,
            gender: Gender::Female,
            village: "Sitapur".to_string(),
            phone: None,
        }
    }

    fn service<I: InsightProvider>(insights: I) -> ScreeningService<SqliteStorage, I> {
        let storage = Arc::new(SqliteStorage::in_memory().expect("Should create db"));
        ScreeningService::new(storage, Arc::new(insights))
    }

    fn high_risk_input() -> ScreeningInput {
        ScreeningInput {
            systolic_bp: Some(190),
            glucose_level: Some(250.0),
            smoking_status: Some(SmokingStatus::Current),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_screening_stores_recommendations() {
        let service = service(TemplateInsights::new(InsightConfig::default()));
        let patient = service
            .register_patient(profile(), Some("worker-3".to_string()))
            .expect("Should register");

        let outcome = service
            .create_screening(&patient.id, high_risk_input())
            .expect("Should create screening");

        assert_eq!(outcome.screening.risk_score, 95);
        assert_eq!(outcome.screening.risk_level, RiskLevel::High);
        assert_eq!(outcome.notes.len(), 3);
        assert_eq!(outcome.recommendations.len(), 4);
        assert_eq!(
            outcome.recommendations[3].recommendation.category,
            Category::Followup
        );
        assert!(outcome
            .recommendations
            .iter()
            .all(|r| r.patient_id == patient.id
                && r.screening_id.as_deref() == Some(outcome.screening.id.as_str())));

        let stored = service
            .recommendations(&RecommendationFilter {
                patient_id: Some(patient.id.clone()),
                ..Default::default()
            })
            .expect("Should load");
        assert_eq!(stored.len(), 4);
    }

    #[test]
    fn test_insights_are_attached_and_stored() {
        let service = service(TemplateInsights::new(InsightConfig::default()));
        let patient = service.register_patient(profile(), None).expect("Should register");

        let outcome = service
            .create_screening(&patient.id, high_risk_input())
            .expect("Should create screening");
        let insights = outcome.screening.ai_insights.expect("Should have insights");
        assert!(insights.contains("**High Risk**"));

        let stored = service
            .screening(&outcome.screening.id)
            .expect("Should load")
            .expect("Should exist");
        assert_eq!(stored.ai_insights.as_deref(), Some(insights.as_str()));
    }

    #[test]
    fn test_enrichment_failure_does_not_fail_screening() {
        let service = service(FailingInsights);
        let patient = service.register_patient(profile(), None).expect("Should register");

        let outcome = service
            .create_screening(&patient.id, high_risk_input())
            .expect("Should create screening despite enrichment failure");

        assert!(outcome.screening.ai_insights.is_none());
        assert_eq!(outcome.recommendations.len(), 4);
        assert_eq!(service.screening_count().expect("Should count"), 1);
    }

    #[test]
    fn test_unknown_patient_is_rejected_before_scoring() {
        let service = service(FailingInsights);

        let result = service.create_screening("missing", high_risk_input());
        assert!(matches!(result, Err(ScreeningError::PatientNotFound(_))));
        assert_eq!(service.screening_count().expect("Should count"), 0);
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        let service = service(FailingInsights);
        let patient = service.register_patient(profile(), None).expect("Should register");

        let input = ScreeningInput {
            weight_kg: Some(-70.0),
            ..Default::default()
        };
        assert!(matches!(
            service.create_screening(&patient.id, input.clone()),
            Err(ScreeningError::Validation(_))
        ));
        assert!(matches!(service.assess(&input), Err(ScreeningError::Validation(_))));
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        let service = service(FailingInsights);
        let mut profile = profile();
        profile.full_name = String::new();

        assert!(matches!(
            service.register_patient(profile, None),
            Err(ScreeningError::Validation(_))
        ));
    }

    #[test]
    fn test_assess_stores_nothing() {
        let service = service(FailingInsights);
        let assessment = service
            .assess(&ScreeningInput::default())
            .expect("Should assess");

        assert_eq!(assessment.risk_score, 0);
        assert_eq!(assessment.risk_notes(), "No significant risk factors detected.");
        assert_eq!(service.screening_count().expect("Should count"), 0);
    }

    #[test]
    fn test_low_risk_screening_without_findings() {
        let service = service(FailingInsights);
        let patient = service.register_patient(profile(), None).expect("Should register");

        let outcome = service
            .create_screening(&patient.id, ScreeningInput::default())
            .expect("Should create screening");

        assert_eq!(outcome.screening.risk_level, RiskLevel::Low);
        assert_eq!(
            outcome.screening.risk_notes,
            "No significant risk factors detected."
        );
        assert!(outcome.notes.is_empty());
        assert!(outcome.recommendations.is_empty());
    }

    #[test]
    fn test_complete_recommendation() {
        let service = service(FailingInsights);
        let patient = service.register_patient(profile(), None).expect("Should register");
        let outcome = service
            .create_screening(&patient.id, high_risk_input())
            .expect("Should create screening");

        service
            .complete_recommendation(&outcome.recommendations[0].id)
            .expect("Should complete");
        assert!(matches!(
            service.complete_recommendation("unknown"),
            Err(ScreeningError::RecommendationNotFound(_))
        ));

        let open = service
            .recommendations(&RecommendationFilter {
                patient_id: Some(patient.id.clone()),
                incomplete_only: true,
                ..Default::default()
            })
            .expect("Should load");
        assert_eq!(open.len(), 3);
    }

    #[test]
    fn test_history_filters() {
        let service = service(FailingInsights);
        let patient = service.register_patient(profile(), None).expect("Should register");

        service
            .create_screening(&patient.id, high_risk_input())
            .expect("Should create screening");
        service
            .create_screening(&patient.id, ScreeningInput::default())
            .expect("Should create screening");

        let history = service
            .screenings(&ScreeningFilter::for_patient(patient.id.clone()))
            .expect("Should load");
        assert_eq!(history.len(), 2);

        let high = service
            .screenings(&ScreeningFilter::default().with_risk_level(RiskLevel::High))
            .expect("Should load");
        assert_eq!(high.len(), 1);

        let page = service.screening_page(0, 1).expect("Should page");
        assert!(page.has_more);
    }

    #[test]
    fn test_delete_patient() {
        let service = service(FailingInsights);
        let patient = service.register_patient(profile(), None).expect("Should register");
        service
            .create_screening(&patient.id, high_risk_input())
            .expect("Should create screening");

        service.delete_patient(&patient.id).expect("Should delete");
        assert_eq!(service.screening_count().expect("Should count"), 0);
        assert!(matches!(
            service.delete_patient(&patient.id),
            Err(ScreeningError::PatientNotFound(_))
        ));
        assert!(service.patients(0, 10).expect("Should list").is_empty());
    }

    fn booking(patient_id: &str, days_from_now: i64) -> AppointmentRequest {
        AppointmentRequest {
            patient_id: patient_id.to_string(),
            scheduled_date: Utc::now() + Duration::days(days_from_now),
            reason: "Follow-up after high risk screening".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_update_patient() {
        let service = service(FailingInsights);
        let patient = service
            .register_patient(profile(), Some("worker-3".to_string()))
            .expect("Should register");

        let mut changed = profile();
        changed.village = "Lakhimpur".to_string();
        let updated = service
            .update_patient(&patient.id, changed)
            .expect("Should update");
        assert_eq!(updated.id, patient.id);
        assert_eq!(updated.village, "Lakhimpur");
        assert_eq!(
            service.patient(&patient.id).expect("Should load").village,
            "Lakhimpur"
        );

        let mut invalid = profile();
        invalid.village = String::new();
        assert!(matches!(
            service.update_patient(&patient.id, invalid),
            Err(ScreeningError::Validation(_))
        ));
        assert!(matches!(
            service.update_patient("missing", profile()),
            Err(ScreeningError::PatientNotFound(_))
        ));
    }

    #[test]
    fn test_schedule_follow_up_after_high_risk_screening() {
        let service = service(FailingInsights);
        let patient = service.register_patient(profile(), None).expect("Should register");
        let outcome = service
            .create_screening(&patient.id, high_risk_input())
            .expect("Should create screening");
        assert_eq!(
            outcome.recommendations.last().map(|r| r.recommendation.category),
            Some(Category::Followup)
        );

        let appointment = service
            .schedule_appointment(booking(&patient.id, 10), "worker-3")
            .expect("Should schedule");
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        assert_eq!(appointment.health_worker, "worker-3");

        let upcoming = service
            .appointments(&AppointmentFilter::for_patient(patient.id.clone()).upcoming_from(Utc::now()))
            .expect("Should load");
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].id, appointment.id);
    }

    #[test]
    fn test_schedule_rejects_unknown_patient_and_blank_reason() {
        let service = service(FailingInsights);
        assert!(matches!(
            service.schedule_appointment(booking("missing", 1), "worker-3"),
            Err(ScreeningError::PatientNotFound(_))
        ));

        let patient = service.register_patient(profile(), None).expect("Should register");
        let mut blank = booking(&patient.id, 1);
        blank.reason = String::new();
        assert!(matches!(
            service.schedule_appointment(blank, "worker-3"),
            Err(ScreeningError::Validation(_))
        ));
    }

    #[test]
    fn test_update_appointment_status() {
        let service = service(FailingInsights);
        let patient = service.register_patient(profile(), None).expect("Should register");
        let appointment = service
            .schedule_appointment(booking(&patient.id, 3), "worker-3")
            .expect("Should schedule");

        let updated = service
            .update_appointment(
                &appointment.id,
                AppointmentUpdate {
                    status: Some(AppointmentStatus::Missed),
                    ..Default::default()
                },
            )
            .expect("Should update");
        assert_eq!(updated.status, AppointmentStatus::Missed);
        assert_eq!(
            service.appointment(&appointment.id).expect("Should load").status,
            AppointmentStatus::Missed
        );

        let missed = service
            .appointments(&AppointmentFilter::default().with_status(AppointmentStatus::Missed))
            .expect("Should load");
        assert_eq!(missed.len(), 1);
        assert!(service
            .appointments(&AppointmentFilter::default().upcoming_from(Utc::now()))
            .expect("Should load")
            .is_empty());

        assert!(matches!(
            service.update_appointment("unknown", AppointmentUpdate::default()),
            Err(ScreeningError::AppointmentNotFound(_))
        ));
    }
}
