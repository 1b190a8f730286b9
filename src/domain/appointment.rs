//! Follow-up appointments.
//!
//! A High-tier screening recommends a follow-up; the health worker books it
//! as an appointment and later records how it went.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::new_id;

const MAX_REASON_LEN: usize = 255;

/// Lifecycle of an appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    Missed,
}

impl AppointmentStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Missed => "missed",
        }
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "missed" => Ok(Self::Missed),
            other => Err(format!("Unknown appointment status '{other}'")),
        }
    }
}

/// Booking details submitted by a health worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub patient_id: String,
    pub scheduled_date: DateTime<Utc>,
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AppointmentRequest {
    /// Validate the booking before it is stored.
    ///
    /// # Errors
    /// Returns every problem found as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.reason.trim().is_empty() {
            errors.push("Reason must not be empty".to_string());
        }
        if self.reason.chars().count() > MAX_REASON_LEN {
            errors.push(format!("Reason longer than {MAX_REASON_LEN} characters"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Changes to an existing appointment. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppointmentUpdate {
    pub status: Option<AppointmentStatus>,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// A booked follow-up appointment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,

    /// Health worker who booked the appointment
    pub health_worker: String,

    pub scheduled_date: DateTime<Utc>,
    pub reason: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Book a new appointment in the `Scheduled` state.
    #[must_use]
    pub fn new(request: AppointmentRequest, health_worker: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            patient_id: request.patient_id,
            health_worker: health_worker.into(),
            scheduled_date: request.scheduled_date,
            reason: request.reason,
            notes: request.notes,
            status: AppointmentStatus::Scheduled,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an update and bump `updated_at`.
    pub fn apply(&mut self, update: AppointmentUpdate) {
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(date) = update.scheduled_date {
            self.scheduled_date = date;
        }
        if let Some(notes) = update.notes {
            self.notes = Some(notes);
        }
        self.updated_at = Utc::now();
    }

    /// Still scheduled and not in the past.
    #[must_use]
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.status == AppointmentStatus::Scheduled && self.scheduled_date >= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn request() -> AppointmentRequest {
        AppointmentRequest {
            patient_id: "p-1".to_string(),
            scheduled_date: Utc.with_ymd_and_hms(2026, 11, 2, 9, 30, 0).unwrap(),
            reason: "Follow-up for high blood pressure".to_string(),
            notes: None,
        }
    }

    #[test]
    fn test_new_appointment_is_scheduled() {
        let appointment = Appointment::new(request(), "worker-1");
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        assert_eq!(appointment.health_worker, "worker-1");
        assert_eq!(appointment.created_at, appointment.updated_at);
    }

    #[test]
    fn test_validate_reason() {
        assert!(request().validate().is_ok());

        let mut blank = request();
        blank.reason = "   ".to_string();
        assert_eq!(blank.validate().expect_err("Should fail").len(), 1);

        let mut long = request();
        long.reason = "x".repeat(256);
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_apply_update_keeps_unset_fields() {
        let mut appointment = Appointment::new(request(), "worker-1");
        let original_date = appointment.scheduled_date;

        appointment.apply(AppointmentUpdate {
            status: Some(AppointmentStatus::Completed),
            notes: Some("BP down to 150".to_string()),
            ..Default::default()
        });

        assert_eq!(appointment.status, AppointmentStatus::Completed);
        assert_eq!(appointment.scheduled_date, original_date);
        assert_eq!(appointment.notes.as_deref(), Some("BP down to 150"));
        assert!(appointment.updated_at >= appointment.created_at);
    }

    #[test]
    fn test_is_upcoming() {
        let mut appointment = Appointment::new(request(), "worker-1");
        let date = appointment.scheduled_date;

        assert!(appointment.is_upcoming(date - Duration::days(1)));
        assert!(appointment.is_upcoming(date));
        assert!(!appointment.is_upcoming(date + Duration::seconds(1)));

        appointment.status = AppointmentStatus::Cancelled;
        assert!(!appointment.is_upcoming(date - Duration::days(1)));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("missed".parse::<AppointmentStatus>(), Ok(AppointmentStatus::Missed));
        assert!("Missed".parse::<AppointmentStatus>().is_err());
        let json = serde_json::to_string(&AppointmentStatus::Cancelled).expect("Should serialize");
        assert_eq!(json, "\"cancelled\"");
    }
}
