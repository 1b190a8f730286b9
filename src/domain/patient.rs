//! Patient registration types.
//!
//! Patients are registered either by a health worker or by themselves
//! (self-registration leaves `registered_by` empty).

use serde::{Deserialize, Serialize};

use super::ids::new_id;

/// Recorded gender of a patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Self::Male),
            "Female" => Ok(Self::Female),
            "Other" => Ok(Self::Other),
            other => Err(format!("Unknown gender '{other}'")),
        }
    }
}

/// Demographics submitted when registering a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub full_name: String,
    pub age: u32,
    pub gender: Gender,
    pub village: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl PatientProfile {
    /// Validate the profile before registration.
    ///
    /// # Errors
    /// Returns every problem found as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.full_name.trim().is_empty() {
            errors.push("Full name must not be empty".to_string());
        }
        if self.age > 130 {
            errors.push(format!("Age {} out of range [0, 130]", self.age));
        }
        if self.village.trim().is_empty() {
            errors.push("Village must not be empty".to_string());
        }
        if let Some(phone) = &self.phone {
            if phone.len() > 20 {
                errors.push("Phone number longer than 20 characters".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A registered patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: String,
    pub full_name: String,
    pub age: u32,
    pub gender: Gender,
    pub village: String,
    pub phone: Option<String>,

    /// Health worker who registered the patient (`None` for self-registration)
    pub registered_by: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Patient {
    /// Register a patient from a profile.
    #[must_use]
    pub fn new(profile: PatientProfile, registered_by: Option<String>) -> Self {
        Self {
            id: new_id(),
            full_name: profile.full_name,
            age: profile.age,
            gender: profile.gender,
            village: profile.village,
            phone: profile.phone,
            registered_by,
            created_at: chrono::Utc::now(),
        }
    }

    /// Replace the demographics, keeping id, registration and creation time.
    pub fn update(&mut self, profile: PatientProfile) {
        self.full_name = profile.full_name;
        self.age = profile.age;
        self.gender = profile.gender;
        self.village = profile.village;
        self.phone = profile.phone;
    }

    #[must_use]
    pub fn is_self_registered(&self) -> bool {
        self.registered_by.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> PatientProfile {
        PatientProfile {
            full_name: "Asha Devi".to_string(),
            age: 54,
            gender: Gender::Female,
            village: "Rampur".to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_valid_profile() {
        assert!(profile().validate().is_ok());
    }

    #[test]
    fn test_invalid_profile_collects_all_errors() {
        let mut p = profile();
        p.full_name = "  ".to_string();
        p.village = String::new();
        p.age = 140;

        let errors = p.validate().expect_err("Should fail validation");
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_self_registration() {
        let patient = Patient::new(profile(), None);
        assert!(patient.is_self_registered());

        let patient = Patient::new(profile(), Some("worker-7".to_string()));
        assert!(!patient.is_self_registered());
    }

    #[test]
    fn test_update_keeps_identity() {
        let mut patient = Patient::new(profile(), Some("worker-7".to_string()));
        let id = patient.id.clone();
        let created_at = patient.created_at;

        let mut changed = profile();
        changed.age = 55;
        changed.phone = Some("9876543210".to_string());
        patient.update(changed);

        assert_eq!(patient.id, id);
        assert_eq!(patient.created_at, created_at);
        assert_eq!(patient.registered_by.as_deref(), Some("worker-7"));
        assert_eq!(patient.age, 55);
        assert_eq!(patient.phone.as_deref(), Some("9876543210"));
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!("Female".parse::<Gender>(), Ok(Gender::Female));
        assert!("female".parse::<Gender>().is_err());
    }
}
