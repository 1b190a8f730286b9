//! Screening input and the stored screening record.
//!
//! Every measurement is optional: a missing field simply contributes no risk.

use serde::{Deserialize, Serialize};

use super::ids::new_id;
use super::risk::{RiskAssessment, RiskLevel};

/// Self-reported tobacco use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmokingStatus {
    Never,
    Former,
    Current,
}

impl SmokingStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Never => "Never",
            Self::Former => "Former",
            Self::Current => "Current",
        }
    }
}

impl std::fmt::Display for SmokingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SmokingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Never" => Ok(Self::Never),
            "Former" => Ok(Self::Former),
            "Current" => Ok(Self::Current),
            other => Err(format!("Unknown smoking status '{other}'")),
        }
    }
}

/// Vitals, labs and lifestyle answers collected during one screening.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningInput {
    /// Height in cm
    pub height_cm: Option<f64>,

    /// Weight in kg
    pub weight_kg: Option<f64>,

    /// Systolic blood pressure in mmHg
    pub systolic_bp: Option<u32>,

    /// Diastolic blood pressure in mmHg (recorded, never scored)
    pub diastolic_bp: Option<u32>,

    /// Resting heart rate in bpm (recorded, never scored)
    pub heart_rate: Option<u32>,

    pub smoking_status: Option<SmokingStatus>,

    /// Free-form alcohol answer (recorded, never scored)
    pub alcohol_usage: Option<String>,

    /// Free-form activity label; only the exact value "Sedentary" is scored
    pub physical_activity: Option<String>,

    /// Blood glucose in mg/dL
    pub glucose_level: Option<f64>,

    /// Total cholesterol in mg/dL
    pub cholesterol_level: Option<f64>,
}

impl ScreeningInput {
    /// Body mass index, when both height and weight are known and height is positive.
    #[must_use]
    pub fn bmi(&self) -> Option<f64> {
        match (self.height_cm, self.weight_kg) {
            (Some(height_cm), Some(weight_kg)) if height_cm > 0.0 => {
                let height_m = height_cm / 100.0;
                Some(weight_kg / (height_m * height_m))
            }
            _ => None,
        }
    }

    /// Validate measurements at the input boundary.
    ///
    /// The risk engine never calls this; it is total over any value.
    ///
    /// # Errors
    /// Returns every problem found as a vector of strings.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        let floats = [
            ("Height", self.height_cm),
            ("Weight", self.weight_kg),
            ("Glucose", self.glucose_level),
            ("Cholesterol", self.cholesterol_level),
        ];
        for (name, value) in floats {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    errors.push(format!("{name} {v} must be a positive number"));
                }
            }
        }

        let integers = [
            ("Systolic BP", self.systolic_bp),
            ("Diastolic BP", self.diastolic_bp),
            ("Heart rate", self.heart_rate),
        ];
        for (name, value) in integers {
            if value == Some(0) {
                errors.push(format!("{name} must be greater than 0"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// A screening submission addressed to a patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreeningRequest {
    pub patient_id: String,

    #[serde(flatten)]
    pub input: ScreeningInput,
}

/// A stored screening: the submitted input plus its risk assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Screening {
    pub id: String,

    pub patient_id: String,

    #[serde(flatten)]
    pub input: ScreeningInput,

    pub risk_score: u32,

    pub risk_level: RiskLevel,

    /// Joined risk notes, or the "no risk factors" sentence
    pub risk_notes: String,

    /// Narrative from the enrichment collaborator, when it succeeded
    pub ai_insights: Option<String>,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Screening {
    /// Build a screening record from an input and the assessment computed for it.
    #[must_use]
    pub fn new(patient_id: impl Into<String>, input: ScreeningInput, assessment: &RiskAssessment) -> Self {
        Self {
            id: new_id(),
            patient_id: patient_id.into(),
            input,
            risk_score: assessment.risk_score,
            risk_level: assessment.risk_level,
            risk_notes: assessment.risk_notes(),
            ai_insights: None,
            created_at: chrono::Utc::now(),
        }
    }
}
