//! Rule-based cardiovascular and metabolic risk scoring.
//!
//! Rules are evaluated in a fixed order (blood pressure, glucose,
//! cholesterol, smoking, BMI, activity). Each triggered rule adds points and
//! produces one note; the tier is a pure function of the total.

use serde::{Deserialize, Serialize};

use super::recommendation::{derive_recommendations, Recommendation};
use super::screening::{ScreeningInput, SmokingStatus};

/// Stored in place of the joined notes when no rule triggers.
pub const NO_RISK_FACTORS_NOTE: &str = "No significant risk factors detected.";

const NOTE_SEPARATOR: &str = "; ";

/// Risk tier derived from the risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Score below 30
    Low,
    /// Score from 30 to 59
    Medium,
    /// Score of 60 or more; a follow-up appointment is recommended
    High,
}

impl RiskLevel {
    /// Map a risk score onto its tier.
    #[must_use]
    pub fn from_score(score: u32) -> Self {
        if score >= 60 {
            Self::High
        } else if score >= 30 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low risk - Continue healthy habits",
            Self::Medium => "Medium risk - Lifestyle changes and re-screening advised",
            Self::High => "High risk - Follow-up appointment required",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(Self::Low),
            "Medium" => Ok(Self::Medium),
            "High" => Ok(Self::High),
            other => Err(format!("Unknown risk level '{other}'")),
        }
    }
}

/// One triggered scoring rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RiskFactor {
    VeryHighBloodPressure,
    HighBloodPressure,
    ElevatedBloodPressure,
    VeryHighGlucose,
    HighGlucose,
    ElevatedGlucose,
    HighCholesterol,
    BorderlineHighCholesterol,
    CurrentSmoker,
    FormerSmoker,
    Obese { bmi: f64 },
    Overweight { bmi: f64 },
    Sedentary,
}

impl RiskFactor {
    /// Points this factor adds to the risk score.
    #[must_use]
    pub fn points(&self) -> u32 {
        match self {
            Self::VeryHighBloodPressure | Self::VeryHighGlucose => 40,
            Self::HighBloodPressure | Self::HighGlucose => 25,
            Self::HighCholesterol => 20,
            Self::CurrentSmoker | Self::Obese { .. } => 15,
            Self::ElevatedBloodPressure
            | Self::ElevatedGlucose
            | Self::BorderlineHighCholesterol
            | Self::Sedentary => 10,
            Self::Overweight { .. } => 8,
            Self::FormerSmoker => 5,
        }
    }

    /// Human-readable note recorded for this factor.
    #[must_use]
    pub fn note(&self) -> String {
        match self {
            Self::VeryHighBloodPressure => "Very high blood pressure (>180 systolic)".to_string(),
            Self::HighBloodPressure => "High blood pressure (>140 systolic)".to_string(),
            Self::ElevatedBloodPressure => "Elevated blood pressure (>120 systolic)".to_string(),
            Self::VeryHighGlucose => "Very high glucose (>200 mg/dL)".to_string(),
            Self::HighGlucose => "High glucose (>140 mg/dL)".to_string(),
            Self::ElevatedGlucose => "Elevated glucose (>100 mg/dL)".to_string(),
            Self::HighCholesterol => "High cholesterol (>240 mg/dL)".to_string(),
            Self::BorderlineHighCholesterol => {
                "Borderline high cholesterol (>200 mg/dL)".to_string()
            }
            Self::CurrentSmoker => "Current smoker".to_string(),
            Self::FormerSmoker => "Former smoker".to_string(),
            Self::Obese { bmi } => format!("Obese (BMI: {bmi:.1})"),
            Self::Overweight { bmi } => format!("Overweight (BMI: {bmi:.1})"),
            Self::Sedentary => "Sedentary lifestyle".to_string(),
        }
    }

    fn blood_pressure(systolic: u32) -> Option<Self> {
        if systolic > 180 {
            Some(Self::VeryHighBloodPressure)
        } else if systolic > 140 {
            Some(Self::HighBloodPressure)
        } else if systolic > 120 {
            Some(Self::ElevatedBloodPressure)
        } else {
            None
        }
    }

    fn glucose(level: f64) -> Option<Self> {
        if level > 200.0 {
            Some(Self::VeryHighGlucose)
        } else if level > 140.0 {
            Some(Self::HighGlucose)
        } else if level > 100.0 {
            Some(Self::ElevatedGlucose)
        } else {
            None
        }
    }

    fn cholesterol(level: f64) -> Option<Self> {
        if level > 240.0 {
            Some(Self::HighCholesterol)
        } else if level > 200.0 {
            Some(Self::BorderlineHighCholesterol)
        } else {
            None
        }
    }

    fn smoking(status: SmokingStatus) -> Option<Self> {
        match status {
            SmokingStatus::Current => Some(Self::CurrentSmoker),
            SmokingStatus::Former => Some(Self::FormerSmoker),
            SmokingStatus::Never => None,
        }
    }

    fn body_mass(bmi: f64) -> Option<Self> {
        if bmi > 30.0 {
            Some(Self::Obese { bmi })
        } else if bmi > 25.0 {
            Some(Self::Overweight { bmi })
        } else {
            None
        }
    }

    // Exact, case-sensitive match: "sedentary" does not count.
    fn activity(label: &str) -> Option<Self> {
        (label == "Sedentary").then_some(Self::Sedentary)
    }
}

/// Output of the risk engine for one screening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Additive score; not capped at 100
    pub risk_score: u32,

    pub risk_level: RiskLevel,

    /// One note per triggered rule, in evaluation order
    pub notes: Vec<String>,

    pub recommendations: Vec<Recommendation>,
}

impl RiskAssessment {
    /// The persisted notes field: notes joined with "; ", or the
    /// "no risk factors" sentence when nothing triggered.
    #[must_use]
    pub fn risk_notes(&self) -> String {
        if self.notes.is_empty() {
            NO_RISK_FACTORS_NOTE.to_string()
        } else {
            self.notes.join(NOTE_SEPARATOR)
        }
    }
}

/// Stateless risk scoring engine.
///
/// Scoring is deterministic and performs no I/O, so it is safe to call
/// concurrently and inline from a request path.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskEngine;

impl RiskEngine {
    /// Evaluate every rule against the input, in evaluation order.
    #[must_use]
    pub fn factors(&self, input: &ScreeningInput) -> Vec<RiskFactor> {
        [
            input.systolic_bp.and_then(RiskFactor::blood_pressure),
            input.glucose_level.and_then(RiskFactor::glucose),
            input.cholesterol_level.and_then(RiskFactor::cholesterol),
            input.smoking_status.and_then(RiskFactor::smoking),
            input.bmi().and_then(RiskFactor::body_mass),
            input.physical_activity.as_deref().and_then(RiskFactor::activity),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Score a screening input and derive its recommendations.
    #[must_use]
    pub fn score(&self, input: &ScreeningInput) -> RiskAssessment {
        let factors = self.factors(input);

        let risk_score = factors.iter().map(RiskFactor::points).sum();
        let risk_level = RiskLevel::from_score(risk_score);
        let notes: Vec<String> = factors.iter().map(RiskFactor::note).collect();
        let recommendations = derive_recommendations(notes.as_slice(), risk_level);

        RiskAssessment {
            risk_score,
            risk_level,
            notes,
            recommendations,
        }
    }
}
