//! Recommendations derived from risk notes.
//!
//! Each note is matched case-insensitively against a fixed keyword table.
//! A High tier adds a follow-up appointment as the last entry.

use serde::{Deserialize, Serialize};

use super::ids::new_id;
use super::risk::RiskLevel;

/// Recommendation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Diet,
    Exercise,
    Medication,
    Lifestyle,
    Followup,
}

impl Category {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Diet => "diet",
            Self::Exercise => "exercise",
            Self::Medication => "medication",
            Self::Lifestyle => "lifestyle",
            Self::Followup => "followup",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diet" => Ok(Self::Diet),
            "exercise" => Ok(Self::Exercise),
            "medication" => Ok(Self::Medication),
            "lifestyle" => Ok(Self::Lifestyle),
            "followup" => Ok(Self::Followup),
            other => Err(format!("Unknown recommendation category '{other}'")),
        }
    }
}

/// Recommendation priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("Unknown priority '{other}'")),
        }
    }
}

/// A structured health suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: Category,
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

impl Recommendation {
    fn new(category: Category, title: &str, description: &str, priority: Priority) -> Self {
        Self {
            category,
            title: title.to_string(),
            description: description.to_string(),
            priority,
        }
    }
}

enum PriorityRule {
    Fixed(Priority),
    /// High when the note says "Very high", otherwise medium
    Severity,
}

struct KeywordRule {
    keyword: &'static str,
    category: Category,
    title: &'static str,
    description: &'static str,
    priority: PriorityRule,
}

// Matched in this order for every note.
const KEYWORD_RULES: [KeywordRule; 6] = [
    KeywordRule {
        keyword: "blood pressure",
        category: Category::Lifestyle,
        title: "Blood Pressure Management",
        description: "Reduce sodium intake, exercise regularly, limit alcohol, and manage stress. Consider DASH diet.",
        priority: PriorityRule::Severity,
    },
    KeywordRule {
        keyword: "glucose",
        category: Category::Diet,
        title: "Blood Sugar Control",
        description: "Limit refined carbohydrates, eat more fiber, exercise after meals, and monitor blood sugar regularly.",
        priority: PriorityRule::Severity,
    },
    KeywordRule {
        keyword: "cholesterol",
        category: Category::Diet,
        title: "Cholesterol Management",
        description: "Reduce saturated fats, eat omega-3 rich foods, increase soluble fiber, and consider plant sterols.",
        priority: PriorityRule::Fixed(Priority::Medium),
    },
    KeywordRule {
        keyword: "smoker",
        category: Category::Lifestyle,
        title: "Smoking Cessation",
        description: "Consider nicotine replacement therapy, counseling, or medication. Quitting smoking significantly reduces cardiovascular risk.",
        priority: PriorityRule::Fixed(Priority::High),
    },
    KeywordRule {
        keyword: "bmi",
        category: Category::Exercise,
        title: "Weight Management",
        description: "Aim for 150 minutes of moderate exercise weekly, reduce calorie intake, and consult a nutritionist.",
        priority: PriorityRule::Fixed(Priority::Medium),
    },
    KeywordRule {
        keyword: "sedentary",
        category: Category::Exercise,
        title: "Increase Physical Activity",
        description: "Start with 30 minutes of walking daily, take breaks from sitting, and gradually increase activity level.",
        priority: PriorityRule::Fixed(Priority::Medium),
    },
];

const FOLLOW_UP_TITLE: &str = "Schedule Follow-up Appointment";
const FOLLOW_UP_DESCRIPTION: &str =
    "High risk detected. Please schedule a follow-up appointment within 2 weeks for detailed assessment.";

/// Derive recommendations from risk notes and the risk tier.
///
/// Every keyword found in a note appends one recommendation; duplicates are
/// kept. The "Very high" severity check is case-sensitive while keyword
/// matching is not.
#[must_use]
pub fn derive_recommendations<S: AsRef<str>>(notes: &[S], tier: RiskLevel) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    for note in notes {
        let note: &str = note.as_ref();
        let lowered = note.to_lowercase();

        for rule in &KEYWORD_RULES {
            if !lowered.contains(rule.keyword) {
                continue;
            }
            let priority = match rule.priority {
                PriorityRule::Fixed(priority) => priority,
                PriorityRule::Severity if note.contains("Very high") => Priority::High,
                PriorityRule::Severity => Priority::Medium,
            };
            recommendations.push(Recommendation::new(
                rule.category,
                rule.title,
                rule.description,
                priority,
            ));
        }
    }

    if tier == RiskLevel::High {
        recommendations.push(Recommendation::new(
            Category::Followup,
            FOLLOW_UP_TITLE,
            FOLLOW_UP_DESCRIPTION,
            Priority::High,
        ));
    }

    recommendations
}

/// A stored recommendation linked to a patient and the screening that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationRecord {
    pub id: String,
    pub patient_id: String,
    pub screening_id: Option<String>,

    #[serde(flatten)]
    pub recommendation: Recommendation,

    pub is_completed: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl RecommendationRecord {
    #[must_use]
    pub fn new(
        patient_id: impl Into<String>,
        screening_id: Option<String>,
        recommendation: Recommendation,
    ) -> Self {
        Self {
            id: new_id(),
            patient_id: patient_id.into(),
            screening_id,
            recommendation,
            is_completed: false,
            created_at: chrono::Utc::now(),
        }
    }
}
