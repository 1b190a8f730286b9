//! Insight port: optional narrative enrichment of a screening.
//!
//! An enrichment result is only ever attached to a stored screening. It never
//! changes the risk score, tier or recommendations, and a failure here must
//! never fail the screening.

use serde::{Deserialize, Serialize};

use crate::domain::{Gender, RiskLevel, ScreeningInput};

/// Errors an insight provider may report.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InsightError {
    #[error("Insight enrichment is disabled")]
    Disabled,

    #[error("Insight provider unavailable: {0}")]
    Unavailable(String),

    #[error("Insight provider returned an unusable response: {0}")]
    MalformedResponse(String),
}

/// Everything a provider may look at: demographics, the input and the computed tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightRequest {
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub input: ScreeningInput,
    pub risk_level: RiskLevel,
    pub risk_score: u32,
}

/// Narrative produced by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthInsight {
    /// Short clinical summary
    pub summary: String,

    /// Key concerns, one per line item
    pub concerns: Vec<String>,

    /// Markdown narrative stored on the screening
    pub formatted_insights: String,
}

/// Trait for narrative enrichment providers.
pub trait InsightProvider: Send + Sync {
    /// Produce a narrative for a scored screening.
    ///
    /// # Errors
    /// Returns an `InsightError` when the provider is disabled, unreachable,
    /// or answers with something that cannot be used.
    fn analyze(&self, request: &InsightRequest) -> Result<HealthInsight, InsightError>;
}
