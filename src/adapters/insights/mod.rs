//! Insight adapters: narrative enrichment for scored screenings.
//!
//! - `TemplateInsights`: offline, rule-based markdown narrative
//! - `DisabledInsights`: always declines, for deployments without enrichment
//!
//! Both take their settings through the constructor; there is no global
//! client or key.

use std::fmt::Write as _;

use crate::domain::{RiskLevel, SmokingStatus};
use crate::ports::{HealthInsight, InsightError, InsightProvider, InsightRequest};

/// Settings for the insight provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightConfig {
    /// Whether enrichment runs at all
    pub enabled: bool,

    /// Label of the narrative source, recorded in logs
    pub model: String,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: "template-v1".to_string(),
        }
    }
}

/// Offline narrative built from the screening values and the computed tier.
#[derive(Debug, Clone)]
pub struct TemplateInsights {
    config: InsightConfig,
}

impl TemplateInsights {
    #[must_use]
    pub fn new(config: InsightConfig) -> Self {
        Self { config }
    }

    fn observations(request: &InsightRequest) -> Vec<String> {
        let input = &request.input;
        let mut observations = Vec::new();

        if let Some(age) = request.age.filter(|&age| age > 50) {
            observations.push(format!(
                "Patient age ({age}) increases susceptibility to chronic conditions."
            ));
        }
        if let Some(bmi) = input.bmi().filter(|&bmi| bmi > 25.0) {
            observations.push(format!(
                "BMI of {bmi:.1} indicates overweight/obesity, a major risk factor."
            ));
        }
        if let Some(systolic) = input.systolic_bp.filter(|&bp| bp > 130) {
            observations.push(format!(
                "Elevated Systolic BP ({systolic} mmHg) suggests hypertension."
            ));
        }
        if input.smoking_status == Some(SmokingStatus::Current) {
            observations.push("Smoking history significantly elevates cardiovascular risk.".to_string());
        }
        if let Some(glucose) = input.glucose_level.filter(|&g| g > 140.0) {
            observations.push(format!(
                "Random glucose level of {glucose} mg/dL requires further diabetes screening."
            ));
        }

        observations
    }

    fn next_steps(level: RiskLevel) -> [&'static str; 2] {
        match level {
            RiskLevel::High => [
                "**Immediate Referral**: Schedule appointment with Medical Officer within 24 hours.",
                "**BP Monitoring**: Daily blood pressure checks recommended.",
            ],
            RiskLevel::Medium => [
                "**Lifestyle Change**: Reduce salt intake and increase physical activity.",
                "**Follow-up**: Re-screen in 1 month.",
            ],
            RiskLevel::Low => [
                "**Maintenance**: Continue healthy habits.",
                "**Screening**: Routine check-up in 6 months.",
            ],
        }
    }
}

impl InsightProvider for TemplateInsights {
    fn analyze(&self, request: &InsightRequest) -> Result<HealthInsight, InsightError> {
        if !self.config.enabled {
            return Err(InsightError::Disabled);
        }

        let concerns = Self::observations(request);

        let mut formatted = format!(
            "**AI Health Assessment**\n\nBased on the screening data, the patient is categorized as **{} Risk**.\n\n**Key Observations:**\n",
            request.risk_level
        );
        if concerns.is_empty() {
            formatted.push_str("- No major risk indicators observed.\n");
        }
        for concern in &concerns {
            // Writing into a String cannot fail.
            let _ = writeln!(formatted, "- {concern}");
        }
        formatted.push_str("\n**Recommendations:**\n");
        for (i, step) in Self::next_steps(request.risk_level).iter().enumerate() {
            let _ = writeln!(formatted, "{}. {step}", i + 1);
        }

        tracing::debug!(
            model = %self.config.model,
            concerns = concerns.len(),
            "Generated screening narrative"
        );

        Ok(HealthInsight {
            summary: format!(
                "Patient categorized as {} risk (score {}). {}",
                request.risk_level,
                request.risk_score,
                request.risk_level.description()
            ),
            concerns,
            formatted_insights: formatted,
        })
    }
}

/// Provider that never enriches.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledInsights;

impl InsightProvider for DisabledInsights {
    fn analyze(&self, _request: &InsightRequest) -> Result<HealthInsight, InsightError> {
        Err(InsightError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Gender, ScreeningInput};

    fn request(level: RiskLevel) -> InsightRequest {
        InsightRequest {
            age: Some(58),
            gender: Some(Gender::Female),
            input: ScreeningInput {
                height_cm: Some(170.0),
                weight_kg: Some(95.0),
                systolic_bp: Some(150),
                smoking_status: Some(SmokingStatus::Current),
                ..Default::default()
            },
            risk_level: level,
            risk_score: 65,
        }
    }

    #[test]
    fn test_template_narrative_structure() {
        let provider = TemplateInsights::new(InsightConfig::default());
        let insight = provider.analyze(&request(RiskLevel::High)).expect("Should analyze");

        assert!(insight
            .formatted_insights
            .starts_with("**AI Health Assessment**"));
        assert!(insight.formatted_insights.contains("**High Risk**"));
        assert!(insight.formatted_insights.contains("BMI of 32.9"));
        assert!(insight.formatted_insights.contains("1. **Immediate Referral**"));
        assert_eq!(insight.concerns.len(), 4);
    }

    #[test]
    fn test_template_without_observations() {
        let provider = TemplateInsights::new(InsightConfig::default());
        let req = InsightRequest {
            age: None,
            gender: None,
            input: ScreeningInput::default(),
            risk_level: RiskLevel::Low,
            risk_score: 0,
        };

        let insight = provider.analyze(&req).expect("Should analyze");
        assert!(insight.concerns.is_empty());
        assert!(insight
            .formatted_insights
            .contains("- No major risk indicators observed."));
        assert!(insight.formatted_insights.contains("**Maintenance**"));
    }

    #[test]
    fn test_disabled_config_declines() {
        let provider = TemplateInsights::new(InsightConfig {
            enabled: false,
            ..Default::default()
        });
        assert!(matches!(
            provider.analyze(&request(RiskLevel::Medium)),
            Err(InsightError::Disabled)
        ));
        assert!(matches!(
            DisabledInsights.analyze(&request(RiskLevel::Medium)),
            Err(InsightError::Disabled)
        ));
    }
}
