//! Pipeline outputs: the churn risk assessment and the portfolio assets.

use serde::{Deserialize, Serialize};

use crate::schema::Conform;

/// Discrete churn-risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
            RiskLevel::Critical => "Critical",
        }
    }

    /// The conventional band for a churn probability.
    ///
    /// Quartile cut points: below 0.25 is Low, below 0.5 Medium, below 0.75
    /// High, anything else Critical.
    pub fn for_probability(probability: f64) -> Self {
        if probability < 0.25 {
            RiskLevel::Low
        } else if probability < 0.5 {
            RiskLevel::Medium
        } else if probability < 0.75 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One feature's contribution to the local explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorWeight {
    pub factor: String,
    pub weight: f64,
}

/// A candidate model's score in the comparison table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub name: String,
    pub score: f64,
}

/// The churn inference pipeline's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnAssessment {
    /// In `[0, 1]`.
    pub churn_probability: f64,
    pub risk_level: RiskLevel,
    /// Ordered by the service; may be empty.
    pub top_factors: Vec<FactorWeight>,
    pub recommendation: String,
    /// Accepted and kept, not displayed.
    pub reasoning: String,
    /// Usually three entries, not enforced.
    pub model_comparison: Vec<ModelScore>,
}

impl ChurnAssessment {
    /// Whether the reported band matches the reported probability.
    ///
    /// The service is not bound to this convention, so a mismatch is a
    /// soft-validation finding rather than a decoding failure.
    pub fn risk_level_consistent(&self) -> bool {
        RiskLevel::for_probability(self.churn_probability) == self.risk_level
    }

    /// The highest-scoring model in the comparison, if any.
    pub fn best_model(&self) -> Option<&ModelScore> {
        self.model_comparison
            .iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

impl Conform for ChurnAssessment {
    fn conform(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if !(0.0..=1.0).contains(&self.churn_probability) {
            violations.push(format!(
                "$.churnProbability: {} is outside [0, 1]",
                self.churn_probability
            ));
        }
        for (i, factor) in self.top_factors.iter().enumerate() {
            if !factor.weight.is_finite() {
                violations.push(format!("$.topFactors[{i}].weight: not a finite number"));
            }
        }
        for (i, model) in self.model_comparison.iter().enumerate() {
            if !model.score.is_finite() {
                violations.push(format!("$.modelComparison[{i}].score: not a finite number"));
            }
        }
        violations
    }

    fn advisories(&self) -> Vec<String> {
        if self.risk_level_consistent() {
            Vec::new()
        } else {
            vec![format!(
                "riskLevel {} does not match churnProbability {} (expected {})",
                self.risk_level,
                self.churn_probability,
                RiskLevel::for_probability(self.churn_probability)
            )]
        }
    }
}

/// The portfolio synthesis pipeline's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioAssets {
    /// A generated training script.
    pub source_code: String,
    /// Generated long-form README text.
    pub documentation: String,
}

impl Conform for PortfolioAssets {
    fn conform(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.source_code.trim().is_empty() {
            violations.push("$.sourceCode: must not be blank".to_string());
        }
        if self.documentation.trim().is_empty() {
            violations.push("$.documentation: must not be blank".to_string());
        }
        violations
    }
}
