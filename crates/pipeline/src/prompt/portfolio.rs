use churnguard_core::assessment::PortfolioAssets;
use churnguard_core::schema::Schema;

use super::PromptTemplate;

/// Portfolio synthesis prompt. Takes no input; every request is identical.
#[derive(Debug, Clone)]
pub struct PortfolioPrompt {
    title: String,
}

impl PortfolioPrompt {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

impl Default for PortfolioPrompt {
    fn default() -> Self {
        Self::new("ChurnGuard-ML")
    }
}

impl PromptTemplate for PortfolioPrompt {
    type Input = ();
    type Output = PortfolioAssets;

    fn name(&self) -> &'static str {
        "portfolio_assets"
    }

    fn instruction(&self, _input: &()) -> String {
        format!(
            "Generate a concise, professional Python script using scikit-learn and XGBoost \
             for Telco Churn prediction.\n\
             Also generate a README.md for a GitHub repository titled '{}'.\n\
             Format as JSON with keys 'sourceCode' (the script) and 'documentation' (the README).",
            self.title
        )
    }

    fn schema(&self) -> Schema {
        portfolio_schema()
    }
}

/// Output schema of the portfolio pipeline.
pub fn portfolio_schema() -> Schema {
    Schema::object()
        .required(
            "sourceCode",
            Schema::string().describe("Python training script"),
        )
        .required(
            "documentation",
            Schema::string().describe("README.md contents"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_fields_are_required() {
        assert_eq!(
            portfolio_schema().required_fields(),
            ["sourceCode".to_string(), "documentation".to_string()]
        );
    }

    #[test]
    fn instruction_names_the_repository() {
        let text = PortfolioPrompt::default().instruction(&());
        assert!(text.contains("'ChurnGuard-ML'"));
        assert!(text.contains("scikit-learn and XGBoost"));
        assert!(PortfolioPrompt::new("Retention").instruction(&()).contains("'Retention'"));
    }
}
