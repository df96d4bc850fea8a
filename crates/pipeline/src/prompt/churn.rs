use churnguard_core::assessment::{ChurnAssessment, RiskLevel};
use churnguard_core::customer::CustomerRecord;
use churnguard_core::error::PipelineError;
use churnguard_core::schema::Schema;

use super::PromptTemplate;

/// Models the service is asked to compare, in table order.
pub const COMPARED_MODELS: [&str; 3] = ["Logistic Regression", "Random Forest", "XGBoost"];

/// Churn inference prompt.
#[derive(Debug, Clone)]
pub struct ChurnPrompt {
    currency: String,
}

impl ChurnPrompt {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

impl Default for ChurnPrompt {
    fn default() -> Self {
        Self::new("INR")
    }
}

impl PromptTemplate for ChurnPrompt {
    type Input = CustomerRecord;
    type Output = ChurnAssessment;

    fn name(&self) -> &'static str {
        "churn_assessment"
    }

    fn system(&self) -> Option<String> {
        Some(
            "Act as a Senior ML Engineer working on telecom customer retention. \
             Respond with a single JSON object and nothing else."
                .into(),
        )
    }

    fn validate(&self, customer: &CustomerRecord) -> Result<(), PipelineError> {
        customer.validate().map_err(PipelineError::from)
    }

    fn instruction(&self, customer: &CustomerRecord) -> String {
        let currency = &self.currency;
        let levels: Vec<&str> = RiskLevel::ALL.iter().map(RiskLevel::as_str).collect();
        [
            "Analyze this customer data for churn:".to_string(),
            format!("- Tenure: {} months", customer.tenure_months),
            format!("- Monthly Charges: {currency} {:.2}", customer.monthly_charges),
            format!("- Total Charges: {currency} {:.2}", customer.total_charges),
            format!("- Contract: {}", customer.contract_type.label()),
            format!("- Internet Service: {}", customer.internet_service.label()),
            format!("- Tech Support: {}", customer.tech_support.label()),
            format!("- Paperless Billing: {}", customer.paperless_billing.label()),
            format!("- Payment Method: {}", customer.payment_method),
            String::new(),
            "Return a JSON object with these keys:".to_string(),
            "- churnProbability (number between 0 and 1)".to_string(),
            format!("- riskLevel (one of {})", levels.join("/")),
            "- topFactors (array of {factor: string, weight: number})".to_string(),
            "- recommendation (business retention strategy)".to_string(),
            "- reasoning (ML explanation)".to_string(),
            format!(
                "- modelComparison (array of {{name: string, score: number}} for {})",
                COMPARED_MODELS.join(", ")
            ),
            String::new(),
            "The reasoning should mention feature engineering such as 'tenure groups' \
             or 'interaction terms'."
                .to_string(),
        ]
        .join("\n")
    }

    fn schema(&self) -> Schema {
        churn_schema()
    }
}

/// Output schema of the churn pipeline.
pub fn churn_schema() -> Schema {
    let levels: Vec<&str> = RiskLevel::ALL.iter().map(RiskLevel::as_str).collect();
    Schema::object()
        .required(
            "churnProbability",
            Schema::number()
                .range(0.0, 1.0)
                .describe("Probability that the customer churns"),
        )
        .required("riskLevel", Schema::string_enum(levels))
        .required(
            "topFactors",
            Schema::array(
                Schema::object()
                    .required("factor", Schema::string())
                    .required("weight", Schema::number()),
            )
            .describe("Local explanation, most influential first"),
        )
        .required(
            "recommendation",
            Schema::string().describe("Business retention strategy"),
        )
        .required("reasoning", Schema::string().describe("ML explanation"))
        .required(
            "modelComparison",
            Schema::array(
                Schema::object()
                    .required("name", Schema::string())
                    .required("score", Schema::number()),
            ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use churnguard_core::customer::{ContractType, InternetService, YesNo};

    #[test]
    fn schema_requires_exactly_the_assessment_fields() {
        let schema = churn_schema();
        let mut required = schema.required_fields().to_vec();
        required.sort();
        assert_eq!(
            required,
            vec![
                "churnProbability",
                "modelComparison",
                "reasoning",
                "recommendation",
                "riskLevel",
                "topFactors",
            ]
        );
    }

    #[test]
    fn schema_bounds_probability_and_enumerates_levels() {
        let rendered = churn_schema().to_json_schema();
        let probability = &rendered["properties"]["churnProbability"];
        assert_eq!(probability["minimum"], 0.0);
        assert_eq!(probability["maximum"], 1.0);
        assert_eq!(
            rendered["properties"]["riskLevel"]["enum"],
            serde_json::json!(["Low", "Medium", "High", "Critical"])
        );
        assert_eq!(rendered["properties"]["topFactors"]["type"], "array");
    }

    #[test]
    fn instruction_renders_every_field() {
        let customer = CustomerRecord {
            tenure_months: 3,
            monthly_charges: 899.5,
            total_charges: 2698.5,
            contract_type: ContractType::MonthToMonth,
            internet_service: InternetService::Fiber,
            tech_support: YesNo::No,
            paperless_billing: YesNo::Yes,
            payment_method: "Credit card".into(),
        };
        let text = ChurnPrompt::default().instruction(&customer);
        assert!(text.contains("Tenure: 3 months"));
        assert!(text.contains("Monthly Charges: INR 899.50"));
        assert!(text.contains("Total Charges: INR 2698.50"));
        assert!(text.contains("Contract: Month-to-month"));
        assert!(text.contains("Internet Service: Fiber optic"));
        assert!(text.contains("Tech Support: No"));
        assert!(text.contains("Paperless Billing: Yes"));
        assert!(text.contains("Payment Method: Credit card"));
        assert!(text.contains("Logistic Regression, Random Forest, XGBoost"));
        assert!(text.contains("tenure groups"));
    }

    #[test]
    fn currency_label_is_configurable() {
        let text = ChurnPrompt::new("USD").instruction(&CustomerRecord::default());
        assert!(text.contains("Monthly Charges: USD 599.00"));
    }

    #[test]
    fn validate_rejects_negative_and_non_finite_charges() {
        let prompt = ChurnPrompt::default();
        assert!(prompt.validate(&CustomerRecord::default()).is_ok());

        let negative = CustomerRecord {
            monthly_charges: -500.0,
            ..CustomerRecord::default()
        };
        match prompt.validate(&negative) {
            Err(PipelineError::InvalidInput { field, .. }) => assert_eq!(field, "monthlyCharges"),
            other => panic!("expected invalid input, got {other:?}"),
        }

        let nan = CustomerRecord {
            total_charges: f64::NAN,
            ..CustomerRecord::default()
        };
        match prompt.validate(&nan) {
            Err(PipelineError::InvalidInput { field, .. }) => assert_eq!(field, "totalCharges"),
            other => panic!("expected invalid input, got {other:?}"),
        }
    }

    #[test]
    fn instruction_is_deterministic() {
        let prompt = ChurnPrompt::default();
        let customer = CustomerRecord::default();
        assert_eq!(prompt.instruction(&customer), prompt.instruction(&customer));
    }
}
