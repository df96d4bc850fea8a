//! `churnguard predict` - Assess one customer's churn risk.

use std::path::{Path, PathBuf};

use churnguard_core::{ChurnAssessment, CustomerForm, CustomerRecord, FormNumber};
use churnguard_pipeline::churn_pipeline;
use clap::Args;

use super::load_config;

#[derive(Args, Debug, Default)]
pub struct PredictArgs {
    /// Read the customer form as JSON from a file, or `-` for stdin
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,

    /// Tenure in months
    #[arg(long)]
    pub tenure: Option<String>,

    /// Monthly charges
    #[arg(long)]
    pub monthly_charges: Option<String>,

    /// Total charges to date
    #[arg(long)]
    pub total_charges: Option<String>,

    /// Month-to-month, One year or Two year
    #[arg(long)]
    pub contract: Option<String>,

    /// DSL, Fiber optic or No
    #[arg(long)]
    pub internet_service: Option<String>,

    /// Yes or No
    #[arg(long)]
    pub tech_support: Option<String>,

    /// Yes or No
    #[arg(long)]
    pub paperless_billing: Option<String>,

    #[arg(long)]
    pub payment_method: Option<String>,

    /// Print the assessment as JSON
    #[arg(long)]
    pub raw: bool,
}

impl PredictArgs {
    /// Flags override fields read from `--json`.
    fn into_form(self, base: CustomerForm) -> CustomerForm {
        let number = |flag: Option<String>, fallback: Option<FormNumber>| {
            flag.map(FormNumber::Text).or(fallback)
        };
        CustomerForm {
            tenure_months: number(self.tenure, base.tenure_months),
            monthly_charges: number(self.monthly_charges, base.monthly_charges),
            total_charges: number(self.total_charges, base.total_charges),
            contract_type: self.contract.or(base.contract_type),
            internet_service: self.internet_service.or(base.internet_service),
            tech_support: self.tech_support.or(base.tech_support),
            paperless_billing: self.paperless_billing.or(base.paperless_billing),
            payment_method: self.payment_method.or(base.payment_method),
        }
    }
}

fn read_form(source: &Path) -> Result<CustomerForm, Box<dyn std::error::Error>> {
    let text = if source == Path::new("-") {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(source)
            .map_err(|e| format!("Failed to read {}: {e}", source.display()))?
    };
    Ok(serde_json::from_str(&text)?)
}

pub async fn run(config_path: &Path, args: PredictArgs) -> Result<(), Box<dyn std::error::Error>> {
    let base = match &args.json {
        Some(source) => read_form(source)?,
        None => CustomerForm::default(),
    };
    let raw = args.raw;
    let record = CustomerRecord::try_from(args.into_form(base))?;

    let config = load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let provider = churnguard_providers::build_from_config(&config)?;
    let pipeline = churn_pipeline(provider, &config);

    let assessment = pipeline.run(record).await.into_result()?;

    if raw {
        println!("{}", serde_json::to_string_pretty(&assessment)?);
    } else {
        print!("{}", render(&assessment));
    }
    Ok(())
}

/// Human-readable summary of an assessment.
pub fn render(assessment: &ChurnAssessment) -> String {
    let mut lines = vec![format!(
        "Churn probability: {:.1}% ({})",
        assessment.churn_probability * 100.0,
        assessment.risk_level
    )];
    if !assessment.risk_level_consistent() {
        lines.push("  (risk level does not match the probability band)".into());
    }

    if !assessment.top_factors.is_empty() {
        lines.push("\nTop factors:".into());
        lines.extend(
            assessment
                .top_factors
                .iter()
                .map(|factor| format!("  - {} ({:.2})", factor.factor, factor.weight)),
        );
    }

    lines.push(format!("\nRecommendation:\n  {}", assessment.recommendation));

    if !assessment.model_comparison.is_empty() {
        lines.push("\nModel comparison:".into());
        lines.extend(
            assessment
                .model_comparison
                .iter()
                .map(|model| format!("  {:<22} {:.2}", model.name, model.score)),
        );
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
