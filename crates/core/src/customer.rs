//! Customer attributes: the input of the churn inference pipeline.
//!
//! [`CustomerRecord`] is the validated, fully-populated record the prompt
//! builder consumes. [`CustomerForm`] is what arrives from the dashboard's
//! form: every field optional, numbers possibly still text. Conversion
//! between the two is where the record's invariants are enforced.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A customer as submitted for churn analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRecord {
    pub tenure_months: u32,
    pub monthly_charges: f64,
    pub total_charges: f64,
    pub contract_type: ContractType,
    pub internet_service: InternetService,
    pub tech_support: YesNo,
    pub paperless_billing: YesNo,
    /// Open-ended; the dashboard offers UPI, card, net banking and others.
    pub payment_method: String,
}

impl CustomerRecord {
    /// Check the numeric invariants of a record built in code.
    pub fn validate(&self) -> Result<()> {
        check_amount("monthlyCharges", self.monthly_charges)?;
        check_amount("totalCharges", self.total_charges)?;
        if self.payment_method.trim().is_empty() {
            return Err(Error::invalid_input("paymentMethod", "must not be empty"));
        }
        Ok(())
    }
}

fn check_amount(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() {
        return Err(Error::invalid_input(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(Error::invalid_input(field, "must not be negative"));
    }
    Ok(value)
}

impl Default for CustomerRecord {
    /// The dashboard form's initial values.
    fn default() -> Self {
        Self {
            tenure_months: 12,
            monthly_charges: 599.0,
            total_charges: 7188.0,
            contract_type: ContractType::MonthToMonth,
            internet_service: InternetService::Fiber,
            tech_support: YesNo::No,
            paperless_billing: YesNo::Yes,
            payment_method: "UPI".into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractType {
    #[serde(rename = "Month-to-month", alias = "month-to-month")]
    MonthToMonth,
    #[serde(rename = "One year", alias = "one-year")]
    OneYear,
    #[serde(rename = "Two year", alias = "two-year")]
    TwoYear,
}

impl ContractType {
    pub fn label(&self) -> &'static str {
        match self {
            ContractType::MonthToMonth => "Month-to-month",
            ContractType::OneYear => "One year",
            ContractType::TwoYear => "Two year",
        }
    }
}

impl std::str::FromStr for ContractType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "month-to-month" | "monthly" => Ok(ContractType::MonthToMonth),
            "one year" | "one-year" => Ok(ContractType::OneYear),
            "two year" | "two-year" => Ok(ContractType::TwoYear),
            other => Err(Error::invalid_input(
                "contractType",
                format!("unknown contract type '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InternetService {
    #[serde(rename = "DSL", alias = "dsl")]
    Dsl,
    #[serde(rename = "Fiber optic", alias = "fiber")]
    Fiber,
    #[serde(rename = "No", alias = "none")]
    NoService,
}

impl InternetService {
    pub fn label(&self) -> &'static str {
        match self {
            InternetService::Dsl => "DSL",
            InternetService::Fiber => "Fiber optic",
            InternetService::NoService => "No internet service",
        }
    }
}

impl std::str::FromStr for InternetService {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dsl" => Ok(InternetService::Dsl),
            "fiber optic" | "fiber" => Ok(InternetService::Fiber),
            "no" | "none" => Ok(InternetService::NoService),
            other => Err(Error::invalid_input(
                "internetService",
                format!("unknown internet service '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YesNo {
    #[serde(rename = "Yes", alias = "yes")]
    Yes,
    #[serde(rename = "No", alias = "no")]
    No,
}

impl YesNo {
    pub fn label(&self) -> &'static str {
        match self {
            YesNo::Yes => "Yes",
            YesNo::No => "No",
        }
    }

    fn parse(field: &str, s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" => Ok(YesNo::Yes),
            "no" | "false" => Ok(YesNo::No),
            other => Err(Error::invalid_input(
                field,
                format!("expected Yes or No, got '{other}'"),
            )),
        }
    }
}

impl From<bool> for YesNo {
    fn from(value: bool) -> Self {
        if value { YesNo::Yes } else { YesNo::No }
    }
}

/// A numeric form field: either already a number or text to coerce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormNumber {
    Number(f64),
    Text(String),
}

impl FormNumber {
    fn coerce(&self, field: &str) -> Result<f64> {
        let value = match self {
            FormNumber::Number(n) => *n,
            FormNumber::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(Error::invalid_input(field, "is required"));
                }
                trimmed.parse::<f64>().map_err(|_| {
                    Error::invalid_input(field, format!("'{trimmed}' is not a number"))
                })?
            }
        };
        check_amount(field, value)
    }
}

impl From<f64> for FormNumber {
    fn from(value: f64) -> Self {
        FormNumber::Number(value)
    }
}

impl From<&str> for FormNumber {
    fn from(value: &str) -> Self {
        FormNumber::Text(value.to_string())
    }
}

/// Raw form submission, before coercion and validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerForm {
    #[serde(alias = "tenure")]
    pub tenure_months: Option<FormNumber>,
    pub monthly_charges: Option<FormNumber>,
    pub total_charges: Option<FormNumber>,
    #[serde(alias = "contract")]
    pub contract_type: Option<String>,
    pub internet_service: Option<String>,
    pub tech_support: Option<String>,
    pub paperless_billing: Option<String>,
    pub payment_method: Option<String>,
}

fn present<'a, T>(field: &str, value: &'a Option<T>) -> Result<&'a T> {
    value
        .as_ref()
        .ok_or_else(|| Error::invalid_input(field, "is required"))
}

impl TryFrom<CustomerForm> for CustomerRecord {
    type Error = Error;

    fn try_from(form: CustomerForm) -> Result<Self> {
        let tenure = present("tenureMonths", &form.tenure_months)?.coerce("tenureMonths")?;
        if tenure.fract() != 0.0 || tenure > f64::from(u32::MAX) {
            return Err(Error::invalid_input(
                "tenureMonths",
                "must be a whole number of months",
            ));
        }

        let payment_method = present("paymentMethod", &form.payment_method)?
            .trim()
            .to_string();
        if payment_method.is_empty() {
            return Err(Error::invalid_input("paymentMethod", "is required"));
        }

        Ok(CustomerRecord {
            tenure_months: tenure as u32,
            monthly_charges: present("monthlyCharges", &form.monthly_charges)?
                .coerce("monthlyCharges")?,
            total_charges: present("totalCharges", &form.total_charges)?
                .coerce("totalCharges")?,
            contract_type: present("contractType", &form.contract_type)?.parse()?,
            internet_service: present("internetService", &form.internet_service)?.parse()?,
            tech_support: YesNo::parse("techSupport", present("techSupport", &form.tech_support)?)?,
            paperless_billing: YesNo::parse(
                "paperlessBilling",
                present("paperlessBilling", &form.paperless_billing)?,
            )?,
            payment_method,
        })
    }
}
