use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{parse_json, require_non_negative};
use crate::decimal::{round_f64, Money};
use crate::errors::Result;

/// deductible mortgage interest, 6% of a 750k acquisition-debt limit
pub const MORTGAGE_INTEREST_CAP: Money = Money::from_major_const(45_000);
/// deductible state and local property tax
pub const PROPERTY_TAX_CAP: Money = Money::from_major_const(10_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilingStatus {
    Single,
    MarriedJoint,
    MarriedSeparate,
    HeadOfHousehold,
}

impl FilingStatus {
    /// unrecognized names file as single
    pub fn from_name(name: &str) -> Self {
        match name {
            "married_joint" => FilingStatus::MarriedJoint,
            "married_separate" => FilingStatus::MarriedSeparate,
            "head_of_household" => FilingStatus::HeadOfHousehold,
            _ => FilingStatus::Single,
        }
    }

    pub fn standard_deduction(&self) -> Money {
        match self {
            FilingStatus::Single | FilingStatus::MarriedSeparate => Money::from_major(12_950),
            FilingStatus::MarriedJoint => Money::from_major(25_900),
            FilingStatus::HeadOfHousehold => Money::from_major(19_400),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxRequest {
    #[serde(default = "default_annual_interest")]
    pub annual_interest: f64,
    /// marginal rate, percent
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    #[serde(default)]
    pub property_tax: f64,
    #[serde(default = "default_filing_status")]
    pub filing_status: String,
}

impl Default for TaxRequest {
    fn default() -> Self {
        Self {
            annual_interest: default_annual_interest(),
            tax_rate: default_tax_rate(),
            property_tax: 0.0,
            filing_status: default_filing_status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaxReport {
    pub filing_status: FilingStatus,
    pub annual_interest: Money,
    pub tax_rate: Decimal,
    pub tax_savings: Money,
    pub effective_interest: Money,
    pub should_itemize: bool,
    pub itemized_deductions: Money,
    pub standard_deduction: Money,
    pub net_interest_cost: Money,
}

impl TaxRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        parse_json(json)
    }

    /// itemize-or-standard decision for mortgage interest and property tax
    pub fn assess(&self) -> Result<TaxReport> {
        let annual_interest =
            Money::from_f64(require_non_negative("annual_interest", self.annual_interest)?);
        let tax_rate = round_f64(require_non_negative("tax_rate", self.tax_rate)?, 4);
        let property_tax = Money::from_f64(require_non_negative("property_tax", self.property_tax)?);
        let filing_status = FilingStatus::from_name(&self.filing_status);
        let standard_deduction = filing_status.standard_deduction();

        let interest_deduction = annual_interest.min(MORTGAGE_INTEREST_CAP);
        let itemized_deductions = interest_deduction + property_tax.min(PROPERTY_TAX_CAP);
        let should_itemize = itemized_deductions > standard_deduction;

        let (tax_savings, effective_interest) = if should_itemize {
            (
                itemized_deductions.percentage(tax_rate),
                annual_interest - interest_deduction.percentage(tax_rate),
            )
        } else {
            (Money::ZERO, annual_interest)
        };

        Ok(TaxReport {
            filing_status,
            annual_interest,
            tax_rate,
            tax_savings,
            effective_interest,
            should_itemize,
            itemized_deductions,
            standard_deduction,
            net_interest_cost: effective_interest,
        })
    }
}

fn default_annual_interest() -> f64 {
    5000.0
}

fn default_tax_rate() -> f64 {
    25.0
}

fn default_filing_status() -> String {
    "single".to_string()
}
