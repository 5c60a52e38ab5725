use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::interest::MONTHS_PER_YEAR;
use crate::types::LoanType;

/// longest term any generator accepts, in years
pub const MAX_YEARS: u32 = 100;

/// validated loan terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanSpec {
    pub principal: Money,
    pub years: u32,
    pub fees: Money,
    #[serde(flatten)]
    pub terms: LoanTerms,
}

/// type-specific loan terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoanTerms {
    Fixed {
        rate: Rate,
    },
    Variable {
        /// one rate per year, padded or truncated to the term when scheduled
        rates: Vec<Rate>,
    },
    InterestOnly {
        rate: Rate,
        /// interest-only span; `None` means the whole term
        interest_only_years: Option<u32>,
    },
    Balloon {
        rate: Rate,
        /// share of principal due at maturity, 0..=100
        balloon_percent: Decimal,
    },
}

impl LoanTerms {
    pub fn loan_type(&self) -> LoanType {
        match self {
            LoanTerms::Fixed { .. } => LoanType::Fixed,
            LoanTerms::Variable { .. } => LoanType::Variable,
            LoanTerms::InterestOnly { .. } => LoanType::InterestOnly,
            LoanTerms::Balloon { .. } => LoanType::Balloon,
        }
    }

    /// single quoted rate, absent for variable loans
    pub fn nominal_rate(&self) -> Option<Rate> {
        match self {
            LoanTerms::Fixed { rate }
            | LoanTerms::InterestOnly { rate, .. }
            | LoanTerms::Balloon { rate, .. } => Some(*rate),
            LoanTerms::Variable { .. } => None,
        }
    }
}

impl LoanSpec {
    /// create fixed-rate loan
    pub fn fixed(principal: Money, rate: Rate, years: u32) -> Self {
        Self {
            principal,
            years,
            fees: Money::ZERO,
            terms: LoanTerms::Fixed { rate },
        }
    }

    /// create variable-rate loan with one rate per year
    pub fn variable(principal: Money, rates: Vec<Rate>, years: u32) -> Self {
        Self {
            principal,
            years,
            fees: Money::ZERO,
            terms: LoanTerms::Variable { rates },
        }
    }

    /// create interest-only loan
    pub fn interest_only(
        principal: Money,
        rate: Rate,
        years: u32,
        interest_only_years: Option<u32>,
    ) -> Self {
        Self {
            principal,
            years,
            fees: Money::ZERO,
            terms: LoanTerms::InterestOnly {
                rate,
                interest_only_years,
            },
        }
    }

    /// create balloon loan
    pub fn balloon(principal: Money, rate: Rate, years: u32, balloon_percent: Decimal) -> Self {
        Self {
            principal,
            years,
            fees: Money::ZERO,
            terms: LoanTerms::Balloon {
                rate,
                balloon_percent,
            },
        }
    }

    pub fn with_fees(mut self, fees: Money) -> Self {
        self.fees = fees;
        self
    }

    pub fn loan_type(&self) -> LoanType {
        self.terms.loan_type()
    }

    pub fn term_months(&self) -> u32 {
        self.years.saturating_mul(MONTHS_PER_YEAR)
    }

    /// reject values no generator can schedule
    pub fn validate(&self) -> Result<()> {
        if !self.principal.is_positive() {
            return Err(LoanError::invalid("principal", "must be greater than 0"));
        }
        if self.years == 0 {
            return Err(LoanError::invalid("years", "must be greater than 0"));
        }
        if self.years > MAX_YEARS {
            return Err(LoanError::invalid(
                "years",
                format!("must be at most {MAX_YEARS}, got {}", self.years),
            ));
        }
        if self.fees.is_negative() {
            return Err(LoanError::invalid("fees", "must not be negative"));
        }

        match &self.terms {
            LoanTerms::Variable { rates } => {
                if rates.is_empty() {
                    return Err(LoanError::invalid("rates", "variable rates are required"));
                }
                if rates.iter().any(|r| r.as_percent() < Decimal::ZERO) {
                    return Err(LoanError::invalid("rates", "rates must not be negative"));
                }
            }
            LoanTerms::Balloon {
                rate,
                balloon_percent,
            } => {
                check_rate(rate)?;
                if *balloon_percent < Decimal::ZERO || *balloon_percent > Decimal::ONE_HUNDRED {
                    return Err(LoanError::invalid(
                        "balloon_percent",
                        format!("must be within 0..=100, got {balloon_percent}"),
                    ));
                }
            }
            LoanTerms::Fixed { rate } | LoanTerms::InterestOnly { rate, .. } => check_rate(rate)?,
        }
        Ok(())
    }
}

fn check_rate(rate: &Rate) -> Result<()> {
    if rate.as_percent() < Decimal::ZERO {
        return Err(LoanError::invalid("rate", format!("must not be negative, got {rate}")));
    }
    Ok(())
}

/// variable rates as sent by callers: a list or a comma-separated string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RateList {
    Values(Vec<f64>),
    Text(String),
}

impl RateList {
    /// parse into percentages, skipping blank items
    pub fn parse(&self) -> Result<Vec<f64>> {
        match self {
            RateList::Values(values) => Ok(values.clone()),
            RateList::Text(text) => text
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| {
                    item.parse::<f64>().map_err(|_| {
                        LoanError::invalid("rates", format!("'{item}' is not a number"))
                    })
                })
                .collect(),
        }
    }
}

impl From<Vec<f64>> for RateList {
    fn from(values: Vec<f64>) -> Self {
        RateList::Values(values)
    }
}

impl From<&str> for RateList {
    fn from(text: &str) -> Self {
        RateList::Text(text.to_string())
    }
}

/// raw loan request, every field optional with a default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    #[serde(rename = "type", default = "default_loan_type")]
    pub loan_type: String,
    #[serde(default = "default_principal")]
    pub principal: f64,
    #[serde(default = "default_rate")]
    pub rate: f64,
    #[serde(default)]
    pub rates: Option<RateList>,
    #[serde(default = "default_years")]
    pub years: i64,
    #[serde(default)]
    pub fees: f64,
    #[serde(default)]
    pub interest_only_years: Option<i64>,
    #[serde(default = "default_balloon_percent", alias = "balloon")]
    pub balloon_percent: f64,
    /// label used when comparing offers
    #[serde(default)]
    pub name: Option<String>,
}

impl Default for LoanRequest {
    fn default() -> Self {
        Self {
            loan_type: default_loan_type(),
            principal: default_principal(),
            rate: default_rate(),
            rates: None,
            years: default_years(),
            fees: 0.0,
            interest_only_years: None,
            balloon_percent: default_balloon_percent(),
            name: None,
        }
    }
}

impl LoanRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        parse_json(json)
    }

    /// fixed-rate request for the given terms
    pub fn fixed(principal: f64, rate: f64, years: i64) -> Self {
        Self {
            principal,
            rate,
            years,
            ..Self::default()
        }
    }
}

/// raw prepayment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepaymentRequest {
    #[serde(default = "default_principal")]
    pub principal: f64,
    #[serde(default = "default_rate")]
    pub rate: f64,
    #[serde(default = "default_years")]
    pub years: i64,
    #[serde(default)]
    pub prepayment_amount: f64,
    #[serde(default = "default_prepayment_start")]
    pub prepayment_start: i64,
    /// a frequency name or "all"
    #[serde(default = "default_prepayment_frequency")]
    pub prepayment_frequency: String,
}

impl Default for PrepaymentRequest {
    fn default() -> Self {
        Self {
            principal: default_principal(),
            rate: default_rate(),
            years: default_years(),
            prepayment_amount: 0.0,
            prepayment_start: default_prepayment_start(),
            prepayment_frequency: default_prepayment_frequency(),
        }
    }
}

impl PrepaymentRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        parse_json(json)
    }
}

/// deserialize any request record, reporting malformed json as invalid input
pub fn parse_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(|e| LoanError::invalid("request", e.to_string()))
}

fn default_loan_type() -> String {
    LoanType::Fixed.as_str().to_string()
}

fn default_principal() -> f64 {
    100_000.0
}

fn default_rate() -> f64 {
    5.0
}

fn default_years() -> i64 {
    30
}

fn default_balloon_percent() -> f64 {
    20.0
}

fn default_prepayment_start() -> i64 {
    1
}

fn default_prepayment_frequency() -> String {
    "monthly".to_string()
}

pub(crate) fn require_positive(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value <= 0.0 {
        return Err(LoanError::invalid(field, format!("must be greater than 0, got {value}")));
    }
    Ok(value)
}

pub(crate) fn require_non_negative(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(LoanError::invalid(field, format!("must not be negative, got {value}")));
    }
    Ok(value)
}

/// non-negative percentage that fits a `Rate`
pub(crate) fn require_rate(field: &str, value: f64) -> Result<Rate> {
    let value = require_non_negative(field, value)?;
    Rate::from_f64(value)
        .map_err(|_| LoanError::invalid(field, format!("{value} is out of range")))
}

/// whole-year term within `1..=MAX_YEARS`
pub(crate) fn require_years(field: &str, value: i64) -> Result<u32> {
    if value <= 0 {
        return Err(LoanError::invalid(field, format!("must be greater than 0, got {value}")));
    }
    u32::try_from(value)
        .ok()
        .filter(|years| *years <= MAX_YEARS)
        .ok_or_else(|| {
            LoanError::invalid(field, format!("must be at most {MAX_YEARS}, got {value}"))
        })
}
