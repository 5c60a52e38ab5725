use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{parse_json, require_non_negative, require_positive};
use crate::decimal::{round_f64, Money};
use crate::errors::Result;

/// monthly income, debts and the proposed housing payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffordabilityRequest {
    #[serde(default = "default_income")]
    pub income: f64,
    #[serde(default = "default_debts")]
    pub debts: f64,
    #[serde(default = "default_payment")]
    pub payment: f64,
    /// front-end limit, percent of income
    #[serde(default = "default_housing_ratio")]
    pub housing_ratio: f64,
    /// back-end limit, percent of income
    #[serde(default = "default_total_ratio")]
    pub total_ratio: f64,
}

impl Default for AffordabilityRequest {
    fn default() -> Self {
        Self {
            income: default_income(),
            debts: default_debts(),
            payment: default_payment(),
            housing_ratio: default_housing_ratio(),
            total_ratio: default_total_ratio(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AffordabilityReport {
    pub front_end_ratio: Decimal,
    pub back_end_ratio: Decimal,
    pub affordable_front: bool,
    pub affordable_back: bool,
    pub max_affordable_payment: Money,
    pub affordable: bool,
    pub recommendation: String,
}

impl AffordabilityRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        parse_json(json)
    }

    /// debt-to-income ratios against the configured limits
    pub fn assess(&self) -> Result<AffordabilityReport> {
        let income = require_positive("income", self.income)?;
        let debts = require_non_negative("debts", self.debts)?;
        let payment = require_non_negative("payment", self.payment)?;
        let housing_ratio = require_non_negative("housing_ratio", self.housing_ratio)?;
        let total_ratio = require_non_negative("total_ratio", self.total_ratio)?;

        let front_end = payment / income * 100.0;
        let back_end = (debts + payment) / income * 100.0;
        let max_by_front = income * housing_ratio / 100.0;
        let max_by_back = income * total_ratio / 100.0 - debts;

        let affordable_front = front_end <= housing_ratio;
        let affordable_back = back_end <= total_ratio;
        let affordable = affordable_front && affordable_back;

        let recommendation = if affordable {
            "Loan is affordable based on standard ratios.".to_string()
        } else {
            let mut advice = Vec::new();
            if !affordable_front {
                advice.push(format!(
                    "Reduce housing payment to ${max_by_front:.2} or less."
                ));
            }
            if !affordable_back {
                advice.push(format!(
                    "Reduce total debt payment to ${max_by_back:.2} or less."
                ));
            }
            advice.join(" ")
        };

        Ok(AffordabilityReport {
            front_end_ratio: round_f64(front_end, 2),
            back_end_ratio: round_f64(back_end, 2),
            affordable_front,
            affordable_back,
            max_affordable_payment: Money::from_f64(max_by_front.min(max_by_back)),
            affordable,
            recommendation,
        })
    }
}

fn default_income() -> f64 {
    5000.0
}

fn default_debts() -> f64 {
    500.0
}

fn default_payment() -> f64 {
    1000.0
}

fn default_housing_ratio() -> f64 {
    28.0
}

fn default_total_ratio() -> f64 {
    36.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_request_is_affordable() {
        let report = AffordabilityRequest::default().assess().unwrap();

        assert_eq!(report.front_end_ratio, dec!(20));
        assert_eq!(report.back_end_ratio, dec!(30));
        assert!(report.affordable);
        assert_eq!(report.max_affordable_payment, Money::from_major(1300));
        assert_eq!(report.recommendation, "Loan is affordable based on standard ratios.");
    }

    #[test]
    fn test_over_limit_payment() {
        let request = AffordabilityRequest::from_json(r#"{"income": 4000, "debts": 800, "payment": 1500}"#)
            .unwrap();
        let report = request.assess().unwrap();

        assert!(!report.affordable_front);
        assert!(!report.affordable_back);
        assert!(!report.affordable);
        // min(4000 * 28%, 4000 * 36% - 800)
        assert_eq!(report.max_affordable_payment, Money::from_major(640));
        assert_eq!(
            report.recommendation,
            "Reduce housing payment to $1120.00 or less. Reduce total debt payment to $640.00 or less."
        );
    }

    #[test]
    fn test_zero_income_is_rejected() {
        let request = AffordabilityRequest {
            income: 0.0,
            ..AffordabilityRequest::default()
        };
        assert!(request.assess().is_err());
    }
}
