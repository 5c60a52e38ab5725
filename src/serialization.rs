//! Flat views handed to reporting and charting collaborators.

use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::dispatcher::{LoanCalculation, Summary};
use crate::errors::{LoanError, Result};
use crate::payments::{Period, Schedule};
use crate::types::{LoanType, PeriodKind};

/// one schedule row, named the way report columns are
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodView {
    pub period: u32,
    pub payment: Money,
    pub interest: Money,
    pub principal: Money,
    pub balance: Money,
    pub annual_rate: Rate,
}

impl From<&Period> for PeriodView {
    fn from(period: &Period) -> Self {
        PeriodView {
            period: period.index,
            payment: period.payment,
            interest: period.interest,
            principal: period.principal_paid,
            balance: period.balance_after,
            annual_rate: period.annual_rate,
        }
    }
}

/// serializable view of a built loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationView {
    pub loan_type: LoanType,
    pub period_kind: PeriodKind,
    pub summary: Summary,
    pub schedule: Vec<PeriodView>,
}

impl CalculationView {
    pub fn from_calculation(calc: &LoanCalculation) -> Self {
        CalculationView {
            loan_type: calc.spec.loan_type(),
            period_kind: calc.schedule.period_kind,
            summary: calc.summary.clone(),
            schedule: schedule_rows(&calc.schedule),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String> {
        to_json_pretty(self)
    }
}

pub fn schedule_rows(schedule: &Schedule) -> Vec<PeriodView> {
    schedule.iter().map(PeriodView::from).collect()
}

/// pretty json for any report, serializer failures surfaced as calculation errors
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| LoanError::calculation(e.to_string()))
}
