use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{
    parse_json, require_non_negative, require_positive, require_rate, require_years,
};
use crate::decimal::{round_f64, Money};
use crate::errors::Result;
use crate::interest::{npv, MONTHS_PER_YEAR};
use crate::types::Horizon;

use super::fixed_schedule;

/// months of savings discounted into the net present value
pub const NPV_HORIZON_MONTHS: u32 = 60;

/// break-even below this many months is recommended outright
pub const RECOMMENDED_BREAK_EVEN_MONTHS: f64 = 36.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinanceRequest {
    #[serde(default = "default_remaining_balance")]
    pub remaining_balance: f64,
    #[serde(default = "default_old_rate")]
    pub old_rate: f64,
    #[serde(default = "default_remaining_years")]
    pub remaining_years: i64,
    #[serde(default = "default_new_rate")]
    pub new_rate: f64,
    #[serde(default = "default_new_years")]
    pub new_years: i64,
    #[serde(default = "default_closing_costs")]
    pub closing_costs: f64,
    /// finance the closing costs into the new principal
    #[serde(default)]
    pub roll_costs: bool,
}

impl Default for RefinanceRequest {
    fn default() -> Self {
        Self {
            remaining_balance: default_remaining_balance(),
            old_rate: default_old_rate(),
            remaining_years: default_remaining_years(),
            new_rate: default_new_rate(),
            new_years: default_new_years(),
            closing_costs: default_closing_costs(),
            roll_costs: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Recommended,
    Consider,
    NotRecommended,
}

impl Recommendation {
    pub fn description(&self) -> &'static str {
        match self {
            Recommendation::Recommended => {
                "Recommended - Good savings with reasonable break-even period"
            }
            Recommendation::Consider => "Consider - Positive savings but long break-even period",
            Recommendation::NotRecommended => "Not Recommended - No monthly savings",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefinanceReport {
    pub old_monthly: Money,
    pub new_monthly: Money,
    pub monthly_savings: Money,
    pub break_even_months: Horizon,
    pub total_interest_savings: Money,
    /// absent when the new loan saves nothing monthly
    pub net_present_value: Option<Money>,
    pub recommendation: Recommendation,
}

impl RefinanceRequest {
    pub fn from_json(json: &str) -> Result<Self> {
        parse_json(json)
    }

    /// compare the remaining loan against a replacement loan
    pub fn analyze(&self) -> Result<RefinanceReport> {
        let balance = require_positive("remaining_balance", self.remaining_balance)?;
        let old_rate = require_rate("old_rate", self.old_rate)?;
        let old_years = require_years("remaining_years", self.remaining_years)?;
        let new_rate = require_rate("new_rate", self.new_rate)?;
        let new_years = require_years("new_years", self.new_years)?;
        let closing = require_non_negative("closing_costs", self.closing_costs)?;

        let new_principal = if self.roll_costs { balance + closing } else { balance };
        let old = fixed_schedule(Money::from_f64(balance), old_rate, old_years)?;
        let new = fixed_schedule(Money::from_f64(new_principal), new_rate, new_years)?;

        let old_monthly = old.first().map(|p| p.payment).unwrap_or(Money::ZERO);
        let new_monthly = new.first().map(|p| p.payment).unwrap_or(Money::ZERO);
        let monthly_savings = old_monthly - new_monthly;
        let savings = monthly_savings.to_f64();

        let (break_even_months, net_present_value, recommendation) = if monthly_savings.is_positive() {
            let break_even = closing / savings;
            let horizon = NPV_HORIZON_MONTHS.min(new_years * MONTHS_PER_YEAR) as usize;
            let mut cash_flows = Vec::with_capacity(horizon + 1);
            cash_flows.push(-closing);
            cash_flows.extend(std::iter::repeat(savings).take(horizon));
            // discounted at the new loan's rate over the whole horizon
            let value = npv(&cash_flows, new_rate.monthly_rate());
            let recommendation = if break_even < RECOMMENDED_BREAK_EVEN_MONTHS {
                Recommendation::Recommended
            } else {
                Recommendation::Consider
            };
            (
                Horizon::Periods(round_f64(break_even, 1)),
                Some(Money::from_f64(value)),
                recommendation,
            )
        } else {
            (Horizon::Never, None, Recommendation::NotRecommended)
        };

        debug!(
            "refinance saves {} monthly, break-even {}",
            monthly_savings, break_even_months
        );

        Ok(RefinanceReport {
            old_monthly,
            new_monthly,
            monthly_savings,
            break_even_months,
            total_interest_savings: old.total_interest() - new.total_interest(),
            net_present_value,
            recommendation,
        })
    }
}

fn default_remaining_balance() -> f64 {
    100_000.0
}

fn default_old_rate() -> f64 {
    5.0
}

fn default_remaining_years() -> i64 {
    25
}

fn default_new_rate() -> f64 {
    4.0
}

fn default_new_years() -> i64 {
    30
}

fn default_closing_costs() -> f64 {
    3000.0
}
