use log::{debug, trace};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{
    require_non_negative, require_positive, require_rate, require_years, LoanSpec, LoanTerms,
    PrepaymentRequest,
};
use crate::decimal::{round_f64, Money, Rate};
use crate::errors::{LoanError, Result};
use crate::interest::{balance_after, periodic_payment};
use crate::types::{
    Efficiency, FrequencySelection, Horizon, PeriodKind, PrepaymentFrequency, ScenarioRating,
};

use super::amortization::BALANCE_EPSILON;
use super::{Period, Schedule};

/// fixed extra amounts tried by the optimal-amount search, before 1% of principal
pub const CANDIDATE_AMOUNTS: [i64; 4] = [100, 200, 500, 1000];

/// when and how much extra principal is paid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrepaymentPolicy {
    pub extra_amount: Money,
    /// 1-based month of the first extra payment
    pub start_period: u32,
    pub frequency: PrepaymentFrequency,
}

impl PrepaymentPolicy {
    pub fn new(extra_amount: Money, start_period: u32, frequency: PrepaymentFrequency) -> Result<Self> {
        if extra_amount.is_negative() {
            return Err(LoanError::invalid("prepayment_amount", "must not be negative"));
        }
        if start_period < 1 {
            return Err(LoanError::invalid("prepayment_start", "must be at least 1"));
        }
        Ok(Self {
            extra_amount,
            start_period,
            frequency,
        })
    }
}

/// the loan repaid without extras
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrepaymentBaseline {
    pub total_interest: Money,
    pub total_months: u32,
    pub monthly_payment: Money,
}

/// outcome of one prepayment policy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrepaymentScenario {
    pub frequency: PrepaymentFrequency,
    pub schedule: Schedule,
    pub total_months: u32,
    pub months_saved: u32,
    pub total_interest: Money,
    pub interest_savings: Money,
    /// months of average savings needed to recoup one extra payment
    pub payback_period: Horizon,
    pub final_payment: Money,
    pub rating: ScenarioRating,
}

/// one candidate of the optimal-amount search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimalPrepayment {
    pub prepayment_amount: Money,
    pub interest_savings: Money,
    pub months_saved: u32,
    pub roi_percent: Decimal,
    pub efficiency: Efficiency,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrepaymentAnalysis {
    pub original: PrepaymentBaseline,
    pub scenarios: Vec<PrepaymentScenario>,
    pub optimal_prepayments: Vec<OptimalPrepayment>,
    /// scenario with the largest interest savings
    pub best_scenario: Option<PrepaymentScenario>,
    pub highest_roi: Option<OptimalPrepayment>,
}

/// effect of a single lump sum against the contractual schedule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LumpSumAnalysis {
    pub lump_sum_amount: Money,
    pub lump_sum_month: u32,
    pub balance_before: Money,
    pub balance_after: Money,
    pub new_monthly_payment: Money,
    pub interest_savings: Money,
    pub effective_roi: Decimal,
    pub months_eliminated: u32,
}

/// full-precision result of one month-by-month replay
struct Replay {
    periods: Vec<Period>,
    total_interest: f64,
    months: u32,
}

/// replays a fixed-rate loan with extra principal contributions
#[derive(Debug, Clone)]
pub struct PrepaymentSimulator {
    principal: f64,
    rate: Rate,
    term_months: u32,
    base_payment: f64,
}

impl PrepaymentSimulator {
    /// only fixed-rate loans can be replayed
    pub fn new(spec: &LoanSpec) -> Result<Self> {
        let rate = match &spec.terms {
            LoanTerms::Fixed { rate } => *rate,
            other => {
                return Err(LoanError::invalid(
                    "type",
                    format!("prepayment simulation needs a fixed loan, got {}", other.loan_type()),
                ))
            }
        };
        spec.validate()?;

        let principal = spec.principal.to_f64();
        let term_months = spec.term_months();
        let base_payment = periodic_payment(principal, rate.monthly_rate(), term_months);
        if !base_payment.is_finite() {
            return Err(LoanError::calculation("base payment is not a finite number"));
        }

        Ok(Self {
            principal,
            rate,
            term_months,
            base_payment,
        })
    }

    pub fn base_payment(&self) -> Money {
        Money::from_f64(self.base_payment)
    }

    pub fn term_months(&self) -> u32 {
        self.term_months
    }

    fn replay(&self, extra: f64, start: u32, frequency: Option<PrepaymentFrequency>) -> Replay {
        let r = self.rate.monthly_rate();
        let mut periods = Vec::with_capacity(self.term_months as usize);
        let mut balance = self.principal;
        let mut total_interest = 0.0;
        let mut month = 1;

        while balance > BALANCE_EPSILON && month <= self.term_months {
            let interest = balance * r;
            total_interest += interest;

            let extra_due = frequency.is_some_and(|f| f.applies_at(month, start));
            let mut principal_paid = self.base_payment - interest;
            if extra_due {
                principal_paid += extra;
            }
            principal_paid = principal_paid.min(balance);
            balance -= principal_paid;

            periods.push(Period::from_f64(
                month,
                interest + principal_paid,
                interest,
                principal_paid,
                balance.max(0.0),
                self.rate,
            ));
            month += 1;
        }

        Replay {
            periods,
            total_interest,
            months: month - 1,
        }
    }

    fn baseline_replay(&self) -> Replay {
        self.replay(0.0, 1, None)
    }

    pub fn baseline(&self) -> PrepaymentBaseline {
        let baseline = self.baseline_replay();
        PrepaymentBaseline {
            total_interest: Money::from_f64(baseline.total_interest),
            total_months: baseline.months,
            monthly_payment: self.base_payment(),
        }
    }

    /// replay one policy against the no-extra baseline
    pub fn simulate(&self, policy: &PrepaymentPolicy) -> PrepaymentScenario {
        self.scenario(&self.baseline_replay(), policy)
    }

    fn scenario(&self, baseline: &Replay, policy: &PrepaymentPolicy) -> PrepaymentScenario {
        let extra = policy.extra_amount.to_f64();
        let replay = self.replay(extra, policy.start_period, Some(policy.frequency));
        let savings = baseline.total_interest - replay.total_interest;

        let payback_period = if savings > 0.0 && replay.months > 0 {
            let monthly_savings = savings / replay.months as f64;
            Horizon::Periods(round_f64(extra / monthly_savings, 1))
        } else {
            Horizon::Never
        };
        let rating = if savings > extra * 0.5 {
            ScenarioRating::Good
        } else {
            ScenarioRating::Moderate
        };
        let final_payment = replay
            .periods
            .last()
            .map(|p| p.payment)
            .unwrap_or(Money::ZERO);

        trace!(
            "{} prepayment of {} saves {:.2} over {} months",
            policy.frequency,
            policy.extra_amount,
            savings,
            replay.months
        );

        PrepaymentScenario {
            frequency: policy.frequency,
            total_months: replay.months,
            months_saved: baseline.months.saturating_sub(replay.months),
            total_interest: Money::from_f64(replay.total_interest),
            interest_savings: Money::from_f64(savings),
            payback_period,
            final_payment,
            rating,
            schedule: Schedule::new(PeriodKind::Month, replay.periods),
        }
    }

    /// amounts evaluated by the optimal-amount search
    pub fn candidate_amounts(&self) -> Vec<Money> {
        CANDIDATE_AMOUNTS
            .iter()
            .map(|amount| Money::from_major(*amount))
            .chain(std::iter::once(Money::from_f64(self.principal * 0.01)))
            .collect()
    }

    /// monthly extras of every candidate amount from `start`
    pub fn optimal_amounts(&self, start: u32) -> Vec<OptimalPrepayment> {
        let baseline = self.baseline_replay();
        self.optimal_against(&baseline, start)
    }

    fn optimal_against(&self, baseline: &Replay, start: u32) -> Vec<OptimalPrepayment> {
        self.candidate_amounts()
            .par_iter()
            .map(|amount| {
                let extra = amount.to_f64();
                let replay = self.replay(extra, start, Some(PrepaymentFrequency::Monthly));
                let savings = baseline.total_interest - replay.total_interest;
                let roi = if extra > 0.0 { savings / extra * 100.0 } else { 0.0 };
                let roi_percent = round_f64(roi, 1);

                trace!("candidate {} returns {}% on interest", amount, roi_percent);

                OptimalPrepayment {
                    prepayment_amount: *amount,
                    interest_savings: Money::from_f64(savings),
                    months_saved: baseline.months.saturating_sub(replay.months),
                    roi_percent,
                    efficiency: Efficiency::from_roi(roi),
                }
            })
            .collect()
    }

    /// evaluate the selected frequencies and the optimal-amount search
    pub fn analyze(
        &self,
        extra_amount: Money,
        start_period: u32,
        selection: FrequencySelection,
    ) -> Result<PrepaymentAnalysis> {
        let policies = selection
            .frequencies()
            .into_iter()
            .map(|frequency| PrepaymentPolicy::new(extra_amount, start_period, frequency))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "analyzing {} prepayment policies of {} from month {}",
            policies.len(),
            extra_amount,
            start_period
        );

        let baseline = self.baseline_replay();
        let scenarios: Vec<PrepaymentScenario> = policies
            .par_iter()
            .map(|policy| self.scenario(&baseline, policy))
            .collect();
        let optimal_prepayments = self.optimal_against(&baseline, start_period);

        let best_scenario = scenarios
            .iter()
            .reduce(|best, s| if s.interest_savings > best.interest_savings { s } else { best })
            .cloned();
        let highest_roi = optimal_prepayments
            .iter()
            .reduce(|best, o| if o.roi_percent > best.roi_percent { o } else { best })
            .cloned();

        Ok(PrepaymentAnalysis {
            original: PrepaymentBaseline {
                total_interest: Money::from_f64(baseline.total_interest),
                total_months: baseline.months,
                monthly_payment: self.base_payment(),
            },
            scenarios,
            optimal_prepayments,
            best_scenario,
            highest_roi,
        })
    }

    /// one lump sum paid in `month`, measured against the contractual balance
    pub fn lump_sum(&self, amount: Money, month: u32) -> Result<LumpSumAnalysis> {
        if amount.is_negative() {
            return Err(LoanError::invalid("lump_sum_amount", "must not be negative"));
        }
        if month < 1 || month > self.term_months {
            return Err(LoanError::invalid(
                "lump_sum_month",
                format!("must be within 1..={}, got {month}", self.term_months),
            ));
        }

        let r = self.rate.monthly_rate();
        let extra = amount.to_f64();
        let contractual = |k: u32| balance_after(self.principal, self.base_payment, r, k).max(0.0);

        let balance_before = contractual(month - 1);
        let reduced = (balance_before - extra).max(0.0);
        let remaining = self.term_months - month + 1;
        let new_payment = periodic_payment(reduced, r, remaining);
        let savings = (contractual(month) - reduced) * r * remaining as f64;

        let effective_roi = if extra > 0.0 {
            round_f64(savings / extra * 100.0, 1)
        } else {
            Decimal::ZERO
        };
        let months_eliminated = if new_payment > 0.0 {
            (extra / new_payment).floor() as u32
        } else {
            0
        };

        Ok(LumpSumAnalysis {
            lump_sum_amount: amount,
            lump_sum_month: month,
            balance_before: Money::from_f64(balance_before),
            balance_after: Money::from_f64(reduced),
            new_monthly_payment: Money::from_f64(new_payment),
            interest_savings: Money::from_f64(savings),
            effective_roi,
            months_eliminated,
        })
    }
}

/// validate a raw prepayment request and run the full analysis
pub fn analyze_request(request: &PrepaymentRequest) -> Result<PrepaymentAnalysis> {
    let principal = require_positive("principal", request.principal)?;
    let years = require_years("years", request.years)?;
    let rate = require_rate("rate", request.rate)?;
    let extra = require_non_negative("prepayment_amount", request.prepayment_amount)?;
    let start = u32::try_from(request.prepayment_start)
        .ok()
        .filter(|start| *start >= 1)
        .ok_or_else(|| {
            LoanError::invalid(
                "prepayment_start",
                format!("must be at least 1, got {}", request.prepayment_start),
            )
        })?;
    let selection: FrequencySelection = request.prepayment_frequency.parse()?;

    let spec = LoanSpec::fixed(Money::from_f64(principal), rate, years);
    PrepaymentSimulator::new(&spec)?.analyze(Money::from_f64(extra), start, selection)
}
