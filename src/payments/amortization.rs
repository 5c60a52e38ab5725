use log::trace;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::config::{LoanSpec, LoanTerms, MAX_YEARS};
use crate::decimal::Rate;
use crate::errors::{LoanError, Result};
use crate::interest::{balloon_payment, periodic_payment, MONTHS_PER_YEAR};
use crate::types::{LoanType, PeriodKind};

use super::{Period, Schedule};

/// balances below this are treated as fully repaid
pub const BALANCE_EPSILON: f64 = 0.01;

/// amortization calculator
pub struct AmortizationCalculator {
    loan_type: LoanType,
}

impl AmortizationCalculator {
    pub fn new(loan_type: LoanType) -> Self {
        Self { loan_type }
    }

    /// calculator matching the loan's own terms
    pub fn for_spec(spec: &LoanSpec) -> Self {
        Self::new(spec.loan_type())
    }

    pub fn loan_type(&self) -> LoanType {
        self.loan_type
    }

    /// calculate full amortization schedule
    pub fn calculate_schedule(&self, spec: &LoanSpec) -> Result<Schedule> {
        if spec.loan_type() != self.loan_type {
            return Err(LoanError::invalid(
                "type",
                format!(
                    "{} calculator cannot schedule a {} loan",
                    self.loan_type,
                    spec.loan_type()
                ),
            ));
        }

        if spec.years > MAX_YEARS {
            return Err(LoanError::invalid(
                "years",
                format!("must be at most {MAX_YEARS}, got {}", spec.years),
            ));
        }

        let principal = spec.principal.to_f64();
        let periods = match &spec.terms {
            LoanTerms::Fixed { rate } => fixed(principal, *rate, spec.years)?,
            LoanTerms::Variable { rates } => {
                let rates = normalize_rates(rates, spec.years)?;
                variable(principal, &rates)?
            }
            LoanTerms::InterestOnly {
                rate,
                interest_only_years,
            } => interest_only(principal, *rate, spec.years, *interest_only_years)?,
            LoanTerms::Balloon {
                rate,
                balloon_percent,
            } => balloon(principal, *rate, spec.years, *balloon_percent)?,
        };

        trace!(
            "{} schedule generated with {} periods",
            self.loan_type,
            periods.len()
        );
        Ok(Schedule::new(self.loan_type.period_kind(), periods))
    }
}

/// pad with the last rate or truncate so there is exactly one rate per year
pub fn normalize_rates(rates: &[Rate], years: u32) -> Result<Vec<Rate>> {
    let last = rates
        .last()
        .copied()
        .ok_or_else(|| LoanError::calculation("variable loan has no rates"))?;

    let years = years as usize;
    let mut normalized: Vec<Rate> = rates.iter().copied().take(years).collect();
    normalized.resize(years, last);
    Ok(normalized)
}

fn finite(value: f64, what: &str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LoanError::calculation(format!("{what} is not a finite number")))
    }
}

/// level-payment replay shared by the fixed loan and the interest-only tail
fn amortize(
    principal: f64,
    payment: f64,
    r: f64,
    first_index: u32,
    count: u32,
    rate: Rate,
) -> Vec<Period> {
    let mut periods = Vec::with_capacity(count as usize);
    let mut balance = principal;

    for index in first_index..first_index + count {
        let interest = balance * r;
        let principal_paid = (payment - interest).min(balance);
        balance -= principal_paid;

        let settled = balance.abs() < BALANCE_EPSILON;
        if settled {
            balance = 0.0;
        }
        periods.push(Period::from_f64(
            index,
            payment,
            interest,
            principal_paid,
            balance.max(0.0),
            rate,
        ));
        if settled {
            break;
        }
    }

    periods
}

fn fixed(principal: f64, rate: Rate, years: u32) -> Result<Vec<Period>> {
    let r = rate.monthly_rate();
    let n = years * MONTHS_PER_YEAR;
    let payment = finite(periodic_payment(principal, r, n), "fixed payment")?;

    Ok(amortize(principal, payment, r, 1, n, rate))
}

/// annual periods, re-amortizing the balance each year at that year's rate
fn variable(principal: f64, rates: &[Rate]) -> Result<Vec<Period>> {
    let years = rates.len() as u32;
    let mut periods = Vec::with_capacity(rates.len());
    let mut balance = principal;

    for (year, rate) in (1..=years).zip(rates.iter().copied()) {
        let r = rate.period_rate(PeriodKind::Year.periods_per_year());
        let remaining = years - year + 1;

        let mut payment = finite(periodic_payment(balance, r, remaining), "variable payment")?;
        let interest = balance * r;
        let mut principal_paid = payment - interest;

        if year == years {
            principal_paid = balance;
            payment = interest + principal_paid;
        }
        balance -= principal_paid;

        let settled = balance.abs() < BALANCE_EPSILON;
        if settled {
            balance = 0.0;
        }
        periods.push(Period::from_f64(
            year,
            payment,
            interest,
            principal_paid,
            balance.max(0.0),
            rate,
        ));
        if settled {
            break;
        }
    }

    Ok(periods)
}

fn interest_only(
    principal: f64,
    rate: Rate,
    years: u32,
    interest_only_years: Option<u32>,
) -> Result<Vec<Period>> {
    let r = rate.monthly_rate();
    let io_years = match interest_only_years {
        Some(io) if io < years => io,
        _ => years,
    };
    let io_months = io_years * MONTHS_PER_YEAR;
    let tail_months = (years - io_years) * MONTHS_PER_YEAR;

    let interest = finite(principal * r, "interest-only payment")?;
    let mut periods: Vec<Period> = (1..=io_months)
        .map(|month| Period::from_f64(month, interest, interest, 0.0, principal, rate))
        .collect();

    if tail_months > 0 {
        let payment = finite(
            periodic_payment(principal, r, tail_months),
            "amortizing payment",
        )?;
        periods.extend(amortize(principal, payment, r, io_months + 1, tail_months, rate));
    }

    Ok(periods)
}

fn balloon(principal: f64, rate: Rate, years: u32, balloon_percent: Decimal) -> Result<Vec<Period>> {
    let r = rate.monthly_rate();
    let n = years * MONTHS_PER_YEAR;
    let balloon = principal * balloon_percent.to_f64().unwrap_or_default() / 100.0;
    let payment = finite(balloon_payment(principal, balloon, r, n), "balloon payment")?;

    let mut periods = Vec::with_capacity(n as usize);
    let mut balance = principal;

    for month in 1..=n {
        let interest = balance * r;

        if month == n {
            // bullet: the balloon rides on the last cash flow
            let principal_paid = balance - balloon;
            periods.push(Period::from_f64(
                month,
                interest + principal_paid + balloon,
                interest,
                principal_paid + balloon,
                0.0,
                rate,
            ));
            break;
        }

        let principal_paid = (payment - interest).min(balance);
        balance -= principal_paid;
        periods.push(Period::from_f64(
            month,
            payment,
            interest,
            principal_paid,
            balance.max(0.0),
            rate,
        ));
    }

    Ok(periods)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::interest::balance_after;
    use approx::assert_abs_diff_eq;
    use rust_decimal_macros::dec;

    fn schedule(spec: &LoanSpec) -> Schedule {
        AmortizationCalculator::for_spec(spec)
            .calculate_schedule(spec)
            .unwrap()
    }

    fn assert_balance_non_increasing(schedule: &Schedule) {
        for pair in schedule.periods.windows(2) {
            assert!(pair[0].balance_after >= pair[1].balance_after);
        }
    }

    #[test]
    fn test_zero_rate_fixed_schedule() {
        let spec = LoanSpec::fixed(Money::from_major(12_000), Rate::ZERO, 1);
        let schedule = schedule(&spec);

        assert_eq!(schedule.len(), 12);
        for period in &schedule {
            assert_eq!(period.payment, Money::from_major(1000));
            assert_eq!(period.interest, Money::ZERO);
        }
        assert_eq!(schedule.last().unwrap().balance_after, Money::ZERO);
    }

    #[test]
    fn test_standard_fixed_schedule() {
        let spec = LoanSpec::fixed(Money::from_major(100_000), Rate::from_percent(dec!(6)), 30);
        let schedule = schedule(&spec);

        assert_eq!(schedule.len(), 360);
        assert_eq!(schedule.period_kind, PeriodKind::Month);
        assert_eq!(schedule.first().unwrap().payment, Money::from_str_exact("599.55").unwrap());
        assert_eq!(schedule.last().unwrap().balance_after, Money::ZERO);

        // period-level rounding drifts the principal total by a few cents at most
        let drift = (schedule.total_principal() - spec.principal).abs();
        assert!(drift <= Money::from_str_exact("0.5").unwrap());
        assert_balance_non_increasing(&schedule);
    }

    #[test]
    fn test_totals_are_round_then_sum() {
        let spec = LoanSpec::fixed(Money::from_major(100_000), Rate::from_percent(dec!(6)), 30);
        let schedule = schedule(&spec);

        let rounded_interest = schedule
            .iter()
            .fold(Decimal::ZERO, |acc, p| acc + p.interest.as_decimal());
        assert_eq!(schedule.total_interest().as_decimal(), rounded_interest);

        // sum-then-round stays close but is not what totals report
        let r = 0.005;
        let payment = periodic_payment(100_000.0, r, 360);
        let mut balance = 100_000.0;
        let mut exact_interest = 0.0;
        for _ in 0..360 {
            let interest = balance * r;
            exact_interest += interest;
            balance -= (payment - interest).min(balance);
        }
        assert_abs_diff_eq!(
            schedule.total_interest().to_f64(),
            exact_interest,
            epsilon = 360.0 * 0.005
        );
    }

    #[test]
    fn test_balloon_schedule() {
        let spec = LoanSpec::balloon(
            Money::from_major(200_000),
            Rate::from_percent(dec!(5)),
            15,
            dec!(50),
        );
        let schedule = schedule(&spec);

        assert_eq!(schedule.len(), 180);
        let last = schedule.last().unwrap();
        let before_last = schedule.get_period(179).unwrap();
        assert_eq!(last.balance_after, Money::ZERO);

        // the last principal clears whatever was left before it, balloon included
        assert_abs_diff_eq!(
            last.principal_paid.to_f64(),
            before_last.balance_after.to_f64(),
            epsilon = 0.011
        );

        let r = 0.05 / 12.0;
        let payment = balloon_payment(200_000.0, 100_000.0, r, 180);
        assert_abs_diff_eq!(balance_after(200_000.0, payment, r, 180), 100_000.0, epsilon = 1e-6);
        assert!(last.payment.to_f64() > 100_000.0);
        assert_abs_diff_eq!(
            last.payment.to_f64() - last.interest.to_f64() - 100_000.0,
            last.principal_paid.to_f64() - 100_000.0,
            epsilon = 0.011
        );
    }

    #[test]
    fn test_variable_rate_padding() {
        let rates = vec![Rate::from_percent(dec!(3)), Rate::from_percent(dec!(4))];
        let normalized = normalize_rates(&rates, 5).unwrap();
        let four = Rate::from_percent(dec!(4));
        assert_eq!(
            normalized,
            vec![Rate::from_percent(dec!(3)), four, four, four, four]
        );

        let spec = LoanSpec::variable(Money::from_major(50_000), rates, 5);
        let schedule = schedule(&spec);
        assert_eq!(schedule.period_kind, PeriodKind::Year);
        assert_eq!(schedule.len(), 5);
        assert_eq!(schedule.first().unwrap().annual_rate, Rate::from_percent(dec!(3)));
        assert_eq!(schedule.last().unwrap().annual_rate, four);
        assert_eq!(schedule.last().unwrap().balance_after, Money::ZERO);
        assert_balance_non_increasing(&schedule);
    }

    #[test]
    fn test_variable_rates_truncate() {
        let rates: Vec<Rate> = [2, 3, 4, 5].iter().map(|r| Rate::from_percent(Decimal::from(*r))).collect();
        let normalized = normalize_rates(&rates, 2).unwrap();
        assert_eq!(normalized, rates[..2].to_vec());
        assert!(normalize_rates(&[], 3).is_err());
    }

    #[test]
    fn test_interest_only_whole_term() {
        let principal = Money::from_major(100_000);
        let spec = LoanSpec::interest_only(principal, Rate::from_percent(dec!(6)), 10, None);
        let schedule = schedule(&spec);

        assert_eq!(schedule.len(), 120);
        for period in &schedule {
            assert_eq!(period.payment, Money::from_major(500));
            assert_eq!(period.principal_paid, Money::ZERO);
            assert_eq!(period.balance_after, principal);
        }
    }

    #[test]
    fn test_interest_only_with_amortizing_tail() {
        let principal = Money::from_major(100_000);
        let spec = LoanSpec::interest_only(principal, Rate::from_percent(dec!(6)), 30, Some(5));
        let schedule = schedule(&spec);

        assert_eq!(schedule.len(), 360);
        assert_eq!(schedule.get_period(60).unwrap().balance_after, principal);

        let first_amortizing = schedule.get_period(61).unwrap();
        assert_eq!(first_amortizing.index, 61);
        assert_abs_diff_eq!(
            first_amortizing.payment.to_f64(),
            periodic_payment(100_000.0, 0.005, 300),
            epsilon = 0.005
        );
        assert_eq!(schedule.last().unwrap().balance_after, Money::ZERO);
        assert_balance_non_increasing(&schedule);
    }

    #[test]
    fn test_generation_is_idempotent() {
        let spec = LoanSpec::balloon(Money::from_major(80_000), Rate::from_percent(dec!(4.5)), 7, dec!(30));
        assert_eq!(schedule(&spec), schedule(&spec));
    }

    #[test]
    fn test_zero_years_is_a_calculation_error() {
        let spec = LoanSpec::fixed(Money::from_major(1000), Rate::from_percent(dec!(5)), 0);
        let result = AmortizationCalculator::new(LoanType::Fixed).calculate_schedule(&spec);
        assert!(matches!(result, Err(LoanError::Calculation { .. })));
    }

    #[test]
    fn test_overlong_term_is_rejected_before_allocating() {
        let spec = LoanSpec::fixed(Money::from_major(1000), Rate::from_percent(dec!(5)), 200_000_000);
        let result = AmortizationCalculator::new(LoanType::Fixed).calculate_schedule(&spec);
        assert!(matches!(result, Err(LoanError::InvalidInput { ref field, .. }) if field == "years"));
    }

    #[test]
    fn test_calculator_rejects_other_loan_types() {
        let spec = LoanSpec::fixed(Money::from_major(1000), Rate::from_percent(dec!(5)), 1);
        let result = AmortizationCalculator::new(LoanType::Balloon).calculate_schedule(&spec);
        assert!(matches!(result, Err(LoanError::InvalidInput { .. })));
    }
}
