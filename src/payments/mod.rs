pub mod amortization;
pub mod prepayment;

use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::PeriodKind;

pub use amortization::AmortizationCalculator;
pub use prepayment::{
    LumpSumAnalysis, OptimalPrepayment, PrepaymentAnalysis, PrepaymentBaseline,
    PrepaymentPolicy, PrepaymentScenario, PrepaymentSimulator,
};

/// one amortization step
///
/// `index` is the month number, or the year number for variable loans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub index: u32,
    pub payment: Money,
    pub interest: Money,
    pub principal_paid: Money,
    pub balance_after: Money,
    pub annual_rate: Rate,
}

impl Period {
    /// round full-precision accumulators into an emitted period
    pub(crate) fn from_f64(
        index: u32,
        payment: f64,
        interest: f64,
        principal_paid: f64,
        balance_after: f64,
        annual_rate: Rate,
    ) -> Self {
        Self {
            index,
            payment: Money::from_f64(payment),
            interest: Money::from_f64(interest),
            principal_paid: Money::from_f64(principal_paid),
            balance_after: Money::from_f64(balance_after),
            annual_rate,
        }
    }
}

/// chronological sequence of periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub period_kind: PeriodKind,
    pub periods: Vec<Period>,
}

impl Schedule {
    pub fn new(period_kind: PeriodKind, periods: Vec<Period>) -> Self {
        Self { period_kind, periods }
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Period> {
        self.periods.iter()
    }

    pub fn first(&self) -> Option<&Period> {
        self.periods.first()
    }

    pub fn last(&self) -> Option<&Period> {
        self.periods.last()
    }

    /// get period by its 1-based index
    pub fn get_period(&self, index: u32) -> Option<&Period> {
        index
            .checked_sub(1)
            .and_then(|i| self.periods.get(i as usize))
    }

    /// sum of rounded payments
    pub fn total_paid(&self) -> Money {
        self.periods.iter().map(|p| p.payment).sum()
    }

    /// sum of rounded interest
    pub fn total_interest(&self) -> Money {
        self.periods.iter().map(|p| p.interest).sum()
    }

    /// sum of rounded principal
    pub fn total_principal(&self) -> Money {
        self.periods.iter().map(|p| p.principal_paid).sum()
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = &'a Period;
    type IntoIter = std::slice::Iter<'a, Period>;

    fn into_iter(self) -> Self::IntoIter {
        self.periods.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn period(index: u32, payment: i64, interest: i64, balance: i64) -> Period {
        Period {
            index,
            payment: Money::from_major(payment),
            interest: Money::from_major(interest),
            principal_paid: Money::from_major(payment - interest),
            balance_after: Money::from_major(balance),
            annual_rate: Rate::from_percent(dec!(5)),
        }
    }

    #[test]
    fn test_totals_sum_rounded_values() {
        let schedule = Schedule::new(
            PeriodKind::Month,
            vec![period(1, 100, 10, 910), period(2, 100, 9, 819)],
        );

        assert_eq!(schedule.total_paid(), Money::from_major(200));
        assert_eq!(schedule.total_interest(), Money::from_major(19));
        assert_eq!(schedule.total_principal(), Money::from_major(181));
    }

    #[test]
    fn test_period_lookup_is_one_based() {
        let schedule = Schedule::new(PeriodKind::Month, vec![period(1, 100, 10, 910)]);

        assert!(schedule.get_period(0).is_none());
        assert_eq!(schedule.get_period(1).map(|p| p.index), Some(1));
        assert!(schedule.get_period(2).is_none());
    }
}
