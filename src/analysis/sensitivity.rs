use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::config::{require_positive, require_rate, require_years, LoanRequest};
use crate::decimal::{Money, Rate};
use crate::errors::Result;

use super::fixed_schedule;

/// percentage points added to the base rate
pub const RATE_DELTAS: [Decimal; 9] = [
    dec!(-2),
    dec!(-1.5),
    dec!(-1),
    dec!(-0.5),
    dec!(0),
    dec!(0.5),
    dec!(1),
    dec!(1.5),
    dec!(2),
];

/// lowest rate a shifted scenario may use
pub const RATE_FLOOR: Decimal = dec!(0.1);

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityRow {
    pub rate: Rate,
    pub monthly_payment: Money,
    pub total_interest: Money,
    pub total_cost: Money,
    pub payment_change: Money,
    pub payment_change_pct: Decimal,
    pub interest_change: Money,
}

/// fixed-rate payment and interest under each shifted rate
pub fn sensitivity_analysis(request: &LoanRequest) -> Result<Vec<SensitivityRow>> {
    let principal = Money::from_f64(require_positive("principal", request.principal)?);
    let years = require_years("years", request.years)?;
    let base_rate = require_rate("rate", request.rate)?;

    let base = fixed_schedule(principal, base_rate, years)?;
    let base_payment = base.first().map(|p| p.payment).unwrap_or(Money::ZERO);
    let base_interest = base.total_interest();

    RATE_DELTAS
        .iter()
        .map(|delta| {
            let rate = Rate::from_percent((base_rate.as_percent() + delta).max(RATE_FLOOR));
            let schedule = fixed_schedule(principal, rate, years)?;
            let payment = schedule.first().map(|p| p.payment).unwrap_or(Money::ZERO);
            let total_interest = schedule.total_interest();

            let payment_change_pct = if base_payment.is_positive() {
                ((payment.as_decimal() / base_payment.as_decimal() - Decimal::ONE)
                    * Decimal::ONE_HUNDRED)
                    .round_dp(2)
            } else {
                Decimal::ZERO
            };

            Ok(SensitivityRow {
                rate: rate.round_dp(2),
                monthly_payment: payment,
                total_interest,
                total_cost: schedule.total_paid(),
                payment_change: payment - base_payment,
                payment_change_pct,
                interest_change: total_interest - base_interest,
            })
        })
        .collect()
}
