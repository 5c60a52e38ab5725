//! Period-rate and payment primitives shared by every schedule generator.
//!
//! All functions work on `f64` accumulators at full precision; rounding to
//! cents happens only when a value is emitted as a [`crate::payments::Period`].

pub mod apr;

pub use apr::{AprSolver, SolverConfig};

pub const MONTHS_PER_YEAR: u32 = 12;

/// period count as a `powi` exponent, saturating instead of wrapping
pub(crate) fn exponent<T: TryInto<i32>>(periods: T) -> i32 {
    periods.try_into().unwrap_or(i32::MAX)
}

/// convert an annual percentage into the rate for one of `periods_per_year` periods
pub fn period_rate(annual_percent: f64, periods_per_year: u32) -> f64 {
    annual_percent / 100.0 / periods_per_year as f64
}

/// payment that fully amortizes `principal` over `n` periods at period rate `r`
///
/// `P = principal * r / (1 - (1 + r)^-n)`, or `principal / n` when `r == 0`
pub fn periodic_payment(principal: f64, r: f64, n: u32) -> f64 {
    if r == 0.0 {
        return principal / n as f64;
    }
    principal * r / (1.0 - (1.0 + r).powi(-exponent(n)))
}

/// closed-form balance remaining after `k` level payments
pub fn balance_after(principal: f64, payment: f64, r: f64, k: u32) -> f64 {
    if r == 0.0 {
        return principal - payment * k as f64;
    }
    let growth = (1.0 + r).powi(exponent(k));
    principal * growth - payment * (growth - 1.0) / r
}

/// level payment leaving exactly `balloon` outstanding after `n` periods
pub fn balloon_payment(principal: f64, balloon: f64, r: f64, n: u32) -> f64 {
    if r == 0.0 {
        return (principal - balloon) / n as f64;
    }
    let growth = (1.0 + r).powi(exponent(n));
    (principal * r * growth - balloon * r) / (growth - 1.0)
}

/// annualize a monthly rate into a compounded percentage
pub fn annualize(monthly_rate: f64) -> f64 {
    ((1.0 + monthly_rate).powi(exponent(MONTHS_PER_YEAR)) - 1.0) * 100.0
}

/// net present value of `cash_flows`, the first one undiscounted
pub fn npv(cash_flows: &[f64], rate: f64) -> f64 {
    cash_flows
        .iter()
        .enumerate()
        .map(|(t, cf)| cf / (1.0 + rate).powi(exponent(t)))
        .sum()
}
