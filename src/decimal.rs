use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::errors::{LoanError, Result as LoanResult};
use crate::types::PeriodKind;

/// decimal places kept for currency amounts
pub const CENTS: u32 = 2;

/// Money type rounded to whole cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp(CENTS))
    }

    /// create from a float accumulator, rounding to cents
    ///
    /// non-finite input maps to zero; callers check finiteness before emitting
    pub fn from_f64(value: f64) -> Self {
        Money(Decimal::from_f64(value).unwrap_or_default().round_dp(CENTS))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(Decimal::from_str(s)?.round_dp(CENTS)))
    }

    /// create from integer amount (dollars, euros, etc)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    /// whole amount usable in constants
    pub const fn from_major_const(amount: u32) -> Self {
        Money(Decimal::from_parts(amount, 0, 0, false, 0))
    }

    /// create from minor amount (cents)
    pub fn from_minor(amount: i64) -> Self {
        Money(Decimal::new(amount, CENTS))
    }

    /// get underlying decimal
    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// get as float for intermediate calculations
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// round to specified decimal places
    pub fn round_dp(&self, dp: u32) -> Self {
        Money(self.0.round_dp(dp))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly greater than zero
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// calculate percentage (e.g., 5% of $100)
    pub fn percentage(&self, percent: Decimal) -> Self {
        Money((self.0 * percent / Decimal::ONE_HUNDRED).round_dp(CENTS))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl From<i32> for Money {
    fn from(i: i32) -> Self {
        Money::from_major(i as i64)
    }
}

impl From<u32> for Money {
    fn from(i: u32) -> Self {
        Money::from_major(i as i64)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money((self.0 + other.0).round_dp(CENTS))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 = (self.0 + other.0).round_dp(CENTS);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money((self.0 - other.0).round_dp(CENTS))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 = (self.0 - other.0).round_dp(CENTS);
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money((self.0 * other).round_dp(CENTS))
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money((self.0 / other).round_dp(CENTS))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}

/// annual interest rate quoted as a percentage (5 means 5%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// create from percentage (e.g., 5 for 5%)
    pub fn from_percent(p: Decimal) -> Self {
        Rate(p)
    }

    /// create from a float percentage
    ///
    /// fails for non-finite values and magnitudes `Decimal` cannot hold
    pub fn from_f64(p: f64) -> LoanResult<Self> {
        Decimal::from_f64(p)
            .map(Rate)
            .ok_or_else(|| LoanError::invalid("rate", format!("{p} is not a representable rate")))
    }

    /// create from basis points (e.g., 500 for 5%)
    pub fn from_bps(bps: u32) -> Self {
        Rate(Decimal::from(bps) / Decimal::ONE_HUNDRED)
    }

    pub fn as_percent(&self) -> Decimal {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// fraction per year (0.05 for 5%)
    pub fn as_fraction(&self) -> f64 {
        self.as_f64() / 100.0
    }

    /// rate applicable to one of `periods_per_year` equal periods
    pub fn period_rate(&self, periods_per_year: u32) -> f64 {
        crate::interest::period_rate(self.as_f64(), periods_per_year)
    }

    pub fn monthly_rate(&self) -> f64 {
        self.period_rate(PeriodKind::Month.periods_per_year())
    }

    pub fn round_dp(&self, dp: u32) -> Self {
        Rate(self.0.round_dp(dp))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate::from_percent(d)
    }
}

/// round a float to `dp` decimal places through `Decimal`
pub fn round_f64(value: f64, dp: u32) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(dp)
}
