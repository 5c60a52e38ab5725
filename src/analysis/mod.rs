//! Decision-support analyses built on top of the amortization engine.
//!
//! Each analysis takes a request record with documented defaults and returns a
//! flat, serializable report.

pub mod affordability;
pub mod comparison;
pub mod refinance;
pub mod sensitivity;
pub mod tax;

pub use affordability::{AffordabilityReport, AffordabilityRequest};
pub use comparison::{compare_loans, OfferComparison, OfferMetrics, OfferOutcome};
pub use refinance::{Recommendation, RefinanceReport, RefinanceRequest};
pub use sensitivity::{sensitivity_analysis, SensitivityRow, RATE_DELTAS};
pub use tax::{FilingStatus, TaxReport, TaxRequest};

use crate::config::LoanSpec;
use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::payments::{AmortizationCalculator, Schedule};
use crate::types::LoanType;

/// validated fixed-rate schedule
pub(crate) fn fixed_schedule(principal: Money, rate: Rate, years: u32) -> Result<Schedule> {
    let spec = LoanSpec::fixed(principal, rate, years);
    spec.validate()?;
    AmortizationCalculator::new(LoanType::Fixed).calculate_schedule(&spec)
}
