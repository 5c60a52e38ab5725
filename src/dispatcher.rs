use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{
    require_non_negative, require_positive, require_rate, require_years, LoanRequest, LoanSpec,
    LoanTerms,
};
use crate::decimal::{round_f64, Money, Rate};
use crate::errors::{LoanError, Result};
use crate::interest::{AprSolver, SolverConfig, MONTHS_PER_YEAR};
use crate::payments::amortization::normalize_rates;
use crate::payments::{AmortizationCalculator, Schedule};
use crate::types::LoanType;

/// aggregate view of a schedule
///
/// `total_months` counts schedule periods, so it is years for variable loans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub loan_type: LoanType,
    pub principal: Money,
    pub fees: Money,
    pub total_paid: Money,
    pub total_interest: Money,
    pub apr: Rate,
    pub total_months: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_payment: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_payment: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balloon_payment: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interest_only_payment: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amortizing_payment: Option<Money>,
}

/// schedule and summary built for one validated loan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanCalculation {
    pub spec: LoanSpec,
    pub schedule: Schedule,
    pub summary: Summary,
}

/// nominal rate against true APR for a fixed loan with fees
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AprQuote {
    pub nominal_rate: Rate,
    /// `None` when the solver finds no root
    pub apr: Option<Rate>,
    pub monthly_payment: Money,
    pub fees_impact: Decimal,
}

/// validates loan requests and routes them to the matching generator
#[derive(Debug, Clone, Default)]
pub struct LoanDispatcher {
    apr_solver: AprSolver,
}

impl LoanDispatcher {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            apr_solver: AprSolver::new(config),
        }
    }

    /// validate a raw request and build its schedule and summary
    pub fn dispatch(&self, request: &LoanRequest) -> Result<LoanCalculation> {
        let spec = loan_spec_from_request(request)?;
        self.build(&spec)
    }

    pub fn build(&self, spec: &LoanSpec) -> Result<LoanCalculation> {
        spec.validate()?;
        debug!(
            "building {} schedule for {} over {} years",
            spec.loan_type(),
            spec.principal,
            spec.years
        );

        let schedule = AmortizationCalculator::for_spec(spec).calculate_schedule(spec)?;
        let summary = self.summarize(spec, &schedule);

        Ok(LoanCalculation {
            spec: spec.clone(),
            schedule,
            summary,
        })
    }

    /// totals, APR and the type-specific payment fields
    pub fn summarize(&self, spec: &LoanSpec, schedule: &Schedule) -> Summary {
        let total_paid = schedule.total_paid();
        let first_payment = schedule.first().map(|p| p.payment).unwrap_or(Money::ZERO);
        let average_payment = match schedule.len() {
            0 => Money::ZERO,
            n => Money::from_decimal(total_paid.as_decimal() / Decimal::from(n)),
        };

        let mut summary = Summary {
            loan_type: spec.loan_type(),
            principal: spec.principal,
            fees: spec.fees,
            total_paid,
            total_interest: schedule.total_interest(),
            apr: self.apr(spec, first_payment),
            total_months: schedule.len() as u32,
            monthly_payment: None,
            average_payment: None,
            balloon_payment: None,
            interest_only_payment: None,
            amortizing_payment: None,
        };

        match &spec.terms {
            LoanTerms::Fixed { .. } | LoanTerms::Variable { .. } => {
                summary.monthly_payment = Some(first_payment);
                summary.average_payment = Some(average_payment);
            }
            LoanTerms::Balloon {
                balloon_percent, ..
            } => {
                summary.monthly_payment = Some(first_payment);
                summary.balloon_payment = Some(spec.principal.percentage(*balloon_percent));
                summary.average_payment = Some(average_payment);
            }
            LoanTerms::InterestOnly {
                interest_only_years,
                ..
            } => {
                summary.interest_only_payment = Some(first_payment);
                if let Some(io_years) = interest_only_years.filter(|io| *io < spec.years) {
                    let amortizing = schedule
                        .get_period(io_years * MONTHS_PER_YEAR + 1)
                        .map(|p| p.payment)
                        .filter(Money::is_positive)
                        .unwrap_or(Money::ZERO);
                    summary.amortizing_payment = Some(amortizing);
                }
            }
        }

        summary
    }

    /// reported APR, rounded to 2 places
    ///
    /// variable loans report the mean of their per-year rates; every other
    /// type reports the true APR, falling back to the nominal rate
    pub fn apr(&self, spec: &LoanSpec, first_payment: Money) -> Rate {
        let apr = match &spec.terms {
            LoanTerms::Variable { rates } => mean_rate(rates, spec.years),
            terms => {
                let nominal = terms.nominal_rate().unwrap_or(Rate::ZERO);
                let solved = self
                    .apr_solver
                    .true_apr(
                        spec.principal.to_f64(),
                        first_payment.to_f64(),
                        spec.term_months(),
                        spec.fees.to_f64(),
                    )
                    .and_then(Rate::from_f64);
                match solved {
                    Ok(apr) if !apr.is_zero() => apr,
                    Ok(_) => nominal,
                    Err(e) => {
                        debug!("true apr unavailable, reporting nominal {}: {}", nominal, e);
                        nominal
                    }
                }
            }
        };
        apr.round_dp(2)
    }

    /// true APR of a fixed loan built from the request's principal, rate, term and fees
    pub fn quote_apr(&self, request: &LoanRequest) -> Result<AprQuote> {
        let fixed = LoanRequest {
            loan_type: LoanType::Fixed.as_str().to_string(),
            ..request.clone()
        };
        let spec = loan_spec_from_request(&fixed)?;
        let nominal_rate = spec.terms.nominal_rate().unwrap_or(Rate::ZERO);

        let schedule = AmortizationCalculator::for_spec(&spec).calculate_schedule(&spec)?;
        let monthly_payment = schedule.first().map(|p| p.payment).unwrap_or(Money::ZERO);

        let apr = self
            .apr_solver
            .true_apr(
                spec.principal.to_f64(),
                monthly_payment.to_f64(),
                spec.term_months(),
                spec.fees.to_f64(),
            )
            .and_then(Rate::from_f64)
            .ok()
            .filter(|apr| !apr.is_zero());

        let fees_impact = apr
            .map(|apr| (apr.as_percent() - nominal_rate.as_percent()).round_dp(3))
            .unwrap_or(Decimal::ZERO);

        Ok(AprQuote {
            nominal_rate,
            apr: apr.map(|apr| apr.round_dp(3)),
            monthly_payment,
            fees_impact,
        })
    }
}

fn mean_rate(rates: &[Rate], years: u32) -> Rate {
    match normalize_rates(rates, years) {
        Ok(rates) if !rates.is_empty() => {
            let sum: Decimal = rates.iter().map(Rate::as_percent).sum();
            Rate::from_percent(sum / Decimal::from(rates.len()))
        }
        _ => Rate::ZERO,
    }
}


/// validate a raw request into a loan spec
///
/// principal, years and fees are checked first, then the type, then the
/// fields that type needs
pub fn loan_spec_from_request(request: &LoanRequest) -> Result<LoanSpec> {
    let principal = Money::from_f64(require_positive("principal", request.principal)?);
    let years = require_years("years", request.years)?;
    let fees = Money::from_f64(require_non_negative("fees", request.fees)?);
    let loan_type: LoanType = request.loan_type.parse()?;

    let spec = match loan_type {
        LoanType::Fixed => LoanSpec::fixed(principal, require_rate("rate", request.rate)?, years),
        LoanType::Variable => {
            let parsed = match &request.rates {
                Some(list) => list.parse()?,
                None => Vec::new(),
            };
            if parsed.is_empty() {
                return Err(LoanError::invalid("rates", "variable rates are required"));
            }
            let rates = parsed
                .into_iter()
                .map(|rate| require_rate("rates", rate))
                .collect::<Result<Vec<_>>>()?;
            LoanSpec::variable(principal, rates, years)
        }
        LoanType::InterestOnly => {
            let interest_only_years = request
                .interest_only_years
                .map(|io| {
                    u32::try_from(io).map_err(|_| {
                        LoanError::invalid(
                            "interest_only_years",
                            format!("must not be negative, got {io}"),
                        )
                    })
                })
                .transpose()?;
            LoanSpec::interest_only(
                principal,
                require_rate("rate", request.rate)?,
                years,
                interest_only_years,
            )
        }
        LoanType::Balloon => {
            let percent = request.balloon_percent;
            if !(0.0..=100.0).contains(&percent) {
                return Err(LoanError::invalid(
                    "balloon_percent",
                    format!("must be within 0..=100, got {percent}"),
                ));
            }
            LoanSpec::balloon(
                principal,
                require_rate("rate", request.rate)?,
                years,
                round_f64(percent, 6),
            )
        }
    };

    Ok(spec.with_fees(fees))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rust_decimal_macros::dec;

    fn dispatch(json: &str) -> Result<LoanCalculation> {
        LoanDispatcher::default().dispatch(&LoanRequest::from_json(json)?)
    }

    #[test]
    fn test_fixed_summary() {
        let calc = dispatch(r#"{"principal": 100000, "rate": 6, "years": 30}"#).unwrap();
        let summary = &calc.summary;

        assert_eq!(summary.loan_type, LoanType::Fixed);
        assert_eq!(summary.total_months, 360);
        assert_eq!(summary.monthly_payment, Some(Money::from_str_exact("599.55").unwrap()));
        assert_eq!(summary.total_paid, calc.schedule.total_paid());
        assert!(summary.balloon_payment.is_none());
        // no fees: the true apr is the compounded nominal rate
        assert_eq!(summary.apr, Rate::from_percent(dec!(6.17)));
    }

    #[test]
    fn test_fees_raise_reported_apr() {
        let calc = dispatch(r#"{"principal": 100000, "rate": 6, "years": 30, "fees": 3000}"#)
            .unwrap();
        assert!(calc.summary.apr > Rate::from_percent(dec!(6.17)));
        assert_eq!(calc.summary.fees, Money::from_major(3000));
    }

    #[test]
    fn test_zero_rate_apr_falls_back_to_nominal() {
        let calc = dispatch(r#"{"principal": 12000, "rate": 0, "years": 1}"#).unwrap();
        assert_eq!(calc.summary.apr, Rate::ZERO);
        assert_eq!(calc.summary.average_payment, Some(Money::from_major(1000)));
    }

    #[test]
    fn test_variable_apr_is_mean_of_padded_rates() {
        let calc = dispatch(r#"{"type": "variable", "principal": 50000, "rates": "3,4", "years": 5}"#)
            .unwrap();

        // [3, 4, 4, 4, 4]
        assert_eq!(calc.summary.apr, Rate::from_percent(dec!(3.8)));
        assert_eq!(calc.summary.total_months, 5);
        assert_eq!(calc.schedule.last().unwrap().balance_after, Money::ZERO);
    }

    #[test]
    fn test_interest_only_summary_fields() {
        let calc = dispatch(
            r#"{"type": "interest_only", "principal": 100000, "rate": 6, "years": 30, "interest_only_years": 5}"#,
        )
        .unwrap();
        let summary = &calc.summary;

        assert_eq!(summary.interest_only_payment, Some(Money::from_major(500)));
        let amortizing = summary.amortizing_payment.unwrap();
        assert_eq!(amortizing, calc.schedule.get_period(61).unwrap().payment);
        assert!(summary.monthly_payment.is_none());

        let calc = dispatch(r#"{"type": "interest_only", "years": 10}"#).unwrap();
        assert!(calc.summary.amortizing_payment.is_none());
        assert_eq!(calc.summary.total_months, 120);
    }

    #[test]
    fn test_balloon_summary_fields() {
        let calc = dispatch(
            r#"{"type": "balloon", "principal": 200000, "rate": 5, "years": 15, "balloon_percent": 50}"#,
        )
        .unwrap();

        assert_eq!(calc.summary.balloon_payment, Some(Money::from_major(100_000)));
        assert_eq!(calc.schedule.last().unwrap().balance_after, Money::ZERO);
        assert!(calc.summary.average_payment.unwrap() > calc.summary.monthly_payment.unwrap());
    }

    #[test]
    fn test_validation_errors() {
        let err = dispatch(r#"{"principal": 0}"#).unwrap_err();
        assert!(matches!(err, LoanError::InvalidInput { ref field, .. } if field == "principal"));

        let err = dispatch(r#"{"years": 0}"#).unwrap_err();
        assert!(matches!(err, LoanError::InvalidInput { ref field, .. } if field == "years"));

        let err = dispatch(r#"{"type": "lease"}"#).unwrap_err();
        assert_eq!(err, LoanError::UnknownType { loan_type: "lease".to_string() });

        let err = dispatch(r#"{"type": "variable"}"#).unwrap_err();
        assert!(matches!(err, LoanError::InvalidInput { ref field, .. } if field == "rates"));

        let err = dispatch(r#"{"type": "variable", "rates": " , "}"#).unwrap_err();
        assert!(matches!(err, LoanError::InvalidInput { ref field, .. } if field == "rates"));

        let err = dispatch(r#"{"type": "balloon", "balloon": 150}"#).unwrap_err();
        assert!(matches!(err, LoanError::InvalidInput { ref field, .. } if field == "balloon_percent"));

        let err = dispatch(r#"{"type": "interest_only", "interest_only_years": -1}"#).unwrap_err();
        assert!(matches!(err, LoanError::InvalidInput { ref field, .. } if field == "interest_only_years"));
    }

    #[test]
    fn test_unsolvable_apr_reports_nominal_rate() {
        // fees swallow the whole principal, so no cash flow is ever negative
        let calc = dispatch(r#"{"principal": 10000, "rate": 5, "years": 5, "fees": 10000}"#).unwrap();
        assert_eq!(calc.summary.apr, Rate::from_percent(dec!(5)));

        let calc = dispatch(r#"{"type": "balloon", "principal": 10000, "rate": 7.25, "years": 5, "fees": 12000}"#)
            .unwrap();
        assert_eq!(calc.summary.apr, Rate::from_percent(dec!(7.25)));

        let quote = LoanDispatcher::default()
            .quote_apr(&LoanRequest {
                fees: 10_000.0,
                principal: 10_000.0,
                ..LoanRequest::default()
            })
            .unwrap();
        assert_eq!(quote.apr, None);
        assert_eq!(quote.fees_impact, Decimal::ZERO);
    }

    #[test]
    fn test_term_is_capped() {
        assert!(dispatch(r#"{"years": 100}"#).is_ok());

        let err = dispatch(r#"{"principal": 100000, "rate": 5, "years": 200000000}"#).unwrap_err();
        assert!(matches!(err, LoanError::InvalidInput { ref field, .. } if field == "years"));
    }

    #[test]
    fn test_unrepresentable_rate_is_rejected() {
        let err = dispatch(r#"{"rate": 1e30}"#).unwrap_err();
        assert!(matches!(err, LoanError::InvalidInput { ref field, .. } if field == "rate"));

        let err = dispatch(r#"{"type": "variable", "rates": [4, 1e30]}"#).unwrap_err();
        assert!(matches!(err, LoanError::InvalidInput { ref field, .. } if field == "rates"));
    }

    #[test]
    fn test_principal_checked_before_type() {
        let err = dispatch(r#"{"type": "lease", "principal": -5}"#).unwrap_err();
        assert!(matches!(err, LoanError::InvalidInput { ref field, .. } if field == "principal"));
    }

    #[test]
    fn test_build_rejects_unvalidated_spec() {
        let spec = LoanSpec::fixed(Money::from_major(-100), Rate::from_percent(dec!(5)), 10);
        assert!(LoanDispatcher::default().build(&spec).is_err());
    }

    #[test]
    fn test_quote_apr() {
        let request = LoanRequest {
            fees: 2000.0,
            rate: 6.0,
            ..LoanRequest::default()
        };
        let quote = LoanDispatcher::default().quote_apr(&request).unwrap();

        assert_eq!(quote.nominal_rate, Rate::from_percent(dec!(6)));
        let apr = quote.apr.unwrap();
        assert!(apr > quote.nominal_rate);
        assert_abs_diff_eq!(
            quote.fees_impact.to_string().parse::<f64>().unwrap(),
            apr.as_f64() - 6.0,
            epsilon = 0.001
        );

        let request = LoanRequest::fixed(12_000.0, 0.0, 1);
        let quote = LoanDispatcher::default().quote_apr(&request).unwrap();
        assert!(quote.apr.is_none());
        assert_eq!(quote.fees_impact, Decimal::ZERO);
    }
}
