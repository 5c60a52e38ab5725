use log::trace;

use crate::errors::{LoanError, Result};
use crate::interest::{annualize, exponent, npv};

/// limits for the internal-rate-of-return search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// stop once |npv| or the newton step falls below this
    pub tolerance: f64,
    /// iteration cap for each of the newton and bisection phases
    pub max_iterations: u32,
    /// monthly-rate bracket searched when newton fails
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 100,
            lower_bound: -0.99,
            upper_bound: 1.0,
        }
    }
}

/// true APR from the IRR of a loan's cash flows
#[derive(Debug, Clone, Default)]
pub struct AprSolver {
    config: SolverConfig,
}

impl AprSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// annualized APR percentage, rounded to 3 places
    ///
    /// cash flows are `-(principal - fees)` followed by `term_months` payments
    pub fn true_apr(
        &self,
        principal: f64,
        monthly_payment: f64,
        term_months: u32,
        fees: f64,
    ) -> Result<f64> {
        let mut cash_flows = Vec::with_capacity(term_months as usize + 1);
        cash_flows.push(-(principal - fees));
        cash_flows.extend(std::iter::repeat(monthly_payment).take(term_months as usize));

        let monthly_rate = self.irr(&cash_flows)?;
        let apr = annualize(monthly_rate);
        if !apr.is_finite() {
            return Err(LoanError::AprUnavailable {
                iterations: self.config.max_iterations,
            });
        }
        Ok((apr * 1000.0).round() / 1000.0)
    }

    /// period rate `i` solving `sum(cf_t / (1 + i)^t) == 0`
    ///
    /// newton-raphson from a small positive guess, bisection over the
    /// configured bracket when newton leaves the domain or stalls
    pub fn irr(&self, cash_flows: &[f64]) -> Result<f64> {
        if cash_flows.len() < 2 || cash_flows.iter().any(|cf| !cf.is_finite()) {
            return Err(LoanError::AprUnavailable { iterations: 0 });
        }
        // a root needs money flowing both ways
        let outflow = cash_flows.iter().any(|cf| *cf < 0.0);
        let inflow = cash_flows.iter().any(|cf| *cf > 0.0);
        if !(outflow && inflow) {
            return Err(LoanError::AprUnavailable { iterations: 0 });
        }

        if let Some(rate) = self.newton(cash_flows) {
            return Ok(rate);
        }
        self.bisection(cash_flows)
    }

    fn newton(&self, cash_flows: &[f64]) -> Option<f64> {
        let mut rate = 0.01;
        for iteration in 0..self.config.max_iterations {
            let value = npv(cash_flows, rate);
            if value.abs() < self.config.tolerance {
                trace!("irr newton converged after {} iterations", iteration);
                return Some(rate);
            }

            let slope = npv_derivative(cash_flows, rate);
            if slope.abs() < 1e-15 || !slope.is_finite() {
                return None;
            }

            let step = value / slope;
            rate -= step;
            if !rate.is_finite() || rate <= -1.0 {
                return None;
            }
            if step.abs() < self.config.tolerance {
                trace!("irr newton step converged after {} iterations", iteration + 1);
                return Some(rate);
            }
        }
        None
    }

    fn bisection(&self, cash_flows: &[f64]) -> Result<f64> {
        let mut lo = self.config.lower_bound;
        let mut hi = self.config.upper_bound;
        let mut f_lo = npv(cash_flows, lo);
        let f_hi = npv(cash_flows, hi);

        if f_lo.is_nan() || f_hi.is_nan() || f_lo.signum() == f_hi.signum() {
            return Err(LoanError::AprUnavailable {
                iterations: self.config.max_iterations,
            });
        }

        for iteration in 0..self.config.max_iterations {
            let mid = 0.5 * (lo + hi);
            let f_mid = npv(cash_flows, mid);
            if f_mid.abs() < self.config.tolerance || (hi - lo) * 0.5 < self.config.tolerance {
                trace!("irr bisection converged after {} iterations", iteration + 1);
                return Ok(mid);
            }
            if f_mid.signum() == f_lo.signum() {
                lo = mid;
                f_lo = f_mid;
            } else {
                hi = mid;
            }
        }

        Err(LoanError::AprUnavailable {
            iterations: self.config.max_iterations * 2,
        })
    }
}

fn npv_derivative(cash_flows: &[f64], rate: f64) -> f64 {
    cash_flows
        .iter()
        .enumerate()
        .skip(1)
        .map(|(t, cf)| -(t as f64) * cf / (1.0 + rate).powi(exponent(t).saturating_add(1)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_apr_without_fees_is_effective_rate() {
        let solver = AprSolver::default();
        // 6% nominal compounds to ~6.168% effective
        let apr = solver.true_apr(100_000.0, 599.55, 360, 0.0).unwrap();
        assert_abs_diff_eq!(apr, 6.168, epsilon = 0.001);
    }

    #[test]
    fn test_fees_raise_apr() {
        let solver = AprSolver::default();
        let without = solver.true_apr(100_000.0, 599.55, 360, 0.0).unwrap();
        let with = solver.true_apr(100_000.0, 599.55, 360, 3_000.0).unwrap();
        assert!(with > without);
        assert!(with < 7.0);
    }

    #[test]
    fn test_zero_rate_cash_flows() {
        let solver = AprSolver::default();
        let apr = solver.true_apr(12_000.0, 1_000.0, 12, 0.0).unwrap();
        assert_abs_diff_eq!(apr, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_irr_known_root() {
        let solver = AprSolver::default();
        let rate = solver.irr(&[-100.0, 60.0, 60.0]).unwrap();
        // 60/(1+i) + 60/(1+i)^2 = 100 -> i ~ 0.130662
        assert_abs_diff_eq!(rate, 0.130_662, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_flows_are_unavailable() {
        let solver = AprSolver::default();
        assert!(matches!(
            solver.irr(&[100.0, 10.0, 10.0]),
            Err(LoanError::AprUnavailable { .. })
        ));
        assert!(matches!(
            solver.true_apr(1_000.0, 10.0, 0, 0.0),
            Err(LoanError::AprUnavailable { .. })
        ));
    }

    #[test]
    fn test_fees_covering_principal_are_unavailable() {
        let solver = AprSolver::default();
        assert!(matches!(
            solver.true_apr(10_000.0, 188.71, 60, 10_000.0),
            Err(LoanError::AprUnavailable { .. })
        ));
        assert!(matches!(
            solver.true_apr(10_000.0, 188.71, 60, 12_000.0),
            Err(LoanError::AprUnavailable { .. })
        ));
    }

    #[test]
    fn test_bisection_fallback_matches_newton() {
        let solver = AprSolver::default();
        let flows: Vec<f64> = std::iter::once(-1_000.0)
            .chain(std::iter::repeat(100.0).take(12))
            .collect();
        let newton = solver.irr(&flows).unwrap();
        let bisected = solver.bisection(&flows).unwrap();
        assert_abs_diff_eq!(newton, bisected, epsilon = 1e-8);
    }
}
