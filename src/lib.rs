pub mod analysis;
pub mod config;
pub mod decimal;
pub mod dispatcher;
pub mod errors;
pub mod interest;
pub mod payments;
pub mod serialization;
pub mod types;

// re-export key types
pub use config::{LoanRequest, LoanSpec, LoanTerms, PrepaymentRequest, RateList};
pub use decimal::{Money, Rate};
pub use dispatcher::{loan_spec_from_request, AprQuote, LoanCalculation, LoanDispatcher, Summary};
pub use errors::{LoanError, Result};
pub use interest::{AprSolver, SolverConfig};
pub use payments::prepayment::analyze_request as analyze_prepayment;
pub use payments::{
    AmortizationCalculator, LumpSumAnalysis, OptimalPrepayment, Period, PrepaymentAnalysis,
    PrepaymentBaseline, PrepaymentPolicy, PrepaymentScenario, PrepaymentSimulator, Schedule,
};
pub use serialization::{CalculationView, PeriodView};
pub use types::{
    Efficiency, FrequencySelection, Horizon, LoanType, PeriodKind, PrepaymentFrequency,
    ScenarioRating,
};

// re-export external dependencies that users will need
pub use rust_decimal::Decimal;
