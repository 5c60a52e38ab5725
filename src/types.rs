use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::errors::{LoanError, Result};

/// loan product types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    /// level payment over the whole term
    Fixed,
    /// rate changes every year, annual periods
    Variable,
    /// interest-only span followed by an optional amortizing tail
    InterestOnly,
    /// level payments leaving a lump sum at maturity
    Balloon,
}

impl LoanType {
    pub const ALL: [LoanType; 4] = [
        LoanType::Fixed,
        LoanType::Variable,
        LoanType::InterestOnly,
        LoanType::Balloon,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanType::Fixed => "fixed",
            LoanType::Variable => "variable",
            LoanType::InterestOnly => "interest_only",
            LoanType::Balloon => "balloon",
        }
    }

    /// schedule granularity produced for this type
    pub fn period_kind(&self) -> PeriodKind {
        match self {
            LoanType::Variable => PeriodKind::Year,
            _ => PeriodKind::Month,
        }
    }
}

impl fmt::Display for LoanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanType {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self> {
        LoanType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| LoanError::UnknownType {
                loan_type: s.to_string(),
            })
    }
}

/// length of one schedule period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Month,
    Year,
}

impl PeriodKind {
    pub fn periods_per_year(&self) -> u32 {
        match self {
            PeriodKind::Month => crate::interest::MONTHS_PER_YEAR,
            PeriodKind::Year => 1,
        }
    }
}

/// how often an extra contribution is made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrepaymentFrequency {
    Monthly,
    Quarterly,
    Yearly,
    OneTime,
}

impl PrepaymentFrequency {
    /// evaluation order used when every frequency is requested
    pub const ALL: [PrepaymentFrequency; 4] = [
        PrepaymentFrequency::Monthly,
        PrepaymentFrequency::Yearly,
        PrepaymentFrequency::Quarterly,
        PrepaymentFrequency::OneTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrepaymentFrequency::Monthly => "monthly",
            PrepaymentFrequency::Quarterly => "quarterly",
            PrepaymentFrequency::Yearly => "yearly",
            PrepaymentFrequency::OneTime => "one_time",
        }
    }

    /// whether an extra payment falls due in `month` (1-based) for a policy starting at `start`
    pub fn applies_at(&self, month: u32, start: u32) -> bool {
        if month < start {
            return false;
        }
        let elapsed = month - start;
        match self {
            PrepaymentFrequency::Monthly => true,
            PrepaymentFrequency::Quarterly => elapsed % 3 == 0,
            PrepaymentFrequency::Yearly => elapsed % 12 == 0,
            PrepaymentFrequency::OneTime => elapsed == 0,
        }
    }
}

impl fmt::Display for PrepaymentFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrepaymentFrequency {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self> {
        PrepaymentFrequency::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                LoanError::invalid("prepayment_frequency", format!("unknown frequency '{s}'"))
            })
    }
}

/// which frequencies a prepayment analysis evaluates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencySelection {
    Single(PrepaymentFrequency),
    All,
}

impl FrequencySelection {
    pub fn frequencies(&self) -> Vec<PrepaymentFrequency> {
        match self {
            FrequencySelection::Single(f) => vec![*f],
            FrequencySelection::All => PrepaymentFrequency::ALL.to_vec(),
        }
    }
}

impl FromStr for FrequencySelection {
    type Err = LoanError;

    fn from_str(s: &str) -> Result<Self> {
        if s == "all" {
            return Ok(FrequencySelection::All);
        }
        s.parse().map(FrequencySelection::Single)
    }
}

/// return on an extra payment amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Efficiency {
    High,
    Medium,
    Low,
}

impl Efficiency {
    /// High above 50% ROI, Medium above 20%, Low otherwise
    ///
    /// bands the unrounded ROI, so 50.04% is High even though it reports as 50.0
    pub fn from_roi(roi_percent: f64) -> Self {
        if roi_percent > 50.0 {
            Efficiency::High
        } else if roi_percent > 20.0 {
            Efficiency::Medium
        } else {
            Efficiency::Low
        }
    }
}

/// coarse verdict on a prepayment scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScenarioRating {
    Good,
    Moderate,
}

/// a count of periods that may never be reached
///
/// serializes as a number, or as the string "Never"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizon {
    Periods(Decimal),
    Never,
}

impl Horizon {
    pub fn periods(&self) -> Option<Decimal> {
        match self {
            Horizon::Periods(p) => Some(*p),
            Horizon::Never => None,
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Horizon::Never)
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Horizon::Periods(p) => write!(f, "{p}"),
            Horizon::Never => f.write_str("Never"),
        }
    }
}

impl Serialize for Horizon {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Horizon::Periods(p) => Serialize::serialize(p, serializer),
            Horizon::Never => serializer.serialize_str("Never"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_loan_type_parsing() {
        assert_eq!("interest_only".parse::<LoanType>().unwrap(), LoanType::InterestOnly);
        assert_eq!("balloon".parse::<LoanType>().unwrap(), LoanType::Balloon);

        let err = "lease".parse::<LoanType>().unwrap_err();
        assert_eq!(err, LoanError::UnknownType { loan_type: "lease".to_string() });
    }

    #[test]
    fn test_frequency_triggers() {
        let start = 4;
        let monthly: Vec<u32> = (1..=16)
            .filter(|m| PrepaymentFrequency::Monthly.applies_at(*m, start))
            .collect();
        assert_eq!(monthly.first(), Some(&4));
        assert_eq!(monthly.len(), 13);

        let quarterly: Vec<u32> = (1..=16)
            .filter(|m| PrepaymentFrequency::Quarterly.applies_at(*m, start))
            .collect();
        assert_eq!(quarterly, vec![4, 7, 10, 13, 16]);

        let yearly: Vec<u32> = (1..=30)
            .filter(|m| PrepaymentFrequency::Yearly.applies_at(*m, start))
            .collect();
        assert_eq!(yearly, vec![4, 16, 28]);

        let once: Vec<u32> = (1..=30)
            .filter(|m| PrepaymentFrequency::OneTime.applies_at(*m, start))
            .collect();
        assert_eq!(once, vec![4]);
    }

    #[test]
    fn test_frequency_selection() {
        assert_eq!("all".parse::<FrequencySelection>().unwrap().frequencies().len(), 4);
        assert_eq!(
            "quarterly".parse::<FrequencySelection>().unwrap(),
            FrequencySelection::Single(PrepaymentFrequency::Quarterly)
        );
        assert!("fortnightly".parse::<FrequencySelection>().is_err());
    }

    #[test]
    fn test_efficiency_bands() {
        assert_eq!(Efficiency::from_roi(50.1), Efficiency::High);
        assert_eq!(Efficiency::from_roi(50.01), Efficiency::High);
        assert_eq!(Efficiency::from_roi(50.0), Efficiency::Medium);
        assert_eq!(Efficiency::from_roi(20.04), Efficiency::Medium);
        assert_eq!(Efficiency::from_roi(20.0), Efficiency::Low);
    }

    #[test]
    fn test_horizon_serialization() {
        assert_eq!(serde_json::to_string(&Horizon::Never).unwrap(), "\"Never\"");
        assert_eq!(serde_json::to_string(&Horizon::Periods(dec!(12.5))).unwrap(), "12.5");
    }
}
