use std::cmp::Ordering;

use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::LoanRequest;
use crate::decimal::{Money, Rate};
use crate::dispatcher::LoanDispatcher;

/// label used for offers without a name
pub const UNNAMED_OFFER: &str = "Unnamed";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferMetrics {
    pub monthly_payment: Money,
    pub total_interest: Money,
    /// sum of every scheduled payment
    pub total_cost: Money,
    pub apr: Rate,
    pub term_years: u32,
    pub principal: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OfferOutcome {
    Priced(OfferMetrics),
    Failed { error: String },
}

/// one ranked entry of a comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferComparison {
    pub name: String,
    /// 1-based, absent for offers that failed to price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(flatten)]
    pub outcome: OfferOutcome,
}

impl OfferComparison {
    pub fn total_cost(&self) -> Option<Money> {
        match &self.outcome {
            OfferOutcome::Priced(metrics) => Some(metrics.total_cost),
            OfferOutcome::Failed { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, OfferOutcome::Failed { .. })
    }
}

fn price_offer(dispatcher: &LoanDispatcher, offer: &LoanRequest) -> OfferComparison {
    let name = offer
        .name
        .clone()
        .unwrap_or_else(|| UNNAMED_OFFER.to_string());

    let outcome = match dispatcher.dispatch(offer) {
        Ok(calc) => OfferOutcome::Priced(OfferMetrics {
            monthly_payment: calc.schedule.first().map(|p| p.payment).unwrap_or(Money::ZERO),
            total_interest: calc.summary.total_interest,
            total_cost: calc.summary.total_paid,
            apr: calc.summary.apr,
            term_years: calc.spec.years,
            principal: calc.spec.principal,
        }),
        Err(e) => OfferOutcome::Failed {
            error: e.to_string(),
        },
    };

    OfferComparison {
        name,
        rank: None,
        outcome,
    }
}

/// price every offer, cheapest first, failures last and unranked
pub fn compare_loans(dispatcher: &LoanDispatcher, offers: &[LoanRequest]) -> Vec<OfferComparison> {
    let mut results: Vec<OfferComparison> = offers
        .par_iter()
        .map(|offer| price_offer(dispatcher, offer))
        .collect();

    results.sort_by(|a, b| match (a.total_cost(), b.total_cost()) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    for (position, result) in results.iter_mut().enumerate() {
        if !result.is_error() {
            result.rank = Some(position as u32 + 1);
        }
    }

    debug!(
        "compared {} offers, {} failed",
        results.len(),
        results.iter().filter(|r| r.is_error()).count()
    );
    results
}
