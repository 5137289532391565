//! Feasibility pre-check.
//!
//! A model is feasible when income covers every hard floor (mandatory
//! minimums plus debt minimum payments). The deficit is the exact shortfall.
//! Suggestions are advisory only and never change the model.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::ConstraintModel;
use crate::types::*;

/// Outcome of the hard-floor check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feasibility {
    pub is_feasible: bool,
    /// Shortfall against the hard floor; zero when feasible.
    pub deficit: Money,
    /// Sum of mandatory minimums and debt minimum payments.
    pub hard_floor: Money,
    /// Income left once the hard floor is paid (negative when infeasible).
    pub available: Money,
}

/// What a remediation suggestion acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionTarget {
    Category,
    Debt,
    Income,
}

/// One user-facing remediation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeficitSuggestion {
    pub target: SuggestionTarget,
    /// Category or debt id; `None` for income suggestions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Amount this step would free up.
    pub amount: Money,
    pub message: String,
}

/// Check whether the hard floors fit inside the income.
pub fn check_feasibility(model: &ConstraintModel) -> Feasibility {
    let hard_floor = model.hard_floor();
    let available = model.total_income() - hard_floor;
    let deficit = (-available).max(Decimal::ZERO);
    Feasibility {
        is_feasible: deficit.is_zero(),
        deficit,
        hard_floor,
        available,
    }
}

/// Ordered remediation suggestions covering `deficit`.
///
/// Least important obligations come first (highest priority number, debts
/// ranked by their derived priority), then larger amounts, then id. Steps are
/// emitted until the deficit is covered; an income suggestion always closes
/// the list.
pub fn suggestions_for_deficit(model: &ConstraintModel, deficit: Money) -> Vec<DeficitSuggestion> {
    if deficit <= Decimal::ZERO {
        return Vec::new();
    }

    struct Candidate<'a> {
        target: SuggestionTarget,
        id: &'a str,
        priority: u32,
        amount: Money,
    }

    let mut candidates: Vec<Candidate<'_>> = model
        .mandatory_expenses()
        .iter()
        .filter(|(_, c)| c.minimum > Decimal::ZERO)
        .map(|(id, c)| Candidate {
            target: SuggestionTarget::Category,
            id,
            priority: c.priority,
            amount: c.minimum,
        })
        .chain(
            model
                .debt_payments()
                .iter()
                .filter(|(_, d)| d.minimum_payment > Decimal::ZERO)
                .map(|(id, d)| Candidate {
                    target: SuggestionTarget::Debt,
                    id,
                    priority: u32::from(d.priority().rank()),
                    amount: d.minimum_payment,
                }),
        )
        .collect();

    candidates.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.amount.cmp(&a.amount))
            .then_with(|| a.id.cmp(b.id))
    });

    let mut suggestions = Vec::new();
    let mut remaining = deficit;
    for c in candidates {
        if remaining <= Decimal::ZERO {
            break;
        }
        let amount = c.amount.min(remaining);
        let message = if c.target == SuggestionTarget::Debt {
            format!(
                "Ask the lender of '{}' for a lower minimum payment or restructuring ({} of {})",
                c.id,
                amount.round_dp(2),
                c.amount.round_dp(2)
            )
        } else {
            format!(
                "Reduce '{}' by {} (currently {})",
                c.id,
                amount.round_dp(2),
                c.amount.round_dp(2)
            )
        };
        suggestions.push(DeficitSuggestion {
            target: c.target,
            id: Some(c.id.to_string()),
            amount,
            message,
        });
        remaining -= amount;
    }

    suggestions.push(DeficitSuggestion {
        target: SuggestionTarget::Income,
        id: None,
        amount: deficit,
        message: format!(
            "Increase monthly income by at least {} to cover all hard obligations",
            deficit.round_dp(2)
        ),
    });
    suggestions
}
