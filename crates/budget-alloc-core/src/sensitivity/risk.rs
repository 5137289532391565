use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::income::IncomeImpact;
use super::interest::InterestImpact;
use super::priority::{PriorityImpact, PrioritySensitivity};
use crate::model::{ConstraintModel, DebtPriority};
use crate::solvers::AllocationResult;
use crate::types::*;

/// Baseline surplus below this share of income adds to the risk score.
pub const THIN_SURPLUS_SHARE: Rate = dec!(0.10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        if score >= 5 {
            RiskLevel::High
        } else if score >= 2 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub income_sensitive: bool,
    pub high_risk_debt: bool,
    pub thin_surplus: bool,
}

impl RiskFactors {
    pub fn assess(
        model: &ConstraintModel,
        baseline: &AllocationResult,
        income: &[IncomeImpact],
        interest: &[InterestImpact],
    ) -> Self {
        Self {
            income_sensitive: income.iter().any(IncomeImpact::is_damaging),
            high_risk_debt: interest
                .iter()
                .any(|i| i.new_priority == DebtPriority::Critical),
            thin_surplus: baseline.surplus < model.total_income() * THIN_SURPLUS_SHARE,
        }
    }

    /// Income sensitivity 3, high-risk debt 2, thin surplus 2.
    pub fn score(&self) -> u32 {
        let mut score = 0;
        if self.income_sensitive {
            score += 3;
        }
        if self.high_risk_debt {
            score += 2;
        }
        if self.thin_surplus {
            score += 2;
        }
        score
    }
}

pub(crate) fn recommendations(
    model: &ConstraintModel,
    factors: &RiskFactors,
    income: &[IncomeImpact],
    interest: &[InterestImpact],
    priority: &[PriorityImpact],
) -> Vec<String> {
    let mut out = Vec::new();

    if factors.income_sensitive {
        let worst = income
            .iter()
            .filter(|i| i.is_damaging())
            .map(|i| i.change)
            .max()
            .unwrap_or(Decimal::ZERO);
        out.push(format!(
            "A {}% income drop already hurts the plan; grow the emergency fund and keep income above {}",
            (-worst * dec!(100)).normalize(),
            model.hard_floor()
        ));
    }

    let mut critical: Vec<&str> = interest
        .iter()
        .filter(|i| i.new_priority == DebtPriority::Critical)
        .map(|i| i.debt_id.as_str())
        .collect();
    critical.dedup();
    if !critical.is_empty() {
        out.push(format!(
            "Consider refinancing or accelerating {}: a rate rise makes it critical",
            critical.join(", ")
        ));
    }

    if factors.thin_surplus {
        out.push("Keep at least 10% of income unallocated as a buffer".to_string());
    }

    for p in priority
        .iter()
        .filter(|p| p.sensitivity == PrioritySensitivity::High)
    {
        out.push(format!(
            "Funding for goal '{}' swings by {} with its priority; set its weight deliberately",
            p.goal_id, p.spread
        ));
    }

    if out.is_empty() {
        out.push("The allocation is resilient to the tested changes".to_string());
    }
    out
}
