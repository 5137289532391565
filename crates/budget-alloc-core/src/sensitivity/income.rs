use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::PresetRunner;
use crate::model::ConstraintModel;
use crate::solvers::AllocationResult;
use crate::types::*;
use crate::BudgetResult;

/// A goal losing more than this fraction of its baseline funding is at risk.
pub const GOAL_LOSS_THRESHOLD: Rate = dec!(0.20);

/// Effect of one income change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeImpact {
    /// Relative change, e.g. -0.10.
    pub change: Rate,
    pub new_income: Money,
    pub is_feasible: bool,
    pub allocation: AllocationResult,
    pub goal_delta: Money,
    pub flexible_delta: Money,
    pub debt_extra_delta: Money,
    pub surplus_delta: Money,
    /// Goals losing more than 20% of their baseline funding.
    pub goals_at_risk: Vec<String>,
    pub recommendation: String,
}

impl IncomeImpact {
    /// A cut that breaks feasibility or starves a goal.
    pub fn is_damaging(&self) -> bool {
        self.change < Decimal::ZERO && (!self.is_feasible || !self.goals_at_risk.is_empty())
    }
}

pub(crate) fn income_impacts(
    model: &ConstraintModel,
    runner: &PresetRunner<'_>,
    baseline: &AllocationResult,
    changes: &[Rate],
) -> BudgetResult<Vec<IncomeImpact>> {
    let mut impacts = Vec::with_capacity(changes.len());
    for &change in changes {
        let new_income = (model.total_income() * (Decimal::ONE + change)).round_dp(2);
        let variant = model.with_income(new_income)?;
        let allocation = runner.solve(&variant);
        let is_feasible = allocation.is_feasible;

        let goals_at_risk: Vec<String> = baseline
            .goal_allocations
            .iter()
            .filter(|(_, before)| **before > Decimal::ZERO)
            .filter(|(id, before)| {
                let after = allocation
                    .goal_allocations
                    .get(*id)
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                (**before - after) / **before > GOAL_LOSS_THRESHOLD
            })
            .map(|(id, _)| id.clone())
            .collect();

        let goal_delta = allocation.goal_total() - baseline.goal_total();
        let recommendation = if !is_feasible {
            format!(
                "At {new_income} income the hard floor of {} is no longer covered; \
                 reduce obligations or secure additional income",
                model.hard_floor()
            )
        } else if !goals_at_risk.is_empty() {
            format!(
                "{} goal(s) lose more than 20% of their funding: {}",
                goals_at_risk.len(),
                goals_at_risk.join(", ")
            )
        } else if change > Decimal::ZERO {
            format!("Direct the additional {goal_delta} in goal funding toward the highest priority goals")
        } else {
            "Allocation stays resilient to this change".to_string()
        };

        impacts.push(IncomeImpact {
            change,
            new_income,
            is_feasible,
            goal_delta,
            flexible_delta: allocation.flexible_total(&variant) - baseline.flexible_total(model),
            debt_extra_delta: allocation.debt_extra_total() - baseline.debt_extra_total(),
            surplus_delta: allocation.surplus - baseline.surplus,
            goals_at_risk,
            recommendation,
            allocation,
        });
    }
    Ok(impacts)
}
