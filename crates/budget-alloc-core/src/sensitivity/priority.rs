use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::PresetRunner;
use crate::model::ConstraintModel;
use crate::solvers::AllocationResult;
use crate::types::*;
use crate::BudgetResult;

/// How strongly a goal's funding reacts to its priority weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrioritySensitivity {
    Low,
    Medium,
    High,
}

impl PrioritySensitivity {
    /// Spread relative to current funding: < 0.2 low, < 0.5 medium, else high.
    pub fn classify(spread: Money, current: Money) -> Self {
        if current <= Decimal::ZERO {
            return if spread > MONEY_EPSILON {
                PrioritySensitivity::High
            } else {
                PrioritySensitivity::Low
            };
        }
        let ratio = spread / current;
        if ratio < dec!(0.2) {
            PrioritySensitivity::Low
        } else if ratio < dec!(0.5) {
            PrioritySensitivity::Medium
        } else {
            PrioritySensitivity::High
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityImpact {
    pub goal_id: String,
    pub current_weight: u32,
    /// Weight one step more urgent (floor 1).
    pub raised_weight: u32,
    /// Weight one step less urgent (ceiling 99).
    pub lowered_weight: u32,
    pub allocation_raised: Money,
    pub allocation_current: Money,
    pub allocation_lowered: Money,
    pub spread: Money,
    pub sensitivity: PrioritySensitivity,
}

pub(crate) fn priority_impacts(
    model: &ConstraintModel,
    runner: &PresetRunner<'_>,
    baseline: &AllocationResult,
    step: u32,
) -> BudgetResult<Vec<PriorityImpact>> {
    let funded = |variant: &ConstraintModel, id: &str| {
        runner
            .solve(variant)
            .goal_allocations
            .get(id)
            .copied()
            .unwrap_or(Decimal::ZERO)
    };

    let mut impacts = Vec::new();
    for (id, goal) in model.goal_targets() {
        if goal.is_emergency() {
            continue;
        }
        let current_weight = goal.priority_weight;
        let raised_weight = current_weight.saturating_sub(step).max(1);
        let lowered_weight = (current_weight + step).min(99);

        let allocation_current = baseline
            .goal_allocations
            .get(id)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let allocation_raised = funded(&model.with_goal_weight(id, raised_weight)?, id);
        let allocation_lowered = funded(&model.with_goal_weight(id, lowered_weight)?, id);

        let values = [allocation_raised, allocation_current, allocation_lowered];
        let high = values.iter().copied().fold(Decimal::ZERO, Decimal::max);
        let low = values.iter().copied().fold(high, Decimal::min);
        let spread = high - low;

        impacts.push(PriorityImpact {
            goal_id: id.clone(),
            current_weight,
            raised_weight,
            lowered_weight,
            allocation_raised,
            allocation_current,
            allocation_lowered,
            spread,
            sensitivity: PrioritySensitivity::classify(spread, allocation_current),
        });
    }
    Ok(impacts)
}
