//! Weighted goal programming.
//!
//! All soft-goal deviations are folded into one objective. Each iteration
//! hands the remaining budget to every unmet goal in proportion to
//! `unmet need × weight`; goals whose share covers their need drop out and the
//! rest compete for what is left in the next round.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::result::{classify_goals, AllocationDraft, GoalStatus, IntoAllocation};
use super::{AllocationProblem, AllocationResult, AllocationSolver, SolverKind, SolverMetrics};
use crate::types::*;
use crate::BudgetResult;

pub const WEIGHTED_TOLERANCE: Money = dec!(0.01);
pub const WEIGHTED_MAX_ITERATIONS: u32 = 200;
/// A funded goal still counts as partial while its deviation is below this
/// fraction of the target.
pub const WEIGHTED_PARTIAL_THRESHOLD: Decimal = dec!(0.5);

/// Native result of the weighted solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedOutcome {
    pub values: Vec<Money>,
    /// `Σ deviation × weight` over the soft goals.
    pub weighted_deviation: Decimal,
    pub iterations: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedSolver;

impl AllocationSolver for WeightedSolver {
    type Outcome = WeightedOutcome;

    fn kind(&self) -> SolverKind {
        SolverKind::Weighted
    }

    fn solve(&self, problem: &AllocationProblem<'_>) -> BudgetResult<WeightedOutcome> {
        let graph = &problem.graph;
        let mut remaining = graph.starting_budget()?;
        let mut values = graph.initial_values();
        let soft = graph.soft_goals();
        let mut iterations = 0u32;

        while iterations < WEIGHTED_MAX_ITERATIONS && remaining > WEIGHTED_TOLERANCE {
            let unmet: Vec<(usize, Money, Decimal)> = soft
                .iter()
                .map(|&g| {
                    let need = graph.need(g, &values);
                    (g, need, need * graph.goals[g].weight)
                })
                .filter(|(_, need, _)| *need > WEIGHTED_TOLERANCE)
                .collect();
            let total_score: Decimal = unmet.iter().map(|(_, _, s)| *s).sum();
            if unmet.is_empty() || total_score <= Decimal::ZERO {
                break;
            }
            iterations += 1;

            let budget = remaining;
            let mut spent = Decimal::ZERO;
            for (g, need, score) in &unmet {
                let share = floor_cents(budget * *score / total_score).min(*need);
                values[graph.goals[*g].variable] += share;
                spent += share;
            }
            remaining -= spent;
            debug!(
                event = "iteration",
                solver = "weighted",
                iteration = iterations,
                unmet_goals = unmet.len(),
                spent = %spent,
                remaining = %remaining,
            );
            if spent.is_zero() {
                break;
            }
        }

        let weighted_deviation = soft
            .iter()
            .map(|&g| graph.need(g, &values) * graph.goals[g].weight)
            .sum();

        Ok(WeightedOutcome {
            values,
            weighted_deviation,
            iterations,
        })
    }
}

impl IntoAllocation for WeightedOutcome {
    fn into_allocation(self, problem: &AllocationProblem<'_>) -> AllocationResult {
        let graph = &problem.graph;
        let statuses = classify_goals(graph, &self.values, |_, funded, extent| {
            let deviation = (extent - funded).max(Decimal::ZERO);
            if deviation <= WEIGHTED_TOLERANCE {
                GoalStatus::Achieved
            } else if funded > WEIGHTED_TOLERANCE && deviation < extent * WEIGHTED_PARTIAL_THRESHOLD {
                GoalStatus::Partial
            } else {
                GoalStatus::Unachieved
            }
        });

        let weighted_target: Decimal = graph
            .soft_goals()
            .iter()
            .map(|&g| graph.extent(g) * graph.goals[g].weight)
            .sum();
        let score = percent_of(weighted_target - self.weighted_deviation, weighted_target);

        AllocationDraft::from_values(graph, &self.values).finish(
            problem.model,
            SolverKind::Weighted,
            &statuses,
            score,
            self.iterations,
            SolverMetrics::Weighted {
                weighted_deviation: self.weighted_deviation.round_dp(4),
            },
        )
    }
}
