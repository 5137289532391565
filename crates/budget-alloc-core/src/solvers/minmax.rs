//! Minmax (Chebyshev) goal programming.
//!
//! Optimises for balance: each iteration lifts the worst-off goal(s) by a
//! fixed number of achievement points. When the budget cannot pay for a full
//! step, what remains is shared so the worst-off goals rise by the same
//! percentage.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::result::{classify_goals, AllocationDraft, GoalStatus, IntoAllocation};
use super::{AllocationProblem, AllocationResult, AllocationSolver, SolverKind, SolverMetrics};
use crate::types::*;
use crate::BudgetResult;

pub const MINMAX_TOLERANCE: Money = dec!(0.01);
/// Achievement points within which goals count as equally worst-off.
pub const MINMAX_ACHIEVEMENT_TOLERANCE: Percent = dec!(0.01);
pub const MINMAX_MAX_ITERATIONS: u32 = 200;
/// Achievement points added to the worst-off goals per iteration.
pub const MINMAX_STEP: Percent = dec!(5);
/// Spread between best and worst achievement still considered balanced.
pub const MINMAX_BALANCE_THRESHOLD: Percent = dec!(20);

/// Native result of the minmax solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinmaxOutcome {
    pub values: Vec<Money>,
    pub min_achievement: Percent,
    pub max_achievement: Percent,
    pub is_balanced: bool,
    pub iterations: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MinmaxSolver;

impl AllocationSolver for MinmaxSolver {
    type Outcome = MinmaxOutcome;

    fn kind(&self) -> SolverKind {
        SolverKind::Minmax
    }

    fn solve(&self, problem: &AllocationProblem<'_>) -> BudgetResult<MinmaxOutcome> {
        let graph = &problem.graph;
        let mut remaining = graph.starting_budget()?;
        let mut values = graph.initial_values();
        let goals: Vec<usize> = graph
            .soft_goals()
            .into_iter()
            .filter(|&g| graph.extent(g) > MINMAX_TOLERANCE)
            .collect();
        let mut iterations = 0u32;

        while iterations < MINMAX_MAX_ITERATIONS && remaining > MINMAX_TOLERANCE {
            let active: Vec<(usize, Percent)> = goals
                .iter()
                .map(|&g| (g, graph.achievement(g, &values)))
                .filter(|(g, _)| graph.need(*g, &values) > Decimal::ZERO)
                .collect();
            let Some(floor) = active.iter().map(|(_, a)| *a).min() else {
                break;
            };
            iterations += 1;

            let worst: Vec<usize> = active
                .iter()
                .filter(|(_, a)| *a <= floor + MINMAX_ACHIEVEMENT_TOLERANCE)
                .map(|(g, _)| *g)
                .collect();
            let next = (floor + MINMAX_STEP).min(dec!(100));

            let costs: Vec<Money> = worst
                .iter()
                .map(|&g| {
                    let v = graph.goals[g].variable;
                    let wanted = graph.variables[v].lower + graph.extent(g) * next / dec!(100);
                    (wanted - values[v]).max(Decimal::ZERO).min(graph.need(g, &values))
                })
                .collect();
            let total_cost: Money = costs.iter().copied().sum();

            if total_cost <= remaining {
                for (&g, cost) in worst.iter().zip(&costs) {
                    values[graph.goals[g].variable] += *cost;
                }
                remaining -= total_cost;
            } else {
                // Not enough for a full step: lift the worst-off goals by the
                // same percentage.
                let extent_sum: Money = worst.iter().map(|&g| graph.extent(g)).sum();
                let budget = remaining;
                for (&g, cost) in worst.iter().zip(&costs) {
                    let share = floor_cents(budget * graph.extent(g) / extent_sum).min(*cost);
                    values[graph.goals[g].variable] += share;
                    remaining -= share;
                }
                debug!(
                    event = "budget_exhausted",
                    solver = "minmax",
                    iteration = iterations,
                    floor = %floor,
                );
                break;
            }
            debug!(
                event = "iteration",
                solver = "minmax",
                iteration = iterations,
                floor = %floor,
                lifted = worst.len(),
                remaining = %remaining,
            );
        }

        let achievements: Vec<Percent> = goals
            .iter()
            .map(|&g| graph.achievement(g, &values))
            .collect();
        let min_achievement = achievements.iter().copied().min().unwrap_or(dec!(100));
        let max_achievement = achievements.iter().copied().max().unwrap_or(dec!(100));

        Ok(MinmaxOutcome {
            values,
            min_achievement,
            max_achievement,
            is_balanced: max_achievement - min_achievement <= MINMAX_BALANCE_THRESHOLD,
            iterations,
        })
    }
}

impl IntoAllocation for MinmaxOutcome {
    fn into_allocation(self, problem: &AllocationProblem<'_>) -> AllocationResult {
        let graph = &problem.graph;
        let statuses = classify_goals(graph, &self.values, |_, funded, extent| {
            if extent - funded <= MINMAX_TOLERANCE {
                GoalStatus::Achieved
            } else if funded > MINMAX_TOLERANCE {
                GoalStatus::Partial
            } else {
                GoalStatus::Unachieved
            }
        });

        let soft = graph.soft_goals();
        let score = if soft.is_empty() {
            dec!(100)
        } else {
            let total: Percent = soft.iter().map(|&g| graph.achievement(g, &self.values)).sum();
            total / Decimal::from(soft.len())
        };

        AllocationDraft::from_values(graph, &self.values).finish(
            problem.model,
            SolverKind::Minmax,
            &statuses,
            score,
            self.iterations,
            SolverMetrics::Minmax {
                min_achievement: self.min_achievement.round_dp(2),
                max_achievement: self.max_achievement.round_dp(2),
                is_balanced: self.is_balanced,
            },
        )
    }
}
