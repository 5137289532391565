//! Deterministic heuristic allocation, used directly or whenever a structured
//! solver fails.
//!
//! Phase 1 funds every mandatory minimum and debt minimum payment. When that
//! alone exceeds income the result is marked infeasible and nothing else is
//! funded. Phase 2 cuts the surplus into four buckets using the scenario's
//! surplus allocation: emergency goals, an extra payment on the single most
//! urgent debt, the remaining goals by ascending priority weight, and
//! flexible categories scaled by the spending level.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::result::{AllocationDraft, GoalStatus, IntoAllocation};
use super::{AllocationProblem, AllocationResult, AllocationSolver, SolverKind, SolverMetrics};
use crate::types::*;
use crate::BudgetResult;

/// Native result of the heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicOutcome {
    pub categories: BTreeMap<String, Money>,
    /// Total payment per debt.
    pub debts: BTreeMap<String, Money>,
    pub goals: BTreeMap<String, Money>,
    /// Contribution each goal asked for this month.
    pub goal_targets: BTreeMap<String, Money>,
    pub is_feasible: bool,
    /// Soft demand (goals + flexible) and how much of it was funded.
    pub desired: Money,
    pub funded: Money,
    pub iterations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_from: Option<SolverKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl HeuristicOutcome {
    /// Mark this outcome as a substitute for a failed structured solver.
    pub fn as_fallback_for(mut self, solver: SolverKind, reason: impl Into<String>) -> Self {
        self.fallback_from = Some(solver);
        self.fallback_reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicSolver;

impl HeuristicSolver {
    /// Infallible entry point; the fallback must always produce something.
    pub fn run(&self, problem: &AllocationProblem<'_>) -> HeuristicOutcome {
        let model = problem.model;
        let params = problem.params;
        let mut iterations = 0u32;

        let mut categories: BTreeMap<String, Money> = model
            .mandatory_expenses()
            .iter()
            .map(|(id, c)| (id.clone(), c.minimum))
            .chain(
                model
                    .flexible_expenses()
                    .keys()
                    .map(|id| (id.clone(), Decimal::ZERO)),
            )
            .collect();
        let mut debts: BTreeMap<String, Money> = model
            .debt_payments()
            .iter()
            .map(|(id, d)| (id.clone(), d.minimum_payment))
            .collect();
        let mut goals: BTreeMap<String, Money> = model
            .goal_targets()
            .keys()
            .map(|id| (id.clone(), Decimal::ZERO))
            .collect();
        let goal_targets: BTreeMap<String, Money> = model
            .goal_targets()
            .iter()
            .map(|(id, g)| (id.clone(), g.desired_contribution(params.goal_contribution_factor)))
            .collect();
        let flexible_targets: BTreeMap<&String, Money> = model
            .flexible_expenses()
            .iter()
            .map(|(id, c)| {
                let t = c.minimum + (c.maximum - c.minimum) * params.flexible_spending_level;
                (id, t.round_dp(2).min(c.maximum))
            })
            .collect();
        let desired =
            goal_targets.values().copied().sum::<Money>() + flexible_targets.values().copied().sum::<Money>();

        let surplus = model.total_income() - model.hard_floor();
        if surplus < Decimal::ZERO {
            debug!(
                event = "infeasible",
                solver = "heuristic",
                deficit = %(-surplus),
            );
            return HeuristicOutcome {
                categories,
                debts,
                goals,
                goal_targets,
                is_feasible: false,
                desired,
                funded: Decimal::ZERO,
                iterations: 1,
                fallback_from: None,
                fallback_reason: None,
            };
        }
        iterations += 1;

        let split = &params.surplus_allocation;
        let mut remaining = surplus;
        let bucket = |share: Rate, remaining: Money| floor_cents(surplus * share).min(remaining);

        // Emergency-fund goals first.
        let mut left = bucket(split.emergency_fund_percent, remaining);
        for (id, _) in model.ordered_goals().into_iter().filter(|(_, g)| g.is_emergency()) {
            let amount = goal_targets[id].min(left);
            if amount > Decimal::ZERO {
                *goals.entry(id.clone()).or_default() += amount;
                left -= amount;
                remaining -= amount;
                iterations += 1;
            }
        }

        // Extra payment on the single most urgent debt.
        let left_debt = bucket(split.debt_extra_percent, remaining);
        if let Some((id, d)) = model.highest_priority_debt() {
            let extra = d.extra_headroom().min(left_debt);
            if extra > Decimal::ZERO {
                *debts.entry(id.clone()).or_default() += extra;
                remaining -= extra;
                iterations += 1;
            }
        }

        // Remaining goals by ascending priority weight.
        let mut left = bucket(split.goals_percent, remaining);
        for (id, _) in model.ordered_goals().into_iter().filter(|(_, g)| !g.is_emergency()) {
            let amount = goal_targets[id].min(left);
            if amount > Decimal::ZERO {
                *goals.entry(id.clone()).or_default() += amount;
                left -= amount;
                remaining -= amount;
                iterations += 1;
            }
        }

        // Flexible categories, most important first.
        let mut flexible: Vec<_> = model.flexible_expenses().iter().collect();
        flexible.sort_by(|(a_id, a), (b_id, b)| a.priority.cmp(&b.priority).then_with(|| a_id.cmp(b_id)));
        let mut left = bucket(split.flexible_percent, remaining);
        for (id, _) in flexible {
            let amount = flexible_targets[id].min(left);
            if amount > Decimal::ZERO {
                *categories.entry(id.clone()).or_default() += amount;
                left -= amount;
                remaining -= amount;
                iterations += 1;
            }
        }

        let funded = goals.values().copied().sum::<Money>()
            + model
                .flexible_expenses()
                .keys()
                .map(|id| categories[id])
                .sum::<Money>();
        debug!(
            event = "buckets_filled",
            solver = "heuristic",
            surplus = %surplus,
            unallocated = %remaining,
        );

        HeuristicOutcome {
            categories,
            debts,
            goals,
            goal_targets,
            is_feasible: true,
            desired,
            funded,
            iterations,
            fallback_from: None,
            fallback_reason: None,
        }
    }
}

impl AllocationSolver for HeuristicSolver {
    type Outcome = HeuristicOutcome;

    fn kind(&self) -> SolverKind {
        SolverKind::Heuristic
    }

    fn solve(&self, problem: &AllocationProblem<'_>) -> BudgetResult<HeuristicOutcome> {
        Ok(self.run(problem))
    }
}

impl IntoAllocation for HeuristicOutcome {
    fn into_allocation(self, problem: &AllocationProblem<'_>) -> AllocationResult {
        let statuses: BTreeMap<String, GoalStatus> = self
            .goal_targets
            .iter()
            .map(|(id, target)| {
                let funded = self.goals.get(id).copied().unwrap_or(Decimal::ZERO);
                let status = if target - funded <= MONEY_EPSILON {
                    GoalStatus::Achieved
                } else if funded > MONEY_EPSILON {
                    GoalStatus::Partial
                } else {
                    GoalStatus::Unachieved
                };
                (id.clone(), status)
            })
            .collect();

        let score = if self.is_feasible {
            percent_of(self.funded, self.desired)
        } else {
            Decimal::ZERO
        };

        let draft = AllocationDraft {
            categories: self.categories,
            debts: self.debts,
            goals: self.goals,
        };
        draft.finish(
            problem.model,
            SolverKind::Heuristic,
            &statuses,
            score,
            self.iterations,
            SolverMetrics::Heuristic {
                fallback_from: self.fallback_from,
                fallback_reason: self.fallback_reason,
            },
        )
    }
}
