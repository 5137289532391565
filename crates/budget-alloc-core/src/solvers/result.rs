//! Common allocation result shape and the adapter every solver outcome
//! implements to produce it.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::graph::{GoalGraph, VariableKind};
use super::AllocationProblem;
use crate::error::BudgetError;
use crate::model::ConstraintModel;
use crate::types::*;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which strategy produced (or was asked to produce) an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    Preemptive,
    Weighted,
    Minmax,
    Meta,
    Heuristic,
}

impl SolverKind {
    pub const ALL: [SolverKind; 5] = [
        SolverKind::Preemptive,
        SolverKind::Weighted,
        SolverKind::Minmax,
        SolverKind::Meta,
        SolverKind::Heuristic,
    ];
}

impl std::fmt::Display for SolverKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverKind::Preemptive => write!(f, "preemptive"),
            SolverKind::Weighted => write!(f, "weighted"),
            SolverKind::Minmax => write!(f, "minmax"),
            SolverKind::Meta => write!(f, "meta"),
            SolverKind::Heuristic => write!(f, "heuristic"),
        }
    }
}

impl std::str::FromStr for SolverKind {
    type Err = BudgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "preemptive" | "lexicographic" => Ok(SolverKind::Preemptive),
            "weighted" => Ok(SolverKind::Weighted),
            "minmax" | "chebyshev" => Ok(SolverKind::Minmax),
            "meta" => Ok(SolverKind::Meta),
            "heuristic" | "fallback" => Ok(SolverKind::Heuristic),
            other => Err(BudgetError::invalid(
                "solver",
                format!(
                    "Unknown solver '{other}'. Available: preemptive, weighted, minmax, meta, heuristic"
                ),
            )),
        }
    }
}

/// Classification of a savings goal after solving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Achieved,
    Partial,
    Unachieved,
}

/// Strategy-specific diagnostics carried alongside the common fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SolverMetrics {
    Preemptive {
        levels_solved: u32,
        levels_satisfied: u32,
    },
    Weighted {
        weighted_deviation: Decimal,
    },
    Minmax {
        min_achievement: Percent,
        max_achievement: Percent,
        is_balanced: bool,
    },
    Meta {
        total_reward: Decimal,
        max_reward: Decimal,
        reward_ratio: Decimal,
    },
    Heuristic {
        /// Structured strategy that failed and was replaced, if any.
        #[serde(skip_serializing_if = "Option::is_none")]
        fallback_from: Option<SolverKind>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fallback_reason: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Payment split for one debt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtAllocation {
    pub minimum_payment: Money,
    pub extra_payment: Money,
    pub total_payment: Money,
}

/// Common output of every strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationResult {
    /// Strategy that actually produced the numbers.
    pub solver_type: SolverKind,
    pub category_allocations: BTreeMap<String, Money>,
    pub debt_allocations: BTreeMap<String, DebtAllocation>,
    pub goal_allocations: BTreeMap<String, Money>,
    pub total_allocated: Money,
    /// `total_income - total_allocated`; negative means deficit.
    pub surplus: Money,
    pub is_feasible: bool,
    pub feasibility_score: Percent,
    pub achieved_goals: Vec<String>,
    pub partial_goals: Vec<String>,
    pub unachieved_goals: Vec<String>,
    pub iterations: u32,
    pub metrics: SolverMetrics,
}

impl AllocationResult {
    pub fn goal_total(&self) -> Money {
        self.goal_allocations.values().copied().sum()
    }

    pub fn category_total(&self) -> Money {
        self.category_allocations.values().copied().sum()
    }

    pub fn debt_total(&self) -> Money {
        self.debt_allocations.values().map(|d| d.total_payment).sum()
    }

    pub fn debt_extra_total(&self) -> Money {
        self.debt_allocations.values().map(|d| d.extra_payment).sum()
    }

    pub fn mandatory_total(&self, model: &ConstraintModel) -> Money {
        self.category_allocations
            .iter()
            .filter(|(id, _)| model.mandatory_expenses().contains_key(*id))
            .map(|(_, a)| *a)
            .sum()
    }

    pub fn flexible_total(&self, model: &ConstraintModel) -> Money {
        self.category_allocations
            .iter()
            .filter(|(id, _)| model.flexible_expenses().contains_key(*id))
            .map(|(_, a)| *a)
            .sum()
    }

    pub fn goal_status(&self, goal_id: &str) -> Option<GoalStatus> {
        let id = goal_id.to_string();
        if self.achieved_goals.contains(&id) {
            Some(GoalStatus::Achieved)
        } else if self.partial_goals.contains(&id) {
            Some(GoalStatus::Partial)
        } else if self.unachieved_goals.contains(&id) {
            Some(GoalStatus::Unachieved)
        } else {
            None
        }
    }

    /// Recompute totals and surplus after amounts were changed in place
    /// (e.g. presentation rounding).
    pub fn recompute_totals(&mut self, model: &ConstraintModel) {
        for (id, debt) in self.debt_allocations.iter_mut() {
            if let Some(d) = model.debt_payments().get(id) {
                debt.minimum_payment = d.minimum_payment;
            }
            debt.extra_payment = (debt.total_payment - debt.minimum_payment).max(Decimal::ZERO);
        }
        self.total_allocated = self.category_total() + self.debt_total() + self.goal_total();
        self.surplus = model.total_income() - self.total_allocated;
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Maps a strategy's native outcome into the common [`AllocationResult`].
pub trait IntoAllocation {
    fn into_allocation(self, problem: &AllocationProblem<'_>) -> AllocationResult;
}

/// Raw per-item amounts before scoring and classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct AllocationDraft {
    pub categories: BTreeMap<String, Money>,
    /// Total payment per debt.
    pub debts: BTreeMap<String, Money>,
    pub goals: BTreeMap<String, Money>,
}

impl AllocationDraft {
    pub fn from_values(graph: &GoalGraph, values: &[Money]) -> Self {
        let mut draft = AllocationDraft::default();
        for (v, value) in graph.variables.iter().zip(values.iter()) {
            let bucket = match v.kind {
                VariableKind::Mandatory | VariableKind::Flexible => &mut draft.categories,
                VariableKind::Debt => &mut draft.debts,
                VariableKind::Goal => &mut draft.goals,
            };
            bucket.insert(v.id.clone(), *value);
        }
        draft
    }

    /// Build the common result. Totals and surplus are always recomputed and
    /// extra payments clamped at zero.
    pub fn finish(
        self,
        model: &ConstraintModel,
        solver_type: SolverKind,
        statuses: &BTreeMap<String, GoalStatus>,
        feasibility_score: Percent,
        iterations: u32,
        metrics: SolverMetrics,
    ) -> AllocationResult {
        let debt_allocations: BTreeMap<String, DebtAllocation> = self
            .debts
            .into_iter()
            .map(|(id, total_payment)| {
                let minimum_payment = model
                    .debt_payments()
                    .get(&id)
                    .map(|d| d.minimum_payment)
                    .unwrap_or(Decimal::ZERO);
                let alloc = DebtAllocation {
                    minimum_payment,
                    extra_payment: (total_payment - minimum_payment).max(Decimal::ZERO),
                    total_payment,
                };
                (id, alloc)
            })
            .collect();

        let mut achieved_goals = Vec::new();
        let mut partial_goals = Vec::new();
        let mut unachieved_goals = Vec::new();
        for (id, status) in statuses {
            match status {
                GoalStatus::Achieved => achieved_goals.push(id.clone()),
                GoalStatus::Partial => partial_goals.push(id.clone()),
                GoalStatus::Unachieved => unachieved_goals.push(id.clone()),
            }
        }

        let mut result = AllocationResult {
            solver_type,
            category_allocations: self.categories,
            debt_allocations,
            goal_allocations: self.goals,
            total_allocated: Decimal::ZERO,
            surplus: Decimal::ZERO,
            is_feasible: true,
            feasibility_score: feasibility_score.round_dp(2),
            achieved_goals,
            partial_goals,
            unachieved_goals,
            iterations,
            metrics,
        };
        result.recompute_totals(model);
        result.is_feasible = result.surplus >= -MONEY_EPSILON
            && model.total_income() >= model.hard_floor();
        result
    }
}

/// Classify every savings goal in the graph with a strategy-specific rule.
///
/// The rule receives the goal index, the funded amount above the lower bound
/// and the goal's extent.
pub(crate) fn classify_goals<F>(
    graph: &GoalGraph,
    values: &[Money],
    rule: F,
) -> BTreeMap<String, GoalStatus>
where
    F: Fn(usize, Money, Money) -> GoalStatus,
{
    let mut statuses = BTreeMap::new();
    for (vi, v) in graph.variables.iter().enumerate() {
        if v.kind != VariableKind::Goal {
            continue;
        }
        let status = match graph.soft_goal_for(vi) {
            Some(gi) => rule(gi, values[vi] - v.lower, graph.extent(gi)),
            None => GoalStatus::Achieved,
        };
        statuses.insert(v.id.clone(), status);
    }
    statuses
}
