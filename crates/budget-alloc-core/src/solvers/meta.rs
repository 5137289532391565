//! Meta (multi-choice) goal programming.
//!
//! Every soft goal offers discrete achievement tiers, each worth a reward
//! proportional to the goal's weight. The solver repeatedly buys the tier
//! upgrade with the best reward per unit of cost that still fits the budget,
//! a greedy answer to the multiple-choice knapsack.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::graph::GoalGraph;
use super::result::{classify_goals, AllocationDraft, GoalStatus, IntoAllocation};
use super::{AllocationProblem, AllocationResult, AllocationSolver, SolverKind, SolverMetrics};
use crate::types::*;
use crate::BudgetResult;

pub const META_TOLERANCE: Money = dec!(0.01);
pub const META_MAX_ITERATIONS: u32 = 100;

/// Discrete achievement level of a goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementTier {
    None,
    Minimum,
    Target,
    Ideal,
}

impl AchievementTier {
    /// Share of the goal's extent funded at this tier.
    fn funding_fraction(self) -> Decimal {
        match self {
            AchievementTier::None => Decimal::ZERO,
            AchievementTier::Minimum => dec!(0.5),
            AchievementTier::Target => Decimal::ONE,
            AchievementTier::Ideal => dec!(1.5),
        }
    }

    /// Reward multiplier on the goal's weight.
    fn reward_factor(self) -> Decimal {
        match self {
            AchievementTier::None => Decimal::ZERO,
            AchievementTier::Minimum => dec!(0.4),
            AchievementTier::Target => Decimal::ONE,
            AchievementTier::Ideal => dec!(1.2),
        }
    }
}

/// One purchasable option for a goal.
#[derive(Debug, Clone, PartialEq)]
struct TierOption {
    tier: AchievementTier,
    /// Amount above the variable's lower bound.
    amount: Money,
    reward: Decimal,
}

/// Tiers of one goal; `Ideal` is dropped when the bound leaves no room above
/// the target.
fn tier_options(graph: &GoalGraph, goal: usize) -> Vec<TierOption> {
    let g = &graph.goals[goal];
    let v = &graph.variables[g.variable];
    let extent = graph.extent(goal);
    let headroom = v.upper - v.lower;

    let mut options = Vec::with_capacity(4);
    for tier in [
        AchievementTier::None,
        AchievementTier::Minimum,
        AchievementTier::Target,
        AchievementTier::Ideal,
    ] {
        let amount = (extent * tier.funding_fraction()).round_dp(2).min(headroom);
        if tier == AchievementTier::Ideal && amount <= extent + META_TOLERANCE {
            continue;
        }
        options.push(TierOption {
            tier,
            amount,
            reward: g.weight * tier.reward_factor(),
        });
    }
    options
}

/// Native result of the meta solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaOutcome {
    pub values: Vec<Money>,
    /// Tier reached by each soft goal, keyed by goal index.
    pub tiers: BTreeMap<usize, AchievementTier>,
    pub total_reward: Decimal,
    pub max_reward: Decimal,
    pub iterations: u32,
}

impl MetaOutcome {
    /// Achieved over maximum possible reward, 1 when nothing is at stake.
    pub fn reward_ratio(&self) -> Decimal {
        if self.max_reward <= Decimal::ZERO {
            Decimal::ONE
        } else {
            self.total_reward / self.max_reward
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetaSolver;

impl AllocationSolver for MetaSolver {
    type Outcome = MetaOutcome;

    fn kind(&self) -> SolverKind {
        SolverKind::Meta
    }

    fn solve(&self, problem: &AllocationProblem<'_>) -> BudgetResult<MetaOutcome> {
        let graph = &problem.graph;
        let mut remaining = graph.starting_budget()?;
        let mut values = graph.initial_values();

        let goals = graph.soft_goals();
        let options: Vec<Vec<TierOption>> = goals.iter().map(|&g| tier_options(graph, g)).collect();
        let mut current: Vec<usize> = vec![0; goals.len()];
        let max_reward: Decimal = options
            .iter()
            .filter_map(|o| o.last().map(|t| t.reward))
            .sum();
        let mut iterations = 0u32;

        while iterations < META_MAX_ITERATIONS {
            // (goal slot, option index, reward gain, cost)
            let mut best: Option<(usize, usize, Decimal, Money)> = None;
            for (slot, opts) in options.iter().enumerate() {
                let from = &opts[current[slot]];
                for (oi, to) in opts.iter().enumerate().skip(current[slot] + 1) {
                    let cost = to.amount - from.amount;
                    let gain = to.reward - from.reward;
                    if cost > remaining || gain <= Decimal::ZERO {
                        continue;
                    }
                    let better = match best {
                        None => true,
                        Some((_, _, best_gain, best_cost)) => {
                            // gain / cost compared without dividing; free upgrades win
                            let lhs = gain * best_cost;
                            let rhs = best_gain * cost;
                            lhs > rhs || (lhs == rhs && gain > best_gain)
                        }
                    };
                    if better {
                        best = Some((slot, oi, gain, cost));
                    }
                }
            }

            let Some((slot, oi, gain, cost)) = best else {
                break;
            };
            iterations += 1;
            values[graph.goals[goals[slot]].variable] += cost;
            remaining -= cost;
            current[slot] = oi;
            debug!(
                event = "tier_upgrade",
                solver = "meta",
                goal = %graph.variables[graph.goals[goals[slot]].variable].id,
                tier = ?options[slot][oi].tier,
                gain = %gain,
                cost = %cost,
                remaining = %remaining,
            );
        }

        let total_reward = options
            .iter()
            .zip(&current)
            .map(|(opts, &c)| opts[c].reward)
            .sum();
        let tiers = goals
            .iter()
            .zip(&current)
            .zip(&options)
            .map(|((&g, &c), opts)| (g, opts[c].tier))
            .collect();

        Ok(MetaOutcome {
            values,
            tiers,
            total_reward,
            max_reward,
            iterations,
        })
    }
}

impl IntoAllocation for MetaOutcome {
    fn into_allocation(self, problem: &AllocationProblem<'_>) -> AllocationResult {
        let graph = &problem.graph;
        let statuses = classify_goals(graph, &self.values, |goal, _, _| {
            match self.tiers.get(&goal).copied().unwrap_or(AchievementTier::None) {
                AchievementTier::Target | AchievementTier::Ideal => GoalStatus::Achieved,
                AchievementTier::Minimum => GoalStatus::Partial,
                AchievementTier::None => GoalStatus::Unachieved,
            }
        });

        let ratio = self.reward_ratio();
        AllocationDraft::from_values(graph, &self.values).finish(
            problem.model,
            SolverKind::Meta,
            &statuses,
            ratio * dec!(100),
            self.iterations,
            SolverMetrics::Meta {
                total_reward: self.total_reward.round_dp(4),
                max_reward: self.max_reward.round_dp(4),
                reward_ratio: ratio.round_dp(4),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintModel, GoalTarget, GoalType, ScenarioParameters};
    use rust_decimal_macros::dec;

    fn goal(suggested: Decimal, remaining: Decimal, weight: u32) -> GoalTarget {
        GoalTarget {
            goal_name: "g".into(),
            goal_type: GoalType::Savings,
            suggested_contribution: suggested,
            remaining_amount: remaining,
            priority_label: "x".into(),
            priority_weight: weight,
        }
    }

    fn run(model: &ConstraintModel) -> (MetaOutcome, AllocationResult) {
        let params = ScenarioParameters::default();
        let problem = AllocationProblem::new(model, &params);
        let outcome = MetaSolver.solve(&problem).unwrap();
        let result = outcome.clone().into_allocation(&problem);
        (outcome, result)
    }

    #[test]
    fn test_ample_budget_reaches_ideal() {
        let model = ConstraintModel::builder(dec!(10000))
            .goal("a", goal(dec!(200), dec!(5000), 10))
            .build()
            .unwrap();
        let (outcome, result) = run(&model);
        assert_eq!(result.goal_allocations["a"], dec!(300));
        assert_eq!(outcome.reward_ratio(), Decimal::ONE);
        assert_eq!(result.feasibility_score, dec!(100));
        assert_eq!(result.achieved_goals, vec!["a".to_string()]);
    }

    #[test]
    fn test_ideal_tier_dropped_when_remaining_is_target() {
        let model = ConstraintModel::builder(dec!(10000))
            .goal("a", goal(dec!(200), dec!(200), 10))
            .build()
            .unwrap();
        let (_, result) = run(&model);
        assert_eq!(result.goal_allocations["a"], dec!(200));
    }

    #[test]
    fn test_tight_budget_prefers_best_reward_per_cost() {
        // a: weight 90, target 1000; b: weight 10, target 100. Budget 600.
        // a minimum (500) yields 36 for 500; b minimum yields 4 for 50.
        let model = ConstraintModel::builder(dec!(600))
            .goal("a", goal(dec!(1000), dec!(1000), 10))
            .goal("b", goal(dec!(100), dec!(100), 90))
            .build()
            .unwrap();
        let (outcome, result) = run(&model);
        assert!(result.total_allocated <= dec!(600));
        assert_eq!(result.goal_status("a"), Some(GoalStatus::Partial));
        assert!(outcome.total_reward < outcome.max_reward);
        assert!(result.feasibility_score < dec!(100));
    }
}
