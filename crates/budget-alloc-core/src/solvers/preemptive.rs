//! Preemptive (lexicographic) goal programming.
//!
//! Levels are solved strictly in order: emergency fund, debt extra payments,
//! remaining goals, flexible spending (hard floors are funded up front).
//! Inside a level goals are grouped by rank, emergency goals first on ties.
//! A group that cannot be fully funded shares what is left in proportion to
//! unmet need. Budget spent on a group is never handed back, so a goal's
//! funding does not depend on anything ranked below it.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::graph::PriorityLevel;
use super::result::{classify_goals, AllocationDraft, GoalStatus, IntoAllocation};
use super::{AllocationProblem, AllocationResult, AllocationSolver, SolverKind, SolverMetrics};
use crate::types::*;
use crate::BudgetResult;

pub const PREEMPTIVE_TOLERANCE: Money = dec!(0.01);
pub const PREEMPTIVE_MAX_ITERATIONS: u32 = 100;

/// How one priority level fared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelReport {
    pub level: PriorityLevel,
    pub demanded: Money,
    pub funded: Money,
    pub satisfied: bool,
}

/// Native result of the preemptive solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreemptiveOutcome {
    pub values: Vec<Money>,
    pub levels: Vec<LevelReport>,
    pub iterations: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PreemptiveSolver;

impl AllocationSolver for PreemptiveSolver {
    type Outcome = PreemptiveOutcome;

    fn kind(&self) -> SolverKind {
        SolverKind::Preemptive
    }

    fn solve(&self, problem: &AllocationProblem<'_>) -> BudgetResult<PreemptiveOutcome> {
        let graph = &problem.graph;
        let mut remaining = graph.starting_budget()?;
        let mut values = graph.initial_values();
        let mut levels = Vec::with_capacity(PriorityLevel::SOFT.len());
        let mut iterations = 0u32;

        'levels: for level in PriorityLevel::SOFT {
            let mut goals: Vec<usize> = graph
                .soft_goals()
                .into_iter()
                .filter(|&g| graph.goals[g].level == level)
                .collect();
            goals.sort_by(|&a, &b| {
                let (ga, gb) = (&graph.goals[a], &graph.goals[b]);
                ga.rank
                    .cmp(&gb.rank)
                    .then_with(|| gb.emergency.cmp(&ga.emergency))
                    .then_with(|| graph.variables[ga.variable].id.cmp(&graph.variables[gb.variable].id))
            });

            let demanded: Money = goals.iter().map(|&g| graph.need(g, &values)).sum();

            let mut start = 0;
            while start < goals.len() {
                if iterations >= PREEMPTIVE_MAX_ITERATIONS {
                    break 'levels;
                }
                let key = |g: usize| (graph.goals[g].rank, graph.goals[g].emergency);
                let head = key(goals[start]);
                let end = goals[start..]
                    .iter()
                    .position(|&g| key(g) != head)
                    .map_or(goals.len(), |offset| start + offset);
                let group = &goals[start..end];
                start = end;
                iterations += 1;

                let needs: Vec<Money> = group.iter().map(|&g| graph.need(g, &values)).collect();
                let total_need: Money = needs.iter().copied().sum();
                if total_need <= PREEMPTIVE_TOLERANCE || remaining <= Decimal::ZERO {
                    continue;
                }

                if remaining >= total_need {
                    for (&g, need) in group.iter().zip(&needs) {
                        values[graph.goals[g].variable] += *need;
                    }
                    remaining -= total_need;
                } else {
                    let budget = remaining;
                    for (&g, need) in group.iter().zip(&needs) {
                        let share = floor_cents(budget * *need / total_need).min(*need);
                        values[graph.goals[g].variable] += share;
                        remaining -= share;
                    }
                }
            }

            let unmet: Money = goals.iter().map(|&g| graph.need(g, &values)).sum();
            let report = LevelReport {
                level,
                demanded,
                funded: demanded - unmet,
                satisfied: unmet <= PREEMPTIVE_TOLERANCE,
            };
            debug!(
                event = "level_solved",
                solver = "preemptive",
                level = %report.level,
                demanded = %report.demanded,
                funded = %report.funded,
                remaining = %remaining,
            );
            levels.push(report);
        }

        Ok(PreemptiveOutcome {
            values,
            levels,
            iterations,
        })
    }
}

impl IntoAllocation for PreemptiveOutcome {
    fn into_allocation(self, problem: &AllocationProblem<'_>) -> AllocationResult {
        let graph = &problem.graph;
        let statuses = classify_goals(graph, &self.values, |_, funded, extent| {
            if extent - funded <= PREEMPTIVE_TOLERANCE {
                GoalStatus::Achieved
            } else if funded > PREEMPTIVE_TOLERANCE {
                GoalStatus::Partial
            } else {
                GoalStatus::Unachieved
            }
        });

        let soft = graph.soft_goals();
        let demanded: Money = soft.iter().map(|&g| graph.extent(g)).sum();
        let unmet: Money = soft.iter().map(|&g| graph.need(g, &self.values)).sum();
        let score = percent_of(demanded - unmet, demanded);

        let metrics = SolverMetrics::Preemptive {
            levels_solved: self.levels.len() as u32,
            levels_satisfied: self.levels.iter().filter(|l| l.satisfied).count() as u32,
        };
        AllocationDraft::from_values(graph, &self.values).finish(
            problem.model,
            SolverKind::Preemptive,
            &statuses,
            score,
            self.iterations,
            metrics,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintModel, GoalTarget, GoalType, ScenarioParameters};
    use rust_decimal_macros::dec;

    fn goal(goal_type: GoalType, suggested: Decimal, weight: u32) -> GoalTarget {
        GoalTarget {
            goal_name: "g".into(),
            goal_type,
            suggested_contribution: suggested,
            remaining_amount: dec!(100000),
            priority_label: "x".into(),
            priority_weight: weight,
        }
    }

    fn solve(model: &ConstraintModel) -> AllocationResult {
        let params = ScenarioParameters::default();
        let problem = AllocationProblem::new(model, &params);
        PreemptiveSolver
            .solve(&problem)
            .unwrap()
            .into_allocation(&problem)
    }

    #[test]
    fn test_levels_funded_in_order() {
        // 1000 spare: emergency 600, then card extra 150, then vacation gets 250 of 400
        let model = ConstraintModel::builder(dec!(2650))
            .mandatory("rent", dec!(1500), 1)
            .debt("card", dec!(150), dec!(3000), dec!(0.22))
            .goal("ef", goal(GoalType::Emergency, dec!(600), 20))
            .goal("vacation", goal(GoalType::Purchase, dec!(400), 1))
            .flexible("dining", dec!(0), dec!(200), 5)
            .build()
            .unwrap();
        let result = solve(&model);

        assert_eq!(result.goal_allocations["ef"], dec!(600));
        assert_eq!(result.debt_allocations["card"].extra_payment, dec!(150));
        assert_eq!(result.goal_allocations["vacation"], dec!(250));
        assert_eq!(result.category_allocations["dining"], dec!(0));
        assert_eq!(result.achieved_goals, vec!["ef".to_string()]);
        assert_eq!(result.partial_goals, vec!["vacation".to_string()]);
        assert_eq!(result.surplus, dec!(0));
    }

    #[test]
    fn test_equal_rank_group_shares_proportionally() {
        let model = ConstraintModel::builder(dec!(300))
            .goal("a", goal(GoalType::Savings, dec!(300), 10))
            .goal("b", goal(GoalType::Savings, dec!(100), 10))
            .build()
            .unwrap();
        let result = solve(&model);
        assert_eq!(result.goal_allocations["a"], dec!(225));
        assert_eq!(result.goal_allocations["b"], dec!(75));
    }

    #[test]
    fn test_infeasible_model_errors() {
        let model = ConstraintModel::builder(dec!(1000))
            .mandatory("rent", dec!(1500), 1)
            .build()
            .unwrap();
        let params = ScenarioParameters::default();
        let problem = AllocationProblem::new(&model, &params);
        assert!(PreemptiveSolver.solve(&problem).is_err());
    }

    #[test]
    fn test_iterations_bounded() {
        let mut builder = ConstraintModel::builder(dec!(100000));
        for i in 0..150 {
            builder = builder.goal(format!("g{i:03}"), goal(GoalType::Savings, dec!(10), (i % 99) + 1));
        }
        let model = builder.build().unwrap();
        let result = solve(&model);
        assert!(result.iterations <= PREEMPTIVE_MAX_ITERATIONS);
    }
}
