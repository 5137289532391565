//! Single entry point over the five strategies.
//!
//! Structured solvers that fail (infeasible floors, broken graph references)
//! are replaced by the heuristic; the substitution is recorded in the result
//! metrics and logged at `warn`. Comparisons run several strategies on the same
//! model and recommend one.

use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::heuristic::HeuristicSolver;
use super::meta::MetaSolver;
use super::minmax::MinmaxSolver;
use super::preemptive::PreemptiveSolver;
use super::weighted::WeightedSolver;
use super::{
    AllocationProblem, AllocationResult, AllocationSolver, IntoAllocation, SolverKind,
    SolverMetrics,
};
use crate::error::BudgetError;
use crate::model::{ConstraintModel, ScenarioParameters};
use crate::types::{with_metadata, ComputationOutput, Percent};
use crate::BudgetResult;

/// Strategies compared by [`SolverFacade::solve_triple`] when none are named.
pub const DEFAULT_TRIPLE: [SolverKind; 3] = [
    SolverKind::Preemptive,
    SolverKind::Weighted,
    SolverKind::Minmax,
];

/// Minimum achievement (percent) the minmax result needs before its balance
/// can outweigh a higher achieved-goal count.
const BALANCED_MIN_ACHIEVEMENT: Percent = dec!(50);

// ---------------------------------------------------------------------------
// Comparison types
// ---------------------------------------------------------------------------

/// Headline numbers of one strategy in a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyScore {
    /// Strategy that was asked for.
    pub requested: SolverKind,
    /// Strategy that produced the numbers (heuristic after a fallback).
    pub solver_type: SolverKind,
    pub achieved_goals: usize,
    pub feasibility_score: Percent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub results: Vec<AllocationResult>,
    pub scores: Vec<StrategyScore>,
    pub recommended: SolverKind,
    pub reason: String,
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SolverFacade {
    params: ScenarioParameters,
}

impl SolverFacade {
    pub fn new(params: ScenarioParameters) -> BudgetResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ScenarioParameters {
        &self.params
    }

    /// Solve with the named strategy, falling back to the heuristic on error.
    pub fn solve(&self, model: &ConstraintModel, kind: SolverKind) -> AllocationResult {
        match kind {
            SolverKind::Preemptive => self.solve_preemptive(model),
            SolverKind::Weighted => self.solve_weighted(model),
            SolverKind::Minmax => self.solve_minmax(model),
            SolverKind::Meta => self.solve_meta(model),
            SolverKind::Heuristic => self.solve_heuristic(model),
        }
    }

    pub fn solve_preemptive(&self, model: &ConstraintModel) -> AllocationResult {
        self.run_or_fallback(model, &PreemptiveSolver)
    }

    pub fn solve_weighted(&self, model: &ConstraintModel) -> AllocationResult {
        self.run_or_fallback(model, &WeightedSolver)
    }

    pub fn solve_minmax(&self, model: &ConstraintModel) -> AllocationResult {
        self.run_or_fallback(model, &MinmaxSolver)
    }

    pub fn solve_meta(&self, model: &ConstraintModel) -> AllocationResult {
        self.run_or_fallback(model, &MetaSolver)
    }

    pub fn solve_heuristic(&self, model: &ConstraintModel) -> AllocationResult {
        let start = Instant::now();
        let problem = AllocationProblem::new(model, &self.params);
        info!(event = "solve_start", solver = %SolverKind::Heuristic);
        let result = HeuristicSolver.run(&problem).into_allocation(&problem);
        log_end(&result, start);
        result
    }

    fn run_or_fallback<S: AllocationSolver>(
        &self,
        model: &ConstraintModel,
        solver: &S,
    ) -> AllocationResult {
        let start = Instant::now();
        let problem = AllocationProblem::new(model, &self.params);
        let kind = solver.kind();
        info!(
            event = "solve_start",
            solver = %kind,
            variables = problem.graph.variables.len(),
            goals = problem.graph.goals.len(),
        );

        let result = match solver.solve(&problem) {
            Ok(outcome) => outcome.into_allocation(&problem),
            Err(e) => {
                warn!(
                    event = "solver_fallback",
                    requested = %kind,
                    reason = %e,
                );
                HeuristicSolver
                    .run(&problem)
                    .as_fallback_for(kind, e.to_string())
                    .into_allocation(&problem)
            }
        };
        log_end(&result, start);
        result
    }

    /// Run two strategies side by side.
    pub fn solve_dual(
        &self,
        model: &ConstraintModel,
        first: SolverKind,
        second: SolverKind,
    ) -> BudgetResult<ComputationOutput<StrategyComparison>> {
        self.compare(model, &[first, second])
    }

    /// Run three strategies side by side.
    pub fn solve_triple(
        &self,
        model: &ConstraintModel,
        kinds: [SolverKind; 3],
    ) -> BudgetResult<ComputationOutput<StrategyComparison>> {
        self.compare(model, &kinds)
    }

    /// Run any set of distinct strategies and recommend one.
    pub fn compare(
        &self,
        model: &ConstraintModel,
        kinds: &[SolverKind],
    ) -> BudgetResult<ComputationOutput<StrategyComparison>> {
        let start = Instant::now();
        if kinds.len() < 2 {
            return Err(BudgetError::invalid(
                "solvers",
                "At least two strategies are needed for a comparison",
            ));
        }
        for (i, kind) in kinds.iter().enumerate() {
            if kinds[..i].contains(kind) {
                return Err(BudgetError::invalid(
                    "solvers",
                    format!("Strategy '{kind}' listed more than once"),
                ));
            }
        }

        let mut warnings: Vec<String> = Vec::new();
        let mut results = Vec::with_capacity(kinds.len());
        let mut scores = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            let result = self.solve(model, kind);
            if let SolverMetrics::Heuristic {
                fallback_from: Some(from),
                fallback_reason,
            } = &result.metrics
            {
                warnings.push(format!(
                    "{from} failed and was replaced by the heuristic: {}",
                    fallback_reason.as_deref().unwrap_or("unknown reason")
                ));
            }
            if !result.is_feasible {
                warnings.push(format!(
                    "{kind}: mandatory expenses and minimum payments exceed income"
                ));
            }
            scores.push(StrategyScore {
                requested: kind,
                solver_type: result.solver_type,
                achieved_goals: result.achieved_goals.len(),
                feasibility_score: result.feasibility_score,
            });
            results.push(result);
        }

        let (recommended, reason) = recommend(&scores, &results);
        info!(
            event = "comparison",
            strategies = kinds.len(),
            recommended = %recommended,
        );

        let comparison = StrategyComparison {
            results,
            scores,
            recommended,
            reason,
        };
        let elapsed = start.elapsed().as_micros() as u64;
        Ok(with_metadata(
            "Goal programming strategy comparison",
            &serde_json::json!({
                "strategies": kinds.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
                "goal_contribution_factor": self.params.goal_contribution_factor.to_string(),
                "flexible_spending_level": self.params.flexible_spending_level.to_string(),
                "ranking": "most fully achieved goals, then feasibility score, then listed order",
            }),
            warnings,
            elapsed,
            comparison,
        ))
    }
}

fn log_end(result: &AllocationResult, start: Instant) {
    info!(
        event = "solve_end",
        solver = %result.solver_type,
        feasible = result.is_feasible,
        score = %result.feasibility_score,
        surplus = %result.surplus,
        iterations = result.iterations,
        duration_us = start.elapsed().as_micros() as u64,
    );
}

/// Pick the strategy with the most fully achieved goals (ties: higher score,
/// then listed order). A balanced minmax result with at least 50% minimum
/// achievement wins when it trails the best count by at most one goal.
fn recommend(scores: &[StrategyScore], results: &[AllocationResult]) -> (SolverKind, String) {
    let mut best = 0;
    for (i, s) in scores.iter().enumerate().skip(1) {
        let b = &scores[best];
        if s.achieved_goals > b.achieved_goals
            || (s.achieved_goals == b.achieved_goals && s.feasibility_score > b.feasibility_score)
        {
            best = i;
        }
    }
    let best_score = &scores[best];

    let balanced = scores.iter().zip(results).find(|(s, r)| {
        s.requested == SolverKind::Minmax
            && matches!(
                r.metrics,
                SolverMetrics::Minmax { is_balanced: true, min_achievement, .. }
                    if min_achievement >= BALANCED_MIN_ACHIEVEMENT
            )
            && s.achieved_goals + 1 >= best_score.achieved_goals
    });
    if let Some((s, r)) = balanced {
        if s.requested != best_score.requested {
            let min = match r.metrics {
                SolverMetrics::Minmax { min_achievement, .. } => min_achievement,
                _ => Decimal::ZERO,
            };
            return (
                SolverKind::Minmax,
                format!(
                    "minmax keeps every goal at or above {min}% funded while achieving {} goal(s), \
                     within one of the best ({} by {})",
                    s.achieved_goals, best_score.achieved_goals, best_score.requested
                ),
            );
        }
    }

    (
        best_score.requested,
        format!(
            "{} achieves the most goals in full ({}) with a feasibility score of {}",
            best_score.requested, best_score.achieved_goals, best_score.feasibility_score
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GoalTarget, GoalType};
    use rust_decimal_macros::dec;

    fn goal(goal_type: GoalType, suggested: Decimal, weight: u32) -> GoalTarget {
        GoalTarget {
            goal_name: "g".into(),
            goal_type,
            suggested_contribution: suggested,
            remaining_amount: dec!(20000),
            priority_label: "x".into(),
            priority_weight: weight,
        }
    }

    fn facade() -> SolverFacade {
        SolverFacade::new(ScenarioParameters::default()).unwrap()
    }

    fn sample_model() -> ConstraintModel {
        ConstraintModel::builder(dec!(5000))
            .mandatory("rent", dec!(1500), 1)
            .debt("card", dec!(150), dec!(5000), dec!(0.18))
            .goal("ef", goal(GoalType::Emergency, dec!(500), 10))
            .goal("trip", goal(GoalType::Purchase, dec!(300), 50))
            .flexible("dining", dec!(100), dec!(400), 3)
            .build()
            .unwrap()
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = ScenarioParameters {
            flexible_spending_level: dec!(1.5),
            ..ScenarioParameters::default()
        };
        assert!(SolverFacade::new(params).is_err());
    }

    #[test]
    fn test_every_kind_respects_income_and_minimums() {
        let model = sample_model();
        let f = facade();
        for kind in SolverKind::ALL {
            let result = f.solve(&model, kind);
            assert_eq!(result.solver_type, kind);
            assert!(result.is_feasible);
            assert!(result.total_allocated <= model.total_income() + dec!(0.01));
            assert!(result.debt_allocations["card"].total_payment >= dec!(150));
            assert_eq!(result.category_allocations["rent"], dec!(1500));
        }
    }

    #[test]
    fn test_infeasible_model_falls_back_to_heuristic() {
        let model = ConstraintModel::builder(dec!(1000))
            .mandatory("rent", dec!(1200), 1)
            .goal("ef", goal(GoalType::Emergency, dec!(100), 10))
            .build()
            .unwrap();
        let result = facade().solve_weighted(&model);
        assert_eq!(result.solver_type, SolverKind::Heuristic);
        assert!(!result.is_feasible);
        assert_eq!(result.surplus, dec!(-200));
        match result.metrics {
            SolverMetrics::Heuristic { fallback_from, fallback_reason } => {
                assert_eq!(fallback_from, Some(SolverKind::Weighted));
                assert!(fallback_reason.is_some());
            }
            other => panic!("unexpected metrics {other:?}"),
        }
    }

    #[test]
    fn test_triple_comparison_recommends_listed_strategy() {
        let out = facade().solve_triple(&sample_model(), DEFAULT_TRIPLE).unwrap();
        let cmp = out.result;
        assert_eq!(cmp.results.len(), 3);
        assert_eq!(cmp.scores.len(), 3);
        assert!(DEFAULT_TRIPLE.contains(&cmp.recommended));
        assert!(!cmp.reason.is_empty());
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_comparison_warns_on_fallback() {
        let model = ConstraintModel::builder(dec!(1000))
            .mandatory("rent", dec!(1200), 1)
            .build()
            .unwrap();
        let out = facade()
            .solve_dual(&model, SolverKind::Preemptive, SolverKind::Meta)
            .unwrap();
        assert!(out
            .warnings
            .iter()
            .any(|w| w.contains("replaced by the heuristic")));
        assert!(out
            .result
            .scores
            .iter()
            .all(|s| s.solver_type == SolverKind::Heuristic));
    }

    #[test]
    fn test_duplicate_strategies_rejected() {
        let err = facade()
            .solve_dual(&sample_model(), SolverKind::Meta, SolverKind::Meta)
            .unwrap_err();
        assert!(matches!(err, BudgetError::InvalidInput { .. }));
    }

    #[test]
    fn test_recommend_prefers_balanced_minmax_within_one_goal() {
        let result = |kind, metrics| AllocationResult {
            solver_type: kind,
            category_allocations: Default::default(),
            debt_allocations: Default::default(),
            goal_allocations: Default::default(),
            total_allocated: Decimal::ZERO,
            surplus: Decimal::ZERO,
            is_feasible: true,
            feasibility_score: dec!(80),
            achieved_goals: vec![],
            partial_goals: vec![],
            unachieved_goals: vec![],
            iterations: 1,
            metrics,
        };
        let results = vec![
            result(SolverKind::Preemptive, SolverMetrics::Preemptive { levels_solved: 4, levels_satisfied: 2 }),
            result(
                SolverKind::Minmax,
                SolverMetrics::Minmax {
                    min_achievement: dec!(60),
                    max_achievement: dec!(70),
                    is_balanced: true,
                },
            ),
        ];
        let scores = vec![
            StrategyScore {
                requested: SolverKind::Preemptive,
                solver_type: SolverKind::Preemptive,
                achieved_goals: 3,
                feasibility_score: dec!(80),
            },
            StrategyScore {
                requested: SolverKind::Minmax,
                solver_type: SolverKind::Minmax,
                achieved_goals: 2,
                feasibility_score: dec!(65),
            },
        ];
        let (kind, reason) = recommend(&scores, &results);
        assert_eq!(kind, SolverKind::Minmax);
        assert!(reason.contains("60"));

        let mut behind = scores.clone();
        behind[1].achieved_goals = 1;
        assert_eq!(recommend(&behind, &results).0, SolverKind::Preemptive);
    }
}
