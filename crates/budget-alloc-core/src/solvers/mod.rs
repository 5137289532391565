//! Goal-programming solvers for the monthly allocation problem.
//!
//! Five interchangeable strategies implement [`AllocationSolver`]:
//! 1. **Preemptive** -- strict lexicographic priority levels
//! 2. **Weighted** -- one weighted objective, proportional trade-offs
//! 3. **Minmax** -- Chebyshev balancing of the worst-off goal
//! 4. **Meta** -- discrete achievement tiers maximising total reward
//! 5. **Heuristic** -- deterministic bucket split, always succeeds
//!
//! [`facade::SolverFacade`] picks a strategy by [`SolverKind`], falls back to
//! the heuristic when a structured solver fails, and compares strategies.

pub mod facade;
pub mod graph;
pub mod heuristic;
pub mod meta;
pub mod minmax;
pub mod preemptive;
pub mod result;
pub mod weighted;

pub use facade::{SolverFacade, StrategyComparison, StrategyScore};
pub use graph::{GoalGraph, GoalKind, GoalSpec, PriorityLevel, Variable, VariableKind};
pub use result::{
    AllocationResult, DebtAllocation, GoalStatus, IntoAllocation, SolverKind, SolverMetrics,
};

use crate::model::{ConstraintModel, ScenarioParameters};
use crate::BudgetResult;

/// One problem instance: the model, the scenario knobs and the derived graph.
#[derive(Debug, Clone)]
pub struct AllocationProblem<'a> {
    pub model: &'a ConstraintModel,
    pub params: &'a ScenarioParameters,
    pub graph: GoalGraph,
}

impl<'a> AllocationProblem<'a> {
    pub fn new(model: &'a ConstraintModel, params: &'a ScenarioParameters) -> Self {
        Self {
            model,
            params,
            graph: GoalGraph::from_model(model, params),
        }
    }
}

/// A strategy turning a problem into per-item allocations.
pub trait AllocationSolver {
    /// Native result, mapped into [`AllocationResult`] by the facade.
    type Outcome: IntoAllocation;

    fn kind(&self) -> SolverKind;

    fn solve(&self, problem: &AllocationProblem<'_>) -> BudgetResult<Self::Outcome>;
}
