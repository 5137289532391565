//! Variable / goal graph shared by the goal-programming solvers.
//!
//! Every category, debt and savings goal becomes a bounded variable:
//!
//! | Source      | Bounds                               |
//! |-------------|--------------------------------------|
//! | mandatory   | `[minimum, minimum]`                 |
//! | flexible    | `[0, maximum]`                       |
//! | debt        | `[minimum_payment, current_balance]` |
//! | savings goal| `[0, remaining_amount]`              |
//!
//! Hard goals (mandatory `exactly`, debt minimum `at_least`) are satisfied by
//! funding lower bounds. Soft goals are `at_least` targets that the solvers
//! compete over; flexible categories also carry an `at_most` ceiling.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::BudgetError;
use crate::model::{ConstraintModel, DebtPriority, ScenarioParameters};
use crate::types::*;
use crate::BudgetResult;

/// Extra-payment target for a debt, as a multiple of its minimum payment.
pub const DEBT_ACCELERATION_MULTIPLE: Decimal = dec!(2);

/// Weight of a flexible-spending goal; always below savings and debt goals.
const FLEXIBLE_WEIGHT: Decimal = dec!(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Mandatory,
    Flexible,
    Debt,
    Goal,
}

/// A bounded decision variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: String,
    pub kind: VariableKind,
    pub lower: Money,
    pub upper: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    AtLeast,
    AtMost,
    Exactly,
}

/// Preemptive priority levels, most important first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Mandatory,
    DebtMinimum,
    EmergencyFund,
    DebtExtra,
    Goals,
    Flexible,
}

impl PriorityLevel {
    /// Levels that compete for the surplus, in precedence order.
    pub const SOFT: [PriorityLevel; 4] = [
        PriorityLevel::EmergencyFund,
        PriorityLevel::DebtExtra,
        PriorityLevel::Goals,
        PriorityLevel::Flexible,
    ];

    pub fn is_hard(self) -> bool {
        matches!(self, PriorityLevel::Mandatory | PriorityLevel::DebtMinimum)
    }
}

impl std::fmt::Display for PriorityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriorityLevel::Mandatory => write!(f, "mandatory"),
            PriorityLevel::DebtMinimum => write!(f, "debt_minimum"),
            PriorityLevel::EmergencyFund => write!(f, "emergency_fund"),
            PriorityLevel::DebtExtra => write!(f, "debt_extra"),
            PriorityLevel::Goals => write!(f, "goals"),
            PriorityLevel::Flexible => write!(f, "flexible"),
        }
    }
}

/// A target on one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalSpec {
    /// Index into [`GoalGraph::variables`].
    pub variable: usize,
    pub kind: GoalKind,
    pub target: Money,
    pub weight: Decimal,
    pub level: PriorityLevel,
    /// Ordering inside a level (goal priority weight, debt rank or category
    /// priority); lower comes first.
    pub rank: u32,
    pub emergency: bool,
}

impl GoalSpec {
    /// Distance from the target in the direction the goal cares about.
    pub fn deviation(&self, value: Money) -> Money {
        match self.kind {
            GoalKind::AtLeast => (self.target - value).max(Decimal::ZERO),
            GoalKind::AtMost => (value - self.target).max(Decimal::ZERO),
            GoalKind::Exactly => (value - self.target).abs(),
        }
    }

    /// Soft goals are the `at_least` targets above the hard floors.
    pub fn is_soft(&self) -> bool {
        !self.level.is_hard() && self.kind == GoalKind::AtLeast
    }
}

/// The full variable/goal graph for one problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalGraph {
    pub income: Money,
    pub variables: Vec<Variable>,
    pub goals: Vec<GoalSpec>,
}

impl GoalGraph {
    pub fn from_model(model: &ConstraintModel, params: &ScenarioParameters) -> Self {
        let mut graph = GoalGraph {
            income: model.total_income(),
            variables: Vec::new(),
            goals: Vec::new(),
        };

        for (id, c) in model.mandatory_expenses() {
            let v = graph.push_variable(id, VariableKind::Mandatory, c.minimum, c.minimum);
            graph.goals.push(GoalSpec {
                variable: v,
                kind: GoalKind::Exactly,
                target: c.minimum,
                weight: dec!(1000),
                level: PriorityLevel::Mandatory,
                rank: c.priority,
                emergency: false,
            });
        }

        for (id, d) in model.debt_payments() {
            let v = graph.push_variable(
                id,
                VariableKind::Debt,
                d.minimum_payment,
                d.current_balance,
            );
            graph.goals.push(GoalSpec {
                variable: v,
                kind: GoalKind::AtLeast,
                target: d.minimum_payment,
                weight: dec!(1000),
                level: PriorityLevel::DebtMinimum,
                rank: u32::from(d.priority().rank()),
                emergency: false,
            });
            if d.priority() != DebtPriority::Low && d.extra_headroom() > MONEY_EPSILON {
                let target = (d.minimum_payment * DEBT_ACCELERATION_MULTIPLE).min(d.current_balance);
                graph.goals.push(GoalSpec {
                    variable: v,
                    kind: GoalKind::AtLeast,
                    target,
                    weight: debt_extra_weight(d.priority()),
                    level: PriorityLevel::DebtExtra,
                    rank: u32::from(d.priority().rank()),
                    emergency: false,
                });
            }
        }

        for (id, g) in model.goal_targets() {
            let v = graph.push_variable(id, VariableKind::Goal, Decimal::ZERO, g.remaining_amount);
            graph.goals.push(GoalSpec {
                variable: v,
                kind: GoalKind::AtLeast,
                target: g.desired_contribution(params.goal_contribution_factor),
                weight: g.importance(),
                level: if g.is_emergency() {
                    PriorityLevel::EmergencyFund
                } else {
                    PriorityLevel::Goals
                },
                rank: g.priority_weight,
                emergency: g.is_emergency(),
            });
        }

        for (id, c) in model.flexible_expenses() {
            let v = graph.push_variable(id, VariableKind::Flexible, Decimal::ZERO, c.maximum);
            let target = (c.minimum + (c.maximum - c.minimum) * params.flexible_spending_level)
                .round_dp(2)
                .min(c.maximum);
            graph.goals.push(GoalSpec {
                variable: v,
                kind: GoalKind::AtLeast,
                target,
                weight: FLEXIBLE_WEIGHT,
                level: PriorityLevel::Flexible,
                rank: c.priority,
                emergency: false,
            });
            graph.goals.push(GoalSpec {
                variable: v,
                kind: GoalKind::AtMost,
                target: c.maximum,
                weight: FLEXIBLE_WEIGHT,
                level: PriorityLevel::Flexible,
                rank: c.priority,
                emergency: false,
            });
        }

        graph
    }

    fn push_variable(&mut self, id: &str, kind: VariableKind, lower: Money, upper: Money) -> usize {
        self.variables.push(Variable {
            id: id.to_string(),
            kind,
            lower,
            upper,
        });
        self.variables.len() - 1
    }

    /// Reject dangling variable references and inverted bounds.
    pub fn check_references(&self) -> BudgetResult<()> {
        for v in &self.variables {
            if v.lower > v.upper {
                return Err(BudgetError::SolverFailure {
                    solver: "graph".into(),
                    reason: format!("variable '{}' has lower bound above upper bound", v.id),
                });
            }
        }
        for (i, g) in self.goals.iter().enumerate() {
            if g.variable >= self.variables.len() {
                return Err(BudgetError::SolverFailure {
                    solver: "graph".into(),
                    reason: format!("goal #{i} references missing variable {}", g.variable),
                });
            }
            if g.weight <= Decimal::ZERO {
                return Err(BudgetError::SolverFailure {
                    solver: "graph".into(),
                    reason: format!("goal #{i} has non-positive weight"),
                });
            }
        }
        Ok(())
    }

    pub fn lower_bound_total(&self) -> Money {
        self.variables.iter().map(|v| v.lower).sum()
    }

    /// Every variable at its lower bound.
    pub fn initial_values(&self) -> Vec<Money> {
        self.variables.iter().map(|v| v.lower).collect()
    }

    /// Budget left after funding every lower bound.
    ///
    /// Fails when the graph is malformed or the hard floors exceed income;
    /// both cases are handled by the heuristic fallback.
    pub fn starting_budget(&self) -> BudgetResult<Money> {
        self.check_references()?;
        let remaining = self.income - self.lower_bound_total();
        if remaining < -MONEY_EPSILON {
            return Err(BudgetError::FinancialImpossibility(format!(
                "hard floors exceed income by {}",
                (-remaining).round_dp(2)
            )));
        }
        Ok(remaining.max(Decimal::ZERO))
    }

    /// Indices of the soft goals.
    pub fn soft_goals(&self) -> Vec<usize> {
        self.goals
            .iter()
            .enumerate()
            .filter(|(_, g)| g.is_soft())
            .map(|(i, _)| i)
            .collect()
    }

    /// Effective target of a soft goal, clipped to its variable's bounds.
    pub fn effective_target(&self, goal: usize) -> Money {
        let g = &self.goals[goal];
        let v = &self.variables[g.variable];
        g.target.min(v.upper).max(v.lower)
    }

    /// Size of the goal above its variable's lower bound.
    pub fn extent(&self, goal: usize) -> Money {
        let g = &self.goals[goal];
        self.effective_target(goal) - self.variables[g.variable].lower
    }

    /// Amount still needed to reach the goal.
    pub fn need(&self, goal: usize, values: &[Money]) -> Money {
        let g = &self.goals[goal];
        (self.effective_target(goal) - values[g.variable]).max(Decimal::ZERO)
    }

    /// Achievement of a soft goal on a 0..=100 scale, measured above the
    /// variable's lower bound.
    pub fn achievement(&self, goal: usize, values: &[Money]) -> Percent {
        let g = &self.goals[goal];
        let lower = self.variables[g.variable].lower;
        percent_of(values[g.variable] - lower, self.extent(goal))
    }

    /// The soft goal attached to a variable, if any.
    pub fn soft_goal_for(&self, variable: usize) -> Option<usize> {
        self.goals
            .iter()
            .position(|g| g.variable == variable && g.is_soft())
    }
}

fn debt_extra_weight(priority: DebtPriority) -> Decimal {
    match priority {
        DebtPriority::Critical => dec!(90),
        DebtPriority::High => dec!(70),
        DebtPriority::Medium => dec!(40),
        DebtPriority::Low => dec!(10),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GoalTarget, GoalType};
    use rust_decimal_macros::dec;

    fn model() -> ConstraintModel {
        ConstraintModel::builder(dec!(5000))
            .mandatory("rent", dec!(1500), 1)
            .flexible("dining", dec!(100), dec!(300), 4)
            .debt("card", dec!(150), dec!(5000), dec!(0.18))
            .debt("mortgage", dec!(900), dec!(200000), dec!(0.03))
            .goal(
                "ef",
                GoalTarget {
                    goal_name: "Emergency".into(),
                    goal_type: GoalType::Emergency,
                    suggested_contribution: dec!(500),
                    remaining_amount: dec!(10000),
                    priority_label: "high".into(),
                    priority_weight: 1,
                },
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_graph_shape() {
        let graph = GoalGraph::from_model(&model(), &ScenarioParameters::default());
        assert_eq!(graph.variables.len(), 5);
        assert!(graph.check_references().is_ok());
        // rent + card min + mortgage min
        assert_eq!(graph.lower_bound_total(), dec!(2550));
        // low-rate mortgage gets no extra-payment goal
        let extra: Vec<_> = graph
            .goals
            .iter()
            .filter(|g| g.level == PriorityLevel::DebtExtra)
            .collect();
        assert_eq!(extra.len(), 1);
        assert_eq!(extra[0].target, dec!(300));
    }

    #[test]
    fn test_flexible_target_uses_spending_level() {
        let params = ScenarioParameters {
            flexible_spending_level: dec!(0.5),
            ..Default::default()
        };
        let graph = GoalGraph::from_model(&model(), &params);
        let flex = graph
            .goals
            .iter()
            .find(|g| g.level == PriorityLevel::Flexible && g.kind == GoalKind::AtLeast)
            .unwrap();
        assert_eq!(flex.target, dec!(200));
    }

    #[test]
    fn test_infeasible_starting_budget_errors() {
        let m = model().with_income(dec!(1000)).unwrap();
        let graph = GoalGraph::from_model(&m, &ScenarioParameters::default());
        assert!(matches!(
            graph.starting_budget(),
            Err(BudgetError::FinancialImpossibility(_))
        ));
    }

    #[test]
    fn test_dangling_reference_detected() {
        let mut graph = GoalGraph::from_model(&model(), &ScenarioParameters::default());
        graph.goals[0].variable = 99;
        assert!(matches!(
            graph.check_references(),
            Err(BudgetError::SolverFailure { .. })
        ));
    }

    #[test]
    fn test_debt_extra_achievement_measured_above_minimum() {
        let graph = GoalGraph::from_model(&model(), &ScenarioParameters::default());
        let values = graph.initial_values();
        let extra = graph
            .goals
            .iter()
            .position(|g| g.level == PriorityLevel::DebtExtra)
            .unwrap();
        assert_eq!(graph.achievement(extra, &values), Decimal::ZERO);
        assert_eq!(graph.need(extra, &values), dec!(150));
    }
}
