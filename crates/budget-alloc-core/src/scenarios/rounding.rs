//! Presentation rounding of a finished allocation.
//!
//! Hard obligations (mandatory categories, debt payments) are only ever
//! rounded up: to the next 100,000 above 100k, the next 10,000 above 10k,
//! otherwise to a whole unit. Goal and flexible amounts round to the nearest
//! whole unit within their bounds. If rounding pushes the total past income,
//! the overshoot is trimmed from flexible categories (least important first),
//! at most one unit from each. Goals are never trimmed, so the statuses and
//! score the solver reported still hold.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use crate::model::ConstraintModel;
use crate::solvers::AllocationResult;
use crate::types::*;

const LARGE_STEP: Money = dec!(100000);
const MEDIUM_STEP: Money = dec!(10000);
/// Largest cut the overshoot trim may take from one flexible category.
const TRIM_ALLOWANCE: Money = Decimal::ONE;

/// Round a hard obligation upwards.
pub fn round_obligation(amount: Money) -> Money {
    let step = if amount > LARGE_STEP {
        LARGE_STEP
    } else if amount > MEDIUM_STEP {
        MEDIUM_STEP
    } else {
        Decimal::ONE
    };
    (amount / step).ceil() * step
}

/// Round a discretionary amount to the nearest whole unit.
pub fn round_discretionary(amount: Money) -> Money {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Round `result` in place. Returns `false` and leaves `result` untouched when
/// the result is infeasible or the rounded amounts no longer fit inside income
/// after the flexible trim.
pub fn round_allocation(result: &mut AllocationResult, model: &ConstraintModel) -> bool {
    if !result.is_feasible {
        return false;
    }
    let mut rounded = result.clone();

    for (id, amount) in rounded.category_allocations.iter_mut() {
        if model.mandatory_expenses().contains_key(id) {
            *amount = round_obligation(*amount);
        } else if let Some(c) = model.flexible_expenses().get(id) {
            *amount = round_discretionary(*amount).min(c.maximum);
        }
    }
    for (id, debt) in rounded.debt_allocations.iter_mut() {
        let cap = model
            .debt_payments()
            .get(id)
            .map(|d| d.current_balance.max(d.minimum_payment))
            .unwrap_or(debt.total_payment);
        debt.total_payment = round_obligation(debt.total_payment).min(cap);
    }
    for (id, amount) in rounded.goal_allocations.iter_mut() {
        let cap = model
            .goal_targets()
            .get(id)
            .map(|g| g.remaining_amount)
            .unwrap_or(*amount);
        *amount = round_discretionary(*amount).min(cap);
    }
    rounded.recompute_totals(model);

    let mut overshoot = -rounded.surplus;
    if overshoot > Decimal::ZERO {
        let mut flexible: Vec<(&String, u32)> = model
            .flexible_expenses()
            .iter()
            .map(|(id, c)| (id, c.priority))
            .collect();
        flexible.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        for (id, _) in flexible {
            if overshoot <= Decimal::ZERO {
                break;
            }
            if let Some(amount) = rounded.category_allocations.get_mut(id) {
                let cut = overshoot.min(*amount).min(TRIM_ALLOWANCE);
                *amount -= cut;
                overshoot -= cut;
            }
        }
        rounded.recompute_totals(model);
    }

    if rounded.surplus < -MONEY_EPSILON {
        return false;
    }
    *result = rounded;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GoalTarget, GoalType, ScenarioParameters};
    use crate::solvers::{GoalStatus, SolverFacade};

    #[test]
    fn test_obligation_steps() {
        assert_eq!(round_obligation(dec!(1500.20)), dec!(1501));
        assert_eq!(round_obligation(dec!(10000)), dec!(10000));
        assert_eq!(round_obligation(dec!(12000)), dec!(20000));
        assert_eq!(round_obligation(dec!(150000)), dec!(200000));
    }

    #[test]
    fn test_discretionary_nearest() {
        assert_eq!(round_discretionary(dec!(99.5)), dec!(100));
        assert_eq!(round_discretionary(dec!(99.49)), dec!(99));
    }

    #[test]
    fn test_overshoot_trimmed_from_flexible_first() {
        let goal = GoalTarget {
            goal_name: "g".into(),
            goal_type: GoalType::Savings,
            suggested_contribution: dec!(300),
            remaining_amount: dec!(5000),
            priority_label: "x".into(),
            priority_weight: 10,
        };
        // spare 500.50: save 300, fun 200.50; rounding adds 0.40 + 0.50
        let model = ConstraintModel::builder(dec!(2000.10))
            .mandatory("rent", dec!(1499.60), 1)
            .goal("save", goal)
            .flexible("fun", dec!(0), dec!(401), 5)
            .build()
            .unwrap();
        let params = ScenarioParameters::default();
        let mut result = SolverFacade::new(params).unwrap().solve_preemptive(&model);
        assert!(round_allocation(&mut result, &model));
        assert_eq!(result.category_allocations["rent"], dec!(1500));
        assert_eq!(result.category_allocations["fun"], dec!(200.10));
        assert_eq!(result.goal_allocations["save"], dec!(300));
        assert_eq!(result.surplus, Decimal::ZERO);
    }

    fn emergency(suggested: Decimal) -> GoalTarget {
        GoalTarget {
            goal_name: "Emergency".into(),
            goal_type: GoalType::Emergency,
            suggested_contribution: suggested,
            remaining_amount: dec!(10000),
            priority_label: "high".into(),
            priority_weight: 1,
        }
    }

    #[test]
    fn test_large_step_overshoot_keeps_exact_amounts() {
        // rent 12000 rounds to 20000, far beyond what flexible can absorb
        let model = ConstraintModel::builder(dec!(20000))
            .mandatory("rent", dec!(12000), 1)
            .goal("ef", emergency(dec!(500)))
            .flexible("dining", dec!(0), dec!(1000), 5)
            .build()
            .unwrap();
        let params = ScenarioParameters::default();
        let mut result = SolverFacade::new(params).unwrap().solve_weighted(&model);
        let exact = result.clone();
        assert!(!round_allocation(&mut result, &model));
        assert_eq!(result, exact);
        assert_eq!(result.goal_allocations["ef"], dec!(500));
        assert_eq!(result.goal_status("ef"), Some(GoalStatus::Achieved));
    }

    #[test]
    fn test_goals_never_trimmed() {
        // spare 0.90 after rounding rent up; no flexible room left to trim
        let model = ConstraintModel::builder(dec!(1800.10))
            .mandatory("rent", dec!(1499.20), 1)
            .goal("ef", emergency(dec!(300.90)))
            .build()
            .unwrap();
        let params = ScenarioParameters::default();
        let mut result = SolverFacade::new(params).unwrap().solve_preemptive(&model);
        assert_eq!(result.goal_allocations["ef"], dec!(300.90));
        assert!(!round_allocation(&mut result, &model));
        assert_eq!(result.goal_allocations["ef"], dec!(300.90));
        assert_eq!(result.category_allocations["rent"], dec!(1499.20));
    }

    #[test]
    fn test_infeasible_result_left_exact() {
        let model = ConstraintModel::builder(dec!(12000))
            .mandatory("rent", dec!(12500), 1)
            .build()
            .unwrap();
        let params = ScenarioParameters::default();
        let mut result = SolverFacade::new(params).unwrap().solve_heuristic(&model);
        assert!(!round_allocation(&mut result, &model));
        assert_eq!(result.category_allocations["rent"], dec!(12500));
        assert_eq!(result.surplus, dec!(-500));
    }
}
