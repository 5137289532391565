use budget_alloc_core::feasibility::{check_feasibility, suggestions_for_deficit, SuggestionTarget};
use budget_alloc_core::model::{AllocationRequest, ConstraintModel, GoalTarget, GoalType, ScenarioParameters};
use budget_alloc_core::solvers::{SolverFacade, SolverKind, SolverMetrics};
use budget_alloc_core::BudgetError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn goal(goal_type: GoalType, suggested: Decimal, remaining: Decimal, weight: u32) -> GoalTarget {
    GoalTarget {
        goal_name: format!("{goal_type} goal"),
        goal_type,
        suggested_contribution: suggested,
        remaining_amount: remaining,
        priority_label: "medium".into(),
        priority_weight: weight,
    }
}

fn household() -> ConstraintModel {
    ConstraintModel::builder(dec!(3000))
        .mandatory("rent", dec!(1500), 1)
        .debt("card", dec!(100), dec!(3000), dec!(0.22))
        .debt("student", dec!(150), dec!(12000), dec!(0.04))
        .goal("ef", goal(GoalType::Emergency, dec!(400), dec!(6000), 10))
        .goal("vacation", goal(GoalType::Purchase, dec!(500), dec!(2500), 50))
        .flexible("dining", dec!(0), dec!(300), 4)
        .build()
        .unwrap()
}

fn facade() -> SolverFacade {
    SolverFacade::new(ScenarioParameters::default()).unwrap()
}

// ===========================================================================
// Feasibility
// ===========================================================================

#[test]
fn test_deficit_is_exact_shortfall() {
    // floor = 1800 + 250 + 200 = 2250 against 2000
    let model = ConstraintModel::builder(dec!(2000))
        .mandatory("rent", dec!(1800), 1)
        .debt("card", dec!(250), dec!(4000), dec!(0.2))
        .debt("auto", dec!(200), dec!(9000), dec!(0.07))
        .build()
        .unwrap();
    let f = check_feasibility(&model);
    assert!(!f.is_feasible);
    assert_eq!(f.deficit, dec!(250));
    assert_eq!(f.hard_floor, dec!(2250));

    let suggestions = suggestions_for_deficit(&model, f.deficit);
    assert_eq!(
        suggestions.last().map(|s| s.target.clone()),
        Some(SuggestionTarget::Income)
    );
    // advisory only
    assert_eq!(check_feasibility(&model), f);
}

#[test]
fn test_feasible_model_has_zero_deficit() {
    let f = check_feasibility(&household());
    assert!(f.is_feasible);
    assert_eq!(f.deficit, Decimal::ZERO);
    assert_eq!(f.available, dec!(1250));
}

// ===========================================================================
// Invariants shared by every strategy
// ===========================================================================

#[test]
fn test_allocations_stay_within_income() {
    let model = household();
    for kind in SolverKind::ALL {
        let result = facade().solve(&model, kind);
        assert!(result.is_feasible, "{kind}");
        assert!(
            result.total_allocated <= model.total_income() + dec!(0.01),
            "{kind} allocated {}",
            result.total_allocated
        );
        assert_eq!(result.surplus, model.total_income() - result.total_allocated);
    }
}

#[test]
fn test_debt_minimums_always_paid() {
    let model = household();
    for kind in SolverKind::ALL {
        let result = facade().solve(&model, kind);
        for (id, debt) in model.debt_payments() {
            let alloc = &result.debt_allocations[id];
            assert!(alloc.total_payment >= debt.minimum_payment, "{kind} {id}");
            assert_eq!(alloc.extra_payment, alloc.total_payment - alloc.minimum_payment);
            assert!(alloc.total_payment <= debt.current_balance);
        }
    }
}

#[test]
fn test_every_goal_is_classified_once() {
    let model = household();
    for kind in SolverKind::ALL {
        let result = facade().solve(&model, kind);
        let mut listed: Vec<String> = result
            .achieved_goals
            .iter()
            .chain(&result.partial_goals)
            .chain(&result.unachieved_goals)
            .cloned()
            .collect();
        listed.sort();
        assert_eq!(listed, vec!["ef".to_string(), "vacation".to_string()], "{kind}");
    }
}

// ===========================================================================
// Preemptive precedence
// ===========================================================================

#[test]
fn test_lower_priority_goal_does_not_change_higher_levels() {
    let base = household();
    let with_boat = ConstraintModel::builder(dec!(3000))
        .mandatory("rent", dec!(1500), 1)
        .debt("card", dec!(100), dec!(3000), dec!(0.22))
        .debt("student", dec!(150), dec!(12000), dec!(0.04))
        .goal("ef", goal(GoalType::Emergency, dec!(400), dec!(6000), 10))
        .goal("vacation", goal(GoalType::Purchase, dec!(500), dec!(2500), 50))
        .goal("boat", goal(GoalType::Purchase, dec!(2000), dec!(40000), 90))
        .flexible("dining", dec!(0), dec!(300), 4)
        .build()
        .unwrap();

    let a = facade().solve_preemptive(&base);
    let b = facade().solve_preemptive(&with_boat);
    assert_eq!(a.goal_allocations["ef"], b.goal_allocations["ef"]);
    assert_eq!(a.goal_allocations["vacation"], b.goal_allocations["vacation"]);
    assert_eq!(a.debt_allocations["card"], b.debt_allocations["card"]);
    // card is critical: total payment target min(3000, 2 x 100)
    assert_eq!(a.debt_allocations["card"].total_payment, dec!(200));
    assert_eq!(a.debt_allocations["card"].extra_payment, dec!(100));
    // student loan is low priority: minimum only
    assert_eq!(a.debt_allocations["student"].extra_payment, Decimal::ZERO);
}

// ===========================================================================
// Minmax balance
// ===========================================================================

#[test]
fn test_minmax_balances_identical_goals_at_half() {
    let mut builder = ConstraintModel::builder(dec!(1500)).mandatory("rent", dec!(1000), 1);
    for id in ["a", "b", "c", "d"] {
        builder = builder.goal(id, goal(GoalType::Savings, dec!(250), dec!(50000), 30));
    }
    let model = builder.build().unwrap();
    let result = facade().solve_minmax(&model);

    for id in ["a", "b", "c", "d"] {
        let funded = result.goal_allocations[id];
        assert!((funded - dec!(125)).abs() <= dec!(2.5), "{id} got {funded}");
    }
    match result.metrics {
        SolverMetrics::Minmax { is_balanced, .. } => assert!(is_balanced),
        other => panic!("unexpected metrics {other:?}"),
    }
}

// ===========================================================================
// Fallback
// ===========================================================================

#[test]
fn test_structured_solvers_fall_back_when_infeasible() {
    let model = ConstraintModel::builder(dec!(1000))
        .mandatory("rent", dec!(1100), 1)
        .goal("ef", goal(GoalType::Emergency, dec!(100), dec!(1000), 5))
        .build()
        .unwrap();
    for kind in [
        SolverKind::Preemptive,
        SolverKind::Weighted,
        SolverKind::Minmax,
        SolverKind::Meta,
    ] {
        let result = facade().solve(&model, kind);
        assert_eq!(result.solver_type, SolverKind::Heuristic);
        assert!(!result.is_feasible);
        assert_eq!(result.feasibility_score, Decimal::ZERO);
        assert_eq!(result.surplus, dec!(-100));
        assert_eq!(
            result.metrics,
            SolverMetrics::Heuristic {
                fallback_from: Some(kind),
                fallback_reason: result_reason(&result.metrics),
            }
        );
    }
}

fn result_reason(metrics: &SolverMetrics) -> Option<String> {
    match metrics {
        SolverMetrics::Heuristic { fallback_reason, .. } => fallback_reason.clone(),
        _ => None,
    }
}

// ===========================================================================
// Determinism
// ===========================================================================

#[test]
fn test_clone_solves_identically() {
    let model = household();
    let copy = model.clone();
    for kind in SolverKind::ALL {
        assert_eq!(facade().solve(&model, kind), facade().solve(&copy, kind));
    }
}

// ===========================================================================
// Request assembly
// ===========================================================================

#[test]
fn test_request_rejects_bad_period_and_income() {
    let mut request: AllocationRequest = serde_json::from_value(serde_json::json!({
        "period": { "year": 2026, "month": 13 },
        "total_income": "4000"
    }))
    .unwrap();
    match request.to_model() {
        Err(BudgetError::InvalidInput { field, .. }) => assert_eq!(field, "period.month"),
        other => panic!("expected invalid month, got {other:?}"),
    }

    request.period.month = 12;
    request.total_income = Decimal::ZERO;
    match ConstraintModel::from_request(&request) {
        Err(BudgetError::InvalidInput { field, .. }) => assert_eq!(field, "total_income"),
        other => panic!("expected invalid income, got {other:?}"),
    }
}
