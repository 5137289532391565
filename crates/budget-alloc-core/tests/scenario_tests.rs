use std::collections::BTreeMap;

use budget_alloc_core::model::{AllocationRequest, ConstraintModel, GoalTarget, GoalType};
use budget_alloc_core::scenarios::{
    generate_scenarios, ScenarioConfig, ScenarioType, WarningCategory, WarningSeverity,
};
use budget_alloc_core::solvers::{GoalStatus, SolverKind};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn request(income: &str) -> AllocationRequest {
    serde_json::from_value(serde_json::json!({
        "period": { "year": 2026, "month": 10 },
        "total_income": income,
        "mandatory": [
            { "category_id": "rent", "name": "Rent", "minimum": "1500", "priority": 1 }
        ],
        "debts": [
            { "debt_id": "credit_card", "minimum_payment": "150",
              "current_balance": "5000", "interest_rate": "0.18" }
        ],
        "goals": [
            { "goal_id": "emergency_fund", "goal_name": "Emergency Fund",
              "goal_type": "emergency", "suggested_contribution": "500",
              "remaining_amount": "10000", "priority_label": "high", "priority_weight": 1 }
        ]
    }))
    .unwrap()
}

// ===========================================================================
// End to end
// ===========================================================================

#[test]
fn test_standard_scenarios_end_to_end() {
    let req = request("5000");
    let model = ConstraintModel::from_request(&req).unwrap();
    let out = generate_scenarios(&model, &req.display_names(), &ScenarioConfig::standard()).unwrap();
    let scenarios = &out.result.scenarios;

    let kinds: Vec<ScenarioType> = scenarios.iter().map(|s| s.scenario_type).collect();
    assert_eq!(
        kinds,
        vec![
            ScenarioType::Conservative,
            ScenarioType::Balanced,
            ScenarioType::Aggressive
        ]
    );
    assert!(scenarios.iter().all(|s| s.is_feasible));
    assert!(out.result.feasibility.is_feasible);

    let conservative = &scenarios[0];
    let aggressive = &scenarios[2];
    assert!(conservative.summary.goal_total <= aggressive.summary.goal_total);
    // 0.5 x 500 and 1.5 x 500
    assert_eq!(conservative.result.goal_allocations["emergency_fund"], dec!(250));
    assert_eq!(aggressive.result.goal_allocations["emergency_fund"], dec!(750));

    for s in scenarios {
        assert_eq!(s.result.solver_type, s.solver);
        assert_eq!(s.result.category_allocations["rent"], dec!(1500));
        assert!(s.result.debt_allocations["credit_card"].total_payment >= dec!(150));
        assert!(s.result.total_allocated <= dec!(5000));
        // 18% card
        assert!(s
            .warnings
            .iter()
            .any(|w| w.category == WarningCategory::HighInterestDebt));
        let rent = s
            .summary
            .categories
            .iter()
            .find(|l| l.category_id == "rent")
            .unwrap();
        assert_eq!(rent.name, "Rent");
    }
    assert!(out.warnings.is_empty());
}

#[test]
fn test_summary_savings_rate() {
    let req = request("5000");
    let model = req.to_model().unwrap();
    let out = generate_scenarios(&model, &BTreeMap::new(), &ScenarioConfig::standard()).unwrap();
    for s in &out.result.scenarios {
        let expected = ((s.summary.goal_total + s.summary.debt_extra_total) / dec!(5000)).round_dp(4);
        assert_eq!(s.summary.savings_rate, expected);
        assert_eq!(
            s.summary.mandatory_total
                + s.summary.flexible_total
                + s.summary.debt_minimum_total
                + s.summary.debt_extra_total
                + s.summary.goal_total
                + s.summary.surplus,
            dec!(5000)
        );
    }
}

// ===========================================================================
// Rounding
// ===========================================================================

fn emergency(suggested: Decimal) -> GoalTarget {
    GoalTarget {
        goal_name: "Emergency Fund".into(),
        goal_type: GoalType::Emergency,
        suggested_contribution: suggested,
        remaining_amount: dec!(50000),
        priority_label: "high".into(),
        priority_weight: 1,
    }
}

#[test]
fn test_large_obligations_round_to_ten_thousand_and_hundred_thousand_steps() {
    let model = ConstraintModel::builder(dec!(300000))
        .mandatory("rent", dec!(120000), 1)
        .debt("loan", dec!(12000), dec!(500000), dec!(0.04))
        .goal("ef", emergency(dec!(1000)))
        .build()
        .unwrap();
    let out = generate_scenarios(&model, &BTreeMap::new(), &ScenarioConfig::standard()).unwrap();

    let expected_ef = [dec!(500), dec!(1000), dec!(1500)];
    for (s, ef) in out.result.scenarios.iter().zip(expected_ef) {
        assert!(s.is_feasible);
        assert_eq!(s.result.category_allocations["rent"], dec!(200000));
        assert_eq!(s.result.debt_allocations["loan"].total_payment, dec!(20000));
        assert_eq!(s.result.debt_allocations["loan"].extra_payment, dec!(8000));
        assert_eq!(s.result.goal_allocations["ef"], ef);
        assert_eq!(s.result.surplus, dec!(80000) - ef);
        assert!(s
            .warnings
            .iter()
            .all(|w| w.category != WarningCategory::Rounding));
    }
}

#[test]
fn test_rounding_that_cannot_fit_keeps_exact_goal_funding() {
    // rent 12000 rounds up to 20000, leaving nothing for the goal
    let model = ConstraintModel::builder(dec!(20000))
        .mandatory("rent", dec!(12000), 1)
        .goal("ef", emergency(dec!(500)))
        .flexible("dining", dec!(0), dec!(1000), 5)
        .build()
        .unwrap();
    let out = generate_scenarios(&model, &BTreeMap::new(), &ScenarioConfig::standard()).unwrap();

    let expected_ef = [dec!(250), dec!(500), dec!(750)];
    for (s, ef) in out.result.scenarios.iter().zip(expected_ef) {
        assert!(s.is_feasible);
        assert_eq!(s.result.category_allocations["rent"], dec!(12000));
        assert_eq!(s.result.goal_allocations["ef"], ef);
        assert_eq!(s.result.goal_status("ef"), Some(GoalStatus::Achieved));
        assert!(s.result.surplus >= Decimal::ZERO);
        let rounding = s
            .warnings
            .iter()
            .find(|w| w.category == WarningCategory::Rounding)
            .unwrap();
        assert_eq!(rounding.severity, WarningSeverity::Info);
    }
}

#[test]
fn test_infeasible_large_floor_is_not_rounded() {
    let model = ConstraintModel::builder(dec!(12000))
        .mandatory("rent", dec!(12500), 1)
        .build()
        .unwrap();
    let out = generate_scenarios(&model, &BTreeMap::new(), &ScenarioConfig::standard()).unwrap();
    let deficit = out.result.feasibility.deficit;
    assert_eq!(deficit, dec!(500));

    for s in &out.result.scenarios {
        assert_eq!(s.result.category_allocations["rent"], dec!(12500));
        assert_eq!(s.result.surplus, -deficit);
        assert!(s
            .warnings
            .iter()
            .all(|w| w.category != WarningCategory::Rounding));
    }
}

// ===========================================================================
// Infeasible models
// ===========================================================================

#[test]
fn test_infeasible_request_flags_every_scenario() {
    let req = request("1500");
    let model = req.to_model().unwrap();
    let out = generate_scenarios(&model, &req.display_names(), &ScenarioConfig::standard()).unwrap();

    assert_eq!(out.result.feasibility.deficit, dec!(150));
    assert!(!out.warnings.is_empty());
    for s in &out.result.scenarios {
        assert!(!s.is_feasible);
        assert_eq!(s.result.feasibility_score, Decimal::ZERO);
        assert_eq!(s.result.solver_type, SolverKind::Heuristic);
        assert_eq!(s.result.surplus, dec!(-150));
        assert_eq!(s.result.goal_allocations["emergency_fund"], Decimal::ZERO);

        let first = &s.warnings[0];
        assert_eq!(first.severity, WarningSeverity::Critical);
        assert_eq!(first.category, WarningCategory::Infeasible);
        assert!(!first.suggestions.is_empty());
    }
}

#[test]
fn test_simplified_config() {
    let req = request("5000");
    let model = req.to_model().unwrap();
    let out = generate_scenarios(&model, &BTreeMap::new(), &ScenarioConfig::simplified()).unwrap();
    let kinds: Vec<ScenarioType> = out.result.scenarios.iter().map(|s| s.scenario_type).collect();
    assert_eq!(kinds, vec![ScenarioType::Safe, ScenarioType::Balanced]);
}
