use budget_alloc_core::model::{ConstraintModel, GoalTarget, GoalType};
use budget_alloc_core::sensitivity::{analyze_sensitivity, RiskLevel, SensitivityConfig};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn goal(goal_type: GoalType, suggested: Decimal, weight: u32) -> GoalTarget {
    GoalTarget {
        goal_name: format!("{goal_type}"),
        goal_type,
        suggested_contribution: suggested,
        remaining_amount: dec!(30000),
        priority_label: "medium".into(),
        priority_weight: weight,
    }
}

/// Spare income of 750 against 1050 of soft demand.
fn tight_budget() -> ConstraintModel {
    ConstraintModel::builder(dec!(3000))
        .mandatory("rent", dec!(1800), 1)
        .mandatory("utilities", dec!(250), 2)
        .debt("card", dec!(200), dec!(4000), dec!(0.19))
        .goal("ef", goal(GoalType::Emergency, dec!(300), 5))
        .goal("car", goal(GoalType::Purchase, dec!(400), 40))
        .flexible("dining", dec!(50), dec!(250), 4)
        .build()
        .unwrap()
}

// ===========================================================================
// Income sweep
// ===========================================================================

#[test]
fn test_income_rise_never_funds_less_than_income_cut() {
    let report = analyze_sensitivity(&tight_budget(), &SensitivityConfig::default())
        .unwrap()
        .result;
    let at = |change: Decimal| {
        report
            .income
            .iter()
            .find(|i| i.change == change)
            .unwrap()
    };
    let down = at(dec!(-0.20));
    let up = at(dec!(0.20));

    assert_eq!(up.new_income, dec!(3600));
    assert_eq!(down.new_income, dec!(2400));
    assert!(up.allocation.goal_total() >= down.allocation.goal_total());
    assert!(
        up.allocation.category_allocations["dining"] >= down.allocation.category_allocations["dining"]
    );
    assert!(up.goal_delta >= Decimal::ZERO);
}

#[test]
fn test_deep_income_cut_breaks_feasibility() {
    // floor 2250; -0.20 leaves 2400, -0.30 leaves 2100
    let config = SensitivityConfig {
        income_changes: vec![dec!(-0.30)],
        ..SensitivityConfig::default()
    };
    let report = analyze_sensitivity(&tight_budget(), &config).unwrap().result;
    let cut = &report.income[0];
    assert!(!cut.is_feasible);
    assert!(cut.recommendation.contains("2250"));
    assert!(report.risk_factors.income_sensitive);
    assert_eq!(report.income_break_even_point, dec!(2250));
}

// ===========================================================================
// Overall risk
// ===========================================================================

#[test]
fn test_fragile_budget_is_high_risk() {
    let report = analyze_sensitivity(&tight_budget(), &SensitivityConfig::default())
        .unwrap()
        .result;
    // +3 income, +2 card turns critical at 21%, +2 thin surplus
    assert!(report.risk_factors.high_risk_debt);
    assert!(report.risk_factors.thin_surplus);
    assert!(report.risk_factors.income_sensitive);
    assert_eq!(report.risk_score, 7);
    assert_eq!(report.overall_risk, RiskLevel::High);
    assert!(!report.recommendations.is_empty());
}

#[test]
fn test_comfortable_budget_is_low_risk() {
    let model = ConstraintModel::builder(dec!(10000))
        .mandatory("rent", dec!(2000), 1)
        .debt("mortgage", dec!(500), dec!(200000), dec!(0.12))
        .goal("ef", goal(GoalType::Emergency, dec!(300), 5))
        .build()
        .unwrap();
    let out = analyze_sensitivity(&model, &SensitivityConfig::default()).unwrap();
    let report = out.result;
    assert_eq!(report.risk_score, 0);
    assert_eq!(report.overall_risk, RiskLevel::Low);
    assert!(report.interest.iter().all(|i| !i.strategy_change_needed));
    assert_eq!(
        report.recommendations,
        vec!["The allocation is resilient to the tested changes".to_string()]
    );
    assert!(out.warnings.is_empty());
}
