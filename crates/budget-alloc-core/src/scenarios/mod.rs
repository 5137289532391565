//! Scenario generation.
//!
//! Covers:
//! 1. **Presets** -- named parameter sets paired with a strategy
//! 2. **Generation** -- one allocation per preset, optionally rounded
//! 3. **Warnings** -- advisory and critical findings per scenario
//! 4. **Summary** -- bucket totals, savings rate and per-category lines

pub mod presets;
pub mod rounding;
pub mod summary;
pub mod warnings;

pub use presets::{ScenarioConfig, ScenarioPreset, ScenarioType};
pub use summary::{CategoryLine, ScenarioSummary};
pub use warnings::{advisory_warnings, ScenarioWarning, WarningCategory, WarningSeverity};

use std::collections::BTreeMap;
use std::time::Instant;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::feasibility::{check_feasibility, suggestions_for_deficit, Feasibility};
use crate::model::{ConstraintModel, ScenarioParameters};
use crate::solvers::{AllocationResult, SolverFacade, SolverKind, SolverMetrics};
use crate::types::*;
use crate::BudgetResult;

/// One generated scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationScenario {
    pub scenario_type: ScenarioType,
    /// Strategy the preset asked for; `result.solver_type` says what ran.
    pub solver: SolverKind,
    pub parameters: ScenarioParameters,
    pub result: AllocationResult,
    pub warnings: Vec<ScenarioWarning>,
    pub summary: ScenarioSummary,
    pub is_feasible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOutput {
    pub scenarios: Vec<AllocationScenario>,
    pub feasibility: Feasibility,
}

/// Produce one scenario per preset in `config`.
///
/// An infeasible model still yields every scenario: a best-effort
/// mandatory-first allocation with score 0 and a critical warning carrying
/// the deficit suggestions.
pub fn generate_scenarios(
    model: &ConstraintModel,
    category_names: &BTreeMap<String, String>,
    config: &ScenarioConfig,
) -> BudgetResult<ComputationOutput<ScenarioOutput>> {
    let start = Instant::now();
    config.validate()?;

    let feasibility = check_feasibility(model);
    let mut envelope_warnings: Vec<String> = Vec::new();
    if !feasibility.is_feasible {
        envelope_warnings.push(format!(
            "Hard floor {} exceeds income {} by {}",
            feasibility.hard_floor,
            model.total_income(),
            feasibility.deficit
        ));
    }

    let mut scenarios = Vec::with_capacity(config.presets.len());
    for preset in &config.presets {
        let scenario = build_scenario(model, category_names, preset, &feasibility)?;
        if let SolverMetrics::Heuristic {
            fallback_from: Some(from),
            ..
        } = &scenario.result.metrics
        {
            envelope_warnings.push(format!(
                "{}: {from} replaced by the heuristic",
                scenario.scenario_type
            ));
        }
        info!(
            event = "scenario_generated",
            scenario = %scenario.scenario_type,
            solver = %scenario.result.solver_type,
            feasible = scenario.is_feasible,
            score = %scenario.result.feasibility_score,
            goal_total = %scenario.summary.goal_total,
            warnings = scenario.warnings.len(),
        );
        scenarios.push(scenario);
    }

    let output = ScenarioOutput {
        scenarios,
        feasibility,
    };
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Goal programming scenario generation",
        &serde_json::json!({
            "presets": config
                .presets
                .iter()
                .map(|p| serde_json::json!({
                    "scenario": p.scenario_type.to_string(),
                    "solver": p.solver.to_string(),
                    "goal_contribution_factor": p.parameters.goal_contribution_factor.to_string(),
                    "flexible_spending_level": p.parameters.flexible_spending_level.to_string(),
                    "rounded": p.round_outputs,
                }))
                .collect::<Vec<_>>(),
        }),
        envelope_warnings,
        elapsed,
        output,
    ))
}

fn build_scenario(
    model: &ConstraintModel,
    category_names: &BTreeMap<String, String>,
    preset: &ScenarioPreset,
    feasibility: &Feasibility,
) -> BudgetResult<AllocationScenario> {
    let facade = SolverFacade::new(preset.parameters.clone())?;
    let mut result = facade.solve(model, preset.solver);
    let mut warnings = Vec::new();

    // infeasible allocations stay exact so the surplus equals the deficit
    if preset.round_outputs
        && feasibility.is_feasible
        && !rounding::round_allocation(&mut result, model)
    {
        warnings.push(ScenarioWarning::rounding_skipped());
    }

    let summary = ScenarioSummary::build(model, &result, category_names);
    let is_feasible = feasibility.is_feasible && result.is_feasible;
    if feasibility.is_feasible {
        warnings.extend(advisory_warnings(
            model,
            summary.savings_rate,
            summary.surplus,
        ));
    } else {
        result.feasibility_score = Decimal::ZERO;
        warnings.insert(
            0,
            ScenarioWarning::infeasible(
                feasibility.deficit,
                suggestions_for_deficit(model, feasibility.deficit),
            ),
        );
    }

    Ok(AllocationScenario {
        scenario_type: preset.scenario_type,
        solver: preset.solver,
        parameters: preset.parameters.clone(),
        result,
        warnings,
        summary,
        is_feasible,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GoalTarget, GoalType};
    use rust_decimal_macros::dec;

    fn emergency() -> GoalTarget {
        GoalTarget {
            goal_name: "Emergency Fund".into(),
            goal_type: GoalType::Emergency,
            suggested_contribution: dec!(500),
            remaining_amount: dec!(10000),
            priority_label: "high".into(),
            priority_weight: 10,
        }
    }

    #[test]
    fn test_infeasible_scenarios_score_zero_with_critical_warning() {
        let model = ConstraintModel::builder(dec!(1000))
            .mandatory("rent", dec!(1100), 1)
            .debt("card", dec!(100), dec!(3000), dec!(0.2))
            .goal("ef", emergency())
            .build()
            .unwrap();
        let out = generate_scenarios(&model, &BTreeMap::new(), &ScenarioConfig::standard()).unwrap();
        assert!(!out.result.feasibility.is_feasible);
        assert_eq!(out.result.feasibility.deficit, dec!(200));
        for s in &out.result.scenarios {
            assert!(!s.is_feasible);
            assert_eq!(s.result.feasibility_score, Decimal::ZERO);
            assert!(s.result.surplus < Decimal::ZERO);
            let critical = &s.warnings[0];
            assert_eq!(critical.severity, WarningSeverity::Critical);
            assert!(!critical.suggestions.is_empty());
        }
    }

    #[test]
    fn test_summary_uses_display_names() {
        let model = ConstraintModel::builder(dec!(4000))
            .mandatory("rent", dec!(1000), 1)
            .flexible("dining", dec!(0), dec!(200), 4)
            .goal("ef", emergency())
            .build()
            .unwrap();
        let names = BTreeMap::from([("rent".to_string(), "Rent".to_string())]);
        let out = generate_scenarios(&model, &names, &ScenarioConfig::simplified()).unwrap();
        let summary = &out.result.scenarios[0].summary;
        let rent = summary
            .categories
            .iter()
            .find(|l| l.category_id == "rent")
            .unwrap();
        assert_eq!(rent.name, "Rent");
        assert_eq!(rent.share, dec!(0.25));
        let dining = summary
            .categories
            .iter()
            .find(|l| l.category_id == "dining")
            .unwrap();
        assert_eq!(dining.name, "dining");
    }

    #[test]
    fn test_empty_config_rejected() {
        let model = ConstraintModel::builder(dec!(1000)).build().unwrap();
        let config = ScenarioConfig { presets: vec![] };
        assert!(generate_scenarios(&model, &BTreeMap::new(), &config).is_err());
    }
}
