//! Sensitivity analysis of an allocation.
//!
//! Covers:
//! 1. **Income** -- relative income changes and their effect on every bucket
//! 2. **Interest rates** -- rate shocks per debt, extra interest and priority shifts
//! 3. **Goal priority** -- weight nudges per non-emergency goal
//! 4. **Risk** -- additive risk score, level and recommendations
//!
//! Every sweep solves a deep clone of the model; the input is never changed.

pub mod income;
pub mod interest;
pub mod priority;
pub mod risk;

pub use income::IncomeImpact;
pub use interest::InterestImpact;
pub use priority::{PriorityImpact, PrioritySensitivity};
pub use risk::{RiskFactors, RiskLevel};

use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::BudgetError;
use crate::model::ConstraintModel;
use crate::scenarios::{rounding, ScenarioPreset};
use crate::solvers::{AllocationResult, SolverFacade, SolverKind};
use crate::types::*;
use crate::BudgetResult;

/// Sweeps to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityConfig {
    /// Relative income changes, e.g. -0.10.
    pub income_changes: Vec<Rate>,
    /// Absolute rate increases applied to each debt.
    pub rate_shocks: Vec<Rate>,
    /// Priority-weight nudge for each goal.
    pub priority_step: u32,
    /// Preset the baseline and every sweep are solved with, rounding included.
    pub baseline: ScenarioPreset,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            income_changes: vec![dec!(-0.20), dec!(-0.10), dec!(0.10), dec!(0.20)],
            rate_shocks: vec![dec!(0.02), dec!(0.05)],
            priority_step: 10,
            baseline: ScenarioPreset::balanced(),
        }
    }
}

impl SensitivityConfig {
    pub fn validate(&self) -> BudgetResult<()> {
        for (i, change) in self.income_changes.iter().enumerate() {
            if *change <= dec!(-1) {
                return Err(BudgetError::invalid(
                    format!("income_changes[{i}]"),
                    "Income change must be greater than -100%",
                ));
            }
        }
        for (i, shock) in self.rate_shocks.iter().enumerate() {
            if *shock < Decimal::ZERO || *shock > Decimal::ONE {
                return Err(BudgetError::invalid(
                    format!("rate_shocks[{i}]"),
                    "Rate shock must be between 0 and 1",
                ));
            }
        }
        if self.priority_step == 0 || self.priority_step > 98 {
            return Err(BudgetError::invalid(
                "priority_step",
                "Priority step must be between 1 and 98",
            ));
        }
        self.baseline.parameters.validate()
    }
}

/// Solves models the way a scenario built from `preset` would.
pub(crate) struct PresetRunner<'a> {
    facade: SolverFacade,
    preset: &'a ScenarioPreset,
}

impl<'a> PresetRunner<'a> {
    pub(crate) fn new(preset: &'a ScenarioPreset) -> BudgetResult<Self> {
        Ok(Self {
            facade: SolverFacade::new(preset.parameters.clone())?,
            preset,
        })
    }

    pub(crate) fn solver(&self) -> SolverKind {
        self.preset.solver
    }

    /// Solve and, when the preset asks for it, round. The flag is `false`
    /// when rounding was requested but the exact amounts had to be kept.
    pub(crate) fn solve_checked(&self, model: &ConstraintModel) -> (AllocationResult, bool) {
        let mut result = self.facade.solve(model, self.preset.solver);
        let rounded = !self.preset.round_outputs
            || !result.is_feasible
            || rounding::round_allocation(&mut result, model);
        (result, rounded)
    }

    pub(crate) fn solve(&self, model: &ConstraintModel) -> AllocationResult {
        self.solve_checked(model).0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityReport {
    pub baseline: AllocationResult,
    pub income: Vec<IncomeImpact>,
    pub interest: Vec<InterestImpact>,
    pub priority: Vec<PriorityImpact>,
    pub risk_factors: RiskFactors,
    pub risk_score: u32,
    pub overall_risk: RiskLevel,
    pub recommendations: Vec<String>,
    /// Income at which the hard floors are exactly covered.
    pub income_break_even_point: Money,
}

/// Run every configured sweep against `model`.
pub fn analyze_sensitivity(
    model: &ConstraintModel,
    config: &SensitivityConfig,
) -> BudgetResult<ComputationOutput<SensitivityReport>> {
    let start = Instant::now();
    config.validate()?;

    let runner = PresetRunner::new(&config.baseline)?;
    let solver = runner.solver();
    let (baseline, rounded) = runner.solve_checked(model);

    let mut warnings = Vec::new();
    if !rounded {
        warnings.push("Baseline rounding would exceed income; exact amounts kept".to_string());
    }
    if !baseline.is_feasible {
        warnings.push(format!(
            "Baseline is infeasible: hard floor {} exceeds income {}",
            model.hard_floor(),
            model.total_income()
        ));
    }
    if baseline.solver_type != solver {
        warnings.push(format!(
            "Baseline {solver} solve was replaced by the {}",
            baseline.solver_type
        ));
    }

    let income = income::income_impacts(model, &runner, &baseline, &config.income_changes)?;
    info!(event = "sensitivity_sweep", sweep = "income", cases = income.len());
    let interest = interest::interest_impacts(model, &runner, &baseline, &config.rate_shocks)?;
    info!(event = "sensitivity_sweep", sweep = "interest", cases = interest.len());
    let priority =
        priority::priority_impacts(model, &runner, &baseline, config.priority_step)?;
    info!(event = "sensitivity_sweep", sweep = "priority", cases = priority.len());

    let risk_factors = RiskFactors::assess(model, &baseline, &income, &interest);
    let risk_score = risk_factors.score();
    let overall_risk = RiskLevel::from_score(risk_score);
    let recommendations = risk::recommendations(model, &risk_factors, &income, &interest, &priority);
    info!(
        event = "sensitivity_done",
        risk_score,
        overall_risk = %overall_risk,
    );

    let report = SensitivityReport {
        baseline,
        income,
        interest,
        priority,
        risk_factors,
        risk_score,
        overall_risk,
        recommendations,
        income_break_even_point: model.hard_floor(),
    };
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Allocation sensitivity analysis",
        &serde_json::json!({
            "baseline_scenario": config.baseline.scenario_type.to_string(),
            "solver": solver.to_string(),
            "income_changes": config.income_changes.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            "rate_shocks": config.rate_shocks.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            "priority_step": config.priority_step,
            "risk_weights": { "income_sensitive": 3, "high_risk_debt": 2, "thin_surplus": 2 },
        }),
        warnings,
        elapsed,
        report,
    ))
}
