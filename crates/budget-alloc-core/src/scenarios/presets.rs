use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::BudgetError;
use crate::model::{ScenarioParameters, SurplusAllocation};
use crate::solvers::SolverKind;
use crate::BudgetResult;

/// Named allocation stance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    Conservative,
    Balanced,
    Aggressive,
    Safe,
}

impl std::fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioType::Conservative => write!(f, "conservative"),
            ScenarioType::Balanced => write!(f, "balanced"),
            ScenarioType::Aggressive => write!(f, "aggressive"),
            ScenarioType::Safe => write!(f, "safe"),
        }
    }
}

/// One scenario recipe: parameters, strategy and whether outputs are rounded
/// for presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPreset {
    pub scenario_type: ScenarioType,
    pub parameters: ScenarioParameters,
    pub solver: SolverKind,
    #[serde(default)]
    pub round_outputs: bool,
}

impl ScenarioPreset {
    fn new(
        scenario_type: ScenarioType,
        goal_contribution_factor: Decimal,
        flexible_spending_level: Decimal,
        surplus_allocation: SurplusAllocation,
        solver: SolverKind,
        round_outputs: bool,
    ) -> Self {
        Self {
            scenario_type,
            parameters: ScenarioParameters {
                goal_contribution_factor,
                flexible_spending_level,
                surplus_allocation,
            },
            solver,
            round_outputs,
        }
    }

    /// Half the suggested contributions, low discretionary spending.
    pub fn conservative() -> Self {
        Self::new(
            ScenarioType::Conservative,
            dec!(0.5),
            dec!(0.3),
            SurplusAllocation {
                emergency_fund_percent: dec!(0.40),
                debt_extra_percent: dec!(0.25),
                goals_percent: dec!(0.20),
                flexible_percent: dec!(0.15),
            },
            SolverKind::Preemptive,
            true,
        )
    }

    pub fn balanced() -> Self {
        Self::new(
            ScenarioType::Balanced,
            Decimal::ONE,
            dec!(0.5),
            SurplusAllocation::default(),
            SolverKind::Weighted,
            true,
        )
    }

    /// 150% of suggested contributions at the expense of flexible spending.
    pub fn aggressive() -> Self {
        Self::new(
            ScenarioType::Aggressive,
            dec!(1.5),
            dec!(0.2),
            SurplusAllocation {
                emergency_fund_percent: dec!(0.25),
                debt_extra_percent: dec!(0.30),
                goals_percent: dec!(0.35),
                flexible_percent: dec!(0.10),
            },
            SolverKind::Minmax,
            true,
        )
    }

    pub fn safe() -> Self {
        Self::new(
            ScenarioType::Safe,
            dec!(0.7),
            dec!(0.4),
            SurplusAllocation {
                emergency_fund_percent: dec!(0.40),
                debt_extra_percent: dec!(0.25),
                goals_percent: dec!(0.20),
                flexible_percent: dec!(0.15),
            },
            SolverKind::Preemptive,
            false,
        )
    }
}

/// Set of presets a generation run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub presets: Vec<ScenarioPreset>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl ScenarioConfig {
    /// Conservative, balanced and aggressive with rounded outputs.
    pub fn standard() -> Self {
        Self {
            presets: vec![
                ScenarioPreset::conservative(),
                ScenarioPreset::balanced(),
                ScenarioPreset::aggressive(),
            ],
        }
    }

    /// Safe and balanced, unrounded.
    pub fn simplified() -> Self {
        let mut balanced = ScenarioPreset::balanced();
        balanced.round_outputs = false;
        Self {
            presets: vec![ScenarioPreset::safe(), balanced],
        }
    }

    pub fn preset(&self, scenario_type: ScenarioType) -> Option<&ScenarioPreset> {
        self.presets.iter().find(|p| p.scenario_type == scenario_type)
    }

    pub fn validate(&self) -> BudgetResult<()> {
        if self.presets.is_empty() {
            return Err(BudgetError::InsufficientData(
                "At least one scenario preset required".into(),
            ));
        }
        for (i, preset) in self.presets.iter().enumerate() {
            if self.presets[..i]
                .iter()
                .any(|p| p.scenario_type == preset.scenario_type)
            {
                return Err(BudgetError::invalid(
                    format!("presets[{i}].scenario_type"),
                    format!("Duplicate scenario '{}'", preset.scenario_type),
                ));
            }
            preset.parameters.validate()?;
        }
        Ok(())
    }
}
