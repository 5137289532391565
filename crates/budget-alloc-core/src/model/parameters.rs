use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::BudgetError;
use crate::types::*;
use crate::BudgetResult;

/// How the heuristic fallback splits the surplus left after hard floors.
/// Fractions of the surplus; they need not sum to 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurplusAllocation {
    pub emergency_fund_percent: Rate,
    pub debt_extra_percent: Rate,
    pub goals_percent: Rate,
    pub flexible_percent: Rate,
}

impl Default for SurplusAllocation {
    fn default() -> Self {
        Self {
            emergency_fund_percent: dec!(0.30),
            debt_extra_percent: dec!(0.25),
            goals_percent: dec!(0.30),
            flexible_percent: dec!(0.15),
        }
    }
}

/// Knobs shared by every solver for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParameters {
    /// Multiplier on each goal's suggested contribution.
    pub goal_contribution_factor: Decimal,
    /// Fraction (0..=1) of a flexible category's range to fund.
    pub flexible_spending_level: Decimal,
    #[serde(default)]
    pub surplus_allocation: SurplusAllocation,
}

impl Default for ScenarioParameters {
    fn default() -> Self {
        Self {
            goal_contribution_factor: Decimal::ONE,
            flexible_spending_level: dec!(0.5),
            surplus_allocation: SurplusAllocation::default(),
        }
    }
}

impl ScenarioParameters {
    pub fn validate(&self) -> BudgetResult<()> {
        if self.goal_contribution_factor < Decimal::ZERO {
            return Err(BudgetError::invalid(
                "goal_contribution_factor",
                "Contribution factor must be non-negative",
            ));
        }
        if self.flexible_spending_level < Decimal::ZERO
            || self.flexible_spending_level > Decimal::ONE
        {
            return Err(BudgetError::invalid(
                "flexible_spending_level",
                "Flexible spending level must be between 0 and 1",
            ));
        }
        let s = &self.surplus_allocation;
        for (field, value) in [
            ("surplus_allocation.emergency_fund_percent", s.emergency_fund_percent),
            ("surplus_allocation.debt_extra_percent", s.debt_extra_percent),
            ("surplus_allocation.goals_percent", s.goals_percent),
            ("surplus_allocation.flexible_percent", s.flexible_percent),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(BudgetError::invalid(field, "Must be between 0 and 1"));
            }
        }
        Ok(())
    }
}
