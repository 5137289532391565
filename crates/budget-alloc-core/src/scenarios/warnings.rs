use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::feasibility::DeficitSuggestion;
use crate::model::ConstraintModel;
use crate::types::*;

/// Debts at or above this annual rate are flagged.
pub const HIGH_INTEREST_RATE: Rate = dec!(0.15);
/// Savings rate below which a scenario is flagged.
pub const LOW_SAVINGS_RATE: Rate = dec!(0.10);
/// Unallocated share of income below which a scenario is flagged.
pub const LOW_SURPLUS_SHARE: Rate = dec!(0.05);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCategory {
    Infeasible,
    EmergencyFund,
    HighInterestDebt,
    SavingsRate,
    Surplus,
    Rounding,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioWarning {
    pub severity: WarningSeverity,
    pub category: WarningCategory,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<DeficitSuggestion>,
}

impl ScenarioWarning {
    fn new(severity: WarningSeverity, category: WarningCategory, message: String) -> Self {
        Self {
            severity,
            category,
            message,
            suggestions: Vec::new(),
        }
    }

    pub fn infeasible(deficit: Money, suggestions: Vec<DeficitSuggestion>) -> Self {
        Self {
            severity: WarningSeverity::Critical,
            category: WarningCategory::Infeasible,
            message: format!(
                "Mandatory expenses and minimum debt payments exceed income by {deficit}"
            ),
            suggestions,
        }
    }

    pub fn rounding_skipped() -> Self {
        Self::new(
            WarningSeverity::Info,
            WarningCategory::Rounding,
            "Rounded amounts would exceed income; exact amounts kept".into(),
        )
    }
}

/// Advisory checks on a feasible scenario.
pub fn advisory_warnings(
    model: &ConstraintModel,
    savings_rate: Rate,
    surplus: Money,
) -> Vec<ScenarioWarning> {
    let mut warnings = Vec::new();

    if !model.has_emergency_goal() {
        warnings.push(ScenarioWarning::new(
            WarningSeverity::Warning,
            WarningCategory::EmergencyFund,
            "No emergency fund goal; consider saving 3-6 months of expenses".into(),
        ));
    }

    for (id, debt) in model.debt_payments() {
        if debt.interest_rate >= HIGH_INTEREST_RATE {
            warnings.push(ScenarioWarning::new(
                WarningSeverity::Warning,
                WarningCategory::HighInterestDebt,
                format!(
                    "Debt '{id}' carries {}% interest; prioritise paying it down",
                    (debt.interest_rate * dec!(100)).round_dp(2).normalize()
                ),
            ));
        }
    }

    if savings_rate < LOW_SAVINGS_RATE {
        warnings.push(ScenarioWarning::new(
            WarningSeverity::Info,
            WarningCategory::SavingsRate,
            format!(
                "Savings rate of {}% is below the recommended 10%",
                (savings_rate * dec!(100)).round_dp(1).normalize()
            ),
        ));
    }

    let income = model.total_income();
    if income > Decimal::ZERO && surplus < income * LOW_SURPLUS_SHARE {
        warnings.push(ScenarioWarning::new(
            WarningSeverity::Info,
            WarningCategory::Surplus,
            format!("Only {surplus} left unallocated, less than 5% of income"),
        ));
    }

    warnings
}
