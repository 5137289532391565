use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::ConstraintModel;
use crate::solvers::AllocationResult;
use crate::types::*;

/// One category's line in the breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryLine {
    pub category_id: String,
    pub name: String,
    pub amount: Money,
    /// Share of income, as a rate.
    pub share: Rate,
}

/// Bucket totals of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub total_income: Money,
    pub mandatory_total: Money,
    pub flexible_total: Money,
    pub debt_minimum_total: Money,
    pub debt_extra_total: Money,
    pub goal_total: Money,
    pub surplus: Money,
    /// `(goals + debt extra) / income`.
    pub savings_rate: Rate,
    pub categories: Vec<CategoryLine>,
}

impl ScenarioSummary {
    pub fn build(
        model: &ConstraintModel,
        result: &AllocationResult,
        category_names: &BTreeMap<String, String>,
    ) -> Self {
        let income = model.total_income();
        let share = |amount: Money| {
            if income > Decimal::ZERO {
                (amount / income).round_dp(4)
            } else {
                Decimal::ZERO
            }
        };

        let goal_total = result.goal_total();
        let debt_extra_total = result.debt_extra_total();
        let categories = result
            .category_allocations
            .iter()
            .map(|(id, amount)| CategoryLine {
                category_id: id.clone(),
                name: category_names.get(id).cloned().unwrap_or_else(|| id.clone()),
                amount: *amount,
                share: share(*amount),
            })
            .collect();

        Self {
            total_income: income,
            mandatory_total: result.mandatory_total(model),
            flexible_total: result.flexible_total(model),
            debt_minimum_total: result
                .debt_allocations
                .values()
                .map(|d| d.minimum_payment)
                .sum(),
            debt_extra_total,
            goal_total,
            surplus: result.surplus,
            savings_rate: share(goal_total + debt_extra_total),
            categories,
        }
    }
}
