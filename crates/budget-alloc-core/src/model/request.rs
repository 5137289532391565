//! Request assembly: snapshots from the budgeting, debt, goal and income
//! services are validated and turned into a [`ConstraintModel`].

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::constraints::{ConstraintModel, GoalTarget, GoalType};
use crate::error::BudgetError;
use crate::types::*;
use crate::BudgetResult;

/// Calendar month the allocation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetPeriod {
    pub year: i32,
    pub month: u32,
}

impl BudgetPeriod {
    /// First day of the period; rejects months outside 1..=12 and years
    /// outside 1970..=2200.
    pub fn start_date(&self) -> BudgetResult<NaiveDate> {
        if !(1970..=2200).contains(&self.year) {
            return Err(BudgetError::invalid(
                "period.year",
                format!("Year {} is out of range (1970-2200)", self.year),
            ));
        }
        NaiveDate::from_ymd_opt(self.year, self.month, 1).ok_or_else(|| {
            BudgetError::invalid(
                "period.month",
                format!("Month {} is out of range (1-12)", self.month),
            )
        })
    }
}

impl std::fmt::Display for BudgetPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

fn default_priority() -> u32 {
    5
}

/// Category limits as exported by the budgeting service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySnapshot {
    pub category_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub minimum: Money,
    /// Mandatory categories ignore this; flexible ones default to `minimum`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Money>,
    #[serde(default = "default_priority")]
    pub priority: u32,
}

/// A debt as exported by the debt service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebtSnapshot {
    pub debt_id: String,
    pub minimum_payment: Money,
    pub current_balance: Money,
    pub interest_rate: Rate,
}

/// A goal as ranked by the priority service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalSnapshot {
    pub goal_id: String,
    pub goal_name: String,
    pub goal_type: GoalType,
    pub suggested_contribution: Money,
    pub remaining_amount: Money,
    #[serde(default)]
    pub priority_label: String,
    pub priority_weight: u32,
}

/// Everything needed to run one allocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub period: BudgetPeriod,
    pub total_income: Money,
    #[serde(default)]
    pub mandatory: Vec<CategorySnapshot>,
    #[serde(default)]
    pub flexible: Vec<CategorySnapshot>,
    #[serde(default)]
    pub debts: Vec<DebtSnapshot>,
    #[serde(default)]
    pub goals: Vec<GoalSnapshot>,
    /// Category id -> display name lookup.
    #[serde(default)]
    pub category_names: BTreeMap<String, String>,
}

impl AllocationRequest {
    /// Validate the request and build the constraint model.
    pub fn to_model(&self) -> BudgetResult<ConstraintModel> {
        self.period.start_date()?;
        if self.total_income <= Decimal::ZERO {
            return Err(BudgetError::invalid(
                "total_income",
                "Income must be positive",
            ));
        }

        let mut builder = ConstraintModel::builder(self.total_income);
        for c in &self.mandatory {
            builder = builder.mandatory(c.category_id.clone(), c.minimum, c.priority);
        }
        for c in &self.flexible {
            builder = builder.flexible(
                c.category_id.clone(),
                c.minimum,
                c.maximum.unwrap_or(c.minimum),
                c.priority,
            );
        }
        for d in &self.debts {
            builder = builder.debt(
                d.debt_id.clone(),
                d.minimum_payment,
                d.current_balance,
                d.interest_rate,
            );
        }
        for g in &self.goals {
            builder = builder.goal(
                g.goal_id.clone(),
                GoalTarget {
                    goal_name: g.goal_name.clone(),
                    goal_type: g.goal_type.clone(),
                    suggested_contribution: g.suggested_contribution,
                    remaining_amount: g.remaining_amount,
                    priority_label: g.priority_label.clone(),
                    priority_weight: g.priority_weight,
                },
            );
        }
        builder.build()
    }

    /// Display names from the lookup table, falling back to names carried on
    /// the category snapshots themselves.
    pub fn display_names(&self) -> BTreeMap<String, String> {
        let mut names: BTreeMap<String, String> = self
            .mandatory
            .iter()
            .chain(self.flexible.iter())
            .filter_map(|c| c.name.clone().map(|n| (c.category_id.clone(), n)))
            .collect();
        names.extend(self.category_names.clone());
        names
    }
}

impl ConstraintModel {
    pub fn from_request(request: &AllocationRequest) -> BudgetResult<Self> {
        request.to_model()
    }
}
