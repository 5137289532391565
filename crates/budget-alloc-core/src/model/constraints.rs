//! Constraint model for a single monthly allocation problem.
//!
//! Covers:
//! 1. **Mandatory expenses** -- hard floors that must be funded in full
//! 2. **Flexible expenses** -- soft `[minimum, maximum]` ranges
//! 3. **Debt payments** -- hard minimum payment, priority derived from the rate
//! 4. **Goal targets** -- savings goals ranked by a 1..=99 priority weight
//!
//! A model is validated once at construction and never mutated afterwards.
//! Perturbations (`with_income`, `with_debt_rate`, `with_goal_weight`) return
//! deep clones. Every collection is a `BTreeMap`, so iteration is sorted by id.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::BudgetError;
use crate::types::*;
use crate::BudgetResult;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Urgency of a debt, derived from its annual interest rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl DebtPriority {
    /// >= 20% critical, >= 10% high, >= 5% medium, else low.
    pub fn from_rate(rate: Rate) -> Self {
        if rate >= dec!(0.20) {
            DebtPriority::Critical
        } else if rate >= dec!(0.10) {
            DebtPriority::High
        } else if rate >= dec!(0.05) {
            DebtPriority::Medium
        } else {
            DebtPriority::Low
        }
    }

    /// Numeric rank, 1 = most urgent.
    pub fn rank(self) -> u8 {
        match self {
            DebtPriority::Critical => 1,
            DebtPriority::High => 2,
            DebtPriority::Medium => 3,
            DebtPriority::Low => 4,
        }
    }
}

impl std::fmt::Display for DebtPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DebtPriority::Critical => write!(f, "critical"),
            DebtPriority::High => write!(f, "high"),
            DebtPriority::Medium => write!(f, "medium"),
            DebtPriority::Low => write!(f, "low"),
        }
    }
}

/// Kind of savings goal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    Emergency,
    Retirement,
    Education,
    Purchase,
    Savings,
    #[serde(other)]
    Other,
}

impl std::fmt::Display for GoalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GoalType::Emergency => write!(f, "emergency"),
            GoalType::Retirement => write!(f, "retirement"),
            GoalType::Education => write!(f, "education"),
            GoalType::Purchase => write!(f, "purchase"),
            GoalType::Savings => write!(f, "savings"),
            GoalType::Other => write!(f, "other"),
        }
    }
}

// ---------------------------------------------------------------------------
// Constraint records
// ---------------------------------------------------------------------------

/// A mandatory or flexible expense category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConstraint {
    pub minimum: Money,
    pub maximum: Money,
    /// 1 = most important.
    pub priority: u32,
}

/// A debt with a hard minimum payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtConstraint {
    pub minimum_payment: Money,
    pub current_balance: Money,
    /// Annual rate as a decimal (0.18 = 18%).
    pub interest_rate: Rate,
    priority: DebtPriority,
}

impl DebtConstraint {
    pub fn new(minimum_payment: Money, current_balance: Money, interest_rate: Rate) -> Self {
        Self {
            minimum_payment,
            current_balance,
            interest_rate,
            priority: DebtPriority::from_rate(interest_rate),
        }
    }

    pub fn priority(&self) -> DebtPriority {
        self.priority
    }

    /// Largest payment above the minimum that the balance still allows.
    pub fn extra_headroom(&self) -> Money {
        (self.current_balance - self.minimum_payment).max(Decimal::ZERO)
    }

    /// Interest accrued in one month on the current balance.
    pub fn monthly_interest(&self) -> Money {
        self.current_balance * self.interest_rate / dec!(12)
    }
}

/// A savings goal supplied by the goals / priority-ranking service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalTarget {
    pub goal_name: String,
    pub goal_type: GoalType,
    pub suggested_contribution: Money,
    pub remaining_amount: Money,
    pub priority_label: String,
    /// 1 = highest urgency, 99 = lowest.
    pub priority_weight: u32,
}

impl GoalTarget {
    pub fn is_emergency(&self) -> bool {
        self.goal_type == GoalType::Emergency
    }

    /// Contribution wanted this month for a given contribution factor,
    /// never more than what is still missing.
    pub fn desired_contribution(&self, factor: Decimal) -> Money {
        (self.suggested_contribution * factor)
            .round_dp(2)
            .min(self.remaining_amount)
            .max(Decimal::ZERO)
    }

    /// Importance on a 1..=99 scale (inverse of the priority weight).
    pub fn importance(&self) -> Decimal {
        let base = Decimal::from(100u32.saturating_sub(self.priority_weight).max(1));
        if self.is_emergency() {
            base + dec!(0.5)
        } else {
            base
        }
    }
}

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Immutable snapshot of one allocation problem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintModel {
    total_income: Money,
    mandatory_expenses: BTreeMap<String, CategoryConstraint>,
    flexible_expenses: BTreeMap<String, CategoryConstraint>,
    debt_payments: BTreeMap<String, DebtConstraint>,
    goal_targets: BTreeMap<String, GoalTarget>,
}

impl ConstraintModel {
    pub fn builder(total_income: Money) -> ConstraintModelBuilder {
        ConstraintModelBuilder {
            total_income,
            mandatory_expenses: Vec::new(),
            flexible_expenses: Vec::new(),
            debt_payments: Vec::new(),
            goal_targets: Vec::new(),
        }
    }

    pub fn total_income(&self) -> Money {
        self.total_income
    }

    pub fn mandatory_expenses(&self) -> &BTreeMap<String, CategoryConstraint> {
        &self.mandatory_expenses
    }

    pub fn flexible_expenses(&self) -> &BTreeMap<String, CategoryConstraint> {
        &self.flexible_expenses
    }

    pub fn debt_payments(&self) -> &BTreeMap<String, DebtConstraint> {
        &self.debt_payments
    }

    pub fn goal_targets(&self) -> &BTreeMap<String, GoalTarget> {
        &self.goal_targets
    }

    pub fn mandatory_total(&self) -> Money {
        self.mandatory_expenses.values().map(|c| c.minimum).sum()
    }

    pub fn debt_minimum_total(&self) -> Money {
        self.debt_payments.values().map(|d| d.minimum_payment).sum()
    }

    /// Sum of every hard floor: mandatory minimums plus debt minimum payments.
    pub fn hard_floor(&self) -> Money {
        self.mandatory_total() + self.debt_minimum_total()
    }

    pub fn has_emergency_goal(&self) -> bool {
        self.goal_targets.values().any(GoalTarget::is_emergency)
    }

    /// Goals by ascending priority weight, emergency goals first on ties, then id.
    pub fn ordered_goals(&self) -> Vec<(&String, &GoalTarget)> {
        let mut goals: Vec<_> = self.goal_targets.iter().collect();
        goals.sort_by(|(a_id, a), (b_id, b)| {
            a.priority_weight
                .cmp(&b.priority_weight)
                .then_with(|| b.is_emergency().cmp(&a.is_emergency()))
                .then_with(|| a_id.cmp(b_id))
        });
        goals
    }

    /// The single debt that should receive extra payments: most urgent
    /// priority, then highest rate, then lowest id. Paid-off debts are skipped.
    pub fn highest_priority_debt(&self) -> Option<(&String, &DebtConstraint)> {
        self.debt_payments
            .iter()
            .filter(|(_, d)| d.extra_headroom() > MONEY_EPSILON)
            .min_by(|(a_id, a), (b_id, b)| {
                a.priority
                    .rank()
                    .cmp(&b.priority.rank())
                    .then_with(|| b.interest_rate.cmp(&a.interest_rate))
                    .then_with(|| a_id.cmp(b_id))
            })
    }

    /// Deep clone with a different income.
    pub fn with_income(&self, total_income: Money) -> BudgetResult<Self> {
        if total_income < Decimal::ZERO {
            return Err(BudgetError::invalid(
                "total_income",
                "Income must be non-negative",
            ));
        }
        let mut clone = self.clone();
        clone.total_income = total_income;
        Ok(clone)
    }

    /// Deep clone with one debt's rate replaced and its priority re-derived.
    pub fn with_debt_rate(&self, debt_id: &str, interest_rate: Rate) -> BudgetResult<Self> {
        validate_rate(debt_id, interest_rate)?;
        let mut clone = self.clone();
        let debt = clone
            .debt_payments
            .get_mut(debt_id)
            .ok_or_else(|| BudgetError::invalid("debt_id", format!("Unknown debt '{debt_id}'")))?;
        *debt = DebtConstraint::new(debt.minimum_payment, debt.current_balance, interest_rate);
        Ok(clone)
    }

    /// Deep clone with one goal's priority weight replaced (clamped to 1..=99).
    pub fn with_goal_weight(&self, goal_id: &str, priority_weight: u32) -> BudgetResult<Self> {
        let mut clone = self.clone();
        let goal = clone
            .goal_targets
            .get_mut(goal_id)
            .ok_or_else(|| BudgetError::invalid("goal_id", format!("Unknown goal '{goal_id}'")))?;
        goal.priority_weight = priority_weight.clamp(1, 99);
        Ok(clone)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects constraints and validates them all at once in `build`.
#[derive(Debug, Clone)]
pub struct ConstraintModelBuilder {
    total_income: Money,
    mandatory_expenses: Vec<(String, CategoryConstraint)>,
    flexible_expenses: Vec<(String, CategoryConstraint)>,
    debt_payments: Vec<(String, DebtConstraint)>,
    goal_targets: Vec<(String, GoalTarget)>,
}

impl ConstraintModelBuilder {
    pub fn mandatory(mut self, id: impl Into<String>, amount: Money, priority: u32) -> Self {
        self.mandatory_expenses.push((
            id.into(),
            CategoryConstraint {
                minimum: amount,
                maximum: amount,
                priority,
            },
        ));
        self
    }

    pub fn flexible(
        mut self,
        id: impl Into<String>,
        minimum: Money,
        maximum: Money,
        priority: u32,
    ) -> Self {
        self.flexible_expenses.push((
            id.into(),
            CategoryConstraint {
                minimum,
                maximum,
                priority,
            },
        ));
        self
    }

    pub fn debt(
        mut self,
        id: impl Into<String>,
        minimum_payment: Money,
        current_balance: Money,
        interest_rate: Rate,
    ) -> Self {
        self.debt_payments.push((
            id.into(),
            DebtConstraint::new(minimum_payment, current_balance, interest_rate),
        ));
        self
    }

    pub fn goal(mut self, id: impl Into<String>, goal: GoalTarget) -> Self {
        self.goal_targets.push((id.into(), goal));
        self
    }

    pub fn build(self) -> BudgetResult<ConstraintModel> {
        if self.total_income < Decimal::ZERO {
            return Err(BudgetError::invalid(
                "total_income",
                "Income must be non-negative",
            ));
        }

        let mut mandatory_expenses = BTreeMap::new();
        for (id, c) in self.mandatory_expenses {
            validate_id("mandatory", &id)?;
            validate_category("mandatory", &id, &c)?;
            if c.maximum != c.minimum {
                return Err(BudgetError::invalid(
                    format!("mandatory:{id} maximum"),
                    "Mandatory maximum must equal its minimum",
                ));
            }
            insert_unique("mandatory", &mut mandatory_expenses, id, c)?;
        }

        let mut flexible_expenses = BTreeMap::new();
        for (id, c) in self.flexible_expenses {
            validate_id("flexible", &id)?;
            validate_category("flexible", &id, &c)?;
            insert_unique("flexible", &mut flexible_expenses, id, c)?;
        }
        if let Some(id) = mandatory_expenses
            .keys()
            .find(|id| flexible_expenses.contains_key(*id))
        {
            return Err(BudgetError::invalid(
                format!("category:{id}"),
                "Category cannot be both mandatory and flexible",
            ));
        }

        let mut debt_payments = BTreeMap::new();
        for (id, d) in self.debt_payments {
            validate_id("debt", &id)?;
            validate_debt(&id, &d)?;
            insert_unique("debt", &mut debt_payments, id, d)?;
        }

        let mut goal_targets = BTreeMap::new();
        for (id, g) in self.goal_targets {
            validate_id("goal", &id)?;
            validate_goal(&id, &g)?;
            insert_unique("goal", &mut goal_targets, id, g)?;
        }

        Ok(ConstraintModel {
            total_income: self.total_income,
            mandatory_expenses,
            flexible_expenses,
            debt_payments,
            goal_targets,
        })
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_id(kind: &str, id: &str) -> BudgetResult<()> {
    if id.trim().is_empty() {
        return Err(BudgetError::invalid(
            format!("{kind}_id"),
            "Identifier must not be empty",
        ));
    }
    Ok(())
}

fn insert_unique<T>(
    kind: &str,
    map: &mut BTreeMap<String, T>,
    id: String,
    value: T,
) -> BudgetResult<()> {
    if map.contains_key(&id) {
        return Err(BudgetError::invalid(
            format!("{kind}:{id}"),
            "Duplicate identifier",
        ));
    }
    map.insert(id, value);
    Ok(())
}

fn validate_category(kind: &str, id: &str, c: &CategoryConstraint) -> BudgetResult<()> {
    if c.minimum < Decimal::ZERO {
        return Err(BudgetError::invalid(
            format!("{kind}:{id} minimum"),
            "Minimum must be non-negative",
        ));
    }
    if c.minimum > c.maximum {
        return Err(BudgetError::invalid(
            format!("{kind}:{id} maximum"),
            format!("Maximum ({}) must be >= minimum ({})", c.maximum, c.minimum),
        ));
    }
    if c.priority == 0 {
        return Err(BudgetError::invalid(
            format!("{kind}:{id} priority"),
            "Priority starts at 1",
        ));
    }
    Ok(())
}

fn validate_rate(id: &str, rate: Rate) -> BudgetResult<()> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(BudgetError::invalid(
            format!("debt:{id} interest_rate"),
            "Interest rate must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_debt(id: &str, d: &DebtConstraint) -> BudgetResult<()> {
    if d.minimum_payment < Decimal::ZERO {
        return Err(BudgetError::invalid(
            format!("debt:{id} minimum_payment"),
            "Minimum payment must be non-negative",
        ));
    }
    if d.minimum_payment > d.current_balance {
        return Err(BudgetError::invalid(
            format!("debt:{id} minimum_payment"),
            format!(
                "Minimum payment ({}) exceeds current balance ({})",
                d.minimum_payment, d.current_balance
            ),
        ));
    }
    validate_rate(id, d.interest_rate)
}

fn validate_goal(id: &str, g: &GoalTarget) -> BudgetResult<()> {
    if g.suggested_contribution < Decimal::ZERO {
        return Err(BudgetError::invalid(
            format!("goal:{id} suggested_contribution"),
            "Suggested contribution must be non-negative",
        ));
    }
    if g.remaining_amount < Decimal::ZERO {
        return Err(BudgetError::invalid(
            format!("goal:{id} remaining_amount"),
            "Remaining amount must be non-negative",
        ));
    }
    if !(1..=99).contains(&g.priority_weight) {
        return Err(BudgetError::invalid(
            format!("goal:{id} priority_weight"),
            "Priority weight must be between 1 and 99",
        ));
    }
    Ok(())
}
