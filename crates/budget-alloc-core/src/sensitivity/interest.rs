use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PresetRunner;
use crate::model::{ConstraintModel, DebtPriority};
use crate::solvers::AllocationResult;
use crate::types::*;
use crate::BudgetResult;

/// Effect of one rate shock on one debt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestImpact {
    pub debt_id: String,
    /// Absolute rate increase, e.g. 0.02 for two points.
    pub shock: Rate,
    pub current_rate: Rate,
    pub new_rate: Rate,
    /// `balance × shock / 12`.
    pub extra_monthly_interest: Money,
    pub current_priority: DebtPriority,
    pub new_priority: DebtPriority,
    pub extra_payment_before: Money,
    pub extra_payment_after: Money,
    /// The debt moved to a more urgent priority class.
    pub strategy_change_needed: bool,
}

pub(crate) fn interest_impacts(
    model: &ConstraintModel,
    runner: &PresetRunner<'_>,
    baseline: &AllocationResult,
    shocks: &[Rate],
) -> BudgetResult<Vec<InterestImpact>> {
    let mut impacts = Vec::new();
    for (id, debt) in model.debt_payments() {
        let before = baseline
            .debt_allocations
            .get(id)
            .map(|d| d.extra_payment)
            .unwrap_or(Decimal::ZERO);
        for &shock in shocks {
            let new_rate = (debt.interest_rate + shock).min(Decimal::ONE);
            let variant = model.with_debt_rate(id, new_rate)?;
            let shocked = &variant.debt_payments()[id];
            let after = runner
                .solve(&variant)
                .debt_allocations
                .get(id)
                .map(|d| d.extra_payment)
                .unwrap_or(Decimal::ZERO);

            impacts.push(InterestImpact {
                debt_id: id.clone(),
                shock,
                current_rate: debt.interest_rate,
                new_rate,
                extra_monthly_interest: (shocked.monthly_interest() - debt.monthly_interest())
                    .round_dp(2),
                current_priority: debt.priority(),
                new_priority: shocked.priority(),
                extra_payment_before: before,
                extra_payment_after: after,
                strategy_change_needed: shocked.priority().rank() < debt.priority().rank(),
            });
        }
    }
    Ok(impacts)
}
