pub mod constraints;
pub mod parameters;
pub mod request;

pub use constraints::{
    CategoryConstraint, ConstraintModel, ConstraintModelBuilder, DebtConstraint, DebtPriority,
    GoalTarget, GoalType,
};
pub use parameters::{ScenarioParameters, SurplusAllocation};
pub use request::{AllocationRequest, BudgetPeriod, CategorySnapshot, DebtSnapshot, GoalSnapshot};
