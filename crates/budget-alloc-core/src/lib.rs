pub mod error;
pub mod feasibility;
pub mod model;
pub mod solvers;
pub mod types;

#[cfg(feature = "scenarios")]
pub mod scenarios;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;

pub use error::BudgetError;
pub use types::*;

/// Standard result type for all budget-alloc operations
pub type BudgetResult<T> = Result<T, BudgetError>;
