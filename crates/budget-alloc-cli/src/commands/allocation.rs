use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use budget_alloc_core::feasibility::{
    check_feasibility, suggestions_for_deficit, DeficitSuggestion, Feasibility,
};
use budget_alloc_core::model::ScenarioParameters;
use budget_alloc_core::solvers::{SolverFacade, SolverKind};
use budget_alloc_core::with_metadata;

use crate::input::RequestArgs;

/// Arguments for the hard-floor feasibility check
#[derive(Args)]
pub struct FeasibilityArgs {
    #[command(flatten)]
    pub request: RequestArgs,
}

/// Arguments for a single-strategy solve
#[derive(Args)]
pub struct SolveArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Strategy: preemptive, weighted, minmax, meta, heuristic
    #[arg(long, default_value = "weighted")]
    pub solver: SolverKind,

    /// Multiplier on each goal's suggested contribution
    #[arg(long)]
    pub goal_factor: Option<Decimal>,

    /// Fraction (0-1) of each flexible category's range to fund
    #[arg(long)]
    pub flex_level: Option<Decimal>,
}

/// Arguments for a strategy comparison
#[derive(Args)]
pub struct CompareArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// Two or three comma-separated strategies
    #[arg(long, default_value = "preemptive,weighted,minmax", value_delimiter = ',')]
    pub solvers: Vec<SolverKind>,
}

#[derive(Debug, Serialize)]
struct FeasibilityReport {
    period: String,
    #[serde(flatten)]
    feasibility: Feasibility,
    suggestions: Vec<DeficitSuggestion>,
}

pub fn run_feasibility(args: FeasibilityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let request = args.request.load()?;
    let model = request.to_model()?;

    let feasibility = check_feasibility(&model);
    let suggestions = suggestions_for_deficit(&model, feasibility.deficit);
    let mut warnings = Vec::new();
    if !feasibility.is_feasible {
        warnings.push(format!("Short by {} before any goal is funded", feasibility.deficit));
    }

    let report = FeasibilityReport {
        period: request.period.to_string(),
        feasibility,
        suggestions,
    };
    let output = with_metadata(
        "Hard floor feasibility check",
        &serde_json::json!({ "hard_floor": "mandatory minimums + debt minimum payments" }),
        warnings,
        start.elapsed().as_micros() as u64,
        report,
    );
    Ok(serde_json::to_value(output)?)
}

fn params_from(goal_factor: Option<Decimal>, flex_level: Option<Decimal>) -> ScenarioParameters {
    let defaults = ScenarioParameters::default();
    ScenarioParameters {
        goal_contribution_factor: goal_factor.unwrap_or(defaults.goal_contribution_factor),
        flexible_spending_level: flex_level.unwrap_or(defaults.flexible_spending_level),
        surplus_allocation: defaults.surplus_allocation,
    }
}

pub fn run_solve(args: SolveArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let request = args.request.load()?;
    let model = request.to_model()?;
    let params = params_from(args.goal_factor, args.flex_level);
    let facade = SolverFacade::new(params.clone())?;

    let result = facade.solve(&model, args.solver);
    let mut warnings = Vec::new();
    if result.solver_type != args.solver {
        warnings.push(format!("{} failed; heuristic allocation returned", args.solver));
    }
    if !result.is_feasible {
        warnings.push("Mandatory expenses and minimum payments exceed income".to_string());
    }

    let output = with_metadata(
        &format!("Goal programming allocation ({})", args.solver),
        &params,
        warnings,
        start.elapsed().as_micros() as u64,
        result,
    );
    Ok(serde_json::to_value(output)?)
}

pub fn run_compare(args: CompareArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = args.request.load()?;
    let model = request.to_model()?;
    let facade = SolverFacade::new(ScenarioParameters::default())?;

    let output = match args.solvers.as_slice() {
        [a, b] => facade.solve_dual(&model, *a, *b)?,
        [a, b, c] => facade.solve_triple(&model, [*a, *b, *c])?,
        other => {
            return Err(format!("--solvers takes two or three strategies, got {}", other.len()).into())
        }
    };
    Ok(serde_json::to_value(output)?)
}
