use std::collections::BTreeMap;

use napi::Result as NapiResult;
use napi_derive::napi;
use serde::{Deserialize, Serialize};

use budget_alloc_core::feasibility::{self, DeficitSuggestion, Feasibility};
use budget_alloc_core::model::{AllocationRequest, ConstraintModel, ScenarioParameters};
use budget_alloc_core::scenarios::{self, ScenarioConfig};
use budget_alloc_core::sensitivity::{self, SensitivityConfig};
use budget_alloc_core::solvers::facade::DEFAULT_TRIPLE;
use budget_alloc_core::solvers::{SolverFacade, SolverKind};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn model_from(request: &AllocationRequest) -> NapiResult<ConstraintModel> {
    ConstraintModel::from_request(request).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

fn default_solver() -> SolverKind {
    SolverKind::Weighted
}

fn default_strategies() -> Vec<SolverKind> {
    DEFAULT_TRIPLE.to_vec()
}

#[derive(Deserialize)]
struct SolveInput {
    request: AllocationRequest,
    #[serde(default = "default_solver")]
    solver: SolverKind,
    #[serde(default)]
    parameters: ScenarioParameters,
}

#[derive(Deserialize)]
struct CompareInput {
    request: AllocationRequest,
    #[serde(default = "default_strategies")]
    solvers: Vec<SolverKind>,
}

#[derive(Deserialize)]
struct ScenariosInput {
    request: AllocationRequest,
    #[serde(default)]
    config: ScenarioConfig,
}

#[derive(Deserialize)]
struct SensitivityInput {
    request: AllocationRequest,
    #[serde(default)]
    config: SensitivityConfig,
}

#[derive(Serialize)]
struct FeasibilityOutput {
    #[serde(flatten)]
    feasibility: Feasibility,
    suggestions: Vec<DeficitSuggestion>,
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

#[napi]
pub fn check_feasibility(request_json: String) -> NapiResult<String> {
    let request: AllocationRequest = serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let model = model_from(&request)?;
    let feasibility = feasibility::check_feasibility(&model);
    let output = FeasibilityOutput {
        suggestions: feasibility::suggestions_for_deficit(&model, feasibility.deficit),
        feasibility,
    };
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn solve_allocation(input_json: String) -> NapiResult<String> {
    let input: SolveInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let model = model_from(&input.request)?;
    let facade = SolverFacade::new(input.parameters).map_err(to_napi_error)?;
    let result = facade.solve(&model, input.solver);
    serde_json::to_string(&result).map_err(to_napi_error)
}

#[napi]
pub fn compare_strategies(input_json: String) -> NapiResult<String> {
    let input: CompareInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let model = model_from(&input.request)?;
    let facade = SolverFacade::new(ScenarioParameters::default()).map_err(to_napi_error)?;
    let output = facade
        .compare(&model, &input.solvers)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Scenarios & sensitivity
// ---------------------------------------------------------------------------

#[napi]
pub fn generate_scenarios(input_json: String) -> NapiResult<String> {
    let input: ScenariosInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let model = model_from(&input.request)?;
    let names: BTreeMap<String, String> = input.request.display_names();
    let output =
        scenarios::generate_scenarios(&model, &names, &input.config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn analyze_sensitivity(input_json: String) -> NapiResult<String> {
    let input: SensitivityInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let model = model_from(&input.request)?;
    let output =
        sensitivity::analyze_sensitivity(&model, &input.config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
