use clap::Args;
use serde_json::Value;

use budget_alloc_core::scenarios::{self, ScenarioConfig};

use crate::input::{file, RequestArgs};

/// Arguments for scenario generation
#[derive(Args)]
pub struct ScenariosArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// JSON or YAML file with custom scenario presets
    #[arg(long, conflicts_with = "simplified")]
    pub presets: Option<String>,

    /// Generate the two-scenario (safe, balanced) unrounded set
    #[arg(long)]
    pub simplified: bool,
}

pub fn run_scenarios(args: ScenariosArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = args.request.load()?;
    let model = request.to_model()?;

    let config: ScenarioConfig = if let Some(ref path) = args.presets {
        file::read_config(path)?
    } else if args.simplified {
        ScenarioConfig::simplified()
    } else {
        ScenarioConfig::standard()
    };

    let output = scenarios::generate_scenarios(&model, &request.display_names(), &config)?;
    Ok(serde_json::to_value(output)?)
}
