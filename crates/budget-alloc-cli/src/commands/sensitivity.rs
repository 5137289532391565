use clap::Args;
use serde_json::Value;

use budget_alloc_core::sensitivity::{self, SensitivityConfig};

use crate::input::{file, RequestArgs};

/// Arguments for sensitivity analysis
#[derive(Args)]
pub struct SensitivityArgs {
    #[command(flatten)]
    pub request: RequestArgs,

    /// JSON or YAML file overriding the income changes, rate shocks,
    /// priority step or baseline preset
    #[arg(long)]
    pub config: Option<String>,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request = args.request.load()?;
    let model = request.to_model()?;

    let config: SensitivityConfig = match args.config {
        Some(ref path) => file::read_config(path)?,
        None => SensitivityConfig::default(),
    };

    let output = sensitivity::analyze_sensitivity(&model, &config)?;
    Ok(serde_json::to_value(output)?)
}
