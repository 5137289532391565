pub mod file;
pub mod stdin;

use clap::Args;
use rust_decimal::Decimal;

use budget_alloc_core::model::AllocationRequest;

/// Where the allocation request comes from.
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct RequestArgs {
    /// Path to a JSON or YAML allocation request (reads piped stdin otherwise)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the request's total monthly income
    #[arg(long)]
    pub income: Option<Decimal>,
}

impl RequestArgs {
    pub fn load(&self) -> Result<AllocationRequest, Box<dyn std::error::Error>> {
        let mut request: AllocationRequest = if let Some(ref path) = self.input {
            file::read_config(path)?
        } else if let Some(data) = stdin::read_stdin()? {
            serde_json::from_value(data)?
        } else {
            return Err("an allocation request is required: pass --input FILE or pipe JSON on stdin".into());
        };
        if let Some(income) = self.income {
            request.total_income = income;
        }
        Ok(request)
    }
}
