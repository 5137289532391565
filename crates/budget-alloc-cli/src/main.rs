mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use commands::allocation::{CompareArgs, FeasibilityArgs, SolveArgs};
use commands::scenarios::ScenariosArgs;
use commands::sensitivity::SensitivityArgs;

/// Monthly budget allocation with goal programming
#[derive(Parser)]
#[command(
    name = "balloc",
    version,
    about = "Monthly budget allocation with goal programming",
    long_about = "Allocates a month's income across mandatory expenses, debt payments, \
                  savings goals and flexible spending with decimal precision. Supports \
                  preemptive, weighted, minmax and meta goal programming, a heuristic \
                  fallback, scenario generation and sensitivity analysis."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log solver progress to stderr (overridden by RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether income covers mandatory expenses and minimum payments
    Feasibility(FeasibilityArgs),
    /// Allocate income with one strategy
    Solve(SolveArgs),
    /// Compare two or three strategies and recommend one
    Compare(CompareArgs),
    /// Generate conservative / balanced / aggressive scenarios
    Scenarios(ScenariosArgs),
    /// Stress income, interest rates and goal priorities
    Sensitivity(SensitivityArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "budget_alloc_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Feasibility(args) => commands::allocation::run_feasibility(args),
        Commands::Solve(args) => commands::allocation::run_solve(args),
        Commands::Compare(args) => commands::allocation::run_compare(args),
        Commands::Scenarios(args) => commands::scenarios::run_scenarios(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Version => {
            println!("balloc {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
