use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Scores and achievement levels on a 0..=100 scale.
pub type Percent = Decimal;

/// Tolerance used for every monetary equality / deviation check.
pub const MONEY_EPSILON: Money = dec!(0.01);

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Truncate a monetary amount to whole cents, never rounding up.
///
/// Solvers hand out budget in truncated cents so the sum of allocations can
/// never exceed what was available.
pub fn floor_cents(amount: Money) -> Money {
    amount.round_dp_with_strategy(2, rust_decimal::RoundingStrategy::ToZero)
}

/// `part / whole` on a 0..=100 scale, with an empty whole counting as fully met.
pub fn percent_of(part: Money, whole: Money) -> Percent {
    if whole <= Decimal::ZERO {
        return dec!(100);
    }
    (part / whole * dec!(100)).min(dec!(100)).max(Decimal::ZERO)
}
