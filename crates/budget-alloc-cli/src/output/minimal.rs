use serde_json::Value;

use super::{field, format_value};

/// Print just the key answer from the output.
///
/// Scenario sets print one `scenario: score` line each; otherwise the first
/// well-known field present wins, then the first field of the result.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    if let Some(Value::Array(scenarios)) = result_obj.get("scenarios") {
        for s in scenarios {
            println!(
                "{}: {}",
                field(s, &["scenario_type"]),
                field(s, &["result", "feasibility_score"])
            );
        }
        return;
    }

    let priority_keys = [
        "recommended",
        "overall_risk",
        "feasibility_score",
        "deficit",
        "is_feasible",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", format_value(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_value(val));
            return;
        }
    }

    println!("{}", format_value(result_obj));
}
