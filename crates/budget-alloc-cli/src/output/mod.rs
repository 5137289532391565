pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Header and rows for results that are naturally a list: scenarios,
/// strategy scores, or the per-item allocations of a single solve.
pub(crate) fn result_rows(result: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let headers = |h: &[&str]| h.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    if let Some(Value::Array(scenarios)) = result.get("scenarios") {
        let rows = scenarios
            .iter()
            .map(|s| {
                vec![
                    field(s, &["scenario_type"]),
                    field(s, &["result", "solver_type"]),
                    field(s, &["is_feasible"]),
                    field(s, &["result", "feasibility_score"]),
                    field(s, &["summary", "goal_total"]),
                    field(s, &["summary", "debt_extra_total"]),
                    field(s, &["summary", "flexible_total"]),
                    field(s, &["summary", "surplus"]),
                    field(s, &["summary", "savings_rate"]),
                ]
            })
            .collect();
        return Some((
            headers(&[
                "scenario", "solver", "feasible", "score", "goals", "debt_extra", "flexible",
                "surplus", "savings_rate",
            ]),
            rows,
        ));
    }

    if let Some(Value::Array(scores)) = result.get("scores") {
        let rows = scores
            .iter()
            .map(|s| {
                vec![
                    field(s, &["requested"]),
                    field(s, &["solver_type"]),
                    field(s, &["achieved_goals"]),
                    field(s, &["feasibility_score"]),
                ]
            })
            .collect();
        return Some((
            headers(&["requested", "solver", "achieved_goals", "score"]),
            rows,
        ));
    }

    if let Some(Value::Object(categories)) = result.get("category_allocations") {
        let mut rows: Vec<Vec<String>> = categories
            .iter()
            .map(|(id, amount)| vec!["category".into(), id.clone(), format_value(amount)])
            .collect();
        if let Some(Value::Object(debts)) = result.get("debt_allocations") {
            rows.extend(debts.iter().map(|(id, d)| {
                vec!["debt".into(), id.clone(), field(d, &["total_payment"])]
            }));
        }
        if let Some(Value::Object(goals)) = result.get("goal_allocations") {
            rows.extend(
                goals
                    .iter()
                    .map(|(id, amount)| vec!["goal".into(), id.clone(), format_value(amount)]),
            );
        }
        rows.push(vec!["surplus".into(), String::new(), field(result, &["surplus"])]);
        return Some((headers(&["kind", "id", "amount"]), rows));
    }

    None
}

/// Walk `path` into `value` and format the leaf, empty when missing.
pub(crate) fn field(value: &Value, path: &[&str]) -> String {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .map(format_value)
        .unwrap_or_default()
}

pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(format_value).collect();
            items.join(", ")
        }
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
