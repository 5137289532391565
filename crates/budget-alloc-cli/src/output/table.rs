use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{format_value, result_rows};

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    let Some(result) = value.get("result") else {
        print_flat_object(value);
        return;
    };

    match result_rows(result) {
        Some((headers, rows)) => {
            let mut builder = Builder::default();
            builder.push_record(headers);
            for row in rows {
                builder.push_record(row);
            }
            println!("{}", Table::from(builder));
        }
        None => print_flat_object(result),
    }

    if let Some(Value::String(reason)) = result.get("reason") {
        println!("\nRecommended: {} ({})", format_value(&result["recommended"]), reason);
    }

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                println!("  - {}", format_value(w));
            }
        }
    }

    if let Some(Value::String(meth)) = value.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        println!("{}", Table::from(builder));
    } else {
        println!("{}", format_value(value));
    }
}
