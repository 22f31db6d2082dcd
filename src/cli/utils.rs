use anyhow::Context;
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;

use crate::cli::OutputFormat;

/// Print a payload: pretty JSON in `--json` mode, the message plus a compact
/// rendering in text mode.
pub fn output_data<T: Serialize>(output_format: &OutputFormat, message: &str, data: &T) -> anyhow::Result<()> {
    let value = serde_json::to_value(data)?;
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "success": true, "data": value }))?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
            print_text(&value);
        }
    }
    Ok(())
}

pub fn output_success(output_format: &OutputFormat, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ "success": true, "message": message }))?);
        }
        OutputFormat::Text => println!("✓ {}", message),
    }
    Ok(())
}

pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({ "success": false, "error": message });
            if let Some(code) = error_code {
                response["code"] = json!(code);
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => eprintln!("Error: {}", message),
    }
    Ok(())
}

fn print_text(value: &Value) {
    match value {
        Value::Array(items) if items.is_empty() => println!("(none)"),
        Value::Array(items) => {
            for item in items {
                println!("- {}", summarize(item));
            }
        }
        Value::Object(map) => {
            for (key, field) in map {
                match field {
                    Value::Object(_) | Value::Array(_) => println!("{}: {}", key, field),
                    Value::String(s) => println!("{}: {}", key, s),
                    other => println!("{}: {}", key, other),
                }
            }
        }
        other => println!("{}", other),
    }
}

/// One-line description of a list item: its id and best human label.
fn summarize(item: &Value) -> String {
    let id = item.get("id").and_then(Value::as_str).unwrap_or("-");
    let label = ["name", "email", "promo_code", "label"]
        .iter()
        .find_map(|key| item.get(*key).and_then(Value::as_str))
        .unwrap_or("");
    format!("{} {}", id, label).trim_end().to_string()
}

/// JSON body from an inline argument, or from a file when prefixed with `@`.
pub fn read_body(raw: &str) -> anyhow::Result<Value> {
    let text = match raw.strip_prefix('@') {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {}", path))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text).context("body is not valid JSON")
}
