use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;

/// `{"success": .., <label>: message, ...extra}` with `extra` flattened in.
/// Non-object extras are nested under `data`.
fn envelope(success: bool, label: &str, message: &str, extra: Option<Value>) -> Value {
    let mut body = Map::new();
    body.insert("success".to_string(), json!(success));
    body.insert(label.to_string(), json!(message));
    match extra {
        Some(Value::Object(fields)) => body.extend(fields),
        Some(Value::Null) | None => {}
        Some(other) => {
            body.insert("data".to_string(), other);
        }
    }
    Value::Object(body)
}

pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&envelope(true, "message", message, data))?),
        OutputFormat::Text => println!("✓ {}", message),
    }
    Ok(())
}

pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let code = error_code.map(|code| json!({ "code": code }));
            println!("{}", serde_json::to_string_pretty(&envelope(false, "error", message, code))?);
        }
        OutputFormat::Text => eprintln!("Error: {}", message),
    }
    Ok(())
}

/// Whole documents (config dumps): pretty JSON, or YAML for humans
pub fn output_document<T: Serialize>(output_format: &OutputFormat, document: &T) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(document)?),
        OutputFormat::Text => print!("{}", serde_yaml::to_string(document)?),
    }
    Ok(())
}
