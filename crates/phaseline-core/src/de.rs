//! Lenient field deserializers for loosely typed source exports.
//!
//! Spreadsheet exports put numbers where strings are expected and the other
//! way around. These helpers accept whatever JSON scalar shows up and fall
//! back to an empty value instead of failing the whole record.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::TaskStatus;

/// Render a JSON scalar as text. Objects and arrays have no text form.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Interpret a JSON scalar as a number (numeric strings included)
pub fn scalar_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn optional_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_text(&value))
}

pub fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    optional_string(deserializer).map(Option::unwrap_or_default)
}

pub fn optional_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(scalar_number(&value))
}

pub fn number_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    optional_number(deserializer).map(|n| n.unwrap_or(0.0))
}

/// Canonical code or source label; anything else is `NotStarted`
pub fn status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TaskStatus, D::Error> {
    let label = optional_string(deserializer)?;
    Ok(label.map(|l| TaskStatus::resolve(&l)).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "string_or_empty")]
        text: String,
        #[serde(default, deserialize_with = "number_or_zero")]
        amount: f64,
        #[serde(default, deserialize_with = "status")]
        status: TaskStatus,
    }

    fn row(json: &str) -> Row {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn numbers_become_text() {
        assert_eq!(row(r#"{"text": 42}"#).text, "42");
        assert_eq!(row(r#"{"text": null}"#).text, "");
        assert_eq!(row(r#"{}"#).text, "");
    }

    #[test]
    fn numeric_strings_become_numbers() {
        assert_eq!(row(r#"{"amount": "75"}"#).amount, 75.0);
        assert_eq!(row(r#"{"amount": 12.5}"#).amount, 12.5);
        assert_eq!(row(r#"{"amount": "n/a"}"#).amount, 0.0);
        assert_eq!(row(r#"{"amount": [1]}"#).amount, 0.0);
    }

    #[test]
    fn status_accepts_codes_and_labels() {
        assert_eq!(row(r#"{"status": "at-risk"}"#).status, TaskStatus::AtRisk);
        assert_eq!(row(r#"{"status": "Concluído"}"#).status, TaskStatus::Completed);
        assert_eq!(row(r#"{"status": 3}"#).status, TaskStatus::NotStarted);
    }
}
