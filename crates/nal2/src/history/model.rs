use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Function name recorded when none can be extracted from a record's input
pub const UNKNOWN_FUNCTION: &str = "unknown";

/// Millisecond-timestamp identifier of a history record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryId(i64);

impl HistoryId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for HistoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn empty() -> Value {
    Value::String(String::new())
}

/// The last call a client staged or ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentParams {
    #[serde(default = "empty")]
    pub input: Value,
    #[serde(default = "empty")]
    pub output: Value,
}

impl Default for CurrentParams {
    fn default() -> Self {
        Self {
            input: empty(),
            output: empty(),
        }
    }
}

impl CurrentParams {
    /// Missing or null values are stored as empty strings.
    pub fn new(input: Option<Value>, output: Option<Value>) -> Self {
        Self {
            input: input.filter(|v| !v.is_null()).unwrap_or_else(empty),
            output: output.filter(|v| !v.is_null()).unwrap_or_else(empty),
        }
    }
}

/// One saved call, keyed by function name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: HistoryId,
    pub function: String,
    #[serde(default = "empty")]
    pub input: Value,
    #[serde(default = "empty")]
    pub output: Value,
    /// RFC 3339
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Partial update of a history record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryPatch {
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
}

/// The persisted store document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryDocument {
    #[serde(default)]
    pub current_params: CurrentParams,
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
}

/// Outcome of saving a record
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRecord {
    pub record: HistoryRecord,
    /// True when an existing record for the same function was overwritten
    pub updated: bool,
}

/// Function name carried by a call envelope, given as an object or as JSON text.
pub fn extract_function(input: &Value) -> String {
    let parsed;
    let envelope = match input {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => {
                parsed = value;
                &parsed
            }
            Err(_) => return UNKNOWN_FUNCTION.to_string(),
        },
        other => other,
    };
    envelope
        .get("function")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_FUNCTION)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_function() {
        assert_eq!(extract_function(&json!({"function": "GetMLE"})), "GetMLE");
        assert_eq!(
            extract_function(&json!("{\"function\": \"SetGender\"}")),
            "SetGender"
        );
        assert_eq!(extract_function(&json!("not json")), UNKNOWN_FUNCTION);
        assert_eq!(extract_function(&json!({"sequence_num": 1})), UNKNOWN_FUNCTION);
        assert_eq!(extract_function(&Value::Null), UNKNOWN_FUNCTION);
    }

    #[test]
    fn test_document_wire_format() {
        let document = HistoryDocument::default();
        assert_eq!(
            serde_json::to_value(&document).unwrap(),
            json!({"currentParams": {"input": "", "output": ""}, "history": []})
        );

        let parsed: HistoryDocument = serde_json::from_value(json!({
            "history": [{"id": 5, "function": "GetMLE", "timestamp": "2024-01-01T00:00:00Z"}]
        }))
        .unwrap();
        assert_eq!(parsed.history[0].id, HistoryId::new(5));
        assert_eq!(parsed.history[0].input, json!(""));
        assert_eq!(parsed.current_params, CurrentParams::default());
    }
}
