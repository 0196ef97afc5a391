//! Call request and response envelopes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::CallError;

/// Key under which application failures are reported.
pub const ERROR_KEY: &str = "error";

/// Untyped parameter mapping as carried on the wire.
pub type ParamMap = Map<String, Value>;

/// A named remote calculation call.
///
/// `sequence_num` is chosen by the caller and only has to be unique among
/// calls that are pending at the same time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    #[serde(default)]
    pub sequence_num: i64,
    #[serde(default)]
    pub function: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_parameters: Option<ParamMap>,
}

impl CallRequest {
    pub fn new(sequence_num: i64, function: impl Into<String>, input_parameters: ParamMap) -> Self {
        Self {
            sequence_num,
            function: function.into(),
            input_parameters: Some(input_parameters),
        }
    }
}

/// Result envelope of a call. `return_code` is `-1` exactly when the output
/// mapping carries an `error` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResponse {
    #[serde(default)]
    pub sequence_num: i64,
    #[serde(default)]
    pub function: String,
    #[serde(rename = "return", default)]
    pub return_code: i32,
    #[serde(default)]
    pub output_parameters: ParamMap,
}

impl CallResponse {
    /// Build a response from an output mapping, deriving the return code.
    pub fn from_outputs(sequence_num: i64, function: impl Into<String>, outputs: ParamMap) -> Self {
        let return_code = if outputs.contains_key(ERROR_KEY) { -1 } else { 0 };
        Self {
            sequence_num,
            function: function.into(),
            return_code,
            output_parameters: outputs,
        }
    }

    /// Build the failure envelope for `request`.
    pub fn failure(request: &CallRequest, error: &CallError) -> Self {
        Self::error(request.sequence_num, request.function.clone(), error.to_string())
    }

    pub fn error(sequence_num: i64, function: impl Into<String>, message: impl Into<String>) -> Self {
        let mut outputs = ParamMap::new();
        outputs.insert(ERROR_KEY.to_string(), Value::String(message.into()));
        Self::from_outputs(sequence_num, function, outputs)
    }

    pub fn is_success(&self) -> bool {
        self.return_code == 0
    }

    /// The reported error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.output_parameters.get(ERROR_KEY).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_return_code_follows_error_key() {
        let ok = CallResponse::from_outputs(3, "dllVersion", ParamMap::new());
        assert_eq!(ok.return_code, 0);

        let failed = CallResponse::error(3, "dllVersion", "boom");
        assert_eq!(failed.return_code, -1);
        assert_eq!(failed.error_message(), Some("boom"));
    }

    #[test]
    fn test_wire_names() {
        let response = CallResponse::from_outputs(7, "GetMLE", ParamMap::new());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({"sequence_num": 7, "function": "GetMLE", "return": 0, "output_parameters": {}})
        );
    }

    #[test]
    fn test_request_defaults() {
        let request: CallRequest = serde_json::from_value(json!({"function": "dllVersion"})).unwrap();
        assert_eq!(request.sequence_num, 0);
        assert!(request.input_parameters.is_none());
    }
}
