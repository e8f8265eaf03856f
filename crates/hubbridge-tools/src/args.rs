//! Parsing of remote tool call arguments.

use crate::error::ConfigError;
use serde_json::{Map, Value};

/// Parse the arguments of a remote tool call.
///
/// Absent or blank input means no arguments. Anything other than a JSON
/// object is rejected.
pub fn parse_arguments(input: Option<&str>) -> Result<Value, ConfigError> {
    let input = match input.map(str::trim) {
        None | Some("") => return Ok(Value::Object(Map::new())),
        Some(input) => input,
    };

    match serde_json::from_str::<Value>(input) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(Value::Array(_)) => Err(ConfigError::InvalidArguments(
            "expected a JSON object, got an array".to_string(),
        )),
        Ok(other) => Err(ConfigError::InvalidArguments(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(e) => Err(ConfigError::InvalidArguments(format!(
            "arguments are not valid JSON: {e}"
        ))),
    }
}
