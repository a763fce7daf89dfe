//! Parameter file loading.
//!
//! # JSON Format
//!
//! ```json
//! {
//!     "configuration": "stereo",
//!     "volume": 0.01,
//!     "low_frequency": 2000,
//!     "low_order": 8,
//!     "low_eq_59Hz": 6.0,
//!     "woofer_protection": true
//! }
//! ```
//!
//! Values must be numbers, strings, or booleans.

use serde_json::Value;
use std::path::Path;

use xover_core::ParameterSet;

use crate::error::ConfigError;

/// Parse a parameter set from JSON text.
pub fn parse_parameters(json: &str) -> Result<ParameterSet, ConfigError> {
    let value: Value = serde_json::from_str(json)?;
    let found = match &value {
        Value::Object(_) => return Ok(serde_json::from_value(value)?),
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
    };
    Err(ConfigError::NotAnObject(found))
}

/// Load a parameter set from a JSON file.
pub fn load_parameters(path: impl AsRef<Path>) -> Result<ParameterSet, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    parse_parameters(&content)
}
