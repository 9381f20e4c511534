//! JSON message protocol for method calls between a client and the server.
//!
//! A call names a method and carries its arguments as a JSON object. Byte
//! payloads travel as standard base64 strings.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A named method call with keyword arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            args: Map::new(),
        }
    }

    /// Adds one argument.
    pub fn arg(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.args.insert(name.to_string(), value.into());
        self
    }

    /// Adds a byte payload, base64-encoded.
    pub fn bytes_arg(self, name: &str, data: &[u8]) -> Self {
        let encoded = STANDARD.encode(data);
        self.arg(name, encoded)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// String argument; absent, `null` and empty strings read as `None`.
    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.args
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Integer argument; absent or non-integer values read as `None`.
    pub fn int_arg(&self, name: &str) -> Option<i64> {
        self.args.get(name).and_then(Value::as_i64)
    }

    pub fn bool_arg(&self, name: &str) -> Option<bool> {
        self.args.get(name).and_then(Value::as_bool)
    }

    /// Base64 byte argument; absent or undecodable values read as `None`.
    pub fn bytes_arg_value(&self, name: &str) -> Option<Vec<u8>> {
        self.str_arg(name).and_then(|s| STANDARD.decode(s).ok())
    }
}

/// Encodes a byte payload as a base64 JSON string.
pub fn bytes_value(data: &[u8]) -> Value {
    Value::String(STANDARD.encode(data))
}

/// Short error codes returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArguments,
    ConversionError,
    InfoError,
    TrimError,
    WaveformError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ErrorCode::InvalidArguments => "INVALID_ARGUMENTS",
            ErrorCode::ConversionError => "CONVERSION_ERROR",
            ErrorCode::InfoError => "INFO_ERROR",
            ErrorCode::TrimError => "TRIM_ERROR",
            ErrorCode::WaveformError => "WAVEFORM_ERROR",
        };
        f.write_str(code)
    }
}

/// Outcome of a method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MethodResponse {
    Success { value: Value },
    Error { code: ErrorCode, message: String },
    /// The server does not know the method.
    NotImplemented,
}

impl MethodResponse {
    pub fn success(value: impl Into<Value>) -> Self {
        MethodResponse::Success {
            value: value.into(),
        }
    }

    /// Success carrying a byte payload as base64.
    pub fn bytes(data: &[u8]) -> Self {
        Self::success(bytes_value(data))
    }

    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        MethodResponse::Error {
            code,
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Decodes a base64 success value.
    pub fn decode_bytes(&self) -> Option<Vec<u8>> {
        match self {
            MethodResponse::Success { value } => {
                value.as_str().and_then(|s| STANDARD.decode(s).ok())
            }
            _ => None,
        }
    }
}
