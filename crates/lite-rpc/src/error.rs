use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::error_codes;
use crate::types::{JsonRpcVersion, RequestId};
use crate::validator::ValidationError;

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    Application(i64), // -32099 to -32000
}

impl JsonRpcErrorCode {
    /// Checked constructor for application codes
    pub fn application(code: i64) -> Result<Self, InvalidErrorCode> {
        if is_application_code(code) {
            Ok(JsonRpcErrorCode::Application(code))
        } else {
            Err(InvalidErrorCode(code))
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::Application(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::Application(_) => "Server error",
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            JsonRpcErrorCode::Application(code) => is_application_code(*code),
            _ => true,
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

fn is_application_code(code: i64) -> bool {
    (error_codes::APPLICATION_ERROR_START..=error_codes::APPLICATION_ERROR_END).contains(&code)
}

/// Raised when an error code outside the application range is used to build an [`RpcError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error(
    "Error code {0} is outside the application range {start}..={end}",
    start = error_codes::APPLICATION_ERROR_START,
    end = error_codes::APPLICATION_ERROR_END
)]
pub struct InvalidErrorCode(pub i64);

/// Structured error raised by handlers (or error mappers) to choose the
/// public error code and message.
///
/// The code is always one of the five protocol codes or lies in the
/// application range; there is no way to build an `RpcError` otherwise.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} ({})", .code.code())]
pub struct RpcError {
    code: JsonRpcErrorCode,
    message: String,
    data: Option<Value>,
}

impl RpcError {
    pub fn new(code: JsonRpcErrorCode, message: impl Into<String>) -> Result<Self, InvalidErrorCode> {
        if !code.is_valid() {
            return Err(InvalidErrorCode(code.code()));
        }
        Ok(Self::from_valid(code, message.into()))
    }

    /// Application error from a raw code in `-32099..=-32000`.
    pub fn application(code: i64, message: impl Into<String>) -> Result<Self, InvalidErrorCode> {
        let code = JsonRpcErrorCode::application(code)?;
        Ok(Self::from_valid(code, message.into()))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::from_valid(JsonRpcErrorCode::InternalError, message.into())
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn code(&self) -> i64 {
        self.code.code()
    }

    pub fn kind(&self) -> JsonRpcErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    fn from_valid(code: JsonRpcErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            data: None,
        }
    }
}

/// Failure produced while validating params or running a handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Structured error; its code and message are sent verbatim
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Anything else, handed to the dispatcher's error mapper
    #[error(transparent)]
    Failure(BoxError),
}

/// Owned, thread-safe error value passed to error mappers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

impl HandlerError {
    pub fn failure(error: impl Into<BoxError>) -> Self {
        HandlerError::Failure(error.into())
    }

    /// Short label for logs. The error text may echo client params, so it
    /// stays out of log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerError::Rpc(_) => "rpc error",
            HandlerError::Validation(_) => "validation error",
            HandlerError::Failure(_) => "unclassified failure",
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(error: serde_json::Error) -> Self {
        HandlerError::Failure(Box::new(error))
    }
}

/// JSON-RPC Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(JsonRpcErrorCode::ParseError, None, None)
    }

    pub fn invalid_request() -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, None, None)
    }

    pub fn method_not_found() -> Self {
        Self::new(JsonRpcErrorCode::MethodNotFound, None, None)
    }

    pub fn invalid_params(message: &str) -> Self {
        Self::new(
            JsonRpcErrorCode::InvalidParams,
            Some(message.to_string()),
            None,
        )
    }

    pub fn internal_error(message: Option<String>) -> Self {
        Self::new(JsonRpcErrorCode::InternalError, message, None)
    }
}

impl From<RpcError> for JsonRpcErrorObject {
    fn from(error: RpcError) -> Self {
        Self {
            code: error.code(),
            message: error.message,
            data: error.data,
        }
    }
}

/// JSON-RPC error envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub id: Option<RequestId>,
    pub error: JsonRpcErrorObject,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            id,
            error,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorObject::parse_error())
    }

    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_request())
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(JsonRpcErrorCode::ParseError.code(), -32700);
        assert_eq!(JsonRpcErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(JsonRpcErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(JsonRpcErrorCode::InvalidParams.code(), -32602);
        assert_eq!(JsonRpcErrorCode::InternalError.code(), -32603);
    }

    #[test]
    fn test_application_code_range() {
        assert!(RpcError::application(-32000, "ok").is_ok());
        assert!(RpcError::application(-32099, "ok").is_ok());
        assert_eq!(
            RpcError::application(-31999, "too high"),
            Err(InvalidErrorCode(-31999))
        );
        assert_eq!(
            RpcError::application(-32100, "too low"),
            Err(InvalidErrorCode(-32100))
        );
        // protocol codes are not assignable as raw integers
        assert!(RpcError::application(-32603, "reserved").is_err());
    }

    #[test]
    fn test_unchecked_variant_is_rejected() {
        let err = RpcError::new(JsonRpcErrorCode::Application(-1), "nope").unwrap_err();
        assert_eq!(err, InvalidErrorCode(-1));

        let ok = RpcError::new(JsonRpcErrorCode::InternalError, "boom").unwrap();
        assert_eq!(ok.code(), -32603);
        assert_eq!(ok.message(), "boom");
    }

    #[test]
    fn test_error_serialization() {
        let error = JsonRpcError::new(
            Some(RequestId::from("rpc_2")),
            JsonRpcErrorObject::method_not_found(),
        );
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": "rpc_2",
                "error": {"code": -32601, "message": "Method not found"}
            })
        );
    }

    #[test]
    fn test_rpc_error_into_object_keeps_data() {
        let error = RpcError::application(-32001, "quota exceeded")
            .unwrap()
            .with_data(serde_json::json!({"limit": 10}));
        let object = JsonRpcErrorObject::from(error);
        assert_eq!(object.code, -32001);
        assert_eq!(object.message, "quota exceeded");
        assert_eq!(object.data, Some(serde_json::json!({"limit": 10})));
    }
}
