//! Decoding raw transport payloads into requests.

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::JsonRpcError;
use crate::request::JsonRpcRequest;
use crate::types::RequestId;

/// Parse a JSON string into a JSON-RPC request.
///
/// Malformed JSON yields `-32700`; anything that is valid JSON but not a
/// single well-formed request object (including batch arrays) yields
/// `-32600`, carrying the request id when it could be recovered.
pub fn parse_request(json_str: &str) -> Result<JsonRpcRequest, JsonRpcError> {
    let value: Value = serde_json::from_str(json_str).map_err(|e| {
        debug!(
            "Rejecting unparseable payload ({:?} at line {}, column {})",
            e.classify(),
            e.line(),
            e.column()
        );
        JsonRpcError::parse_error()
    })?;
    parse_request_value(value)
}

/// Validate an already-decoded JSON value as a JSON-RPC request.
pub fn parse_request_value(value: Value) -> Result<JsonRpcRequest, JsonRpcError> {
    let obj = match &value {
        Value::Object(obj) => obj,
        Value::Array(_) => {
            debug!("Rejecting batch payload, batch requests are not supported");
            return Err(JsonRpcError::invalid_request(None));
        }
        _ => return Err(JsonRpcError::invalid_request(None)),
    };

    let id = extract_id(obj)?;

    match obj.get("jsonrpc") {
        Some(version) if version == crate::JSONRPC_VERSION => {}
        _ => return Err(JsonRpcError::invalid_request(id)),
    }

    if !matches!(obj.get("method"), Some(Value::String(_))) {
        return Err(JsonRpcError::invalid_request(id));
    }

    serde_json::from_value::<JsonRpcRequest>(value).map_err(|e| {
        debug!("Rejecting malformed request ({:?})", e.classify());
        JsonRpcError::invalid_request(id)
    })
}

/// A present `id` must be a string or an integer.
fn extract_id(obj: &Map<String, Value>) -> Result<Option<RequestId>, JsonRpcError> {
    match obj.get("id") {
        None => Ok(None),
        Some(raw) => RequestId::from_value(raw)
            .map(Some)
            .ok_or_else(|| JsonRpcError::invalid_request(None)),
    }
}
