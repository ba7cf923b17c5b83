//! JSON-RPC 2.0 envelope validation.

use serde_json::Value;

use crate::error::{GatewayError, Result};

const SUPPORTED_JSONRPC_VERSION: &str = "2.0";

/// A validated JSON-RPC request, with the optional chain/network extensions
/// some providers expect alongside the standard envelope.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    /// The JSON-RPC method name.
    pub method: String,
    /// Request parameters, if any.
    pub params: Option<Value>,
    /// The client-supplied request id, echoed back verbatim.
    pub id: Value,
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Optional chain hint, outside the JSON-RPC 2.0 envelope proper.
    pub chain: Option<String>,
    /// Optional network hint, outside the JSON-RPC 2.0 envelope proper.
    pub network: Option<String>,
    /// The original, unvalidated payload, preserved for providers that force-route.
    pub raw_payload: Value,
}

/// Method-shape classification used only by analytics; never affects routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodCategory {
    /// `eth_get*`
    Read,
    /// `eth_send*`
    Write,
    /// `eth_call`, `eth_estimateGas`
    Call,
    /// `eth_blockNumber`, `eth_gasPrice`
    Info,
    /// Anything else.
    Other,
}

/// Classifies `method` into a [`MethodCategory`] for analytics only.
pub fn categorize(method: &str) -> MethodCategory {
    if method.starts_with("eth_get") {
        MethodCategory::Read
    } else if method.starts_with("eth_send") {
        MethodCategory::Write
    } else if matches!(method, "eth_call" | "eth_estimateGas") {
        MethodCategory::Call
    } else if matches!(method, "eth_blockNumber" | "eth_gasPrice") {
        MethodCategory::Info
    } else {
        MethodCategory::Other
    }
}

/// Validates and extracts a JSON-RPC 2.0 request from `payload`.
pub fn parse(payload: &Value) -> Result<ParsedRequest> {
    let obj = payload
        .as_object()
        .ok_or_else(|| GatewayError::InvalidRequest("payload must be a JSON object".into()))?;

    let jsonrpc = obj
        .get("jsonrpc")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::InvalidRequest("missing field: jsonrpc".into()))?;
    if jsonrpc != SUPPORTED_JSONRPC_VERSION {
        return Err(GatewayError::InvalidRequest(format!(
            "unsupported jsonrpc version: {jsonrpc}"
        )));
    }

    let method = obj
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::InvalidRequest("missing field: method".into()))?;
    if method.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(
            "method is required and cannot be empty".into(),
        ));
    }

    let id = obj
        .get("id")
        .cloned()
        .ok_or_else(|| GatewayError::InvalidRequest("missing field: id".into()))?;
    if !(id.is_number() || id.is_string()) {
        return Err(GatewayError::InvalidRequest(
            "id must be a number or string".into(),
        ));
    }

    let params = match obj.get("params") {
        Some(v) if v.is_array() || v.is_object() => Some(v.clone()),
        Some(_) => {
            return Err(GatewayError::InvalidRequest(
                "params must be an array or object".into(),
            ))
        }
        None => None,
    };

    Ok(ParsedRequest {
        method: method.to_string(),
        params,
        id,
        jsonrpc: jsonrpc.to_string(),
        chain: obj.get("chain").and_then(Value::as_str).map(String::from),
        network: obj
            .get("network")
            .and_then(Value::as_str)
            .map(String::from),
        raw_payload: payload.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_payload() -> Value {
        json!({"jsonrpc": "2.0", "method": "eth_blockNumber", "id": 1, "params": []})
    }

    #[test]
    fn parses_a_valid_request() {
        let parsed = parse(&valid_payload()).unwrap();
        assert_eq!(parsed.method, "eth_blockNumber");
        assert_eq!(parsed.jsonrpc, "2.0");
    }

    #[test]
    fn rejects_missing_jsonrpc() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove("jsonrpc");
        assert!(matches!(
            parse(&payload),
            Err(GatewayError::InvalidRequest(_))
        ));
    }

    #[test]
    fn rejects_wrong_jsonrpc_version() {
        let mut payload = valid_payload();
        payload["jsonrpc"] = json!("1.0");
        assert!(parse(&payload).is_err());
    }

    #[test]
    fn rejects_empty_method() {
        let mut payload = valid_payload();
        payload["method"] = json!("   ");
        assert!(parse(&payload).is_err());
    }

    #[test]
    fn rejects_non_string_method() {
        let mut payload = valid_payload();
        payload["method"] = json!(5);
        assert!(parse(&payload).is_err());
    }

    #[test]
    fn rejects_missing_id() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove("id");
        assert!(parse(&payload).is_err());
    }

    #[test]
    fn rejects_non_array_object_params() {
        let mut payload = valid_payload();
        payload["params"] = json!("not an array or object");
        assert!(parse(&payload).is_err());
    }

    #[test]
    fn accepts_object_params() {
        let mut payload = valid_payload();
        payload["params"] = json!({"block": "latest"});
        assert!(parse(&payload).is_ok());
    }

    #[test]
    fn category_classification() {
        assert_eq!(categorize("eth_getBalance"), MethodCategory::Read);
        assert_eq!(categorize("eth_sendRawTransaction"), MethodCategory::Write);
        assert_eq!(categorize("eth_call"), MethodCategory::Call);
        assert_eq!(categorize("eth_blockNumber"), MethodCategory::Info);
        assert_eq!(categorize("net_version"), MethodCategory::Other);
    }
}
