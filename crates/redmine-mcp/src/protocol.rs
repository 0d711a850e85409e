//! MCP protocol types based on JSON-RPC 2.0.
//!
//! The Model Context Protocol uses JSON-RPC 2.0 for communication.
//! This module holds the envelope codec (parse, validate, extract) and the
//! message types for request/response handling.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EnvelopeError, ErrorCode, ParseFailure};

/// JSON-RPC version constant.
pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version.
pub const MCP_VERSION: &str = "2024-11-05";

/// Notification sent by clients once the handshake completes.
pub const NOTIFICATION_INITIALIZED: &str = "notifications/initialized";

/// Decode raw bytes into a JSON value.
///
/// Only checks that the bytes are well-formed JSON; the version invariant is
/// enforced by [`validate`].
pub fn parse(raw: &[u8]) -> Result<Value, ParseFailure> {
    Ok(serde_json::from_slice(raw)?)
}

/// True only for an object whose `jsonrpc` member is exactly `"2.0"`.
pub fn validate(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_object)
        .and_then(|obj| obj.get("jsonrpc"))
        .and_then(Value::as_str)
        == Some(JSONRPC_VERSION)
}

/// Id of an object whose `id` member has a valid type.
///
/// Used to address error responses for requests that failed validation.
pub fn recover_id(value: &Value) -> Option<RequestId> {
    value
        .as_object()
        .and_then(|obj| obj.get("id"))
        .and_then(RequestId::from_value)
}

/// Request ID - can be string, number, or null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(serde_json::Number),
    Null,
}

impl RequestId {
    /// Convert a JSON value, rejecting objects, arrays and booleans.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RequestId::String(s.clone())),
            Value::Number(n) => Some(RequestId::Number(n.clone())),
            Value::Null => Some(RequestId::Null),
            _ => None,
        }
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n.into())
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::Null => write!(f, "null"),
        }
    }
}

/// A validated JSON-RPC request.
///
/// `id == None` means the member was absent, which marks a notification.
/// A present `"id": null` is still a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: String,
    pub params: Map<String, Value>,
    pub id: Option<RequestId>,
}

impl Request {
    /// Extract method, params and id from a value that passed [`validate`].
    pub fn from_value(value: Value) -> Result<Self, EnvelopeError> {
        let Value::Object(mut obj) = value else {
            return Err(EnvelopeError::InvalidMethod);
        };

        let method = match obj.remove("method") {
            Some(Value::String(method)) => method,
            _ => return Err(EnvelopeError::InvalidMethod),
        };

        let params = match obj.remove("params") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(params)) => params,
            Some(_) => return Err(EnvelopeError::InvalidParams),
        };

        let id = match obj.remove("id") {
            None => None,
            Some(id) => Some(RequestId::from_value(&id).ok_or(EnvelopeError::InvalidId)?),
        };

        Ok(Self { method, params, id })
    }

    /// Whether the message must not be answered.
    pub fn is_notification(&self) -> bool {
        self.id.is_none() || self.method == NOTIFICATION_INITIALIZED
    }
}

/// Methods the server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Initialize,
    ToolsList,
    ToolsCall,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "initialize" => Some(Method::Initialize),
            "tools/list" => Some(Method::ToolsList),
            "tools/call" => Some(Method::ToolsCall),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Initialize => "initialize",
            Method::ToolsList => "tools/list",
            Method::ToolsCall => "tools/call",
        }
    }
}

/// JSON-RPC response message.
///
/// Exactly one of `result` and `error` is set; use the constructors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a successful response.
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub const PARSE_ERROR: i32 = ErrorCode::ParseError.code();
    pub const INVALID_REQUEST: i32 = ErrorCode::InvalidRequest.code();
    pub const METHOD_NOT_FOUND: i32 = ErrorCode::MethodNotFound.code();
    pub const INVALID_PARAMS: i32 = ErrorCode::InvalidParams.code();
    pub const INTERNAL_ERROR: i32 = ErrorCode::InternalError.code();
    pub const SERVER_ERROR: i32 = ErrorCode::ServerError.code();

    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn parse_error(detail: &str) -> Self {
        Self::new(ErrorCode::ParseError, "Parse error")
            .with_data(serde_json::json!({ "detail": detail }))
    }

    pub fn invalid_request(msg: &str) -> Self {
        Self::new(
            ErrorCode::InvalidRequest,
            format!("Invalid JSON-RPC request: {}", msg),
        )
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotFound,
            format!("Method not found: {}", method),
        )
    }

    pub fn internal_error(msg: &str) -> Self {
        Self::new(ErrorCode::InternalError, format!("Internal error: {}", msg))
    }

    /// Known code of this error, if any.
    pub fn error_code(&self) -> Option<ErrorCode> {
        ErrorCode::from_code(self.code)
    }
}

// ============================================================================
// MCP-specific types
// ============================================================================

/// MCP initialization request params.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Client info.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// MCP initialization response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

/// Server capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    pub tools: ToolsCapability,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    pub list_changed: bool,
}

/// Server identity reported by `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub vendor: String,
}

impl ServerInfo {
    pub const DEFAULT_VENDOR: &'static str = "Custom";

    /// Identity of this build with the given vendor.
    pub fn new(vendor: impl Into<String>) -> Self {
        Self {
            name: "redmine-mcp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "MCP server exposing Redmine tickets, projects and wiki pages"
                .to_string(),
            vendor: vendor.into(),
        }
    }
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VENDOR)
    }
}

/// Tool definition for tools/list response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Tools list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsListResult {
    pub tools: Vec<ToolDefinition>,
}

/// Tool call result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallResult {
    pub content: Vec<ToolResultContent>,
}

/// Content in tool result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ToolResultContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolCallResult {
    /// Create a successful text result.
    pub fn text(content: String) -> Self {
        Self {
            content: vec![ToolResultContent::Text { text: content }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse() {
        assert!(parse(br#"{"jsonrpc":"2.0"}"#).is_ok());
        assert!(parse(b"[1, 2]").is_ok());
        assert!(parse(b"{not json").is_err());
        assert!(parse(b"").is_err());
    }

    #[test]
    fn test_validate() {
        assert!(validate(Some(&json!({"jsonrpc": "2.0", "method": "x"}))));
        assert!(!validate(Some(&json!({"jsonrpc": "1.0", "method": "x"}))));
        assert!(!validate(Some(&json!({"jsonrpc": 2.0, "method": "x"}))));
        assert!(!validate(Some(&json!({"method": "x"}))));
        assert!(!validate(Some(&json!([{"jsonrpc": "2.0"}]))));
        assert!(!validate(Some(&Value::Null)));
        assert!(!validate(None));
    }

    #[test]
    fn test_recover_id() {
        assert_eq!(
            recover_id(&json!({"jsonrpc": "1.0", "id": 7})),
            Some(RequestId::from(7))
        );
        assert_eq!(
            recover_id(&json!({"id": "abc"})),
            Some(RequestId::from("abc"))
        );
        assert_eq!(recover_id(&json!({"id": null})), Some(RequestId::Null));
        assert_eq!(recover_id(&json!({"id": {"nested": 1}})), None);
        assert_eq!(recover_id(&json!({"method": "x"})), None);
        assert_eq!(recover_id(&json!("string")), None);
    }

    #[test]
    fn test_request_from_value() {
        let req = Request::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": {"name": "list_redmine_projects"}
        }))
        .unwrap();

        assert_eq!(req.method, "tools/call");
        assert_eq!(req.id, Some(RequestId::from(1)));
        assert_eq!(req.params["name"], "list_redmine_projects");
        assert!(!req.is_notification());
    }

    #[test]
    fn test_request_params_default_to_empty() {
        let req = Request::from_value(json!({"jsonrpc": "2.0", "id": 1, "method": "x"})).unwrap();
        assert!(req.params.is_empty());

        let req = Request::from_value(json!({
            "jsonrpc": "2.0", "id": 1, "method": "x", "params": null
        }))
        .unwrap();
        assert!(req.params.is_empty());
    }

    #[test]
    fn test_request_envelope_errors() {
        assert_eq!(
            Request::from_value(json!({"jsonrpc": "2.0", "id": 1})),
            Err(EnvelopeError::InvalidMethod)
        );
        assert_eq!(
            Request::from_value(json!({"jsonrpc": "2.0", "id": 1, "method": 5})),
            Err(EnvelopeError::InvalidMethod)
        );
        assert_eq!(
            Request::from_value(json!({"jsonrpc": "2.0", "id": 1, "method": "x", "params": [1]})),
            Err(EnvelopeError::InvalidParams)
        );
        assert_eq!(
            Request::from_value(json!({"jsonrpc": "2.0", "id": true, "method": "x"})),
            Err(EnvelopeError::InvalidId)
        );
    }

    #[test]
    fn test_notification_detection() {
        let no_id = Request::from_value(json!({"jsonrpc": "2.0", "method": "ping"})).unwrap();
        assert!(no_id.is_notification());

        let null_id =
            Request::from_value(json!({"jsonrpc": "2.0", "id": null, "method": "ping"})).unwrap();
        assert_eq!(null_id.id, Some(RequestId::Null));
        assert!(!null_id.is_notification());

        let initialized = Request::from_value(json!({
            "jsonrpc": "2.0", "id": 3, "method": NOTIFICATION_INITIALIZED
        }))
        .unwrap();
        assert!(initialized.is_notification());
    }

    #[test]
    fn test_method_names() {
        for method in [Method::Initialize, Method::ToolsList, Method::ToolsCall] {
            assert_eq!(Method::from_name(method.as_str()), Some(method));
        }
        assert_eq!(Method::from_name("ping"), None);
        assert_eq!(Method::from_name("Initialize"), None);
    }

    #[test]
    fn test_response_success() {
        let resp = JsonRpcResponse::success(RequestId::from("abc"), json!({"ok": true}));
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json, json!({"jsonrpc": "2.0", "id": "abc", "result": {"ok": true}}));
    }

    #[test]
    fn test_response_error() {
        let resp = JsonRpcResponse::error(RequestId::from(1), JsonRpcError::method_not_found("test"));
        let json = serde_json::to_value(&resp).unwrap();

        assert!(json.get("result").is_none());
        assert_eq!(json["error"]["code"], JsonRpcError::METHOD_NOT_FOUND);
        assert_eq!(json["error"]["message"], "Method not found: test");
        assert!(json["error"].get("data").is_none());
    }

    #[test]
    fn test_parse_error_carries_detail() {
        let err = JsonRpcError::parse_error("expected value at line 1");
        assert_eq!(err.code, JsonRpcError::PARSE_ERROR);
        assert_eq!(err.data, Some(json!({"detail": "expected value at line 1"})));
        assert_eq!(err.error_code(), Some(ErrorCode::ParseError));
    }

    #[test]
    fn test_request_id_serialization() {
        assert_eq!(serde_json::to_string(&RequestId::from(42)).unwrap(), "42");
        assert_eq!(serde_json::to_string(&RequestId::from("abc")).unwrap(), "\"abc\"");
        assert_eq!(serde_json::to_string(&RequestId::Null).unwrap(), "null");

        let float = RequestId::from_value(&json!(1.5)).unwrap();
        assert_eq!(serde_json::to_string(&float).unwrap(), "1.5");
    }

    #[test]
    fn test_initialize_result_shape() {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: true },
            },
            server_info: ServerInfo::new("Acme"),
        };
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["protocolVersion"], "2024-11-05");
        assert_eq!(json["capabilities"]["tools"]["listChanged"], true);
        assert_eq!(json["serverInfo"]["name"], "redmine-mcp");
        assert_eq!(json["serverInfo"]["vendor"], "Acme");
    }

    #[test]
    fn test_tool_call_result() {
        let result = ToolCallResult::text("Hello".to_string());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, json!({"content": [{"type": "text", "text": "Hello"}]}));
    }
}
