//! JSON-RPC error taxonomy and dispatch failures.
//!
//! Every failure a client can observe maps onto exactly one [`ErrorCode`].
//! Upstream HTTP statuses are not part of the code; they only appear in the
//! message text of [`ErrorCode::ServerError`] responses.

use thiserror::Error;

use crate::protocol::JsonRpcError;

/// Fixed JSON-RPC error codes used by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Request body is not valid JSON
    ParseError,
    /// JSON is not a valid JSON-RPC 2.0 request
    InvalidRequest,
    /// Unknown method or tool name
    MethodNotFound,
    /// Missing or empty required parameter
    InvalidParams,
    /// Unexpected failure inside the server
    InternalError,
    /// Redmine reported an error
    ServerError,
}

impl ErrorCode {
    pub const ALL: [ErrorCode; 6] = [
        ErrorCode::ParseError,
        ErrorCode::InvalidRequest,
        ErrorCode::MethodNotFound,
        ErrorCode::InvalidParams,
        ErrorCode::InternalError,
        ErrorCode::ServerError,
    ];

    /// Integer code sent on the wire.
    pub const fn code(self) -> i32 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
            ErrorCode::ServerError => -32000,
        }
    }

    /// Look up a wire code.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Human-readable meaning of the code.
    pub const fn meaning(self) -> &'static str {
        match self {
            ErrorCode::ParseError => "malformed request body",
            ErrorCode::InvalidRequest => "invalid JSON-RPC envelope",
            ErrorCode::MethodNotFound => "unknown method or tool",
            ErrorCode::InvalidParams => "missing or empty required parameter",
            ErrorCode::InternalError => "internal error during dispatch",
            ErrorCode::ServerError => "Redmine API error",
        }
    }
}

/// Raw bytes were not well-formed JSON.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ParseFailure(#[from] serde_json::Error);

/// A versioned JSON object that still is not a usable request.
#[derive(Debug, Error, PartialEq)]
pub enum EnvelopeError {
    #[error("method must be a string")]
    InvalidMethod,
    #[error("params must be an object")]
    InvalidParams,
    #[error("id must be a string, number or null")]
    InvalidId,
}

/// Failure while handling a routed request.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{0}")]
    InvalidParams(String),

    #[error("{0}")]
    MethodNotFound(String),

    /// Failure reported by the issue tracker; the message is passed through.
    #[error(transparent)]
    Tracker(#[from] redmine_core::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    pub fn invalid_params(message: impl Into<String>) -> Self {
        DispatchError::InvalidParams(message.into())
    }

    pub fn unknown_method(method: &str) -> Self {
        DispatchError::MethodNotFound(format!("Method not found: {}", method))
    }

    pub fn unknown_tool(name: &str) -> Self {
        DispatchError::MethodNotFound(format!("unsupported tool: {}", name))
    }

    /// Error code reported to the client.
    pub fn code(&self) -> ErrorCode {
        match self {
            DispatchError::InvalidParams(_) => ErrorCode::InvalidParams,
            DispatchError::MethodNotFound(_) => ErrorCode::MethodNotFound,
            DispatchError::Tracker(_) => ErrorCode::ServerError,
            DispatchError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Convert into the wire error object.
    pub fn into_rpc_error(self) -> JsonRpcError {
        JsonRpcError::new(self.code(), self.to_string())
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(e: serde_json::Error) -> Self {
        DispatchError::Internal(format!("Serialization error: {}", e))
    }
}
