//! MCP request dispatcher.
//!
//! Every inbound message goes through the same steps:
//! 1. Parse - raw bytes to JSON
//! 2. Validate - JSON-RPC 2.0 envelope
//! 3. Route - `initialize`, `tools/list` or `tools/call`
//!
//! Each step has its own error code. Notifications are logged and never
//! answered. The dispatcher holds no per-connection state, so one instance
//! serves every transport concurrently.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use redmine_core::IssueTracker;
use serde_json::{Map, Value};

use crate::error::DispatchError;
use crate::handlers::{Arguments, ToolCall, ToolHandler};
use crate::protocol::{
    self, InitializeParams, InitializeResult, JsonRpcError, JsonRpcResponse, Method, Request,
    RequestId, ServerCapabilities, ServerInfo, ToolsCapability, ToolsListResult, MCP_VERSION,
};
use crate::tools::ToolRegistry;

/// Result of dispatching one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Send this response back.
    Respond(JsonRpcResponse),
    /// Notification; nothing is sent. `id` is set when the message carried one.
    Suppressed { id: Option<RequestId> },
}

impl Outcome {
    pub fn into_response(self) -> Option<JsonRpcResponse> {
        match self {
            Outcome::Respond(response) => Some(response),
            Outcome::Suppressed { .. } => None,
        }
    }
}

/// Routes JSON-RPC messages to the tool handlers.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    handler: ToolHandler,
    server_info: Arc<ServerInfo>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, tracker: Arc<dyn IssueTracker>) -> Self {
        Self {
            registry,
            handler: ToolHandler::new(tracker),
            server_info: Arc::new(ServerInfo::default()),
        }
    }

    /// Override the identity reported by `initialize`.
    pub fn with_server_info(mut self, server_info: ServerInfo) -> Self {
        self.server_info = Arc::new(server_info);
        self
    }

    /// Dispatch a raw message body.
    pub async fn handle_raw(&self, raw: &[u8]) -> Outcome {
        tracing::debug!(bytes = raw.len(), "Message received");

        match protocol::parse(raw) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to parse message");
                Outcome::Respond(JsonRpcResponse::error(
                    RequestId::Null,
                    JsonRpcError::parse_error(&e.to_string()),
                ))
            }
        }
    }

    /// Dispatch an already decoded message.
    pub async fn handle_value(&self, value: Value) -> Outcome {
        let recovered = protocol::recover_id(&value);

        if !protocol::validate(Some(&value)) {
            tracing::warn!(id = ?recovered, "Rejected message without jsonrpc 2.0 envelope");
            return Outcome::Respond(JsonRpcResponse::error(
                recovered.unwrap_or(RequestId::Null),
                JsonRpcError::invalid_request("jsonrpc must be \"2.0\""),
            ));
        }

        let dispatched = AssertUnwindSafe(self.dispatch(value, recovered.clone()))
            .catch_unwind()
            .await;

        match dispatched {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(&*panic);
                tracing::error!(error = %message, "Panic while handling request");
                Outcome::Respond(JsonRpcResponse::error(
                    recovered.unwrap_or(RequestId::Null),
                    JsonRpcError::internal_error(&message),
                ))
            }
        }
    }

    async fn dispatch(&self, value: Value, recovered: Option<RequestId>) -> Outcome {
        let request = match Request::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid request envelope");
                return Outcome::Respond(JsonRpcResponse::error(
                    recovered.unwrap_or(RequestId::Null),
                    JsonRpcError::invalid_request(&e.to_string()),
                ));
            }
        };

        if request.is_notification() {
            self.handle_notification(&request.method);
            return Outcome::Suppressed { id: request.id };
        }

        let id = request.id.clone().unwrap_or(RequestId::Null);
        tracing::debug!(method = %request.method, id = %id, "Handling request");

        match self.route(&request).await {
            Ok(result) => Outcome::Respond(JsonRpcResponse::success(id, result)),
            Err(e) => {
                let code = e.code();
                tracing::warn!(
                    method = %request.method,
                    id = %id,
                    code = code.code(),
                    reason = code.meaning(),
                    error = %e,
                    "Request failed"
                );
                Outcome::Respond(JsonRpcResponse::error(id, e.into_rpc_error()))
            }
        }
    }

    async fn route(&self, request: &Request) -> Result<Value, DispatchError> {
        let method = Method::from_name(&request.method)
            .ok_or_else(|| DispatchError::unknown_method(&request.method))?;
        tracing::trace!(method = method.as_str(), "Routing");

        match method {
            Method::Initialize => self.handle_initialize(&request.params),
            Method::ToolsList => self.handle_tools_list(),
            Method::ToolsCall => self.handle_tools_call(&request.params).await,
        }
    }

    /// Handle notifications (no response).
    fn handle_notification(&self, method: &str) {
        match method {
            "initialized" | protocol::NOTIFICATION_INITIALIZED => {
                tracing::info!("Client initialized");
            }
            "notifications/cancelled" => {
                tracing::debug!("Request cancelled by client");
            }
            _ => {
                tracing::debug!(method, "Ignoring notification");
            }
        }
    }

    fn handle_initialize(&self, params: &Map<String, Value>) -> Result<Value, DispatchError> {
        if !params.is_empty() {
            match serde_json::from_value::<InitializeParams>(Value::Object(params.clone())) {
                Ok(InitializeParams {
                    protocol_version,
                    client_info: Some(client),
                }) => {
                    tracing::info!(
                        client = %client.name,
                        version = client.version.as_deref().unwrap_or("unknown"),
                        protocol = protocol_version.as_deref().unwrap_or("unknown"),
                        "Client connected"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Failed to parse initialize params: {}", e);
                }
            }
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: true },
            },
            server_info: self.server_info.as_ref().clone(),
        };

        Ok(serde_json::to_value(result)?)
    }

    fn handle_tools_list(&self) -> Result<Value, DispatchError> {
        let result = ToolsListResult {
            tools: self.registry.tools().to_vec(),
        };
        Ok(serde_json::to_value(result)?)
    }

    async fn handle_tools_call(&self, params: &Map<String, Value>) -> Result<Value, DispatchError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| DispatchError::invalid_params("tool name not specified"))?;

        let kind = self
            .registry
            .resolve(name)
            .ok_or_else(|| DispatchError::unknown_tool(name))?;

        let arguments = Arguments::from_params(params)?;
        let call = ToolCall::parse(kind, &arguments)?;

        tracing::info!(tool = call.kind().name(), "Calling tool");
        let result = self.handler.execute(call).await?;

        Ok(serde_json::to_value(result)?)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
