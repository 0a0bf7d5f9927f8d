//! The MCP lifecycle for one client connection.
//!
//! A session is transport independent: it takes one line of JSON and returns
//! the reply to send, if any. Stdio runs a single session for the life of the
//! process; HTTP keeps one per `Mcp-Session-Id`.
//!
//! 1. **Initialisation**: `initialize` request, then `notifications/initialized`
//! 2. **Operation**: `tools/list`, `tools/call`, `ping`
//! 3. **Shutdown**: the transport closes or the process is signalled

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::decompiler::DecompilerService;
use crate::mcp::protocol::{
    parse_message, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, Reply, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::tools::{self, ToolCallParams};

/// Session state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for `initialize`.
    AwaitingInit,
    /// `initialize` answered, waiting for `notifications/initialized`.
    Initialising,
    /// Ready for tool calls.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Capabilities advertised in the `initialize` result.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool capabilities.
    pub tools: ToolCapabilities,
}

/// Tool capabilities. The tool list never changes.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {}

/// `serverInfo` in the `initialize` result.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: &'static str,
    /// Crate version.
    pub version: &'static str,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// Client identity sent with `initialize`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters of `initialize`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Version requested by the client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client identity.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// One client's view of the server.
pub struct McpSession {
    state: ServerState,
    service: Arc<DecompilerService>,
    client: Option<ClientInfo>,
}

impl std::fmt::Debug for McpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpSession")
            .field("state", &self.state)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl McpSession {
    /// Creates a session awaiting `initialize`.
    #[must_use]
    pub const fn new(service: Arc<DecompilerService>) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            service,
            client: None,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Marks the session as shutting down.
    pub fn shutdown(&mut self) {
        self.state = ServerState::ShuttingDown;
    }

    /// Handles one line of input. Returns the reply, or `None` for notifications.
    pub fn handle_line(&mut self, line: &str) -> Option<Reply> {
        match parse_message(line) {
            Ok(msg) => self.handle_message(msg),
            Err(error) => {
                tracing::debug!(code = error.error.code, "Rejected malformed message");
                Some(error.into())
            }
        }
    }

    /// Handles a parsed message.
    pub fn handle_message(&mut self, msg: IncomingMessage) -> Option<Reply> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(&req)),
            IncomingMessage::Notification(notif) => {
                self.handle_notification(&notif);
                None
            }
        }
    }

    fn handle_request(&mut self, req: &JsonRpcRequest) -> Reply {
        tracing::debug!(id = %req.id, method = %req.method, "Request");
        let result = match req.method.as_str() {
            "initialize" => self.handle_initialize(req),
            "tools/list" => self.handle_tools_list(req),
            "tools/call" => self.handle_tools_call(req),
            "ping" => Ok(JsonRpcResponse::success(req.id.clone(), json!({}))),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        match result {
            Ok(response) => response.into(),
            Err(error) => error.into(),
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" if self.state == ServerState::Initialising => {
                self.state = ServerState::Running;
                tracing::info!("Session initialised");
            }
            other => tracing::trace!(method = other, "Ignoring notification"),
        }
    }

    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::lifecycle(
                req.id.clone(),
                "Server already initialised",
            ));
        }

        let params: InitializeParams = parse_params(req, "initialize")?;
        tracing::info!(
            client = params.client_info.as_ref().map_or("unknown", |c| c.name.as_str()),
            requested_version = %params.protocol_version,
            "Initialising session"
        );

        self.client = params.client_info;
        self.state = ServerState::Initialising;

        let capabilities = ServerCapabilities {
            tools: ToolCapabilities::default(),
        };

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": capabilities,
                "serverInfo": ServerInfo::default(),
            }),
        ))
    }

    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;
        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "tools": tools::definitions() }),
        ))
    }

    fn handle_tools_call(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = parse_params(req, "tool call")?;
        let result = tools::call(&self.service, &params.name, &params.arguments);

        let value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(
                req.id.clone(),
                "Internal error: failed to serialise result",
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), value))
    }

    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state == ServerState::Running {
            Ok(())
        } else {
            Err(JsonRpcError::lifecycle(id.clone(), "Server not initialised"))
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    req: &JsonRpcRequest,
    what: &str,
) -> Result<T, JsonRpcError> {
    let params = req
        .params
        .clone()
        .ok_or_else(|| JsonRpcError::invalid_params(req.id.clone(), format!("Missing {what} params")))?;

    serde_json::from_value(params).map_err(|e| {
        JsonRpcError::invalid_params(req.id.clone(), format!("Invalid {what} params: {e}"))
    })
}
