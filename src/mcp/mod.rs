//! Model Context Protocol (MCP) server implementation.
//!
//! Exposes the decompiler as three MCP tools over JSON-RPC 2.0, on either of
//! two transports:
//!
//! - **stdio**: newline-delimited messages on stdin/stdout, one session
//! - **HTTP**: `POST /mcp`, one session per `Mcp-Session-Id`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        MCP Server                        │
//! │                                                          │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐  │
//! │   │  Transport  │───▶│   Session   │───▶│    Tools    │  │
//! │   │ (stdio/HTTP)│    │ (lifecycle) │    │ (decompile) │  │
//! │   └─────────────┘    └─────────────┘    └─────────────┘  │
//! │          │                  │                  │         │
//! │          ▼                  ▼                  ▼         │
//! │   ┌───────────────────────────────────────────────────┐  │
//! │   │                 JSON-RPC Messages                 │  │
//! │   └───────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod http;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tools;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, Reply, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use session::{McpSession, ServerState};
pub use transport::StdioTransport;
