//! MCP (Model Context Protocol) server library.
//!
//! This crate speaks the server side of MCP over newline-delimited JSON-RPC
//! 2.0, usually on stdin/stdout. It knows nothing about what the tools do:
//! `tools/list` and `tools/call` are answered by a [`ToolHandler`].
//!
//! # Example
//!
//! ```no_run
//! use mcp::{CallToolResult, Server, ServerInfo, Tool, ToolHandler};
//! use serde_json::{Value, json};
//! use tokio_util::sync::CancellationToken;
//!
//! struct Echo;
//!
//! impl ToolHandler for Echo {
//!     fn tools(&self) -> Vec<Tool> {
//!         vec![Tool {
//!             name: "echo".to_string(),
//!             description: Some("echo the arguments back".to_string()),
//!             input_schema: json!({"type": "object"}),
//!             output_schema: None,
//!         }]
//!     }
//!
//!     async fn call(&self, _name: &str, arguments: Option<Value>, _cancel: CancellationToken) -> CallToolResult {
//!         CallToolResult::structured(arguments.unwrap_or(Value::Null))
//!     }
//! }
//!
//! # async fn example() -> mcp::Result<()> {
//! Server::new(ServerInfo::new("echo", "0.1.0"), Echo)
//!     .serve_stdio()
//!     .await
//! # }
//! ```

mod error;
mod protocol;
mod server;

pub use error::{Error, Result};
pub use protocol::{
    CallToolParams, CallToolResult, CancelledParams, ClientInfo, InitializeParams,
    InitializeResult, JsonRpcError, JsonRpcMessage, JsonRpcResponse, ListToolsResult, RequestId,
    SUPPORTED_PROTOCOL_VERSIONS, ServerCapabilities, ServerInfo, Tool, ToolContent,
    ToolsCapability, negotiate_protocol_version,
};
pub use server::{MAX_FRAME_SIZE, Server, ToolHandler};
