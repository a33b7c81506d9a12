//! MCP tool handler over the dispatcher.

use mcp::{CallToolResult, Tool, ToolHandler};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::Result;
use crate::backend::Backend;
use crate::dispatch::{Dispatcher, ToolInput, ToolName, ToolOutput};
use crate::tools;

impl<B: Backend + 'static> ToolHandler for Dispatcher<B> {
    fn tools(&self) -> Vec<Tool> {
        tools::definitions(self.config())
    }

    async fn call(
        &self,
        name: &str,
        arguments: Option<Value>,
        cancel: CancellationToken,
    ) -> CallToolResult {
        match self.invoke(name, arguments, &cancel).await {
            Ok(output) => match serde_json::to_value(&output) {
                Ok(value) => CallToolResult::structured(value),
                Err(e) => CallToolResult::error(format!("failed to encode {name} output: {e}")),
            },
            Err(err) => {
                warn!(tool = name, error = %err, "tool call failed");
                CallToolResult::error(err.to_string())
            }
        }
    }
}

impl<B: Backend> Dispatcher<B> {
    async fn invoke(
        &self,
        name: &str,
        arguments: Option<Value>,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput> {
        let tool: ToolName = name.parse()?;
        let input = ToolInput::decode(tool, arguments)?;
        info!(%tool, "tool call");
        self.handle(input, cancel).await
    }
}
