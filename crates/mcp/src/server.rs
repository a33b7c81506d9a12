//! MCP server loop (line-delimited JSON-RPC over a byte stream).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, CancelledParams, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcMessage, JsonRpcResponse, ListToolsResult, RequestId,
    ServerCapabilities, ServerInfo, Tool, negotiate_protocol_version,
};

/// Maximum size of a single incoming frame (1MB).
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Trait for whatever answers `tools/list` and `tools/call`.
///
/// This is the boundary between the protocol loop and the tools themselves.
/// Tool failures are reported inside the returned [`CallToolResult`], never
/// as protocol errors.
pub trait ToolHandler: Send + Sync + 'static {
    /// Tools advertised to the client.
    fn tools(&self) -> Vec<Tool>;

    /// Execute a tool call. `cancel` fires when the client cancels the
    /// request or the connection goes away.
    fn call(
        &self,
        name: &str,
        arguments: Option<Value>,
        cancel: CancellationToken,
    ) -> impl Future<Output = CallToolResult> + Send;
}

type InFlight = Arc<Mutex<HashMap<RequestId, CancellationToken>>>;
type SharedWriter<W> = Arc<Mutex<W>>;

/// An MCP server bound to a tool handler.
pub struct Server<H> {
    info: ServerInfo,
    instructions: Option<String>,
    handler: Arc<H>,
    in_flight: InFlight,
}

impl<H: ToolHandler> Server<H> {
    pub fn new(info: ServerInfo, handler: H) -> Self {
        Self {
            info,
            instructions: None,
            handler: Arc::new(handler),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Set the free-form instructions returned from `initialize`.
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Serve over the process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(self) -> Result<()> {
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve until `reader` reaches end of input.
    ///
    /// Each `tools/call` runs on its own task. When input ends, calls still
    /// in flight are cancelled and awaited before returning.
    pub async fn serve<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut reader = BufReader::new(reader);
        let writer: SharedWriter<W> = Arc::new(Mutex::new(writer));
        let mut tasks = JoinSet::new();
        let mut line = Vec::new();

        loop {
            let frame = match read_frame(&mut reader, &mut line).await? {
                Frame::Eof => break,
                Frame::TooLarge(size) => {
                    let err = Error::FrameTooLarge {
                        size,
                        max: MAX_FRAME_SIZE,
                    };
                    warn!(error = %err, "dropping frame");
                    let response = JsonRpcResponse::failure(
                        None,
                        JsonRpcError::invalid_request(err.to_string()),
                    );
                    write_message(&writer, &response).await?;
                    continue;
                }
                Frame::Line => line.trim_ascii(),
            };
            while tasks.try_join_next().is_some() {}

            if frame.is_empty() {
                continue;
            }

            match serde_json::from_slice::<JsonRpcMessage>(frame) {
                Ok(message) => self.dispatch(message, &writer, &mut tasks).await?,
                Err(e) => {
                    debug!(error = %e, "unparseable frame");
                    let response =
                        JsonRpcResponse::failure(None, JsonRpcError::parse_error(e.to_string()));
                    write_message(&writer, &response).await?;
                }
            }
        }

        let pending = {
            let in_flight = self.in_flight.lock().await;
            for token in in_flight.values() {
                token.cancel();
            }
            in_flight.len()
        };
        if pending > 0 {
            info!(pending, "input closed, cancelling in-flight tool calls");
        }
        while tasks.join_next().await.is_some() {}

        Ok(())
    }

    async fn dispatch<W>(
        &self,
        message: JsonRpcMessage,
        writer: &SharedWriter<W>,
        tasks: &mut JoinSet<()>,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let Some(method) = message.method else {
            debug!(id = ?message.id, "ignoring message without method");
            return Ok(());
        };

        if message.jsonrpc != "2.0" {
            if let Some(id) = message.id {
                let error = JsonRpcError::invalid_request("jsonrpc must be \"2.0\"");
                write_message(writer, &JsonRpcResponse::failure(Some(id), error)).await?;
            }
            return Ok(());
        }

        let Some(id) = message.id else {
            self.notification(&method, message.params).await;
            return Ok(());
        };

        let response = match method.as_str() {
            "initialize" => match parse_params::<InitializeParams>(message.params) {
                Ok(params) => JsonRpcResponse::success(id, self.initialize(params)),
                Err(error) => JsonRpcResponse::failure(Some(id), error),
            },
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => JsonRpcResponse::success(
                id,
                ListToolsResult {
                    tools: self.handler.tools(),
                },
            ),
            "tools/call" => match self.spawn_call(id.clone(), message.params, writer, tasks).await
            {
                Ok(()) => return Ok(()),
                Err(error) => JsonRpcResponse::failure(Some(id), error),
            },
            other => JsonRpcResponse::failure(Some(id), JsonRpcError::method_not_found(other)),
        };

        write_message(writer, &response).await
    }

    fn initialize(&self, params: InitializeParams) -> InitializeResult {
        let client = params
            .client_info
            .map(|c| c.name)
            .unwrap_or_else(|| "unknown".to_string());
        let protocol_version = negotiate_protocol_version(&params.protocol_version);
        info!(%client, requested = %params.protocol_version, %protocol_version, "client initialized");

        InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities::tools_only(),
            server_info: self.info.clone(),
            instructions: self.instructions.clone(),
        }
    }

    async fn notification(&self, method: &str, params: Option<Value>) {
        match method {
            "notifications/initialized" => debug!("client finished initialization"),
            "notifications/cancelled" => match parse_params::<CancelledParams>(params) {
                Ok(cancelled) => {
                    if let Some(token) = self.in_flight.lock().await.get(&cancelled.request_id) {
                        debug!(id = ?cancelled.request_id, reason = ?cancelled.reason, "cancelling tool call");
                        token.cancel();
                    }
                }
                Err(e) => debug!(error = %e, "malformed cancellation"),
            },
            other => debug!(method = other, "ignoring notification"),
        }
    }

    async fn spawn_call<W>(
        &self,
        id: RequestId,
        params: Option<Value>,
        writer: &SharedWriter<W>,
        tasks: &mut JoinSet<()>,
    ) -> std::result::Result<(), JsonRpcError>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let params: CallToolParams = parse_params(params)?;
        if !self.handler.tools().iter().any(|t| t.name == params.name) {
            return Err(JsonRpcError::invalid_params(format!(
                "unknown tool: {}",
                params.name
            )));
        }

        let token = CancellationToken::new();
        {
            let mut in_flight = self.in_flight.lock().await;
            if in_flight.contains_key(&id) {
                return Err(JsonRpcError::invalid_request(format!(
                    "request id {id} is already in flight"
                )));
            }
            in_flight.insert(id.clone(), token.clone());
        }

        let handler = Arc::clone(&self.handler);
        let in_flight = Arc::clone(&self.in_flight);
        let writer = Arc::clone(writer);

        tasks.spawn(async move {
            debug!(id = ?id, tool = %params.name, "tool call started");
            let result = handler.call(&params.name, params.arguments, token).await;
            in_flight.lock().await.remove(&id);
            debug!(id = ?id, tool = %params.name, is_error = result.is_error, "tool call finished");

            if let Err(e) = write_message(&writer, &JsonRpcResponse::success(id, result)).await {
                warn!(error = %e, "failed to write tool result");
            }
        });

        Ok(())
    }
}

enum Frame {
    Line,
    TooLarge(usize),
    Eof,
}

/// Read one newline-terminated frame into `buf`, buffering at most
/// `MAX_FRAME_SIZE + 1` bytes. The rest of an oversized frame is discarded.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let limit = MAX_FRAME_SIZE as u64 + 1;
    buf.clear();
    let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(Frame::Eof);
    }
    if buf.last() == Some(&b'\n') || (n as u64) < limit {
        return Ok(Frame::Line);
    }

    let skipped = skip_line(reader).await?;
    buf.clear();
    Ok(Frame::TooLarge(n + skipped))
}

async fn skip_line<R>(reader: &mut R) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut skipped = 0;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(skipped);
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                return Ok(skipped + end + 1);
            }
            None => {
                let len = available.len();
                reader.consume(len);
                skipped += len;
            }
        }
    }
}

fn parse_params<T: DeserializeOwned>(params: Option<Value>) -> std::result::Result<T, JsonRpcError> {
    serde_json::from_value(params.unwrap_or(Value::Null))
        .map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}

async fn write_message<W>(writer: &SharedWriter<W>, response: &JsonRpcResponse) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut frame = serde_json::to_string(response)?;
    frame.push('\n');

    let mut writer = writer.lock().await;
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
