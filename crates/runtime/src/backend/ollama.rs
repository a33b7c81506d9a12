//! Ollama HTTP backend.

use std::time::Duration;

use reqwest::{Response, Url};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    Backend, ChatRequest, ChatResponse, ClientError, ListResponse, ProgressResponse, PullRequest,
    ShowResponse,
};
use crate::config::{Config, HttpProfile};

// Tuned profile for long-running inference calls.
const MAX_IDLE_PER_HOST: usize = 10;
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct ShowRequest<'a> {
    model: &'a str,
}

/// Client for an Ollama server.
///
/// Cheap to share: the underlying connection pool is reference counted and
/// safe for concurrent use.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a client for `endpoint` with the given connection profile.
    pub fn new(endpoint: &Url, profile: HttpProfile) -> Result<Self, ClientError> {
        let http = match profile {
            HttpProfile::Standard => reqwest::Client::new(),
            HttpProfile::LongRunning => reqwest::Client::builder()
                .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
                .pool_idle_timeout(IDLE_TIMEOUT)
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .map_err(|e| ClientError::Build(e.to_string()))?,
        };

        Ok(Self {
            http,
            base_url: endpoint.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Create a client bound to the configured endpoint.
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        Self::new(&config.endpoint, config.http_profile)
    }

    /// Base URL requests are sent to, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(status_error(response).await)
        }
    }

    async fn post_stream<B, T, F>(&self, path: &str, body: &B, mut on_item: F) -> Result<(), ClientError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
        F: FnMut(T) + Send,
    {
        let url = self.url(path);
        debug!(%url, "streaming request");
        let mut response = self.send(self.http.post(&url).json(body)).await?;

        let mut decoder = LineDecoder::default();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?
        {
            decoder.push(&chunk, &mut on_item)?;
        }
        decoder.finish(&mut on_item)
    }
}

impl Backend for OllamaClient {
    async fn chat<F>(&self, request: &ChatRequest, on_chunk: F) -> Result<(), ClientError>
    where
        F: FnMut(ChatResponse) + Send,
    {
        self.post_stream::<_, ChatResponse, _>("api/chat", request, on_chunk)
            .await
    }

    async fn list(&self) -> Result<ListResponse, ClientError> {
        let response = self.send(self.http.get(self.url("api/tags"))).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn show(&self, name: &str) -> Result<ShowResponse, ClientError> {
        let request = self
            .http
            .post(self.url("api/show"))
            .json(&ShowRequest { model: name });
        let response = self.send(request).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn pull<F>(&self, request: &PullRequest, on_progress: F) -> Result<(), ClientError>
    where
        F: FnMut(ProgressResponse) + Send,
    {
        self.post_stream::<_, ProgressResponse, _>("api/pull", request, on_progress)
            .await
    }
}

async fn status_error(response: Response) -> ClientError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body.trim().to_string(),
    };

    ClientError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Splits a response body into newline-delimited JSON objects.
///
/// Objects may straddle chunk boundaries; a final object without a
/// trailing newline is decoded by [`LineDecoder::finish`].
#[derive(Debug, Default)]
struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    fn push<T, F>(&mut self, bytes: &[u8], on_item: &mut F) -> Result<(), ClientError>
    where
        T: DeserializeOwned,
        F: FnMut(T),
    {
        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            decode_line(&line, on_item)?;
        }
        Ok(())
    }

    fn finish<T, F>(&mut self, on_item: &mut F) -> Result<(), ClientError>
    where
        T: DeserializeOwned,
        F: FnMut(T),
    {
        let rest = std::mem::take(&mut self.buffer);
        decode_line(&rest, on_item)
    }
}

fn decode_line<T, F>(line: &[u8], on_item: &mut F) -> Result<(), ClientError>
where
    T: DeserializeOwned,
    F: FnMut(T),
{
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(());
    }

    if let Ok(ErrorBody { error }) = serde_json::from_slice::<ErrorBody>(line) {
        return Err(ClientError::Stream(error));
    }

    let item = serde_json::from_slice(line).map_err(|e| ClientError::Decode(e.to_string()))?;
    on_item(item);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(chunks: &[&str]) -> Result<Vec<ChatResponse>, ClientError> {
        let mut out = Vec::new();
        let mut push = |r: ChatResponse| out.push(r);
        let mut decoder = LineDecoder::default();
        for chunk in chunks {
            decoder.push(chunk.as_bytes(), &mut push)?;
        }
        decoder.finish(&mut push)?;
        Ok(out)
    }

    #[test]
    fn decodes_objects_split_across_chunks() {
        let out = collect(&[
            r#"{"message":{"role":"assistant","content":"Hel"#,
            r#"lo"},"done":false}"#,
            "\n",
            r#"{"message":{"role":"assistant","content":""},"done":true}"#,
        ])
        .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].message.content, "Hello");
        assert!(out[1].done);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let out = collect(&["\n\r\n{\"done\":true}\n\n"]).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn error_object_in_stream_fails() {
        let err = collect(&["{\"error\":\"model 'x' not found\"}\n"]).unwrap_err();
        assert!(matches!(err, ClientError::Stream(ref m) if m == "model 'x' not found"));
    }

    #[test]
    fn garbage_line_is_a_decode_error() {
        let err = collect(&["not json\n"]).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn base_url_has_no_trailing_slash() {
        let endpoint = Url::parse("http://localhost:11434/").unwrap();
        let client = OllamaClient::new(&endpoint, HttpProfile::Standard).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
        assert_eq!(client.url("api/tags"), "http://localhost:11434/api/tags");
    }

    #[test]
    fn long_running_profile_builds() {
        let endpoint = Url::parse("http://127.0.0.1:11434").unwrap();
        assert!(OllamaClient::new(&endpoint, HttpProfile::LongRunning).is_ok());
    }
}
