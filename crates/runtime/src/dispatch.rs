//! Tool dispatch.
//!
//! [`Dispatcher`] is the single entry point for every tool. A call runs
//! validate, build, backend call, normalize, in that order, and ends with
//! either an output or an [`Error`], never both. Backend calls are bounded
//! by a per-tool timeout and by the caller's cancellation token. Nothing is
//! retried.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backend::{Backend, ClientError, ProgressResponse, PullRequest};
use crate::config::{self, Config};
use crate::normalize::{self, ResponseCollector};
use crate::request::build_chat_request;
use crate::tools::{
    ChatInput, ChatOutput, CodeInput, CodeOutput, ListModelsInput, ListModelsOutput,
    ModelInfoInput, ModelInfoOutput, PullModelInput, PullModelOutput,
};
use crate::validate::{validate_chat_input, validate_model_name};
use crate::{Error, Result};

const CHAT_TIMEOUT: Duration = Duration::from_secs(30);
const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Names of the exposed tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    Chat,
    Code,
    ListModels,
    ModelInfo,
    PullModel,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::Code,
        ToolName::Chat,
        ToolName::ListModels,
        ToolName::ModelInfo,
        ToolName::PullModel,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolName::Chat => "chat",
            ToolName::Code => "code",
            ToolName::ListModels => "list-models",
            ToolName::ModelInfo => "model-info",
            ToolName::PullModel => "pull-model",
        }
    }

    /// Upper bound on a single backend call. `None` means unbounded; only
    /// the caller's cancellation ends it.
    pub fn timeout(self) -> Option<Duration> {
        match self {
            ToolName::Chat | ToolName::Code => Some(CHAT_TIMEOUT),
            ToolName::ListModels | ToolName::ModelInfo => Some(METADATA_TIMEOUT),
            ToolName::PullModel => None,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ToolName::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| Error::invalid(format!("unknown tool: {s}")))
    }
}

/// A decoded tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInput {
    Chat(ChatInput),
    Code(CodeInput),
    ListModels(ListModelsInput),
    ModelInfo(ModelInfoInput),
    PullModel(PullModelInput),
}

impl ToolInput {
    /// Decode wire arguments for `tool`. Missing arguments decode as `{}`.
    pub fn decode(tool: ToolName, arguments: Option<Value>) -> Result<Self> {
        let arguments = arguments.unwrap_or_else(|| Value::Object(Default::default()));
        Ok(match tool {
            ToolName::Chat => Self::Chat(parse(arguments)?),
            ToolName::Code => Self::Code(parse(arguments)?),
            ToolName::ListModels => Self::ListModels(parse(arguments)?),
            ToolName::ModelInfo => Self::ModelInfo(parse(arguments)?),
            ToolName::PullModel => Self::PullModel(parse(arguments)?),
        })
    }

    pub fn tool(&self) -> ToolName {
        match self {
            Self::Chat(_) => ToolName::Chat,
            Self::Code(_) => ToolName::Code,
            Self::ListModels(_) => ToolName::ListModels,
            Self::ModelInfo(_) => ToolName::ModelInfo,
            Self::PullModel(_) => ToolName::PullModel,
        }
    }
}

fn parse<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    serde_json::from_value(arguments).map_err(|e| Error::invalid(e.to_string()))
}

/// Output of a successful tool call. Serializes as the inner record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Chat(ChatOutput),
    Code(CodeOutput),
    ListModels(ListModelsOutput),
    ModelInfo(ModelInfoOutput),
    PullModel(PullModelOutput),
}

/// Routes tool calls to the backend.
///
/// Holds no per-call state; one instance serves concurrent calls.
#[derive(Debug)]
pub struct Dispatcher<B> {
    config: Arc<Config>,
    backend: B,
}

impl<B: Backend> Dispatcher<B> {
    pub fn new(config: Arc<Config>, backend: B) -> Self {
        Self { config, backend }
    }

    /// Build a dispatcher over the process-wide configuration.
    ///
    /// Fails with [`Error::ConfigurationUnavailable`] if bootstrap has not
    /// called [`config::install`].
    pub fn from_installed(backend: B) -> Result<Self> {
        Ok(Self::new(config::installed()?, backend))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one tool call.
    pub async fn handle(&self, input: ToolInput, cancel: &CancellationToken) -> Result<ToolOutput> {
        match input {
            ToolInput::Chat(input) => self.chat(input, cancel).await.map(ToolOutput::Chat),
            ToolInput::Code(input) => self.code(input, cancel).await.map(ToolOutput::Code),
            ToolInput::ListModels(_) => self.list_models(cancel).await.map(ToolOutput::ListModels),
            ToolInput::ModelInfo(input) => {
                self.model_info(input, cancel).await.map(ToolOutput::ModelInfo)
            }
            ToolInput::PullModel(input) => {
                self.pull_model(input, cancel).await.map(ToolOutput::PullModel)
            }
        }
    }

    pub async fn chat(&self, input: ChatInput, cancel: &CancellationToken) -> Result<ChatOutput> {
        let response = self.complete(ToolName::Chat, input, cancel).await?;
        Ok(ChatOutput { response })
    }

    /// Chat pinned to the code model, with a default coding system prompt.
    pub async fn code(&self, input: CodeInput, cancel: &CancellationToken) -> Result<CodeOutput> {
        let response = self.complete(ToolName::Code, input.into(), cancel).await?;
        Ok(CodeOutput { response })
    }

    pub async fn list_models(&self, cancel: &CancellationToken) -> Result<ListModelsOutput> {
        let response = self
            .with_limits(
                ToolName::ListModels,
                cancel,
                "failed to list models",
                self.backend.list(),
            )
            .await?;
        debug!(count = response.models.len(), "listed models");
        Ok(normalize::list_output(response))
    }

    pub async fn model_info(
        &self,
        input: ModelInfoInput,
        cancel: &CancellationToken,
    ) -> Result<ModelInfoOutput> {
        validate_model_name(&input.name)?;
        let response = self
            .with_limits(
                ToolName::ModelInfo,
                cancel,
                "failed to get model info",
                self.backend.show(&input.name),
            )
            .await?;
        Ok(normalize::model_info_output(&input.name, response))
    }

    pub async fn pull_model(
        &self,
        input: PullModelInput,
        cancel: &CancellationToken,
    ) -> Result<PullModelOutput> {
        validate_model_name(&input.name)?;
        let request = PullRequest {
            model: input.name.clone(),
            insecure: input.insecure,
            stream: true,
        };
        let context = format!("failed to pull model {}", input.name);
        let on_progress = |progress: ProgressResponse| {
            debug!(
                status = %progress.status,
                completed = ?progress.completed,
                total = ?progress.total,
                "pull progress"
            );
        };

        self.with_limits(
            ToolName::PullModel,
            cancel,
            &context,
            self.backend.pull(&request, on_progress),
        )
        .await?;
        Ok(normalize::pull_output(&input.name))
    }

    async fn complete(
        &self,
        tool: ToolName,
        input: ChatInput,
        cancel: &CancellationToken,
    ) -> Result<String> {
        validate_chat_input(&input)?;
        let request = build_chat_request(&input, &self.config)?;
        debug!(%tool, model = %request.model, "sending chat request");

        let mut collector = ResponseCollector::default();
        self.with_limits(
            tool,
            cancel,
            "failed to chat with Ollama",
            self.backend.chat(&request, |chunk| collector.push(chunk)),
        )
        .await?;
        Ok(collector.finish())
    }

    /// Await a backend call under the tool's timeout and the caller's
    /// cancellation, wrapping any failure as [`Error::Backend`].
    async fn with_limits<T, F>(
        &self,
        tool: ToolName,
        cancel: &CancellationToken,
        context: &str,
        request: F,
    ) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, ClientError>>,
    {
        let bounded = async {
            match tool.timeout() {
                Some(limit) => tokio::time::timeout(limit, request)
                    .await
                    .map_err(|_| format!("timed out after {}s", limit.as_secs())),
                None => Ok(request.await),
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err("request cancelled".to_string()),
            result = bounded => result,
        };

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                debug!(%tool, error = %e, "backend call failed");
                Err(Error::backend(tool, format!("{context}: {e}")))
            }
            Err(reason) => {
                debug!(%tool, %reason, "backend call abandoned");
                Err(Error::backend(tool, format!("{context}: {reason}")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::backend::{
        ChatRequest, ChatResponse, ListResponse, ModelSummary, OptionValue, ProgressResponse,
        ResponseMessage, ShowResponse,
    };
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeBackend {
        chunks: Vec<&'static str>,
        models: Vec<&'static str>,
        delay: Option<Duration>,
        failure: Option<&'static str>,
        calls: AtomicUsize,
        chats: Mutex<Vec<ChatRequest>>,
        pulls: Mutex<Vec<PullRequest>>,
    }

    impl FakeBackend {
        async fn enter(&self) -> std::result::Result<(), ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match self.failure {
                Some(message) => Err(ClientError::Network(message.to_string())),
                None => Ok(()),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_chat(&self) -> ChatRequest {
            self.chats.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Backend for FakeBackend {
        async fn chat<F>(
            &self,
            request: &ChatRequest,
            mut on_chunk: F,
        ) -> std::result::Result<(), ClientError>
        where
            F: FnMut(ChatResponse) + Send,
        {
            self.chats.lock().unwrap().push(request.clone());
            self.enter().await?;
            for content in &self.chunks {
                on_chunk(ChatResponse {
                    message: ResponseMessage {
                        role: "assistant".into(),
                        content: content.to_string(),
                    },
                    ..ChatResponse::default()
                });
            }
            Ok(())
        }

        async fn list(&self) -> std::result::Result<ListResponse, ClientError> {
            self.enter().await?;
            Ok(ListResponse {
                models: self
                    .models
                    .iter()
                    .map(|name| ModelSummary {
                        name: name.to_string(),
                        size: 42,
                        digest: format!("sha256:{name}"),
                        modified_at: None,
                    })
                    .collect(),
            })
        }

        async fn show(&self, _name: &str) -> std::result::Result<ShowResponse, ClientError> {
            self.enter().await?;
            Ok(ShowResponse {
                license: "MIT".into(),
                template: "{{ .Prompt }}".into(),
                ..ShowResponse::default()
            })
        }

        async fn pull<F>(
            &self,
            request: &PullRequest,
            mut on_progress: F,
        ) -> std::result::Result<(), ClientError>
        where
            F: FnMut(ProgressResponse) + Send,
        {
            self.pulls.lock().unwrap().push(request.clone());
            self.enter().await?;
            on_progress(ProgressResponse {
                status: "success".into(),
                ..ProgressResponse::default()
            });
            Ok(())
        }
    }

    fn dispatcher(backend: FakeBackend) -> Dispatcher<FakeBackend> {
        Dispatcher::new(Arc::new(Config::resolve(Settings::default()).unwrap()), backend)
    }

    fn chat(message: &str) -> ChatInput {
        ChatInput {
            message: message.into(),
            ..ChatInput::default()
        }
    }

    fn backend_message(err: Error) -> (ToolName, String) {
        match err {
            Error::Backend { tool, message } => (tool, message),
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[test]
    fn tool_names_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(tool.as_str().parse::<ToolName>().unwrap(), tool);
        }
        assert!(matches!("nope".parse::<ToolName>(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn from_installed_needs_bootstrap() {
        // Nothing in this test binary calls config::install.
        let Err(err) = Dispatcher::from_installed(FakeBackend::default()) else {
            panic!("dispatcher built without an installed configuration");
        };
        assert!(matches!(err, Error::ConfigurationUnavailable(_)));
    }

    #[test]
    fn timeouts_per_tool() {
        assert_eq!(ToolName::Chat.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(ToolName::Code.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(ToolName::ListModels.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(ToolName::ModelInfo.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(ToolName::PullModel.timeout(), None);
    }

    #[test]
    fn decode_rejects_malformed_arguments() {
        let input = ToolInput::decode(ToolName::ListModels, None).unwrap();
        assert_eq!(input.tool(), ToolName::ListModels);

        let err = ToolInput::decode(ToolName::Chat, Some(serde_json::json!({"temperature": 1})))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn chat_returns_last_non_empty_chunk() {
        let dispatcher = dispatcher(FakeBackend {
            chunks: vec!["partial", "Hello there", ""],
            ..FakeBackend::default()
        });
        let output = dispatcher
            .chat(chat("Hello"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(output.response, "Hello there");

        let request = dispatcher.backend.last_chat();
        assert_eq!(request.model, config::DEFAULT_CHAT_MODEL);
        assert!(!request.stream);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_backend() {
        let dispatcher = dispatcher(FakeBackend::default());
        let cancel = CancellationToken::new();

        let hot = ChatInput {
            temperature: Some(2.5),
            ..chat("x")
        };
        assert!(matches!(dispatcher.chat(hot, &cancel).await, Err(Error::InvalidInput(_))));
        assert!(matches!(dispatcher.chat(chat(""), &cancel).await, Err(Error::InvalidInput(_))));

        let bad_name = ModelInfoInput { name: "../x".into() };
        assert!(matches!(
            dispatcher.model_info(bad_name, &cancel).await,
            Err(Error::InvalidInput(_))
        ));
        let bad_pull = PullModelInput {
            name: "x;rm".into(),
            insecure: false,
        };
        assert!(matches!(
            dispatcher.pull_model(bad_pull, &cancel).await,
            Err(Error::InvalidInput(_))
        ));

        assert_eq!(dispatcher.backend.calls(), 0);
        assert!(dispatcher.backend.chats.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn code_uses_code_model_and_default_prompt() {
        let dispatcher = dispatcher(FakeBackend {
            chunks: vec!["fn main() {}"],
            ..FakeBackend::default()
        });
        let input = CodeInput {
            message: "write main".into(),
            model: Some("llama3".into()),
            context_size: Some(8192),
            ..CodeInput::default()
        };
        let output = dispatcher.code(input, &CancellationToken::new()).await.unwrap();
        assert_eq!(output.response, "fn main() {}");

        let request = dispatcher.backend.last_chat();
        assert_eq!(request.model, config::DEFAULT_CODE_MODEL);
        assert_eq!(request.messages[0].content, crate::request::CODE_SYSTEM_PROMPT);
        assert_eq!(request.options["num_ctx"], OptionValue::Integer(8192));
    }

    #[tokio::test]
    async fn backend_failures_name_the_tool() {
        let dispatcher = dispatcher(FakeBackend {
            failure: Some("connection refused"),
            ..FakeBackend::default()
        });
        let err = dispatcher
            .chat(chat("Hello"), &CancellationToken::new())
            .await
            .unwrap_err();
        let (tool, message) = backend_message(err);
        assert_eq!(tool, ToolName::Chat);
        assert_eq!(message, "failed to chat with Ollama: network: connection refused");

        let err = dispatcher.list_models(&CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "list-models: failed to list models: network: connection refused");
        assert_eq!(dispatcher.backend.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_chat_times_out() {
        let dispatcher = dispatcher(FakeBackend {
            chunks: vec!["late"],
            delay: Some(Duration::from_secs(31)),
            ..FakeBackend::default()
        });
        let err = dispatcher
            .chat(chat("Hello"), &CancellationToken::new())
            .await
            .unwrap_err();
        let (_, message) = backend_message(err);
        assert_eq!(message, "failed to chat with Ollama: timed out after 30s");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_metadata_times_out_at_ten_seconds() {
        let dispatcher = dispatcher(FakeBackend {
            delay: Some(Duration::from_secs(11)),
            ..FakeBackend::default()
        });
        let err = dispatcher.list_models(&CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().ends_with("timed out after 10s"));
    }

    #[tokio::test(start_paused = true)]
    async fn pull_is_unbounded_and_surfaces_backend_error() {
        let dispatcher = dispatcher(FakeBackend {
            delay: Some(Duration::from_secs(15 * 60)),
            failure: Some("dial tcp 127.0.0.1:11434: connection refused"),
            ..FakeBackend::default()
        });
        let input = PullModelInput {
            name: "llama3".into(),
            insecure: true,
        };
        let err = dispatcher
            .pull_model(input, &CancellationToken::new())
            .await
            .unwrap_err();
        let (tool, message) = backend_message(err);
        assert_eq!(tool, ToolName::PullModel);
        assert!(message.starts_with("failed to pull model llama3: "));
        assert!(message.contains("connection refused"));
        assert!(!message.contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_pull_succeeds() {
        let dispatcher = dispatcher(FakeBackend {
            delay: Some(Duration::from_secs(60 * 60)),
            ..FakeBackend::default()
        });
        let input = PullModelInput {
            name: "llama3".into(),
            insecure: true,
        };
        let output = dispatcher
            .pull_model(input, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(output.message, "Successfully pulled model llama3");

        let pulls = dispatcher.backend.pulls.lock().unwrap();
        assert_eq!(pulls[0].model, "llama3");
        assert!(pulls[0].insecure);
        assert!(pulls[0].stream);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_ends_in_flight_call() {
        let dispatcher = dispatcher(FakeBackend {
            delay: Some(Duration::from_secs(60 * 60)),
            ..FakeBackend::default()
        });
        let cancel = CancellationToken::new();
        let input = PullModelInput {
            name: "llama3".into(),
            insecure: false,
        };

        let (result, _) = tokio::join!(dispatcher.pull_model(input, &cancel), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });
        let (_, message) = backend_message(result.unwrap_err());
        assert_eq!(message, "failed to pull model llama3: request cancelled");
        assert_eq!(dispatcher.backend.calls(), 1);
    }

    #[tokio::test]
    async fn handle_routes_by_variant() {
        let dispatcher = dispatcher(FakeBackend {
            models: vec!["b:latest", "a:latest"],
            ..FakeBackend::default()
        });
        let cancel = CancellationToken::new();

        let output = dispatcher
            .handle(ToolInput::ListModels(ListModelsInput {}), &cancel)
            .await
            .unwrap();
        let ToolOutput::ListModels(list) = output else {
            panic!("expected list output");
        };
        assert_eq!(list.models[0].name, "b:latest");
        assert_eq!(list.models[1].digest, "sha256:a:latest");

        let output = dispatcher
            .handle(
                ToolInput::ModelInfo(ModelInfoInput {
                    name: "llama3".into(),
                }),
                &cancel,
            )
            .await
            .unwrap();
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["name"], "llama3");
        assert_eq!(json["license"], "MIT");
        assert_eq!(json["modified_at"], normalize::ZERO_TIME);
    }
}
