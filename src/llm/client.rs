//! Resilient model client and backend dispatch.
//!
//! [`ResilientClient`] is the single entry the pipeline uses to talk to a
//! model. It owns the retry discipline: transient transport failures (rate
//! limits, timeouts, server overload) are retried with exponential backoff,
//! everything else surfaces immediately. Individual backends issue exactly
//! one attempt per call and stay free of retry logic.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::progress::{emit, LogSink, ProgressSink};

use super::local::OllamaBackend;
use super::providers::{GeminiProvider, OpenRouterProvider};

/// Total number of generation attempts before giving up.
const MAX_ATTEMPTS: u32 = 4;

/// Base unit for exponential backoff between attempts.
const BASE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Default sampling temperature for generation requests.
const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Default completion budget in tokens.
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Immutable request for one model invocation.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Instructions establishing the model's role and output format.
    pub system_prompt: String,
    /// The task instruction plus any accumulated context.
    pub user_prompt: String,
    /// Sampling temperature (0.0 - 2.0). Higher values = more random.
    pub temperature: f64,
    /// Maximum number of tokens to generate.
    pub max_tokens: u32,
}

impl GenerationRequest {
    /// Create a new generation request with default sampling parameters.
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Set the temperature for this request.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set the max tokens for this request.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A model-serving mechanism behind a uniform invocation contract.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Issue a single generation attempt and return the reply text.
    ///
    /// Implementations perform no retries of their own; the retry loop
    /// belongs to [`ResilientClient`].
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;

    /// Short human-readable name used in progress notifications.
    fn label(&self) -> &str;
}

/// Caller-supplied backend configuration, prior to resolution.
#[derive(Debug, Clone, Default)]
pub struct BackendSettings {
    /// Remote provider name ("openrouter" or "gemini"); empty for local.
    pub api_provider: String,
    /// Remote model identifier.
    pub api_model: String,
    /// Remote API key.
    pub api_key: String,
    /// Local model name served by the Ollama runtime.
    pub local_model: String,
}

impl BackendSettings {
    /// A remote backend requires provider, model, and key all present.
    fn wants_remote(&self) -> bool {
        !self.api_provider.trim().is_empty()
            && !self.api_model.trim().is_empty()
            && !self.api_key.trim().is_empty()
    }
}

/// Remote HTTP providers.
pub enum RemoteBackend {
    /// OpenRouter unified chat-completions API.
    OpenRouter(OpenRouterProvider),
    /// Google Gemini generateContent API.
    Gemini(GeminiProvider),
}

/// Concrete backend for a pipeline run.
///
/// Resolved exactly once, at pipeline start; the pipeline never re-checks
/// the configuration per call.
pub enum Backend {
    /// Remote HTTP provider.
    Remote(RemoteBackend),
    /// Local engine served by an Ollama runtime.
    Local(OllamaBackend),
}

impl Backend {
    /// Resolve settings into a concrete backend.
    ///
    /// Provider + model + key all present selects the named remote
    /// provider; anything less falls back to the local engine. An unknown
    /// provider name is a terminal configuration error.
    pub fn resolve(settings: &BackendSettings) -> Result<Self, LlmError> {
        if settings.wants_remote() {
            let provider = settings.api_provider.trim().to_lowercase();
            let key = settings.api_key.trim().to_string();
            let model = settings.api_model.trim().to_string();
            match provider.as_str() {
                "openrouter" => Ok(Backend::Remote(RemoteBackend::OpenRouter(
                    OpenRouterProvider::new(key, model),
                ))),
                "gemini" => Ok(Backend::Remote(RemoteBackend::Gemini(GeminiProvider::new(
                    key, model,
                )))),
                other => Err(LlmError::UnsupportedProvider(other.to_string())),
            }
        } else {
            let model = settings.local_model.trim();
            let model = if model.is_empty() {
                super::local::DEFAULT_LOCAL_MODEL
            } else {
                model
            };
            Ok(Backend::Local(OllamaBackend::new(model)))
        }
    }

    /// Whether this backend runs against the local engine.
    pub fn is_local(&self) -> bool {
        matches!(self, Backend::Local(_))
    }
}

#[async_trait]
impl ModelBackend for Backend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        match self {
            Backend::Remote(RemoteBackend::OpenRouter(provider)) => {
                provider.generate(request).await
            }
            Backend::Remote(RemoteBackend::Gemini(provider)) => provider.generate(request).await,
            Backend::Local(backend) => backend.generate(request).await,
        }
    }

    fn label(&self) -> &str {
        match self {
            Backend::Remote(RemoteBackend::OpenRouter(provider)) => provider.label(),
            Backend::Remote(RemoteBackend::Gemini(provider)) => provider.label(),
            Backend::Local(backend) => backend.label(),
        }
    }
}

/// Check whether an error is transient and worth retrying.
///
/// Covers rate limiting, request timeouts, and 5xx-class server failures
/// (gateway and overload variants included). Local-engine failures are never
/// transient: a missing runtime does not resolve by retrying.
fn is_transient(error: &LlmError) -> bool {
    match error {
        LlmError::RequestFailed(msg) => {
            msg.contains("timeout")
                || msg.contains("timed out")
                || msg.contains("connection")
                || msg.contains("Connection refused")
        }
        LlmError::RateLimited(_) => true,
        LlmError::ApiError { code, .. } => *code >= 500 || *code == 429 || *code == 408,
        _ => false,
    }
}

/// Model client wrapping a backend with retry, backoff, and progress.
///
/// Makes up to [`MAX_ATTEMPTS`] attempts per invocation. After a transient
/// failure on attempt `n` (counting from 0) it waits `2^n` base-delay units
/// before the next attempt, announcing the wait through the progress sink.
/// Terminal failures and exhausted retries surface as a single error
/// wrapping the last underlying cause.
pub struct ResilientClient<B: ModelBackend> {
    backend: B,
    max_attempts: u32,
    base_delay: Duration,
    sink: Arc<dyn ProgressSink>,
}

impl<B: ModelBackend> ResilientClient<B> {
    /// Create a client with the default retry policy, reporting through
    /// `tracing`.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            max_attempts: MAX_ATTEMPTS,
            base_delay: BASE_RETRY_DELAY,
            sink: Arc::new(LogSink),
        }
    }

    /// Report progress through the given sink instead of `tracing`.
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Override the backoff base unit. Tests shorten this to milliseconds.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Access the wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Invoke the model, retrying transient failures, and return the
    /// trimmed reply text.
    ///
    /// Extraction of structured payloads is the caller's concern; this
    /// method only moves text.
    pub async fn invoke(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        emit(
            self.sink.as_ref(),
            &format!("Contacting {}...", self.backend.label()),
        );

        let mut last_error: Option<LlmError> = None;
        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                let delay = self.base_delay * (1u32 << (attempt - 1));
                emit(
                    self.sink.as_ref(),
                    &format!("Backend busy, retrying in {:?}...", delay),
                );
                tokio::time::sleep(delay).await;
                tracing::debug!(
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying model request after transient failure"
                );
            }

            match self.backend.generate(request).await {
                Ok(text) => {
                    emit(self.sink.as_ref(), "Model response received.");
                    return Ok(text.trim().to_string());
                }
                Err(err) if is_transient(&err) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "Transient backend failure, will retry"
                    );
                    last_error = Some(err);
                }
                Err(err) => {
                    emit(self.sink.as_ref(), &format!("Model request failed: {err}"));
                    return Err(err);
                }
            }
        }

        let source = last_error
            .unwrap_or_else(|| LlmError::RequestFailed("no error captured".to_string()));
        let err = LlmError::RetriesExhausted {
            attempts: self.max_attempts,
            source: Box::new(source),
        };
        emit(self.sink.as_ref(), &format!("Model request failed: {err}"));
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ChannelSink;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Backend that replays a fixed script of outcomes.
    struct ScriptedBackend {
        script: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: std::sync::atomic::AtomicU32,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Result<String, LlmError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: std::sync::atomic::AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelBackend for ScriptedBackend {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, LlmError> {
            self.calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.script
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::RequestFailed("script exhausted".to_string())))
        }

        fn label(&self) -> &str {
            "scripted"
        }
    }

    fn rate_limited() -> Result<String, LlmError> {
        Err(LlmError::RateLimited("slow down".to_string()))
    }

    fn test_request() -> GenerationRequest {
        GenerationRequest::new("system", "user")
    }

    #[test]
    fn request_builder_defaults_and_overrides() {
        let request = GenerationRequest::new("sys", "usr");
        assert_eq!(request.temperature, DEFAULT_TEMPERATURE);
        assert_eq!(request.max_tokens, DEFAULT_MAX_TOKENS);

        let request = request.with_temperature(0.7).with_max_tokens(2048);
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.max_tokens, 2048);

        // Out-of-range temperatures are clamped, not rejected.
        assert_eq!(test_request().with_temperature(9.0).temperature, 2.0);
    }

    #[test]
    fn transient_classification() {
        assert!(is_transient(&LlmError::RateLimited("x".to_string())));
        assert!(is_transient(&LlmError::ApiError {
            code: 500,
            message: "internal".to_string()
        }));
        assert!(is_transient(&LlmError::ApiError {
            code: 503,
            message: "overloaded".to_string()
        }));
        assert!(is_transient(&LlmError::ApiError {
            code: 429,
            message: "rate".to_string()
        }));
        assert!(is_transient(&LlmError::ApiError {
            code: 408,
            message: "request timeout".to_string()
        }));
        assert!(is_transient(&LlmError::RequestFailed(
            "operation timed out".to_string()
        )));

        assert!(!is_transient(&LlmError::ApiError {
            code: 400,
            message: "bad request".to_string()
        }));
        assert!(!is_transient(&LlmError::ApiError {
            code: 401,
            message: "auth".to_string()
        }));
        assert!(!is_transient(&LlmError::LocalRuntimeMissing(
            "no ollama".to_string()
        )));
        assert!(!is_transient(&LlmError::ParseError("bad json".to_string())));
    }

    #[tokio::test]
    async fn succeeds_first_attempt_and_trims() {
        let backend = ScriptedBackend::new(vec![Ok("  ShopList \n".to_string())]);
        let client = ResilientClient::new(backend);

        let reply = client.invoke(&test_request()).await.expect("should succeed");
        assert_eq!(reply, "ShopList");
        assert_eq!(client.backend().calls(), 1);
    }

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let backend = ScriptedBackend::new(vec![
            rate_limited(),
            rate_limited(),
            rate_limited(),
            Ok("done".to_string()),
        ]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = ResilientClient::new(backend)
            .with_base_delay(Duration::from_millis(5))
            .with_progress(Arc::new(ChannelSink::new(tx)));

        let reply = client.invoke(&test_request()).await.expect("should recover");
        assert_eq!(reply, "done");
        assert_eq!(client.backend().calls(), 4);

        let mut messages = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            messages.push(msg);
        }
        assert!(messages[0].starts_with("Contacting"));

        // Exactly three waits, doubling from the base delay.
        let waits: Vec<&String> = messages
            .iter()
            .filter(|m| m.contains("retrying in"))
            .collect();
        assert_eq!(waits.len(), 3);
        assert!(waits[0].contains("5ms"));
        assert!(waits[1].contains("10ms"));
        assert!(waits[2].contains("20ms"));

        assert!(messages.iter().any(|m| m == "Model response received."));
    }

    #[tokio::test]
    async fn exhausts_retries_after_four_attempts() {
        let backend = ScriptedBackend::new(vec![
            rate_limited(),
            rate_limited(),
            rate_limited(),
            rate_limited(),
        ]);
        let client = ResilientClient::new(backend).with_base_delay(Duration::from_millis(1));

        let err = client.invoke(&test_request()).await.expect_err("must fail");
        assert_eq!(client.backend().calls(), 4);
        match err {
            LlmError::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 4);
                assert!(matches!(*source, LlmError::RateLimited(_)));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn terminal_failure_is_not_retried() {
        let backend = ScriptedBackend::new(vec![Err(LlmError::ApiError {
            code: 401,
            message: "bad key".to_string(),
        })]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = ResilientClient::new(backend)
            .with_base_delay(Duration::from_millis(1))
            .with_progress(Arc::new(ChannelSink::new(tx)));

        let err = client.invoke(&test_request()).await.expect_err("must fail");
        assert!(matches!(err, LlmError::ApiError { code: 401, .. }));
        assert_eq!(client.backend().calls(), 1);

        let mut messages = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            messages.push(msg);
        }
        assert!(!messages.iter().any(|m| m.contains("retrying in")));
        assert!(messages.iter().any(|m| m.starts_with("Model request failed")));
    }

    #[tokio::test]
    async fn dropped_progress_receiver_does_not_abort_the_call() {
        let backend = ScriptedBackend::new(vec![Ok("fine".to_string())]);
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let client = ResilientClient::new(backend).with_progress(Arc::new(ChannelSink::new(tx)));

        let reply = client.invoke(&test_request()).await.expect("still succeeds");
        assert_eq!(reply, "fine");
    }

    #[test]
    fn resolve_selects_openrouter() {
        let settings = BackendSettings {
            api_provider: "OpenRouter".to_string(),
            api_model: "openrouter/auto".to_string(),
            api_key: "sk-or-test".to_string(),
            local_model: String::new(),
        };
        let backend = Backend::resolve(&settings).expect("should resolve");
        assert!(!backend.is_local());
        assert_eq!(backend.label(), "OpenRouter");
    }

    #[test]
    fn resolve_selects_gemini_case_insensitively() {
        let settings = BackendSettings {
            api_provider: "  Gemini  ".to_string(),
            api_model: "gemini-1.5-flash".to_string(),
            api_key: "key".to_string(),
            local_model: String::new(),
        };
        let backend = Backend::resolve(&settings).expect("should resolve");
        assert_eq!(backend.label(), "Gemini");
    }

    #[test]
    fn resolve_rejects_unknown_provider() {
        let settings = BackendSettings {
            api_provider: "gpt4all".to_string(),
            api_model: "m".to_string(),
            api_key: "k".to_string(),
            local_model: String::new(),
        };
        let err = Backend::resolve(&settings).expect_err("must reject");
        assert!(matches!(err, LlmError::UnsupportedProvider(p) if p == "gpt4all"));
    }

    #[test]
    fn resolve_falls_back_to_local_when_key_missing() {
        let settings = BackendSettings {
            api_provider: "openrouter".to_string(),
            api_model: "openrouter/auto".to_string(),
            api_key: String::new(),
            local_model: "qwen2.5-coder".to_string(),
        };
        let backend = Backend::resolve(&settings).expect("should resolve");
        assert!(backend.is_local());
        match backend {
            Backend::Local(local) => assert_eq!(local.model(), "qwen2.5-coder"),
            _ => unreachable!(),
        }
    }

    #[test]
    fn resolve_defaults_the_local_model() {
        let backend = Backend::resolve(&BackendSettings::default()).expect("should resolve");
        match backend {
            Backend::Local(local) => {
                assert_eq!(local.model(), super::super::local::DEFAULT_LOCAL_MODEL)
            }
            _ => unreachable!(),
        }
    }
}
