//! Local model backend served by an Ollama runtime.
//!
//! The local path carries none of the remote retry semantics: an
//! unreachable runtime maps to [`LlmError::LocalRuntimeMissing`], which the
//! resilient client treats as terminal.

use async_trait::async_trait;
use ollama_rs::generation::chat::{request::ChatMessageRequest, ChatMessage};
use ollama_rs::models::ModelOptions;
use ollama_rs::Ollama;

use crate::error::LlmError;
use crate::llm::client::{GenerationRequest, ModelBackend};

/// Default host of the local Ollama runtime.
const DEFAULT_HOST: &str = "http://localhost";

/// Default port of the local Ollama runtime.
const DEFAULT_PORT: u16 = 11434;

/// Model used when the configuration names none.
pub const DEFAULT_LOCAL_MODEL: &str = "llama3.2";

/// Nucleus sampling parameter sent with every request.
const TOP_P: f32 = 0.9;

/// Backend that generates against a locally running Ollama instance.
pub struct OllamaBackend {
    client: Ollama,
    model: String,
}

impl OllamaBackend {
    /// Create a backend against the default local endpoint.
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_HOST, DEFAULT_PORT, model)
    }

    /// Create a backend against a custom endpoint.
    pub fn with_endpoint(host: &str, port: u16, model: impl Into<String>) -> Self {
        Self {
            client: Ollama::new(host.to_string(), port),
            model: model.into(),
        }
    }

    /// Get the configured model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check whether the local runtime is reachable.
    pub async fn is_available(&self) -> bool {
        self.client.list_local_models().await.is_ok()
    }
}

#[async_trait]
impl ModelBackend for OllamaBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        // Probe the runtime first so an absent engine surfaces as the
        // distinct terminal error instead of a generic request failure.
        self.client
            .list_local_models()
            .await
            .map_err(|e| LlmError::LocalRuntimeMissing(e.to_string()))?;

        let messages = vec![
            ChatMessage::system(request.system_prompt.clone()),
            ChatMessage::user(request.user_prompt.clone()),
        ];
        let options = ModelOptions::default()
            .temperature(request.temperature as f32)
            .num_predict(request.max_tokens as i32)
            .top_p(TOP_P);

        let chat_request = ChatMessageRequest::new(self.model.clone(), messages).options(options);
        let response = self
            .client
            .send_chat_messages(chat_request)
            .await
            .map_err(|e| LlmError::InferenceFailed(e.to_string()))?;

        Ok(response.message.content)
    }

    fn label(&self) -> &str {
        "local model"
    }
}
