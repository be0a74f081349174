//! LLM integration for appforge.
//!
//! This module provides the model-invocation layer of the generation
//! pipeline: a uniform [`ModelBackend`] contract over remote HTTP providers
//! (OpenRouter, Gemini) and a local Ollama-served engine, plus the
//! [`ResilientClient`] that wraps a backend with bounded exponential-backoff
//! retries and progress reporting.
//!
//! # Backend selection
//!
//! The concrete backend is resolved once per pipeline run from
//! [`BackendSettings`]: a fully specified remote configuration
//! (provider + model + key) selects the matching HTTP provider, anything
//! less falls back to the local engine.
//!
//! ```no_run
//! use appforge::llm::{Backend, BackendSettings, GenerationRequest, ResilientClient};
//!
//! # async fn demo() -> Result<(), appforge::LlmError> {
//! let settings = BackendSettings {
//!     api_provider: "openrouter".to_string(),
//!     api_model: "openrouter/auto".to_string(),
//!     api_key: "sk-or-...".to_string(),
//!     ..Default::default()
//! };
//! let client = ResilientClient::new(Backend::resolve(&settings)?);
//!
//! let request = GenerationRequest::new(
//!     "You are an expert Android app developer.",
//!     "Choose a short, friendly app name for a todo list app.",
//! );
//! let reply = client.invoke(&request).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod local;
pub mod providers;

pub use client::{
    Backend, BackendSettings, GenerationRequest, ModelBackend, RemoteBackend, ResilientClient,
};
pub use local::OllamaBackend;
pub use providers::{GeminiProvider, OpenRouterProvider};
