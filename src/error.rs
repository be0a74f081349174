//! Error types for appforge operations.
//!
//! Defines error types for the major subsystems:
//! - LLM backend invocation (remote HTTP providers, local engine)
//! - Pipeline orchestration and cancellation
//! - Project skeleton materialization
//! - Persisted configuration

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during LLM operations.
///
/// Transient variants (rate limiting, 5xx-class API failures, request
/// timeouts) are retried by the resilient client; everything else is
/// terminal and surfaces immediately.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Unsupported provider '{0}': choose 'openrouter' or 'gemini'")]
    UnsupportedProvider(String),

    #[error("Local model runtime unavailable: {0}")]
    LocalRuntimeMissing(String),

    #[error("Local inference failed: {0}")]
    InferenceFailed(String),

    #[error("Model returned an empty completion")]
    EmptyCompletion,

    #[error("Giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<LlmError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while materializing the project skeleton.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("Template directory '{}' not found", .0.display())]
    TemplateMissing(PathBuf),

    #[error("Failed to copy '{}': {source}", .path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid substitution pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during a generation pipeline run.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The cancellation gate reported a stop request at a stage boundary.
    #[error("Operation cancelled")]
    Cancelled,

    /// A model invocation failed terminally while running the named stage.
    #[error("Model backend failed during the {stage} stage: {source}")]
    Backend {
        stage: String,
        #[source]
        source: LlmError,
    },

    #[error("Scaffold error: {0}")]
    Scaffold(#[from] ScaffoldError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors for the persisted configuration store.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Malformed config file: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
