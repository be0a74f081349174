//! Google Gemini provider implementation.
//!
//! Gemini has no system-role message on its generateContent endpoint, so the
//! system prompt is flattened into the single user turn.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LlmError;
use crate::llm::client::{GenerationRequest, ModelBackend};

/// Default Gemini API endpoint.
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Nucleus sampling parameter sent with every request.
const TOP_P: f64 = 0.9;

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Gemini backend for LLM requests.
pub struct GeminiProvider {
    /// HTTP client for making API requests.
    client: Client,
    /// API key, passed as a query parameter.
    api_key: String,
    /// Base URL for the Gemini API.
    base_url: String,
    /// Model identifier (e.g. "gemini-1.5-flash").
    model: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider with the given API key and model.
    pub fn new(api_key: String, model: String) -> Self {
        Self::with_custom_url(api_key, GEMINI_BASE_URL.to_string(), model)
    }

    /// Create a provider with a custom base URL.
    pub fn with_custom_url(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client - system TLS configuration error"),
            api_key,
            base_url,
            model,
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the configured model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Flatten system and user prompts into Gemini's single-turn format.
    fn flatten_prompt(request: &GenerationRequest) -> String {
        format!(
            "System:\n{}\n\nUser:\n{}",
            request.system_prompt, request.user_prompt
        )
    }
}

#[async_trait]
impl ModelBackend for GeminiProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let api_request = ApiRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: Self::flatten_prompt(request),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                top_p: TOP_P,
                max_output_tokens: request.max_tokens,
            },
        };

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let http_response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;

        let status = http_response.status();

        if !status.is_success() {
            let status_code = status.as_u16();
            let error_text = http_response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());

            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&error_text) {
                if status_code == 429 {
                    return Err(LlmError::RateLimited(error_response.error.message));
                }
                return Err(LlmError::ApiError {
                    code: status_code,
                    message: error_response.error.message,
                });
            }

            return Err(LlmError::ApiError {
                code: status_code,
                message: error_text,
            });
        }

        let api_response: ApiResponse = http_response
            .json()
            .await
            .map_err(|e| LlmError::ParseError(format!("Failed to parse API response: {}", e)))?;

        api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content.parts.into_iter().next())
            .map(|part| part.text)
            .ok_or(LlmError::EmptyCompletion)
    }

    fn label(&self) -> &str {
        "Gemini"
    }
}

/// Internal request structure for the Gemini API.
#[derive(Debug, Serialize)]
struct ApiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

/// A single conversation turn.
#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

/// One text part of a turn.
#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

/// Sampling configuration for the request.
#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f64,
    #[serde(rename = "topP")]
    top_p: f64,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

/// Internal response structure from the Gemini API.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// One generated candidate.
#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

/// Generated content of a candidate.
#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

/// One text part of the generated content.
#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

/// Error response from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

/// Error detail from the API.
#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}
