//! Generation pipeline orchestrator.
//!
//! Runs the fixed stage sequence for one app idea: choose a name,
//! materialize the project skeleton, draft an architecture plan, then
//! generate the four file artifacts with accumulating context, and finally
//! stamp the display name. Stages execute strictly sequentially; each later
//! stage's prompt depends on earlier outputs.
//!
//! Cancellation is cooperative and polled only at stage boundaries: an
//! in-flight model call is never interrupted, and files written by earlier
//! stages stay on disk when a run is cancelled or fails.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::fs;

use crate::error::AgentError;
use crate::llm::{GenerationRequest, ModelBackend, ResilientClient};
use crate::progress::{emit, LogSink, ProgressSink};
use crate::prompts;
use crate::scaffold::{self, ProjectScaffold};
use crate::utils::response_extraction::extract;

use super::stage::{PipelineState, StageSpec, FILE_STAGES};

/// Fallback app name when the model returns nothing usable.
const FALLBACK_APP_NAME: &str = "MyApp";

/// Maximum length of a chosen app name, in characters.
const MAX_APP_NAME_CHARS: usize = 40;

/// Maximum length of a raw-response preview, in characters.
const PREVIEW_CHARS: usize = 4000;

/// Cancellation predicate polled at stage boundaries.
pub type CancelCheck = Arc<dyn Fn() -> bool + Send + Sync>;

/// Orchestrates one app generation run.
///
/// Single-shot: construct, call [`ForgePipeline::run`] once per idea. The
/// pipeline owns its [`PipelineState`] for exactly one run; concurrent runs
/// each get their own pipeline and target directory.
pub struct ForgePipeline<B: ModelBackend> {
    client: ResilientClient<B>,
    scaffold: ProjectScaffold,
    sink: Arc<dyn ProgressSink>,
    should_stop: CancelCheck,
}

impl<B: ModelBackend> ForgePipeline<B> {
    /// Create a pipeline over a resolved model client and scaffold.
    pub fn new(client: ResilientClient<B>, scaffold: ProjectScaffold) -> Self {
        Self {
            client,
            scaffold,
            sink: Arc::new(LogSink),
            should_stop: Arc::new(|| false),
        }
    }

    /// Report progress through the given sink instead of `tracing`.
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Poll the given predicate for cancellation between stages.
    pub fn with_cancellation(mut self, should_stop: CancelCheck) -> Self {
        self.should_stop = should_stop;
        self
    }

    /// Run the pipeline for `idea` and return the project directory.
    pub async fn run(&self, idea: &str) -> Result<PathBuf, AgentError> {
        let mut state = PipelineState::new(idea);

        self.checkpoint()?;
        emit(self.sink.as_ref(), "⚙️ Setting up your app foundation...");
        state.app_name = self.choose_app_name(idea).await?;

        self.checkpoint()?;
        state.target_dir = self.scaffold.materialize(&state.app_name).await?;

        self.checkpoint()?;
        emit(self.sink.as_ref(), "🔍 Planning your app structure...");
        state.architecture_plan = self.plan_architecture(&state).await?;

        for spec in FILE_STAGES {
            self.checkpoint()?;
            self.generate_file(&mut state, spec).await?;
        }

        self.checkpoint()?;
        non_critical(
            "display name substitution",
            scaffold::stamp_display_name(&state.target_dir, &state.app_name).await,
        );

        emit(self.sink.as_ref(), "✅ Your Android app is ready!");
        Ok(state.target_dir)
    }

    /// Raise the distinct cancellation error if a stop was requested.
    fn checkpoint(&self) -> Result<(), AgentError> {
        if (self.should_stop)() {
            Err(AgentError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn choose_app_name(&self, idea: &str) -> Result<String, AgentError> {
        let request =
            GenerationRequest::new(prompts::SYSTEM_PROMPT, prompts::name_instruction(idea));
        // The name reply is taken verbatim; no structured payload expected.
        let raw = self.invoke("name", &request).await?;
        Ok(sanitize_app_name(&raw))
    }

    async fn plan_architecture(&self, state: &PipelineState) -> Result<String, AgentError> {
        let request = GenerationRequest::new(
            prompts::SYSTEM_PROMPT,
            prompts::plan_instruction(&state.idea, &state.app_name),
        );
        self.invoke("plan", &request).await
    }

    /// Generate one file artifact and append its content to the state.
    async fn generate_file(
        &self,
        state: &mut PipelineState,
        spec: &StageSpec,
    ) -> Result<(), AgentError> {
        emit(self.sink.as_ref(), spec.progress_message);

        let path = state.target_dir.join(spec.target_path);
        let existing = fs::read_to_string(&path).await.unwrap_or_default();
        let context = (spec.context_selector)(state);
        let request = GenerationRequest::new(
            prompts::SYSTEM_PROMPT,
            prompts::file_prompt(&state.idea, &context, &existing),
        );

        let raw = self.invoke(spec.name, &request).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| spec.name.to_string());
        emit(
            self.sink.as_ref(),
            &format!("🧠 {file_name} response:\n{}", preview(&raw)),
        );

        let extracted = extract(&raw);
        if !extracted.was_structured {
            tracing::warn!(
                stage = spec.name,
                "model reply was not structured JSON; writing raw text"
            );
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &extracted.content).await?;
        state.record(spec.name, extracted.content);
        Ok(())
    }

    /// Invoke the model, attaching the stage name to terminal failures.
    async fn invoke(&self, stage: &str, request: &GenerationRequest) -> Result<String, AgentError> {
        self.client
            .invoke(request)
            .await
            .map_err(|source| AgentError::Backend {
                stage: stage.to_string(),
                source,
            })
    }
}

/// Trim, collapse newlines, cap length, and fall back if empty.
fn sanitize_app_name(raw: &str) -> String {
    let collapsed = raw.trim().replace('\n', " ");
    let capped: String = collapsed.chars().take(MAX_APP_NAME_CHARS).collect();
    let name = capped.trim().to_string();
    if name.is_empty() {
        FALLBACK_APP_NAME.to_string()
    } else {
        name
    }
}

/// First [`PREVIEW_CHARS`] characters of a raw model response.
fn preview(raw: &str) -> String {
    let mut truncated: String = raw.chars().take(PREVIEW_CHARS).collect();
    if truncated.len() < raw.len() {
        truncated.push_str("\n...");
    }
    truncated
}

/// Record a cosmetic failure without letting it affect control flow.
///
/// Kept separate from real error paths: anything routed through here is, at
/// worst, a logged debug line.
fn non_critical<E: std::fmt::Display>(operation: &str, outcome: Result<(), E>) {
    if let Err(err) = outcome {
        tracing::debug!(operation, error = %err, "non-critical operation failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_name_is_trimmed_and_newlines_collapsed() {
        assert_eq!(sanitize_app_name("  ShopList \n"), "ShopList");
        assert_eq!(sanitize_app_name("Shop\nList"), "Shop List");
    }

    #[test]
    fn app_name_is_capped_at_forty_characters() {
        let long = "A".repeat(120);
        assert_eq!(sanitize_app_name(&long).chars().count(), 40);
    }

    #[test]
    fn empty_or_blank_names_fall_back() {
        assert_eq!(sanitize_app_name(""), FALLBACK_APP_NAME);
        assert_eq!(sanitize_app_name("   \n  "), FALLBACK_APP_NAME);
    }

    #[test]
    fn preview_passes_short_responses_through() {
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn preview_truncates_long_responses() {
        let long = "x".repeat(PREVIEW_CHARS + 100);
        let p = preview(&long);
        assert!(p.ends_with("\n..."));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 4);
    }

    #[test]
    fn non_critical_swallows_failures() {
        // Must not panic; the error only becomes a debug log line.
        non_critical("test operation", Err("boom"));
        non_critical::<&str>("test operation", Ok(()));
    }
}
