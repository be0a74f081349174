//! Pipeline state and the fixed stage topology.
//!
//! The file-generation stages run in a fixed order, and each stage's
//! context selector may only read outputs of strictly earlier stages. That
//! ordering is the dependency graph: the layout must stay consistent with
//! the activity code it renders, the manifest references both, and the
//! build configuration follows the activity code.

use std::path::PathBuf;

/// Append-only record of one pipeline run.
///
/// Owned exclusively by the orchestrator for the lifetime of a single run
/// and destroyed when the run ends. Outputs are only appended, in
/// generation order; previously recorded content is never rewritten.
#[derive(Debug, Default)]
pub struct PipelineState {
    /// The user's free-text app idea.
    pub idea: String,
    /// App name chosen by the name stage.
    pub app_name: String,
    /// Architecture plan text; feeds later prompts, never written to disk.
    pub architecture_plan: String,
    /// Project directory; fixed once the skeleton is materialized.
    pub target_dir: PathBuf,
    /// Generated file contents keyed by stage name, in generation order.
    stage_outputs: Vec<(String, String)>,
}

impl PipelineState {
    /// Create the state for a new run.
    pub fn new(idea: impl Into<String>) -> Self {
        Self {
            idea: idea.into(),
            ..Default::default()
        }
    }

    /// Append one stage's generated content.
    pub fn record(&mut self, stage: &str, content: String) {
        debug_assert!(
            self.output(stage).is_none(),
            "stage '{stage}' recorded twice"
        );
        self.stage_outputs.push((stage.to_string(), content));
    }

    /// Get the content recorded for a stage, if it has run.
    pub fn output(&self, stage: &str) -> Option<&str> {
        self.stage_outputs
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, content)| content.as_str())
    }

    /// All recorded outputs, in generation order.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.stage_outputs
            .iter()
            .map(|(name, content)| (name.as_str(), content.as_str()))
    }
}

/// Static descriptor for one generated file artifact.
pub struct StageSpec {
    /// Stage name, also the key its output is recorded under.
    pub name: &'static str,
    /// Path of the generated file, relative to the project directory.
    pub target_path: &'static str,
    /// Friendly status line announced before the stage runs.
    pub progress_message: &'static str,
    /// Selects which earlier outputs feed this stage's prompt.
    pub context_selector: fn(&PipelineState) -> String,
}

/// Stage name of the activity-code artifact.
pub const STAGE_ACTIVITY: &str = "activity";
/// Stage name of the layout artifact.
pub const STAGE_LAYOUT: &str = "layout";
/// Stage name of the manifest artifact.
pub const STAGE_MANIFEST: &str = "manifest";
/// Stage name of the Gradle build-configuration artifact.
pub const STAGE_GRADLE: &str = "gradle";

/// Relative path of the generated main activity.
pub const ACTIVITY_PATH: &str =
    "app/src/main/java/com/example/empty_activity_android_studio_base_template/MainActivity.kt";
/// Relative path of the generated main layout.
pub const LAYOUT_PATH: &str = "app/src/main/res/layout/activity_main.xml";
/// Relative path of the generated manifest.
pub const MANIFEST_PATH: &str = "app/src/main/AndroidManifest.xml";
/// Relative path of the generated app-module build file.
pub const GRADLE_PATH: &str = "app/build.gradle.kts";

/// The ordered file-generation stages.
///
/// Order is load-bearing: selectors read earlier outputs by name, and the
/// orchestrator runs the stages exactly in this sequence.
pub const FILE_STAGES: &[StageSpec] = &[
    StageSpec {
        name: STAGE_ACTIVITY,
        target_path: ACTIVITY_PATH,
        progress_message: "📱 Creating your app's main screen...",
        context_selector: activity_context,
    },
    StageSpec {
        name: STAGE_LAYOUT,
        target_path: LAYOUT_PATH,
        progress_message: "🎨 Designing your app interface...",
        context_selector: layout_context,
    },
    StageSpec {
        name: STAGE_MANIFEST,
        target_path: MANIFEST_PATH,
        progress_message: "🧭 Configuring your app settings...",
        context_selector: manifest_context,
    },
    StageSpec {
        name: STAGE_GRADLE,
        target_path: GRADLE_PATH,
        progress_message: "🧩 Finalizing your app build setup...",
        context_selector: gradle_context,
    },
];

fn activity_context(state: &PipelineState) -> String {
    join_sections(vec![plan_section(state)])
}

fn layout_context(state: &PipelineState) -> String {
    join_sections(vec![
        plan_section(state),
        output_section(state, STAGE_ACTIVITY, "MainActivity.kt"),
    ])
}

fn manifest_context(state: &PipelineState) -> String {
    join_sections(vec![
        plan_section(state),
        output_section(state, STAGE_ACTIVITY, "MainActivity.kt"),
        output_section(state, STAGE_LAYOUT, "activity_main.xml"),
    ])
}

fn gradle_context(state: &PipelineState) -> String {
    join_sections(vec![
        plan_section(state),
        output_section(state, STAGE_ACTIVITY, "MainActivity.kt"),
    ])
}

fn plan_section(state: &PipelineState) -> String {
    if state.architecture_plan.is_empty() {
        String::new()
    } else {
        format!("Architecture plan:\n{}", state.architecture_plan)
    }
}

fn output_section(state: &PipelineState, stage: &str, label: &str) -> String {
    match state.output(stage) {
        Some(content) => format!("{label}:\n{content}"),
        None => String::new(),
    }
}

fn join_sections(sections: Vec<String>) -> String {
    sections
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_outputs() -> PipelineState {
        let mut state = PipelineState::new("a shopping list app");
        state.app_name = "ShopList".to_string();
        state.architecture_plan = "one activity, one layout".to_string();
        state.record(STAGE_ACTIVITY, "class MainActivity".to_string());
        state.record(STAGE_LAYOUT, "<LinearLayout />".to_string());
        state
    }

    #[test]
    fn outputs_preserve_generation_order() {
        let state = state_with_outputs();
        let names: Vec<&str> = state.outputs().map(|(name, _)| name).collect();
        assert_eq!(names, vec![STAGE_ACTIVITY, STAGE_LAYOUT]);
        assert_eq!(state.output(STAGE_ACTIVITY), Some("class MainActivity"));
        assert_eq!(state.output(STAGE_MANIFEST), None);
    }

    #[test]
    fn layout_context_includes_the_exact_activity_content() {
        let state = state_with_outputs();
        let context = layout_context(&state);
        assert!(context.contains("class MainActivity"));
        assert!(context.contains("Architecture plan:"));
    }

    #[test]
    fn manifest_context_includes_activity_and_layout() {
        let state = state_with_outputs();
        let context = manifest_context(&state);
        assert!(context.contains("class MainActivity"));
        assert!(context.contains("<LinearLayout />"));
    }

    #[test]
    fn gradle_context_includes_activity_but_not_layout() {
        let state = state_with_outputs();
        let context = gradle_context(&state);
        assert!(context.contains("class MainActivity"));
        assert!(!context.contains("<LinearLayout />"));
    }

    #[test]
    fn selectors_tolerate_missing_outputs() {
        let state = PipelineState::new("idea");
        assert_eq!(activity_context(&state), "");
        assert_eq!(layout_context(&state), "");
        assert_eq!(manifest_context(&state), "");
    }

    #[test]
    fn stage_topology_is_the_expected_sequence() {
        let names: Vec<&str> = FILE_STAGES.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![STAGE_ACTIVITY, STAGE_LAYOUT, STAGE_MANIFEST, STAGE_GRADLE]
        );
        assert!(FILE_STAGES
            .iter()
            .all(|s| !s.target_path.starts_with('/')));
    }
}
