//! App generation pipeline.
//!
//! This module provides the orchestrator that coordinates:
//! - Name selection and architecture planning
//! - Project skeleton materialization
//! - Ordered file generation with accumulating context
//! - Cooperative, stage-boundary cancellation
//!
//! # Example
//!
//! ```no_run
//! use appforge::llm::{Backend, BackendSettings, ResilientClient};
//! use appforge::pipeline::ForgePipeline;
//! use appforge::scaffold::ProjectScaffold;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let backend = Backend::resolve(&BackendSettings::default())?;
//! let pipeline = ForgePipeline::new(
//!     ResilientClient::new(backend),
//!     ProjectScaffold::new("./template", "./output_projects"),
//! );
//! let project_dir = pipeline.run("A shopping list app with categories").await?;
//! # Ok(())
//! # }
//! ```

pub mod orchestrator;
pub mod stage;

pub use orchestrator::{CancelCheck, ForgePipeline};
pub use stage::{
    PipelineState, StageSpec, ACTIVITY_PATH, FILE_STAGES, GRADLE_PATH, LAYOUT_PATH, MANIFEST_PATH,
    STAGE_ACTIVITY, STAGE_GRADLE, STAGE_LAYOUT, STAGE_MANIFEST,
};
