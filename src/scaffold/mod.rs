//! Project skeleton materialization.
//!
//! Copies a static Android project template into a per-run target directory
//! and stamps the chosen app name into the files that identify the project.

pub mod template;

pub use template::{stamp_display_name, ProjectScaffold};
