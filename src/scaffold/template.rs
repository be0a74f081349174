//! Template copying and name stamping.
//!
//! Materialization is destructive: an existing directory for the same app
//! name is replaced wholesale, never merged. Machine-specific Gradle
//! configuration is stripped from the copy so a generated project opens
//! cleanly on any machine.

use std::path::{Path, PathBuf};

use regex::{NoExpand, Regex};
use tokio::fs;
use walkdir::WalkDir;

use crate::error::ScaffoldError;

/// Settings file carrying the Gradle project name.
const SETTINGS_FILE: &str = "settings.gradle.kts";

/// Machine-specific Gradle configuration, never copied into a generated
/// project.
const LOCAL_PROPERTIES: &str = "local.properties";

/// Resource file carrying the launcher display name.
const STRINGS_RESOURCE: &str = "app/src/main/res/values/strings.xml";

/// Copies the project template into per-run target directories.
#[derive(Debug, Clone)]
pub struct ProjectScaffold {
    template_dir: PathBuf,
    output_dir: PathBuf,
}

impl ProjectScaffold {
    /// Create a scaffold reading from `template_dir` and writing project
    /// directories under `output_dir`.
    pub fn new(template_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            template_dir: template_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Get the output directory projects are materialized under.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Materialize the skeleton as `<output>/<app_name>` and return the
    /// target directory.
    ///
    /// An existing directory of the same name is removed first. After the
    /// copy, `local.properties` is stripped and the Gradle project name in
    /// `settings.gradle.kts` is rewritten to `app_name`. Idempotent per
    /// name and model-free.
    pub async fn materialize(&self, app_name: &str) -> Result<PathBuf, ScaffoldError> {
        if !self.template_dir.is_dir() {
            return Err(ScaffoldError::TemplateMissing(self.template_dir.clone()));
        }

        fs::create_dir_all(&self.output_dir).await?;
        let target_dir = self.output_dir.join(app_name);
        if target_dir.exists() {
            fs::remove_dir_all(&target_dir).await?;
        }
        copy_tree(&self.template_dir, &target_dir).await?;

        let local_props = target_dir.join(LOCAL_PROPERTIES);
        if let Err(err) = fs::remove_file(&local_props).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(error = %err, "could not strip local.properties");
            }
        }

        stamp_project_name(&target_dir, app_name).await?;

        Ok(target_dir)
    }
}

/// Recursively copy a directory tree.
async fn copy_tree(from: &Path, to: &Path) -> Result<(), ScaffoldError> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| ScaffoldError::Copy {
            path: from.to_path_buf(),
            source: e.into(),
        })?;
        let Ok(rel) = entry.path().strip_prefix(from) else {
            continue;
        };
        if rel.as_os_str().is_empty() {
            continue;
        }

        let dest = to.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).await?;
        } else {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::copy(entry.path(), &dest)
                .await
                .map_err(|source| ScaffoldError::Copy {
                    path: entry.path().to_path_buf(),
                    source,
                })?;
        }
    }
    Ok(())
}

/// Rewrite the `rootProject.name` assignment in the settings file.
///
/// Matches any existing name rather than the template's literal one, so the
/// stamp survives template edits. A template without a settings file is
/// tolerated.
async fn stamp_project_name(target_dir: &Path, app_name: &str) -> Result<(), ScaffoldError> {
    let settings_path = target_dir.join(SETTINGS_FILE);
    let text = match fs::read_to_string(&settings_path).await {
        Ok(text) => text,
        Err(err) => {
            tracing::debug!(error = %err, "settings file not stamped");
            return Ok(());
        }
    };

    let pattern = Regex::new(r#"rootProject\.name\s*=\s*"[^"]*""#)?;
    let replacement = format!("rootProject.name = \"{app_name}\"");
    let stamped = pattern.replace(&text, NoExpand(&replacement));
    fs::write(&settings_path, stamped.as_bytes()).await?;
    Ok(())
}

/// Rewrite the launcher display name inside `strings.xml`.
///
/// Cosmetic post-processing: a missing pattern leaves the file untouched
/// and reports success, and callers treat IO failures as non-critical.
pub async fn stamp_display_name(project_dir: &Path, app_name: &str) -> Result<(), ScaffoldError> {
    let strings_path = project_dir.join(STRINGS_RESOURCE);
    let text = fs::read_to_string(&strings_path).await?;

    let pattern = Regex::new(r#"<string name="app_name">[^<]*</string>"#)?;
    if !pattern.is_match(&text) {
        return Ok(());
    }

    let replacement = format!("<string name=\"app_name\">{app_name}</string>");
    let stamped = pattern.replace(&text, NoExpand(&replacement));
    fs::write(&strings_path, stamped.as_bytes()).await?;
    Ok(())
}
