//! Persisted configuration for appforge.
//!
//! A JSON file holding the backend mode, local and remote model settings,
//! and a history of completed runs. Loading is tolerant: a missing or
//! unreadable file yields defaults, and fields absent from the file keep
//! their default values.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConfigError;
use crate::llm::local::DEFAULT_LOCAL_MODEL;
use crate::llm::BackendSettings;

/// Default location of the config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = ".appforge/config.json";

/// Which backend family generation runs use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Generate against the local Ollama-served engine.
    #[default]
    Local,
    /// Generate against a remote HTTP provider.
    Api,
}

/// Settings for the local engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSettings {
    /// Local runtime kind; only "ollama" is supported.
    pub backend: String,
    /// Model name served by the runtime.
    pub model: String,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            backend: "ollama".to_string(),
            model: DEFAULT_LOCAL_MODEL.to_string(),
        }
    }
}

/// Settings for a remote HTTP provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Provider name ("OpenRouter" or "Gemini").
    pub provider: String,
    /// Model identifier at the provider.
    pub model: String,
    /// API key; empty means not configured.
    pub key: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            provider: "OpenRouter".to_string(),
            model: "openrouter/auto".to_string(),
            key: String::new(),
        }
    }
}

/// One completed generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique id of the run.
    pub id: Uuid,
    /// Display title, normally the chosen app name.
    pub title: String,
    /// The idea the run was generated from.
    pub idea: String,
    /// Where the generated project landed.
    pub project_path: PathBuf,
    /// When the run completed.
    pub created_at: DateTime<Utc>,
}

/// Persisted application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Backend family to use.
    pub mode: Mode,
    /// Local engine settings.
    pub local: LocalSettings,
    /// Remote provider settings.
    pub api: ApiSettings,
    /// History of completed runs, oldest first.
    pub chats: Vec<RunRecord>,
}

impl AppConfig {
    /// Load the configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Load the configuration, falling back to defaults on a missing or
    /// unreadable file.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "ignoring unreadable config file"
                );
                Self::default()
            }
        }
    }

    /// Save the configuration to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Append a completed run to the history.
    pub fn record_run(
        &mut self,
        title: impl Into<String>,
        idea: impl Into<String>,
        project_path: impl Into<PathBuf>,
    ) {
        self.chats.push(RunRecord {
            id: Uuid::new_v4(),
            title: title.into(),
            idea: idea.into(),
            project_path: project_path.into(),
            created_at: Utc::now(),
        });
    }

    /// Backend settings for the configured mode.
    ///
    /// Remote fields feed resolution only in API mode; resolution still
    /// falls back to the local engine when the key is absent.
    pub fn backend_settings(&self) -> BackendSettings {
        match self.mode {
            Mode::Api => BackendSettings {
                api_provider: self.api.provider.clone(),
                api_model: self.api.model.clone(),
                api_key: self.api.key.clone(),
                local_model: self.local.model.clone(),
            },
            Mode::Local => BackendSettings {
                local_model: self.local.model.clone(),
                ..Default::default()
            },
        }
    }
}
