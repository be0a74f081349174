//! CLI command definitions for appforge.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use crate::config::{AppConfig, Mode, DEFAULT_CONFIG_PATH};
use crate::llm::{Backend, BackendSettings, ResilientClient};
use crate::pipeline::ForgePipeline;
use crate::scaffold::ProjectScaffold;

/// Default project template copied for every generated app.
const DEFAULT_TEMPLATE_DIR: &str = "./Empty_Activity_android_studio_base_template";

/// Default output directory for generated projects.
const DEFAULT_OUTPUT_DIR: &str = "./output_projects";

/// Turn a free-text app idea into a populated Android project skeleton.
#[derive(Parser)]
#[command(name = "appforge")]
#[command(about = "Generate an Android app skeleton from a one-line idea")]
#[command(version)]
#[command(
    long_about = "appforge turns a plain-words app idea into a populated Android project: it picks a name, plans the architecture, then generates the activity, layout, manifest, and build files with an LLM.\n\nExample usage:\n  appforge generate \"A shopping list app with categories\" --provider openrouter --model openrouter/auto --api-key $APPFORGE_API_KEY"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Generate a new Android project from an idea.
    #[command(alias = "gen")]
    Generate(GenerateArgs),

    /// Show or update the persisted configuration.
    Config(ConfigArgs),
}

/// Arguments for `appforge generate`.
#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// The app idea, in plain words.
    pub idea: String,

    /// Remote provider name ("openrouter" or "gemini"). Overrides the
    /// config file.
    #[arg(long)]
    pub provider: Option<String>,

    /// Remote model identifier. Overrides the config file.
    #[arg(short = 'm', long)]
    pub model: Option<String>,

    /// Remote API key (can also be set via APPFORGE_API_KEY).
    #[arg(long, env = "APPFORGE_API_KEY")]
    pub api_key: Option<String>,

    /// Local model name served by Ollama. Overrides the config file.
    #[arg(long)]
    pub local_model: Option<String>,

    /// Output directory for generated projects.
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Project template directory to copy.
    #[arg(short = 't', long, default_value = DEFAULT_TEMPLATE_DIR)]
    pub template: PathBuf,

    /// Config file path.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Arguments for `appforge config`.
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Config subcommand to run.
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

/// Config subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Print the current configuration (API key masked).
    Show {
        /// Config file path.
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Store backend settings.
    Set(ConfigSetArgs),
}

/// Arguments for `appforge config set`.
#[derive(Parser, Debug)]
pub struct ConfigSetArgs {
    /// Backend mode: "local" or "api".
    #[arg(long)]
    pub mode: Option<String>,

    /// Remote provider name.
    #[arg(long)]
    pub provider: Option<String>,

    /// Remote model identifier.
    #[arg(long)]
    pub model: Option<String>,

    /// Remote API key.
    #[arg(long)]
    pub api_key: Option<String>,

    /// Local model name served by Ollama.
    #[arg(long)]
    pub local_model: Option<String>,

    /// Config file path.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

/// Parse CLI arguments from the process environment.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Parse and run in one step.
pub async fn run() -> anyhow::Result<()> {
    run_with_cli(parse_cli()).await
}

/// Run the given parsed CLI invocation.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => run_generate(args).await,
        Commands::Config(args) => run_config(args),
    }
}

async fn run_generate(args: GenerateArgs) -> anyhow::Result<()> {
    let mut config = AppConfig::load_or_default(&args.config);
    let settings = merge_settings(&config, &args);

    let backend = Backend::resolve(&settings)?;
    info!(
        backend = if backend.is_local() { "local" } else { "remote" },
        "Backend resolved"
    );

    // Ctrl-C requests a cooperative stop; the pipeline polls the flag at
    // the next stage boundary.
    let stop_flag = Arc::new(AtomicBool::new(false));
    let signal_flag = stop_flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stop requested; aborting at the next stage boundary");
            signal_flag.store(true, Ordering::SeqCst);
        }
    });

    let pipeline = ForgePipeline::new(
        ResilientClient::new(backend),
        ProjectScaffold::new(&args.template, &args.output),
    )
    .with_cancellation(Arc::new(move || stop_flag.load(Ordering::SeqCst)));

    let project_dir = pipeline.run(&args.idea).await?;

    let title = project_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string());
    config.record_run(title, &args.idea, &project_dir);
    if let Err(err) = config.save(&args.config) {
        warn!(error = %err, "could not persist run history");
    }

    println!("{}", project_dir.display());
    Ok(())
}

fn run_config(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigSubcommand::Show { config } => {
            let cfg = AppConfig::load_or_default(&config);
            println!("mode: {:?}", cfg.mode);
            println!("local: {} ({})", cfg.local.model, cfg.local.backend);
            println!(
                "api: {} / {} (key: {})",
                cfg.api.provider,
                cfg.api.model,
                mask_key(&cfg.api.key)
            );
            println!("runs recorded: {}", cfg.chats.len());
        }
        ConfigSubcommand::Set(set) => {
            let mut cfg = AppConfig::load_or_default(&set.config);
            if let Some(mode) = &set.mode {
                cfg.mode = match mode.to_lowercase().as_str() {
                    "local" => Mode::Local,
                    "api" => Mode::Api,
                    other => anyhow::bail!("unknown mode '{other}', expected 'local' or 'api'"),
                };
            }
            if let Some(provider) = set.provider {
                cfg.api.provider = provider;
            }
            if let Some(model) = set.model {
                cfg.api.model = model;
            }
            if let Some(key) = set.api_key {
                cfg.api.key = key;
            }
            if let Some(local_model) = set.local_model {
                cfg.local.model = local_model;
            }
            cfg.save(&set.config)?;
            println!("Configuration saved to {}", set.config.display());
        }
    }
    Ok(())
}

/// Overlay CLI flags onto the persisted backend settings.
fn merge_settings(config: &AppConfig, args: &GenerateArgs) -> BackendSettings {
    let mut settings = config.backend_settings();
    if let Some(provider) = &args.provider {
        settings.api_provider = provider.clone();
    }
    if let Some(model) = &args.model {
        settings.api_model = model.clone();
    }
    if let Some(key) = &args.api_key {
        settings.api_key = key.clone();
    }
    if let Some(local_model) = &args.local_model {
        settings.local_model = local_model.clone();
    }
    settings
}

/// Mask an API key for display.
fn mask_key(key: &str) -> String {
    if key.is_empty() {
        "unset".to_string()
    } else if key.len() <= 8 {
        "*".repeat(key.len())
    } else {
        format!("{}...{}", &key[..4], &key[key.len() - 4..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn generate_parses_flags() {
        let cli = Cli::try_parse_from([
            "appforge",
            "generate",
            "a shopping list app",
            "--provider",
            "openrouter",
            "-m",
            "openrouter/auto",
            "--api-key",
            "sk-test",
        ])
        .expect("should parse");

        match cli.command {
            Commands::Generate(args) => {
                assert_eq!(args.idea, "a shopping list app");
                assert_eq!(args.provider.as_deref(), Some("openrouter"));
                assert_eq!(args.model.as_deref(), Some("openrouter/auto"));
                assert_eq!(args.api_key.as_deref(), Some("sk-test"));
                assert_eq!(args.output, PathBuf::from(DEFAULT_OUTPUT_DIR));
                assert_eq!(args.template, PathBuf::from(DEFAULT_TEMPLATE_DIR));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn cli_flags_override_config_settings() {
        let config = AppConfig::default();
        let cli = Cli::try_parse_from([
            "appforge",
            "generate",
            "idea",
            "--provider",
            "gemini",
            "-m",
            "gemini-1.5-flash",
            "--api-key",
            "k",
        ])
        .expect("should parse");
        let Commands::Generate(args) = cli.command else {
            panic!("expected generate");
        };

        let settings = merge_settings(&config, &args);
        assert_eq!(settings.api_provider, "gemini");
        assert_eq!(settings.api_model, "gemini-1.5-flash");
        assert_eq!(settings.api_key, "k");
    }

    #[test]
    fn key_masking() {
        assert_eq!(mask_key(""), "unset");
        assert_eq!(mask_key("short"), "*****");
        assert_eq!(mask_key("sk-1234567890abcdef"), "sk-1...cdef");
    }
}
