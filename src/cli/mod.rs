//! Command-line interface for appforge.
//!
//! Provides the `generate` command driving the generation pipeline and a
//! `config` command for the persisted backend settings.

mod commands;

pub use commands::{parse_cli, run, run_with_cli, Cli};
