//! Shared utility functions for appforge.
//!
//! This module provides common utilities used across multiple modules,
//! currently the defensive extraction of file content from LLM responses.

pub mod response_extraction;

pub use response_extraction::{extract, ExtractedContent};
