//! System prompt loading

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// ChatHDI persona, sent as the system instruction on every request
pub const SYSTEM_PROMPT: &str = include_str!("../prompts/system.md");

/// Load the system prompt from `path`, or the built-in persona when `None`
pub fn load_system_prompt(path: Option<&Path>) -> Result<String> {
    let Some(path) = path else {
        return Ok(SYSTEM_PROMPT.to_string());
    };

    let prompt = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read system prompt from {}", path.display()))?;
    let prompt = prompt.trim().to_string();
    if prompt.is_empty() {
        debug!("System prompt file {} is empty, using built-in", path.display());
        return Ok(SYSTEM_PROMPT.to_string());
    }

    debug!("Loaded system prompt ({} chars) from {}", prompt.len(), path.display());
    Ok(prompt)
}
