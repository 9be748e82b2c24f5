//! Confirmation prompt with CI fallback

use super::context::UiContext;
use crate::error::{CmcError, CmcResult};

/// Ask a yes/no question. Auto-yes answers yes; non-interactive returns `default`.
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> CmcResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    let answer = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message).initial_value(default).interact()
    })
    .await
    .map_err(|e| CmcError::User(format!("Prompt task failed: {}", e)))?;

    answer.map_err(|e| CmcError::User(format!("Prompt failed: {}", e)))
}
