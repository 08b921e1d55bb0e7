//! Free-form assistant prompt

use anyhow::Result;

use rose_core::Assistant;

use crate::output::Output;

/// Send a prompt to the assistant, with optional context
pub async fn ask(
    assistant: &Assistant,
    prompt: String,
    context: Option<String>,
    output: &Output,
) -> Result<()> {
    let reply = assistant.generate(&prompt, context.as_deref()).await;
    output.reply(&reply);
    Ok(())
}
