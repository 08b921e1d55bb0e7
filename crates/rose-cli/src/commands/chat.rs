//! Chat command handlers

use anyhow::{bail, Result};

use rose_core::assistant::chat_log;
use rose_core::directory::User;
use rose_core::models::{is_known_channel, CHANNELS, DEFAULT_CHANNEL, SECURE_CHANNELS};
use rose_core::{Assistant, SyncCoordinator};

use crate::output::Output;

/// Post a message to a channel
pub async fn send(
    coordinator: &SyncCoordinator,
    actor: &User,
    channel: Option<String>,
    content: String,
    output: &Output,
) -> Result<()> {
    let committed = coordinator
        .send_message(actor, channel.as_deref(), &content)
        .await?;

    output.success(&format!(
        "Sent to #{} as {}",
        committed.value.channel, committed.value.sender
    ));
    output.print_pushes(&committed.pushes);
    Ok(())
}

/// Show the messages of one channel
pub async fn list(
    coordinator: &SyncCoordinator,
    channel: Option<String>,
    output: &Output,
) -> Result<()> {
    let channel = resolve_channel(channel)?;
    let store = coordinator.store().lock().await;
    let messages = store.messages_in_channel(&channel);

    output.print_messages(&channel, &messages);
    Ok(())
}

/// Ask the assistant to brief one channel's log
pub async fn summarize(
    coordinator: &SyncCoordinator,
    assistant: &Assistant,
    channel: Option<String>,
    output: &Output,
) -> Result<()> {
    let channel = resolve_channel(channel)?;
    let log = {
        let store = coordinator.store().lock().await;
        chat_log(store.messages_in_channel(&channel))
    };

    if log.is_empty() {
        output.message(&format!("No messages in #{} to summarize.", channel));
        return Ok(());
    }

    output.message(&format!("Summarizing #{}...", channel));
    let reply = assistant.summarize_chat(&log).await;
    output.reply(&reply);
    Ok(())
}

/// List the known channels
pub fn channels(output: &Output) -> Result<()> {
    if output.is_json() {
        println!(
            "{}",
            serde_json::json!({ "public": CHANNELS, "secure": SECURE_CHANNELS })
        );
    } else {
        for channel in CHANNELS {
            println!("#{}", channel);
        }
        for channel in SECURE_CHANNELS {
            println!("#{} (secure)", channel);
        }
    }
    Ok(())
}

fn resolve_channel(channel: Option<String>) -> Result<String> {
    let channel = channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
    if !is_known_channel(&channel) {
        bail!(
            "Unknown channel: '{}'. See `rose chat channels`.",
            channel
        );
    }
    Ok(channel)
}
