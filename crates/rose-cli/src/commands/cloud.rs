//! Cloud endpoint command handlers
//!
//! The endpoint lives in the local store, not the config file. Changes take
//! effect for the next `sync`; a running `watch` applies them on its next
//! interval.

use anyhow::{bail, Result};

use rose_core::models::CloudConfig;
use rose_core::SyncCoordinator;

use crate::output::{Output, OutputFormat};

/// Show the cloud endpoint (key redacted)
pub async fn show(coordinator: &SyncCoordinator, output: &Output) -> Result<()> {
    let cloud = coordinator.cloud_config();
    let key_state = if cloud.api_key.is_empty() {
        "(not set)"
    } else {
        "(set)"
    };

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "api_url": cloud.api_url,
                    "api_key_set": !cloud.api_key.is_empty(),
                    "enabled": cloud.enabled,
                    "active": cloud.is_active(),
                    "push_policy": coordinator.policy().to_string(),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", if cloud.is_active() { "active" } else { "idle" });
        }
        OutputFormat::Human => {
            println!("Cloud sync:");
            println!(
                "  api_url:     {}",
                if cloud.api_url.is_empty() {
                    "(not set)"
                } else {
                    &cloud.api_url
                }
            );
            println!("  api_key:     {}", key_state);
            println!("  enabled:     {}", cloud.enabled);
            println!("  push_policy: {}", coordinator.policy());
            if cloud.enabled && !cloud.is_active() {
                println!();
                println!("Enabled but no URL set; sync stays idle.");
            }
        }
    }
    Ok(())
}

/// Set the endpoint URL and key
pub async fn set(
    coordinator: &SyncCoordinator,
    url: String,
    key: String,
    enable: bool,
    output: &Output,
) -> Result<()> {
    let current = coordinator.cloud_config();
    let cloud = CloudConfig::new(url.trim(), key.trim(), enable || current.enabled);
    apply(coordinator, cloud, output).await
}

/// Turn sync on or off, keeping the endpoint
pub async fn set_enabled(
    coordinator: &SyncCoordinator,
    enabled: bool,
    output: &Output,
) -> Result<()> {
    let mut cloud = coordinator.cloud_config();
    if enabled && cloud.api_url.trim().is_empty() {
        bail!(
            "No cloud URL configured. Set one with:\n  \
             rose cloud set --url https://project.supabase.co --key ANON_KEY"
        );
    }
    cloud.enabled = enabled;
    apply(coordinator, cloud, output).await
}

async fn apply(
    coordinator: &SyncCoordinator,
    cloud: CloudConfig,
    output: &Output,
) -> Result<()> {
    let active = cloud.is_active();
    // Persist only; polling belongs to `rose watch`
    coordinator.store().lock().await.set_cloud_config(cloud)?;

    output.success(if active {
        "Cloud sync active"
    } else {
        "Cloud sync idle"
    });
    Ok(())
}
