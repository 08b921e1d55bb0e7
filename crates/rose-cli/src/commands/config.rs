//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use rose_core::{Config, PushPolicy};

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "poll_interval_secs": config.poll_interval_secs,
                    "push_policy": config.push_policy.to_string(),
                    "push_sent_at": config.push_sent_at,
                    "request_timeout_secs": config.request_timeout_secs,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  data_dir:             {}", config.data_dir.display());
            println!("  poll_interval_secs:   {}", config.poll_interval_secs);
            println!("  push_policy:          {}", config.push_policy);
            println!("  push_sent_at:         {}", config.push_sent_at);
            println!("  request_timeout_secs: {}", config.request_timeout_secs);
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply(&mut config, &key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            config.data_dir = value.into();
        }
        "poll_interval_secs" => {
            let secs: u64 = value
                .parse()
                .context("Invalid value for poll_interval_secs. Use a whole number of seconds.")?;
            if secs == 0 {
                bail!("poll_interval_secs must be at least 1");
            }
            config.poll_interval_secs = secs;
        }
        "push_policy" => {
            config.push_policy = value.parse::<PushPolicy>().map_err(|e| anyhow::anyhow!(e))?;
        }
        "push_sent_at" => {
            config.push_sent_at = value
                .parse()
                .context("Invalid value for push_sent_at. Use 'true' or 'false'.")?;
        }
        "request_timeout_secs" => {
            config.request_timeout_secs = value
                .parse()
                .context("Invalid value for request_timeout_secs. Use a whole number of seconds.")?;
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.into())
            };
        }
        _ => {
            bail!(
                "Unknown configuration key: '{}'\n\
                 Valid keys: data_dir, poll_interval_secs, push_policy, push_sent_at, \
                 request_timeout_secs, log_file",
                key
            );
        }
    }
    Ok(())
}
