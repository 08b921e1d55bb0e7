//! Sync command handler

use anyhow::{bail, Result};

use rose_core::sync::ResourceOutcome;
use rose_core::SyncCoordinator;

use crate::output::Output;

/// Run one fetch cycle against the cloud endpoint
pub async fn sync(coordinator: &SyncCoordinator, output: &Output) -> Result<()> {
    let cloud = coordinator.cloud_config();

    if !cloud.is_active() {
        bail!(
            "Cloud sync is not active. Enable it with:\n  \
             rose cloud set --url https://project.supabase.co --key ANON_KEY --enable"
        );
    }

    output.message(&format!("Syncing with {}...", cloud.base_url()));

    let report = coordinator.run_cycle().await;
    output.print_cycle(&report);

    let failed = [&report.tasks, &report.messages]
        .iter()
        .any(|o| matches!(o, ResourceOutcome::Failed(_)));
    if failed {
        output.message("Local data kept for failed collections.");
    } else {
        output.success("Sync complete");
    }
    Ok(())
}
