//! Status command handler

use anyhow::Result;

use rose_core::directory::User;
use rose_core::{Dashboard, SyncCoordinator};

use crate::output::{Output, OutputFormat};

/// Show the task dashboard and sync status
pub async fn show(
    coordinator: &SyncCoordinator,
    user: Option<&User>,
    output: &Output,
) -> Result<()> {
    let store = coordinator.store().lock().await;
    let dashboard = Dashboard::from_tasks(store.tasks());
    let cloud = coordinator.cloud_config();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "user": user,
                    "dashboard": dashboard,
                    "sync": {
                        "active": cloud.is_active(),
                        "api_url": cloud.api_url,
                        "push_policy": coordinator.policy().to_string(),
                    },
                    "counts": {
                        "tasks": store.tasks().len(),
                        "messages": store.messages().len(),
                        "documents": store.documents().len(),
                    },
                    "data_dir": store.config().data_dir,
                })
            );
        }
        OutputFormat::Quiet => output.print_dashboard(&dashboard),
        OutputFormat::Human => {
            println!("Rose Status");
            println!("===========");
            println!();
            if let Some(user) = user {
                println!("Signed in as {} ({})", user.display_name, user.job_title);
                println!();
            }
            output.print_dashboard(&dashboard);
            println!();
            println!("Sync:");
            println!(
                "  Status: {}",
                if cloud.is_active() { "active" } else { "idle" }
            );
            if !cloud.api_url.is_empty() {
                println!("  Server: {}", cloud.api_url);
            }
            println!("  Policy: {}", coordinator.policy());
            println!();
            println!("Storage:");
            println!("  Location:  {}", store.config().data_dir.display());
            println!("  Messages:  {}", store.messages().len());
            println!("  Documents: {}", store.documents().len());
        }
    }

    Ok(())
}
