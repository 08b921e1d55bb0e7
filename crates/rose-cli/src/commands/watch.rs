//! Watch command handler

use anyhow::{bail, Result};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;

use rose_core::sync::{PushOutcome, SyncEvent, SyncState};
use rose_core::SyncCoordinator;
use tracing::warn;

use crate::output::{describe_outcome, Output};

/// Poll the cloud endpoint until Ctrl-C, printing each cycle
///
/// Cloud config changes saved by other commands are applied on the next
/// interval, so `rose cloud disable` stops the polling here.
pub async fn watch(mut coordinator: SyncCoordinator, output: &Output) -> Result<()> {
    let cloud = coordinator.cloud_config();
    if !cloud.is_active() {
        bail!(
            "Cloud sync is not active. Enable it with:\n  \
             rose cloud set --url https://project.supabase.co --key ANON_KEY --enable"
        );
    }

    let mut events = coordinator.subscribe();
    coordinator.start();
    output.message(&format!(
        "Watching {} (Ctrl-C to stop)...",
        cloud.base_url()
    ));

    // `rose cloud ...` in another shell only writes the saved config
    let mut reload = tokio::time::interval(coordinator.poll_interval());
    reload.set_missed_tick_behavior(MissedTickBehavior::Delay);
    reload.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = reload.tick() => {
                if let Err(e) = coordinator.reload_cloud_config().await {
                    warn!("Could not reload cloud config: {}", e);
                }
            }
            event = events.recv() => match event {
                Ok(event) => print_event(&event, output),
                Err(RecvError::Lagged(n)) => warn!("Missed {} sync events", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    coordinator.shutdown().await;
    output.message("Stopped.");
    Ok(())
}

fn print_event(event: &SyncEvent, output: &Output) {
    let now = chrono::Local::now().format("%H:%M:%S");
    match event {
        SyncEvent::StateChanged(state) => {
            let label = match state {
                SyncState::Idle => "idle",
                SyncState::Polling => "polling",
            };
            output.message(&format!("[{}] sync {}", now, label));
        }
        SyncEvent::CycleCompleted(report) => {
            if output.is_json() {
                output.print_cycle(report);
            } else {
                output.message(&format!(
                    "[{}] tasks: {} | messages: {}",
                    now,
                    describe_outcome(&report.tasks),
                    describe_outcome(&report.messages)
                ));
            }
        }
        SyncEvent::Pushed {
            resource,
            record_id,
            outcome,
        } => {
            let result = match outcome {
                PushOutcome::Pushed => "pushed".to_string(),
                PushOutcome::Skipped => return,
                PushOutcome::Failed(reason) => format!("push failed: {}", reason),
            };
            output.message(&format!("[{}] {} {} {}", now, resource, record_id, result));
        }
    }
}
