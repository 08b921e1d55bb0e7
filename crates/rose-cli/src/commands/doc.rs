//! Document registry command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use rose_core::directory::User;
use rose_core::SyncCoordinator;

use crate::output::Output;

/// Register a file by name and size; contents are never uploaded
pub async fn add(
    coordinator: &SyncCoordinator,
    actor: &User,
    path: PathBuf,
    output: &Output,
) -> Result<()> {
    let mut store = coordinator.store().lock().await;
    let document = store
        .add_document_from_path(actor, &path)
        .with_context(|| format!("Failed to register {}", path.display()))?;

    if output.is_quiet() {
        println!("{}", document.id);
    } else if output.is_json() {
        output.json(&document);
    } else {
        output.success(&format!(
            "Registered {} ({}, {}, {})",
            document.name, document.doc_type, document.size, document.security_level
        ));
    }
    Ok(())
}

/// List registered documents, newest first
pub async fn list(coordinator: &SyncCoordinator, output: &Output) -> Result<()> {
    let store = coordinator.store().lock().await;
    output.print_documents(store.documents());
    Ok(())
}
