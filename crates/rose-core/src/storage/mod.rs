//! Storage layer
//!
//! A flat key-value store: one JSON blob per collection in the data
//! directory. See [`LocalStore`].

pub mod error;
pub mod local;

pub use error::{StorageError, StorageResult};
pub use local::{LocalStore, CLOUD_CONFIG_KEY, DOCUMENTS_KEY, MESSAGES_KEY, TASKS_KEY};
