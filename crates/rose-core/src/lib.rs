//! Rose Core Library
//!
//! This crate provides the core of Rose, a team operations dashboard: tasks,
//! channel chat and a document registry kept in local JSON blobs, with
//! optional poll-based sync to a PostgREST-style cloud endpoint.
//!
//! # Architecture
//!
//! - **Local store**: one JSON blob per collection, rewritten atomically
//! - **Store**: in-memory collections mirrored to the local store on every change
//! - **Sync coordinator**: polls the remote and pushes local mutations
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut store = Store::open_with_config(config)?;
//!
//! let captain = directory::lookup("selçuk").unwrap();
//! store.create_task(&captain, draft)?;
//!
//! let board = Dashboard::from_tasks(store.tasks());
//! ```
//!
//! # Modules
//!
//! - `store`: Unified storage interface (main entry point)
//! - `models`: Tasks, chat messages, documents and the cloud config
//! - `collection`: In-memory collections with a change log
//! - `storage`: JSON blob persistence
//! - `sync`: Remote client and sync coordinator
//! - `assistant`: Rose AI prompt client
//! - `dashboard`: Task statistics
//! - `directory`: Team roster
//! - `config`: Application configuration

pub mod assistant;
pub mod collection;
pub mod config;
pub mod dashboard;
pub mod directory;
pub mod models;
pub mod storage;
pub mod store;
pub mod sync;

pub use assistant::Assistant;
pub use collection::{Change, Collection};
pub use config::Config;
pub use dashboard::Dashboard;
pub use directory::User;
pub use models::{
    ChatMessage, CloudConfig, DocumentFile, Record, Task, TaskDraft, TaskPriority, TaskStatus,
};
pub use storage::{LocalStore, StorageError};
pub use store::{Store, StoreError};
pub use sync::{PushPolicy, RemoteClient, SyncCoordinator};
