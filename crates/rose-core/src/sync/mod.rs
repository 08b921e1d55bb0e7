//! Cloud sync against a PostgREST-style endpoint
//!
//! Sync is poll-based: while the cloud config is active, the
//! [`SyncCoordinator`] fetches every tracked collection on a fixed interval
//! and replaces the local copy wholesale when the remote returns rows. Local
//! mutations are pushed according to the configured [`PushPolicy`].
//!
//! ## Usage
//!
//! ```ignore
//! let store = Arc::new(Mutex::new(Store::open_with_config(config.clone())?));
//! let remote = RemoteClient::new(config.request_timeout())?;
//! let mut coordinator = SyncCoordinator::new(remote, store, cloud, &config);
//! coordinator.start();
//! ```

mod client;
mod coordinator;

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{sort_by_sent_at, ChatMessage, Task};
use crate::store::Stored;

pub use client::{FetchOutcome, PushOutcome, Remote, RemoteClient, SyncError};
pub use coordinator::{
    append_candidate, Committed, CycleReport, ResourceOutcome, SyncCoordinator, SyncEvent,
    SyncState,
};

/// How local mutations reach the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushPolicy {
    /// Push only the new trailing record when a collection grows
    ///
    /// In-place edits and removals are never pushed and are overwritten by
    /// the next fetch.
    #[default]
    AppendOnly,
    /// Push every logged create, update and delete
    ChangeLog,
}

impl fmt::Display for PushPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushPolicy::AppendOnly => f.write_str("append_only"),
            PushPolicy::ChangeLog => f.write_str("change_log"),
        }
    }
}

impl FromStr for PushPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "append_only" | "append" => Ok(PushPolicy::AppendOnly),
            "change_log" | "changelog" => Ok(PushPolicy::ChangeLog),
            other => Err(format!(
                "invalid push policy '{}' (expected append_only or change_log)",
                other
            )),
        }
    }
}

/// A remote table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Tasks,
    Messages,
}

impl Resource {
    pub const ALL: [Resource; 2] = [Resource::Tasks, Resource::Messages];

    /// Path segment under `/rest/v1/`
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Tasks => "tasks",
            Resource::Messages => "messages",
        }
    }

    /// Query string used when fetching the whole table
    pub fn list_query(&self) -> &'static str {
        match self {
            Resource::Tasks => "select=*",
            Resource::Messages => "select=*&order=timestamp.asc",
        }
    }

    fn index(&self) -> usize {
        match self {
            Resource::Tasks => 0,
            Resource::Messages => 1,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// A stored record type that is mirrored to a remote table
pub trait Syncable: Stored {
    const RESOURCE: Resource;

    /// Put a freshly fetched list into local order
    fn order_fetched(_records: &mut [Self]) {}

    /// Body sent on create and update
    ///
    /// `extended` allows columns that only Rose writes; without it the body
    /// matches the shared table schema.
    fn wire_body(&self, _extended: bool) -> Cow<'_, Self> {
        Cow::Borrowed(self)
    }
}

impl Syncable for Task {
    const RESOURCE: Resource = Resource::Tasks;
}

impl Syncable for ChatMessage {
    const RESOURCE: Resource = Resource::Messages;

    fn order_fetched(records: &mut [Self]) {
        sort_by_sent_at(records);
    }

    fn wire_body(&self, extended: bool) -> Cow<'_, Self> {
        if extended || self.sent_at.is_none() {
            Cow::Borrowed(self)
        } else {
            Cow::Owned(ChatMessage {
                sent_at: None,
                ..self.clone()
            })
        }
    }
}
