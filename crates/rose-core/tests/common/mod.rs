//! Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use rose_core::directory::{self, User};
use rose_core::models::{CloudConfig, Record, Task, TaskDraft};
use rose_core::sync::{FetchOutcome, PushOutcome, Remote, Resource, SyncError, Syncable};
use rose_core::Store;
use serde_json::Value;
use tempfile::TempDir;
use tokio::time::Instant;

/// A call observed by the fake remote
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch(Resource),
    Create(Resource, String),
    Update(Resource, String),
    Delete(Resource, String),
}

/// Scripted answer for one fetch
pub enum Reply {
    Rows(Value),
    Fail,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<Resource, Vec<Value>>,
    scripted: HashMap<Resource, VecDeque<(Duration, Reply)>>,
    calls: Vec<(Instant, Call)>,
}

/// In-memory remote that records every call
///
/// Fetches return the current table unless a scripted reply is queued.
/// Creates, updates and deletes are applied to the table.
#[derive(Clone, Default)]
pub struct FakeRemote {
    inner: Arc<Mutex<Inner>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_table<T: Record>(&self, resource: Resource, rows: &[T]) {
        let rows = rows
            .iter()
            .map(|r| serde_json::to_value(r).unwrap())
            .collect();
        self.inner.lock().unwrap().tables.insert(resource, rows);
    }

    pub fn table<T: Record>(&self, resource: Resource) -> Vec<T> {
        let inner = self.inner.lock().unwrap();
        inner
            .tables
            .get(&resource)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|v| serde_json::from_value(v).unwrap())
            .collect()
    }

    /// Queue a reply for the next fetch of `resource`, delivered after `delay`
    pub fn script(&self, resource: Resource, delay: Duration, reply: Reply) {
        self.inner
            .lock()
            .unwrap()
            .scripted
            .entry(resource)
            .or_default()
            .push_back((delay, reply));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }

    /// Instants at which fetches of `resource` were issued
    pub fn fetch_times(&self, resource: Resource) -> Vec<Instant> {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|(_, c)| *c == Call::Fetch(resource))
            .map(|(at, _)| *at)
            .collect()
    }

    pub fn fetch_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Fetch(_)))
            .count()
    }

    pub fn push_count(&self) -> usize {
        self.calls().len() - self.fetch_count()
    }

    fn record(&self, call: Call) {
        self.inner.lock().unwrap().calls.push((Instant::now(), call));
    }
}

impl Remote for FakeRemote {
    async fn fetch<T: Syncable>(&self, _config: &CloudConfig) -> FetchOutcome<T> {
        self.record(Call::Fetch(T::RESOURCE));

        let (delay, reply) = {
            let mut inner = self.inner.lock().unwrap();
            match inner
                .scripted
                .get_mut(&T::RESOURCE)
                .and_then(VecDeque::pop_front)
            {
                Some(scripted) => scripted,
                None => {
                    let rows = inner.tables.get(&T::RESOURCE).cloned().unwrap_or_default();
                    (Duration::ZERO, Reply::Rows(Value::Array(rows)))
                }
            }
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Reply::Rows(rows) => {
                let records: Vec<T> = serde_json::from_value(rows).unwrap();
                if records.is_empty() {
                    FetchOutcome::Empty
                } else {
                    FetchOutcome::Records(records)
                }
            }
            Reply::Fail => FetchOutcome::Failed(SyncError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "unavailable".to_string(),
            }),
        }
    }

    async fn create<T: Syncable>(&self, _config: &CloudConfig, record: &T) -> PushOutcome {
        self.record(Call::Create(T::RESOURCE, record.id().to_string()));
        let value = serde_json::to_value(record).unwrap();
        self.inner
            .lock()
            .unwrap()
            .tables
            .entry(T::RESOURCE)
            .or_default()
            .push(value);
        PushOutcome::Pushed
    }

    async fn update<T: Syncable>(&self, _config: &CloudConfig, record: &T) -> PushOutcome {
        self.record(Call::Update(T::RESOURCE, record.id().to_string()));
        let value = serde_json::to_value(record).unwrap();
        let mut inner = self.inner.lock().unwrap();
        if let Some(rows) = inner.tables.get_mut(&T::RESOURCE) {
            for row in rows.iter_mut() {
                if row["id"] == record.id() {
                    *row = value.clone();
                }
            }
        }
        PushOutcome::Pushed
    }

    async fn delete<T: Syncable>(&self, _config: &CloudConfig, id: &str) -> PushOutcome {
        self.record(Call::Delete(T::RESOURCE, id.to_string()));
        let mut inner = self.inner.lock().unwrap();
        if let Some(rows) = inner.tables.get_mut(&T::RESOURCE) {
            rows.retain(|row| row["id"] != id);
        }
        PushOutcome::Pushed
    }
}

pub fn active_cloud() -> CloudConfig {
    CloudConfig::new("https://rose.example.supabase.co", "anon-key", true)
}

pub fn captain() -> User {
    directory::lookup("selçuk").unwrap()
}

pub fn member() -> User {
    directory::lookup("tunahan").unwrap()
}

pub fn task(title: &str) -> Task {
    Task::from_draft(TaskDraft {
        title: title.to_string(),
        description: format!("{} açıklaması", title),
        assignee: "RoseOps".to_string(),
        ..TaskDraft::default()
    })
}

pub fn draft(title: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        assignee: "RoseOps".to_string(),
        ..TaskDraft::default()
    }
}

/// Open a fresh store in a temp directory
pub fn open_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let store = Store::open_in(temp_dir.path().join("data")).unwrap();
    (temp_dir, store)
}
