//! In-memory collections
//!
//! A [`Collection`] is the authoritative in-memory copy of one record list.
//! Every local mutation goes through it so that it can keep a log of
//! [`Change`]s for the change-log push policy, and so the owning store can
//! mirror the whole list to disk afterwards.
//!
//! Remote replacement ([`Collection::replace_from_remote`]) swaps the list
//! without logging anything: it is not a local edit and must never be
//! pushed back. Collections that are never synced drop the log entirely
//! ([`Collection::without_change_log`]).

use tracing::debug;

use crate::models::Record;
use crate::storage::{LocalStore, StorageResult};

/// A local edit to a collection
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Created(T),
    Updated(T),
    Deleted(String),
}

impl<T: Record> Change<T> {
    /// Id of the record the change applies to
    pub fn record_id(&self) -> &str {
        match self {
            Change::Created(r) | Change::Updated(r) => r.id(),
            Change::Deleted(id) => id,
        }
    }
}

/// Ordered list of records persisted under one store key
#[derive(Debug, Clone)]
pub struct Collection<T> {
    key: &'static str,
    items: Vec<T>,
    changes: Vec<Change<T>>,
    tracked: bool,
}

impl<T: Record + PartialEq> Collection<T> {
    pub fn new(key: &'static str, items: Vec<T>) -> Self {
        Self {
            key,
            items,
            changes: Vec::new(),
            tracked: true,
        }
    }

    /// Stop recording changes; for collections with no remote copy
    pub fn without_change_log(mut self) -> Self {
        self.tracked = false;
        self.changes.clear();
        self
    }

    fn log(&mut self, change: Change<T>) {
        if self.tracked {
            self.changes.push(change);
        }
    }

    /// Load the collection from the store, seeding it when nothing is saved
    pub fn load<F>(store: &LocalStore, key: &'static str, seed: F) -> StorageResult<Self>
    where
        F: FnOnce() -> Vec<T>,
    {
        let items = store.load_or_else(key, seed)?;
        debug!("Loaded {} records from {}", items.len(), key);
        Ok(Self::new(key, items))
    }

    /// Store key backing this collection
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|r| r.id() == id)
    }

    /// Append a record
    pub fn push(&mut self, record: T) {
        self.log(Change::Created(record.clone()));
        self.items.push(record);
    }

    /// Insert a record at the front
    pub fn prepend(&mut self, record: T) {
        self.log(Change::Created(record.clone()));
        self.items.insert(0, record);
    }

    /// Edit a record in place, returning the updated copy
    pub fn update<F>(&mut self, id: &str, edit: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        let record = self.items.iter_mut().find(|r| r.id() == id)?;
        edit(record);
        let updated = record.clone();
        self.log(Change::Updated(updated.clone()));
        Some(updated)
    }

    /// Replace the whole list with a locally produced one
    ///
    /// The difference to the previous list is logged: new ids as created,
    /// changed records as updated and missing ids as deleted. Returns the
    /// previous length.
    pub fn replace_all(&mut self, items: Vec<T>) -> usize {
        let previous = std::mem::replace(&mut self.items, items);
        if !self.tracked {
            return previous.len();
        }

        for record in &self.items {
            match previous.iter().find(|p| p.id() == record.id()) {
                None => self.changes.push(Change::Created(record.clone())),
                Some(old) if old != record => self.changes.push(Change::Updated(record.clone())),
                Some(_) => {}
            }
        }
        for old in &previous {
            if !self.items.iter().any(|r| r.id() == old.id()) {
                self.changes.push(Change::Deleted(old.id().to_string()));
            }
        }

        previous.len()
    }

    /// Replace the whole list with the remote copy, without logging changes
    pub fn replace_from_remote(&mut self, items: Vec<T>) {
        self.items = items;
    }

    /// Pending changes not yet taken
    pub fn pending_changes(&self) -> &[Change<T>] {
        &self.changes
    }

    /// Drain the change log
    pub fn take_changes(&mut self) -> Vec<Change<T>> {
        std::mem::take(&mut self.changes)
    }

    /// Write the full list to the store
    pub fn persist(&self, store: &LocalStore) -> StorageResult<()> {
        store.save(self.key, &self.items)
    }
}
