//! Sync coordinator
//!
//! Owns the cloud configuration, the shared [`Store`] and the poll task.
//!
//! ## States
//!
//! - **Idle**: sync disabled or no URL. No network calls are made.
//! - **Polling**: a spawned task runs a fetch cycle immediately and then on
//!   every interval tick. Each cycle fetches tasks and messages concurrently
//!   and replaces the local collection when the remote returns rows. Empty
//!   or failed fetches leave local state alone.
//!
//! ## Stale responses
//!
//! Every fetch takes a request token for its resource and every Idle/Polling
//! transition bumps the epoch. A response is applied only while its token is
//! the latest issued for that resource and the epoch is unchanged. Cancelled
//! requests are never aborted mid-flight; their results are dropped here.
//!
//! ## Pushes
//!
//! Mutations go through the coordinator so it can push them after the store
//! has persisted them. Under [`PushPolicy::AppendOnly`] only a grown
//! collection's new last record is sent; edits are overwritten by the next
//! fetch. Under [`PushPolicy::ChangeLog`] every logged change is sent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::client::{FetchOutcome, PushOutcome, Remote, RemoteClient};
use super::{PushPolicy, Resource, Syncable};
use crate::collection::Change;
use crate::config::Config;
use crate::directory::User;
use crate::models::{ChatMessage, CloudConfig, Task, TaskDraft, TaskStatus};
use crate::storage::CLOUD_CONFIG_KEY;
use crate::store::{Store, StoreResult};

/// Coordinator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Polling,
}

/// What one cycle did to one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceOutcome {
    /// Sync inactive; nothing fetched
    Skipped,
    /// Local collection replaced with this many remote records
    Replaced(usize),
    /// Remote returned no rows; local state kept
    Empty,
    /// Fetch failed; local state kept
    Failed(String),
    /// Response superseded by a newer request or a state change
    Stale,
}

/// Summary of one fetch cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub epoch: u64,
    pub tasks: ResourceOutcome,
    pub messages: ResourceOutcome,
}

/// Events broadcast by the coordinator
#[derive(Debug, Clone)]
pub enum SyncEvent {
    StateChanged(SyncState),
    CycleCompleted(CycleReport),
    Pushed {
        resource: Resource,
        record_id: String,
        outcome: PushOutcome,
    },
}

/// A mutation's return value plus what was pushed for it
#[derive(Debug, Clone)]
pub struct Committed<O> {
    pub value: O,
    pub pushes: Vec<PushOutcome>,
}

/// Record to push after a mutation under the append-only policy
///
/// A mutation counts as an append iff the collection grew; the record at
/// the new last index is the one pushed, whatever else changed.
pub fn append_candidate<T>(previous_len: usize, items: &[T]) -> Option<&T> {
    if items.len() > previous_len {
        items.last()
    } else {
        None
    }
}

/// Commands sent to the poll task
#[derive(Debug, Clone, Copy)]
enum PollCommand {
    Shutdown,
}

struct PollerHandle {
    command_tx: mpsc::Sender<PollCommand>,
    task: JoinHandle<()>,
}

struct Shared<R> {
    remote: R,
    store: Arc<Mutex<Store>>,
    cloud: RwLock<CloudConfig>,
    policy: PushPolicy,
    interval: Duration,
    epoch: AtomicU64,
    tokens: [AtomicU64; 2],
    state: watch::Sender<SyncState>,
    events: broadcast::Sender<SyncEvent>,
}

/// Drives polling and pushes for one store
pub struct SyncCoordinator<R: Remote = RemoteClient> {
    shared: Arc<Shared<R>>,
    state_rx: watch::Receiver<SyncState>,
    poller: Option<PollerHandle>,
}

impl<R: Remote> SyncCoordinator<R> {
    /// Create an idle coordinator; call [`start`](Self::start) to poll
    pub fn new(remote: R, store: Arc<Mutex<Store>>, cloud: CloudConfig, config: &Config) -> Self {
        Self::with_settings(remote, store, cloud, config.poll_interval(), config.push_policy)
    }

    pub fn with_settings(
        remote: R,
        store: Arc<Mutex<Store>>,
        cloud: CloudConfig,
        interval: Duration,
        policy: PushPolicy,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(SyncState::Idle);
        let (events, _) = broadcast::channel(64);

        Self {
            shared: Arc::new(Shared {
                remote,
                store,
                cloud: RwLock::new(cloud),
                policy,
                interval,
                epoch: AtomicU64::new(0),
                tokens: [AtomicU64::new(0), AtomicU64::new(0)],
                state: state_tx,
                events,
            }),
            state_rx,
            poller: None,
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state_rx.borrow()
    }

    /// Subscribe to cycle, push and state events
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.shared.events.subscribe()
    }

    pub fn cloud_config(&self) -> CloudConfig {
        self.shared.cloud()
    }

    pub fn policy(&self) -> PushPolicy {
        self.shared.policy
    }

    pub fn poll_interval(&self) -> Duration {
        self.shared.interval
    }

    pub fn epoch(&self) -> u64 {
        self.shared.epoch()
    }

    pub fn store(&self) -> &Arc<Mutex<Store>> {
        &self.shared.store
    }

    /// Start polling if the cloud config is active
    ///
    /// Must be called inside a Tokio runtime. Does nothing when already
    /// polling or when sync is inactive.
    pub fn start(&mut self) {
        if self.poller.is_some() {
            return;
        }
        if !self.shared.cloud().is_active() {
            debug!("Cloud sync inactive, staying idle");
            return;
        }

        let epoch = self.shared.bump_epoch();
        let (command_tx, command_rx) = mpsc::channel(4);
        let task = tokio::spawn(poll_loop(Arc::clone(&self.shared), epoch, command_rx));
        self.poller = Some(PollerHandle { command_tx, task });

        info!(
            "Polling started (every {:?}, epoch {})",
            self.shared.interval, epoch
        );
        self.shared.set_state(SyncState::Polling);
    }

    /// Stop polling
    ///
    /// An in-flight cycle runs to completion but its results are discarded.
    pub fn stop(&mut self) {
        if let Some(handle) = self.poller.take() {
            let epoch = self.shared.bump_epoch();
            if let Err(e) = handle.command_tx.try_send(PollCommand::Shutdown) {
                debug!("Poll task not signalled ({}); epoch guard discards its results", e);
            }
            info!("Polling stopped (epoch {})", epoch);
            self.shared.set_state(SyncState::Idle);
        }
    }

    /// Apply a new cloud config, persisting it and restarting polling
    ///
    /// Any change restarts the poll task, so an active config always gets an
    /// immediate fetch.
    pub async fn reconfigure(&mut self, cloud: CloudConfig) -> StoreResult<()> {
        self.shared.store.lock().await.set_cloud_config(cloud.clone())?;
        *self
            .shared
            .cloud
            .write()
            .unwrap_or_else(PoisonError::into_inner) = cloud;

        self.stop();
        self.start();
        Ok(())
    }

    /// Pick up a cloud config saved by another process
    ///
    /// Returns whether the saved config differed; a change goes through
    /// [`reconfigure`](Self::reconfigure).
    pub async fn reload_cloud_config(&mut self) -> StoreResult<bool> {
        let saved: CloudConfig = {
            let store = self.shared.store.lock().await;
            store.local().load_or_default(CLOUD_CONFIG_KEY)?
        };
        if saved == self.shared.cloud() {
            return Ok(false);
        }

        info!("Cloud config changed on disk (active: {})", saved.is_active());
        self.reconfigure(saved).await?;
        Ok(true)
    }

    /// Stop polling and wait for the poll task to exit
    pub async fn shutdown(mut self) {
        if let Some(handle) = self.poller.take() {
            self.shared.bump_epoch();
            let _ = handle.command_tx.send(PollCommand::Shutdown).await;
            self.shared.set_state(SyncState::Idle);
            if let Err(e) = handle.task.await {
                warn!("Poll task ended abnormally: {}", e);
            }
        }
    }

    /// Run one fetch cycle now, outside the timer
    pub async fn run_cycle(&self) -> CycleReport {
        self.shared.cycle(self.shared.epoch()).await
    }

    // ==================== Mutations ====================

    pub async fn create_task(&self, actor: &User, draft: TaskDraft) -> StoreResult<Committed<Task>> {
        self.commit::<Task, _, _>(|store| store.create_task(actor, draft))
            .await
    }

    pub async fn update_task_status(
        &self,
        id: &str,
        status: TaskStatus,
    ) -> StoreResult<Committed<Task>> {
        self.commit::<Task, _, _>(|store| store.update_task_status(id, status))
            .await
    }

    pub async fn set_tasks(&self, tasks: Vec<Task>) -> StoreResult<Committed<usize>> {
        self.commit::<Task, _, _>(|store| store.set_tasks(tasks))
            .await
    }

    pub async fn send_message(
        &self,
        actor: &User,
        channel: Option<&str>,
        content: &str,
    ) -> StoreResult<Committed<ChatMessage>> {
        self.commit::<ChatMessage, _, _>(|store| store.send_message(actor, channel, content))
            .await
    }

    pub async fn set_messages(
        &self,
        messages: Vec<ChatMessage>,
    ) -> StoreResult<Committed<usize>> {
        self.commit::<ChatMessage, _, _>(|store| store.set_messages(messages))
            .await
    }

    /// Apply a mutation under the store lock, then push per policy
    ///
    /// The lock is released before any network call.
    async fn commit<T, F, O>(&self, mutate: F) -> StoreResult<Committed<O>>
    where
        T: Syncable,
        F: FnOnce(&mut Store) -> StoreResult<O>,
    {
        let (value, changes) = {
            let mut store = self.shared.store.lock().await;
            let previous_len = store.items::<T>().len();
            let value = mutate(&mut *store)?;
            let logged = store.take_changes::<T>();

            let changes = match self.shared.policy {
                PushPolicy::AppendOnly => append_candidate(previous_len, store.items::<T>())
                    .cloned()
                    .map(Change::Created)
                    .into_iter()
                    .collect(),
                PushPolicy::ChangeLog => logged,
            };
            (value, changes)
        };

        let pushes = self.shared.push_changes(changes).await;
        Ok(Committed { value, pushes })
    }
}

impl<R: Remote> Drop for SyncCoordinator<R> {
    fn drop(&mut self) {
        if let Some(handle) = self.poller.take() {
            self.shared.bump_epoch();
            handle.task.abort();
        }
    }
}

impl<R: Remote> Shared<R> {
    fn cloud(&self) -> CloudConfig {
        self.cloud
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn bump_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn set_state(&self, state: SyncState) {
        self.state.send_replace(state);
        let _ = self.events.send(SyncEvent::StateChanged(state));
    }

    fn issue_token(&self, resource: Resource) -> u64 {
        self.tokens[resource.index()].fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, resource: Resource, token: u64, epoch: u64) -> bool {
        self.tokens[resource.index()].load(Ordering::SeqCst) == token && self.epoch() == epoch
    }

    async fn cycle(&self, epoch: u64) -> CycleReport {
        let cloud = self.cloud();

        let (tasks, messages) = if cloud.is_active() {
            tokio::join!(
                self.sync_resource::<Task>(&cloud, epoch),
                self.sync_resource::<ChatMessage>(&cloud, epoch)
            )
        } else {
            (ResourceOutcome::Skipped, ResourceOutcome::Skipped)
        };

        let report = CycleReport {
            epoch,
            tasks,
            messages,
        };
        debug!("Cycle finished: {:?}", report);
        let _ = self.events.send(SyncEvent::CycleCompleted(report.clone()));
        report
    }

    async fn sync_resource<T: Syncable>(&self, cloud: &CloudConfig, epoch: u64) -> ResourceOutcome {
        let token = self.issue_token(T::RESOURCE);

        let mut records = match self.remote.fetch::<T>(cloud).await {
            FetchOutcome::Records(records) => records,
            FetchOutcome::Empty => return ResourceOutcome::Empty,
            FetchOutcome::Disabled => return ResourceOutcome::Skipped,
            FetchOutcome::Failed(e) => return ResourceOutcome::Failed(e.to_string()),
        };
        T::order_fetched(&mut records);

        let mut store = self.store.lock().await;
        if !self.is_current(T::RESOURCE, token, epoch) {
            debug!(
                "Discarding stale {} response (token {}, epoch {})",
                T::RESOURCE,
                token,
                epoch
            );
            return ResourceOutcome::Stale;
        }

        let count = records.len();
        match store.replace_from_remote(records) {
            Ok(()) => ResourceOutcome::Replaced(count),
            Err(e) => {
                warn!("Could not save fetched {}: {}", T::RESOURCE, e);
                ResourceOutcome::Failed(e.to_string())
            }
        }
    }

    async fn push_changes<T: Syncable>(&self, changes: Vec<Change<T>>) -> Vec<PushOutcome> {
        if changes.is_empty() {
            return Vec::new();
        }

        let cloud = self.cloud();
        if !cloud.is_active() {
            debug!(
                "Cloud sync inactive, {} {} change(s) kept local",
                changes.len(),
                T::RESOURCE
            );
            return Vec::new();
        }

        let mut outcomes = Vec::with_capacity(changes.len());
        for change in changes {
            let outcome = match &change {
                Change::Created(record) => self.remote.create(&cloud, record).await,
                Change::Updated(record) => self.remote.update(&cloud, record).await,
                Change::Deleted(id) => self.remote.delete::<T>(&cloud, id).await,
            };
            let _ = self.events.send(SyncEvent::Pushed {
                resource: T::RESOURCE,
                record_id: change.record_id().to_string(),
                outcome: outcome.clone(),
            });
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Main poll loop: a cycle on every tick until shut down or superseded
async fn poll_loop<R: Remote>(
    shared: Arc<Shared<R>>,
    epoch: u64,
    mut command_rx: mpsc::Receiver<PollCommand>,
) {
    let mut ticker = tokio::time::interval(shared.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if shared.epoch() != epoch {
                    break;
                }
                shared.cycle(epoch).await;
            }
            cmd = command_rx.recv() => match cmd {
                Some(PollCommand::Shutdown) | None => break,
            },
        }
    }

    debug!("Poll task for epoch {} exited", epoch);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_candidate_only_on_growth() {
        let before = [1, 2];
        assert_eq!(append_candidate(2, &[1, 2, 3]), Some(&3));
        assert_eq!(append_candidate(2, &before), None);
        assert_eq!(append_candidate(2, &[9]), None);
        // Grown but reordered: still the last element
        assert_eq!(append_candidate(1, &[7, 1]), Some(&1));
        assert_eq!(append_candidate::<i32>(0, &[]), None);
    }
}
