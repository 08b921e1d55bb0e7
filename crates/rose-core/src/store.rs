//! Unified storage interface
//!
//! The `Store` owns the three in-memory collections (tasks, messages,
//! documents) and the cloud configuration, and mirrors every change to the
//! [`LocalStore`] before returning.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = Store::open_with_config(config)?;
//!
//! let captain = directory::lookup("selçuk").unwrap();
//! store.create_task(&captain, draft)?;
//!
//! let tasks = store.tasks();
//! ```

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::collection::{Change, Collection};
use crate::config::Config;
use crate::directory::User;
use crate::models::{
    is_known_channel, ChatMessage, CloudConfig, DocumentFile, Record, Task, TaskDraft, TaskStatus,
    DEFAULT_CHANNEL,
};
use crate::storage::{
    LocalStore, StorageError, CLOUD_CONFIG_KEY, DOCUMENTS_KEY, MESSAGES_KEY, TASKS_KEY,
};

/// Errors raised by store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Unknown channel: '{0}'")]
    UnknownChannel(String),

    #[error("{callsign} is not allowed to {action}")]
    NotPermitted {
        callsign: String,
        action: &'static str,
    },

    #[error("Cannot read '{path}': {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Recovery hint for storage failures
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::Storage(e) => e.recovery_suggestion(),
            _ => None,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A record type held by the [`Store`]
pub trait Stored: Record + PartialEq {
    /// Human-readable kind for messages
    const KIND: &'static str;

    fn collection(store: &Store) -> &Collection<Self>;
    fn collection_mut(store: &mut Store) -> &mut Collection<Self>;
}

impl Stored for Task {
    const KIND: &'static str = "task";

    fn collection(store: &Store) -> &Collection<Self> {
        &store.tasks
    }
    fn collection_mut(store: &mut Store) -> &mut Collection<Self> {
        &mut store.tasks
    }
}

impl Stored for ChatMessage {
    const KIND: &'static str = "message";

    fn collection(store: &Store) -> &Collection<Self> {
        &store.messages
    }
    fn collection_mut(store: &mut Store) -> &mut Collection<Self> {
        &mut store.messages
    }
}

impl Stored for DocumentFile {
    const KIND: &'static str = "document";

    fn collection(store: &Store) -> &Collection<Self> {
        &store.documents
    }
    fn collection_mut(store: &mut Store) -> &mut Collection<Self> {
        &mut store.documents
    }
}

/// Unified storage interface for Rose
pub struct Store {
    local: LocalStore,
    tasks: Collection<Task>,
    messages: Collection<ChatMessage>,
    documents: Collection<DocumentFile>,
    cloud: CloudConfig,
    config: Config,
}

impl Store {
    /// Open the store with a specific configuration
    ///
    /// Missing blobs start empty, except messages which start with the
    /// system greeting.
    pub fn open_with_config(config: Config) -> StoreResult<Self> {
        let local = LocalStore::open(&config.data_dir)?;

        let tasks = Collection::load(&local, TASKS_KEY, Vec::new)?;
        let messages =
            Collection::load(&local, MESSAGES_KEY, || vec![ChatMessage::system_greeting()])?;
        // Documents have no remote copy
        let documents = Collection::load(&local, DOCUMENTS_KEY, Vec::new)?.without_change_log();
        let cloud: CloudConfig = local.load_or_default(CLOUD_CONFIG_KEY)?;

        debug!("Opened store at {:?} (cloud: {:?})", local.dir(), cloud);

        Ok(Self {
            local,
            tasks,
            messages,
            documents,
            cloud,
            config,
        })
    }

    /// Open a store rooted at `dir` with otherwise default configuration
    pub fn open_in(dir: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_config(Config {
            data_dir: dir.as_ref().to_path_buf(),
            ..Config::default()
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The backing key-value store
    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    // ==================== Generic access ====================

    /// Records of one collection
    pub fn items<T: Stored>(&self) -> &[T] {
        T::collection(self).items()
    }

    /// Replace a collection with a locally produced list
    ///
    /// Returns the previous length.
    pub fn set_all<T: Stored>(&mut self, items: Vec<T>) -> StoreResult<usize> {
        self.mutate(|c: &mut Collection<T>| c.replace_all(items))
    }

    /// Replace a collection with the copy fetched from the remote
    pub fn replace_from_remote<T: Stored>(&mut self, items: Vec<T>) -> StoreResult<()> {
        let count = items.len();
        self.mutate(|c: &mut Collection<T>| c.replace_from_remote(items))?;
        info!("Replaced local {}s with {} remote records", T::KIND, count);
        Ok(())
    }

    /// Drain the change log of one collection
    pub fn take_changes<T: Stored>(&mut self) -> Vec<Change<T>> {
        T::collection_mut(self).take_changes()
    }

    /// Apply `edit` to one collection and persist it
    ///
    /// If the write fails the collection, change log included, is restored
    /// to its state before the edit.
    fn mutate<T: Stored, O>(
        &mut self,
        edit: impl FnOnce(&mut Collection<T>) -> O,
    ) -> StoreResult<O> {
        let snapshot = T::collection(self).clone();
        let out = edit(T::collection_mut(self));

        if let Err(e) = T::collection(self).persist(&self.local) {
            warn!("Failed to persist {}s, rolling back: {}", T::KIND, e);
            *T::collection_mut(self) = snapshot;
            return Err(e.into());
        }
        Ok(out)
    }

    // ==================== Task Operations ====================

    pub fn tasks(&self) -> &[Task] {
        self.tasks.items()
    }

    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Create a task from a form submission
    ///
    /// Only the team captain may create tasks.
    pub fn create_task(&mut self, actor: &User, draft: TaskDraft) -> StoreResult<Task> {
        if !actor.can_assign_tasks() {
            return Err(StoreError::NotPermitted {
                callsign: actor.role_callsign.clone(),
                action: "create tasks",
            });
        }

        let task = Task::from_draft(draft);
        self.mutate(|tasks: &mut Collection<Task>| tasks.push(task.clone()))?;
        debug!("Created task {} for {}", task.id, task.assignee);
        Ok(task)
    }

    /// Move a task to a new status
    pub fn update_task_status(&mut self, id: &str, status: TaskStatus) -> StoreResult<Task> {
        self.mutate(|tasks: &mut Collection<Task>| tasks.update(id, |t| t.set_status(status)))?
            .ok_or_else(|| StoreError::NotFound {
                kind: Task::KIND,
                id: id.to_string(),
            })
    }

    /// Replace the task list with a locally edited one
    pub fn set_tasks(&mut self, tasks: Vec<Task>) -> StoreResult<usize> {
        self.set_all(tasks)
    }

    // ==================== Message Operations ====================

    pub fn messages(&self) -> &[ChatMessage] {
        self.messages.items()
    }

    /// Messages posted to one channel, in collection order
    pub fn messages_in_channel(&self, channel: &str) -> Vec<&ChatMessage> {
        self.messages
            .items()
            .iter()
            .filter(|m| m.channel == channel)
            .collect()
    }

    /// Post a message as `actor`
    ///
    /// Whitespace-only content is rejected; `None` posts to the default
    /// channel.
    pub fn send_message(
        &mut self,
        actor: &User,
        channel: Option<&str>,
        content: &str,
    ) -> StoreResult<ChatMessage> {
        let content = content.trim();
        if content.is_empty() {
            return Err(StoreError::EmptyMessage);
        }

        let channel = channel.unwrap_or(DEFAULT_CHANNEL);
        if !is_known_channel(channel) {
            return Err(StoreError::UnknownChannel(channel.to_string()));
        }

        let message = ChatMessage::new(&actor.role_callsign, channel, content);
        self.mutate(|messages: &mut Collection<ChatMessage>| messages.push(message.clone()))?;
        Ok(message)
    }

    /// Replace the message list with a locally edited one
    pub fn set_messages(&mut self, messages: Vec<ChatMessage>) -> StoreResult<usize> {
        self.set_all(messages)
    }

    // ==================== Document Operations ====================

    pub fn documents(&self) -> &[DocumentFile] {
        self.documents.items()
    }

    /// Register a document; newest first
    pub fn add_document(&mut self, document: DocumentFile) -> StoreResult<DocumentFile> {
        self.mutate(|documents: &mut Collection<DocumentFile>| {
            documents.prepend(document.clone())
        })?;
        Ok(document)
    }

    /// Register a file on disk by its name and size
    ///
    /// Only metadata is kept; the file contents are never read.
    pub fn add_document_from_path(
        &mut self,
        actor: &User,
        path: &Path,
    ) -> StoreResult<DocumentFile> {
        let metadata = std::fs::metadata(path).map_err(|source| StoreError::File {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let document = DocumentFile::from_file(name, metadata.len(), &actor.role_callsign);
        self.add_document(document)
    }

    // ==================== Cloud Config ====================

    pub fn cloud_config(&self) -> &CloudConfig {
        &self.cloud
    }

    pub fn set_cloud_config(&mut self, cloud: CloudConfig) -> StoreResult<()> {
        self.local.save(CLOUD_CONFIG_KEY, &cloud)?;
        info!("Cloud config updated (active: {})", cloud.is_active());
        self.cloud = cloud;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory;
    use crate::models::{DocumentType, TaskPriority};
    use tempfile::TempDir;

    fn captain() -> User {
        directory::lookup("selçuk").unwrap()
    }

    fn member() -> User {
        directory::lookup("ceren").unwrap()
    }

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: "Açıklama".to_string(),
            assignee: "RoseFlight".to_string(),
            priority: Some(TaskPriority::Critical),
            deadline: None,
        }
    }

    #[test]
    fn test_fresh_store_has_greeting_only() {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::open_in(temp_dir.path()).unwrap();

        assert!(store.tasks().is_empty());
        assert!(store.documents().is_empty());
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].id, "sys-init");
        assert!(!store.cloud_config().is_active());
    }

    #[test]
    fn test_create_task_requires_captain() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_in(temp_dir.path()).unwrap();

        let err = store.create_task(&member(), draft("x")).unwrap_err();
        assert!(matches!(err, StoreError::NotPermitted { .. }));
        assert!(store.tasks().is_empty());

        let task = store.create_task(&captain(), draft("Kanat")).unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.deadline, "2024-01-01");
        assert_eq!(store.tasks().len(), 1);
    }

    #[test]
    fn test_mutations_are_persisted() {
        let temp_dir = TempDir::new().unwrap();
        let id = {
            let mut store = Store::open_in(temp_dir.path()).unwrap();
            let task = store.create_task(&captain(), draft("Kanat")).unwrap();
            store
                .update_task_status(&task.id, TaskStatus::Completed)
                .unwrap();
            store
                .send_message(&member(), Some("Operasyon"), "Hazırız")
                .unwrap();
            task.id
        };

        let store = Store::open_in(temp_dir.path()).unwrap();
        let task = store.get_task(&id).unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(task.progress, 100);
        assert_eq!(store.messages().len(), 2);
    }

    #[test]
    fn test_update_missing_task() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_in(temp_dir.path()).unwrap();

        let err = store
            .update_task_status("TSK-NOPE", TaskStatus::Review)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { kind: "task", .. }));
    }

    #[test]
    fn test_send_message_validation() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_in(temp_dir.path()).unwrap();

        assert!(matches!(
            store.send_message(&member(), None, "   "),
            Err(StoreError::EmptyMessage)
        ));
        assert!(matches!(
            store.send_message(&member(), Some("Kantin"), "selam"),
            Err(StoreError::UnknownChannel(_))
        ));

        let msg = store.send_message(&member(), None, "  selam  ").unwrap();
        assert_eq!(msg.channel, "Genel");
        assert_eq!(msg.content, "selam");
        assert_eq!(msg.sender, "RoseFlight");
    }

    #[test]
    fn test_messages_in_channel() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_in(temp_dir.path()).unwrap();

        store.send_message(&member(), Some("Operasyon"), "bir").unwrap();
        store.send_message(&member(), Some("RoseSecure"), "gizli").unwrap();
        store.send_message(&member(), Some("Operasyon"), "iki").unwrap();

        let ops: Vec<_> = store
            .messages_in_channel("Operasyon")
            .into_iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(ops, vec!["bir", "iki"]);
        assert_eq!(store.messages_in_channel("Genel").len(), 1);
    }

    #[test]
    fn test_documents_are_prepended() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_in(temp_dir.path()).unwrap();

        let first = temp_dir.path().join("rapor.pdf");
        let second = temp_dir.path().join("montaj.xlsx");
        std::fs::write(&first, vec![0u8; 2048]).unwrap();
        std::fs::write(&second, b"x").unwrap();

        store.add_document_from_path(&member(), &first).unwrap();
        store.add_document_from_path(&member(), &second).unwrap();

        let docs = store.documents();
        assert_eq!(docs[0].name, "montaj.xlsx");
        assert_eq!(docs[0].doc_type, DocumentType::Xlsx);
        assert_eq!(docs[1].name, "rapor.pdf");
        assert_eq!(docs[1].size, "0.00 MB");
        assert_eq!(docs[1].owner, "RoseFlight");

        let missing = store.add_document_from_path(&member(), &temp_dir.path().join("nope"));
        assert!(matches!(missing, Err(StoreError::File { .. })));
    }

    #[test]
    fn test_remote_replacement_is_not_logged() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_in(temp_dir.path()).unwrap();
        store.create_task(&captain(), draft("local")).unwrap();
        store.take_changes::<Task>();

        let remote = vec![
            Task::from_draft(draft("r1")),
            Task::from_draft(draft("r2")),
        ];
        store.replace_from_remote(remote.clone()).unwrap();

        assert_eq!(store.tasks(), remote.as_slice());
        assert!(store.take_changes::<Task>().is_empty());

        let reopened = Store::open_in(temp_dir.path()).unwrap();
        assert_eq!(reopened.tasks(), remote.as_slice());
    }

    #[test]
    fn test_failed_write_rolls_back_task() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_in(temp_dir.path()).unwrap();
        let kept = store.create_task(&captain(), draft("kept")).unwrap();
        store.take_changes::<Task>();

        // A directory where the blob belongs makes every save fail
        let blob = temp_dir.path().join(format!("{}.json", TASKS_KEY));
        std::fs::remove_file(&blob).unwrap();
        std::fs::create_dir(&blob).unwrap();

        let err = store.create_task(&captain(), draft("lost")).unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert!(StoreError::EmptyMessage.recovery_suggestion().is_none());
        assert!(store
            .update_task_status(&kept.id, TaskStatus::Review)
            .is_err());

        assert_eq!(store.tasks(), std::slice::from_ref(&kept));
        assert!(store.take_changes::<Task>().is_empty());
    }

    #[test]
    fn test_failed_write_rolls_back_message() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_in(temp_dir.path()).unwrap();
        std::fs::create_dir(temp_dir.path().join(format!("{}.json", MESSAGES_KEY))).unwrap();

        assert!(store.send_message(&member(), None, "selam").is_err());
        assert_eq!(store.messages().len(), 1);
        assert!(store.take_changes::<ChatMessage>().is_empty());
    }

    #[test]
    fn test_documents_keep_no_change_log() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_in(temp_dir.path()).unwrap();

        let doc = DocumentFile::from_file("plan.pdf".to_string(), 10, "RoseFlight");
        store.add_document(doc.clone()).unwrap();
        store.set_all(vec![doc]).unwrap();

        assert_eq!(store.documents().len(), 1);
        assert!(store.take_changes::<DocumentFile>().is_empty());
    }

    #[test]
    fn test_set_tasks_returns_previous_len() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = Store::open_in(temp_dir.path()).unwrap();
        let a = store.create_task(&captain(), draft("a")).unwrap();

        let prev = store
            .set_tasks(vec![a, Task::from_draft(draft("b"))])
            .unwrap();
        assert_eq!(prev, 1);
        assert_eq!(store.tasks().len(), 2);
    }

    #[test]
    fn test_cloud_config_persisted() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut store = Store::open_in(temp_dir.path()).unwrap();
            store
                .set_cloud_config(CloudConfig::new("https://x.supabase.co", "k", true))
                .unwrap();
        }
        let store = Store::open_in(temp_dir.path()).unwrap();
        assert!(store.cloud_config().is_active());
        assert_eq!(store.cloud_config().api_key, "k");
    }
}
