//! Data models for Rose
//!
//! Defines the records held in the local collections: Task, ChatMessage and
//! DocumentFile, plus the CloudConfig that drives sync.
//!
//! Field names serialize as camelCase so the JSON blobs and the remote rows
//! share one shape.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, TimeZone};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Deadline applied when a task form leaves it blank
pub const DEFAULT_DEADLINE: &str = "2024-01-01";

/// Channel messages land in when none is chosen
pub const DEFAULT_CHANNEL: &str = "Genel";

/// Public chat channels
pub const CHANNELS: &[&str] = &["Genel", "Operasyon", "Mühendislik", "İstihbarat"];

/// Secure point-to-point lines
pub const SECURE_CHANNELS: &[&str] = &["RoseOps", "RoseSecure"];

/// A record that lives in a collection and can be addressed by id
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Identifier of this record
    fn id(&self) -> &str;
}

/// Generate a short prefixed identifier such as `TSK-1A2B3C4D`
fn short_id(prefix: &str) -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("{}-{}", prefix, simple[..8].to_ascii_uppercase())
}

/// Error returned when parsing one of the enum fields from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: '{value}' (expected one of: {expected})")]
pub struct ParseFieldError {
    field: &'static str,
    value: String,
    expected: &'static str,
}

/// Normalize user input for enum parsing: lowercase, no separators
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

// ==================== Task ====================

/// Workflow state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Review,
    Completed,
}

impl TaskStatus {
    /// All statuses in board order
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Review => "Review",
            TaskStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "inprogress" => Ok(TaskStatus::InProgress),
            "review" => Ok(TaskStatus::Review),
            "completed" | "done" => Ok(TaskStatus::Completed),
            _ => Err(ParseFieldError {
                field: "status",
                value: s.to_string(),
                expected: "pending, in-progress, review, completed",
            }),
        }
    }
}

/// Urgency of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
            TaskPriority::Critical => "Critical",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskPriority {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            "critical" => Ok(TaskPriority::Critical),
            _ => Err(ParseFieldError {
                field: "priority",
                value: s.to_string(),
                expected: "low, medium, high, critical",
            }),
        }
    }
}

/// A unit of work assigned to a team member
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Role callsign of the assignee
    pub assignee: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    /// Date string as entered on the form
    pub deadline: String,
    /// Percentage, 0 to 100
    pub progress: u8,
}

/// Fields collected by the task creation form
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub assignee: String,
    pub priority: Option<TaskPriority>,
    pub deadline: Option<String>,
}

impl Task {
    /// Create a task from a submitted form
    ///
    /// Status is always Pending and progress 0, whatever the form says.
    pub fn from_draft(draft: TaskDraft) -> Self {
        let deadline = draft
            .deadline
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DEADLINE.to_string());

        Self {
            id: short_id("TSK"),
            title: draft.title,
            description: draft.description,
            assignee: draft.assignee,
            status: TaskStatus::Pending,
            priority: draft.priority.unwrap_or(TaskPriority::Medium),
            deadline,
            progress: 0,
        }
    }

    /// Move the task to a new status
    ///
    /// Completing a task snaps progress to 100; other transitions keep it.
    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        if status == TaskStatus::Completed {
            self.progress = 100;
        }
    }

    /// Whether the task is still open and marked critical
    pub fn is_critical_open(&self) -> bool {
        self.priority == TaskPriority::Critical && self.status != TaskStatus::Completed
    }
}

impl Record for Task {
    fn id(&self) -> &str {
        &self.id
    }
}

// ==================== Chat ====================

/// A chat line posted to a channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    /// Callsign of the sender
    pub sender: String,
    pub content: String,
    /// Display time (HH:MM), not sortable across days
    pub timestamp: String,
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_system: Option<bool>,
    /// Sortable instant (Unix epoch milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<i64>,
}

impl ChatMessage {
    /// Compose a message sent now
    pub fn new(
        sender: impl Into<String>,
        channel: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self::at(sender, channel, content, Local::now())
    }

    /// Compose a message with an explicit send time
    pub fn at<Tz: TimeZone>(
        sender: impl Into<String>,
        channel: impl Into<String>,
        content: impl Into<String>,
        at: DateTime<Tz>,
    ) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            content: content.into(),
            timestamp: at.format("%H:%M").to_string(),
            channel: channel.into(),
            is_system: None,
            sent_at: Some(at.timestamp_millis()),
        }
    }

    /// The greeting a fresh install starts with
    pub fn system_greeting() -> Self {
        Self {
            id: "sys-init".to_string(),
            sender: "Sistem".to_string(),
            content: "Rose E-Team Yönetim Paneli v4.2 Çevrimiçi. Güvenli bağlantı kuruldu."
                .to_string(),
            timestamp: "08:00".to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            is_system: Some(true),
            sent_at: None,
        }
    }

    pub fn is_system(&self) -> bool {
        self.is_system.unwrap_or(false)
    }
}

impl Record for ChatMessage {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Order messages by their sortable instant
///
/// Only stamped messages move, and only among the slots stamped messages
/// already hold. Messages without `sent_at` stay at their server position.
/// Equal instants keep server order.
pub fn sort_by_sent_at(messages: &mut [ChatMessage]) {
    let slots: Vec<usize> = messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.sent_at.is_some())
        .map(|(i, _)| i)
        .collect();
    if slots.len() < 2 {
        return;
    }

    let mut stamped: Vec<ChatMessage> = slots.iter().map(|&i| messages[i].clone()).collect();
    stamped.sort_by_key(|m| m.sent_at);
    for (slot, message) in slots.into_iter().zip(stamped) {
        messages[slot] = message;
    }
}

/// Whether a channel is one of the secure lines
pub fn is_secure_channel(channel: &str) -> bool {
    SECURE_CHANNELS.contains(&channel)
}

/// Whether a channel name is known
pub fn is_known_channel(channel: &str) -> bool {
    CHANNELS.contains(&channel) || is_secure_channel(channel)
}

// ==================== Documents ====================

/// File category shown in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "PDF")]
    Pdf,
    #[serde(rename = "DOCX")]
    Docx,
    #[serde(rename = "XLSX")]
    Xlsx,
    #[serde(rename = "CAD")]
    Cad,
}

impl DocumentType {
    /// Detect the type from a file name, defaulting to PDF
    pub fn from_file_name(name: &str) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "docx" | "doc" => DocumentType::Docx,
            "xlsx" | "xls" => DocumentType::Xlsx,
            "dwg" | "dxf" | "step" | "stp" => DocumentType::Cad,
            _ => DocumentType::Pdf,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentType::Pdf => "PDF",
            DocumentType::Docx => "DOCX",
            DocumentType::Xlsx => "XLSX",
            DocumentType::Cad => "CAD",
        };
        f.write_str(s)
    }
}

/// Classification label (cosmetic; nothing is encrypted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SecurityLevel {
    Low,
    #[default]
    Internal,
    Restricted,
    TopSecure,
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SecurityLevel::Low => "Low",
            SecurityLevel::Internal => "Internal",
            SecurityLevel::Restricted => "Restricted",
            SecurityLevel::TopSecure => "TopSecure",
        };
        f.write_str(s)
    }
}

impl FromStr for SecurityLevel {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "low" => Ok(SecurityLevel::Low),
            "internal" => Ok(SecurityLevel::Internal),
            "restricted" => Ok(SecurityLevel::Restricted),
            "topsecure" | "topsecret" => Ok(SecurityLevel::TopSecure),
            _ => Err(ParseFieldError {
                field: "security level",
                value: s.to_string(),
                expected: "low, internal, restricted, top-secure",
            }),
        }
    }
}

/// Registry entry for an uploaded file (metadata only)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
    pub security_level: SecurityLevel,
    /// Callsign of the uploader
    pub owner: String,
    /// Upload date (DD.MM.YYYY)
    pub date: String,
    /// Human-readable size, e.g. "1.50 MB"
    pub size: String,
}

impl DocumentFile {
    /// Capture metadata for a selected file
    pub fn from_file(name: impl Into<String>, size_bytes: u64, owner: impl Into<String>) -> Self {
        Self::from_file_on(name, size_bytes, owner, Local::now())
    }

    /// Capture metadata with an explicit upload date
    pub fn from_file_on<Tz: TimeZone>(
        name: impl Into<String>,
        size_bytes: u64,
        owner: impl Into<String>,
        on: DateTime<Tz>,
    ) -> Self
    where
        Tz::Offset: fmt::Display,
    {
        let name = name.into();
        Self {
            id: short_id("DOC"),
            doc_type: DocumentType::from_file_name(&name),
            name,
            security_level: SecurityLevel::default(),
            owner: owner.into(),
            date: on.format("%d.%m.%Y").to_string(),
            size: format_size(size_bytes),
        }
    }
}

impl Record for DocumentFile {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Render a byte count as megabytes with two decimals
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

// ==================== Cloud ====================

/// Remote endpoint settings, edited at runtime
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudConfig {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub enabled: bool,
}

impl CloudConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>, enabled: bool) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            enabled,
        }
    }

    /// Sync runs only when enabled with a non-empty URL
    pub fn is_active(&self) -> bool {
        self.enabled && !self.api_url.trim().is_empty()
    }

    /// Base URL without trailing slashes
    pub fn base_url(&self) -> &str {
        self.api_url.trim().trim_end_matches('/')
    }
}

impl fmt::Debug for CloudConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "<redacted>" })
            .field("enabled", &self.enabled)
            .finish()
    }
}
