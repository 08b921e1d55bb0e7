//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use rose_core::models::{ChatMessage, DocumentFile, Task};
use rose_core::sync::{CycleReport, PushOutcome, ResourceOutcome};
use rose_core::Dashboard;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }

    /// Print any serializable value as pretty JSON
    pub fn json<T: Serialize + ?Sized>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("Failed to encode JSON: {}", e),
        }
    }

    /// Print a single task
    pub fn print_task(&self, task: &Task) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:          {}", task.id);
                println!("Title:       {}", task.title);
                if !task.description.is_empty() {
                    println!("Description: {}", task.description);
                }
                println!("Assignee:    {}", task.assignee);
                println!("Status:      {}", task.status);
                println!("Priority:    {}", task.priority);
                println!("Deadline:    {}", task.deadline);
                println!("Progress:    {}%", task.progress);
            }
            OutputFormat::Json => self.json(task),
            OutputFormat::Quiet => println!("{}", task.id),
        }
    }

    /// Print a list of tasks
    pub fn print_tasks(&self, tasks: &[&Task]) {
        match self.format {
            OutputFormat::Human => {
                if tasks.is_empty() {
                    println!("No tasks found.");
                    return;
                }
                for task in tasks {
                    println!(
                        "{} | {:<11} | {:<8} | {} | {}",
                        task.id,
                        task.status,
                        task.priority,
                        truncate(&task.title, 35),
                        task.assignee
                    );
                }
                println!("\n{} task(s)", tasks.len());
            }
            OutputFormat::Json => self.json(tasks),
            OutputFormat::Quiet => {
                for task in tasks {
                    println!("{}", task.id);
                }
            }
        }
    }

    /// Print the messages of one channel
    pub fn print_messages(&self, channel: &str, messages: &[&ChatMessage]) {
        match self.format {
            OutputFormat::Human => {
                println!("── #{} ──", channel);
                if messages.is_empty() {
                    println!("No messages in this channel.");
                    return;
                }
                for message in messages {
                    if message.is_system() {
                        println!("[{}] * {}", message.timestamp, message.content);
                    } else {
                        println!(
                            "[{}] {}: {}",
                            message.timestamp, message.sender, message.content
                        );
                    }
                }
            }
            OutputFormat::Json => self.json(messages),
            OutputFormat::Quiet => {
                for message in messages {
                    println!("{}", message.id);
                }
            }
        }
    }

    /// Print a list of documents
    pub fn print_documents(&self, documents: &[DocumentFile]) {
        match self.format {
            OutputFormat::Human => {
                if documents.is_empty() {
                    println!("No documents registered.");
                    return;
                }
                for doc in documents {
                    println!(
                        "{} | {:<4} | {:<12} | {:>9} | {} | {}",
                        doc.date,
                        doc.doc_type,
                        doc.security_level,
                        doc.size,
                        truncate(&doc.name, 35),
                        doc.owner
                    );
                }
                println!("\n{} document(s)", documents.len());
            }
            OutputFormat::Json => self.json(documents),
            OutputFormat::Quiet => {
                for doc in documents {
                    println!("{}", doc.id);
                }
            }
        }
    }

    /// Print task statistics
    pub fn print_dashboard(&self, dashboard: &Dashboard) {
        match self.format {
            OutputFormat::Human => {
                println!("Active:    {}", dashboard.active);
                println!("Completed: {}", dashboard.completed);
                println!("Pending:   {}", dashboard.pending);
                println!("Critical:  {}", dashboard.critical);
                println!("Total:     {}", dashboard.total);
                if !dashboard.review_queue.is_empty() {
                    println!();
                    println!("── Awaiting review ──");
                    for task in &dashboard.review_queue {
                        println!("{} | {} | {}", task.id, task.title, task.assignee);
                    }
                }
            }
            OutputFormat::Json => self.json(dashboard),
            OutputFormat::Quiet => println!("{}", dashboard.total),
        }
    }

    /// Print the result of one fetch cycle
    pub fn print_cycle(&self, report: &CycleReport) {
        match self.format {
            OutputFormat::Human => {
                println!("Tasks:    {}", describe_outcome(&report.tasks));
                println!("Messages: {}", describe_outcome(&report.messages));
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({
                        "epoch": report.epoch,
                        "tasks": describe_outcome(&report.tasks),
                        "messages": describe_outcome(&report.messages),
                    })
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Report push results for a mutation
    ///
    /// Failures go to stderr; the local change is already saved.
    pub fn print_pushes(&self, pushes: &[PushOutcome]) {
        for outcome in pushes {
            match outcome {
                PushOutcome::Pushed => self.message("Pushed to cloud."),
                PushOutcome::Skipped => {}
                PushOutcome::Failed(reason) => {
                    if !self.is_quiet() {
                        eprintln!("⚠ Push failed (kept locally): {}", reason);
                    }
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print assistant text; shown even in quiet mode
    pub fn reply(&self, text: &str) {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::json!({"reply": text})),
            _ => println!("{}", text),
        }
    }
}

/// Short description of a per-collection cycle outcome
pub fn describe_outcome(outcome: &ResourceOutcome) -> String {
    match outcome {
        ResourceOutcome::Skipped => "skipped (sync inactive)".to_string(),
        ResourceOutcome::Replaced(n) => format!("replaced with {} remote record(s)", n),
        ResourceOutcome::Empty => "remote empty, local kept".to_string(),
        ResourceOutcome::Failed(reason) => format!("failed, local kept ({})", reason),
        ResourceOutcome::Stale => "stale response discarded".to_string(),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        // Counts characters, not bytes
        assert_eq!(truncate("Mühendislik raporu", 8), "Mühen...");
    }

    #[test]
    fn test_describe_outcome() {
        assert_eq!(
            describe_outcome(&ResourceOutcome::Replaced(3)),
            "replaced with 3 remote record(s)"
        );
        assert!(describe_outcome(&ResourceOutcome::Failed("503".into())).contains("503"));
    }
}
