//! Rose CLI
//!
//! Command-line interface for Rose - team tasks, channel chat, document
//! registry and cloud sync.

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rose_core::models::{TaskPriority, TaskStatus};
use rose_core::{
    directory, Assistant, Config, RemoteClient, StorageError, Store, StoreError, SyncCoordinator,
};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "rose")]
#[command(about = "Rose - Team operations dashboard with cloud sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Acting team member (username)
    #[arg(short, long, global = true, env = "ROSE_USER")]
    user: Option<String>,

    /// Config file path
    #[arg(long = "config", global = true, value_name = "PATH", env = "ROSE_CONFIG")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },
    /// Channel chat
    Chat {
        #[command(subcommand)]
        command: ChatCommands,
    },
    /// Document registry
    Doc {
        #[command(subcommand)]
        command: DocCommands,
    },
    /// Cloud sync endpoint
    Cloud {
        #[command(subcommand)]
        command: Option<CloudCommands>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Ask the assistant a free-form question
    Ask {
        /// Question or instruction
        prompt: String,
        /// Extra context sent with the prompt
        #[arg(short, long)]
        context: Option<String>,
    },
    /// Run one sync cycle
    Sync,
    /// Poll the cloud until Ctrl-C
    Watch,
    /// Show the task dashboard and sync status
    Status,
    /// List team members
    Team,
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Create a task (captain only)
    #[command(alias = "add")]
    Create {
        /// Task title
        title: String,
        /// Assignee callsign
        #[arg(short, long)]
        assignee: String,
        /// Longer description
        #[arg(short, long)]
        description: Option<String>,
        /// low, medium, high or critical
        #[arg(short, long)]
        priority: Option<TaskPriority>,
        /// Deadline date (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<String>,
    },
    /// List tasks
    #[command(alias = "ls")]
    List {
        /// Filter by status
        #[arg(short, long)]
        status: Option<TaskStatus>,
        /// Filter by assignee callsign
        #[arg(short, long)]
        assignee: Option<String>,
    },
    /// Show task details
    Show {
        /// Task ID
        id: String,
    },
    /// Move a task to a new status
    Status {
        /// Task ID
        id: String,
        /// pending, in-progress, review or completed
        status: TaskStatus,
    },
    /// Risk assessment by the assistant
    Analyze {
        /// Task ID
        id: String,
    },
}

#[derive(Subcommand)]
enum ChatCommands {
    /// Post a message
    Send {
        /// Message text
        content: String,
        /// Channel (defaults to Genel)
        #[arg(short, long)]
        channel: Option<String>,
    },
    /// Show a channel
    #[command(alias = "ls")]
    List {
        /// Channel (defaults to Genel)
        #[arg(short, long)]
        channel: Option<String>,
    },
    /// Executive briefing of a channel by the assistant
    Summarize {
        /// Channel (defaults to Genel)
        #[arg(short, long)]
        channel: Option<String>,
    },
    /// List channels
    Channels,
}

#[derive(Subcommand)]
enum DocCommands {
    /// Register a file (name and size only)
    #[command(alias = "add")]
    Add {
        /// Path to the file
        path: PathBuf,
    },
    /// List registered documents
    #[command(alias = "ls")]
    List,
}

#[derive(Subcommand)]
enum CloudCommands {
    /// Show the endpoint
    Show,
    /// Set endpoint URL and access key
    Set {
        /// Base URL of the REST endpoint
        #[arg(long)]
        url: String,
        /// Access key
        #[arg(long)]
        key: String,
        /// Enable sync as well
        #[arg(long)]
        enable: bool,
    },
    /// Enable sync
    Enable,
    /// Disable sync
    Disable,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, poll_interval_secs, push_policy, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            if let Some(hint) = recovery_hint(&e) {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}

/// Recovery suggestion for the first storage failure in the error chain
fn recovery_hint(error: &anyhow::Error) -> Option<&'static str> {
    error.chain().find_map(|cause| {
        if let Some(e) = cause.downcast_ref::<StoreError>() {
            e.recovery_suggestion()
        } else {
            cause
                .downcast_ref::<StorageError>()
                .and_then(StorageError::recovery_suggestion)
        }
    })
}

async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Commands that don't need the store
    match &cli.command {
        Commands::Config { command } => {
            return handle_config_command(command.clone(), cli.config_file.as_ref(), &output);
        }
        Commands::Team => return handle_team_command(&output),
        _ => {}
    }

    let config = Config::load_with_cli_override(cli.config_file.as_ref())
        .context("Failed to load configuration")?;
    init_logging(&config);

    let timeout = config.request_timeout();
    let store = Store::open_with_config(config.clone()).context("Failed to open local store")?;
    let cloud = store.cloud_config().clone();
    let remote = RemoteClient::new(timeout)
        .context("Failed to create HTTP client")?
        .with_sent_at(config.push_sent_at);
    let coordinator = SyncCoordinator::new(remote, Arc::new(Mutex::new(store)), cloud, &config);

    let user = cli.user.as_deref();

    match cli.command {
        Commands::Config { .. } | Commands::Team => unreachable!(), // Handled above
        Commands::Task { command } => handle_task_command(command, &coordinator, user, &output).await,
        Commands::Chat { command } => handle_chat_command(command, &coordinator, user, &output).await,
        Commands::Doc { command } => handle_doc_command(command, &coordinator, user, &output).await,
        Commands::Cloud { command } => handle_cloud_command(command, &coordinator, &output).await,
        Commands::Ask { prompt, context } => {
            let assistant = Assistant::from_env()?;
            commands::ask::ask(&assistant, prompt, context, &output).await
        }
        Commands::Sync => commands::sync::sync(&coordinator, &output).await,
        Commands::Watch => commands::watch::watch(coordinator, &output).await,
        Commands::Status => {
            // Signed-in user is optional here
            let user = user.and_then(directory::lookup);
            commands::status::show(&coordinator, user.as_ref(), &output).await
        }
    }
}

async fn handle_task_command(
    command: TaskCommands,
    coordinator: &SyncCoordinator,
    user: Option<&str>,
    output: &Output,
) -> Result<()> {
    match command {
        TaskCommands::Create {
            title,
            assignee,
            description,
            priority,
            deadline,
        } => {
            let actor = commands::acting_user(user)?;
            let draft = commands::task::draft(title, description, assignee, priority, deadline);
            commands::task::create(coordinator, &actor, draft, output).await
        }
        TaskCommands::List { status, assignee } => {
            commands::task::list(coordinator, status, assignee, output).await
        }
        TaskCommands::Show { id } => commands::task::show(coordinator, id, output).await,
        TaskCommands::Status { id, status } => {
            commands::task::set_status(coordinator, id, status, output).await
        }
        TaskCommands::Analyze { id } => {
            let assistant = Assistant::from_env()?;
            commands::task::analyze(coordinator, &assistant, id, output).await
        }
    }
}

async fn handle_chat_command(
    command: ChatCommands,
    coordinator: &SyncCoordinator,
    user: Option<&str>,
    output: &Output,
) -> Result<()> {
    match command {
        ChatCommands::Send { content, channel } => {
            let actor = commands::acting_user(user)?;
            commands::chat::send(coordinator, &actor, channel, content, output).await
        }
        ChatCommands::List { channel } => commands::chat::list(coordinator, channel, output).await,
        ChatCommands::Summarize { channel } => {
            let assistant = Assistant::from_env()?;
            commands::chat::summarize(coordinator, &assistant, channel, output).await
        }
        ChatCommands::Channels => commands::chat::channels(output),
    }
}

async fn handle_doc_command(
    command: DocCommands,
    coordinator: &SyncCoordinator,
    user: Option<&str>,
    output: &Output,
) -> Result<()> {
    match command {
        DocCommands::Add { path } => {
            let actor = commands::acting_user(user)?;
            commands::doc::add(coordinator, &actor, path, output).await
        }
        DocCommands::List => commands::doc::list(coordinator, output).await,
    }
}

async fn handle_cloud_command(
    command: Option<CloudCommands>,
    coordinator: &SyncCoordinator,
    output: &Output,
) -> Result<()> {
    match command {
        Some(CloudCommands::Show) | None => commands::cloud::show(coordinator, output).await,
        Some(CloudCommands::Set { url, key, enable }) => {
            commands::cloud::set(coordinator, url, key, enable, output).await
        }
        Some(CloudCommands::Enable) => commands::cloud::set_enabled(coordinator, true, output).await,
        Some(CloudCommands::Disable) => {
            commands::cloud::set_enabled(coordinator, false, output).await
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

fn handle_team_command(output: &Output) -> Result<()> {
    let roster = directory::roster();

    if output.is_json() {
        output.json(&roster);
    } else if output.is_quiet() {
        for user in &roster {
            println!("{}", user.username);
        }
    } else {
        for user in &roster {
            println!(
                "{:<8} | {:<12} | {} - {}",
                user.username, user.role_callsign, user.real_name, user.job_title
            );
        }
    }
    Ok(())
}

/// Initialize file logging
///
/// Only initializes if ROSE_LOG environment variable is set.
/// Logs to file (config.log_file or default {data_dir}/debug.log).
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("ROSE_LOG") else {
        return;
    };

    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!("rose_core={},rose={}", log_level, log_level));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("Logging initialized to {:?}", log_path);
}
