//! Command-line interface for taskdeck.

use anyhow::{Context as _, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::repo::{ContextRepository, SettingsRepository, TaskRepository, ViewRepository};
use crate::storage::{StorageAdapter, open_adapter};
use crate::types::{ContextInput, Task, TaskInput};

#[derive(Parser)]
#[command(name = "taskdeck", version, about = "Hierarchical task organizer")]
pub struct Cli {
    /// Path to an alternate config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add a task
    Add {
        title: String,
        /// Parent task id
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,
        /// Context ids to attach
        #[arg(long = "context")]
        contexts: Vec<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// File into the inbox
        #[arg(long)]
        inbox: bool,
        #[arg(long)]
        starred: bool,
        /// Mark as a goal of the given type
        #[arg(long)]
        goal: Option<String>,
        #[arg(long)]
        importance: Option<i64>,
        #[arg(long)]
        urgency: Option<i64>,
        /// Review interval in days
        #[arg(long)]
        review_days: Option<i64>,
    },
    /// List tasks through a derived query
    List {
        /// One of: outline, active, inbox, overdue, goals, review
        #[arg(default_value = "outline")]
        query: String,
    },
    /// Show one task
    Show { id: String },
    /// Toggle completion
    Done { id: String },
    /// Mark a task reviewed
    Reviewed { id: String },
    /// Delete a task
    Rm {
        id: String,
        /// Also delete all descendants
        #[arg(long)]
        cascade: bool,
    },
    /// Manage contexts
    Contexts {
        #[command(subcommand)]
        command: ContextCommand,
    },
    /// Manage views
    Views {
        #[command(subcommand)]
        command: ViewCommand,
    },
    /// Manage settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Export the full state as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Import a previously exported JSON file
    Import { file: PathBuf },
    /// Remove all persisted state
    Wipe {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ContextCommand {
    /// List all contexts
    List,
    /// Add a context
    Add {
        name: String,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Delete a context
    Rm { id: String },
    /// Create the default context set
    Seed,
}

#[derive(Subcommand)]
pub enum ViewCommand {
    /// List all views
    List,
    /// Set the current view
    Use { id: String },
    /// Delete a custom view
    Rm { id: String },
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Print the full settings record
    List,
    /// Set one key (value parsed as JSON, else taken as a string)
    Set { key: String, value: String },
    /// Restore defaults
    Reset,
}

/// Run a parsed command to completion.
pub async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let storage = open_adapter(&config.storage)?;
    storage.init().await?;

    match cli.command {
        Command::Add {
            title,
            parent,
            notes,
            due,
            start,
            contexts,
            tags,
            inbox,
            starred,
            goal,
            importance,
            urgency,
            review_days,
        } => {
            let mut tasks = load_tasks(&storage).await;
            let task = tasks
                .create(TaskInput {
                    title: Some(title),
                    notes,
                    parent_id: parent,
                    due_date: due.as_deref().map(parse_date).transpose()?,
                    start_date: start.as_deref().map(parse_date).transpose()?,
                    contexts,
                    tags,
                    is_in_inbox: inbox,
                    is_starred: starred,
                    goal_type: goal,
                    importance,
                    urgency,
                    review_period: review_days,
                    ..Default::default()
                })
                .await?;
            println!("created {}", task.id);
        }
        Command::List { query } => {
            let tasks = load_tasks(&storage).await;
            match query.as_str() {
                "outline" => print_outline(&tasks),
                "active" => print_tasks(&tasks.active_tasks()),
                "inbox" => print_tasks(&tasks.inbox_tasks()),
                "overdue" => print_tasks(&tasks.overdue_tasks()),
                "goals" => print_tasks(&tasks.goal_tasks()),
                "review" => print_tasks(&tasks.review_tasks()),
                other => bail!("unknown query: {other}"),
            }
        }
        Command::Show { id } => {
            let tasks = load_tasks(&storage).await;
            let task = tasks
                .get(&id)
                .with_context(|| format!("task not found: {id}"))?;
            let json = serde_json::to_string_pretty(task)?;
            println!("{json}");
        }
        Command::Done { id } => {
            let mut tasks = load_tasks(&storage).await;
            let task = tasks.toggle_complete(&id).await?;
            let state = if task.is_completed { "done" } else { "reopened" };
            println!("{} {}", state, task.id);
        }
        Command::Reviewed { id } => {
            let mut tasks = load_tasks(&storage).await;
            tasks.mark_reviewed(&id).await?;
            println!("reviewed {id}");
        }
        Command::Rm { id, cascade } => {
            let mut tasks = load_tasks(&storage).await;
            tasks.delete(&id, cascade).await?;
            println!("deleted {id}");
        }
        Command::Contexts { command } => run_contexts(&storage, command).await?,
        Command::Views { command } => run_views(&storage, command).await?,
        Command::Settings { command } => run_settings(&storage, command).await?,
        Command::Export { output } => {
            let mut tasks = load_tasks(&storage).await;
            let snapshot = tasks.export_all().await?;
            let json = serde_json::to_string_pretty(&snapshot)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("exported to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let payload: Value = serde_json::from_str(&raw)?;
            let mut tasks = load_tasks(&storage).await;
            tasks.import_all(payload).await?;
            println!("imported {} tasks", tasks.tasks().len());
        }
        Command::Wipe { yes } => {
            if !yes {
                bail!("refusing to wipe without --yes");
            }
            let mut tasks = load_tasks(&storage).await;
            tasks.clear_all().await?;
            println!("all data removed");
        }
    }
    Ok(())
}

async fn run_contexts(storage: &Arc<dyn StorageAdapter>, command: ContextCommand) -> Result<()> {
    let mut contexts = ContextRepository::new(Arc::clone(storage));
    contexts.load().await;

    match command {
        ContextCommand::List => {
            for context in contexts.contexts() {
                let icon = context.icon.as_deref().unwrap_or("-");
                println!("{}  {}  [{}]", context.id, context.name, icon);
            }
        }
        ContextCommand::Add {
            name,
            icon,
            color,
            parent,
        } => {
            let context = contexts
                .create(ContextInput {
                    name: Some(name),
                    icon,
                    color,
                    parent_id: parent,
                    schedule: None,
                })
                .await?;
            println!("created {}", context.id);
        }
        ContextCommand::Rm { id } => {
            contexts.delete(&id).await?;
            println!("deleted {id}");
        }
        ContextCommand::Seed => {
            let seeded = contexts.create_default_contexts().await?;
            for context in seeded {
                println!("created {}  {}", context.id, context.name);
            }
        }
    }
    Ok(())
}

async fn run_views(storage: &Arc<dyn StorageAdapter>, command: ViewCommand) -> Result<()> {
    let mut views = ViewRepository::new(Arc::clone(storage));
    views.load().await?;

    match command {
        ViewCommand::List => {
            let current = views.current_view().map(|v| v.id.clone());
            for view in views.views() {
                let marker = if current.as_deref() == Some(&view.id) {
                    "*"
                } else {
                    " "
                };
                let origin = if view.is_built_in { "built-in" } else { "custom" };
                println!("{marker} {}  {}  ({origin})", view.id, view.name);
            }
        }
        ViewCommand::Use { id } => {
            views.set_current_view(id.clone());
            match views.current_view() {
                Some(view) => println!("current view: {}", view.name),
                None => bail!("view not found: {id}"),
            }
        }
        ViewCommand::Rm { id } => {
            views.delete(&id).await?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

async fn run_settings(storage: &Arc<dyn StorageAdapter>, command: SettingsCommand) -> Result<()> {
    let mut settings = SettingsRepository::new(Arc::clone(storage));
    settings.load().await;

    match command {
        SettingsCommand::List => {
            let record = serde_json::to_value(settings.settings())?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        SettingsCommand::Set { key, value } => {
            let parsed: Value =
                serde_json::from_str(&value).unwrap_or_else(|_| Value::String(value));
            settings.update_setting(&key, parsed).await?;
            if !settings.settings().auto_save {
                settings.save().await?;
            }
            println!("set {key}");
        }
        SettingsCommand::Reset => {
            settings.reset().await?;
            println!("settings reset to defaults");
        }
    }
    Ok(())
}

async fn load_tasks(storage: &Arc<dyn StorageAdapter>) -> TaskRepository {
    let mut tasks = TaskRepository::new(Arc::clone(storage));
    tasks.load().await;
    tasks
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date: {raw}"))
}

fn print_outline(tasks: &TaskRepository) {
    let mut roots = tasks.root_tasks();
    roots.sort_by_key(|t| t.order);
    for root in roots {
        print_subtree(tasks, root, 0);
    }
}

fn print_subtree(tasks: &TaskRepository, task: &Task, depth: usize) {
    println!("{}{}", "  ".repeat(depth), format_line(task));
    for child in tasks.children_of(&task.id) {
        print_subtree(tasks, child, depth + 1);
    }
}

fn print_tasks(tasks: &[&Task]) {
    for task in tasks {
        println!("{}", format_line(task));
    }
}

fn format_line(task: &Task) -> String {
    let check = if task.is_completed { "x" } else { " " };
    let star = if task.is_starred { " *" } else { "" };
    let due = task
        .due_date
        .map(|d| format!("  due {d}"))
        .unwrap_or_default();
    format!("[{check}] {}  {}{due}{star}", task.id, task.title)
}
