//! `task-status`: operator CLI over the task queue.
//!
//! Subcommands: `list [--status …] [--limit n] [--all] [--json]`,
//! `show <task_id> [--json]`, `set-status <task_id> <status> [--error msg | --clear-error]`.
//! Exit code 0 on success, 1 on missing task or invalid input.

use clap::{Parser, Subcommand};
use slidereel_models::{Task, TaskId, TaskStatus};
use slidereel_queue::TaskQueue;
use slidereel_state::StateManager;

#[derive(Parser)]
#[command(name = "task-status", about = "Inspect and mutate task status in the queue")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List tasks, optionally filtered by status.
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
    /// Show a single task.
    Show {
        task_id: String,
        #[arg(long)]
        json: bool,
    },
    /// Force a task's status, optionally attaching or clearing its error.
    SetStatus {
        task_id: String,
        status: String,
        #[arg(long)]
        error: Option<String>,
        #[arg(long)]
        clear_error: bool,
    },
}

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider().install_default().ok();
    dotenvy::dotenv().ok();
    slidereel_cli::init_tracing();

    let cli = Cli::parse();
    let exit_code = match run(cli.command).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    };
    std::process::exit(exit_code);
}

async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::List { status, limit, all, json } => list(status, limit, all, json).await,
        Command::Show { task_id, json } => show(&task_id, json).await,
        Command::SetStatus { task_id, status, error, clear_error } => {
            set_status(&task_id, &status, error, clear_error).await
        }
    }
}

async fn list(status: Option<String>, limit: usize, all: bool, json: bool) -> anyhow::Result<()> {
    let queue = TaskQueue::from_env()?;

    let status_filter = match status {
        Some(s) => Some(TaskStatus::parse(&s).ok_or_else(|| anyhow::anyhow!("invalid status: {s}"))?),
        None => None,
    };

    let mut tasks = queue.scan(status_filter).await?;
    tasks.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    if !all {
        tasks.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    for task in &tasks {
        print_task_line(task);
    }
    println!("{} task(s)", tasks.len());
    Ok(())
}

async fn show(task_id: &str, json: bool) -> anyhow::Result<()> {
    let queue = TaskQueue::from_env()?;
    let task_id = TaskId::from_string(task_id);

    let task = queue
        .get(&task_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no task found with id {task_id}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&task)?);
        return Ok(());
    }

    print_task_line(&task);
    if let Some(error) = &task.error {
        println!("error: {error}");
    }
    if let Some(result) = &task.result {
        println!("result: {result}");
    }
    Ok(())
}

async fn set_status(task_id: &str, status: &str, error: Option<String>, clear_error: bool) -> anyhow::Result<()> {
    if error.is_some() && clear_error {
        anyhow::bail!("--error and --clear-error are mutually exclusive");
    }

    let queue = TaskQueue::from_env()?;
    let task_id = TaskId::from_string(task_id);
    let new_status = TaskStatus::parse(status).ok_or_else(|| anyhow::anyhow!("invalid status: {status}"))?;

    queue
        .get(&task_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no task found with id {task_id}"))?;

    let error_to_store = if clear_error { None } else { error };
    queue.update_status(&task_id, new_status, error_to_store).await?;
    println!("{task_id}: -> {new_status}");

    if let Ok(state_manager) = StateManager::from_env() {
        let mirrored = match new_status {
            TaskStatus::Completed => state_manager.mark_completed_by_task(&task_id).await,
            TaskStatus::Failed => state_manager.mark_failed_by_task(&task_id).await,
            TaskStatus::Cancelled => state_manager.mark_cancelled_by_task(&task_id, None).await,
            _ => return Ok(()),
        };
        if let Err(e) = mirrored {
            eprintln!("warning: file state mirror update failed: {e}");
        }
    }
    Ok(())
}

fn print_task_line(task: &Task) {
    println!(
        "{}\t{}\t{}\t{}",
        task.task_id,
        task.payload.task_type(),
        task.status,
        task.updated_at.to_rfc3339()
    );
}
