//! `storage`: operator CLI over the configured storage adapter.
//!
//! Subcommands: `info`, `exists <task_id>`, `delete <key> [--force]`,
//! `upload <path> <key>`, `download <key> <path>`, `url <key> [--expires n]`.
//! Exit code 0 on success, 1 on missing/invalid input or a failed operation.

use clap::{Parser, Subcommand};
use slidereel_models::TaskId;
use slidereel_state::StateManager;
use slidereel_storage::collect_artifact_keys;

#[derive(Parser)]
#[command(name = "storage", about = "Inspect and operate on the configured storage adapter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the active storage provider and its (redacted) configuration.
    Info,
    /// Report which of a task's expected artifacts exist in storage.
    Exists { task_id: String },
    /// Delete an object by key.
    Delete {
        key: String,
        #[arg(long)]
        force: bool,
    },
    /// Upload a local file under a key.
    Upload { path: String, key: String },
    /// Download an object to a local path.
    Download { key: String, path: String },
    /// Print a fetch URL for a key.
    Url {
        key: String,
        #[arg(long, default_value_t = 3600)]
        expires: u64,
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
        Command::Info => info().await,
        Command::Exists { task_id } => exists(&task_id).await,
        Command::Delete { key, force } => delete(&key, force).await,
        Command::Upload { path, key } => upload(&path, &key).await,
        Command::Download { key, path } => download(&key, &path).await,
        Command::Url { key, expires } => url(&key, expires).await,
    }
}

async fn info() -> anyhow::Result<()> {
    let provider_kind = std::env::var("STORAGE_PROVIDER").unwrap_or_else(|_| "local".to_string());
    println!("provider: {provider_kind}");

    let fields: Vec<(&str, String)> = match provider_kind.as_str() {
        "s3" => vec![
            ("S3_ENDPOINT_URL", std::env::var("S3_ENDPOINT_URL").unwrap_or_default()),
            ("S3_BUCKET_NAME", std::env::var("S3_BUCKET_NAME").unwrap_or_default()),
            ("S3_REGION", std::env::var("S3_REGION").unwrap_or_default()),
            ("S3_ACCESS_KEY_ID", std::env::var("S3_ACCESS_KEY_ID").unwrap_or_default()),
            ("S3_SECRET_ACCESS_KEY", std::env::var("S3_SECRET_ACCESS_KEY").unwrap_or_default()),
        ],
        _ => vec![
            ("LOCAL_STORAGE_PATH", std::env::var("LOCAL_STORAGE_PATH").unwrap_or_else(|_| "./storage".to_string())),
            ("LOCAL_STORAGE_BASE_URL", std::env::var("LOCAL_STORAGE_BASE_URL").unwrap_or_else(|_| "/files".to_string())),
        ],
    };

    for (key, value) in fields {
        println!("{key}: {}", slidereel_cli::redact_config_value(key, &value));
    }
    Ok(())
}

async fn exists(task_id: &str) -> anyhow::Result<()> {
    let state_manager = StateManager::from_env()?;
    let storage = slidereel_storage::provider_from_env().await?;
    let task_id = TaskId::from_string(task_id);

    let file_id = state_manager
        .get_file_id_by_task(&task_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no file known for task {task_id}"))?;
    let state = state_manager
        .get(&file_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("no pipeline state for file {file_id}"))?;

    let candidates = collect_artifact_keys(&state, task_id.as_str());
    let mut found = 0usize;
    for key in &candidates {
        let present = storage.exists(key).await.unwrap_or(false);
        if present {
            found += 1;
        }
        println!("{key}: {}", if present { "present" } else { "missing" });
    }

    if found == 0 {
        anyhow::bail!("no artifacts found for task {task_id}");
    }
    Ok(())
}

async fn delete(key: &str, force: bool) -> anyhow::Result<()> {
    let storage = slidereel_storage::provider_from_env().await?;
    if !force && !storage.exists(key).await? {
        anyhow::bail!("key {key} does not exist (pass --force to delete anyway)");
    }
    storage.delete(key).await?;
    println!("deleted {key}");
    Ok(())
}

async fn upload(path: &str, key: &str) -> anyhow::Result<()> {
    let storage = slidereel_storage::provider_from_env().await?;
    let content_type = guess_content_type(key);
    let location = storage.upload(path, key, content_type).await?;
    println!("{location}");
    Ok(())
}

async fn download(key: &str, path: &str) -> anyhow::Result<()> {
    let storage = slidereel_storage::provider_from_env().await?;
    storage.download(key, path).await?;
    println!("downloaded {key} -> {path}");
    Ok(())
}

async fn url(key: &str, expires: u64) -> anyhow::Result<()> {
    let storage = slidereel_storage::provider_from_env().await?;
    let url = storage.get_url(key, expires).await?;
    println!("{url}");
    Ok(())
}

fn guess_content_type(key: &str) -> &'static str {
    if key.ends_with(".mp4") {
        "video/mp4"
    } else if key.ends_with(".mp3") {
        "audio/mpeg"
    } else if key.ends_with(".srt") {
        "application/x-subrip"
    } else if key.ends_with(".vtt") {
        "text/vtt"
    } else if key.ends_with(".md") {
        "text/markdown"
    } else {
        "application/octet-stream"
    }
}
