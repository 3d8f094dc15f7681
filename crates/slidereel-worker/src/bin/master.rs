//! Master scheduler: polls the task queue, spawns a bounded number of
//! one-task-per-process workers, reaps finished children, and reconciles
//! their terminal task status.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use slidereel_models::{TaskId, TaskStatus};
use slidereel_queue::TaskQueue;
use slidereel_worker::MasterConfig;
use tokio::process::{Child, Command};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("slidereel=info".parse().unwrap()))
        .init();

    let config = MasterConfig::from_env();
    info!(max_workers = config.max_workers, worker_bin = %config.worker_bin, "starting slidereel-master");

    let queue = match TaskQueue::from_env() {
        Ok(q) => q,
        Err(e) => {
            error!(error = %e, "failed to construct task queue");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(queue, config).await {
        error!(error = %e, "master scheduler exited with error");
        std::process::exit(1);
    }
}

async fn run(queue: TaskQueue, config: MasterConfig) -> slidereel_queue::QueueResult<()> {
    let mut children: HashMap<TaskId, Child> = HashMap::new();
    let (shutdown_tx, _) = tokio::sync::watch::channel(false);
    let mut shutdown_rx = shutdown_tx.subscribe();

    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received, stopping intake");
        signal_tx.send_replace(true);
    });

    loop {
        reap_finished(&queue, &mut children).await;

        if *shutdown_rx.borrow() {
            break;
        }

        if children.len() >= config.max_workers {
            tokio::time::sleep(config.poll_interval).await;
            continue;
        }

        tokio::select! {
            _ = shutdown_rx.changed() => continue,
            next = queue.next(config.next_timeout_secs) => {
                match next? {
                    Some(task_id) => claim_and_spawn(&queue, &config, &mut children, task_id).await,
                    None => {}
                }
            }
        }
    }

    shutdown_children(&queue, children, config.shutdown_grace).await;
    info!("slidereel-master shutdown complete");
    Ok(())
}

/// Re-check cancellation, best-effort transition to `processing`, sleep the
/// configured settle delay, then spawn the worker. Losing the race against a
/// concurrent cancel is acceptable: the worker's own pre-flight check
/// catches it.
async fn claim_and_spawn(queue: &TaskQueue, config: &MasterConfig, children: &mut HashMap<TaskId, Child>, task_id: TaskId) {
    match queue.is_cancelled(&task_id).await {
        Ok(true) => {
            info!(task_id = %task_id, "skipping spawn for already-cancelled task");
            return;
        }
        Err(e) => warn!(task_id = %task_id, error = %e, "failed to check cancellation before spawn"),
        Ok(false) => {}
    }

    if let Err(e) = queue.update_status(&task_id, TaskStatus::Processing, None).await {
        warn!(task_id = %task_id, error = %e, "could not transition task to processing before spawn");
    }

    tokio::time::sleep(config.spawn_settle_delay).await;

    match spawn_worker(config, &task_id) {
        Ok(child) => {
            info!(task_id = %task_id, "spawned worker");
            children.insert(task_id, child);
        }
        Err(e) => {
            error!(task_id = %task_id, error = %e, "failed to spawn worker");
            if let Err(e) = queue.update_status(&task_id, TaskStatus::Failed, Some(format!("spawn failed: {e}"))).await {
                warn!(task_id = %task_id, error = %e, "could not mark task failed after spawn failure");
            }
        }
    }
}

fn spawn_worker(config: &MasterConfig, task_id: &TaskId) -> std::io::Result<Child> {
    Command::new(&config.worker_bin)
        .env("TASK_ID", task_id.as_str())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
}

/// For each exited child: `0` and still `processing` -> `completed`;
/// otherwise -> `failed(worker_exited(code))`, unless the task is already
/// `cancelled`, which is left as-is. Never overwrites any other terminal
/// status.
async fn reap_finished(queue: &TaskQueue, children: &mut HashMap<TaskId, Child>) {
    let mut finished = Vec::new();
    for (task_id, child) in children.iter_mut() {
        match child.try_wait() {
            Ok(Some(status)) => finished.push((task_id.clone(), status.code())),
            Ok(None) => {}
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "failed to poll child status");
            }
        }
    }

    for (task_id, code) in finished {
        children.remove(&task_id);
        reconcile_one(queue, &task_id, code).await;
    }
}

async fn reconcile_one(queue: &TaskQueue, task_id: &TaskId, exit_code: Option<i32>) {
    let task = match queue.get(task_id).await {
        Ok(Some(t)) => t,
        Ok(None) => return,
        Err(e) => {
            warn!(task_id = %task_id, error = %e, "failed to load task during reconciliation");
            return;
        }
    };

    if task.status.is_terminal() {
        return;
    }

    let result = if exit_code == Some(0) && task.status == TaskStatus::Processing {
        queue.update_status(task_id, TaskStatus::Completed, None).await
    } else {
        let reason = format!("worker_exited(code={})", exit_code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".to_string()));
        queue.update_status(task_id, TaskStatus::Failed, Some(reason)).await
    };

    if let Err(e) = result {
        warn!(task_id = %task_id, error = %e, "failed to reconcile task status after worker exit");
    }
}

async fn shutdown_children(queue: &TaskQueue, mut children: HashMap<TaskId, Child>, grace: Duration) {
    if children.is_empty() {
        return;
    }
    info!(count = children.len(), "waiting for in-flight workers before shutdown");

    let deadline = tokio::time::Instant::now() + grace;
    while !children.is_empty() && tokio::time::Instant::now() < deadline {
        reap_finished(queue, &mut children).await;
        if children.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    for (task_id, mut child) in children {
        warn!(task_id = %task_id, "grace period elapsed, killing worker");
        child.kill().await.ok();
        reconcile_one(queue, &task_id, None).await;
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}
