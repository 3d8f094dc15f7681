//! Per-task worker binary: one process per task, receiving the task id via
//! the `TASK_ID` environment variable and exiting with a status the master
//! scheduler uses to reconcile the task's terminal state.

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use slidereel_models::TaskId;
use slidereel_worker::WorkerRuntime;

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

    let task_id = match std::env::var("TASK_ID") {
        Ok(id) if !id.trim().is_empty() => TaskId::from_string(id),
        _ => {
            error!("TASK_ID environment variable is required");
            std::process::exit(1);
        }
    };

    info!(task_id = %task_id, "starting slidereel-worker");

    let runtime = match WorkerRuntime::from_env().await {
        Ok(r) => r,
        Err(e) => {
            error!(task_id = %task_id, error = %e, "failed to construct worker runtime");
            std::process::exit(1);
        }
    };

    match runtime.run(&task_id).await {
        Ok(()) => {
            info!(task_id = %task_id, "worker finished");
        }
        Err(e) => {
            error!(task_id = %task_id, error = %e, "worker failed");
            std::process::exit(1);
        }
    }
}
