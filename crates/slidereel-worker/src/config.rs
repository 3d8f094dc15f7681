//! Master and worker runtime configuration, read once at process startup.

use std::time::Duration;

/// Configuration for the master scheduler binary.
#[derive(Debug, Clone)]
pub struct MasterConfig {
    /// Maximum concurrent worker child processes (the `MAX_WORKERS` environment variable).
    pub max_workers: usize,
    /// How long `queue.next()` blocks waiting for a task id (1 s default).
    pub next_timeout_secs: f64,
    /// Delay after transitioning a popped task to `processing` before the
    /// worker is spawned, letting any pending writes settle in the store.
    pub spawn_settle_delay: Duration,
    /// How often the reap-and-claim loop ticks when the queue is empty.
    pub poll_interval: Duration,
    /// Grace period before a shutdown escalates from "stop intake" to
    /// killing remaining children.
    pub shutdown_grace: Duration,
    /// Path to the worker binary spawned per task. Defaults to the
    /// `slidereel-worker` binary alongside the master's own executable.
    pub worker_bin: String,
}

impl MasterConfig {
    pub fn from_env() -> Self {
        Self {
            max_workers: std::env::var("MAX_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            next_timeout_secs: std::env::var("MASTER_NEXT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1.0),
            spawn_settle_delay: Duration::from_millis(
                std::env::var("MASTER_SPAWN_SETTLE_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(500),
            ),
            poll_interval: Duration::from_millis(
                std::env::var("MASTER_POLL_INTERVAL_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(250),
            ),
            shutdown_grace: Duration::from_secs(
                std::env::var("MASTER_SHUTDOWN_GRACE_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(30),
            ),
            worker_bin: std::env::var("WORKER_BIN_PATH").unwrap_or_else(|_| default_worker_bin_path()),
        }
    }
}

fn default_worker_bin_path() -> String {
    let exe_name = if cfg!(windows) { "slidereel-worker.exe" } else { "slidereel-worker" };
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|dir| dir.join(exe_name)))
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| exe_name.to_string())
}

/// Configuration for the per-task worker runtime binary.
#[derive(Debug, Clone)]
pub struct WorkerRuntimeConfig {
    /// Interval the progress monitor polls task status at (~5 s).
    pub progress_interval: Duration,
    /// Root directory step implementations write per-`file_id` workspaces
    /// under.
    pub workspace_root: String,
}

impl WorkerRuntimeConfig {
    pub fn from_env() -> Self {
        Self {
            progress_interval: Duration::from_secs(
                std::env::var("WORKER_PROGRESS_INTERVAL_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(5),
            ),
            workspace_root: std::env::var("WORKER_WORKSPACE_ROOT").unwrap_or_else(|_| "/tmp/slidereel".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_config_defaults_use_documented_values() {
        std::env::remove_var("MAX_WORKERS");
        std::env::remove_var("MASTER_NEXT_TIMEOUT_SECS");
        let config = MasterConfig::from_env();
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.next_timeout_secs, 1.0);
        assert_eq!(config.shutdown_grace, Duration::from_secs(30));
    }

    #[test]
    fn worker_runtime_config_defaults_to_five_second_progress_interval() {
        std::env::remove_var("WORKER_PROGRESS_INTERVAL_SECS");
        let config = WorkerRuntimeConfig::from_env();
        assert_eq!(config.progress_interval, Duration::from_secs(5));
    }
}
