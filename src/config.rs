// src/config.rs

//! Daemon configuration: which clusters to manage, where their manifests
//! live, and the cadence of the reconcile loop.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory holding one `<cluster>.toml` manifest per managed cluster.
    #[serde(default = "default_manifest_dir")]
    pub manifest_dir: PathBuf,

    /// Names of the clusters to reconcile.
    pub clusters: Vec<String>,

    #[serde(default)]
    pub reconcile: ReconcileTimings,
}

/// Timeouts and requeue delays of the reconcile loop. The defaults are
/// sensible for clusters of up to a couple dozen nodes; none of them is an
/// invariant.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileTimings {
    /// TCP connect timeout per node.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Per-command timeout on every Redis call.
    #[serde(with = "humantime_serde", default = "default_command_timeout")]
    pub command_timeout: Duration,

    /// Wall-clock ceiling for one whole pass.
    #[serde(with = "humantime_serde", default = "default_pass_deadline")]
    pub pass_deadline: Duration,

    /// Pause after the meet/role phase, giving gossip time to propagate.
    #[serde(with = "humantime_serde", default = "default_gossip_settle")]
    pub gossip_settle: Duration,

    /// Next pass while nodes are still coming up.
    #[serde(with = "humantime_serde", default = "default_bootstrap_requeue")]
    pub bootstrap_requeue: Duration,

    /// Next pass after an aborted one.
    #[serde(with = "humantime_serde", default = "default_error_requeue")]
    pub error_requeue: Duration,

    /// Next pass after a pass that produced work.
    #[serde(with = "humantime_serde", default = "default_progress_requeue")]
    pub progress_requeue: Duration,

    /// Next pass when the cluster already matches its declared shape.
    #[serde(with = "humantime_serde", default = "default_steady_requeue")]
    pub steady_requeue: Duration,
}

impl Default for ReconcileTimings {
    fn default() -> Self {
        Self {
            connect_timeout: default_connect_timeout(),
            command_timeout: default_command_timeout(),
            pass_deadline: default_pass_deadline(),
            gossip_settle: default_gossip_settle(),
            bootstrap_requeue: default_bootstrap_requeue(),
            error_requeue: default_error_requeue(),
            progress_requeue: default_progress_requeue(),
            steady_requeue: default_steady_requeue(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_manifest_dir() -> PathBuf {
    PathBuf::from("manifests")
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_pass_deadline() -> Duration {
    Duration::from_secs(300)
}

fn default_gossip_settle() -> Duration {
    Duration::from_secs(5)
}

fn default_bootstrap_requeue() -> Duration {
    Duration::from_secs(10)
}

fn default_error_requeue() -> Duration {
    Duration::from_secs(10)
}

fn default_progress_requeue() -> Duration {
    Duration::from_secs(5)
}

fn default_steady_requeue() -> Duration {
    Duration::from_secs(30)
}

impl Config {
    pub async fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config file {path}"))?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
