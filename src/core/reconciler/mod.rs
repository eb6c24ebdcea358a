// src/core/reconciler/mod.rs

//! The control loop that converges managed Redis clusters on their declared
//! shapes.
//!
//! One worker task per declared cluster, supervised through a `JoinSet`.
//! Workers are independent: they share nothing but the dialer and the
//! manifest source, and a pass for one cluster never overlaps another pass
//! for the same cluster.

use crate::config::Config;
use crate::core::client::{RedisDialer, TcpDialer};
use anyhow::Result;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info};

pub mod source;
pub mod worker;

pub use source::{ClusterManifest, Endpoint, FileManifestSource, ManifestSource};
pub use worker::ClusterWorker;

/// The main entry point for the reconciler daemon.
pub async fn run(config: Config) -> Result<()> {
    info!(
        "slotward starting with {} cluster(s), manifests in {}",
        config.clusters.len(),
        config.manifest_dir.display()
    );

    let dialer: Arc<dyn RedisDialer> = Arc::new(TcpDialer::new(
        config.reconcile.connect_timeout,
        config.reconcile.command_timeout,
    ));
    let source: Arc<dyn ManifestSource> = Arc::new(FileManifestSource::new(&config.manifest_dir));

    let mut tasks: JoinSet<()> = JoinSet::new();
    for name in config.clusters {
        let worker = ClusterWorker::new(
            name,
            source.clone(),
            dialer.clone(),
            config.reconcile.clone(),
        );
        info!("spawning reconcile worker for '{}'", worker.name());
        tasks.spawn(worker.run());
    }

    // Workers only return once their manifest is deleted; a panic is the
    // abnormal case worth shouting about.
    while let Some(res) = tasks.join_next().await {
        if let Err(e) = res {
            error!("a reconcile worker panicked: {e}");
        }
    }

    info!("all reconcile workers stopped, shutting down");
    Ok(())
}
