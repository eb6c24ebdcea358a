// src/core/reconciler/source.rs

//! The external interface: desired-cluster descriptors and the endpoints
//! hosting the Redis processes, supplied by whatever provisioner owns them.
//!
//! The shipped implementation reads one TOML manifest per cluster from a
//! directory. The file is re-read at the top of every pass, so endpoint and
//! shape changes take effect on the next observation; a deleted file is the
//! "desired object gone" case and ends the cluster's worker cleanly.

use crate::core::SlotwardError;
use crate::core::cluster::view::DesiredShape;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;

/// One endpoint hosting a Redis process, as reported by the provisioner.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Endpoint {
    /// Stable name, ending in `-<ordinal>`.
    pub name: String,
    pub ip: String,
    /// Whether the backing process is ready to serve.
    #[serde(default = "default_ready")]
    pub ready: bool,
}

impl Endpoint {
    /// The ordinal suffix of the endpoint name. The naming contract is part
    /// of the provisioning interface; a name without a numeric suffix is a
    /// hard error.
    pub fn ordinal(&self) -> Result<u32, SlotwardError> {
        self.name
            .rsplit_once('-')
            .and_then(|(_, suffix)| suffix.parse().ok())
            .ok_or_else(|| SlotwardError::InvalidEndpointName(self.name.clone()))
    }
}

/// The declared desired state of one cluster, plus its current endpoints.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ClusterManifest {
    /// How many masters the cluster should have.
    pub masters: i32,

    /// How many replicas should follow each master.
    #[serde(default)]
    pub replicas_per_master: i32,

    /// Opaque redis.conf payload, passed through to the provisioner. The
    /// planner never interprets it.
    #[serde(default)]
    pub config: String,

    /// Client port served by every endpoint; the gossip port is this + 10000.
    #[serde(default = "default_redis_port")]
    pub port: u16,

    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

fn default_ready() -> bool {
    true
}

fn default_redis_port() -> u16 {
    6379
}

impl ClusterManifest {
    pub fn nodes_needed(&self) -> usize {
        self.masters.max(0) as usize * (1 + self.replicas_per_master.max(0) as usize)
    }

    /// Validates the declared shape.
    pub fn desired(&self) -> Result<DesiredShape, SlotwardError> {
        if self.masters <= 0 {
            return Err(SlotwardError::InvalidManifest(format!(
                "masters must be positive, got {}",
                self.masters
            )));
        }
        if self.replicas_per_master < 0 {
            return Err(SlotwardError::InvalidManifest(format!(
                "replicas_per_master must not be negative, got {}",
                self.replicas_per_master
            )));
        }
        Ok(DesiredShape {
            masters: self.masters as usize,
            replicas_per_master: self.replicas_per_master as usize,
        })
    }
}

/// Supplies the manifest for a named cluster, or `None` once it is deleted.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    async fn fetch(&self, cluster: &str) -> Result<Option<ClusterManifest>, SlotwardError>;
}

/// Reads `<dir>/<cluster>.toml`.
#[derive(Debug, Clone)]
pub struct FileManifestSource {
    dir: PathBuf,
}

impl FileManifestSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ManifestSource for FileManifestSource {
    async fn fetch(&self, cluster: &str) -> Result<Option<ClusterManifest>, SlotwardError> {
        let path = self.dir.join(format!("{cluster}.toml"));
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let manifest = toml::from_str(&content)
            .map_err(|e| SlotwardError::Manifest(format!("{}: {e}", path.display())))?;
        Ok(Some(manifest))
    }
}
