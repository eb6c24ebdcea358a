// src/core/cluster/view.rs

//! A snapshot of the observed cluster: one [`NodeHandle`] per reachable
//! endpoint, plus the declared desired shape.
//!
//! A view is built at the top of a reconcile pass and discarded at the end of
//! it. Nothing survives between passes; every plan is derived from a fresh
//! observation.

use crate::core::SlotwardError;
use crate::core::client::RedisDialer;
use crate::core::cluster::attributes::SLOT_COUNT;
use crate::core::cluster::node::NodeHandle;
use crate::core::reconciler::source::Endpoint;
use std::sync::Arc;
use tracing::{debug, warn};

/// The declared target shape of a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DesiredShape {
    pub masters: usize,
    pub replicas_per_master: usize,
}

impl DesiredShape {
    pub fn nodes_needed(&self) -> usize {
        self.masters * (1 + self.replicas_per_master)
    }
}

/// The set of nodes observed this pass.
#[derive(Debug)]
pub struct ClusterView {
    pub nodes: Vec<NodeHandle>,
    pub desired: DesiredShape,
}

impl ClusterView {
    /// Connects a handle for every ready endpoint. Each freshly bound node is
    /// told to meet itself, as a just-started Redis may refuse to advertise
    /// its own IP until it has been given one. Endpoints that cannot be
    /// reached are skipped; the driver decides whether enough nodes came up.
    pub async fn connect(
        dialer: &Arc<dyn RedisDialer>,
        endpoints: &[&Endpoint],
        port: u16,
        desired: DesiredShape,
    ) -> Result<ClusterView, SlotwardError> {
        let mut nodes = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let ordinal = endpoint.ordinal()?;
            match NodeHandle::connect(dialer.clone(), &endpoint.ip, port, Some(ordinal)).await {
                Ok(mut node) => {
                    node.meet(&endpoint.ip, port).await?;
                    debug!(
                        "bound node {} at {} (ordinal {})",
                        node.id(),
                        node.addr(),
                        ordinal
                    );
                    nodes.push(node);
                }
                // A node that answers with garbage is a different problem
                // than one that does not answer at all.
                Err(e @ (SlotwardError::MalformedNodeLine(_) | SlotwardError::MissingMyself(_))) => {
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "endpoint {} ({}) not reachable: {}",
                        endpoint.name, endpoint.ip, e
                    );
                }
            }
        }
        Ok(ClusterView { nodes, desired })
    }

    pub fn masters(&self) -> Vec<&NodeHandle> {
        self.nodes.iter().filter(|n| n.attrs.is_master()).collect()
    }

    pub fn replicas(&self) -> Vec<&NodeHandle> {
        self.nodes.iter().filter(|n| n.attrs.is_replica()).collect()
    }

    /// The union of every master's owned slots, in node order.
    pub fn assigned_slots(&self) -> Vec<u16> {
        self.masters()
            .into_iter()
            .flat_map(|n| n.attrs.slots.iter().copied())
            .collect()
    }

    /// The complement of [`assigned_slots`](Self::assigned_slots) in
    /// `[0, 16384)`, ascending.
    pub fn missing_slots(&self) -> Vec<u16> {
        let mut assigned = [false; SLOT_COUNT];
        for slot in self.assigned_slots() {
            assigned[slot as usize] = true;
        }
        (0..SLOT_COUNT as u16)
            .filter(|&slot| !assigned[slot as usize])
            .collect()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.id() == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut NodeHandle> {
        self.nodes.iter_mut().find(|n| n.id() == id)
    }

    /// Re-reads `CLUSTER NODES` on every node in the view.
    pub async fn refresh_all(&mut self) -> Result<(), SlotwardError> {
        for node in &mut self.nodes {
            node.refresh().await?;
        }
        Ok(())
    }
}
